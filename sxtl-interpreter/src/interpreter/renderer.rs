use std::ops::RangeInclusive;

use crate::context::Context;
use crate::error::RenderResult;

use super::program::FORMAT_VERSION;
use super::{Program, Runnable};

/// Settings for rendering programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    supported_versions: RangeInclusive<u16>,
    max_steps: Option<u64>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RendererBuilder {
        RendererBuilder::new()
    }

    pub fn supported_versions(&self) -> &RangeInclusive<u16> {
        &self.supported_versions
    }

    pub fn max_steps(&self) -> Option<u64> {
        self.max_steps
    }

    /// Bind a program to a context with these settings.
    pub fn runnable<'a>(&self, program: &'a Program, context: &'a Context) -> Runnable<'a> {
        Runnable::new(program, context, self.clone())
    }

    /// Render a program against a context.
    pub fn render(&self, program: &Program, context: &Context) -> RenderResult<String> {
        self.runnable(program, context).render()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer {
            supported_versions: FORMAT_VERSION..=FORMAT_VERSION,
            max_steps: None,
        }
    }
}

/// A builder for constructing a [`Renderer`].
#[derive(Debug, Clone, Default)]
pub struct RendererBuilder {
    supported_versions: Option<RangeInclusive<u16>>,
    max_steps: Option<u64>,
}

impl RendererBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The program format versions this renderer accepts. Defaults to the
    /// version this crate emits.
    pub fn supported_versions(&mut self, versions: RangeInclusive<u16>) -> &mut Self {
        self.supported_versions = Some(versions);
        self
    }

    /// The maximum number of instructions a single render may execute.
    /// Unlimited when `None`.
    pub fn max_steps(&mut self, max_steps: Option<u64>) -> &mut Self {
        self.max_steps = max_steps;
        self
    }

    pub fn build(&self) -> Renderer {
        Renderer {
            supported_versions: self
                .supported_versions
                .clone()
                .unwrap_or(FORMAT_VERSION..=FORMAT_VERSION),
            max_steps: self.max_steps,
        }
    }
}
