use crate::context::Context;
use crate::error::{Error, RenderResult};
use crate::value::Value;

use super::{Interpreter, Program, Renderer};

/// A program bound to a context and renderer settings, ready to render.
#[derive(Debug, Clone)]
pub struct Runnable<'a> {
    program: &'a Program,
    context: &'a Context,
    renderer: Renderer,
    constants: Vec<Value>,
}

impl<'a> Runnable<'a> {
    pub(crate) fn new(program: &'a Program, context: &'a Context, renderer: Renderer) -> Self {
        Self {
            program,
            context,
            renderer,
            constants: program.constants.iter().map(|c| c.to_value()).collect(),
        }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn context(&self) -> &'a Context {
        self.context
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub(crate) fn constant(&self, index: u16) -> Option<Value> {
        self.constants.get(index as usize).cloned()
    }

    /// Render the program into a string.
    ///
    /// The program's version is checked against the renderer's supported
    /// versions and its structure validated before anything runs. On
    /// failure no partial output is returned.
    pub fn render(&self) -> RenderResult<String> {
        let version = self.program.version();
        let supported = self.renderer.supported_versions();
        if !supported.contains(&version) {
            return Err(Error::VersionMismatch {
                found: version,
                min: *supported.start(),
                max: *supported.end(),
            }
            .into());
        }
        self.program.validate()?;

        let mut interpreter = Interpreter::new(self);
        interpreter.start()?;
        interpreter.run()?;
        Ok(interpreter.state().output())
    }
}
