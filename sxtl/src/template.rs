use sxtl_compiler::{compile, CompileOptions};
use sxtl_interpreter::{Context, Program, Renderer};

use crate::error::Result;

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    program: Program,
}

impl Template {
    /// Compile a template with the default options: variables not bound in
    /// the template are looked up in the context at render time.
    pub fn compile(src: &str) -> Result<Self> {
        Self::compile_with(src, &CompileOptions::default())
    }

    pub fn compile_with(src: &str, options: &CompileOptions) -> Result<Self> {
        let template = sxtl_ast::parse(src)?;
        let program = compile(&template, options)?;
        Ok(Template { program })
    }

    /// Load a template from its binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Template {
            program: Program::from_bytes(bytes)?,
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn into_program(self) -> Program {
        self.program
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.program.to_bytes()
    }

    pub fn render(&self, context: &Context) -> Result<String> {
        self.render_with(&Renderer::default(), context)
    }

    /// Render with a renderer that restricts versions or steps.
    pub fn render_with(&self, renderer: &Renderer, context: &Context) -> Result<String> {
        Ok(renderer.render(&self.program, context)?)
    }
}

impl From<Program> for Template {
    fn from(program: Program) -> Self {
        Template { program }
    }
}
