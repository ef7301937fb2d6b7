//! Compile SXTL templates to portable bytecode and render them.
//!
//! ```
//! use sxtl::{Context, Template};
//!
//! let template = Template::compile("Hello <?=name?>!").unwrap();
//! let context = Context::builder().variable("name", "World").build();
//! assert_eq!(template.render(&context).unwrap(), "Hello World!");
//! ```
//!
//! A [`Template`] wraps a compiled [`Program`]. The program can be stored
//! with [`Program::to_bytes`] and loaded back with [`Template::from_bytes`]
//! without the original source; it is immutable and can be shared between
//! threads, each rendering with its own [`Context`].
mod error;
mod template;

pub use error::{Error, Result};
pub use template::Template;

pub use sxtl_ast::{ParseError, Span};
pub use sxtl_compiler::{CompileOptions, CompileOptionsBuilder, EmitError};
pub use sxtl_interpreter::{
    Context, ContextBuilder, Program, RenderError, Renderer, RendererBuilder, Value,
    FORMAT_VERSION,
};
pub use sxtl_lexer::LexError;

/// The error codes a render can fail with.
pub use sxtl_interpreter::Error as ErrorCode;

/// Compile a template and render it once.
pub fn render(src: &str, context: &Context) -> Result<String> {
    Template::compile(src)?.render(context)
}
