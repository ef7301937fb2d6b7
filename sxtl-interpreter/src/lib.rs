#[macro_use]
extern crate num_derive;

pub mod constant;
pub mod context;
pub mod error;
pub mod function;
pub mod instruction;
pub mod interpreter;
pub mod library;
pub mod value;

pub use constant::Constant;
pub use context::{Context, ContextBuilder};
pub use error::{Error, RenderError, RenderResult};
pub use function::Function;
pub use interpreter::{Program, Renderer, RendererBuilder, Runnable, FORMAT_VERSION};
pub use value::Value;
