mod builder;
mod compile;
mod error;
mod options;
mod scope;

pub use builder::FunctionBuilder;
pub use compile::compile;
pub use error::{EmitError, Result};
pub use options::{CompileOptions, CompileOptionsBuilder};
pub use scope::Scopes;
