pub mod ast;
mod error;
mod operator;
mod parser;
pub mod span;

pub use error::{ParseError, Result};
pub use parser::parse_tokens;
pub use span::{Span, Spanned, WithSpan};

/// Parse a template source into its syntax tree.
pub fn parse(src: &str) -> Result<ast::Template> {
    ast::Template::parse(src)
}
