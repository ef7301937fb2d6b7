mod error;
mod lexer;
mod token;

pub use error::LexError;
pub use lexer::{tokenize, tokenize_expression, Tokens};
pub use token::{Token, TokenError};

/// A byte range in the template source.
pub type Span = std::ops::Range<usize>;

/// A token together with the source range it was lexed from.
pub type SpannedToken<'a> = (Token<'a>, Span);
