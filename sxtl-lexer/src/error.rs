use crate::Span;

/// A template source that cannot be tokenized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LexError {
    /// The input ended while inside a directive (or a `<?note` comment).
    #[error("unterminated directive")]
    UnterminatedDirective { span: Span },
    /// A character inside a directive that cannot start any token.
    #[error("unexpected character {found:?}")]
    UnexpectedCharacter { found: char, span: Span },
    /// A number literal that does not fit its type.
    #[error("invalid number literal")]
    InvalidNumber { span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnterminatedDirective { span } => span.clone(),
            LexError::UnexpectedCharacter { span, .. } => span.clone(),
            LexError::InvalidNumber { span } => span.clone(),
        }
    }
}
