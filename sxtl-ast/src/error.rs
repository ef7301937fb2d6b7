use chumsky::input::ValueInput;
use chumsky::util::MaybeRef;
use sxtl_lexer::{LexError, Token};

use crate::ast::BlockKind;
use crate::span::Span;

/// The error type the chumsky grammar reports while parsing the inside of a
/// single directive.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParserError<'a> {
    pub(crate) span: Span,
    pub(crate) expected: Vec<Option<Token<'a>>>,
    pub(crate) found: Option<Token<'a>>,
}

impl<'a, I> chumsky::error::Error<'a, I> for ParserError<'a>
where
    I: ValueInput<'a, Token = Token<'a>, Span = Span>,
{
    fn expected_found<E: IntoIterator<Item = Option<MaybeRef<'a, Token<'a>>>>>(
        expected: E,
        found: Option<MaybeRef<'a, Token<'a>>>,
        span: Span,
    ) -> Self {
        Self {
            span,
            expected: expected
                .into_iter()
                .map(|e| e.as_deref().cloned())
                .collect(),
            found: found.as_deref().cloned(),
        }
    }

    fn merge(self, other: Self) -> Self {
        let mut combined = self.expected;
        for entry in other.expected {
            if !combined.contains(&entry) {
                combined.push(entry);
            }
        }
        Self {
            span: self.span,
            expected: combined,
            found: self.found,
        }
    }
}

impl From<ParserError<'_>> for ParseError {
    fn from(error: ParserError<'_>) -> Self {
        ParseError::ExpectedFound {
            span: error.span,
            expected: error
                .expected
                .iter()
                .map(|token| match token {
                    Some(token) => token.to_string(),
                    None => END_OF_DIRECTIVE.to_string(),
                })
                .collect(),
            found: error.found.map(|token| token.to_string()),
        }
    }
}

const END_OF_DIRECTIVE: &str = "end of directive";

/// A template that is lexically valid but not well-formed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("expected {}, found {}", expected_list(.expected), .found.as_deref().unwrap_or(END_OF_DIRECTIVE))]
    ExpectedFound {
        span: Span,
        expected: Vec<String>,
        found: Option<String>,
    },
    #[error("unknown directive `{name}`")]
    UnknownDirective { name: String, span: Span },
    #[error("`end {found}` cannot close an open `{expected}` block")]
    MismatchedEnd {
        expected: BlockKind,
        found: BlockKind,
        span: Span,
    },
    #[error("`{found}` without an open block")]
    UnmatchedEnd { found: String, span: Span },
    #[error("`{expected}` block is never closed")]
    UnclosedBlock { expected: BlockKind, span: Span },
    #[error("`{found}` after `else`")]
    ElseAfterElse { found: String, span: Span },
    #[error("`{directive}` outside of a loop")]
    LoopControlOutsideLoop { directive: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex(error) => error.span().into(),
            ParseError::ExpectedFound { span, .. } => *span,
            ParseError::UnknownDirective { span, .. } => *span,
            ParseError::MismatchedEnd { span, .. } => *span,
            ParseError::UnmatchedEnd { span, .. } => *span,
            ParseError::UnclosedBlock { span, .. } => *span,
            ParseError::ElseAfterElse { span, .. } => *span,
            ParseError::LoopControlOutsideLoop { span, .. } => *span,
        }
    }
}

fn expected_list(expected: &[String]) -> String {
    match expected {
        [] => "something else".to_string(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_list() {
        assert_eq!(expected_list(&[]), "something else");
        assert_eq!(expected_list(&["`)`".to_string()]), "`)`");
        assert_eq!(
            expected_list(&["`)`".to_string(), "`,`".to_string(), "`.`".to_string()]),
            "`)`, `,` or `.`"
        );
    }

    #[test]
    fn test_expected_found_message() {
        let error = ParseError::ExpectedFound {
            span: (3..4).into(),
            expected: vec!["`in`".to_string()],
            found: None,
        };
        assert_eq!(error.to_string(), "expected `in`, found end of directive");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serializable() {
        fn assert_serialize<T: serde::Serialize>() {}
        assert_serialize::<ParseError>();
    }
}
