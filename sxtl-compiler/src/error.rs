use sxtl_ast::Span;

/// An error found while emitting bytecode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum EmitError {
    /// Only reported with strict variables.
    #[error("variable `{name}` is not bound here")]
    UndefinedVariable { name: String, span: Span },
    #[error("no template named `{name}` is defined")]
    UnknownTemplate { name: String, span: Span },
    #[error("template `{name}` is defined more than once")]
    DuplicateTemplate { name: String, span: Span },
    #[error("too many {what}")]
    TooMany { what: &'static str, span: Span },
    #[error("jump too far")]
    JumpTooFar { span: Span },
    #[error("unbalanced block markers")]
    UnbalancedBlock { span: Span },
}

impl EmitError {
    pub fn span(&self) -> Span {
        match self {
            EmitError::UndefinedVariable { span, .. }
            | EmitError::UnknownTemplate { span, .. }
            | EmitError::DuplicateTemplate { span, .. }
            | EmitError::TooMany { span, .. }
            | EmitError::JumpTooFar { span }
            | EmitError::UnbalancedBlock { span } => *span,
        }
    }
}

pub type Result<T> = std::result::Result<T, EmitError>;
