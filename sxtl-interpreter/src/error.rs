use strum::EnumMessage;
use strum_macros::{Display, EnumMessage};

use sxtl_ast::Span;

/// A render error code.
///
/// The first paragraph of each variant's documentation is its `message()`,
/// the rest its `note()`.
#[derive(Debug, Clone, PartialEq, Display, EnumMessage)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Error {
    /// Undefined variable.
    ///
    /// The variable is not bound by an enclosing loop, assignment or
    /// sub-template parameter, and the render context does not define it.
    UndefinedVariable { name: String },
    /// Wrong number of arguments.
    ///
    /// A builtin function or sub-template was called with a number of
    /// arguments it does not accept.
    ArityMismatch { name: String, found: usize },
    /// Unknown function.
    ///
    /// The name does not refer to a builtin function.
    UnknownFunction { name: String },
    /// Type error.
    ///
    /// An operation was applied to a value of a type it does not support.
    TypeError,
    /// Division by zero.
    ///
    /// The right operand of `/`, `//` or `%` is zero.
    DivisionByZero,
    /// Integer overflow.
    ///
    /// The result of an integer operation does not fit in 64 bits, or a
    /// generated sequence is too large.
    Overflow,
    /// Index out of range.
    ///
    /// The index is outside the bounds of the sequence or text.
    IndexOutOfRange,
    /// Key not found.
    ///
    /// The map has no entry with this key.
    KeyNotFound { key: String },
    /// Stack overflow.
    ///
    /// Sub-templates are nested too deeply, usually because of unbounded
    /// recursion.
    StackOverflow,
    /// Step limit exceeded.
    ///
    /// The render executed more instructions than the renderer allows.
    StepLimitExceeded,
    /// Unsupported program version.
    ///
    /// The program was compiled for a bytecode format version this renderer
    /// does not support.
    VersionMismatch { found: u16, min: u16, max: u16 },
    /// Jump out of bounds.
    ///
    /// A jump in the program does not land on an instruction of the same
    /// function.
    JumpOutOfBounds,
    /// Invalid program.
    ///
    /// The bytecode is malformed: an unknown opcode, a truncated instruction,
    /// an index without a table entry or unbalanced block markers.
    InvalidProgram,
}

impl Error {
    pub fn code(&self) -> String {
        self.to_string()
    }

    pub fn message(&self) -> &str {
        self.documentation_pieces().0
    }

    pub fn note(&self) -> &str {
        self.documentation_pieces().1
    }

    /// The values carried by the error code, formatted for display.
    pub fn detail(&self) -> Option<String> {
        match self {
            Error::UndefinedVariable { name } | Error::UnknownFunction { name } => {
                Some(format!("`{}`", name))
            }
            Error::ArityMismatch { name, found } => {
                Some(format!("`{}` called with {} arguments", name, found))
            }
            Error::KeyNotFound { key } => Some(format!("{:?}", key)),
            Error::VersionMismatch { found, min, max } => Some(format!(
                "found version {}, supported {}..={}",
                found, min, max
            )),
            _ => None,
        }
    }

    pub fn with_span(self, span: Span) -> RenderError {
        RenderError {
            error: self,
            function: None,
            offset: None,
            span: Some(span),
        }
    }

    fn documentation_pieces(&self) -> (&str, &str) {
        if let Some(documentation) = self.get_documentation() {
            let mut pieces = documentation.splitn(2, "\n\n");
            let first = pieces.next().unwrap_or("");
            let second = pieces.next().unwrap_or("");
            (first, second)
        } else {
            ("", "")
        }
    }
}

impl std::error::Error for Error {}

/// An error code with the location in the program where it occurred.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RenderError {
    /// The error code
    pub error: Error,
    /// The name of the function (`main` or a sub-template) that failed
    pub function: Option<String>,
    /// The byte offset of the failing instruction in its function
    pub offset: Option<usize>,
    /// The template source span of the failing instruction
    pub span: Option<Span>,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(detail) = self.error.detail() {
            write!(f, " {}", detail)?;
        }
        if let Some(span) = self.span {
            write!(f, " ({}..{})", span.start, span.end)?;
        }
        Ok(())
    }
}

impl std::error::Error for RenderError {}

impl From<Error> for RenderError {
    fn from(e: Error) -> Self {
        RenderError {
            error: e,
            function: None,
            offset: None,
            span: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
/// The result type for errors with program locations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
