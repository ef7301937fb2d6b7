use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};

use sxtl_ast::span::range;
use sxtl_ast::{ParseError, Span};
use sxtl_compiler::EmitError;
use sxtl_interpreter::RenderError;

/// An error compiling or rendering a template.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The source is not a well-formed template.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The template is well-formed but cannot be turned into bytecode.
    #[error(transparent)]
    Emit(#[from] EmitError),
    /// Rendering the program failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl Error {
    /// A short identifier for the kind of error.
    pub fn code(&self) -> String {
        match self {
            Error::Parse(_) => "ParseError".to_string(),
            Error::Emit(_) => "EmitError".to_string(),
            Error::Render(e) => e.error.code(),
        }
    }

    /// The location in the template source this error refers to, if known.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse(e) => Some(e.span()),
            Error::Emit(e) => Some(e.span()),
            Error::Render(e) => e.span,
        }
    }

    fn message(&self) -> String {
        match self {
            Error::Render(e) => match e.error.detail() {
                Some(detail) => format!("{} {}", e.error.message(), detail),
                None => e.error.message().to_string(),
            },
            _ => self.to_string(),
        }
    }

    fn note(&self) -> Option<&str> {
        match self {
            Error::Render(e) if !e.error.note().is_empty() => Some(e.error.note()),
            _ => None,
        }
    }

    /// A human-readable diagnostic pointing into the template source.
    ///
    /// `src` must be the source the failing program was compiled from;
    /// spans are byte offsets into it.
    pub fn report(&self, src: &str) -> String {
        let span = self.span().map(range);
        let location = span.clone().unwrap_or(0..0);
        let config = Config::default()
            .with_color(false)
            .with_index_type(IndexType::Byte);
        let mut report = Report::build(ReportKind::Error, ("source", location))
            .with_config(config)
            .with_code(self.code())
            .with_message(self.message());
        if let Some(span) = span {
            report = report.with_label(
                Label::new(("source", span))
                    .with_message(self.message())
                    .with_color(Color::Red),
            );
        }
        if let Some(note) = self.note() {
            report = report.with_note(note);
        }
        let mut buffer = Vec::new();
        if report
            .finish()
            .write(("source", Source::from(src)), &mut buffer)
            .is_err()
        {
            // the report cannot be laid out against this source
            return format!("[{}] {}", self.code(), self.message());
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
