use chumsky::span::SimpleSpan;

/// A byte range in the template source.
pub type Span = SimpleSpan;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            value: f(self.value),
            span: self.span,
        }
    }
}

pub trait WithSpan
where
    Self: Sized,
{
    fn with_span(self, span: impl Into<Span>) -> Spanned<Self> {
        Spanned {
            value: self,
            span: span.into(),
        }
    }
}

/// The source range of a span as a plain `Range`.
pub fn range(span: Span) -> std::ops::Range<usize> {
    span.start..span.end
}
