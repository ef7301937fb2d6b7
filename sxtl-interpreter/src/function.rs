use sxtl_ast::Span;

/// A compiled function: the main template body or a sub-template.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Function {
    pub name: String,
    /// Parameter names, as indexes into the program's name table
    pub params: Vec<u16>,
    // the compiled code, and the span of the instruction each byte belongs to
    pub chunk: Vec<u8>,
    pub spans: Vec<Span>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Function {
            name: name.into(),
            params: Vec::new(),
            chunk: Vec::new(),
            spans: Vec::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn span(&self, offset: usize) -> Option<Span> {
        self.spans.get(offset).copied()
    }
}
