use std::fmt;

use ordered_float::OrderedFloat;

pub use crate::operator::{AssignOperator, BinaryOperator, UnaryOperator};
pub use crate::span::{Span, Spanned, WithSpan};

pub type Name = String;

pub type NameS = Spanned<Name>;
pub type NodeS = Spanned<Node>;
pub type ExprS = Spanned<Expr>;

/// A parsed template: a sequence of nodes covering the whole source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Template {
    pub body: Vec<NodeS>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Node {
    Text(String),
    Output(Output),
    If(If),
    For(For),
    Assign(Assign),
    Def(Def),
    Render(Render),
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Output {
    pub expr: ExprS,
    /// `<?printx?>` escapes XML special characters.
    pub escape: bool,
}

/// A conditional. `<?elif?>` chains are nested `If` nodes in `else_`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct If {
    pub condition: ExprS,
    pub then: Vec<NodeS>,
    pub else_: Vec<NodeS>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct For {
    pub var_name: NameS,
    pub iterable: ExprS,
    pub body: Vec<NodeS>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Assign {
    pub name: NameS,
    pub operator: AssignOperator,
    pub value: ExprS,
}

/// A named sub-template definition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Def {
    pub name: NameS,
    pub params: Vec<NameS>,
    pub body: Vec<NodeS>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Render {
    pub name: NameS,
    pub arguments: Vec<ExprS>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Expr {
    Literal(Literal),
    Var(Name),
    List(Vec<ExprS>),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Call(FunctionCall),
    Attr(AttrExpr),
    Index(IndexExpr),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Literal {
    None,
    Bool(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UnaryExpr {
    pub operator: UnaryOperator,
    pub operand: Box<ExprS>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BinaryExpr {
    pub operator: BinaryOperator,
    pub left: Box<ExprS>,
    pub right: Box<ExprS>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FunctionCall {
    pub name: NameS,
    pub arguments: Vec<ExprS>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttrExpr {
    pub object: Box<ExprS>,
    pub name: NameS,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IndexExpr {
    pub object: Box<ExprS>,
    pub index: Box<ExprS>,
}

/// The kind of block a `<?end?>` can close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum BlockKind {
    If,
    For,
    Def,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::If => f.write_str("if"),
            BlockKind::For => f.write_str("for"),
            BlockKind::Def => f.write_str("def"),
        }
    }
}

impl WithSpan for Node {}
impl WithSpan for Expr {}
impl WithSpan for Name {}
