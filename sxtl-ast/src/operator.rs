use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum BinaryOperator {
    // logical
    Or,
    And,
    // comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // containment
    In,
    NotIn,
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "or",
            BinaryOperator::And => "and",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::In => "in",
            BinaryOperator::NotIn => "not in",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::FloorDiv => "//",
            BinaryOperator::Mod => "%",
        }
    }

    /// `and` and `or` evaluate their right operand only when needed.
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum UnaryOperator {
    Neg,
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Neg => f.write_str("-"),
            UnaryOperator::Not => f.write_str("not"),
        }
    }
}

/// The operator of a `<?code?>` assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AssignOperator {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

impl AssignOperator {
    /// The binary operator an augmented assignment applies, `None` for plain
    /// assignment.
    pub fn binary(&self) -> Option<BinaryOperator> {
        match self {
            AssignOperator::Assign => None,
            AssignOperator::Add => Some(BinaryOperator::Add),
            AssignOperator::Sub => Some(BinaryOperator::Sub),
            AssignOperator::Mul => Some(BinaryOperator::Mul),
            AssignOperator::Div => Some(BinaryOperator::Div),
            AssignOperator::FloorDiv => Some(BinaryOperator::FloorDiv),
            AssignOperator::Mod => Some(BinaryOperator::Mod),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_augmented_assignment_operator() {
        assert_eq!(AssignOperator::Assign.binary(), None);
        assert_eq!(
            AssignOperator::FloorDiv.binary(),
            Some(BinaryOperator::FloorDiv)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(BinaryOperator::NotIn.to_string(), "not in");
        assert_eq!(UnaryOperator::Neg.to_string(), "-");
    }
}
