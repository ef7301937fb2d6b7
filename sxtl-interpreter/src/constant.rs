use std::fmt;

use ordered_float::OrderedFloat;

use crate::value::{format_float, Value};

/// An entry in a program's constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
}

impl Constant {
    /// Whether two constants have the same type and the same value.
    ///
    /// Unlike `==`, floats are compared by their bits, so `0.0` and `-0.0`
    /// stay distinct pool entries.
    pub fn identical(&self, other: &Constant) -> bool {
        match (self, other) {
            (Constant::Float(a), Constant::Float(b)) => a.0.to_bits() == b.0.to_bits(),
            (a, b) => a == b,
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        match self {
            Constant::None => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(i) => Value::Int(*i),
            Constant::Float(f) => Value::Float(f.0),
            Constant::Str(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => f.write_str("none"),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Float(d) => f.write_str(&format_float(d.0)),
            Constant::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        assert!(Constant::Int(1).identical(&Constant::Int(1)));
        assert!(!Constant::Int(1).identical(&Constant::Float(OrderedFloat(1.0))));
        assert!(!Constant::Float(OrderedFloat(0.0)).identical(&Constant::Float(OrderedFloat(-0.0))));
        assert!(Constant::Str("a".to_string()).identical(&Constant::Str("a".to_string())));
    }

    #[test]
    fn test_display() {
        assert_eq!(Constant::Float(OrderedFloat(2.0)).to_string(), "2.0");
        assert_eq!(Constant::Str("a\"b".to_string()).to_string(), "\"a\\\"b\"");
        assert_eq!(Constant::None.to_string(), "none");
    }
}
