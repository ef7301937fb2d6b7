use std::rc::Rc;

use crate::error::{Error, Result};
use crate::value::{format_float, xml_escape, Value};

// the largest sequence `range` will build
const MAXIMUM_RANGE_SIZE: i64 = 2_i64.pow(25);

type BuiltinFunction = fn(&[Value]) -> Result<Value>;

/// A function callable from template expressions.
pub struct Builtin {
    pub name: &'static str,
    pub min_arity: usize,
    pub max_arity: usize,
    function: BuiltinFunction,
}

impl Builtin {
    pub fn accepts(&self, arity: usize) -> bool {
        (self.min_arity..=self.max_arity).contains(&arity)
    }

    pub(crate) fn call(&self, arguments: &[Value]) -> Result<Value> {
        if !self.accepts(arguments.len()) {
            return Err(Error::ArityMismatch {
                name: self.name.to_string(),
                found: arguments.len(),
            });
        }
        (self.function)(arguments)
    }
}

static BUILTINS: &[Builtin] = &[
    builtin("len", 1, 1, len),
    builtin("str", 1, 1, str_),
    builtin("int", 1, 1, int),
    builtin("float", 1, 1, float),
    builtin("bool", 1, 1, bool_),
    builtin("repr", 1, 1, repr),
    builtin("upper", 1, 1, upper),
    builtin("lower", 1, 1, lower),
    builtin("strip", 1, 1, strip),
    builtin("join", 2, 2, join),
    builtin("range", 1, 2, range),
    builtin("enumerate", 1, 1, enumerate),
    builtin("xmlescape", 1, 1, xmlescape),
    builtin("default", 2, 2, default),
];

const fn builtin(
    name: &'static str,
    min_arity: usize,
    max_arity: usize,
    function: BuiltinFunction,
) -> Builtin {
    Builtin {
        name,
        min_arity,
        max_arity,
        function,
    }
}

/// Look up a builtin function by name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

pub fn builtins() -> impl Iterator<Item = &'static Builtin> {
    BUILTINS.iter()
}

fn text(value: &Value) -> Result<&str> {
    match value {
        Value::Str(s) => Ok(s),
        _ => Err(Error::TypeError),
    }
}

fn len(arguments: &[Value]) -> Result<Value> {
    match &arguments[0] {
        Value::Str(s) => Ok(Value::from(s.chars().count())),
        Value::List(items) => Ok(Value::from(items.len())),
        Value::Map(entries) => Ok(Value::from(entries.len())),
        _ => Err(Error::TypeError),
    }
}

fn str_(arguments: &[Value]) -> Result<Value> {
    Ok(Value::from(arguments[0].to_string()))
}

fn int(arguments: &[Value]) -> Result<Value> {
    match &arguments[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(f) => {
            let truncated = f.trunc();
            if !truncated.is_finite() {
                return Err(Error::TypeError);
            }
            if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(Error::Overflow);
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| Error::TypeError),
        _ => Err(Error::TypeError),
    }
}

fn float(arguments: &[Value]) -> Result<Value> {
    match &arguments[0] {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Bool(b) => Ok(Value::Float(*b as i64 as f64)),
        Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| Error::TypeError),
        _ => Err(Error::TypeError),
    }
}

fn bool_(arguments: &[Value]) -> Result<Value> {
    Ok(Value::Bool(arguments[0].is_truthy()))
}

fn repr(arguments: &[Value]) -> Result<Value> {
    let repr = match &arguments[0] {
        Value::Float(f) => format_float(*f),
        other => other.repr(),
    };
    Ok(Value::from(repr))
}

fn upper(arguments: &[Value]) -> Result<Value> {
    Ok(Value::from(text(&arguments[0])?.to_uppercase()))
}

fn lower(arguments: &[Value]) -> Result<Value> {
    Ok(Value::from(text(&arguments[0])?.to_lowercase()))
}

fn strip(arguments: &[Value]) -> Result<Value> {
    Ok(Value::from(text(&arguments[0])?.trim()))
}

fn join(arguments: &[Value]) -> Result<Value> {
    let separator = text(&arguments[0])?;
    let items = arguments[1].iterate()?;
    let joined = items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::from(joined))
}

fn range(arguments: &[Value]) -> Result<Value> {
    let (start, stop) = match arguments {
        [Value::Int(stop)] => (0, *stop),
        [Value::Int(start), Value::Int(stop)] => (*start, *stop),
        _ => return Err(Error::TypeError),
    };
    if stop.saturating_sub(start) > MAXIMUM_RANGE_SIZE {
        return Err(Error::Overflow);
    }
    Ok((start..stop).map(Value::Int).collect())
}

fn enumerate(arguments: &[Value]) -> Result<Value> {
    let items = arguments[0].iterate()?;
    Ok(items
        .into_iter()
        .enumerate()
        .map(|(i, item)| Value::List(Rc::new(vec![Value::from(i), item])))
        .collect())
}

fn xmlescape(arguments: &[Value]) -> Result<Value> {
    Ok(Value::from(xml_escape(&arguments[0].to_string())))
}

fn default(arguments: &[Value]) -> Result<Value> {
    if arguments[0].is_null() {
        Ok(arguments[1].clone())
    } else {
        Ok(arguments[0].clone())
    }
}
