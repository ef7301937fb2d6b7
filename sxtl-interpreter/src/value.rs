use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};

/// A runtime value: what the render context binds and expressions produce.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Map(Rc<BTreeMap<String, Value>>),
}

impl Value {
    pub fn map<K: Into<String>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Value::Map(Rc::new(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
        }
    }

    /// The quoted, source-like representation used for nested values.
    pub fn repr(&self) -> String {
        let mut s = String::new();
        self.write_repr(&mut s);
        s
    }

    fn write_repr(&self, s: &mut String) {
        match self {
            Value::Null => s.push_str("None"),
            Value::Str(text) => write_quoted(text, s),
            Value::List(items) => {
                s.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    item.write_repr(s);
                }
                s.push(']');
            }
            Value::Map(entries) => {
                s.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    write_quoted(key, s);
                    s.push_str(": ");
                    value.write_repr(s);
                }
                s.push('}');
            }
            other => s.push_str(&other.to_string()),
        }
    }

    /// The items a `for` loop visits: list items, the characters of a text
    /// or the keys of a map in order.
    pub(crate) fn iterate(&self) -> Result<Vec<Value>> {
        match self {
            Value::List(items) => Ok(items.as_ref().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
            Value::Map(entries) => Ok(entries.keys().map(|k| Value::from(k.as_str())).collect()),
            _ => Err(Error::TypeError),
        }
    }
}

fn write_quoted(text: &str, s: &mut String) {
    s.push('\'');
    for c in text.chars() {
        match c {
            '\\' => s.push_str("\\\\"),
            '\'' => s.push_str("\\'"),
            '\n' => s.push_str("\\n"),
            '\t' => s.push_str("\\t"),
            '\r' => s.push_str("\\r"),
            c => s.push(c),
        }
    }
    s.push('\'');
}

pub(crate) fn format_float(f: f64) -> String {
    let s = f.to_string();
    if s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        format!("{}.0", s)
    } else {
        s
    }
}

/// The string form of a value, as `<?print?>` outputs it.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(d) => f.write_str(&format_float(*d)),
            Value::Str(s) => f.write_str(s),
            Value::List(_) | Value::Map(_) => f.write_str(&self.repr()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Float(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(Rc::new(items.into_iter().map(Into::into).collect()))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(entries))
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::List(Rc::new(iter.into_iter().map(Into::into).collect()))
    }
}

// arithmetic

enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(a: &Value, b: &Value) -> Option<Numbers> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(Numbers::Ints(*a, *b)),
        (Value::Int(a), Value::Float(b)) => Some(Numbers::Floats(*a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Some(Numbers::Floats(*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Some(Numbers::Floats(*a, *b)),
        _ => None,
    }
}

// the largest text (in bytes) or sequence `*` will build
const MAXIMUM_REPEAT_SIZE: usize = 1 << 25;

// How often to repeat `len` elements, refusing results that are too large.
fn repeat_count(len: usize, count: i64) -> Result<usize> {
    let count = usize::try_from(count.max(0)).map_err(|_| Error::Overflow)?;
    match len.checked_mul(count) {
        Some(size) if size <= MAXIMUM_REPEAT_SIZE => Ok(count),
        _ => Err(Error::Overflow),
    }
}

pub(crate) fn op_add(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::from(format!("{}{}", a, b))),
        (Value::List(a), Value::List(b)) => {
            Ok(a.iter().chain(b.iter()).cloned().collect::<Value>())
        }
        _ => match numbers(a, b) {
            Some(Numbers::Ints(a, b)) => a.checked_add(b).map(Value::Int).ok_or(Error::Overflow),
            Some(Numbers::Floats(a, b)) => Ok(Value::Float(a + b)),
            None => Err(Error::TypeError),
        },
    }
}

pub(crate) fn op_subtract(a: &Value, b: &Value) -> Result<Value> {
    match numbers(a, b) {
        Some(Numbers::Ints(a, b)) => a.checked_sub(b).map(Value::Int).ok_or(Error::Overflow),
        Some(Numbers::Floats(a, b)) => Ok(Value::Float(a - b)),
        None => Err(Error::TypeError),
    }
}

pub(crate) fn op_multiply(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            Ok(Value::from(s.repeat(repeat_count(s.len(), *n)?)))
        }
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
            let count = repeat_count(items.len(), *n)?;
            let mut repeated = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::List(Rc::new(repeated)))
        }
        _ => match numbers(a, b) {
            Some(Numbers::Ints(a, b)) => a.checked_mul(b).map(Value::Int).ok_or(Error::Overflow),
            Some(Numbers::Floats(a, b)) => Ok(Value::Float(a * b)),
            None => Err(Error::TypeError),
        },
    }
}

pub(crate) fn op_div(a: &Value, b: &Value) -> Result<Value> {
    let (a, b) = match numbers(a, b) {
        Some(Numbers::Ints(a, b)) => (a as f64, b as f64),
        Some(Numbers::Floats(a, b)) => (a, b),
        None => return Err(Error::TypeError),
    };
    if b == 0.0 {
        return Err(Error::DivisionByZero);
    }
    Ok(Value::Float(a / b))
}

pub(crate) fn op_floor_div(a: &Value, b: &Value) -> Result<Value> {
    match numbers(a, b) {
        Some(Numbers::Ints(_, 0)) => Err(Error::DivisionByZero),
        Some(Numbers::Ints(a, b)) => {
            let quotient = a.checked_div(b).ok_or(Error::Overflow)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                Ok(Value::Int(quotient - 1))
            } else {
                Ok(Value::Int(quotient))
            }
        }
        Some(Numbers::Floats(_, b)) if b == 0.0 => Err(Error::DivisionByZero),
        Some(Numbers::Floats(a, b)) => Ok(Value::Float((a / b).floor())),
        None => Err(Error::TypeError),
    }
}

pub(crate) fn op_mod(a: &Value, b: &Value) -> Result<Value> {
    match numbers(a, b) {
        Some(Numbers::Ints(_, 0)) => Err(Error::DivisionByZero),
        Some(Numbers::Ints(a, b)) => {
            let remainder = a.checked_rem(b).ok_or(Error::Overflow)?;
            if remainder != 0 && ((remainder < 0) != (b < 0)) {
                Ok(Value::Int(remainder + b))
            } else {
                Ok(Value::Int(remainder))
            }
        }
        Some(Numbers::Floats(_, b)) if b == 0.0 => Err(Error::DivisionByZero),
        Some(Numbers::Floats(a, b)) => Ok(Value::Float(a - b * (a / b).floor())),
        None => Err(Error::TypeError),
    }
}

pub(crate) fn op_negate(a: &Value) -> Result<Value> {
    match a {
        Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(Error::Overflow),
        Value::Float(f) => Ok(Value::Float(-f)),
        _ => Err(Error::TypeError),
    }
}

// comparison

/// Equality across types is `false`; integers and floats compare by value.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| values_equal(a, b))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => match numbers(a, b) {
            Some(Numbers::Ints(a, b)) => a == b,
            Some(Numbers::Floats(a, b)) => a == b,
            None => a == b,
        },
    }
}

/// Ordering of two values; `None` when either is NaN.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Result<Option<Ordering>> {
    match (a, b) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => {
            for (a, b) in a.iter().zip(b.iter()) {
                match compare_values(a, b)? {
                    Some(Ordering::Equal) => {}
                    other => return Ok(other),
                }
            }
            Ok(Some(a.len().cmp(&b.len())))
        }
        _ => match numbers(a, b) {
            Some(Numbers::Ints(a, b)) => Ok(Some(a.cmp(&b))),
            Some(Numbers::Floats(a, b)) => Ok(a.partial_cmp(&b)),
            None => Err(Error::TypeError),
        },
    }
}

pub(crate) fn op_contains(container: &Value, item: &Value) -> Result<bool> {
    match (container, item) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_ref())),
        (Value::Str(_), _) => Err(Error::TypeError),
        (Value::List(items), item) => Ok(items.iter().any(|candidate| values_equal(candidate, item))),
        (Value::Map(entries), Value::Str(key)) => Ok(entries.contains_key(key.as_ref())),
        (Value::Map(_), _) => Ok(false),
        _ => Err(Error::TypeError),
    }
}

// access

pub(crate) fn op_attr(object: &Value, name: &str) -> Result<Value> {
    match object {
        Value::Map(entries) => entries.get(name).cloned().ok_or_else(|| Error::KeyNotFound {
            key: name.to_string(),
        }),
        _ => Err(Error::TypeError),
    }
}

fn normalize_index(index: i64, len: usize) -> Result<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    if index < 0 || index >= len {
        return Err(Error::IndexOutOfRange);
    }
    Ok(index as usize)
}

pub(crate) fn op_index(object: &Value, index: &Value) -> Result<Value> {
    match (object, index) {
        (Value::List(items), Value::Int(i)) => Ok(items[normalize_index(*i, items.len())?].clone()),
        (Value::Str(s), Value::Int(i)) => {
            let chars = s.chars().collect::<Vec<_>>();
            let c = chars[normalize_index(*i, chars.len())?];
            Ok(Value::from(c.to_string()))
        }
        (Value::Map(_), Value::Str(key)) => op_attr(object, key),
        _ => Err(Error::TypeError),
    }
}

/// Escape the XML special characters of a text.
pub fn xml_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
