use ahash::AHashMap;

use crate::value::Value;

/// The data a template is rendered against: global variables by name.
#[derive(Debug, Clone, Default)]
pub struct Context {
    variables: AHashMap<String, Value>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

/// A builder for constructing a [`Context`].
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    variables: AHashMap<String, Value>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable. A later binding of the same name replaces an
    /// earlier one.
    pub fn variable(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Bind several variables at once.
    pub fn variables<K, V>(&mut self, variables: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in variables {
            self.variable(name, value);
        }
        self
    }

    /// Build the `Context`.
    pub fn build(&self) -> Context {
        Context {
            variables: self.variables.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let context = Context::builder()
            .variable("name", "World")
            .variables([("a", 1), ("b", 2)])
            .variable("a", 3)
            .build();
        assert_eq!(context.get("name"), Some(&Value::from("World")));
        assert_eq!(context.get("a"), Some(&Value::Int(3)));
        assert!(context.contains("b"));
        assert!(!context.contains("missing"));
    }
}
