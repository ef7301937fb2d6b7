use ahash::AHashSet;

/// Settings for compiling a template.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    strict_variables: bool,
    globals: AHashSet<String>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> CompileOptionsBuilder {
        CompileOptionsBuilder::new()
    }

    /// Whether reading a variable that is not bound at that point is a
    /// compile error.
    pub fn strict_variables(&self) -> bool {
        self.strict_variables
    }

    /// Whether a name is declared to come from the render context.
    pub fn is_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }
}

/// A builder for constructing [`CompileOptions`].
#[derive(Debug, Clone, Default)]
pub struct CompileOptionsBuilder {
    strict_variables: bool,
    globals: AHashSet<String>,
}

impl CompileOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict_variables(&mut self, strict_variables: bool) -> &mut Self {
        self.strict_variables = strict_variables;
        self
    }

    /// Declare names the render context will provide. Only used with strict
    /// variables.
    pub fn globals<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) -> &mut Self {
        self.globals.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn global(&mut self, name: impl Into<String>) -> &mut Self {
        self.globals.insert(name.into());
        self
    }

    pub fn build(&self) -> CompileOptions {
        CompileOptions {
            strict_variables: self.strict_variables,
            globals: self.globals.clone(),
        }
    }
}
