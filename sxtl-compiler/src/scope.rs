// The names bound at each point of a function, as the renderer will see
// them: if arms and loop iterations open a scope, assignments bind in the
// innermost scope unless the name is already bound further out.

#[derive(Debug)]
struct Scope<N: Eq + Clone> {
    names: Vec<N>,
}

impl<N: Eq + Clone> Scope<N> {
    fn new() -> Self {
        Self { names: Vec::new() }
    }

    fn known_name(&self, name: &N) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

#[derive(Debug)]
pub struct Scopes<N: Eq + Clone> {
    scopes: Vec<Scope<N>>,
}

impl<N: Eq + Clone> Scopes<N> {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        // the function scope stays
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub(crate) fn push_name(&mut self, name: &N) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.names.push(name.clone());
        }
    }

    /// Bind a name as an assignment does.
    pub(crate) fn assign(&mut self, name: &N) {
        if !self.is_bound(name) {
            self.push_name(name);
        }
    }

    pub(crate) fn is_bound(&self, name: &N) -> bool {
        self.scopes.iter().any(|scope| scope.known_name(name))
    }
}

impl<N: Eq + Clone> Default for Scopes<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_binding_does_not_escape() {
        let mut scopes = Scopes::new();
        scopes.assign(&"total");
        scopes.push_scope();
        scopes.assign(&"total");
        scopes.assign(&"item");
        assert!(scopes.is_bound(&"item"));
        scopes.pop_scope();
        assert!(scopes.is_bound(&"total"));
        assert!(!scopes.is_bound(&"item"));
    }
}
