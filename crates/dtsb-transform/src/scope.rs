//! Scope Tracker: a stack of binding sets.
//!
//! Each scope has a type side and a value side. Type parameters, `infer`, mapped keys
//! and namespace members bind on the type side, which shadows every reference.
//! Parameter names bind on the value side and shadow `typeof` roots only.

use indexmap::IndexSet;

#[derive(Debug, Default)]
struct Scope {
    types: IndexSet<String>,
    values: IndexSet<String>,
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Remove the `n` innermost scopes.
    pub fn pop_scope(&mut self, n: usize) {
        debug_assert!(n <= self.scopes.len(), "popping {n} scopes from a stack of {}", self.scopes.len());
        let keep = self.scopes.len().saturating_sub(n);
        self.scopes.truncate(keep);
    }

    /// Bind `name` in the innermost scope. Binding with no open scope is a no-op.
    pub fn bind(&mut self, name: &str) {
        self.bind_at(0, name);
    }

    /// Bind `name` in the scope `levels` below the innermost one.
    pub fn bind_at(&mut self, levels: usize, name: &str) {
        debug_assert!(levels < self.scopes.len().max(1), "binding {levels} levels down in a stack of {}", self.scopes.len());
        let Some(index) = self.scopes.len().checked_sub(levels + 1) else {
            return;
        };
        self.scopes[index].types.insert(name.to_string());
    }

    pub fn bind_value(&mut self, name: &str) {
        if let Some(top) = self.scopes.last_mut() {
            top.values.insert(name.to_string());
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.types.contains(name))
    }

    /// Whether a `typeof` root is shadowed.
    pub fn is_value_bound(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .rev()
            .any(|scope| scope.values.contains(name) || scope.types.contains(name))
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings_are_visible_from_inner_scopes() {
        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.bind("T");
        scopes.push_scope();
        scopes.bind("K");
        assert!(scopes.is_bound("T"));
        assert!(scopes.is_bound("K"));
        scopes.pop_scope(1);
        assert!(scopes.is_bound("T"));
        assert!(!scopes.is_bound("K"));
    }

    #[test]
    fn test_pop_many() {
        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.push_scope();
        scopes.push_scope();
        scopes.bind("X");
        scopes.pop_scope(2);
        assert_eq!(scopes.depth(), 1);
        assert!(!scopes.is_bound("X"));
    }

    #[test]
    fn test_bind_without_scope_is_ignored() {
        let mut scopes = ScopeStack::new();
        scopes.bind("A");
        assert!(!scopes.is_bound("A"));
        assert_eq!(scopes.depth(), 0);
    }

    #[test]
    fn test_bind_at_targets_an_outer_scope() {
        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.push_scope();
        scopes.bind_at(1, "R");
        scopes.pop_scope(1);
        assert!(scopes.is_bound("R"));
        scopes.pop_scope(1);
        assert!(!scopes.is_bound("R"));
    }

    #[test]
    fn test_value_bindings_only_shadow_values() {
        let mut scopes = ScopeStack::new();
        scopes.push_scope();
        scopes.bind_value("x");
        scopes.bind("T");
        assert!(!scopes.is_bound("x"));
        assert!(scopes.is_value_bound("x"));
        assert!(scopes.is_value_bound("T"));
        scopes.pop_scope(1);
        assert!(!scopes.is_value_bound("x"));
    }
}
