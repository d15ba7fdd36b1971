//! Scope graph data structure for name binding
//!
//! The scope graph tracks:
//! - Scope hierarchy (parent/child relationships)
//! - Bindings within each scope, per Java name space
//! - Which scopes are closed (fully visited, bindings frozen)

use crate::symbol::SymbolId;
use std::collections::{HashMap, HashSet};

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// Create a root scope ID
    pub fn root() -> Self {
        Self(0)
    }
}

/// The kind of scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Compilation unit scope
    Unit,
    /// Type body
    Class,
    /// Method, constructor, lambda or initializer
    Method,
    /// Block, loop header, catch clause, resource list, switch block
    Block,
}

/// Java keeps variables, methods and types in separate name spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Value,
    Method,
    Type,
}

/// What a name is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Symbol(SymbolId),
    /// Declared but never renamed (type parameters)
    Opaque,
}

/// Scope graph for tracking name bindings
#[derive(Debug, Default)]
pub struct ScopeGraph {
    /// Next scope ID to assign
    next_id: u32,
    /// Scope hierarchy (child → parent)
    parents: HashMap<ScopeId, ScopeId>,
    /// Scope kind
    kinds: HashMap<ScopeId, ScopeKind>,
    /// Bindings: (scope, namespace, name) → bindings in declaration order
    definitions: HashMap<(ScopeId, Namespace, String), Vec<Binding>>,
    /// Scopes whose region has been fully visited
    closed: HashSet<ScopeId>,
}

impl ScopeGraph {
    /// Create a new scope graph with a root unit scope
    pub fn new() -> Self {
        let mut graph = Self::default();
        graph.kinds.insert(ScopeId::root(), ScopeKind::Unit);
        graph.next_id = 1;
        graph
    }

    /// Create a new child scope
    pub fn add_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;
        self.parents.insert(id, parent);
        self.kinds.insert(id, kind);
        id
    }

    /// Add a binding to a scope; returns false if the scope is already closed
    pub fn add_definition(
        &mut self,
        scope: ScopeId,
        namespace: Namespace,
        name: impl Into<String>,
        binding: Binding,
    ) -> bool {
        let name = name.into();
        if self.closed.contains(&scope) {
            tracing::debug!(
                "Ignoring late binding of {} in closed {:?} scope {:?}",
                name,
                self.kinds.get(&scope),
                scope
            );
            return false;
        }
        self.definitions
            .entry((scope, namespace, name))
            .or_default()
            .push(binding);
        true
    }

    /// Freeze a scope once its region has been visited
    pub fn close(&mut self, scope: ScopeId) {
        self.closed.insert(scope);
    }

    /// Get the parent of a scope
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.parents.get(&scope).copied()
    }

    /// Look up bindings in a scope (not walking parents)
    pub fn lookup_local(&self, scope: ScopeId, namespace: Namespace, name: &str) -> &[Binding] {
        self.definitions
            .get(&(scope, namespace, name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up the innermost binding walking up the scope chain
    pub fn lookup(&self, scope: ScopeId, namespace: Namespace, name: &str) -> Option<(ScopeId, Binding)> {
        self.scope_chain(scope).into_iter().find_map(|s| {
            self.lookup_local(s, namespace, name)
                .last()
                .map(|binding| (s, *binding))
        })
    }

    /// Every binding of `name` from the innermost scope outward
    ///
    /// Used for methods, where overloads share a name and inner classes'
    /// methods do not hide the outer class's overloads of other arities.
    pub fn lookup_all(&self, scope: ScopeId, namespace: Namespace, name: &str) -> Vec<(ScopeId, Binding)> {
        self.scope_chain(scope)
            .into_iter()
            .flat_map(|s| {
                self.lookup_local(s, namespace, name)
                    .iter()
                    .map(move |binding| (s, *binding))
            })
            .collect()
    }

    /// Get scope chain from a scope up to root
    pub fn scope_chain(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Number of scopes created, root included
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(id: u32) -> Binding {
        Binding::Symbol(SymbolId(id))
    }

    #[test]
    fn test_scope_hierarchy() {
        let mut graph = ScopeGraph::new();

        let class_scope = graph.add_scope(ScopeId::root(), ScopeKind::Class);
        let method_scope = graph.add_scope(class_scope, ScopeKind::Method);

        assert_eq!(graph.parent(method_scope), Some(class_scope));
        assert_eq!(graph.parent(class_scope), Some(ScopeId::root()));
        assert_eq!(graph.parent(ScopeId::root()), None);
    }

    #[test]
    fn test_definition_lookup() {
        let mut graph = ScopeGraph::new();

        let class_scope = graph.add_scope(ScopeId::root(), ScopeKind::Class);
        let method_scope = graph.add_scope(class_scope, ScopeKind::Method);

        graph.add_definition(class_scope, Namespace::Value, "count", sym(1));
        graph.add_definition(class_scope, Namespace::Method, "count", sym(2));

        // Local lookup
        assert_eq!(graph.lookup_local(class_scope, Namespace::Value, "count"), &[sym(1)]);
        assert!(graph.lookup_local(method_scope, Namespace::Value, "count").is_empty());

        // Name spaces stay apart
        assert_eq!(
            graph.lookup(method_scope, Namespace::Method, "count"),
            Some((class_scope, sym(2)))
        );
        assert_eq!(graph.lookup(method_scope, Namespace::Type, "count"), None);
    }

    #[test]
    fn test_shadowing() {
        let mut graph = ScopeGraph::new();

        let method_scope = graph.add_scope(ScopeId::root(), ScopeKind::Method);
        let block = graph.add_scope(method_scope, ScopeKind::Block);

        graph.add_definition(method_scope, Namespace::Value, "a", sym(1));
        graph.add_definition(block, Namespace::Value, "a", sym(2));

        assert_eq!(graph.lookup(block, Namespace::Value, "a"), Some((block, sym(2))));
        assert_eq!(graph.lookup(method_scope, Namespace::Value, "a"), Some((method_scope, sym(1))));
    }

    #[test]
    fn test_closed_scope_is_frozen() {
        let mut graph = ScopeGraph::new();
        let block = graph.add_scope(ScopeId::root(), ScopeKind::Block);

        assert!(graph.add_definition(block, Namespace::Value, "x", sym(1)));
        graph.close(block);
        assert!(!graph.add_definition(block, Namespace::Value, "y", sym(2)));
        assert_eq!(graph.lookup(block, Namespace::Value, "y"), None);
    }

    #[test]
    fn test_scope_chain() {
        let mut graph = ScopeGraph::new();

        let s1 = graph.add_scope(ScopeId::root(), ScopeKind::Class);
        let s2 = graph.add_scope(s1, ScopeKind::Method);
        let s3 = graph.add_scope(s2, ScopeKind::Block);

        let chain = graph.scope_chain(s3);
        assert_eq!(chain, vec![s3, s2, s1, ScopeId::root()]);

        let all = {
            graph.add_definition(s1, Namespace::Method, "f", sym(1));
            graph.add_definition(s1, Namespace::Method, "f", sym(2));
            graph.lookup_all(s3, Namespace::Method, "f")
        };
        assert_eq!(all, vec![(s1, sym(1)), (s1, sym(2))]);
    }
}
