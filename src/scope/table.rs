//! Per-unit symbol table
//!
//! Holds the symbols declared in one compilation unit, the scope graph the
//! builder created for it, and the resolution attached to every identifier
//! node. The tree itself is never touched; resolutions are keyed by node id.

use super::graph::ScopeGraph;
use crate::store::SymbolStore;
use crate::symbol::{Symbol, SymbolId};
use std::collections::HashMap;
use tree_sitter::Node;

/// Whether a member reference found its declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Valid,
    Missing,
}

/// What an identifier node refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A symbol declared in this unit
    Local(SymbolId),
    /// A member or type identified only by its store key
    Member { key: String, state: BindingState },
    /// Emit the original text (labels, type parameters, package segments,
    /// members of receivers with unknown type)
    Keep,
}

/// Symbols, scopes and resolutions of one compilation unit
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_key: HashMap<String, SymbolId>,
    resolutions: HashMap<usize, Resolution>,
    pub scopes: ScopeGraph,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: ScopeGraph::new(),
            ..Self::default()
        }
    }

    /// Add a symbol; a second declaration with the same key reuses the first
    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        if let Some(id) = self.by_key.get(&symbol.qualified_name) {
            tracing::debug!("Duplicate declaration of {}", symbol.qualified_name);
            return *id;
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.by_key.insert(symbol.qualified_name.clone(), id);
        self.symbols.push(symbol);
        id
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| (SymbolId(i as u32), symbol))
    }

    pub fn symbols_mut(&mut self) -> impl Iterator<Item = &mut Symbol> {
        self.symbols.iter_mut()
    }

    /// Symbol declared in this unit under `key`
    pub fn id_of(&self, key: &str) -> Option<SymbolId> {
        self.by_key.get(key).copied()
    }

    /// Attach a resolution; the first one attached to a node wins
    pub fn resolve(&mut self, node: Node<'_>, resolution: Resolution) {
        self.resolutions.entry(node.id()).or_insert(resolution);
    }

    pub fn resolution(&self, node: Node<'_>) -> Option<&Resolution> {
        self.resolutions.get(&node.id())
    }

    pub fn is_resolved(&self, node: Node<'_>) -> bool {
        self.resolutions.contains_key(&node.id())
    }

    /// Store key and state of what `node` refers to, if it has one
    pub fn key_of(&self, node: Node<'_>) -> Option<(&str, BindingState)> {
        match self.resolution(node)? {
            Resolution::Local(id) => Some((self.symbol(*id).qualified_name.as_str(), BindingState::Valid)),
            Resolution::Member { key, state } => Some((key.as_str(), *state)),
            Resolution::Keep => None,
        }
    }

    /// Replacement text for an identifier node, `None` to keep the original
    pub fn replacement<'a>(&'a self, node: Node<'_>, store: &'a SymbolStore) -> Option<&'a str> {
        match self.resolution(node)? {
            Resolution::Local(id) => {
                let symbol = self.symbol(*id);
                symbol.is_renamed().then(|| symbol.display_name())
            }
            Resolution::Member { key, .. } => store.lookup(key),
            Resolution::Keep => None,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolutions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;

    #[test]
    fn test_duplicate_keys_share_a_symbol() {
        let mut table = SymbolTable::new();
        let a = table.add_symbol(Symbol::new("A.f()", SymbolKind::Method, "f"));
        let b = table.add_symbol(Symbol::new("A.f()", SymbolKind::Method, "f"));
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.id_of("A.f()"), Some(a));
    }
}
