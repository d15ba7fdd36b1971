//! Symbol types
//!
//! Every declared entity javafix can rename maps to one of five kinds:
//! - `Type`: class, interface, enum, record, annotation type
//! - `Field`: field, enum constant, record component
//! - `Method`: method or constructor
//! - `Parameter`: formal parameter of a method or constructor
//! - `LocalVariable`: local, lambda, catch, loop, resource and pattern variable

/// Kind of a declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Type,
    Field,
    Method,
    Parameter,
    LocalVariable,
}

impl SymbolKind {
    /// Get the string representation of the symbol kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Type => "type",
            SymbolKind::Field => "field",
            SymbolKind::Method => "method",
            SymbolKind::Parameter => "parameter",
            SymbolKind::LocalVariable => "local",
        }
    }

    /// Parameters and locals are the only symbols the naming heuristic may touch
    pub fn is_variable(&self) -> bool {
        matches!(self, SymbolKind::Parameter | SymbolKind::LocalVariable)
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Index of a symbol inside one unit's symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// A declared entity of one compilation unit.
///
/// The qualified name is the symbol's identity and the key it is stored
/// under in the symbol dictionary.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Canonical identity (store key)
    pub qualified_name: String,
    /// What was declared
    pub kind: SymbolKind,
    /// The identifier as written at the declaration site
    pub declared_name: String,
    /// Display name chosen for this run, if any
    pub resolved_name: Option<String>,
    /// Declared type as written, generics stripped (variables, fields, methods)
    pub declared_type: Option<String>,
}

impl Symbol {
    /// Create a new symbol with no display name
    pub fn new(
        qualified_name: impl Into<String>,
        kind: SymbolKind,
        declared_name: impl Into<String>,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind,
            declared_name: declared_name.into(),
            resolved_name: None,
            declared_type: None,
        }
    }

    /// The text the rewriter emits for this symbol
    pub fn display_name(&self) -> &str {
        self.resolved_name.as_deref().unwrap_or(&self.declared_name)
    }

    /// Whether emitting this symbol changes the source
    pub fn is_renamed(&self) -> bool {
        self.resolved_name
            .as_deref()
            .is_some_and(|name| name != self.declared_name)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.qualified_name == other.qualified_name
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.qualified_name.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_kind_display() {
        assert_eq!(SymbolKind::LocalVariable.to_string(), "local");
        assert!(SymbolKind::Parameter.is_variable());
        assert!(!SymbolKind::Field.is_variable());
    }

    #[test]
    fn test_display_name() {
        let mut symbol = Symbol::new("Sample.compute(int).a(param)", SymbolKind::Parameter, "a");
        assert_eq!(symbol.display_name(), "a");
        assert!(!symbol.is_renamed());

        symbol.resolved_name = Some("index".to_string());
        assert_eq!(symbol.display_name(), "index");
        assert!(symbol.is_renamed());

        symbol.resolved_name = Some("a".to_string());
        assert!(!symbol.is_renamed());
    }
}
