//! Symbol collection for dump mode
//!
//! Walks every identifier of a unit in source order and classifies it from
//! the resolution the scope builder attached:
//! - `Valid`: a declaration or a reference whose declaration was found
//! - `Missing`: a reference to something outside the analyzed set
//! - neither: labels, type variables, package segments and members of
//!   receivers whose type is unknown
//!
//! Only the classification selected by [`DumpFilter`] is written to the
//! store; the other is still counted.

use crate::frontend::syntax::children;
use crate::frontend::CompilationUnit;
use crate::scope::{BindingState, SymbolTable};
use crate::store::{SymbolState, SymbolStore};
use std::ops::AddAssign;

/// Which classification a dump persists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFilter {
    Valid,
    Missing,
}

impl DumpFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            DumpFilter::Valid => "valid",
            DumpFilter::Missing => "missing",
        }
    }
}

/// Identifier counts of a collection pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub valid: usize,
    pub missing: usize,
    /// Identifiers without a key
    pub kept: usize,
    /// Store writes made
    pub recorded: usize,
}

impl AddAssign for CollectStats {
    fn add_assign(&mut self, other: Self) {
        self.valid += other.valid;
        self.missing += other.missing;
        self.kept += other.kept;
        self.recorded += other.recorded;
    }
}

/// Feeds classified identifiers into the store
pub struct SymbolCollector<'s> {
    store: &'s mut SymbolStore,
    filter: DumpFilter,
    totals: CollectStats,
}

impl<'s> SymbolCollector<'s> {
    pub fn new(store: &'s mut SymbolStore, filter: DumpFilter) -> Self {
        Self {
            store,
            filter,
            totals: CollectStats::default(),
        }
    }

    /// Classify and record every identifier of one unit
    pub fn collect(&mut self, unit: &CompilationUnit, table: &SymbolTable) -> CollectStats {
        let mut stats = CollectStats::default();
        let mut stack = vec![unit.root()];

        while let Some(node) = stack.pop() {
            let mut kids = children(node);
            kids.reverse();
            stack.extend(kids);

            if !matches!(node.kind(), "identifier" | "type_identifier") {
                continue;
            }
            let Some((key, state)) = table.key_of(node) else {
                stats.kept += 1;
                continue;
            };

            match state {
                BindingState::Valid => {
                    stats.valid += 1;
                    if self.filter == DumpFilter::Valid {
                        // a name chosen in an earlier run stays
                        let name = self
                            .store
                            .lookup(key)
                            .unwrap_or_else(|| unit.text(node))
                            .to_string();
                        self.store.record(key, SymbolState::Valid(name));
                        stats.recorded += 1;
                    }
                }
                BindingState::Missing => {
                    stats.missing += 1;
                    // a missing-only dump never replaces a known name
                    if self.filter == DumpFilter::Missing && self.store.lookup(key).is_none() {
                        self.store.record(key, SymbolState::Missing);
                        stats.recorded += 1;
                    }
                }
            }
        }

        tracing::debug!(
            "{}: {} valid, {} missing, {} kept",
            unit.path.display(),
            stats.valid,
            stats.missing,
            stats.kept
        );
        self.totals += stats;
        stats
    }

    /// Totals over every unit collected so far
    pub fn totals(&self) -> CollectStats {
        self.totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{FrontEnd, JavaParser, ProjectIndex};
    use crate::naming::Preserve;
    use crate::scope::ScopeBuilder;
    use std::path::Path;

    const SOURCE: &str = "class Sample {\n\
                            int compute(int a) { return a + helper(a); }\n\
                            void run() { outer: while (true) { break outer; } }\n\
                          }\n";

    fn dump(store: &mut SymbolStore, filter: DumpFilter) -> CollectStats {
        let unit = JavaParser::new().parse(Path::new("Sample.java"), SOURCE).unwrap();
        let units = vec![unit];
        let index = ProjectIndex::build(&units);
        let table = ScopeBuilder::new(&units[0], 0, &index, store, &Preserve).build();
        let mut collector = SymbolCollector::new(store, filter);
        collector.collect(&units[0], &table);
        collector.totals()
    }

    #[test]
    fn test_dump_valid_records_declarations_and_references() {
        let mut store = SymbolStore::new();
        let stats = dump(&mut store, DumpFilter::Valid);

        let merged = store.merged();
        assert_eq!(merged["Sample"], Some("Sample".to_string()));
        assert_eq!(merged["Sample.compute(int)"], Some("compute".to_string()));
        assert_eq!(merged["Sample.compute(int).a(param)"], Some("a".to_string()));
        assert!(!merged.contains_key("Sample.helper(?)"));
        assert_eq!(stats.missing, 1);
        // two label identifiers
        assert_eq!(stats.kept, 2);
    }

    #[test]
    fn test_dump_missing_records_sentinels_only() {
        let mut store = SymbolStore::new();
        let stats = dump(&mut store, DumpFilter::Missing);

        let merged = store.merged();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["Sample.helper(?)"], None);
        assert_eq!(stats.recorded, 1);
        assert!(stats.valid > 0);
    }

    #[test]
    fn test_dump_keeps_chosen_names() {
        let mut store =
            SymbolStore::from_json(Path::new("mem"), r#"{"Sample.compute(int).a(param)": "index"}"#).unwrap();
        dump(&mut store, DumpFilter::Valid);
        assert_eq!(store.lookup("Sample.compute(int).a(param)"), Some("index"));
    }
}
