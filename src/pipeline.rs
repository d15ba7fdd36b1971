//! Run orchestration
//!
//! One run is: load the store, discover and parse every file, index the
//! parsed set, then either collect symbols into the store (dump) or build
//! scopes and rewrite each file in place (fix). Failures of a single file
//! are recorded and the batch continues; only a store that cannot be loaded
//! or saved stops the run.

use crate::collect::{CollectStats, DumpFilter, SymbolCollector};
use crate::config::{RunMode, Settings};
use crate::discover::discover;
use crate::frontend::{CompilationUnit, FrontEnd, JavaParser, ProjectIndex};
use crate::naming::{NamingPolicy, Preserve, TypeDerived};
use crate::rewrite::Rewriter;
use crate::scope::ScopeBuilder;
use crate::store::SymbolStore;
use crate::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome of one run, for the summary table and the exit status
#[derive(Debug, Default)]
pub struct RunSummary {
    pub mode: RunMode,
    pub discovered: usize,
    pub parsed: usize,
    /// Files rewritten in place
    pub fixed: usize,
    /// Declarations given a new name
    pub renamed: usize,
    pub collected: CollectStats,
    pub store_loaded: usize,
    pub store_saved: Option<usize>,
    pub failures: Vec<(PathBuf, String)>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: &Path, error: &Error) {
        tracing::error!("{}", error);
        self.failures.push((path.to_path_buf(), error.to_string()));
    }
}

/// Drives a run over the configured paths
pub struct Orchestrator {
    settings: Settings,
    front_end: Box<dyn FrontEnd>,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            front_end: Box::new(JavaParser::new()),
        }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary {
            mode: self.settings.mode,
            ..RunSummary::default()
        };

        // a broken store is fatal before any file is touched
        let mut store = SymbolStore::load(&self.settings.symbols)?;
        summary.store_loaded = store.loaded_len();

        let files = discover(&self.settings.paths);
        summary.discovered = files.len();
        if files.is_empty() {
            tracing::warn!("No Java sources found");
        }

        let units = self.parse_all(&files, &mut summary);
        summary.parsed = units.len();
        let index = ProjectIndex::build(&units);
        tracing::debug!("Indexed {} types", index.len());

        match self.settings.mode {
            RunMode::Dump(filter) => self.dump(&units, &index, &mut store, filter, &mut summary)?,
            RunMode::Fix => self.fix(&units, &index, &store, &mut summary),
        }

        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    fn parse_all(&self, files: &[PathBuf], summary: &mut RunSummary) -> Vec<CompilationUnit> {
        let mut units = Vec::with_capacity(files.len());
        for path in files {
            match self.front_end.parse_file(path) {
                Ok(unit) => units.push(unit),
                Err(e) => summary.fail(path, &e),
            }
        }
        units
    }

    fn dump(
        &self,
        units: &[CompilationUnit],
        index: &ProjectIndex,
        store: &mut SymbolStore,
        filter: DumpFilter,
        summary: &mut RunSummary,
    ) -> Result<()> {
        eprintln!("Dumping {} symbols...", filter.as_str());

        let tables: Vec<_> = units
            .iter()
            .enumerate()
            .map(|(i, unit)| ScopeBuilder::new(unit, i, index, store, &Preserve).build())
            .collect();

        let mut collector = SymbolCollector::new(store, filter);
        for (unit, table) in units.iter().zip(&tables) {
            collector.collect(unit, table);
        }
        summary.collected = collector.totals();

        store.save(&self.settings.symbols)?;
        summary.store_saved = Some(store.len());
        eprintln!("Done.");
        Ok(())
    }

    fn fix(&self, units: &[CompilationUnit], index: &ProjectIndex, store: &SymbolStore, summary: &mut RunSummary) {
        let policy: &dyn NamingPolicy = if self.settings.rename_locals {
            &TypeDerived
        } else {
            &Preserve
        };
        let rewriter = Rewriter::new(store, self.settings.line_ending);

        for (i, unit) in units.iter().enumerate() {
            println!("Fixing {}", unit.path.display());

            let table = ScopeBuilder::new(unit, i, index, store, policy).build();
            summary.renamed += table.symbols().filter(|(_, symbol)| symbol.is_renamed()).count();
            let text = rewriter.rewrite(unit, &table);

            match replace_file(&unit.path, &text) {
                Ok(()) => summary.fixed += 1,
                Err(e) => summary.fail(&unit.path, &e),
            }
        }
    }
}

/// `F.fixed` for `F`
pub fn sibling_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".fixed");
    PathBuf::from(name)
}

/// Write `contents` next to `path`; the handle is flushed and closed on return
pub fn write_sibling(path: &Path, contents: &str) -> Result<PathBuf> {
    let fixed = sibling_path(path);
    let mut file = std::fs::File::create(&fixed).map_err(|e| Error::io(&fixed, e))?;
    file.write_all(contents.as_bytes()).map_err(|e| Error::io(&fixed, e))?;
    file.sync_all().map_err(|e| Error::io(&fixed, e))?;
    Ok(fixed)
}

/// Delete `path` and move `fixed` to its name
pub fn swap_into_place(fixed: &Path, path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|e| Error::io(path, e))?;
    std::fs::rename(fixed, path).map_err(|e| Error::io(fixed, e))
}

/// Replace a file's contents; the original survives any failed write
pub fn replace_file(path: &Path, contents: &str) -> Result<()> {
    let fixed = write_sibling(path, contents)?;
    swap_into_place(&fixed, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LineEnding;
    use tempfile::TempDir;

    fn settings(dir: &Path, mode: RunMode) -> Settings {
        Settings {
            paths: vec![dir.join("src")],
            symbols: dir.join("symbols.json"),
            line_ending: LineEnding::Lf,
            mode,
            rename_locals: false,
        }
    }

    fn write(path: &Path, text: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn test_fix_rewrites_in_place() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("src/Sample.java");
        write(
            &file,
            "class Sample { int compute(int a) { int b = a + a; { int a = 2; b += a; } return b; } }",
        );
        std::fs::write(
            dir.path().join("symbols.json"),
            r#"{"Sample.compute(int).a(param)": "index"}"#,
        )
        .unwrap();

        let summary = Orchestrator::new(settings(dir.path(), RunMode::Fix)).run().unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.fixed, 1);
        assert_eq!(summary.renamed, 1);

        let text = std::fs::read_to_string(&file).unwrap();
        assert!(text.contains("int compute(int index) {"));
        assert!(text.contains("int b = index + index;"));
        assert!(text.contains("int a = 2;"));
        assert!(!sibling_path(&file).exists());
    }

    #[test]
    fn test_syntax_error_isolated() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("src/Good.java");
        let bad = dir.path().join("src/Bad.java");
        write(&good, "class Good{}");
        write(&bad, "class Bad { void f( { }");

        let summary = Orchestrator::new(settings(dir.path(), RunMode::Fix)).run().unwrap();
        assert!(!summary.is_success());
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, bad);
        assert_eq!(summary.fixed, 1);
        assert_eq!(std::fs::read_to_string(&good).unwrap(), "class Good {}\n");
        assert_eq!(std::fs::read_to_string(&bad).unwrap(), "class Bad { void f( { }");
    }

    #[test]
    fn test_malformed_store_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("src/A.java");
        write(&file, "class A{}");
        std::fs::write(dir.path().join("symbols.json"), "{ not json").unwrap();

        let result = Orchestrator::new(settings(dir.path(), RunMode::Fix)).run();
        assert!(matches!(result, Err(Error::StoreFormat { .. })));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "class A{}");
    }

    #[test]
    fn test_failed_write_keeps_original() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("A.java");
        std::fs::write(&file, "class A{}").unwrap();
        // a directory where the temporary file would go
        std::fs::create_dir(sibling_path(&file)).unwrap();

        assert!(replace_file(&file, "class A {}\n").is_err());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "class A{}");
    }

    #[test]
    fn test_interrupted_replacement_keeps_original() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("A.java");
        std::fs::write(&file, "class A{}").unwrap();

        // the new text is on disk but the swap never ran
        let fixed = write_sibling(&file, "class A {}\n").unwrap();
        assert_eq!(fixed, sibling_path(&file));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "class A{}");
        assert_eq!(std::fs::read_to_string(&fixed).unwrap(), "class A {}\n");

        swap_into_place(&fixed, &file).unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "class A {}\n");
        assert!(!fixed.exists());
    }

    #[test]
    fn test_dumps_of_different_sources_accumulate() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("src/A.java");
        let b = dir.path().join("src/B.java");
        let store_path = dir.path().join("symbols.json");
        let merged = || SymbolStore::load(&store_path).unwrap().merged();
        let valid = settings(dir.path(), RunMode::Dump(DumpFilter::Valid));

        write(&a, "class A { int alpha; }");
        Orchestrator::new(valid.clone()).run().unwrap();
        let after_a = merged();
        assert_eq!(after_a["A.alpha"], Some("alpha".to_string()));

        std::fs::remove_file(&a).unwrap();
        write(&b, "class B { int beta; }");
        Orchestrator::new(valid.clone()).run().unwrap();
        let after_b = merged();
        assert_eq!(after_b["B.beta"], Some("beta".to_string()));
        for (key, value) in &after_a {
            assert_eq!(after_b.get(key), Some(value), "{} was pruned", key);
        }

        std::fs::remove_file(&b).unwrap();
        write(&a, "class A { int alpha; }");
        Orchestrator::new(valid).run().unwrap();
        assert_eq!(merged(), after_b);
    }

    #[test]
    fn test_long_concatenation() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("src/Deep.java");
        let chain = vec!["a"; 10_000].join(" + ");
        write(
            &file,
            &format!("class Deep{{String f(String a){{return {};}}}}", chain),
        );

        let dump = settings(dir.path(), RunMode::Dump(DumpFilter::Valid));
        let summary = Orchestrator::new(dump).run().unwrap();
        assert!(summary.is_success());
        let store = SymbolStore::load(&dir.path().join("symbols.json")).unwrap();
        assert_eq!(store.lookup("Deep.f(String).a(param)"), Some("a"));

        let summary = Orchestrator::new(settings(dir.path(), RunMode::Fix)).run().unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.fixed, 1);
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            format!(
                "class Deep {{\n\tString f(String a) {{\n\t\treturn {};\n\t}}\n}}\n",
                chain
            )
        );
    }

    #[test]
    fn test_dump_modes_merge() {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("src/p/Sample.java"),
            "package p;\nclass Sample { int compute(int a) { return helper(a); } }\n",
        );
        let store_path = dir.path().join("symbols.json");
        let merged = || SymbolStore::load(&store_path).unwrap().merged();

        let valid = settings(dir.path(), RunMode::Dump(DumpFilter::Valid));
        let summary = Orchestrator::new(valid.clone()).run().unwrap();
        assert!(summary.store_saved.is_some());
        let after_valid = merged();
        assert_eq!(after_valid["p.Sample.compute(int).a(param)"], Some("a".to_string()));
        assert!(!after_valid.contains_key("p.Sample.helper(?)"));

        let missing = settings(dir.path(), RunMode::Dump(DumpFilter::Missing));
        Orchestrator::new(missing).run().unwrap();
        let after_missing = merged();
        assert_eq!(after_missing["p.Sample.helper(?)"], None);
        for (key, value) in &after_valid {
            assert_eq!(after_missing.get(key), Some(value), "{} was pruned", key);
        }

        Orchestrator::new(valid).run().unwrap();
        assert_eq!(merged(), after_missing);
    }

    #[test]
    fn test_dump_leaves_sources_alone() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("src/A.java");
        write(&file, "class A{int x;}");

        let summary = Orchestrator::new(settings(dir.path(), RunMode::Dump(DumpFilter::Valid)))
            .run()
            .unwrap();
        assert_eq!(summary.fixed, 0);
        assert_eq!(summary.collected.valid, 2);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "class A{int x;}");
    }
}
