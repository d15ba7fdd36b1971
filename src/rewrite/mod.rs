//! Source regeneration
//!
//! Turns a parsed unit plus its symbol table back into Java text. The tree
//! is never modified: identifier text comes from the table's resolutions
//! and the store, everything else from the original source, and the layout
//! is rebuilt from scratch:
//! - one tab per nesting level of `{ }` bodies
//! - opening braces stay on the line of their header
//! - one statement or member per line, single blank lines preserved
//! - comments keep their trailing or own-line placement

pub mod emitter;
pub mod layout;

use crate::config::LineEnding;
use crate::frontend::CompilationUnit;
use crate::scope::SymbolTable;
use crate::store::SymbolStore;
use emitter::Emitter;

/// Regenerates source text for analyzed units
pub struct Rewriter<'s> {
    store: &'s SymbolStore,
    line_ending: LineEnding,
}

impl<'s> Rewriter<'s> {
    pub fn new(store: &'s SymbolStore, line_ending: LineEnding) -> Self {
        Self { store, line_ending }
    }

    /// Full replacement text for one unit
    pub fn rewrite(&self, unit: &CompilationUnit, table: &SymbolTable) -> String {
        let tokens = emitter::tokens(unit, table, self.store);
        tracing::trace!("{}: {} tokens", unit.path.display(), tokens.len());
        Emitter::new(&unit.source, self.line_ending.as_str()).emit(&tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{FrontEnd, JavaParser, ProjectIndex};
    use crate::naming::{Preserve, TypeDerived};
    use crate::scope::ScopeBuilder;
    use std::path::Path;

    fn rewrite_with(source: &str, store: &SymbolStore, line_ending: LineEnding) -> String {
        let unit = JavaParser::new().parse(Path::new("Sample.java"), source).unwrap();
        let units = vec![unit];
        let index = ProjectIndex::build(&units);
        let table = ScopeBuilder::new(&units[0], 0, &index, store, &Preserve).build();
        Rewriter::new(store, line_ending).rewrite(&units[0], &table)
    }

    fn rewrite(source: &str) -> String {
        rewrite_with(source, &SymbolStore::new(), LineEnding::Lf)
    }

    fn store(json: &str) -> SymbolStore {
        SymbolStore::from_json(Path::new("mem"), json).unwrap()
    }

    #[test]
    fn test_layout_of_class() {
        let out = rewrite(
            "package a.b;\nimport java.util.List;\npublic class Sample{private int x=1;\n\n\n\
             @Override public String toString(){if(x>0){return \"p\";}else{return \"n\";}}}",
        );
        assert_eq!(
            out,
            "package a.b;\n\
             import java.util.List;\n\
             public class Sample {\n\
             \tprivate int x = 1;\n\
             \n\
             \t@Override\n\
             \tpublic String toString() {\n\
             \t\tif (x > 0) {\n\
             \t\t\treturn \"p\";\n\
             \t\t} else {\n\
             \t\t\treturn \"n\";\n\
             \t\t}\n\
             \t}\n\
             }\n"
        );
    }

    #[test]
    fn test_expressions_and_generics() {
        let out = rewrite(
            "class S { void f(String... args) { java.util.List<java.util.Map<String, Integer>> m = new java.util.ArrayList<>(); \
             int[] a = {1, 2}; int i = -a[0]; i++; --i; boolean b = !(i >= 2); for (int j = 0; j < 2; j++) { } \
             Runnable r = () -> {}; java.util.function.Function<String, Integer> g = Integer::parseInt; } }",
        );
        assert!(out.contains("\tvoid f(String... args) {\n"));
        assert!(out.contains("java.util.List<java.util.Map<String, Integer>> m = new java.util.ArrayList<>();"));
        assert!(out.contains("int[] a = {1, 2};"));
        assert!(out.contains("int i = -a[0];"));
        assert!(out.contains("\t\ti++;\n"));
        assert!(out.contains("\t\t--i;\n"));
        assert!(out.contains("boolean b = !(i >= 2);"));
        assert!(out.contains("for (int j = 0; j < 2; j++) {}"));
        assert!(out.contains("Runnable r = () -> {};"));
        assert!(out.contains("Integer::parseInt;"));
    }

    #[test]
    fn test_switch_groups_and_rules() {
        let out = rewrite(
            "class S { int f(int x) { switch (x) { case 1: x++; break; default: x--; } \
             return switch (x) { case 1 -> 2; default -> { yield 3; } }; } }",
        );
        assert!(out.contains(
            "\t\tswitch (x) {\n\
             \t\t\tcase 1:\n\
             \t\t\t\tx++;\n\
             \t\t\t\tbreak;\n\
             \t\t\tdefault:\n\
             \t\t\t\tx--;\n\
             \t\t}\n"
        ));
        assert!(out.contains(
            "\t\treturn switch (x) {\n\
             \t\t\tcase 1 -> 2;\n\
             \t\t\tdefault -> {\n\
             \t\t\t\tyield 3;\n\
             \t\t\t}\n\
             \t\t};\n"
        ));
    }

    #[test]
    fn test_comments_keep_placement() {
        let out = rewrite(
            "/* header */\nclass S {\n  // own line\n  int x; // trailing\n  void f() { g(/* arg */ 1); }\n  void g(int a) {}\n}\n",
        );
        assert_eq!(
            out,
            "/* header */\n\
             class S {\n\
             \t// own line\n\
             \tint x; // trailing\n\
             \tvoid f() {\n\
             \t\tg(/* arg */ 1);\n\
             \t}\n\
             \tvoid g(int a) {}\n\
             }\n"
        );
    }

    #[test]
    fn test_idempotent() {
        let source = "package p;\n\n/** Doc\n * more\n */\npublic final class S extends Object implements Runnable {\n\
            static { System.out.println(\"x\"); }\n  @SuppressWarnings(\"unchecked\")\n  public void run() { try (java.io.StringReader r = new java.io.StringReader(\"a\")) { r.read(); }\n\
            catch (java.io.IOException | RuntimeException e) { e.printStackTrace(); } finally { }\n\
            do { } while (false);\n outer: for (String s : new String[] {\"a\"}) { if (s instanceof String t) break outer; }\n\
            Object o = new Object() { @Override public int hashCode() { return 1; } };\n\n\n  }\n\
            enum E { A, B { void m() {} }; void m() {} }\n  record R(int x) {}\n}\n";
        let once = rewrite(source);
        let twice = rewrite(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_line_endings() {
        let source = "class S {\r\n  String t = \"\"\"\r\n    text\r\n    \"\"\";\r\n  /* a\r\n   b */\r\n}\r\n";
        let crlf = rewrite_with(source, &SymbolStore::new(), LineEnding::CrLf);
        assert!(crlf.ends_with("}\r\n"));
        assert!(!crlf.ends_with("\r\n\r\n"));
        assert_eq!(crlf.matches('\n').count(), crlf.matches("\r\n").count());
        assert!(crlf.contains("\"\"\"\r\n    text\r\n    \"\"\""));

        let cr = rewrite_with(source, &SymbolStore::new(), LineEnding::Cr);
        assert!(!cr.contains('\n'));
        assert!(cr.ends_with("}\r"));

        let lf = rewrite_with(source, &SymbolStore::new(), LineEnding::Lf);
        assert!(!lf.contains('\r'));
        assert!(lf.ends_with("}\n"));
    }

    #[test]
    fn test_parameter_renamed_local_shadow_kept() {
        let source = "class Sample {\n\
                        int compute(int a) {\n\
                          int b = a + a;\n\
                          {\n\
                            int a = 2;\n\
                            b += a;\n\
                          }\n\
                          return b;\n\
                        }\n\
                      }\n";
        let store = store(r#"{"Sample.compute(int).a(param)": "index"}"#);
        let out = rewrite_with(source, &store, LineEnding::Lf);
        assert_eq!(
            out,
            "class Sample {\n\
             \tint compute(int index) {\n\
             \t\tint b = index + index;\n\
             \t\t{\n\
             \t\t\tint a = 2;\n\
             \t\t\tb += a;\n\
             \t\t}\n\
             \t\treturn b;\n\
             \t}\n\
             }\n"
        );
    }

    #[test]
    fn test_shadowing_local_renamed_parameter_kept() {
        let source = "class Sample {\n\
                        int compute(int a) {\n\
                          int b = a + a;\n\
                          {\n\
                            int a = 2;\n\
                            b += a;\n\
                          }\n\
                          return b;\n\
                        }\n\
                      }\n";
        let store = store(r#"{"Sample.compute(int).a(local#1)": "other"}"#);
        let out = rewrite_with(source, &store, LineEnding::Lf);
        assert_eq!(
            out,
            "class Sample {\n\
             \tint compute(int a) {\n\
             \t\tint b = a + a;\n\
             \t\t{\n\
             \t\t\tint other = 2;\n\
             \t\t\tb += other;\n\
             \t\t}\n\
             \t\treturn b;\n\
             \t}\n\
             }\n"
        );
    }

    #[test]
    fn test_renames_reach_every_reference() {
        let files = [
            (
                "a/Base.java",
                "package a;\npublic class Base { protected int count; public void bump(int by) { count += by; } }\n",
            ),
            (
                "a/Child.java",
                "package a;\npublic class Child extends Base { void run() { bump(2); this.count = count + 1; Base b = new Child(); b.bump(count); } }\n",
            ),
        ];
        let parser = JavaParser::new();
        let units: Vec<_> = files
            .iter()
            .map(|(path, text)| parser.parse(Path::new(path), text).unwrap())
            .collect();
        let index = ProjectIndex::build(&units);
        let store = store(
            r#"{"a.Base": "Counter", "a.Base.count": "total", "a.Base.bump(int)": "add", "a.Child": "Derived"}"#,
        );

        let rewriter = Rewriter::new(&store, LineEnding::Lf);
        let outputs: Vec<String> = units
            .iter()
            .enumerate()
            .map(|(i, unit)| {
                let table = ScopeBuilder::new(unit, i, &index, &store, &Preserve).build();
                rewriter.rewrite(unit, &table)
            })
            .collect();

        assert!(outputs[0].contains("public class Counter {"));
        assert!(outputs[0].contains("protected int total;"));
        assert!(outputs[0].contains("public void add(int by) {"));
        assert!(outputs[0].contains("total += by;"));
        assert!(outputs[1].contains("public class Derived extends Counter {"));
        assert!(outputs[1].contains("add(2);"));
        assert!(outputs[1].contains("this.total = total + 1;"));
        assert!(outputs[1].contains("Counter b = new Derived();"));
        assert!(outputs[1].contains("b.add(total);"));
        for output in &outputs {
            assert!(!output.contains("count"));
            assert!(!output.contains("bump"));
        }
    }

    #[test]
    fn test_policy_names_applied() {
        let source = "class S { void f(StringBuilder a) { a.append(1); } }";
        let unit = JavaParser::new().parse(Path::new("S.java"), source).unwrap();
        let units = vec![unit];
        let index = ProjectIndex::build(&units);
        let store = SymbolStore::new();
        let table = ScopeBuilder::new(&units[0], 0, &index, &store, &TypeDerived).build();
        let out = Rewriter::new(&store, LineEnding::Lf).rewrite(&units[0], &table);
        assert!(out.contains("void f(StringBuilder stringBuilder) {"));
        assert!(out.contains("stringBuilder.append(1);"));
    }

    #[test]
    fn test_empty_unit() {
        assert_eq!(rewrite(""), "\n");
        assert_eq!(rewrite_with("", &SymbolStore::new(), LineEnding::CrLf), "\r\n");
    }
}
