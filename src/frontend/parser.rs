//! Java parsing through tree-sitter
//!
//! The parser is the only place that knows tree-sitter's entry points; the
//! rest of the crate sees a [`CompilationUnit`] holding the normalized
//! source text and its syntax tree.

use crate::{Error, Result};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tree_sitter::{Language, Node, Parser, Tree};

/// One parsed source file
pub struct CompilationUnit {
    /// Path the source was read from
    pub path: PathBuf,
    /// Source text with every line terminator normalized to `\n`
    pub source: String,
    /// Syntax tree over `source`
    pub tree: Tree,
}

impl std::fmt::Debug for CompilationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationUnit")
            .field("path", &self.path)
            .field("bytes", &self.source.len())
            .finish()
    }
}

impl CompilationUnit {
    /// Root node of the tree
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text of a node
    pub fn text(&self, node: Node<'_>) -> &str {
        &self.source[node.start_byte()..node.end_byte()]
    }
}

/// The narrow front-end interface: text in, tree or syntax error out
pub trait FrontEnd {
    fn parse(&self, path: &Path, text: &str) -> Result<CompilationUnit>;

    /// Read a file as UTF-8 and parse it
    fn parse_file(&self, path: &Path) -> Result<CompilationUnit> {
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let text = std::str::from_utf8(&bytes)?;
        self.parse(path, text)
    }
}

/// tree-sitter-java front end
pub struct JavaParser {
    language: Language,
}

impl JavaParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_java::LANGUAGE.into(),
        }
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontEnd for JavaParser {
    fn parse(&self, path: &Path, text: &str) -> Result<CompilationUnit> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| Error::Parser(format!("Failed to set language: {}", e)))?;

        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let source = normalize_line_endings(text).into_owned();

        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| Error::Parser(format!("Failed to parse {}", path.display())))?;

        if let Some(bad) = first_error(tree.root_node()) {
            let position = bad.start_position();
            let snippet: String = source[bad.start_byte()..bad.end_byte()]
                .lines()
                .next()
                .unwrap_or("")
                .chars()
                .take(40)
                .collect();
            return Err(Error::Syntax {
                path: path.to_path_buf(),
                line: position.row + 1,
                column: position.column + 1,
                snippet: if snippet.is_empty() { bad.kind().to_string() } else { snippet },
            });
        }

        Ok(CompilationUnit {
            path: path.to_path_buf(),
            source,
            tree,
        })
    }
}

/// Rewrite `\r\n` and lone `\r` to `\n`
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// First ERROR or MISSING node in document order
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_unit() {
        let parser = JavaParser::new();
        let unit = parser
            .parse(Path::new("A.java"), "class A {\r\n  int x;\r\n}\r\n")
            .unwrap();
        assert_eq!(unit.root().kind(), "program");
        assert!(!unit.source.contains('\r'));
        assert_eq!(unit.text(unit.root().named_child(0).unwrap()), "class A {\n  int x;\n}");
    }

    #[test]
    fn test_syntax_error_reports_position() {
        let parser = JavaParser::new();
        let err = parser
            .parse(Path::new("B.java"), "class B {\n  void f( {\n}\n")
            .unwrap_err();
        match err {
            Error::Syntax { path, line, .. } => {
                assert_eq!(path, PathBuf::from("B.java"));
                assert!(line >= 1);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_file_rejects_invalid_utf8() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("C.java");
        let mut bytes = b"class C { }".to_vec();
        bytes.push(0xff);
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(JavaParser::new().parse_file(&path), Err(Error::Utf8(_))));

        std::fs::write(&path, "\u{feff}class C { }").unwrap();
        let unit = JavaParser::new().parse_file(&path).unwrap();
        assert_eq!(unit.source, "class C { }");
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\n"), "a\nb\nc\n");
        assert!(matches!(normalize_line_endings("a\nb"), Cow::Borrowed(_)));
    }
}
