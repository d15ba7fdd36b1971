//! Token stream emission
//!
//! Flattens a syntax tree into its tokens, substitutes identifier text from
//! the symbol table, and joins the tokens with the gaps chosen by
//! [`layout`](super::layout).

use super::layout::{allows_blank, closes_declaration_annotation, depth_step, gap_between, is_atomic, Gap, Token};
use crate::frontend::CompilationUnit;
use crate::scope::SymbolTable;
use crate::store::SymbolStore;
use tree_sitter::Node;

/// Leaves and atomic nodes in source order, identifiers substituted
pub fn tokens<'t, 's>(
    unit: &'t CompilationUnit,
    table: &'s SymbolTable,
    store: &'s SymbolStore,
) -> Vec<Token<'t, 's>>
where
    't: 's,
{
    let mut out = Vec::new();
    let mut cursor = unit.root().walk();
    // nodes above the cursor, outermost first, with their depths
    let mut ancestors: Vec<Node<'t>> = Vec::new();
    let mut depths: Vec<usize> = Vec::new();
    let mut descend = true;

    loop {
        let node = cursor.node();
        let depth = match (ancestors.last(), depths.last()) {
            (Some(&parent), Some(&parent_depth)) => parent_depth + depth_step(parent, node),
            _ => 0,
        };

        if descend && (node.child_count() == 0 || is_atomic(node)) {
            if node.start_byte() < node.end_byte() {
                let text = match node.kind() {
                    "identifier" | "type_identifier" => table
                        .replacement(node, store)
                        .unwrap_or_else(|| unit.text(node)),
                    _ => unit.text(node),
                };
                out.push(Token {
                    node,
                    text,
                    parent: ancestors.last().copied(),
                    grandparent: ancestors.len().checked_sub(2).map(|i| ancestors[i]),
                    depth,
                    ends_annotation: closes_declaration_annotation(node, &ancestors),
                });
            }
            descend = false;
        }

        if descend && cursor.goto_first_child() {
            ancestors.push(node);
            depths.push(depth);
            continue;
        }
        if cursor.goto_next_sibling() {
            descend = true;
            continue;
        }
        if !cursor.goto_parent() {
            break;
        }
        ancestors.pop();
        depths.pop();
        descend = false;
    }
    out
}

/// Assembles the output text
pub struct Emitter<'u> {
    source: &'u str,
    eol: &'static str,
    out: String,
}

impl<'u> Emitter<'u> {
    pub fn new(source: &'u str, eol: &'static str) -> Self {
        Self {
            source,
            eol,
            out: String::with_capacity(source.len() + source.len() / 8),
        }
    }

    /// Emit every token and return the finished text
    pub fn emit(mut self, tokens: &[Token<'_, '_>]) -> String {
        let mut last_code: Option<&Token<'_, '_>> = None;
        let mut gap_before_prev = Gap::Newline;

        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                let prev = &tokens[i - 1];
                let gap = self.gap(prev, last_code, gap_before_prev, token);
                self.separate(gap, token.depth);
                gap_before_prev = gap;
            }
            self.push_verbatim(token.text);
            if !token.is_comment() {
                last_code = Some(token);
            }
        }

        while self.out.ends_with([' ', '\t', '\n', '\r']) {
            self.out.pop();
        }
        self.out.push_str(self.eol);
        self.out
    }

    fn gap(
        &self,
        prev: &Token<'_, '_>,
        last_code: Option<&Token<'_, '_>>,
        gap_before_prev: Gap,
        next: &Token<'_, '_>,
    ) -> Gap {
        let breaks = self.line_breaks(prev, next);

        if next.is_comment() {
            // comments keep their own-line or trailing placement
            if breaks == 0 {
                return if prev.is_comment() {
                    Gap::Space
                } else {
                    match gap_between(prev, next) {
                        Gap::Glue => Gap::Glue,
                        _ => Gap::Space,
                    }
                };
            }
            return self.line_gap(breaks, prev, next);
        }

        if prev.is_comment() {
            if prev.node.kind() == "line_comment" || breaks > 0 {
                return self.line_gap(breaks, prev, next);
            }
            // an inline comment sits tight against one side only
            return match last_code {
                Some(code) => match gap_between(code, next) {
                    Gap::Glue if gap_before_prev == Gap::Glue => Gap::Space,
                    gap => gap,
                },
                None => Gap::Newline,
            };
        }

        let gap = gap_between(prev, next);
        if gap == Gap::Newline && breaks >= 2 && allows_blank(prev, next) {
            return Gap::Blank;
        }
        gap
    }

    fn line_gap(&self, breaks: usize, prev: &Token<'_, '_>, next: &Token<'_, '_>) -> Gap {
        if breaks >= 2 && allows_blank(prev, next) {
            Gap::Blank
        } else {
            Gap::Newline
        }
    }

    /// Line breaks in the source between two tokens
    fn line_breaks(&self, prev: &Token<'_, '_>, next: &Token<'_, '_>) -> usize {
        let between = self
            .source
            .get(prev.node.end_byte()..next.node.start_byte())
            .unwrap_or("");
        between.bytes().filter(|b| *b == b'\n').count()
    }

    fn separate(&mut self, gap: Gap, depth: usize) {
        match gap {
            Gap::Glue => {}
            Gap::Space => self.out.push(' '),
            Gap::Newline | Gap::Blank => {
                self.end_line();
                if gap == Gap::Blank {
                    self.out.push_str(self.eol);
                }
                for _ in 0..depth {
                    self.out.push('\t');
                }
            }
        }
    }

    fn end_line(&mut self) {
        while self.out.ends_with([' ', '\t']) {
            self.out.pop();
        }
        self.out.push_str(self.eol);
    }

    /// Token text with its internal line breaks converted
    fn push_verbatim(&mut self, text: &str) {
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            self.out.push_str(first);
        }
        for line in lines {
            self.out.push_str(self.eol);
            self.out.push_str(line);
        }
    }
}
