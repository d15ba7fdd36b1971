//! Whitespace rules between adjacent tokens
//!
//! Every pair of neighbouring tokens gets one [`Gap`]. The token before
//! and the token after each state a preference; a newline preference wins,
//! then a glue preference, and anything else is a single space. Pair rules
//! (empty bodies, tokens that would fuse) and the blank lines of the source
//! are applied on top.

use tree_sitter::Node;

/// Nodes whose braces open an indented region
pub const BODY_KINDS: &[&str] = &[
    "block",
    "class_body",
    "interface_body",
    "enum_body",
    "annotation_type_body",
    "constructor_body",
    "switch_block",
    "module_body",
];

/// Node kinds emitted as one verbatim token
pub const ATOMIC_KINDS: &[&str] = &[
    "string_literal",
    "character_literal",
    "line_comment",
    "block_comment",
    "comment",
];

/// Declarations whose annotations sit on their own line
const DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
    "field_declaration",
    "constant_declaration",
    "annotation_type_element_declaration",
    "package_declaration",
];

/// Whitespace between two tokens, ordered by strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Gap {
    Glue,
    Space,
    Newline,
    Blank,
}

/// A leaf or atomic node together with the context the gap rules read
#[derive(Debug, Clone)]
pub struct Token<'t, 's> {
    pub node: Node<'t>,
    pub text: &'s str,
    pub parent: Option<Node<'t>>,
    pub grandparent: Option<Node<'t>>,
    /// Indentation when the token starts a line
    pub depth: usize,
    /// Last token of an annotation placed on a declaration
    pub ends_annotation: bool,
}

impl Token<'_, '_> {
    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    pub fn is_comment(&self) -> bool {
        is_comment(self.node)
    }

    fn parent_kind(&self) -> Option<&'static str> {
        self.parent.map(|p| p.kind())
    }

    fn is_first_child(&self) -> bool {
        self.parent
            .and_then(|p| p.child(0))
            .is_some_and(|first| first.id() == self.node.id())
    }
}

pub fn is_body(node: Node<'_>) -> bool {
    BODY_KINDS.contains(&node.kind())
}

pub fn is_atomic(node: Node<'_>) -> bool {
    ATOMIC_KINDS.contains(&node.kind())
}

pub fn is_comment(node: Node<'_>) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment" | "comment")
}

/// Indentation added by `parent` for its child `child`
pub fn depth_step(parent: Node<'_>, child: Node<'_>) -> usize {
    let mut step = 0;
    // a body's own braces stay at the header's level
    if is_body(parent) && !matches!(child.kind(), "{" | "}") {
        step += 1;
    }
    if parent.kind() == "switch_block_statement_group" && !matches!(child.kind(), "switch_label" | ":") {
        step += 1;
    }
    step
}

/// Whether `token`, under `ancestors` (outermost first), closes an annotation on a declaration
pub fn closes_declaration_annotation(token: Node<'_>, ancestors: &[Node<'_>]) -> bool {
    let mut outward = ancestors.iter().rev();
    while let Some(parent) = outward.next() {
        if parent.end_byte() != token.end_byte() {
            return false;
        }
        if matches!(parent.kind(), "annotation" | "marker_annotation") {
            let holder = match outward.next() {
                Some(holder) if holder.kind() == "modifiers" => outward.next(),
                holder => holder,
            };
            return holder.is_some_and(|h| DECLARATION_KINDS.contains(&h.kind()));
        }
    }
    false
}

/// `{` or `}` of a body node
fn is_body_brace(token: &Token<'_, '_>, brace: &str) -> bool {
    token.kind() == brace && token.parent.is_some_and(is_body)
}

/// `{` or `}` of an array initializer
fn is_initializer_brace(token: &Token<'_, '_>, brace: &str) -> bool {
    token.kind() == brace
        && matches!(
            token.parent_kind(),
            Some("array_initializer" | "element_value_array_initializer")
        )
}

/// `<` or `>` delimiting type arguments or type parameters
fn is_angle(token: &Token<'_, '_>) -> bool {
    matches!(token.kind(), "<" | ">")
        && matches!(token.parent_kind(), Some("type_arguments" | "type_parameters"))
}

/// Prefix operator of a unary or update expression
fn is_prefix_operator(token: &Token<'_, '_>) -> bool {
    match token.parent_kind() {
        Some("unary_expression") => token.is_first_child(),
        Some("update_expression") => matches!(token.kind(), "++" | "--") && token.is_first_child(),
        _ => false,
    }
}

/// Postfix `++` / `--`
fn is_postfix_operator(token: &Token<'_, '_>) -> bool {
    matches!(token.kind(), "++" | "--")
        && token.parent_kind() == Some("update_expression")
        && !token.is_first_child()
}

/// Tokens a call or annotation argument list attaches to
fn is_callee_like(token: &Token<'_, '_>) -> bool {
    matches!(token.kind(), "identifier" | "type_identifier" | "this" | "super")
        || (token.kind() == ">" && is_angle(token))
}

/// `;` separating the parts of a for header or a resource list
fn is_inline_semicolon(token: &Token<'_, '_>) -> bool {
    match token.parent_kind() {
        Some("for_statement" | "resource_specification") => true,
        Some("local_variable_declaration") => token.grandparent.is_some_and(|g| g.kind() == "for_statement"),
        _ => false,
    }
}

/// Preference of the token on the left
fn after(prev: &Token<'_, '_>, next: &Token<'_, '_>) -> Option<Gap> {
    if prev.kind() == "line_comment" {
        return Some(Gap::Newline);
    }
    if is_body_brace(prev, "{") {
        return Some(Gap::Newline);
    }
    if is_body_brace(prev, "}") {
        return match next.kind() {
            "else" | "catch" | "finally" => Some(Gap::Space),
            "while" if next.parent_kind() == Some("do_statement") => Some(Gap::Space),
            ";" | ")" | "," | "." => None,
            _ => Some(Gap::Newline),
        };
    }
    if is_initializer_brace(prev, "{") {
        return Some(Gap::Glue);
    }

    match prev.kind() {
        ";" if is_inline_semicolon(prev) => Some(Gap::Space),
        ";" => Some(Gap::Newline),
        ":" if prev.parent_kind() == Some("switch_block_statement_group") => Some(Gap::Newline),
        "(" | "[" | "." | "@" | "::" => Some(Gap::Glue),
        "<" if is_angle(prev) => Some(Gap::Glue),
        ">" if is_angle(prev) => {
            // `prev.grandparent` owns the type arguments
            let on_call = prev.grandparent.is_some_and(|owner| owner.kind() == "method_invocation");
            on_call.then_some(Gap::Glue)
        }
        _ if is_prefix_operator(prev) => Some(Gap::Glue),
        _ if prev.ends_annotation => Some(Gap::Newline),
        _ => None,
    }
}

/// Preference of the token on the right
fn before(prev: &Token<'_, '_>, next: &Token<'_, '_>) -> Option<Gap> {
    if is_body_brace(next, "}") {
        return Some(Gap::Newline);
    }
    if is_initializer_brace(next, "}") {
        return Some(Gap::Glue);
    }

    match next.kind() {
        ")" | "]" | "," | ";" | "." | "::" | "..." | "[" => Some(Gap::Glue),
        "(" if is_callee_like(prev) => Some(Gap::Glue),
        "<" if is_angle(next) && is_callee_like(prev) => Some(Gap::Glue),
        ">" if is_angle(next) => Some(Gap::Glue),
        ":" => {
            let attached = matches!(
                next.parent_kind(),
                Some("switch_block_statement_group" | "labeled_statement")
            );
            attached.then_some(Gap::Glue)
        }
        _ if is_postfix_operator(next) => Some(Gap::Glue),
        _ => None,
    }
}

/// Gap between two code tokens, before blank lines are considered
pub fn gap_between(prev: &Token<'_, '_>, next: &Token<'_, '_>) -> Gap {
    // `{}` of an empty body
    if is_body_brace(prev, "{")
        && is_body_brace(next, "}")
        && prev.parent.map(|p| p.id()) == next.parent.map(|p| p.id())
    {
        return Gap::Glue;
    }

    let left = after(prev, next);
    let right = before(prev, next);
    let gap = if left == Some(Gap::Newline) || right == Some(Gap::Newline) {
        Gap::Newline
    } else if left == Some(Gap::Glue) || right == Some(Gap::Glue) {
        Gap::Glue
    } else {
        Gap::Space
    };

    if gap == Gap::Glue && !is_angle(prev) && !is_angle(next) && would_fuse(prev.text, next.text) {
        return Gap::Space;
    }
    gap
}

/// Whether gluing two tokens would lex as something else
pub fn would_fuse(left: &str, right: &str) -> bool {
    let (Some(last), Some(first)) = (left.chars().last(), right.chars().next()) else {
        return false;
    };
    let word = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    if word(last) && word(first) {
        return true;
    }
    const OPERATORS: &str = "+-*/&|<>=!";
    OPERATORS.contains(last) && OPERATORS.contains(first)
}

/// A blank line may follow `prev` / precede `next`
pub fn allows_blank(prev: &Token<'_, '_>, next: &Token<'_, '_>) -> bool {
    !is_body_brace(prev, "{") && !is_body_brace(next, "}")
}
