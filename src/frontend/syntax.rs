//! Tagged view over tree-sitter nodes
//!
//! Passes never dispatch on raw node kind strings; they `match` on
//! [`Syntax`], which names the constructs that matter for binding and
//! carries the child nodes each construct is made of. Everything else is
//! [`Syntax::Other`] and is traversed generically.

use super::parser::CompilationUnit;
use tree_sitter::Node;

/// What kind of type a declaration introduces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

/// A classified syntax node
#[derive(Debug, Clone, Copy)]
pub enum Syntax<'t> {
    Package(Node<'t>),
    Import(Node<'t>),
    TypeDecl {
        node: Node<'t>,
        kind: TypeDeclKind,
        name: Node<'t>,
        body: Node<'t>,
    },
    /// `field_declaration` or interface `constant_declaration`
    Field { node: Node<'t>, ty: Node<'t> },
    EnumConstant {
        node: Node<'t>,
        name: Node<'t>,
        body: Option<Node<'t>>,
    },
    /// Method, constructor or compact record constructor
    Method {
        node: Node<'t>,
        name: Node<'t>,
        params: Option<Node<'t>>,
        body: Option<Node<'t>>,
        constructor: bool,
    },
    AnnotationElement { node: Node<'t>, name: Node<'t> },
    Initializer {
        node: Node<'t>,
        block: Node<'t>,
        is_static: bool,
    },
    /// `block`, `constructor_body`
    Block(Node<'t>),
    LocalVariables { node: Node<'t>, ty: Node<'t> },
    For(Node<'t>),
    EnhancedFor {
        node: Node<'t>,
        ty: Node<'t>,
        name: Node<'t>,
        value: Node<'t>,
        body: Node<'t>,
    },
    Catch {
        node: Node<'t>,
        param: Node<'t>,
        body: Node<'t>,
    },
    TryWithResources {
        node: Node<'t>,
        resources: Node<'t>,
        body: Node<'t>,
    },
    Resource(Node<'t>),
    Lambda {
        node: Node<'t>,
        params: Node<'t>,
        body: Node<'t>,
    },
    /// `x instanceof T name`
    Instanceof {
        node: Node<'t>,
        left: Node<'t>,
        ty: Node<'t>,
        name: Node<'t>,
    },
    /// `T name` inside a switch or record pattern
    TypePattern {
        node: Node<'t>,
        ty: Node<'t>,
        name: Node<'t>,
    },
    Switch {
        node: Node<'t>,
        subject: Option<Node<'t>>,
        body: Node<'t>,
    },
    MethodCall {
        node: Node<'t>,
        object: Option<Node<'t>>,
        name: Node<'t>,
        arguments: Node<'t>,
    },
    FieldAccess {
        node: Node<'t>,
        object: Node<'t>,
        field: Node<'t>,
    },
    MethodReference(Node<'t>),
    ObjectCreation {
        node: Node<'t>,
        ty: Node<'t>,
        body: Option<Node<'t>>,
    },
    /// Labeled statement, labeled break/continue
    Label(Node<'t>),
    Annotation { node: Node<'t>, name: Node<'t> },
    ElementValuePair { node: Node<'t>, value: Option<Node<'t>> },
    TypeParameter(Node<'t>),
    ScopedType(Node<'t>),
    Identifier(Node<'t>),
    TypeIdentifier(Node<'t>),
    Other(Node<'t>),
}

/// Classify a node
pub fn classify(node: Node<'_>) -> Syntax<'_> {
    let field = |name: &str| node.child_by_field_name(name);

    match node.kind() {
        "package_declaration" => Syntax::Package(node),
        "import_declaration" => Syntax::Import(node),
        "class_declaration" | "interface_declaration" | "enum_declaration"
        | "record_declaration" | "annotation_type_declaration" => {
            let kind = match node.kind() {
                "interface_declaration" => TypeDeclKind::Interface,
                "enum_declaration" => TypeDeclKind::Enum,
                "record_declaration" => TypeDeclKind::Record,
                "annotation_type_declaration" => TypeDeclKind::Annotation,
                _ => TypeDeclKind::Class,
            };
            match (field("name"), field("body")) {
                (Some(name), Some(body)) => Syntax::TypeDecl { node, kind, name, body },
                _ => Syntax::Other(node),
            }
        }
        "field_declaration" | "constant_declaration" => match field("type") {
            Some(ty) => Syntax::Field { node, ty },
            None => Syntax::Other(node),
        },
        "enum_constant" => match field("name") {
            Some(name) => Syntax::EnumConstant {
                node,
                name,
                body: field("body"),
            },
            None => Syntax::Other(node),
        },
        "method_declaration" | "constructor_declaration" | "compact_constructor_declaration" => {
            match field("name") {
                Some(name) => Syntax::Method {
                    node,
                    name,
                    params: field("parameters"),
                    body: field("body"),
                    constructor: node.kind() != "method_declaration",
                },
                None => Syntax::Other(node),
            }
        }
        "annotation_type_element_declaration" => match field("name") {
            Some(name) => Syntax::AnnotationElement { node, name },
            None => Syntax::Other(node),
        },
        "static_initializer" => match named_children(node).into_iter().find(|c| c.kind() == "block") {
            Some(block) => Syntax::Initializer {
                node,
                block,
                is_static: true,
            },
            None => Syntax::Other(node),
        },
        "block"
            if node
                .parent()
                .is_some_and(|p| matches!(p.kind(), "class_body" | "enum_body_declarations")) =>
        {
            Syntax::Initializer {
                node,
                block: node,
                is_static: false,
            }
        }
        "block" | "constructor_body" => Syntax::Block(node),
        "local_variable_declaration" => match field("type") {
            Some(ty) => Syntax::LocalVariables { node, ty },
            None => Syntax::Other(node),
        },
        "for_statement" => Syntax::For(node),
        "enhanced_for_statement" => match (field("type"), field("name"), field("value"), field("body")) {
            (Some(ty), Some(name), Some(value), Some(body)) => Syntax::EnhancedFor {
                node,
                ty,
                name,
                value,
                body,
            },
            _ => Syntax::Other(node),
        },
        "catch_clause" => {
            let param = named_children(node)
                .into_iter()
                .find(|c| c.kind() == "catch_formal_parameter");
            match (param, field("body")) {
                (Some(param), Some(body)) => Syntax::Catch { node, param, body },
                _ => Syntax::Other(node),
            }
        }
        "try_with_resources_statement" => match (field("resources"), field("body")) {
            (Some(resources), Some(body)) => Syntax::TryWithResources {
                node,
                resources,
                body,
            },
            _ => Syntax::Other(node),
        },
        "resource" => Syntax::Resource(node),
        "lambda_expression" => match (field("parameters"), field("body")) {
            (Some(params), Some(body)) => Syntax::Lambda { node, params, body },
            _ => Syntax::Other(node),
        },
        "instanceof_expression" => match (field("left"), field("right"), field("name")) {
            (Some(left), Some(ty), Some(name)) => Syntax::Instanceof { node, left, ty, name },
            _ => Syntax::Other(node),
        },
        "type_pattern" => {
            let children = named_children(node);
            match (children.first(), children.last()) {
                (Some(&ty), Some(&name)) if children.len() >= 2 && name.kind() == "identifier" => {
                    Syntax::TypePattern { node, ty, name }
                }
                _ => Syntax::Other(node),
            }
        }
        "switch_expression" | "switch_statement" => match field("body") {
            Some(body) => Syntax::Switch {
                node,
                subject: field("condition"),
                body,
            },
            None => Syntax::Other(node),
        },
        "method_invocation" => match (field("name"), field("arguments")) {
            (Some(name), Some(arguments)) => Syntax::MethodCall {
                node,
                object: field("object"),
                name,
                arguments,
            },
            _ => Syntax::Other(node),
        },
        "field_access" => match (field("object"), field("field")) {
            (Some(object), Some(field)) => Syntax::FieldAccess { node, object, field },
            _ => Syntax::Other(node),
        },
        "method_reference" => Syntax::MethodReference(node),
        "object_creation_expression" => match field("type") {
            Some(ty) => Syntax::ObjectCreation {
                node,
                ty,
                body: named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "class_body"),
            },
            None => Syntax::Other(node),
        },
        "labeled_statement" | "break_statement" | "continue_statement" => Syntax::Label(node),
        "annotation" | "marker_annotation" => match field("name") {
            Some(name) => Syntax::Annotation { node, name },
            None => Syntax::Other(node),
        },
        "element_value_pair" => Syntax::ElementValuePair {
            node,
            value: field("value"),
        },
        "type_parameter" => Syntax::TypeParameter(node),
        "scoped_type_identifier" => Syntax::ScopedType(node),
        "identifier" => Syntax::Identifier(node),
        "type_identifier" => Syntax::TypeIdentifier(node),
        _ => Syntax::Other(node),
    }
}

/// All children, anonymous tokens included
pub fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Whether a declaration carries a keyword modifier such as `static`
pub fn has_modifier(node: Node<'_>, keyword: &str) -> bool {
    named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "modifiers")
        .flat_map(children)
        .any(|m| m.kind() == keyword)
}

/// Name node of a parameter-like declaration
///
/// `formal_parameter` and `catch_formal_parameter` carry a `name` field,
/// `spread_parameter` wraps it in a `variable_declarator`.
pub fn declared_name(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("name").or_else(|| {
        named_children(node)
            .into_iter()
            .find(|c| c.kind() == "variable_declarator")
            .and_then(|d| d.child_by_field_name("name"))
    })
}

/// Type node of a parameter-like declaration
pub fn declared_type(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("type").or_else(|| {
        named_children(node).into_iter().find(|c| {
            !matches!(
                c.kind(),
                "modifiers" | "variable_declarator" | "identifier" | "dimensions"
            )
        })
    })
}

/// Type text as written with generic arguments and annotations removed
///
/// `java.util.List<String> []` becomes `java.util.List[]`; a catch type
/// `IOException | RuntimeException` keeps only its first alternative.
pub fn type_text(unit: &CompilationUnit, node: Node<'_>) -> String {
    if node.kind() == "catch_type" {
        return named_children(node)
            .first()
            .map(|first| type_text(unit, *first))
            .unwrap_or_default();
    }
    let mut out = String::new();
    push_type_leaves(unit, node, &mut out);
    out
}

fn push_type_leaves(unit: &CompilationUnit, node: Node<'_>, out: &mut String) {
    match node.kind() {
        "type_arguments" | "annotation" | "marker_annotation" => {}
        _ if node.child_count() == 0 => out.push_str(unit.text(node)),
        _ => {
            for child in children(node) {
                push_type_leaves(unit, child, out);
            }
        }
    }
}

/// Split `Foo[][]` into (`Foo`, 2)
pub fn split_dims(text: &str) -> (&str, usize) {
    let mut base = text.trim();
    let mut dims = 0;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped.trim_end();
        dims += 1;
    }
    (base, dims)
}

/// Last segment of a dotted name
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::{FrontEnd, JavaParser};
    use std::path::Path;

    fn parse(source: &str) -> CompilationUnit {
        JavaParser::new().parse(Path::new("T.java"), source).unwrap()
    }

    fn find<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if node.kind() == kind {
            return Some(node);
        }
        children(node).into_iter().find_map(|c| find(c, kind))
    }

    #[test]
    fn test_classify_declarations() {
        let unit = parse("class A { static int x; A() {} void f(int a) { int b = a; } }");
        let root = unit.root();

        let class = find(root, "class_declaration").unwrap();
        assert!(matches!(classify(class), Syntax::TypeDecl { kind: TypeDeclKind::Class, .. }));

        let field = find(root, "field_declaration").unwrap();
        assert!(matches!(classify(field), Syntax::Field { .. }));
        assert!(has_modifier(field, "static"));

        let ctor = find(root, "constructor_declaration").unwrap();
        assert!(matches!(classify(ctor), Syntax::Method { constructor: true, .. }));

        let local = find(root, "local_variable_declaration").unwrap();
        assert!(matches!(classify(local), Syntax::LocalVariables { .. }));
    }

    #[test]
    fn test_type_text_strips_generics() {
        let unit = parse("class A { java.util.Map<String, int[]>[] m; }");
        let field = find(unit.root(), "field_declaration").unwrap();
        let ty = field.child_by_field_name("type").unwrap();
        assert_eq!(type_text(&unit, ty), "java.util.Map[]");
    }

    #[test]
    fn test_spread_parameter_name() {
        let unit = parse("class A { void f(String... args) {} }");
        let spread = find(unit.root(), "spread_parameter").unwrap();
        let name = declared_name(spread).unwrap();
        assert_eq!(unit.text(name), "args");
        let ty = declared_type(spread).unwrap();
        assert_eq!(type_text(&unit, ty), "String");
    }

    #[test]
    fn test_split_dims() {
        assert_eq!(split_dims("int[][]"), ("int", 2));
        assert_eq!(split_dims("a.B"), ("a.B", 0));
        assert_eq!(simple_name("a.b.C"), "C");
    }
}
