//! Scope builder - binds declarations and resolves every identifier
//!
//! One traversal per compilation unit:
//! 1. Type bodies open a Class scope with their members pre-bound
//! 2. Methods, constructors, lambdas and initializers open a Method scope
//! 3. Blocks, loops, catch clauses, resource lists and switch blocks open a
//!    Block scope, pushed before their children and closed after
//! 4. Each identifier node gets a [`Resolution`]; what the scopes cannot
//!    answer goes to the [`ProjectIndex`]
//!
//! Static types of expressions are tracked on the side so that qualified
//! accesses (`a.b`, `a.f(x)`) can be looked up on the receiver's type.

use super::graph::{Binding, Namespace, ScopeId, ScopeKind};
use super::table::{BindingState, Resolution, SymbolTable};
use crate::frontend::index::{
    dimension_count, initializer_key, is_static_field, member_key, parameter_type, parameter_types,
    type_parameters,
};
use crate::frontend::syntax::{children, classify, declared_name, declared_type, named_children, type_text, Syntax, TypeDeclKind};
use crate::frontend::{CompilationUnit, MethodLookup, ProjectIndex, StaticType, TypeRef};
use crate::naming::NamingPolicy;
use crate::store::SymbolStore;
use crate::symbol::{Symbol, SymbolId, SymbolKind};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

/// An enclosing type body
#[derive(Debug)]
struct ClassFrame {
    qualified_name: String,
    /// Absent for anonymous classes
    symbol: Option<SymbolId>,
}

/// Outcome of a method call lookup
enum CallTarget {
    Found { key: String, returns: Option<StaticType> },
    Missing { owner: String },
    Unknown,
}

/// Stack left before the traversal grows a new segment
const RED_ZONE: usize = 64 * 1024;
const STACK_SEGMENT: usize = 1024 * 1024;

/// Builds the symbol table of one compilation unit
pub struct ScopeBuilder<'a> {
    unit: &'a CompilationUnit,
    unit_idx: usize,
    index: &'a ProjectIndex,
    store: &'a SymbolStore,
    policy: &'a dyn NamingPolicy,
    table: SymbolTable,
    scope: ScopeId,
    classes: Vec<ClassFrame>,
    /// Keys of the enclosing members, innermost last
    members: Vec<String>,
    /// Static types of the enclosing switch subjects
    switches: Vec<Option<StaticType>>,
    /// Static type per expression node id
    types: HashMap<usize, StaticType>,
    symbol_types: HashMap<SymbolId, StaticType>,
    method_arity: HashMap<SymbolId, (usize, bool)>,
    /// Declarations per (member key, name), for `local#n`
    local_counts: HashMap<(String, String), usize>,
}

impl<'a> ScopeBuilder<'a> {
    pub fn new(
        unit: &'a CompilationUnit,
        unit_idx: usize,
        index: &'a ProjectIndex,
        store: &'a SymbolStore,
        policy: &'a dyn NamingPolicy,
    ) -> Self {
        Self {
            unit,
            unit_idx,
            index,
            store,
            policy,
            table: SymbolTable::new(),
            scope: ScopeId::root(),
            classes: Vec::new(),
            members: Vec::new(),
            switches: Vec::new(),
            types: HashMap::new(),
            symbol_types: HashMap::new(),
            method_arity: HashMap::new(),
            local_counts: HashMap::new(),
        }
    }

    /// Run the traversal and hand back the finished table
    pub fn build(mut self) -> SymbolTable {
        let root = self.unit.root();

        // top-level types are visible throughout the unit
        for child in named_children(root) {
            if let Syntax::TypeDecl { node, name, .. } = classify(child) {
                if let Some(qn) = self.index.type_at(self.unit_idx, node) {
                    let qn = qn.to_string();
                    self.declare_type(&qn, name);
                }
            }
        }

        self.visit_children(root);
        self.table.scopes.close(ScopeId::root());
        self.finish(root);

        tracing::debug!(
            "{}: {} symbols, {} scopes, {} resolved identifiers",
            self.unit.path.display(),
            self.table.len(),
            self.table.scopes.len(),
            self.table.resolved_count()
        );
        self.table
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        let unit: &'a CompilationUnit = self.unit;
        &unit.source[node.start_byte()..node.end_byte()]
    }

    fn visit_children(&mut self, node: Node<'a>) {
        for child in named_children(node) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'a>) {
        // nesting that is not a binary chain still recurses; grow the stack on the heap
        stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, || self.visit_node(node))
    }

    fn visit_node(&mut self, node: Node<'a>) {
        match classify(node) {
            Syntax::Package(_) => {}
            Syntax::Import(node) => self.visit_import(node),
            Syntax::TypeDecl { node, kind, name, body } => self.visit_type(node, kind, name, body),
            Syntax::Field { node, .. } => self.visit_field(node),
            Syntax::EnumConstant { node, name, body } => self.visit_enum_constant(node, name, body),
            Syntax::Method {
                node,
                name,
                params,
                constructor,
                ..
            } => self.visit_method(node, name, params, constructor),
            Syntax::AnnotationElement { node, name } => {
                if let Some(owner) = self.innermost_class() {
                    let key = member_key(self.unit, &owner, node);
                    self.link(name, &key, BindingState::Valid);
                }
                self.visit_except(node, &[name]);
            }
            Syntax::Initializer { node, block, is_static } => {
                let owner = self.innermost_class().unwrap_or_default();
                self.members.push(initializer_key(&owner, is_static));
                let prev = self.push_scope(ScopeKind::Method);
                if node.id() != block.id() {
                    self.visit_except(node, &[block]);
                }
                self.visit_children(block);
                self.pop_scope(prev);
                self.members.pop();
            }
            Syntax::Block(node) | Syntax::For(node) => {
                let prev = self.push_scope(ScopeKind::Block);
                self.visit_children(node);
                self.pop_scope(prev);
            }
            Syntax::LocalVariables { node, ty } => self.visit_local_variables(node, ty),
            Syntax::EnhancedFor {
                node,
                ty,
                name,
                value,
                body,
            } => {
                let prev = self.push_scope(ScopeKind::Block);
                self.visit(value);
                let (text, static_type) = if self.text(ty) == "var" {
                    self.table.resolve(ty, Resolution::Keep);
                    let element = self.types.get(&value.id()).and_then(StaticType::element);
                    (element.as_ref().map(describe), element)
                } else {
                    self.visit(ty);
                    let text = type_text(self.unit, ty);
                    (Some(text.clone()), self.static_type_of(&text))
                };
                for child in named_children(node) {
                    if child.kind() == "modifiers" {
                        self.visit(child);
                    }
                }
                self.declare_variable(name, SymbolKind::LocalVariable, text, static_type);
                self.visit(body);
                self.pop_scope(prev);
            }
            Syntax::Catch { param, body, .. } => {
                let prev = self.push_scope(ScopeKind::Block);
                let name = declared_name(param);
                for child in named_children(param) {
                    if Some(child.id()) != name.map(|n| n.id()) {
                        self.visit(child);
                    }
                }
                if let Some(name) = name {
                    let text = declared_type(param).map(|t| type_text(self.unit, t));
                    let static_type = text.as_deref().and_then(|t| self.static_type_of(t));
                    self.declare_variable(name, SymbolKind::LocalVariable, text, static_type);
                }
                self.visit(body);
                self.pop_scope(prev);
            }
            Syntax::TryWithResources { node, resources, body } => {
                let prev = self.push_scope(ScopeKind::Block);
                self.visit(resources);
                self.visit(body);
                self.pop_scope(prev);
                self.visit_except(node, &[resources, body]);
            }
            Syntax::Resource(node) => match node.child_by_field_name("name") {
                Some(name) => self.visit_declarator(node, name, node.child_by_field_name("type")),
                None => self.visit_children(node),
            },
            Syntax::Lambda { params, body, .. } => {
                let prev = self.push_scope(ScopeKind::Method);
                self.visit_lambda_parameters(params);
                self.visit(body);
                self.pop_scope(prev);
            }
            Syntax::Instanceof { left, ty, name, .. } => {
                self.visit(left);
                self.visit(ty);
                let text = type_text(self.unit, ty);
                let static_type = self.static_type_of(&text);
                self.declare_variable(name, SymbolKind::LocalVariable, Some(text), static_type);
            }
            Syntax::TypePattern { ty, name, .. } => {
                self.visit(ty);
                let text = type_text(self.unit, ty);
                let static_type = self.static_type_of(&text);
                self.declare_variable(name, SymbolKind::LocalVariable, Some(text), static_type);
            }
            Syntax::Switch { subject, body, .. } => {
                if let Some(subject) = subject {
                    self.visit(subject);
                }
                let subject_type = subject.and_then(|s| self.types.get(&s.id()).cloned());
                self.switches.push(subject_type);
                let prev = self.push_scope(ScopeKind::Block);
                self.visit_children(body);
                self.pop_scope(prev);
                self.switches.pop();
            }
            Syntax::MethodCall {
                node,
                object,
                name,
                arguments,
            } => self.visit_call(node, object, name, arguments),
            Syntax::FieldAccess { node, object, field } => self.visit_field_access(node, object, field),
            Syntax::MethodReference(node) => self.visit_method_reference(node),
            Syntax::ObjectCreation { node, ty, body } => self.visit_object_creation(node, ty, body),
            Syntax::Label(node) => {
                // label names stay as written
                for child in named_children(node) {
                    if child.kind() != "identifier" {
                        self.visit(child);
                    }
                }
            }
            Syntax::Annotation { node, name } => {
                self.resolve_type_node(name);
                self.visit_except(node, &[name]);
            }
            Syntax::ElementValuePair { value, .. } => {
                if let Some(value) = value {
                    self.visit(value);
                }
            }
            Syntax::TypeParameter(node) => {
                for child in named_children(node) {
                    match child.kind() {
                        "type_identifier" | "identifier" => self.table.resolve(child, Resolution::Keep),
                        _ => self.visit(child),
                    }
                }
            }
            Syntax::ScopedType(node) | Syntax::TypeIdentifier(node) => {
                self.resolve_type_node(node);
            }
            Syntax::Identifier(node) => self.resolve_expression_name(node),
            Syntax::Other(node) if node.kind() == "binary_expression" => self.visit_binary_chain(node),
            Syntax::Other(node) => {
                self.visit_children(node);
                self.infer_type(node);
            }
        }
    }

    /// `a + b + c` nests to the left; walk the left spine without recursing
    fn visit_binary_chain(&mut self, node: Node<'a>) {
        let mut chain = vec![node];
        let mut left = node.child_by_field_name("left");
        while let Some(inner) = left.filter(|l| l.kind() == "binary_expression") {
            chain.push(inner);
            left = inner.child_by_field_name("left");
        }
        if let Some(left) = left {
            self.visit(left);
        }
        for binary in chain.into_iter().rev() {
            if let Some(right) = binary.child_by_field_name("right") {
                self.visit(right);
            }
            self.infer_type(binary);
        }
    }

    /// Visit named children other than `skip`
    fn visit_except(&mut self, node: Node<'a>, skip: &[Node<'a>]) {
        for child in named_children(node) {
            if !skip.iter().any(|s| s.id() == child.id()) {
                self.visit(child);
            }
        }
    }

    // ---- scopes and frames ----

    fn push_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let prev = self.scope;
        self.scope = self.table.scopes.add_scope(prev, kind);
        prev
    }

    fn pop_scope(&mut self, prev: ScopeId) {
        self.table.scopes.close(self.scope);
        self.scope = prev;
    }

    fn bind(&mut self, namespace: Namespace, name: &str, binding: Binding) {
        self.table.scopes.add_definition(self.scope, namespace, name, binding);
    }

    fn innermost_class(&self) -> Option<String> {
        self.classes.last().map(|frame| frame.qualified_name.clone())
    }

    fn current_member(&self) -> String {
        match self.members.last() {
            Some(key) => key.clone(),
            None => initializer_key(&self.innermost_class().unwrap_or_default(), false),
        }
    }

    /// Attach a key; a valid key declared in this unit becomes a local binding
    fn link(&mut self, node: Node<'a>, key: &str, state: BindingState) {
        let resolution = match (state, self.table.id_of(key)) {
            (BindingState::Valid, Some(id)) => Resolution::Local(id),
            _ => Resolution::Member {
                key: key.to_string(),
                state,
            },
        };
        self.table.resolve(node, resolution);
    }

    // ---- declarations ----

    fn declare_type(&mut self, qn: &str, name: Node<'a>) -> SymbolId {
        if let Some(id) = self.table.id_of(qn) {
            return id;
        }
        let declared = self.text(name);
        let id = self.table.add_symbol(Symbol::new(qn, SymbolKind::Type, declared));
        self.bind(Namespace::Type, declared, Binding::Symbol(id));
        id
    }

    fn declare_variable(
        &mut self,
        name: Node<'a>,
        kind: SymbolKind,
        declared_type: Option<String>,
        static_type: Option<StaticType>,
    ) {
        let declared = self.text(name);
        if declared == "_" {
            self.table.resolve(name, Resolution::Keep);
            return;
        }
        let member = self.current_member();
        let key = match kind {
            SymbolKind::Parameter => format!("{}.{}(param)", member, declared),
            _ => {
                let count = self
                    .local_counts
                    .entry((member.clone(), declared.to_string()))
                    .or_insert(0);
                *count += 1;
                format!("{}.{}(local#{})", member, declared, count)
            }
        };

        let mut symbol = Symbol::new(key, kind, declared);
        symbol.declared_type = declared_type;
        let id = self.table.add_symbol(symbol);
        self.bind(Namespace::Value, declared, Binding::Symbol(id));
        self.table.resolve(name, Resolution::Local(id));
        if let Some(static_type) = static_type {
            self.symbol_types.insert(id, static_type);
        }
    }

    fn declare_member(&mut self, namespace: Namespace, key: String, kind: SymbolKind, name: &str, ty: Option<String>) -> SymbolId {
        let mut symbol = Symbol::new(key, kind, name);
        symbol.declared_type = ty;
        let id = self.table.add_symbol(symbol);
        self.bind(namespace, name, Binding::Symbol(id));
        id
    }

    /// Members are visible throughout the body, so bind them before visiting it
    fn bind_members(&mut self, owner: &str, kind: TypeDeclKind, decl: Node<'a>, body: Node<'a>) {
        if kind == TypeDeclKind::Record {
            if let Some(params) = decl.child_by_field_name("parameters") {
                for param in named_children(params) {
                    let (Some(name), Some(ty)) = (declared_name(param), parameter_type(self.unit, param)) else {
                        continue;
                    };
                    let name = self.text(name);
                    let key = format!("{}.{}", owner, name);
                    let static_type = self.static_type_of(&ty);
                    let id = self.declare_member(Namespace::Value, key, SymbolKind::Field, name, Some(ty));
                    // implicit accessor
                    self.bind(Namespace::Method, name, Binding::Symbol(id));
                    self.method_arity.insert(id, (0, false));
                    if let Some(static_type) = static_type {
                        self.symbol_types.insert(id, static_type);
                    }
                }
            }
        }

        for member in body_members(body) {
            match classify(member) {
                Syntax::Field { node, ty } => {
                    let base = type_text(self.unit, ty);
                    for declarator in named_children(node)
                        .into_iter()
                        .filter(|c| c.kind() == "variable_declarator")
                    {
                        let Some(name) = declarator.child_by_field_name("name") else {
                            continue;
                        };
                        let name = self.text(name);
                        let dims = dimension_count(declarator.child_by_field_name("dimensions"));
                        let ty = format!("{}{}", base, "[]".repeat(dims));
                        let static_type = self.static_type_of(&ty);
                        let id = self.declare_member(
                            Namespace::Value,
                            format!("{}.{}", owner, name),
                            SymbolKind::Field,
                            name,
                            Some(ty),
                        );
                        if let Some(static_type) = static_type {
                            self.symbol_types.insert(id, static_type);
                        }
                    }
                }
                Syntax::EnumConstant { name, .. } => {
                    let name = self.text(name);
                    let id = self.declare_member(
                        Namespace::Value,
                        format!("{}.{}", owner, name),
                        SymbolKind::Field,
                        name,
                        Some(owner.to_string()),
                    );
                    self.symbol_types
                        .insert(id, StaticType::new(TypeRef::Known(owner.to_string())));
                }
                Syntax::Method {
                    node,
                    name,
                    params,
                    constructor: false,
                    ..
                } => {
                    let key = member_key(self.unit, owner, node);
                    let returns = node.child_by_field_name("type").map(|t| type_text(self.unit, t));
                    let arity = params
                        .map(|p| {
                            let (types, varargs) = parameter_types(self.unit, p);
                            (types.len(), varargs)
                        })
                        .unwrap_or((0, false));
                    let name = self.text(name);
                    let id = self.declare_member(Namespace::Method, key, SymbolKind::Method, name, returns);
                    self.method_arity.insert(id, arity);
                }
                Syntax::AnnotationElement { node, name } => {
                    let key = member_key(self.unit, owner, node);
                    let name = self.text(name);
                    let id = self.declare_member(Namespace::Method, key, SymbolKind::Method, name, None);
                    self.method_arity.insert(id, (0, false));
                }
                Syntax::TypeDecl { node, name, .. } => {
                    if let Some(qn) = self.index.type_at(self.unit_idx, node) {
                        let qn = qn.to_string();
                        self.declare_type(&qn, name);
                    }
                }
                _ => {}
            }
        }
    }

    fn enter_class(&mut self, qualified_name: String, symbol: Option<SymbolId>) -> ScopeId {
        let prev = self.push_scope(ScopeKind::Class);
        self.classes.push(ClassFrame { qualified_name, symbol });
        prev
    }

    fn leave_class(&mut self, prev: ScopeId) {
        self.classes.pop();
        self.pop_scope(prev);
    }

    fn visit_type(&mut self, node: Node<'a>, kind: TypeDeclKind, name: Node<'a>, body: Node<'a>) {
        let Some(qn) = self.index.type_at(self.unit_idx, node).map(str::to_string) else {
            tracing::warn!("{}: unindexed type {}", self.unit.path.display(), self.text(name));
            self.visit_children(node);
            return;
        };

        // local classes bind into the enclosing block here
        let id = self.declare_type(&qn, name);
        self.table.resolve(name, Resolution::Local(id));

        let prev = self.enter_class(qn.clone(), Some(id));
        for param in type_parameters(self.unit, node) {
            self.bind(Namespace::Type, &param, Binding::Opaque);
        }
        self.bind_members(&qn, kind, node, body);

        for child in named_children(node) {
            if child.id() == name.id() || child.id() == body.id() {
                continue;
            }
            if kind == TypeDeclKind::Record && child.kind() == "formal_parameters" {
                self.visit_record_components(&qn, child);
                continue;
            }
            self.visit(child);
        }
        for member in body_members(body) {
            self.visit(member);
        }
        self.leave_class(prev);
    }

    fn visit_record_components(&mut self, owner: &str, params: Node<'a>) {
        for param in named_children(params) {
            let name = declared_name(param);
            for child in named_children(param) {
                if Some(child.id()) != name.map(|n| n.id()) {
                    self.visit(child);
                }
            }
            if let Some(name) = name {
                let key = format!("{}.{}", owner, self.text(name));
                self.link(name, &key, BindingState::Valid);
            }
        }
    }

    fn visit_anonymous_body(&mut self, node: Node<'a>, body: Node<'a>) {
        let Some(qn) = self.index.type_at(self.unit_idx, node).map(str::to_string) else {
            self.visit_children(body);
            return;
        };
        let prev = self.enter_class(qn.clone(), None);
        self.bind_members(&qn, TypeDeclKind::Class, node, body);
        for member in body_members(body) {
            self.visit(member);
        }
        self.leave_class(prev);
    }

    fn visit_field(&mut self, node: Node<'a>) {
        let owner = self.innermost_class().unwrap_or_default();
        self.members.push(initializer_key(&owner, is_static_field(node)));
        for child in named_children(node) {
            if child.kind() != "variable_declarator" {
                self.visit(child);
                continue;
            }
            let name = child.child_by_field_name("name");
            if let Some(name) = name {
                let key = format!("{}.{}", owner, self.text(name));
                self.link(name, &key, BindingState::Valid);
            }
            if let Some(value) = child.child_by_field_name("value") {
                self.visit(value);
            }
        }
        self.members.pop();
    }

    fn visit_enum_constant(&mut self, node: Node<'a>, name: Node<'a>, body: Option<Node<'a>>) {
        let owner = self.innermost_class().unwrap_or_default();
        let key = format!("{}.{}", owner, self.text(name));
        self.link(name, &key, BindingState::Valid);

        self.members.push(initializer_key(&owner, true));
        for child in named_children(node) {
            if child.id() == name.id() || Some(child.id()) == body.map(|b| b.id()) {
                continue;
            }
            self.visit(child);
        }
        self.members.pop();

        if let Some(body) = body {
            self.visit_anonymous_body(node, body);
        }
    }

    fn visit_method(&mut self, node: Node<'a>, name: Node<'a>, params: Option<Node<'a>>, constructor: bool) {
        let Some(owner) = self.innermost_class() else {
            self.visit_children(node);
            return;
        };
        let key = member_key(self.unit, &owner, node);
        if constructor {
            // constructors are renamed with their class
            let class_symbol = self.classes.last().and_then(|frame| frame.symbol);
            match class_symbol {
                Some(id) => self.table.resolve(name, Resolution::Local(id)),
                None => self.table.resolve(name, Resolution::Keep),
            }
        } else {
            self.link(name, &key, BindingState::Valid);
        }

        self.members.push(key);
        let prev = self.push_scope(ScopeKind::Method);
        for param in type_parameters(self.unit, node) {
            self.bind(Namespace::Type, &param, Binding::Opaque);
        }
        for child in named_children(node) {
            if child.id() == name.id() {
                continue;
            }
            if Some(child.id()) == params.map(|p| p.id()) {
                self.visit_parameters(child);
                continue;
            }
            self.visit(child);
        }
        self.pop_scope(prev);
        self.members.pop();
    }

    fn visit_parameters(&mut self, params: Node<'a>) {
        for param in named_children(params) {
            match param.kind() {
                "formal_parameter" | "spread_parameter" => {
                    self.visit_parameter(param, SymbolKind::Parameter);
                }
                _ => self.visit(param),
            }
        }
    }

    fn visit_parameter(&mut self, param: Node<'a>, kind: SymbolKind) {
        let name = declared_name(param);
        for child in named_children(param) {
            if Some(child.id()) == name.map(|n| n.id()) || child.kind() == "variable_declarator" {
                continue;
            }
            self.visit(child);
        }
        if let Some(name) = name {
            let text = parameter_type(self.unit, param);
            let static_type = text.as_deref().and_then(|t| self.static_type_of(t));
            self.declare_variable(name, kind, text, static_type);
        }
    }

    fn visit_lambda_parameters(&mut self, params: Node<'a>) {
        match params.kind() {
            "identifier" => self.declare_variable(params, SymbolKind::LocalVariable, None, None),
            "formal_parameters" => {
                for param in named_children(params) {
                    match param.kind() {
                        "formal_parameter" | "spread_parameter" => {
                            self.visit_parameter(param, SymbolKind::LocalVariable)
                        }
                        _ => self.visit(param),
                    }
                }
            }
            _ => {
                for param in named_children(params) {
                    if param.kind() == "identifier" {
                        self.declare_variable(param, SymbolKind::LocalVariable, None, None);
                    } else {
                        self.visit(param);
                    }
                }
            }
        }
    }

    fn visit_local_variables(&mut self, node: Node<'a>, ty: Node<'a>) {
        for child in named_children(node) {
            if child.id() == ty.id() {
                if self.text(ty) == "var" {
                    self.table.resolve(ty, Resolution::Keep);
                } else {
                    self.visit(ty);
                }
                continue;
            }
            match child.child_by_field_name("name") {
                Some(name) if child.kind() == "variable_declarator" => {
                    self.visit_declarator(child, name, Some(ty));
                }
                _ => self.visit(child),
            }
        }
    }

    /// `T name[] = value` in a local declaration or resource; `var` infers
    /// the type from the initializer, so the initializer is visited first
    fn visit_declarator(&mut self, declarator: Node<'a>, name: Node<'a>, ty: Option<Node<'a>>) {
        let value = declarator.child_by_field_name("value");
        let is_var = ty.is_some_and(|t| self.text(t) == "var");

        if declarator.kind() == "resource" {
            for child in named_children(declarator) {
                let is_part = Some(child.id()) == value.map(|v| v.id())
                    || child.id() == name.id()
                    || Some(child.id()) == ty.map(|t| t.id());
                if !is_part {
                    self.visit(child);
                }
            }
            if let Some(ty) = ty {
                if is_var {
                    self.table.resolve(ty, Resolution::Keep);
                } else {
                    self.visit(ty);
                }
            }
        }

        if is_var {
            if let Some(value) = value {
                self.visit(value);
            }
            let inferred = value.and_then(|v| self.types.get(&v.id()).cloned());
            let text = inferred.as_ref().map(describe);
            self.declare_variable(name, SymbolKind::LocalVariable, text, inferred);
            return;
        }

        let dims = dimension_count(declarator.child_by_field_name("dimensions"));
        let text = ty.map(|t| format!("{}{}", type_text(self.unit, t), "[]".repeat(dims)));
        let static_type = text.as_deref().and_then(|t| self.static_type_of(t));
        self.declare_variable(name, SymbolKind::LocalVariable, text, static_type);
        if let Some(value) = value {
            self.visit(value);
        }
    }

    // ---- references ----

    fn visit_import(&mut self, node: Node<'a>) {
        let index = self.index;
        let parts = children(node);
        if parts.iter().any(|c| c.kind() == "asterisk") {
            return;
        }
        let is_static = parts.iter().any(|c| c.kind() == "static");
        let Some(name) = parts
            .iter()
            .copied()
            .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
        else {
            return;
        };

        if !is_static {
            self.resolve_qualified_type(name, true);
            return;
        }

        let (Some(owner), Some(member)) = (name.child_by_field_name("scope"), name.child_by_field_name("name")) else {
            return;
        };
        let Some(owner_qn) = self.resolve_qualified_type(owner, false) else {
            return;
        };
        let member_name = self.text(member);
        if let Some((_, field)) = index.find_field(&owner_qn, member_name) {
            let key = field.key.clone();
            self.link(member, &key, BindingState::Valid);
            return;
        }
        let keys: HashSet<&str> = self
            .index
            .hierarchy(&owner_qn)
            .into_iter()
            .flat_map(|info| info.methods.iter())
            .filter(|m| m.name == member_name)
            .map(|m| m.key.as_str())
            .collect();
        match keys.len() {
            0 => {
                let key = format!("{}.{}", owner_qn, member_name);
                self.link(member, &key, BindingState::Missing);
            }
            1 => {
                if let Some(key) = keys.into_iter().next() {
                    let key = key.to_string();
                    self.link(member, &key, BindingState::Valid);
                }
            }
            _ => {}
        }
    }

    /// Resolve a dotted name in an import; known prefixes that are types are
    /// linked too. Returns the qualified name when the whole name is a
    /// known type.
    fn resolve_qualified_type(&mut self, node: Node<'a>, report_missing: bool) -> Option<String> {
        let last = match node.kind() {
            "scoped_identifier" => node.child_by_field_name("name")?,
            _ => node,
        };
        let resolved = self.index.resolve_type(self.unit_idx, None, self.text(node));
        if let Some(scope) = node.child_by_field_name("scope") {
            self.resolve_qualified_type(scope, false);
        }
        match resolved {
            TypeRef::Known(qn) => {
                self.link(last, &qn, BindingState::Valid);
                Some(qn)
            }
            TypeRef::External(name) if report_missing => {
                self.link(last, &name, BindingState::Missing);
                None
            }
            _ => None,
        }
    }

    /// `None` for type variables
    fn lookup_type(&self, text: &str) -> Option<TypeRef> {
        let text = text.trim();
        let (head, rest) = match text.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (text, None),
        };
        match self.table.scopes.lookup(self.scope, Namespace::Type, head) {
            Some((_, Binding::Opaque)) => None,
            Some((_, Binding::Symbol(id))) => {
                let qn = self.table.symbol(id).qualified_name.clone();
                match rest {
                    None => Some(TypeRef::Known(qn)),
                    Some(rest) => Some(
                        rest.split('.')
                            .try_fold(qn, |current, segment| self.index.find_member_type(&current, segment))
                            .map(TypeRef::Known)
                            .unwrap_or_else(|| TypeRef::External(text.to_string())),
                    ),
                }
            }
            None => {
                let context = self.classes.last().map(|f| f.qualified_name.as_str());
                Some(self.index.resolve_type(self.unit_idx, context, text))
            }
        }
    }

    /// Static type for a declared type text, `None` for type variables and `var`
    fn static_type_of(&self, text: &str) -> Option<StaticType> {
        let (base, dims) = crate::frontend::syntax::split_dims(text);
        if base == "var" {
            return None;
        }
        self.lookup_type(base).map(|base| StaticType { base, dims })
    }

    /// Resolve a type name node (`type_identifier`, `scoped_type_identifier`,
    /// or an identifier naming an annotation)
    fn resolve_type_node(&mut self, node: Node<'a>) -> Option<StaticType> {
        let (prefix, last) = match node.kind() {
            "scoped_type_identifier" => {
                let parts = named_children(node);
                let last = parts.iter().rev().copied().find(|c| c.kind() == "type_identifier")?;
                let prefix = parts.first().copied().filter(|p| p.id() != last.id());
                for part in &parts {
                    if matches!(part.kind(), "annotation" | "marker_annotation") {
                        self.visit(*part);
                    }
                }
                (prefix, last)
            }
            "scoped_identifier" => (node.child_by_field_name("scope"), node.child_by_field_name("name")?),
            _ => (None, node),
        };

        if let Some(prefix) = prefix {
            match prefix.kind() {
                "scoped_type_identifier" | "type_identifier" | "scoped_identifier" | "identifier" => {
                    self.resolve_type_prefix(prefix);
                }
                _ => self.visit(prefix),
            }
        }

        let text = type_text(self.unit, node);
        match self.lookup_type(&text) {
            Some(TypeRef::Known(qn)) => {
                self.link(last, &qn, BindingState::Valid);
                Some(StaticType::new(TypeRef::Known(qn)))
            }
            Some(TypeRef::External(name)) => {
                if text != "var" {
                    self.link(last, &name, BindingState::Missing);
                }
                Some(StaticType::new(TypeRef::External(name)))
            }
            Some(primitive) => Some(StaticType::new(primitive)),
            None => {
                self.table.resolve(last, Resolution::Keep);
                None
            }
        }
    }

    /// Qualifier of a type name: only linked when it is itself a known type
    fn resolve_type_prefix(&mut self, node: Node<'a>) {
        let text = type_text(self.unit, node);
        if let Some(TypeRef::Known(_)) = self.lookup_type(&text) {
            self.resolve_type_node(node);
            return;
        }
        let qualifier = match node.kind() {
            "scoped_identifier" => node.child_by_field_name("scope"),
            "scoped_type_identifier" => named_children(node).first().copied(),
            _ => None,
        };
        if let Some(qualifier) = qualifier.filter(|q| q.id() != node.id()) {
            self.resolve_type_prefix(qualifier);
        }
    }

    fn resolve_expression_name(&mut self, node: Node<'a>) {
        let index = self.index;
        if self.table.is_resolved(node) {
            return;
        }
        let name = self.text(node);

        if !self.switches.is_empty()
            && node.parent().is_some_and(|p| p.kind() == "switch_label")
            && self.resolve_case_constant(node, name)
        {
            return;
        }

        if let Some((_, binding)) = self.table.scopes.lookup(self.scope, Namespace::Value, name) {
            match binding {
                Binding::Symbol(id) => {
                    self.table.resolve(node, Resolution::Local(id));
                    if let Some(ty) = self.symbol_types.get(&id).cloned() {
                        self.types.insert(node.id(), ty);
                    }
                }
                Binding::Opaque => self.table.resolve(node, Resolution::Keep),
            }
            return;
        }

        // inherited fields of the enclosing classes
        let frames: Vec<String> = self.classes.iter().rev().map(|f| f.qualified_name.clone()).collect();
        for frame in &frames {
            if let Some((owner, field)) = index.find_field(frame, name) {
                let key = field.key.clone();
                let ty = index.field_type(owner, field);
                self.link(node, &key, BindingState::Valid);
                self.set_type(node, ty);
                return;
            }
        }

        for owner in index.static_import_owners(self.unit_idx, name) {
            if let Some((info, field)) = owner.known().and_then(|qn| index.find_field(qn, name)) {
                let key = field.key.clone();
                let ty = index.field_type(info, field);
                self.link(node, &key, BindingState::Valid);
                self.set_type(node, ty);
                return;
            }
        }

        // a type name used as an expression: `Type.member`
        let receiver = is_receiver(node);
        match self.lookup_type(name) {
            Some(TypeRef::Known(qn)) => {
                self.link(node, &qn, BindingState::Valid);
                self.types.insert(node.id(), StaticType::new(TypeRef::Known(qn)));
                return;
            }
            Some(TypeRef::External(type_name)) if receiver && starts_uppercase(name) => {
                self.link(node, &type_name, BindingState::Missing);
                self.types.insert(node.id(), StaticType::new(TypeRef::External(type_name)));
                return;
            }
            _ => {}
        }

        if receiver {
            // package segment of a qualified name
            return;
        }
        let key = format!("{}.{}", self.innermost_class().unwrap_or_default(), name);
        self.link(node, &key, BindingState::Missing);
    }

    fn resolve_case_constant(&mut self, node: Node<'a>, name: &str) -> bool {
        let index = self.index;
        let subject = self.switches.last().cloned().flatten();
        if let Some(qn) = subject.as_ref().and_then(|t| t.base.known()) {
            if let Some((_, field)) = index.find_field(qn, name) {
                let key = field.key.clone();
                self.link(node, &key, BindingState::Valid);
                return true;
            }
        }
        match index.enums_with_constant(name).as_slice() {
            [owner] => {
                let key = format!("{}.{}", owner, name);
                self.link(node, &key, BindingState::Valid);
                true
            }
            _ => false,
        }
    }

    fn set_type(&mut self, node: Node<'a>, ty: Option<StaticType>) {
        if let Some(ty) = ty {
            self.types.insert(node.id(), ty);
        }
    }

    fn visit_call(&mut self, node: Node<'a>, object: Option<Node<'a>>, name: Node<'a>, arguments: Node<'a>) {
        for child in named_children(node) {
            if child.id() != name.id() {
                self.visit(child);
            }
        }

        let args: Vec<Option<StaticType>> = named_children(arguments)
            .iter()
            .map(|arg| self.types.get(&arg.id()).cloned())
            .collect();
        let method = self.text(name);

        let target = match object {
            None => self.resolve_unqualified_call(method, &args),
            Some(object) if object.kind() == "super" => self.resolve_super_call(method, &args),
            Some(object) => match self.types.get(&object.id()).cloned() {
                Some(receiver) => self.resolve_call_on(&receiver, method, &args),
                None => CallTarget::Unknown,
            },
        };

        match target {
            CallTarget::Found { key, returns } => {
                self.link(name, &key, BindingState::Valid);
                self.set_type(node, returns);
            }
            CallTarget::Missing { owner } => {
                let key = format!("{}.{}({})", owner, method, vec!["?"; args.len()].join(","));
                self.link(name, &key, BindingState::Missing);
            }
            CallTarget::Unknown => self.table.resolve(name, Resolution::Keep),
        }
    }

    fn resolve_call_on(&self, receiver: &StaticType, method: &str, args: &[Option<StaticType>]) -> CallTarget {
        match receiver.member_owner() {
            Some(TypeRef::Known(qn)) => match self.index.find_method(qn, method, args) {
                MethodLookup::Found(owner, info) => CallTarget::Found {
                    key: info.key.clone(),
                    returns: self.index.return_type(owner, info),
                },
                MethodLookup::Absent => CallTarget::Missing { owner: qn.clone() },
                MethodLookup::Ambiguous(_) => CallTarget::Unknown,
            },
            Some(TypeRef::External(name)) => CallTarget::Missing { owner: name.clone() },
            _ => CallTarget::Unknown,
        }
    }

    fn resolve_unqualified_call(&self, method: &str, args: &[Option<StaticType>]) -> CallTarget {
        let in_scope: Vec<SymbolId> = self
            .table
            .scopes
            .lookup_all(self.scope, Namespace::Method, method)
            .into_iter()
            .filter_map(|(_, binding)| match binding {
                Binding::Symbol(id) => Some(id),
                Binding::Opaque => None,
            })
            .filter(|id| match self.method_arity.get(id) {
                Some((count, true)) => args.len() + 1 >= *count,
                Some((count, false)) => args.len() == *count,
                None => false,
            })
            .collect();
        if let [id] = in_scope.as_slice() {
            let key = self.table.symbol(*id).qualified_name.clone();
            let returns = self.return_type_by_key(&key);
            return CallTarget::Found { key, returns };
        }

        for frame in self.classes.iter().rev() {
            match self.index.find_method(&frame.qualified_name, method, args) {
                MethodLookup::Found(owner, info) => {
                    return CallTarget::Found {
                        key: info.key.clone(),
                        returns: self.index.return_type(owner, info),
                    };
                }
                MethodLookup::Ambiguous(_) => return CallTarget::Unknown,
                MethodLookup::Absent => {}
            }
        }

        let owners = self.index.static_import_owners(self.unit_idx, method);
        for owner in &owners {
            if let Some(qn) = owner.known() {
                if let MethodLookup::Found(info, m) = self.index.find_method(qn, method, args) {
                    return CallTarget::Found {
                        key: m.key.clone(),
                        returns: self.index.return_type(info, m),
                    };
                }
            }
        }
        if let [TypeRef::External(owner)] = owners.as_slice() {
            return CallTarget::Missing { owner: owner.clone() };
        }

        match self.innermost_class() {
            Some(owner) => CallTarget::Missing { owner },
            None => CallTarget::Unknown,
        }
    }

    fn resolve_super_call(&self, method: &str, args: &[Option<StaticType>]) -> CallTarget {
        let supertypes = self
            .classes
            .last()
            .and_then(|frame| self.index.type_info(&frame.qualified_name))
            .map(|info| info.supertypes.clone())
            .unwrap_or_default();
        for supertype in &supertypes {
            if let TypeRef::Known(qn) = supertype {
                if let MethodLookup::Found(owner, info) = self.index.find_method(qn, method, args) {
                    return CallTarget::Found {
                        key: info.key.clone(),
                        returns: self.index.return_type(owner, info),
                    };
                }
            }
        }
        match supertypes.first() {
            Some(first) => CallTarget::Missing {
                owner: first.name().to_string(),
            },
            None => CallTarget::Missing {
                owner: "Object".to_string(),
            },
        }
    }

    fn return_type_by_key(&self, key: &str) -> Option<StaticType> {
        self.classes.iter().rev().find_map(|frame| {
            self.index
                .hierarchy(&frame.qualified_name)
                .into_iter()
                .find_map(|info| {
                    info.methods
                        .iter()
                        .find(|m| m.key == key)
                        .and_then(|m| self.index.return_type(info, m))
                })
        })
    }

    fn visit_field_access(&mut self, node: Node<'a>, object: Node<'a>, field: Node<'a>) {
        let index = self.index;
        if field.kind() == "this" {
            // Outer.this
            self.visit(object);
            let ty = self.types.get(&object.id()).cloned();
            self.set_type(node, ty);
            return;
        }
        let name = self.text(field);

        if object.kind() == "super" {
            let supertypes = self
                .classes
                .last()
                .and_then(|frame| index.type_info(&frame.qualified_name))
                .map(|info| info.supertypes.clone())
                .unwrap_or_default();
            for supertype in supertypes.iter().filter_map(TypeRef::known) {
                if let Some((owner, info)) = index.find_field(supertype, name) {
                    let key = info.key.clone();
                    let ty = index.field_type(owner, info);
                    self.link(field, &key, BindingState::Valid);
                    self.set_type(node, ty);
                    return;
                }
            }
            self.table.resolve(field, Resolution::Keep);
            return;
        }

        self.visit(object);
        let receiver = self.types.get(&object.id()).cloned();
        match receiver.as_ref().map(|r| r.member_owner()) {
            Some(Some(TypeRef::Known(qn))) => {
                let qn = qn.clone();
                if let Some((owner, info)) = index.find_field(&qn, name) {
                    let key = info.key.clone();
                    let ty = index.field_type(owner, info);
                    self.link(field, &key, BindingState::Valid);
                    self.set_type(node, ty);
                } else if let Some(nested) = index.find_member_type(&qn, name) {
                    self.link(field, &nested, BindingState::Valid);
                    self.types.insert(node.id(), StaticType::new(TypeRef::Known(nested)));
                } else {
                    let key = format!("{}.{}", qn, name);
                    self.link(field, &key, BindingState::Missing);
                }
            }
            Some(Some(TypeRef::External(owner))) => {
                let key = format!("{}.{}", owner, name);
                self.link(field, &key, BindingState::Missing);
            }
            Some(_) => self.table.resolve(field, Resolution::Keep),
            None => {
                // `pkg.Type` written out in an expression
                if is_name_chain(node) {
                    let text = type_text(self.unit, node);
                    if let Some(TypeRef::Known(qn)) = self.lookup_type(&text) {
                        self.link(field, &qn, BindingState::Valid);
                        self.types.insert(node.id(), StaticType::new(TypeRef::Known(qn)));
                        return;
                    }
                }
                self.table.resolve(field, Resolution::Keep);
            }
        }
    }

    fn visit_method_reference(&mut self, node: Node<'a>) {
        let parts = named_children(node);
        let Some(&object) = parts.first() else {
            return;
        };
        self.visit(object);
        let name = parts
            .last()
            .copied()
            .filter(|n| n.id() != object.id() && n.kind() == "identifier");
        let Some(name) = name else {
            return;
        };
        let receiver = match object.kind() {
            "super" => self
                .classes
                .last()
                .and_then(|f| self.index.type_info(&f.qualified_name))
                .and_then(|info| info.supertypes.first().cloned())
                .map(StaticType::new),
            _ => self
                .types
                .get(&object.id())
                .cloned()
                .or_else(|| self.static_type_of(&type_text(self.unit, object))),
        };

        let method = self.text(name);
        if let Some(TypeRef::Known(qn)) = receiver.as_ref().and_then(|r| r.member_owner()) {
            let keys: HashSet<String> = self
                .index
                .hierarchy(qn)
                .into_iter()
                .flat_map(|info| info.methods.iter())
                .filter(|m| m.name == method)
                .map(|m| m.key.clone())
                .collect();
            if keys.len() == 1 {
                if let Some(key) = keys.into_iter().next() {
                    self.link(name, &key, BindingState::Valid);
                    return;
                }
            }
        }
        self.table.resolve(name, Resolution::Keep);
    }

    fn visit_object_creation(&mut self, node: Node<'a>, ty: Node<'a>, body: Option<Node<'a>>) {
        for child in named_children(node) {
            if Some(child.id()) == body.map(|b| b.id()) {
                continue;
            }
            self.visit(child);
        }
        let created = self.static_type_of(&type_text(self.unit, ty));
        self.set_type(node, created);

        if let Some(body) = body {
            self.visit_anonymous_body(node, body);
        }
    }

    /// Record static types of expressions whose type follows from their syntax
    fn infer_type(&mut self, node: Node<'a>) {
        let child_type = |field: &str| {
            node.child_by_field_name(field)
                .and_then(|c| self.types.get(&c.id()).cloned())
        };
        let ty = match node.kind() {
            "this" => self
                .innermost_class()
                .map(|qn| StaticType::new(TypeRef::Known(qn))),
            "string_literal" | "text_block" => Some(StaticType::new(TypeRef::External("String".into()))),
            "character_literal" => Some(primitive("char")),
            "true" | "false" => Some(primitive("boolean")),
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal"
            | "binary_integer_literal" => {
                let long = self.text(node).ends_with(['l', 'L']);
                Some(primitive(if long { "long" } else { "int" }))
            }
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                let float = self.text(node).ends_with(['f', 'F']);
                Some(primitive(if float { "float" } else { "double" }))
            }
            "parenthesized_expression" => named_children(node)
                .first()
                .and_then(|c| self.types.get(&c.id()).cloned()),
            "cast_expression" => node
                .child_by_field_name("type")
                .and_then(|t| self.static_type_of(&type_text(self.unit, t))),
            "array_access" => child_type("array").and_then(|t| t.element()),
            "assignment_expression" => child_type("left"),
            "array_creation_expression" => node.child_by_field_name("type").and_then(|t| {
                let dims = named_children(node)
                    .iter()
                    .map(|c| match c.kind() {
                        "dimensions_expr" => 1,
                        "dimensions" => dimension_count(Some(*c)),
                        _ => 0,
                    })
                    .sum::<usize>();
                self.static_type_of(&type_text(self.unit, t))
                    .map(|base| StaticType { dims: base.dims + dims, ..base })
            }),
            _ => None,
        };
        self.set_type(node, ty);
    }

    // ---- names ----

    fn finish(&mut self, root: Node<'a>) {
        let mut taken: HashSet<String> = self.store.display_names().map(str::to_string).collect();

        // every identifier leaves the builder with a resolution
        let mut stack = vec![root];
        let mut kept = 0usize;
        while let Some(node) = stack.pop() {
            if matches!(node.kind(), "identifier" | "type_identifier") {
                taken.insert(self.text(node).to_string());
                if !self.table.is_resolved(node) {
                    self.table.resolve(node, Resolution::Keep);
                    kept += 1;
                }
            }
            stack.extend(children(node));
        }
        tracing::trace!("{}: {} identifiers kept as written", self.unit.path.display(), kept);

        for symbol in self.table.symbols_mut() {
            if let Some(name) = self.store.lookup(&symbol.qualified_name) {
                symbol.resolved_name = Some(name.to_string());
                taken.insert(name.to_string());
            }
        }

        for symbol in self.table.symbols_mut() {
            if symbol.resolved_name.is_some() || !symbol.kind.is_variable() {
                continue;
            }
            let suggestion = self.policy.suggest(symbol, &|name| taken.contains(name));
            if let Some(name) = suggestion {
                tracing::debug!("Renaming {} to {}", symbol.qualified_name, name);
                taken.insert(name.clone());
                symbol.resolved_name = Some(name);
            }
        }
    }
}

/// Members of a type body, enum body declarations flattened
fn body_members(body: Node<'_>) -> Vec<Node<'_>> {
    let mut members = Vec::new();
    for child in named_children(body) {
        if child.kind() == "enum_body_declarations" {
            members.extend(named_children(child));
        } else {
            members.push(child);
        }
    }
    members
}

/// Whether `node` is the qualifier of a member access, call or method reference
fn is_receiver(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "field_access" | "method_invocation" => parent
            .child_by_field_name("object")
            .is_some_and(|object| object.id() == node.id()),
        "method_reference" => parent.named_child(0).is_some_and(|first| first.id() == node.id()),
        _ => false,
    }
}

/// `a.b.c` made only of identifiers
fn is_name_chain(node: Node<'_>) -> bool {
    let mut node = node;
    while node.kind() == "field_access" {
        if !node.child_by_field_name("field").is_some_and(|f| f.kind() == "identifier") {
            return false;
        }
        match node.child_by_field_name("object") {
            Some(object) => node = object,
            None => return false,
        }
    }
    node.kind() == "identifier"
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn primitive(name: &str) -> StaticType {
    StaticType::new(TypeRef::Primitive(name.to_string()))
}

/// Type text for an inferred `var` type, used by the naming policy
fn describe(ty: &StaticType) -> String {
    let name = ty.base.name();
    let simple = name.rsplit('.').next().unwrap_or(name);
    format!("{}{}", simple, "[]".repeat(ty.dims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{FrontEnd, JavaParser};
    use crate::naming::{Preserve, TypeDerived};
    use std::path::Path;

    struct Fixture {
        units: Vec<CompilationUnit>,
        index: ProjectIndex,
    }

    fn fixture(sources: &[(&str, &str)]) -> Fixture {
        let parser = JavaParser::new();
        let units: Vec<CompilationUnit> = sources
            .iter()
            .map(|(path, text)| parser.parse(Path::new(path), text).unwrap())
            .collect();
        let index = ProjectIndex::build(&units);
        Fixture { units, index }
    }

    fn build(fixture: &Fixture, unit: usize, store: &SymbolStore) -> SymbolTable {
        ScopeBuilder::new(&fixture.units[unit], unit, &fixture.index, store, &Preserve).build()
    }

    /// (text, key) of every identifier with a key, in source order
    fn keys(fixture: &Fixture, unit: usize, table: &SymbolTable) -> Vec<(String, String)> {
        let unit = &fixture.units[unit];
        let mut out = Vec::new();
        let mut stack = vec![unit.root()];
        let mut nodes = Vec::new();
        while let Some(node) = stack.pop() {
            if matches!(node.kind(), "identifier" | "type_identifier") {
                nodes.push(node);
            }
            stack.extend(children(node));
        }
        nodes.sort_by_key(|n| n.start_byte());
        for node in nodes {
            if let Some((key, _)) = table.key_of(node) {
                out.push((unit.text(node).to_string(), key.to_string()));
            }
        }
        out
    }

    fn key_for<'k>(keys: &'k [(String, String)], text: &str) -> Vec<&'k str> {
        keys.iter()
            .filter(|(t, _)| t == text)
            .map(|(_, k)| k.as_str())
            .collect()
    }

    #[test]
    fn test_parameter_and_shadowing_local() {
        let f = fixture(&[(
            "Sample.java",
            "class Sample {\n\
               int compute(int a) {\n\
                 int b = a + a;\n\
                 {\n\
                   int a = 2;\n\
                   b += a;\n\
                 }\n\
                 return b;\n\
               }\n\
             }\n",
        )]);
        let table = build(&f, 0, &SymbolStore::new());
        let keys = keys(&f, 0, &table);

        assert_eq!(
            key_for(&keys, "a"),
            vec![
                "Sample.compute(int).a(param)",
                "Sample.compute(int).a(param)",
                "Sample.compute(int).a(param)",
                "Sample.compute(int).a(local#1)",
                "Sample.compute(int).a(local#1)",
            ]
        );
        assert_eq!(key_for(&keys, "b"), vec!["Sample.compute(int).b(local#1)"; 3]);
        assert_eq!(key_for(&keys, "compute"), vec!["Sample.compute(int)"]);
        assert_eq!(key_for(&keys, "Sample"), vec!["Sample"]);
    }

    #[test]
    fn test_deep_call_chain() {
        let chain = ".add(a)".repeat(5_000);
        let source = format!(
            "class Sb {{ Sb add(int x) {{ return this; }} }}\n\
             class Chain {{ Sb f(int a) {{ return new Sb(){}; }} }}\n",
            chain
        );
        let f = fixture(&[("Chain.java", &source)]);
        let table = build(&f, 0, &SymbolStore::new());
        let keys = keys(&f, 0, &table);

        assert_eq!(key_for(&keys, "add"), vec!["Sb.add(int)"; 5_001]);
        assert_eq!(key_for(&keys, "a"), vec!["Chain.f(int).a(param)"; 5_001]);
    }

    #[test]
    fn test_every_identifier_is_resolved() {
        let f = fixture(&[(
            "A.java",
            "package p;\nimport java.util.List;\n\
             class A<T> {\n\
               @Deprecated List<T> items;\n\
               void f() { outer: for (int i = 0; i < 3; i++) { continue outer; } }\n\
             }\n",
        )]);
        let table = build(&f, 0, &SymbolStore::new());
        let mut stack = vec![f.units[0].root()];
        while let Some(node) = stack.pop() {
            if matches!(node.kind(), "identifier" | "type_identifier") {
                assert!(table.is_resolved(node), "{}", f.units[0].text(node));
            }
            stack.extend(children(node));
        }
    }

    #[test]
    fn test_members_across_units() {
        let f = fixture(&[
            (
                "a/Base.java",
                "package a;\npublic class Base { protected int size; public int size() { return size; } }\n",
            ),
            (
                "a/Child.java",
                "package a;\n\
                 class Child extends Base {\n\
                   Base peer;\n\
                   int twice() { return size + peer.size() + this.size; }\n\
                   void g(java.io.PrintStream out) { out.println(size); unknown(1, 2); }\n\
                 }\n",
            ),
        ]);
        let table = build(&f, 1, &SymbolStore::new());
        let keys = keys(&f, 1, &table);

        assert_eq!(
            key_for(&keys, "size"),
            vec!["a.Base.size", "a.Base.size()", "a.Base.size", "a.Base.size"]
        );
        assert_eq!(key_for(&keys, "Base"), vec!["a.Base", "a.Base"]);
        assert_eq!(key_for(&keys, "println"), vec!["java.io.PrintStream.println(?)"]);
        assert_eq!(key_for(&keys, "unknown"), vec!["a.Child.unknown(?,?)"]);

        let mut stack = vec![f.units[1].root()];
        while let Some(node) = stack.pop() {
            if f.units[1].text(node) == "unknown" && node.kind() == "identifier" {
                assert_eq!(table.key_of(node).map(|(_, s)| s), Some(BindingState::Missing));
            }
            stack.extend(children(node));
        }
    }

    #[test]
    fn test_lambda_catch_and_loop_variables() {
        let f = fixture(&[(
            "L.java",
            "class L {\n\
               void run(java.util.List<String> xs) {\n\
                 for (String s : xs) { xs.forEach(s2 -> s2.length()); }\n\
                 try { run(xs); } catch (RuntimeException e) { throw e; }\n\
                 for (String s : xs) {}\n\
               }\n\
             }\n",
        )]);
        let table = build(&f, 0, &SymbolStore::new());
        let keys = keys(&f, 0, &table);

        let member = "L.run(java.util.List)";
        assert_eq!(key_for(&keys, "s"), vec![format!("{}.s(local#1)", member), format!("{}.s(local#2)", member)]);
        assert_eq!(key_for(&keys, "s2"), vec![format!("{}.s2(local#1)", member); 2]);
        assert_eq!(key_for(&keys, "e"), vec![format!("{}.e(local#1)", member); 2]);
        assert_eq!(key_for(&keys, "run"), vec!["L.run(java.util.List)", "L.run(java.util.List)"]);
    }

    #[test]
    fn test_enum_case_labels_and_records() {
        let f = fixture(&[(
            "E.java",
            "enum Color { RED, GREEN }\n\
             record Point(int x, int y) {}\n\
             class Use {\n\
               int f(Color c, Point p) {\n\
                 switch (c) { case RED: return p.x(); default: return p.y; }\n\
               }\n\
             }\n",
        )]);
        let table = build(&f, 0, &SymbolStore::new());
        let keys = keys(&f, 0, &table);

        assert_eq!(key_for(&keys, "RED"), vec!["Color.RED", "Color.RED"]);
        assert_eq!(key_for(&keys, "x"), vec!["Point.x", "Point.x"]);
        assert_eq!(key_for(&keys, "y"), vec!["Point.y", "Point.y"]);
    }

    #[test]
    fn test_anonymous_and_local_classes() {
        let f = fixture(&[(
            "O.java",
            "class O {\n\
               void f() {\n\
                 class Helper { int v; }\n\
                 Helper h = new Helper();\n\
                 int n = h.v;\n\
                 Runnable r = new Runnable() { public void run() { int n = 1; } };\n\
               }\n\
             }\n",
        )]);
        let table = build(&f, 0, &SymbolStore::new());
        let keys = keys(&f, 0, &table);

        assert_eq!(key_for(&keys, "Helper"), vec!["O.f().Helper"; 3]);
        assert_eq!(key_for(&keys, "v"), vec!["O.f().Helper.v"; 2]);
        assert_eq!(key_for(&keys, "n"), vec!["O.f().n(local#1)", "O.$1.run().n(local#1)"]);
        assert_eq!(key_for(&keys, "run"), vec!["O.$1.run()"]);
    }

    #[test]
    fn test_store_names_and_naming_policy() {
        let f = fixture(&[(
            "N.java",
            "class N { void f(int a) { StringBuilder b = new StringBuilder(); int stringBuilder = a; } }\n",
        )]);
        let store = SymbolStore::from_json(Path::new("mem"), r#"{"N.f(int).a(param)": "index"}"#).unwrap();
        let table = ScopeBuilder::new(&f.units[0], 0, &f.index, &store, &TypeDerived).build();

        let names: HashMap<&str, Option<&str>> = table
            .symbols()
            .map(|(_, s)| (s.qualified_name.as_str(), s.resolved_name.as_deref()))
            .collect();
        assert_eq!(names["N.f(int).a(param)"], Some("index"));
        // `stringBuilder` is already used in the unit
        assert_eq!(names["N.f(int).b(local#1)"], Some("stringBuilder2"));
        assert_eq!(names["N.f(int).stringBuilder(local#1)"], None);
    }
}
