//! Project index - cross-file type and member bindings
//!
//! Built once from every compilation unit of a run. Records each type
//! declaration (top-level, member, local and anonymous) with its members and
//! supertypes, and each unit's imports. Everything the builder cannot see
//! through its own lexical scopes is answered here:
//!
//! 1. `resolve_type`: simple or dotted type name in a unit/class context
//! 2. `find_field` / `find_method`: member lookup through the supertype chain
//! 3. `enums_with_constant`: owners of a bare `case` label
//!
//! Types outside the analyzed set come back as [`TypeRef::External`].

use super::parser::CompilationUnit;
use super::syntax::{
    children, classify, declared_name, declared_type, has_modifier, named_children, simple_name,
    split_dims, type_text, Syntax, TypeDeclKind,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tree_sitter::Node;

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// A resolved type name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Declared in the analyzed set; carries the qualified name
    Known(String),
    /// Not in the analyzed set; import-qualified name, else as written
    External(String),
    Primitive(String),
}

impl TypeRef {
    /// Qualified (or best-effort) name of the type
    pub fn name(&self) -> &str {
        match self {
            TypeRef::Known(name) | TypeRef::External(name) | TypeRef::Primitive(name) => name,
        }
    }

    pub fn known(&self) -> Option<&str> {
        match self {
            TypeRef::Known(name) => Some(name),
            _ => None,
        }
    }
}

/// Static type of an expression or declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticType {
    pub base: TypeRef,
    pub dims: usize,
}

impl StaticType {
    pub fn new(base: TypeRef) -> Self {
        Self { base, dims: 0 }
    }

    pub fn is_array(&self) -> bool {
        self.dims > 0
    }

    /// Element type of an array type
    pub fn element(&self) -> Option<StaticType> {
        (self.dims > 0).then(|| StaticType {
            base: self.base.clone(),
            dims: self.dims - 1,
        })
    }

    /// Type whose members a `.name` access looks up; arrays have none
    pub fn member_owner(&self) -> Option<&TypeRef> {
        (self.dims == 0 && !matches!(self.base, TypeRef::Primitive(_))).then_some(&self.base)
    }

    fn same_as(&self, other: &StaticType) -> bool {
        self.dims == other.dims && simple_name(self.base.name()) == simple_name(other.base.name())
    }
}

/// A unit's package and import declarations
#[derive(Debug, Clone, Default)]
pub struct Imports {
    pub package: String,
    /// Simple name -> imported qualified name
    pub single: BTreeMap<String, String>,
    pub on_demand: Vec<String>,
    /// `import static a.B.name;` as (`a.B`, `name`)
    pub static_single: Vec<(String, String)>,
    /// `import static a.B.*;` as `a.B`
    pub static_on_demand: Vec<String>,
}

impl Imports {
    fn qualify(&self, simple: &str) -> String {
        if self.package.is_empty() {
            simple.to_string()
        } else {
            format!("{}.{}", self.package, simple)
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub key: String,
    pub type_text: String,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    /// Source name, `<init>` for constructors
    pub name: String,
    pub key: String,
    pub param_types: Vec<String>,
    pub varargs: bool,
    /// `None` for constructors
    pub return_type: Option<String>,
    pub type_params: Vec<String>,
}

impl MethodInfo {
    pub fn accepts_arity(&self, count: usize) -> bool {
        if self.varargs {
            count + 1 >= self.param_types.len()
        } else {
            count == self.param_types.len()
        }
    }

    /// Declared type of the parameter receiving argument `index`
    fn param_for(&self, index: usize) -> Option<String> {
        let last = self.param_types.len().checked_sub(1)?;
        if self.varargs && index >= last {
            let (base, dims) = split_dims(&self.param_types[last]);
            if index == last && dims == 0 {
                return Some(base.to_string());
            }
            // a lone vararg argument may be the element or the array itself
            return Some(format!("{}{}", base, "[]".repeat(dims.saturating_sub(1))));
        }
        self.param_types.get(index).cloned()
    }
}

/// A declared type with its members
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub qualified_name: String,
    pub name: String,
    pub kind: TypeDeclKind,
    /// Enclosing type for member, local and anonymous types
    pub enclosing: Option<String>,
    /// Local and anonymous types are not reachable by name from other units
    pub is_local: bool,
    pub unit: usize,
    pub type_params: Vec<String>,
    super_texts: Vec<String>,
    pub supertypes: Vec<TypeRef>,
    pub fields: BTreeMap<String, FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub member_types: BTreeMap<String, String>,
}

/// Result of a method lookup
#[derive(Debug)]
pub enum MethodLookup<'a> {
    Found(&'a TypeInfo, &'a MethodInfo),
    /// Several overloads fit; the call is left unresolved
    Ambiguous(usize),
    Absent,
}

/// Cross-file bindings of the analyzed set
#[derive(Debug, Default)]
pub struct ProjectIndex {
    types: HashMap<String, TypeInfo>,
    by_simple: HashMap<String, Vec<String>>,
    imports: Vec<Imports>,
    /// (unit, declaration node id) -> qualified type name
    decls: HashMap<(usize, usize), String>,
}

impl ProjectIndex {
    /// Index every unit, then link supertypes
    pub fn build(units: &[CompilationUnit]) -> Self {
        let mut index = Self::default();
        for (unit_idx, unit) in units.iter().enumerate() {
            let imports = read_imports(unit);
            index.imports.push(imports);
            let mut indexer = Indexer {
                unit,
                unit_idx,
                index: &mut index,
                anonymous: HashMap::new(),
            };
            indexer.walk(unit.root());
        }
        index.link();
        tracing::debug!(
            "Indexed {} types across {} units",
            index.types.len(),
            index.imports.len()
        );
        index
    }

    fn link(&mut self) {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        for qn in names {
            let Some(info) = self.types.get(&qn) else {
                continue;
            };
            let context = info.enclosing.clone();
            let unit = info.unit;
            let texts = info.super_texts.clone();
            let resolved: Vec<TypeRef> = texts
                .iter()
                .map(|text| self.resolve_with(unit, context.as_deref(), text, false))
                .collect();
            if let Some(info) = self.types.get_mut(&qn) {
                info.supertypes = resolved;
            }
        }
    }

    pub fn type_info(&self, qualified_name: &str) -> Option<&TypeInfo> {
        self.types.get(qualified_name)
    }

    /// Qualified name of the type declared at `node`
    pub fn type_at(&self, unit: usize, node: Node<'_>) -> Option<&str> {
        self.decls.get(&(unit, node.id())).map(String::as_str)
    }

    pub fn imports(&self, unit: usize) -> Option<&Imports> {
        self.imports.get(unit)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolve a type name as written in `context` (innermost class)
    pub fn resolve_type(&self, unit: usize, context: Option<&str>, name: &str) -> TypeRef {
        self.resolve_with(unit, context, name, true)
    }

    /// Resolve a type text that may carry array dimensions
    pub fn resolve_static(&self, unit: usize, context: Option<&str>, text: &str) -> StaticType {
        let (base, dims) = split_dims(text);
        StaticType {
            base: self.resolve_type(unit, context, base),
            dims,
        }
    }

    fn resolve_with(&self, unit: usize, context: Option<&str>, name: &str, inherited: bool) -> TypeRef {
        let name = name.trim();
        if PRIMITIVES.contains(&name) {
            return TypeRef::Primitive(name.to_string());
        }
        let imports = self.imports.get(unit);

        if let Some((first, rest)) = name.split_once('.') {
            if self.types.contains_key(name) {
                return TypeRef::Known(name.to_string());
            }
            if let Some(outer) = self.lookup_simple(unit, context, first, inherited) {
                if let Some(qn) = self.descend(&outer, rest) {
                    return TypeRef::Known(qn);
                }
            }
            // longest declared prefix of a fully qualified nested name
            for (dot, _) in name.match_indices('.').collect::<Vec<_>>().into_iter().rev() {
                if self.types.contains_key(&name[..dot]) {
                    if let Some(qn) = self.descend(&name[..dot], &name[dot + 1..]) {
                        return TypeRef::Known(qn);
                    }
                }
            }
            let qualified = imports
                .and_then(|i| i.single.get(first))
                .map(|q| format!("{}.{}", q, rest))
                .unwrap_or_else(|| name.to_string());
            return TypeRef::External(qualified);
        }

        match self.lookup_simple(unit, context, name, inherited) {
            Some(qn) => TypeRef::Known(qn),
            None => TypeRef::External(
                imports
                    .and_then(|i| i.single.get(name).cloned())
                    .unwrap_or_else(|| name.to_string()),
            ),
        }
    }

    fn lookup_simple(&self, unit: usize, context: Option<&str>, name: &str, inherited: bool) -> Option<String> {
        let mut current = context.map(str::to_string);
        while let Some(qn) = current {
            let Some(info) = self.types.get(&qn) else {
                break;
            };
            if info.name == name {
                return Some(qn);
            }
            let member = if inherited {
                self.find_member_type(&qn, name)
            } else {
                info.member_types.get(name).cloned()
            };
            if member.is_some() {
                return member;
            }
            current = info.enclosing.clone();
        }

        let imports = self.imports.get(unit)?;
        if let Some(qualified) = imports.single.get(name) {
            return self.types.contains_key(qualified).then(|| qualified.clone());
        }
        let same_package = imports.qualify(name);
        if self.types.contains_key(&same_package) {
            return Some(same_package);
        }
        for prefix in &imports.on_demand {
            let candidate = format!("{}.{}", prefix, name);
            if self.types.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        match self.by_simple.get(name).map(Vec::as_slice) {
            Some([only]) => Some(only.clone()),
            _ => None,
        }
    }

    fn descend(&self, outer: &str, rest: &str) -> Option<String> {
        rest.split('.')
            .try_fold(outer.to_string(), |current, segment| self.find_member_type(&current, segment))
    }

    /// The type and its supertypes in breadth-first order, analyzed set only
    pub fn hierarchy(&self, qualified_name: &str) -> Vec<&TypeInfo> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([qualified_name.to_string()]);
        while let Some(qn) = queue.pop_front() {
            if !seen.insert(qn.clone()) {
                continue;
            }
            if let Some(info) = self.types.get(&qn) {
                queue.extend(info.supertypes.iter().filter_map(|s| s.known().map(str::to_string)));
                out.push(info);
            }
        }
        out
    }

    /// Member type `name` declared in or inherited by `owner`
    pub fn find_member_type(&self, owner: &str, name: &str) -> Option<String> {
        self.hierarchy(owner)
            .into_iter()
            .find_map(|info| info.member_types.get(name).cloned())
    }

    /// Field `name` declared in or inherited by `owner`
    pub fn find_field(&self, owner: &str, name: &str) -> Option<(&TypeInfo, &FieldInfo)> {
        self.hierarchy(owner)
            .into_iter()
            .find_map(|info| info.fields.get(name).map(|field| (info, field)))
    }

    /// Overload lookup by name, arity, then by whatever argument types are known
    pub fn find_method(&self, owner: &str, name: &str, args: &[Option<StaticType>]) -> MethodLookup<'_> {
        let mut signatures = HashSet::new();
        let mut candidates = Vec::new();
        for info in self.hierarchy(owner) {
            for method in info.methods.iter().filter(|m| m.name == name) {
                // overriding declarations shadow the inherited ones
                if signatures.insert(method.param_types.join(",")) {
                    candidates.push((info, method));
                }
            }
        }

        let by_arity: Vec<_> = candidates
            .into_iter()
            .filter(|(_, m)| m.accepts_arity(args.len()))
            .collect();
        let exact: Vec<_> = by_arity
            .iter()
            .copied()
            .filter(|(_, m)| !m.varargs)
            .collect();
        let pool = if exact.is_empty() { by_arity } else { exact };

        match pool.as_slice() {
            [] => MethodLookup::Absent,
            &[(info, method)] => MethodLookup::Found(info, method),
            _ => {
                let typed: Vec<_> = pool
                    .iter()
                    .filter(|(info, method)| self.arguments_match(info, method, args))
                    .collect();
                match typed.as_slice() {
                    &[&(info, method)] => MethodLookup::Found(info, method),
                    _ => MethodLookup::Ambiguous(pool.len()),
                }
            }
        }
    }

    fn arguments_match(&self, owner: &TypeInfo, method: &MethodInfo, args: &[Option<StaticType>]) -> bool {
        args.iter().enumerate().all(|(i, arg)| {
            let Some(arg) = arg else {
                return true;
            };
            let Some(param) = method.param_for(i) else {
                return false;
            };
            match self.member_type(owner, &param, &method.type_params) {
                Some(param) => param.same_as(arg),
                None => true,
            }
        })
    }

    /// Resolve a member's declared type text in the context of its owner
    ///
    /// `None` when the type is a type variable of the owner or the method.
    pub fn member_type(&self, owner: &TypeInfo, text: &str, method_params: &[String]) -> Option<StaticType> {
        let (base, dims) = split_dims(text);
        let head = base.split('.').next().unwrap_or(base);
        if method_params.iter().any(|p| p == head) || self.is_type_param(owner, head) {
            return None;
        }
        Some(StaticType {
            base: self.resolve_type(owner.unit, Some(&owner.qualified_name), base),
            dims,
        })
    }

    fn is_type_param(&self, owner: &TypeInfo, name: &str) -> bool {
        let mut current = Some(owner);
        while let Some(info) = current {
            if info.type_params.iter().any(|p| p == name) {
                return true;
            }
            current = info.enclosing.as_deref().and_then(|e| self.types.get(e));
        }
        false
    }

    pub fn field_type(&self, owner: &TypeInfo, field: &FieldInfo) -> Option<StaticType> {
        self.member_type(owner, &field.type_text, &[])
    }

    pub fn return_type(&self, owner: &TypeInfo, method: &MethodInfo) -> Option<StaticType> {
        match &method.return_type {
            Some(text) => self.member_type(owner, text, &method.type_params),
            None => Some(StaticType::new(TypeRef::Known(owner.qualified_name.clone()))),
        }
    }

    /// Enum types of the analyzed set declaring a constant `name`
    pub fn enums_with_constant(&self, name: &str) -> Vec<&str> {
        let mut owners: Vec<&str> = self
            .types
            .values()
            .filter(|info| info.kind == TypeDeclKind::Enum && info.fields.contains_key(name))
            .map(|info| info.qualified_name.as_str())
            .collect();
        owners.sort();
        owners
    }

    /// Owners a statically imported `name` may come from
    pub fn static_import_owners(&self, unit: usize, name: &str) -> Vec<TypeRef> {
        let Some(imports) = self.imports.get(unit) else {
            return Vec::new();
        };
        imports
            .static_single
            .iter()
            .filter(|(_, member)| member == name)
            .map(|(owner, _)| owner)
            .chain(imports.static_on_demand.iter())
            .map(|owner| self.resolve_type(unit, None, owner))
            .collect()
    }

    fn insert(&mut self, unit: usize, node: Node<'_>, info: TypeInfo) {
        if !info.is_local {
            self.by_simple
                .entry(info.name.clone())
                .or_default()
                .push(info.qualified_name.clone());
        }
        self.decls.insert((unit, node.id()), info.qualified_name.clone());
        if self.types.contains_key(&info.qualified_name) {
            tracing::warn!("Duplicate type declaration {}", info.qualified_name);
        }
        self.types.insert(info.qualified_name.clone(), info);
    }
}

/// Key of a method, constructor, initializer or field-initializer context
///
/// `owner.name(T1,T2)` with parameter types as written, generic arguments
/// stripped and varargs as `[]`; constructors are named `<init>`,
/// initializer code belongs to `owner.<init>` or `owner.<clinit>`.
pub fn member_key(unit: &CompilationUnit, owner: &str, node: Node<'_>) -> String {
    match classify(node) {
        Syntax::Method {
            node,
            name,
            params,
            constructor,
            ..
        } => {
            let name = if constructor { "<init>" } else { unit.text(name) };
            let (types, _) = if node.kind() == "compact_constructor_declaration" {
                record_components(unit, node)
                    .map(|(types, _)| (types, false))
                    .unwrap_or_default()
            } else {
                params.map(|p| parameter_types(unit, p)).unwrap_or_default()
            };
            format!("{}.{}({})", owner, name, types.join(","))
        }
        Syntax::AnnotationElement { name, .. } => format!("{}.{}()", owner, unit.text(name)),
        Syntax::Initializer { is_static, .. } => initializer_key(owner, is_static),
        Syntax::Field { node, .. } => initializer_key(owner, is_static_field(node)),
        _ => format!("{}.<init>", owner),
    }
}

pub fn initializer_key(owner: &str, is_static: bool) -> String {
    format!("{}.{}", owner, if is_static { "<clinit>" } else { "<init>" })
}

/// Fields of interfaces are implicitly static
pub fn is_static_field(node: Node<'_>) -> bool {
    node.kind() == "constant_declaration" || has_modifier(node, "static")
}

/// Number of `[]` pairs in a `dimensions` node
pub fn dimension_count(node: Option<Node<'_>>) -> usize {
    node.map(|d| children(d).iter().filter(|c| c.kind() == "[").count())
        .unwrap_or(0)
}

/// Declared type text of one parameter, including C-style and varargs dims
pub fn parameter_type(unit: &CompilationUnit, param: Node<'_>) -> Option<String> {
    let ty = declared_type(param)?;
    let mut text = type_text(unit, ty);
    let mut dims = dimension_count(param.child_by_field_name("dimensions"));
    if param.kind() == "spread_parameter" {
        dims += 1;
        let declarator = named_children(param)
            .into_iter()
            .find(|c| c.kind() == "variable_declarator");
        dims += dimension_count(declarator.and_then(|d| d.child_by_field_name("dimensions")));
    }
    text.push_str(&"[]".repeat(dims));
    Some(text)
}

/// Parameter types of a `formal_parameters` node and whether the last is varargs
pub fn parameter_types(unit: &CompilationUnit, params: Node<'_>) -> (Vec<String>, bool) {
    let mut varargs = false;
    let mut types = Vec::new();
    for param in named_children(params) {
        match param.kind() {
            "formal_parameter" => types.extend(parameter_type(unit, param)),
            "spread_parameter" => {
                varargs = true;
                types.extend(parameter_type(unit, param));
            }
            _ => {}
        }
    }
    (types, varargs)
}

/// Component types and names of the record declaring `node` (or being `node`)
fn record_components(unit: &CompilationUnit, node: Node<'_>) -> Option<(Vec<String>, Vec<String>)> {
    let mut record = node;
    while record.kind() != "record_declaration" {
        record = record.parent()?;
    }
    let params = record.child_by_field_name("parameters")?;
    let mut types = Vec::new();
    let mut names = Vec::new();
    for param in named_children(params) {
        if let (Some(ty), Some(name)) = (parameter_type(unit, param), declared_name(param)) {
            types.push(ty);
            names.push(unit.text(name).to_string());
        }
    }
    Some((types, names))
}

fn read_imports(unit: &CompilationUnit) -> Imports {
    let mut imports = Imports::default();
    for node in named_children(unit.root()) {
        match classify(node) {
            Syntax::Package(node) => {
                if let Some(name) = named_children(node)
                    .into_iter()
                    .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
                {
                    imports.package = unit.text(name).to_string();
                }
            }
            Syntax::Import(node) => {
                let parts = children(node);
                let is_static = parts.iter().any(|c| c.kind() == "static");
                let on_demand = parts.iter().any(|c| c.kind() == "asterisk");
                let Some(name) = parts
                    .iter()
                    .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
                    .map(|n| unit.text(*n).to_string())
                else {
                    continue;
                };
                match (is_static, on_demand) {
                    (false, false) => {
                        imports.single.insert(simple_name(&name).to_string(), name);
                    }
                    (false, true) => imports.on_demand.push(name),
                    (true, false) => {
                        if let Some((owner, member)) = name.rsplit_once('.') {
                            imports
                                .static_single
                                .push((owner.to_string(), member.to_string()));
                        }
                    }
                    (true, true) => imports.static_on_demand.push(name),
                }
            }
            _ => {}
        }
    }
    imports
}

struct Indexer<'a> {
    unit: &'a CompilationUnit,
    unit_idx: usize,
    index: &'a mut ProjectIndex,
    /// Anonymous class counter per enclosing type
    anonymous: HashMap<String, usize>,
}

/// Pending step of the indexing walk
enum Task<'t> {
    Walk {
        node: Node<'t>,
        owner: Option<String>,
        member: Option<String>,
    },
    /// Runs after the creation's arguments, so classes nested there number first
    Anonymous {
        node: Node<'t>,
        body: Node<'t>,
        owner: String,
        super_text: String,
    },
}

/// Queue `nodes` so that they are walked in source order
fn push_walks<'t>(stack: &mut Vec<Task<'t>>, nodes: Vec<Node<'t>>, owner: Option<&str>, member: Option<&str>) {
    for node in nodes.into_iter().rev() {
        stack.push(Task::Walk {
            node,
            owner: owner.map(str::to_string),
            member: member.map(str::to_string),
        });
    }
}

impl Indexer<'_> {
    fn walk(&mut self, root: Node<'_>) {
        let mut stack = vec![Task::Walk {
            node: root,
            owner: None,
            member: None,
        }];
        while let Some(task) = stack.pop() {
            match task {
                Task::Walk { node, owner, member } => {
                    self.step(node, owner.as_deref(), member.as_deref(), &mut stack)
                }
                Task::Anonymous {
                    node,
                    body,
                    owner,
                    super_text,
                } => {
                    let qualified_name = self.anonymous_type(node, body, &owner, super_text);
                    push_walks(&mut stack, named_children(body), Some(qualified_name.as_str()), None);
                }
            }
        }
    }

    fn step<'t>(&mut self, node: Node<'t>, owner: Option<&str>, member: Option<&str>, stack: &mut Vec<Task<'t>>) {
        match classify(node) {
            Syntax::TypeDecl { node, kind, name, body } => {
                let simple = self.unit.text(name).to_string();
                let qualified_name = match (owner, member) {
                    (_, Some(member)) => format!("{}.{}", member, simple),
                    (Some(owner), None) => format!("{}.{}", owner, simple),
                    (None, None) => self.index.imports[self.unit_idx].qualify(&simple),
                };
                let mut info = self.new_type(&qualified_name, &simple, kind, owner, member.is_some());
                info.super_texts = supertype_texts(self.unit, node);
                info.type_params = type_parameters(self.unit, node);
                if kind == TypeDeclKind::Record {
                    self.add_record_components(&mut info, node);
                }
                self.add_members(&mut info, body);
                self.index.insert(self.unit_idx, node, info);
                push_walks(stack, named_children(body), Some(qualified_name.as_str()), None);
            }
            Syntax::ObjectCreation {
                node,
                ty,
                body: Some(body),
            } => {
                let Some(owner) = owner else {
                    return;
                };
                stack.push(Task::Anonymous {
                    node,
                    body,
                    owner: owner.to_string(),
                    super_text: type_text(self.unit, ty),
                });
                let args = named_children(node).into_iter().filter(|c| c.id() != body.id()).collect();
                push_walks(stack, args, Some(owner), member);
            }
            Syntax::EnumConstant {
                node,
                body: Some(body),
                ..
            } => {
                let Some(owner) = owner else {
                    return;
                };
                stack.push(Task::Anonymous {
                    node,
                    body,
                    owner: owner.to_string(),
                    super_text: owner.to_string(),
                });
                let args = named_children(node).into_iter().filter(|c| c.id() != body.id()).collect();
                push_walks(stack, args, Some(owner), member);
            }
            Syntax::Method { node, .. }
            | Syntax::Initializer { node, .. }
            | Syntax::Field { node, .. }
            | Syntax::AnnotationElement { node, .. } => {
                let key = owner.map(|o| member_key(self.unit, o, node));
                push_walks(stack, named_children(node), owner, key.as_deref().or(member));
            }
            _ => push_walks(stack, named_children(node), owner, member),
        }
    }

    fn anonymous_type(&mut self, node: Node<'_>, body: Node<'_>, owner: &str, super_text: String) -> String {
        let counter = self.anonymous.entry(owner.to_string()).or_insert(0);
        *counter += 1;
        let qualified_name = format!("{}.${}", owner, counter);
        let mut info = self.new_type(&qualified_name, "", TypeDeclKind::Class, Some(owner), true);
        info.super_texts = vec![super_text];
        self.add_members(&mut info, body);
        self.index.insert(self.unit_idx, node, info);
        qualified_name
    }

    fn new_type(&self, qn: &str, name: &str, kind: TypeDeclKind, owner: Option<&str>, is_local: bool) -> TypeInfo {
        TypeInfo {
            qualified_name: qn.to_string(),
            name: name.to_string(),
            kind,
            enclosing: owner.map(str::to_string),
            is_local,
            unit: self.unit_idx,
            type_params: Vec::new(),
            super_texts: Vec::new(),
            supertypes: Vec::new(),
            fields: BTreeMap::new(),
            methods: Vec::new(),
            member_types: BTreeMap::new(),
        }
    }

    fn add_record_components(&self, info: &mut TypeInfo, node: Node<'_>) {
        let Some((types, names)) = record_components(self.unit, node) else {
            return;
        };
        for (ty, name) in types.into_iter().zip(names) {
            let key = format!("{}.{}", info.qualified_name, name);
            // the implicit accessor shares the component's key
            info.methods.push(MethodInfo {
                name: name.clone(),
                key: key.clone(),
                param_types: Vec::new(),
                varargs: false,
                return_type: Some(ty.clone()),
                type_params: Vec::new(),
            });
            info.fields.insert(name.clone(), FieldInfo { name, key, type_text: ty });
        }
    }

    fn add_members(&self, info: &mut TypeInfo, body: Node<'_>) {
        let unit = self.unit;
        let qn = info.qualified_name.clone();
        let mut members = Vec::new();
        for child in named_children(body) {
            if child.kind() == "enum_body_declarations" {
                members.extend(named_children(child));
            } else {
                members.push(child);
            }
        }

        for member in members {
            match classify(member) {
                Syntax::Field { node, ty } => {
                    let base = type_text(unit, ty);
                    for declarator in named_children(node)
                        .into_iter()
                        .filter(|c| c.kind() == "variable_declarator")
                    {
                        let Some(name) = declarator.child_by_field_name("name") else {
                            continue;
                        };
                        let name = unit.text(name).to_string();
                        let dims = dimension_count(declarator.child_by_field_name("dimensions"));
                        info.fields.insert(
                            name.clone(),
                            FieldInfo {
                                key: format!("{}.{}", qn, name),
                                type_text: format!("{}{}", base, "[]".repeat(dims)),
                                name,
                            },
                        );
                    }
                }
                Syntax::EnumConstant { name, .. } => {
                    let name = unit.text(name).to_string();
                    info.fields.insert(
                        name.clone(),
                        FieldInfo {
                            key: format!("{}.{}", qn, name),
                            type_text: qn.clone(),
                            name,
                        },
                    );
                }
                Syntax::Method {
                    node,
                    name,
                    params,
                    constructor,
                    ..
                } => {
                    let (param_types, varargs) = if node.kind() == "compact_constructor_declaration" {
                        record_components(unit, node)
                            .map(|(types, _)| (types, false))
                            .unwrap_or_default()
                    } else {
                        params.map(|p| parameter_types(unit, p)).unwrap_or_default()
                    };
                    let method_name = if constructor { "<init>".to_string() } else { unit.text(name).to_string() };
                    let return_type = node.child_by_field_name("type").filter(|_| !constructor).map(|t| {
                        let dims = dimension_count(node.child_by_field_name("dimensions"));
                        format!("{}{}", type_text(unit, t), "[]".repeat(dims))
                    });
                    if !constructor {
                        // an explicit accessor replaces the implicit record one
                        info.methods.retain(|m| !(m.name == method_name && m.param_types.is_empty() && param_types.is_empty()));
                    }
                    info.methods.push(MethodInfo {
                        name: method_name,
                        key: member_key(unit, &qn, node),
                        param_types,
                        varargs,
                        return_type,
                        type_params: type_parameters(unit, node),
                    });
                }
                Syntax::AnnotationElement { node, name } => {
                    info.methods.push(MethodInfo {
                        name: unit.text(name).to_string(),
                        key: member_key(unit, &qn, node),
                        param_types: Vec::new(),
                        varargs: false,
                        return_type: node.child_by_field_name("type").map(|t| type_text(unit, t)),
                        type_params: Vec::new(),
                    });
                }
                Syntax::TypeDecl { name, .. } => {
                    let name = unit.text(name).to_string();
                    info.member_types.insert(name.clone(), format!("{}.{}", qn, name));
                }
                _ => {}
            }
        }
    }
}

/// `extends` / `implements` type texts of a declaration
fn supertype_texts(unit: &CompilationUnit, node: Node<'_>) -> Vec<String> {
    let mut texts = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "superclass" => texts.extend(named_children(child).first().map(|t| type_text(unit, *t))),
            "super_interfaces" | "extends_interfaces" => {
                for list in named_children(child).into_iter().filter(|c| c.kind() == "type_list") {
                    texts.extend(named_children(list).into_iter().map(|t| type_text(unit, t)));
                }
            }
            _ => {}
        }
    }
    texts
}

/// Names of the type parameters a declaration introduces
pub fn type_parameters(unit: &CompilationUnit, node: Node<'_>) -> Vec<String> {
    let Some(params) = node.child_by_field_name("type_parameters").or_else(|| {
        named_children(node)
            .into_iter()
            .find(|c| c.kind() == "type_parameters")
    }) else {
        return Vec::new();
    };
    named_children(params)
        .into_iter()
        .filter(|p| p.kind() == "type_parameter")
        .filter_map(|p| {
            named_children(p)
                .into_iter()
                .find(|c| matches!(c.kind(), "type_identifier" | "identifier"))
        })
        .map(|name| unit.text(name).to_string())
        .collect()
}
