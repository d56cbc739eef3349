//! The type system adapter consumed by the inference engine.
//!
//! [`TypeSystem`] is the contract: the scanner, collector, synthesizer and
//! driver only ever see a `&dyn TypeSystem`. [`Program`] implements it over a
//! single parsed [`SourceUnit`], resolving names within that unit only.

pub mod syntax;

use std::collections::{HashMap, HashSet};

use log::trace;
use tree_sitter::Node;

use crate::parser::SourceUnit;
use crate::types::{Field, PrimitiveKind, Type, TypeEnv};
use syntax::{bound_names, call_arguments, is_function_like, operator, parameters_of, text, unquote};

/// Depth limit when chasing `extends` clauses and aliases of named types.
const MAX_NAMED_DEPTH: usize = 16;

/// Nesting limit for type annotations and expressions. Deeper nodes are not
/// analyzed: types are kept verbatim and expressions have no static type.
const MAX_NESTING_DEPTH: usize = 256;

/// Read-only type queries over one compilation unit.
pub trait TypeSystem<'tree> {
    /// Source text of the unit.
    fn source(&self) -> &'tree str;

    /// Returns true when `ty` is open (unresolved/dynamic).
    fn is_open_type(&self, ty: &Type) -> bool {
        ty.is_dynamic()
    }

    /// Resolved type of a parameter declaration. `None` means the adapter could
    /// not tell, which callers treat as not open.
    fn resolved_type_of_parameter(&self, param: Node<'tree>) -> Option<Type>;

    /// Resolves a callee expression to the function declaration it names.
    fn resolve_function(&self, callee: Node<'tree>) -> Option<Node<'tree>>;

    /// Declared type of `function`'s parameter at `index`, rest parameters included.
    fn declared_parameter_type_at_position(&self, function: Node<'tree>, index: usize) -> Option<Type>;

    /// Static type of a simple expression, if known.
    fn expression_type(&self, expr: Node<'tree>, scope: &TypeEnv) -> Option<Type>;

    /// Local names visible in `function`'s body with their static types.
    fn function_scope(&self, function: Node<'tree>) -> TypeEnv;

    /// Member names of a named type, if it is declared in the unit.
    fn named_type_members(&self, ty: &Type) -> Option<Vec<String>>;

    /// Argument counts of every call to `function` in the unit.
    fn call_site_arities(&self, function: Node<'tree>) -> Vec<usize>;

    /// Text covered by `node`.
    fn text(&self, node: Node<'tree>) -> Option<&'tree str> {
        text(node, self.source())
    }

    /// Builds a primitive type.
    fn build_primitive(&self, kind: PrimitiveKind) -> Type {
        Type::Primitive(kind)
    }

    /// Builds `element[]`.
    fn build_array_of(&self, element: Type) -> Type {
        Type::array_of(element)
    }

    /// Builds an anonymous shape from ordered fields.
    fn build_structural_shape(&self, fields: Vec<Field>) -> Type {
        Type::Shape(fields)
    }

    /// Builds a reference to a declared type.
    fn build_named(&self, name: &str) -> Type {
        Type::named(name)
    }

    /// Builds an intersection of ordered members.
    fn build_intersection(&self, members: Vec<Type>) -> Type {
        Type::intersection_of(members)
    }

    /// Renders a type the way it would be written in an annotation.
    fn type_to_display_string(&self, ty: &Type) -> String {
        ty.to_string()
    }
}

/// Type system over a single parsed unit.
pub struct Program<'a> {
    unit: &'a SourceUnit,
    /// Function declarations by name, first in document order. Calls are
    /// resolved through scopes; this only rules out undeclared names.
    functions: HashMap<&'a str, Node<'a>>,
    /// Interfaces, type aliases and classes by name.
    named_types: HashMap<&'a str, Node<'a>>,
    /// Argument counts of resolved calls, keyed by the callee declaration's node id.
    call_arities: HashMap<usize, Vec<usize>>,
}

/// What a block binds a name to.
enum Binding<'a> {
    Function(Node<'a>),
    Other,
}

impl<'a> Program<'a> {
    /// Indexes the declarations and call sites of `unit`.
    pub fn new(unit: &'a SourceUnit) -> Self {
        let mut program = Self {
            unit,
            functions: HashMap::new(),
            named_types: HashMap::new(),
            call_arities: HashMap::new(),
        };
        program.index();
        program
    }

    fn index(&mut self) {
        let source = self.unit.source();
        let mut calls: Vec<(Node<'a>, usize)> = Vec::new();
        let mut stack = vec![self.unit.root()];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    if let Some(name) = node.child_by_field_name("name").and_then(|n| text(n, source)) {
                        self.functions.entry(name).or_insert(node);
                    }
                },
                "interface_declaration" | "type_alias_declaration" | "class_declaration" => {
                    if let Some(name) = node.child_by_field_name("name").and_then(|n| text(n, source)) {
                        self.named_types.entry(name).or_insert(node);
                    }
                },
                "call_expression" => {
                    let callee = node.child_by_field_name("function");
                    if let (Some(callee), Some(args)) = (callee, call_arguments(node)) {
                        let spread = args.iter().any(|a| a.kind() == "spread_element");
                        if callee.kind() == "identifier" && !spread {
                            calls.push((callee, args.len()));
                        }
                    }
                },
                _ => {},
            }

            let mut cursor = node.walk();
            let children: Vec<Node<'a>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        for (callee, count) in calls {
            if let Some(function) = self.resolve_function(callee) {
                self.call_arities.entry(function.id()).or_default().push(count);
            }
        }
        trace!(
            "indexed {}: {} functions, {} named types",
            self.unit.file_name(),
            self.functions.len(),
            self.named_types.len()
        );
    }

    fn node_text(&self, node: Node<'a>) -> &'a str {
        text(node, self.unit.source()).unwrap_or_default()
    }

    /// Finds the function declaration `name` refers to at `site`, walking the
    /// enclosing scopes outwards. The closest binding wins, and a parameter or
    /// variable of that name hides any function further out.
    fn lookup_function(&self, site: Node<'a>, name: &str) -> Option<Node<'a>> {
        let source = self.unit.source();
        let mut scope = site.parent();
        while let Some(node) = scope {
            if is_function_like(node) && bound_names(node, source).contains(&name) {
                return None;
            }
            if matches!(node.kind(), "program" | "statement_block") {
                match self.block_binding(node, name) {
                    Some(Binding::Function(function)) => return Some(function),
                    Some(Binding::Other) => return None,
                    None => {},
                }
            }
            scope = node.parent();
        }
        None
    }

    fn block_binding(&self, block: Node<'a>, name: &str) -> Option<Binding<'a>> {
        let mut cursor = block.walk();
        let statements: Vec<Node<'a>> = block.named_children(&mut cursor).collect();
        for statement in statements {
            let declaration = match statement.kind() {
                "export_statement" => match statement.child_by_field_name("declaration") {
                    Some(declaration) => declaration,
                    None => continue,
                },
                _ => statement,
            };
            let declared_name = |node: Node<'a>| node.child_by_field_name("name").map(|n| self.node_text(n));
            match declaration.kind() {
                "function_declaration" | "generator_function_declaration" if declared_name(declaration) == Some(name) => {
                    return Some(Binding::Function(declaration));
                },
                "class_declaration" if declared_name(declaration) == Some(name) => return Some(Binding::Other),
                "lexical_declaration" | "variable_declaration" => {
                    let mut inner = declaration.walk();
                    let shadows = declaration
                        .named_children(&mut inner)
                        .filter(|d| d.kind() == "variable_declarator")
                        .any(|d| declared_name(d) == Some(name));
                    if shadows {
                        return Some(Binding::Other);
                    }
                },
                _ => {},
            }
        }
        None
    }

    /// Resolves a `type_annotation` node, or a bare type node.
    fn resolve_annotation(&self, node: Node<'a>, depth: usize) -> Type {
        if node.kind() == "type_annotation" {
            match node.named_child(0) {
                Some(inner) => self.resolve_type_node(inner, depth + 1),
                None => Type::Dynamic,
            }
        } else {
            self.resolve_type_node(node, depth)
        }
    }

    /// Converts a type node into a [`Type`]. Forms the engine does not model
    /// are kept verbatim as named references.
    fn resolve_type_node(&self, node: Node<'a>, depth: usize) -> Type {
        if depth > MAX_NESTING_DEPTH {
            trace!("type nested too deeply at line {}", node.start_position().row + 1);
            return self.build_named(self.node_text(node));
        }
        match node.kind() {
            "predefined_type" => match self.node_text(node) {
                "any" | "unknown" => Type::Dynamic,
                keyword => PrimitiveKind::from_keyword(keyword)
                    .map(|kind| self.build_primitive(kind))
                    .unwrap_or_else(|| self.build_named(keyword)),
            },
            "type_identifier" => self.build_named(self.node_text(node)),
            "array_type" => match node.named_child(0) {
                Some(element) => self.build_array_of(self.resolve_type_node(element, depth + 1)),
                None => self.build_array_of(Type::Dynamic),
            },
            "generic_type" => self.resolve_generic(node, depth),
            "object_type" | "interface_body" => self.build_structural_shape(self.shape_members(node, depth)),
            "intersection_type" => {
                let mut cursor = node.walk();
                let members: Vec<Type> = node
                    .named_children(&mut cursor)
                    .map(|m| self.resolve_type_node(m, depth + 1))
                    .collect();
                self.build_intersection(members)
            },
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.resolve_type_node(inner, depth + 1),
                None => Type::Dynamic,
            },
            "function_type" => self.signature_of(node, depth),
            _ => self.build_named(self.node_text(node)),
        }
    }

    fn resolve_generic(&self, node: Node<'a>, depth: usize) -> Type {
        let name = node.child_by_field_name("name").map(|n| self.node_text(n));
        let arguments: Vec<Node<'a>> = match node.child_by_field_name("type_arguments") {
            Some(args) => {
                let mut cursor = args.walk();
                let list = args.named_children(&mut cursor).collect();
                list
            },
            None => Vec::new(),
        };
        match (name, arguments.as_slice()) {
            (Some("Array" | "ReadonlyArray"), [element]) => {
                self.build_array_of(self.resolve_type_node(*element, depth + 1))
            },
            _ => self.build_named(self.node_text(node)),
        }
    }

    /// Fields of an object type body, in declaration order.
    fn shape_members(&self, body: Node<'a>, depth: usize) -> Vec<Field> {
        let mut fields = Vec::new();
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            let Some(name) = self.member_name(member) else {
                continue;
            };
            let ty = match member.kind() {
                "property_signature" => member
                    .child_by_field_name("type")
                    .map(|ann| self.resolve_annotation(ann, depth + 1))
                    .unwrap_or_default(),
                "method_signature" => self.signature_of(member, depth + 1),
                _ => continue,
            };
            fields.push(Field::new(name, ty));
        }
        fields
    }

    fn member_name(&self, member: Node<'a>) -> Option<String> {
        let name = member.child_by_field_name("name")?;
        let raw = self.node_text(name);
        match name.kind() {
            "string" => unquote(raw).map(str::to_string),
            "property_identifier" | "number" | "private_property_identifier" => Some(raw.to_string()),
            _ => None,
        }
    }

    /// Callable signature of a function type or method signature.
    fn signature_of(&self, node: Node<'a>, depth: usize) -> Type {
        let params = parameters_of(node)
            .into_iter()
            .map(|p| {
                p.child_by_field_name("type")
                    .map(|ann| self.resolve_annotation(ann, depth + 1))
                    .unwrap_or_default()
            })
            .collect();
        let returns = node
            .child_by_field_name("return_type")
            .map(|r| self.resolve_annotation(r, depth + 1))
            .unwrap_or_default();
        Type::Function { params, returns: Box::new(returns) }
    }

    fn collect_members(&self, ty: &Type, depth: usize, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        if depth > MAX_NAMED_DEPTH {
            return;
        }
        match ty {
            Type::Named(name) => {
                if !seen.insert(name.clone()) {
                    return;
                }
                if let Some(decl) = self.named_types.get(name.as_str()) {
                    self.collect_declared_members(*decl, depth, seen, out);
                }
            },
            Type::Shape(fields) => {
                for field in fields {
                    if !out.contains(&field.name) {
                        out.push(field.name.clone());
                    }
                }
            },
            Type::Intersection(members) => {
                for member in members {
                    self.collect_members(member, depth + 1, seen, out);
                }
            },
            _ => {},
        }
    }

    fn collect_declared_members(
        &self,
        decl: Node<'a>,
        depth: usize,
        seen: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) {
        match decl.kind() {
            "interface_declaration" => {
                let mut cursor = decl.walk();
                for child in decl.named_children(&mut cursor) {
                    if child.kind() == "extends_type_clause" {
                        let mut inner = child.walk();
                        for base in child.named_children(&mut inner) {
                            let base_ty = self.resolve_type_node(base, 0);
                            self.collect_members(&base_ty, depth + 1, seen, out);
                        }
                    }
                }
                if let Some(body) = decl.child_by_field_name("body") {
                    let shape = Type::Shape(self.shape_members(body, 0));
                    self.collect_members(&shape, depth + 1, seen, out);
                }
            },
            "type_alias_declaration" => {
                if let Some(value) = decl.child_by_field_name("value") {
                    let aliased = self.resolve_type_node(value, 0);
                    self.collect_members(&aliased, depth + 1, seen, out);
                }
            },
            "class_declaration" => {
                let Some(body) = decl.child_by_field_name("body") else {
                    return;
                };
                let mut cursor = body.walk();
                for member in body.named_children(&mut cursor) {
                    if !matches!(member.kind(), "public_field_definition" | "method_definition") {
                        continue;
                    }
                    if let Some(name) = self.member_name(member) {
                        if !out.contains(&name) {
                            out.push(name);
                        }
                    }
                }
            },
            _ => {},
        }
    }

    fn binary_type(&self, expr: Node<'a>, scope: &TypeEnv, depth: usize) -> Option<Type> {
        let op = operator(expr, self.unit.source())?;
        match op {
            "+" => {
                let operand = |field: &str| {
                    expr.child_by_field_name(field)
                        .and_then(|e| self.expression_type_at(e, scope, depth + 1))
                };
                match (operand("left"), operand("right")) {
                    (Some(Type::Primitive(PrimitiveKind::String)), _)
                    | (_, Some(Type::Primitive(PrimitiveKind::String))) => Some(Type::STRING),
                    (Some(Type::Primitive(PrimitiveKind::Number)), Some(Type::Primitive(PrimitiveKind::Number))) => {
                        Some(Type::NUMBER)
                    },
                    _ => None,
                }
            },
            "-" | "*" | "/" | "%" | "**" | "&" | "|" | "^" | "<<" | ">>" | ">>>" => Some(Type::NUMBER),
            "<" | "<=" | ">" | ">=" | "==" | "===" | "!=" | "!==" | "instanceof" | "in" => {
                Some(Type::BOOLEAN)
            },
            _ => None,
        }
    }

    fn expression_type_at(&self, expr: Node<'a>, scope: &TypeEnv, depth: usize) -> Option<Type> {
        if depth > MAX_NESTING_DEPTH {
            trace!("expression nested too deeply at line {}", expr.start_position().row + 1);
            return None;
        }
        match expr.kind() {
            "number" => Some(Type::NUMBER),
            "string" | "template_string" => Some(Type::STRING),
            "true" | "false" => Some(Type::BOOLEAN),
            "parenthesized_expression" => {
                expr.named_child(0).and_then(|e| self.expression_type_at(e, scope, depth + 1))
            },
            "identifier" => scope.lookup(self.node_text(expr)).cloned(),
            "unary_expression" => match operator(expr, self.unit.source())? {
                "-" | "+" | "~" => Some(Type::NUMBER),
                "!" => Some(Type::BOOLEAN),
                "typeof" => Some(Type::STRING),
                _ => None,
            },
            "binary_expression" => self.binary_type(expr, scope, depth),
            "array" => {
                let mut cursor = expr.walk();
                let elements: Vec<Option<Type>> = expr
                    .named_children(&mut cursor)
                    .map(|e| self.expression_type_at(e, scope, depth + 1))
                    .collect();
                let first = elements.first()?.clone()?;
                elements
                    .iter()
                    .all(|e| e.as_ref() == Some(&first))
                    .then(|| self.build_array_of(first))
            },
            "as_expression" => expr.named_child(1).map(|t| self.resolve_type_node(t, depth + 1)),
            "new_expression" => expr
                .child_by_field_name("constructor")
                .filter(|c| c.kind() == "identifier")
                .map(|c| self.build_named(self.node_text(c))),
            "call_expression" => {
                let callee = expr.child_by_field_name("function")?;
                let function = self.resolve_function(callee)?;
                function.child_by_field_name("return_type").map(|r| self.resolve_annotation(r, 0))
            },
            _ => None,
        }
    }

    fn bind_declarations(&self, node: Node<'a>, env: &mut TypeEnv) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.kind() == "variable_declarator" {
                let name = current.child_by_field_name("name").filter(|n| n.kind() == "identifier");
                if let Some(name) = name {
                    let declared = current.child_by_field_name("type").map(|t| self.resolve_annotation(t, 0));
                    let ty = declared.or_else(|| {
                        current.child_by_field_name("value").and_then(|v| self.expression_type(v, env))
                    });
                    env.bind(self.node_text(name).to_string(), ty.unwrap_or_default());
                }
            }
            let mut cursor = current.walk();
            let children: Vec<Node<'a>> = current
                .named_children(&mut cursor)
                .filter(|c| !is_function_like(*c))
                .collect();
            stack.extend(children.into_iter().rev());
        }
    }
}

impl<'a> TypeSystem<'a> for Program<'a> {
    fn source(&self) -> &'a str {
        self.unit.source()
    }

    fn resolved_type_of_parameter(&self, param: Node<'a>) -> Option<Type> {
        if let Some(annotation) = param.child_by_field_name("type") {
            let declared = self.resolve_annotation(annotation, 0);
            return Some(declared);
        }
        let pattern = param.child_by_field_name("pattern")?;
        match pattern.kind() {
            "identifier" => match param.child_by_field_name("value") {
                Some(default) => Some(self.expression_type(default, &TypeEnv::new()).unwrap_or_default()),
                None => Some(Type::Dynamic),
            },
            "rest_pattern" => Some(self.build_array_of(Type::Dynamic)),
            _ => None,
        }
    }

    fn resolve_function(&self, callee: Node<'a>) -> Option<Node<'a>> {
        match callee.kind() {
            "identifier" => {
                let name = self.node_text(callee);
                if !self.functions.contains_key(name) {
                    return None;
                }
                self.lookup_function(callee, name)
            },
            "parenthesized_expression" => callee.named_child(0).and_then(|inner| self.resolve_function(inner)),
            _ => None,
        }
    }

    fn declared_parameter_type_at_position(&self, function: Node<'a>, index: usize) -> Option<Type> {
        let params = parameters_of(function);
        let (param, rest) = match params.get(index) {
            Some(param) => (*param, syntax::is_rest_parameter(*param)),
            None => {
                let last = *params.last()?;
                if !syntax::is_rest_parameter(last) {
                    return None;
                }
                (last, true)
            },
        };
        let declared = self.resolved_type_of_parameter(param)?;
        if rest {
            return match declared {
                Type::ArrayOf(element) => Some(*element),
                _ => Some(Type::Dynamic),
            };
        }
        Some(declared)
    }

    fn expression_type(&self, expr: Node<'a>, scope: &TypeEnv) -> Option<Type> {
        self.expression_type_at(expr, scope, 0)
    }

    fn function_scope(&self, function: Node<'a>) -> TypeEnv {
        let mut env = TypeEnv::new();
        for param in parameters_of(function) {
            if let Some(name) = syntax::parameter_name(param, self.unit.source()) {
                let ty = self.resolved_type_of_parameter(param).unwrap_or_default();
                env.bind(name.to_string(), ty);
            }
        }
        if let Some(body) = function.child_by_field_name("body") {
            self.bind_declarations(body, &mut env);
        }
        env
    }

    fn named_type_members(&self, ty: &Type) -> Option<Vec<String>> {
        let known = match ty {
            Type::Named(name) => self.named_types.contains_key(name.as_str()),
            _ => true,
        };
        if !known {
            return None;
        }
        let mut out = Vec::new();
        self.collect_members(ty, 0, &mut HashSet::new(), &mut out);
        Some(out)
    }

    fn call_site_arities(&self, function: Node<'a>) -> Vec<usize> {
        self.call_arities.get(&function.id()).cloned().unwrap_or_default()
    }
}
