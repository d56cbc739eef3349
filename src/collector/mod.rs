//! Collects usage evidence for one parameter from its function body.
//!
//! The walk is a single pre-order pass in source order. It is not
//! flow-sensitive: evidence inside untaken branches counts like any other.
//! Expression shapes the collector does not understand contribute nothing.

use log::{debug, trace};
use tree_sitter::Node;

use crate::checker::syntax::{bound_names, call_arguments, is_function_like, operator, unquote};
use crate::checker::TypeSystem;
use crate::evidence::{AccessPath, UsageEvidence};
use crate::types::{PrimitiveKind, Type, TypeEnv};

/// How an operator constrains its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandRule {
    /// Numeric unless the other operand is a string (`+`, relational comparisons).
    NumericOrString,
    /// Always numeric.
    Numeric,
}

fn operand_rule(op: &str) -> Option<OperandRule> {
    // Compound assignments, `<=` and `>=` share the rule of their base operator.
    match op.trim_end_matches('=') {
        "+" | "<" | ">" => Some(OperandRule::NumericOrString),
        "-" | "*" | "/" | "%" | "**" | "&" | "|" | "^" | "<<" | ">>" | ">>>" => Some(OperandRule::Numeric),
        _ => None,
    }
}

/// Evidence collector for a single target parameter.
pub struct Collector<'t, 's> {
    types: &'s dyn TypeSystem<'t>,
    name: String,
    scope: TypeEnv,
    max_depth: usize,
    evidence: Vec<UsageEvidence>,
}

impl<'t, 's> Collector<'t, 's> {
    /// Creates a collector for the parameter `name` of `function`.
    pub fn new(types: &'s dyn TypeSystem<'t>, function: Node<'t>, name: &str, max_depth: usize) -> Self {
        Self {
            types,
            name: name.to_string(),
            scope: types.function_scope(function),
            max_depth,
            evidence: Vec::new(),
        }
    }

    /// Walks `body` and returns the evidence in discovery order.
    pub fn collect(mut self, body: Node<'t>) -> Vec<UsageEvidence> {
        self.visit(body, 0);
        debug!("collected {} evidence items for `{}`", self.evidence.len(), self.name);
        self.evidence
    }

    fn push(&mut self, evidence: UsageEvidence) {
        trace!("{}: {}", self.name, evidence);
        self.evidence.push(evidence);
    }

    fn text(&self, node: Node<'t>) -> &'t str {
        self.types.text(node).unwrap_or_default()
    }

    fn visit(&mut self, node: Node<'t>, depth: usize) {
        if depth > self.max_depth {
            debug!("depth limit reached at `{}` while collecting `{}`", node.kind(), self.name);
            return;
        }

        if let Some(path) = self.access_path(node) {
            self.record_access(&path);
            return;
        }

        match node.kind() {
            "binary_expression" => self.visit_binary(node, depth),
            "augmented_assignment_expression" => self.visit_compound_assignment(node, depth),
            "unary_expression" | "update_expression" => self.visit_unary(node, depth),
            "assignment_expression" => self.visit_assignment(node, depth),
            "call_expression" => self.visit_call(node, depth),
            _ if is_function_like(node) => self.visit_nested_function(node, depth),
            _ => self.visit_children(node, depth),
        }
    }

    fn visit_children(&mut self, node: Node<'t>, depth: usize) {
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, depth + 1);
        }
    }

    fn visit_field(&mut self, node: Node<'t>, field: &str, depth: usize) -> Option<Node<'t>> {
        let child = node.child_by_field_name(field)?;
        self.visit(child, depth + 1);
        Some(child)
    }

    /// Resolves an access chain rooted at the target parameter.
    ///
    /// Chains longer than `max_depth` segments are not followed.
    fn access_path(&self, node: Node<'t>) -> Option<AccessPath> {
        let mut segments: Vec<&'t str> = Vec::new();
        let mut current = node;
        loop {
            match current.kind() {
                "identifier" => break,
                "member_expression" => {
                    let property = current.child_by_field_name("property")?;
                    if property.kind() != "property_identifier" {
                        return None;
                    }
                    segments.push(self.text(property));
                    current = current.child_by_field_name("object")?;
                },
                "subscript_expression" => {
                    let index = current.child_by_field_name("index")?;
                    if index.kind() != "string" {
                        return None;
                    }
                    segments.push(unquote(self.text(index))?);
                    current = current.child_by_field_name("object")?;
                },
                "parenthesized_expression" | "non_null_expression" => current = current.named_child(0)?,
                _ => return None,
            }
            if segments.len() > self.max_depth {
                trace!("{}: access chain longer than {} segments", self.name, self.max_depth);
                return None;
            }
        }
        (self.text(current) == self.name).then(|| segments.into_iter().rev().collect())
    }

    fn record_access(&mut self, path: &AccessPath) {
        for prefix in path.prefixes() {
            self.push(UsageEvidence::PropertyAccess(prefix));
        }
    }

    fn record_operand(&mut self, operand: Node<'t>, other: Option<Node<'t>>, rule: OperandRule) {
        let Some(path) = self.access_path(operand) else {
            return;
        };
        let other_is_string = rule == OperandRule::NumericOrString
            && other
                .and_then(|o| self.types.expression_type(o, &self.scope))
                .map_or(false, |t| t == Type::Primitive(PrimitiveKind::String));
        if other_is_string {
            self.push(UsageEvidence::StringOperator(path));
        } else {
            self.push(UsageEvidence::NumericOperator(path));
        }
    }

    fn visit_binary(&mut self, node: Node<'t>, depth: usize) {
        let left = self.visit_field(node, "left", depth);
        let right = self.visit_field(node, "right", depth);
        let Some(rule) = operator(node, self.types.source()).and_then(operand_rule) else {
            return;
        };
        if let Some(left) = left {
            self.record_operand(left, right, rule);
        }
        if let Some(right) = right {
            self.record_operand(right, left, rule);
        }
    }

    fn visit_compound_assignment(&mut self, node: Node<'t>, depth: usize) {
        let left = self.visit_field(node, "left", depth);
        let right = self.visit_field(node, "right", depth);
        let rule = operator(node, self.types.source())
            .filter(|op| !matches!(*op, "&&=" | "||=" | "??="))
            .and_then(operand_rule);
        if let (Some(left), Some(rule)) = (left, rule) {
            self.record_operand(left, right, rule);
        }
    }

    fn visit_unary(&mut self, node: Node<'t>, depth: usize) {
        let argument = self.visit_field(node, "argument", depth);
        let numeric = match node.kind() {
            "update_expression" => true,
            _ => matches!(operator(node, self.types.source()), Some("-" | "+" | "~")),
        };
        if let (Some(argument), true) = (argument, numeric) {
            self.record_operand(argument, None, OperandRule::Numeric);
        }
    }

    fn visit_assignment(&mut self, node: Node<'t>, depth: usize) {
        let left = self.visit_field(node, "left", depth);
        let right = self.visit_field(node, "right", depth);
        let (Some(left), Some(right)) = (left, right) else {
            return;
        };
        let Some(path) = self.access_path(left) else {
            return;
        };
        match self.types.expression_type(right, &self.scope) {
            Some(assigned) if !self.types.is_open_type(&assigned) => {
                self.push(UsageEvidence::Assignment { path, assigned });
            },
            _ => {},
        }
    }

    fn argument_types(&self, arguments: &[Node<'t>]) -> Vec<Type> {
        arguments
            .iter()
            .map(|a| self.types.expression_type(*a, &self.scope).unwrap_or_default())
            .collect()
    }

    fn visit_call(&mut self, node: Node<'t>, depth: usize) {
        let (Some(callee), Some(arguments)) = (node.child_by_field_name("function"), call_arguments(node))
        else {
            self.visit_children(node, depth);
            return;
        };

        if let Some((receiver, method)) = self.method_receiver(callee) {
            self.record_access(&receiver);
            self.visit_all(&arguments, depth);
            let arguments = self.argument_types(&arguments);
            self.push(UsageEvidence::MethodCall { path: receiver, method, arguments });
            return;
        }

        if let Some(path) = self.access_path(callee) {
            self.record_access(&path);
            self.visit_all(&arguments, depth);
            let arguments = self.argument_types(&arguments);
            self.push(UsageEvidence::Invocation { path, arguments });
            return;
        }

        self.visit(callee, depth + 1);
        self.visit_all(&arguments, depth);

        let Some(function) = self.types.resolve_function(callee) else {
            return;
        };
        for (index, argument) in arguments.iter().enumerate() {
            // Positions after a spread are unknown.
            if argument.kind() == "spread_element" {
                break;
            }
            let Some(path) = self.access_path(*argument) else {
                continue;
            };
            match self.types.declared_parameter_type_at_position(function, index) {
                Some(declared) if !self.types.is_open_type(&declared) => {
                    self.record_call_argument(path, declared);
                },
                _ => trace!("{}: argument {} of `{}` is open", self.name, index, self.text(callee)),
            }
        }
    }

    fn visit_all(&mut self, nodes: &[Node<'t>], depth: usize) {
        for node in nodes {
            self.visit(*node, depth + 1);
        }
    }

    /// `p.a.method` as (path of `p.a`, `method`).
    fn method_receiver(&self, callee: Node<'t>) -> Option<(AccessPath, String)> {
        if callee.kind() != "member_expression" {
            return None;
        }
        let property = callee.child_by_field_name("property")?;
        if property.kind() != "property_identifier" {
            return None;
        }
        let receiver = self.access_path(callee.child_by_field_name("object")?)?;
        Some((receiver, self.text(property).to_string()))
    }

    /// Records a callee's declared type, decomposing inline shapes into
    /// per-field evidence and keeping everything else whole.
    fn record_call_argument(&mut self, path: AccessPath, declared: Type) {
        match declared {
            Type::Shape(fields) if !fields.is_empty() => {
                for field in fields {
                    let child = path.child(field.name);
                    self.record_call_argument(child, field.ty);
                }
            },
            Type::Intersection(members) => {
                for member in members {
                    self.record_call_argument(path.clone(), member);
                }
            },
            declared => self.push(UsageEvidence::CallArgument { path, declared }),
        }
    }

    fn visit_nested_function(&mut self, node: Node<'t>, depth: usize) {
        let source = self.types.source();
        let own_name = match node.kind() {
            "method_definition" => None,
            _ => node.child_by_field_name("name").and_then(|n| self.types.text(n)),
        };
        let shadows = own_name == Some(self.name.as_str())
            || bound_names(node, source).iter().any(|n| *n == self.name);
        if shadows {
            trace!("{}: skipping nested function that redeclares it", self.name);
            return;
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::syntax::{parameter_name, parameters_of};
    use crate::checker::Program;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn path(segments: &[&str]) -> AccessPath {
        segments.iter().copied().collect()
    }

    /// Collects evidence for the first parameter of the last top-level function.
    fn collect(source: &str) -> Vec<UsageEvidence> {
        collect_with_depth(source, 64)
    }

    fn collect_with_depth(source: &str, max_depth: usize) -> Vec<UsageEvidence> {
        let unit = Parser::new().unwrap().parse_string(source, "dummy.ts").unwrap();
        let program = Program::new(&unit);
        let root = unit.root();
        let mut cursor = root.walk();
        let function = root
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "function_declaration")
            .last()
            .unwrap();
        let param = parameters_of(function)[0];
        let name = parameter_name(param, unit.source()).unwrap();
        let body = function.child_by_field_name("body").unwrap();
        Collector::new(&program, function, name, max_depth).collect(body)
    }

    #[test]
    fn test_prefix_accesses() {
        let evidence = collect("function f(p) { return p.q.a.c }");
        assert_eq!(
            evidence,
            vec![
                UsageEvidence::PropertyAccess(path(&[])),
                UsageEvidence::PropertyAccess(path(&["q"])),
                UsageEvidence::PropertyAccess(path(&["q", "a"])),
                UsageEvidence::PropertyAccess(path(&["q", "a", "c"])),
            ]
        );
    }

    #[test]
    fn test_string_concatenation_is_disambiguated() {
        let evidence = collect("function f(p) { return p + \"!\" }");
        assert!(evidence.contains(&UsageEvidence::StringOperator(path(&[]))));
        assert!(!evidence.contains(&UsageEvidence::NumericOperator(path(&[]))));

        let evidence = collect("function f(p, s: string) { return s + p.n }");
        assert!(evidence.contains(&UsageEvidence::StringOperator(path(&["n"]))));

        let evidence = collect("function f(p) { return p - \"1\" }");
        assert!(evidence.contains(&UsageEvidence::NumericOperator(path(&[]))));
    }

    #[test]
    fn test_unary_and_compound_operators() {
        let evidence = collect("function f(p) { p.count++; p.total += 2; return -p.delta }");
        for field in ["count", "total", "delta"] {
            assert!(evidence.contains(&UsageEvidence::NumericOperator(path(&[field]))), "{}", field);
        }
    }

    #[test]
    fn test_method_call_evidence() {
        let evidence = collect("function f(p) { p.items.push(10, \"a\") }");
        assert_eq!(
            evidence.last(),
            Some(&UsageEvidence::MethodCall {
                path: path(&["items"]),
                method: "push".to_string(),
                arguments: vec![Type::NUMBER, Type::STRING],
            })
        );
        assert!(!evidence.contains(&UsageEvidence::PropertyAccess(path(&["items", "push"]))));
    }

    #[test]
    fn test_call_argument_decomposes_shapes() {
        let evidence = collect(
            "interface K { k }\n\
             function g(a: { k: number, m: { z } }, b: K) {}\n\
             function f(p) { g(p, p.inner) }",
        );
        let calls: Vec<&UsageEvidence> =
            evidence.iter().filter(|e| matches!(e, UsageEvidence::CallArgument { .. })).collect();
        assert_eq!(
            calls,
            vec![
                &UsageEvidence::CallArgument { path: path(&["k"]), declared: Type::NUMBER },
                &UsageEvidence::CallArgument { path: path(&["m", "z"]), declared: Type::Dynamic },
                &UsageEvidence::CallArgument { path: path(&["inner"]), declared: Type::named("K") },
            ]
        );
    }

    #[test]
    fn test_open_callee_parameter_is_ignored() {
        let evidence = collect("function g(a, b: any) {}\nfunction f(p) { g(p, p) }");
        assert!(evidence.iter().all(|e| !matches!(e, UsageEvidence::CallArgument { .. })));
    }

    #[test]
    fn test_shadowing_nested_functions_are_skipped() {
        let evidence = collect(
            "function f(p) {\n\
               const a = (p) => p.hidden;\n\
               function p2() { return p.seen }\n\
               function inner(x, p) { return p.alsoHidden }\n\
             }",
        );
        assert!(evidence.contains(&UsageEvidence::PropertyAccess(path(&["seen"]))));
        assert!(!evidence.contains(&UsageEvidence::PropertyAccess(path(&["hidden"]))));
        assert!(!evidence.contains(&UsageEvidence::PropertyAccess(path(&["alsoHidden"]))));
    }

    #[test]
    fn test_control_flow_insensitive() {
        let evidence = collect("function f(p) { if (false) { return p.a * 2 } return p['b'] }");
        assert!(evidence.contains(&UsageEvidence::NumericOperator(path(&["a"]))));
        assert!(evidence.contains(&UsageEvidence::PropertyAccess(path(&["b"]))));
    }

    #[test]
    fn test_invocation_and_assignment() {
        let evidence = collect("function f(p) { p.cb(1); p.name = \"n\"; p.flag = true }");
        assert!(evidence.contains(&UsageEvidence::MethodCall {
            path: path(&[]),
            method: "cb".to_string(),
            arguments: vec![Type::NUMBER],
        }));
        assert!(evidence.contains(&UsageEvidence::Assignment { path: path(&["name"]), assigned: Type::STRING }));
        assert!(evidence.contains(&UsageEvidence::Assignment { path: path(&["flag"]), assigned: Type::BOOLEAN }));

        let evidence = collect("function f(p) { return p(\"x\") }");
        assert_eq!(
            evidence.last(),
            Some(&UsageEvidence::Invocation { path: path(&[]), arguments: vec![Type::STRING] })
        );
    }

    #[test]
    fn test_computed_index_stops_chain() {
        let evidence = collect("function f(p, i: number) { return p[i].x }");
        assert_eq!(evidence, vec![UsageEvidence::PropertyAccess(path(&[]))]);
    }

    #[test]
    fn test_depth_limit() {
        let source = "function f(p) { return p.a.b.c }";
        assert!(collect_with_depth(source, 2).is_empty());
        assert_eq!(collect_with_depth(source, 4).len(), 4);

        let chain = format!("function f(p) {{ return p{} }}", ".a".repeat(50_000));
        assert!(collect_with_depth(&chain, 256).is_empty());
    }
}
