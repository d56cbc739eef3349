//! Finds the function declarations that have something to infer.

use log::trace;
use tree_sitter::Node;

use crate::checker::syntax::{parameter_name, parameters_of, DECLARATION_KINDS};
use crate::checker::TypeSystem;

/// One parameter of a scanned function, alive for a single run.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSlot<'t> {
    /// The owning function declaration.
    pub function: Node<'t>,
    /// 0-based position, not counting a `this` parameter.
    pub index: usize,
    /// The parameter's declaration node.
    pub declaration: Node<'t>,
    /// The bound name, when the parameter is a plain identifier.
    pub name: Option<&'t str>,
    /// Whether the parameter's resolved type is open.
    pub open: bool,
}

/// A function declaration with at least one open parameter.
#[derive(Debug, Clone)]
pub struct ScannedFunction<'t> {
    /// The declaration node.
    pub node: Node<'t>,
    /// The declared name, if any.
    pub name: Option<&'t str>,
    /// Every positional parameter, open or not.
    pub parameters: Vec<ParameterSlot<'t>>,
}

impl<'t> ScannedFunction<'t> {
    /// The parameters that take part in inference, in declaration order.
    pub fn open_parameters(&self) -> impl Iterator<Item = &ParameterSlot<'t>> {
        self.parameters.iter().filter(|p| p.open)
    }
}

/// Pre-order walk over a whole tree.
pub struct Scanner<'s, 't> {
    types: &'s dyn TypeSystem<'t>,
}

impl<'s, 't> Scanner<'s, 't> {
    /// Creates a scanner using `types` to decide which parameters are open.
    pub fn new(types: &'s dyn TypeSystem<'t>) -> Self {
        Self { types }
    }

    /// Returns every qualifying declaration under `root`, in document order.
    ///
    /// Descends into every node, qualifying or not, so nested declarations
    /// are found too.
    pub fn scan(&self, root: Node<'t>) -> Vec<ScannedFunction<'t>> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if DECLARATION_KINDS.contains(&node.kind()) {
                if let Some(function) = self.qualify(node) {
                    found.push(function);
                }
            }

            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        found
    }

    fn qualify(&self, node: Node<'t>) -> Option<ScannedFunction<'t>> {
        let source = self.types.source();
        let parameters: Vec<ParameterSlot<'t>> = parameters_of(node)
            .into_iter()
            .enumerate()
            .map(|(index, declaration)| {
                // An adapter failure counts as not open.
                let open = self
                    .types
                    .resolved_type_of_parameter(declaration)
                    .map_or(false, |ty| self.types.is_open_type(&ty));
                ParameterSlot { function: node, index, declaration, name: parameter_name(declaration, source), open }
            })
            .collect();

        let name = node.child_by_field_name("name").and_then(|n| self.types.text(n));
        if !parameters.iter().any(|p| p.open) {
            trace!("skipping `{}`: no open parameters", name.unwrap_or("<anonymous>"));
            return None;
        }
        Some(ScannedFunction { node, name, parameters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::Program;
    use crate::parser::Parser;

    #[test]
    fn test_scan_order_and_nesting() {
        let unit = Parser::new()
            .unwrap()
            .parse_string(
                "function typed(a: number) {}\n\
                 function outer(a) {\n\
                   function inner(b: string, c) {}\n\
                 }\n\
                 class C { m(x) {} }\n\
                 function last(x: any, y: string) {}\n",
                "dummy.ts",
            )
            .unwrap();
        let program = Program::new(&unit);
        let found = Scanner::new(&program).scan(unit.root());
        let names: Vec<&str> = found.iter().filter_map(|f| f.name).collect();
        assert_eq!(names, vec!["outer", "inner", "last"]);

        let inner_open: Vec<usize> = found[1].open_parameters().map(|p| p.index).collect();
        assert_eq!(inner_open, vec![1]);
        assert_eq!(found[2].parameters[0].name, Some("x"));
    }

    #[test]
    fn test_destructured_parameter_is_not_open() {
        let unit = Parser::new()
            .unwrap()
            .parse_string("function f({ a, b }) {}\nfunction g(this: Window, w) {}", "dummy.ts")
            .unwrap();
        let program = Program::new(&unit);
        let found = Scanner::new(&program).scan(unit.root());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, Some("g"));
        assert_eq!(found[0].parameters.len(), 1);
        assert_eq!(found[0].parameters[0].index, 0);
    }
}
