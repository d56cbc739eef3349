//! Node-kind helpers over the tree-sitter TypeScript grammar.

use tree_sitter::Node;

/// Node kinds that introduce a new function scope.
pub const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function",
    "function_expression",
    "generator_function",
    "arrow_function",
    "method_definition",
];

/// Node kinds the declaration scanner reports.
pub const DECLARATION_KINDS: &[&str] = &["function_declaration", "generator_function_declaration"];

/// Returns true when `node` starts a nested function scope.
pub fn is_function_like(node: Node<'_>) -> bool {
    FUNCTION_KINDS.contains(&node.kind())
}

/// Returns the text covered by `node`, or `None` when it is not valid UTF-8.
pub fn text<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    node.utf8_text(source.as_bytes()).ok()
}

/// Strips one layer of matching quotes from a string literal.
pub fn unquote(literal: &str) -> Option<&str> {
    let first = literal.chars().next()?;
    if !matches!(first, '"' | '\'' | '`') || literal.len() < 2 || !literal.ends_with(first) {
        return None;
    }
    Some(&literal[1..literal.len() - 1])
}

/// Positional parameters of a function-like node, without the `this` pseudo-parameter.
pub fn parameters_of(function: Node<'_>) -> Vec<Node<'_>> {
    let Some(list) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = list.walk();
    let params = list
        .named_children(&mut cursor)
        .filter(|p| matches!(p.kind(), "required_parameter" | "optional_parameter"))
        .filter(|p| p.child_by_field_name("pattern").map_or(true, |pat| pat.kind() != "this"))
        .collect();
    params
}

/// Name bound by a plain identifier parameter.
pub fn parameter_name<'a>(param: Node<'_>, source: &'a str) -> Option<&'a str> {
    let pattern = param.child_by_field_name("pattern")?;
    match pattern.kind() {
        "identifier" => text(pattern, source),
        "rest_pattern" => pattern.named_child(0).and_then(|inner| text(inner, source)),
        _ => None,
    }
}

/// Returns true for `...rest` parameters.
pub fn is_rest_parameter(param: Node<'_>) -> bool {
    param.child_by_field_name("pattern").map_or(false, |p| p.kind() == "rest_pattern")
}

/// Every name a function-like node binds in its own scope: its parameters and,
/// for arrows written `x => ...`, the bare parameter.
pub fn bound_names<'a>(function: Node<'_>, source: &'a str) -> Vec<&'a str> {
    let mut names: Vec<&'a str> = parameters_of(function)
        .into_iter()
        .filter_map(|p| parameter_name(p, source))
        .collect();
    if let Some(single) = function.child_by_field_name("parameter") {
        names.extend(text(single, source));
    }
    names
}

/// Arguments of a call, or `None` for tagged templates.
pub fn call_arguments(call: Node<'_>) -> Option<Vec<Node<'_>>> {
    let args = call.child_by_field_name("arguments")?;
    if args.kind() != "arguments" {
        return None;
    }
    let mut cursor = args.walk();
    let list = args.named_children(&mut cursor).filter(|n| n.kind() != "comment").collect();
    Some(list)
}

/// Text of the operator token of a binary, unary, update or compound assignment node.
pub fn operator<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name("operator").and_then(|op| text(op, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), Some("abc"));
        assert_eq!(unquote("'k'"), Some("k"));
        assert_eq!(unquote("`t`"), Some("t"));
        assert_eq!(unquote("\"abc'"), None);
        assert_eq!(unquote("abc"), None);
        assert_eq!(unquote("\""), None);
    }
}
