//! Parser module for turning TypeScript source text into a syntax tree.

use std::path::Path;
use tree_sitter::{Node, Parser as TSParser, Tree};
use crate::error::{Error, Result};

/// Default synthetic file name used when the caller provides none.
pub const DEFAULT_FILE_NAME: &str = "input.ts";

/// One parsed compilation unit: the source text and its syntax tree.
#[derive(Debug)]
pub struct SourceUnit {
    file_name: String,
    source: String,
    tree: Tree,
}

impl SourceUnit {
    /// File name used for diagnostics.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The unit's source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The root of the syntax tree.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// The main parser struct that handles parsing source code.
pub struct Parser {
    /// The tree-sitter parser instance.
    parser: TSParser,
}

impl Parser {
    /// Creates a new parser for TypeScript.
    pub fn new() -> Result<Self> {
        let mut parser = TSParser::new();

        let language = tree_sitter_typescript::language_typescript();

        parser
            .set_language(language)
            .map_err(|e| Error::Language(format!("Failed to load language: {}", e)))?;

        Ok(Self { parser })
    }

    /// Parses a source file into a unit named after the file's path.
    pub fn parse_file(&mut self, path: &Path) -> Result<SourceUnit> {
        let source_code = std::fs::read_to_string(path)?;
        self.parse_string(source_code, &path.to_string_lossy())
    }

    /// Parses a source code string into a unit.
    ///
    /// Any syntax error in the tree is fatal: no partial unit is returned.
    pub fn parse_string(&mut self, source: impl Into<String>, file_name: &str) -> Result<SourceUnit> {
        let source = source.into();
        let tree = self.parser.parse(&source, None).ok_or_else(|| {
            Error::parse_error(file_name, 1, 1, "parser produced no tree")
        })?;

        if let Some(bad) = first_error(tree.root_node()) {
            let pos = bad.start_position();
            let message = if bad.is_missing() {
                format!("missing `{}`", bad.kind())
            } else {
                "unexpected syntax".to_string()
            };
            return Err(Error::parse_error(file_name, pos.row + 1, pos.column + 1, message));
        }

        Ok(SourceUnit { file_name: file_name.to_string(), source, tree })
    }
}

/// Finds the first ERROR or MISSING node in document order.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    if !root.has_error() {
        return None;
    }
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    // has_error was set but no node was flagged; report the root.
    Some(root)
}
