//! Runs the scanner, collector and synthesizer over a whole source unit.

use std::fmt;
use std::ops::Deref;
use std::path::Path;

use log::{debug, info};
use serde::Serialize;
use tree_sitter::Node;

use crate::checker::{Program, TypeSystem};
use crate::collector::Collector;
use crate::config::InferenceOptions;
use crate::error::Result;
use crate::parser::{Parser, SourceUnit};
use crate::scanner::{ParameterSlot, ScannedFunction, Scanner};
use crate::strategy::{strategy_for, InferenceStrategy};
use crate::synthesizer::Synthesizer;
use crate::types::Type;

/// Where an inferred parameter is declared, detached from the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDeclaration {
    /// Bound name, or the declaration text when the parameter is not a plain identifier.
    pub name: String,
    /// 0-based position in the parameter list.
    pub index: usize,
    /// Byte offset where the declaration starts.
    pub start_byte: usize,
    /// Byte offset where the declaration ends.
    pub end_byte: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

/// The inferred type of one open parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterInference {
    /// The parameter this inference is for.
    pub declaration: ParameterDeclaration,
    /// The synthesized type.
    #[serde(skip)]
    pub ty: Type,
    /// `ty` as it would be written in an annotation.
    #[serde(rename = "type")]
    pub type_string: String,
    /// Whether the parameter may be omitted by callers.
    pub is_optional: bool,
}

impl fmt::Display for ParameterInference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{}",
            self.declaration.name,
            self.type_string,
            if self.is_optional { "?" } else { "" }
        )
    }
}

/// The inferences for one scanned function, in parameter declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionInference {
    /// The function's name, if it has one.
    pub name: Option<String>,
    /// 1-based line of the declaration.
    pub line: usize,
    /// One entry per open parameter.
    pub parameters: Vec<ParameterInference>,
}

impl Deref for FunctionInference {
    type Target = [ParameterInference];

    fn deref(&self) -> &Self::Target {
        &self.parameters
    }
}

impl fmt::Display for FunctionInference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.parameters.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
        write!(f, "{}", params)
    }
}

/// Inference results for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Path of the analyzed file.
    pub path: String,
    /// Per-function results in document order.
    pub functions: Vec<FunctionInference>,
}

/// Entry point holding the run configuration.
pub struct Inferrer {
    options: InferenceOptions,
    strategy: Box<dyn InferenceStrategy>,
}

impl Default for Inferrer {
    fn default() -> Self {
        Self::new(InferenceOptions::default())
    }
}

impl Inferrer {
    /// Creates an inferrer with the strategy named in `options`.
    pub fn new(options: InferenceOptions) -> Self {
        let strategy = strategy_for(&options);
        Self { options, strategy }
    }

    /// Creates an inferrer with a caller-supplied strategy.
    pub fn with_strategy(options: InferenceOptions, strategy: Box<dyn InferenceStrategy>) -> Self {
        Self { options, strategy }
    }

    /// Parses `source` under the configured file name and infers every open parameter.
    pub fn infer(&self, source: &str) -> Result<Vec<FunctionInference>> {
        self.infer_source(source, &self.options.file_name)
    }

    /// Parses `source` as `file_name` and infers every open parameter.
    pub fn infer_source(&self, source: &str, file_name: &str) -> Result<Vec<FunctionInference>> {
        let unit = Parser::new()?.parse_string(source, file_name)?;
        Ok(self.infer_unit(&unit))
    }

    /// Reads and infers a file on disk.
    pub fn infer_file(&self, path: &Path) -> Result<FileReport> {
        let unit = Parser::new()?.parse_file(path)?;
        Ok(FileReport { path: unit.file_name().to_string(), functions: self.infer_unit(&unit) })
    }

    /// Infers every open parameter of an already parsed unit.
    pub fn infer_unit(&self, unit: &SourceUnit) -> Vec<FunctionInference> {
        let program = Program::new(unit);
        let functions = self.infer_with(&program, unit.root());
        info!(
            "{}: inferred {} parameters in {} functions ({} strategy)",
            unit.file_name(),
            functions.iter().map(|f| f.len()).sum::<usize>(),
            functions.len(),
            self.strategy.name()
        );
        functions
    }

    /// Runs the pipeline against any type system adapter.
    pub fn infer_with<'t>(&self, types: &dyn TypeSystem<'t>, root: Node<'t>) -> Vec<FunctionInference> {
        Scanner::new(types)
            .scan(root)
            .iter()
            .map(|function| self.infer_function(types, function))
            .collect()
    }

    fn infer_function<'t>(&self, types: &dyn TypeSystem<'t>, function: &ScannedFunction<'t>) -> FunctionInference {
        debug!("inferring `{}`", function.name.unwrap_or("<anonymous>"));
        let arities = types.call_site_arities(function.node);
        let parameters = function
            .open_parameters()
            .map(|slot| self.infer_parameter(types, slot, &arities))
            .collect();
        FunctionInference {
            name: function.name.map(str::to_string),
            line: function.node.start_position().row + 1,
            parameters,
        }
    }

    fn infer_parameter<'t>(
        &self,
        types: &dyn TypeSystem<'t>,
        slot: &ParameterSlot<'t>,
        arities: &[usize],
    ) -> ParameterInference {
        let body = slot.function.child_by_field_name("body");
        let evidence = match (slot.name, body) {
            (Some(name), Some(body)) => Collector::new(types, slot.function, name, self.options.max_depth).collect(body),
            _ => Vec::new(),
        };
        let ty = Synthesizer::new(types, self.strategy.as_ref(), self.options.conflict_policy).synthesize(&evidence);
        let type_string = types.type_to_display_string(&ty);

        let declared_optional = slot.declaration.kind() == "optional_parameter";
        let short_call = arities.iter().any(|&count| count <= slot.index);
        let position = slot.declaration.start_position();
        let name = slot
            .name
            .or_else(|| types.text(slot.declaration))
            .unwrap_or_default()
            .to_string();
        debug!("  {}: {} from {} evidence items", name, type_string, evidence.len());

        ParameterInference {
            declaration: ParameterDeclaration {
                name,
                index: slot.index,
                start_byte: slot.declaration.start_byte(),
                end_byte: slot.declaration.end_byte(),
                line: position.row + 1,
                column: position.column + 1,
            },
            ty,
            type_string,
            is_optional: declared_optional || short_call,
        }
    }
}

/// Infers every open parameter of `source` with default options.
pub fn infer(source: &str) -> Result<Vec<FunctionInference>> {
    Inferrer::default().infer(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;
    use pretty_assertions::assert_eq;

    fn rendered(functions: &[FunctionInference]) -> Vec<String> {
        functions.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_one_list_per_function() {
        let functions = infer(
            "function f(a, b: number, c) { return a + c.x }\n\
             function g(done: boolean) {}\n\
             function h(z) {}\n",
        )
        .unwrap();
        assert_eq!(rendered(&functions), vec!["a: number, c: { x: number; }", "z: any"]);
        assert_eq!(functions[0].name.as_deref(), Some("f"));
        assert_eq!(functions[0][1].declaration.index, 2);
        assert_eq!(functions[1].line, 3);
    }

    #[test]
    fn test_declaration_location() {
        let source = "function f(p) { return p.y }";
        let functions = infer(source).unwrap();
        let declaration = &functions[0][0].declaration;
        assert_eq!(&source[declaration.start_byte..declaration.end_byte], "p");
        assert_eq!((declaration.line, declaration.column), (1, 12));
    }

    #[test]
    fn test_optional_parameters() {
        let functions = infer(
            "function f(a, b?) { return a * 2 }\n\
             function g(x, y) { return x.k }\n\
             g(1);\n",
        )
        .unwrap();
        assert_eq!(rendered(&functions), vec!["a: number, b: any?", "x: { k: any; }, y: any?"]);
    }

    #[test]
    fn test_strategy_selected_per_run() {
        let source = "function f(p) { p.push(10) }";
        let refined = Inferrer::new(InferenceOptions::default()).infer(source).unwrap();
        let baseline = Inferrer::new(InferenceOptions::default().with_strategy(StrategyKind::Baseline))
            .infer(source)
            .unwrap();
        assert_eq!(rendered(&refined), vec!["p: number[]"]);
        assert_eq!(rendered(&baseline), vec!["p: { push: (arg0: number) => any; }"]);
    }

    #[test]
    fn test_parse_error_returns_no_inferences() {
        let err = Inferrer::default().infer_source("function f(p { p.x", "bad.ts").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_serialized_report() {
        let functions = infer("function f(p) { return p + 1 }").unwrap();
        let json = serde_json::to_value(&functions).unwrap();
        assert_eq!(json[0]["parameters"][0]["type"], "number");
        assert_eq!(json[0]["parameters"][0]["declaration"]["name"], "p");
        assert_eq!(json[0]["parameters"][0]["is_optional"], false);
    }
}
