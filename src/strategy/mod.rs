//! Pluggable interpretation of method-call evidence.

use crate::config::{InferenceOptions, StrategyKind};
use crate::types::Type;

/// What a method call says about its receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodUsage {
    /// The receiver is an array with this element type.
    Collection(Type),
    /// The receiver exposes a member named after the method, of this type.
    Member(Type),
}

/// Decides how `receiver.method(args)` refines the receiver.
pub trait InferenceStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Interprets one call of `method` with the given static argument types.
    fn interpret_method_call(&self, method: &str, arguments: &[Type]) -> MethodUsage;
}

/// The callable signature matching an invocation with `arguments`.
pub fn call_signature(arguments: &[Type]) -> Type {
    Type::Function { params: arguments.to_vec(), returns: Box::new(Type::Dynamic) }
}

/// Models every method call structurally: `p.push(10)` gives
/// `{ push: (arg0: number) => any; }`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaselineStrategy;

impl InferenceStrategy for BaselineStrategy {
    fn name(&self) -> &str {
        "baseline"
    }

    fn interpret_method_call(&self, _method: &str, arguments: &[Type]) -> MethodUsage {
        MethodUsage::Member(call_signature(arguments))
    }
}

/// Recognizes append-like methods: `p.push(10)` gives `number[]`.
/// Other methods fall back to the baseline interpretation.
#[derive(Debug, Clone)]
pub struct RefinedStrategy {
    append_methods: Vec<String>,
}

impl Default for RefinedStrategy {
    fn default() -> Self {
        Self::new(vec!["push".to_string()])
    }
}

impl RefinedStrategy {
    /// Creates a strategy recognizing the given append-like method names.
    pub fn new(append_methods: Vec<String>) -> Self {
        Self { append_methods }
    }

    /// Returns true when `method` marks its receiver as an array.
    pub fn is_append_method(&self, method: &str) -> bool {
        self.append_methods.iter().any(|m| m == method)
    }
}

impl InferenceStrategy for RefinedStrategy {
    fn name(&self) -> &str {
        "refined"
    }

    fn interpret_method_call(&self, method: &str, arguments: &[Type]) -> MethodUsage {
        if !self.is_append_method(method) {
            return BaselineStrategy.interpret_method_call(method, arguments);
        }
        // Elements that disagree leave the element type open.
        let element = match arguments.split_first() {
            Some((first, rest)) if rest.iter().all(|a| a == first) => first.clone(),
            _ => Type::Dynamic,
        };
        MethodUsage::Collection(element)
    }
}

/// Builds the strategy selected by `options`.
pub fn strategy_for(options: &InferenceOptions) -> Box<dyn InferenceStrategy> {
    match options.strategy {
        StrategyKind::Baseline => Box::new(BaselineStrategy),
        StrategyKind::Refined => Box::new(RefinedStrategy::new(options.append_methods.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_models_member() {
        assert_eq!(
            BaselineStrategy.interpret_method_call("push", &[Type::NUMBER]),
            MethodUsage::Member(call_signature(&[Type::NUMBER]))
        );
    }

    #[test]
    fn test_refined_append() {
        let refined = RefinedStrategy::default();
        assert_eq!(
            refined.interpret_method_call("push", &[Type::NUMBER]),
            MethodUsage::Collection(Type::NUMBER)
        );
        assert_eq!(
            refined.interpret_method_call("push", &[Type::NUMBER, Type::STRING]),
            MethodUsage::Collection(Type::Dynamic)
        );
        assert_eq!(
            refined.interpret_method_call("trim", &[]),
            MethodUsage::Member(call_signature(&[]))
        );
    }

    #[test]
    fn test_strategy_for_options() {
        let options = InferenceOptions::default().with_strategy(StrategyKind::Baseline);
        assert_eq!(strategy_for(&options).name(), "baseline");

        let mut options = InferenceOptions::default();
        options.append_methods.push("unshift".to_string());
        let strategy = strategy_for(&options);
        assert_eq!(strategy.name(), "refined");
        assert_eq!(
            strategy.interpret_method_call("unshift", &[Type::STRING]),
            MethodUsage::Collection(Type::STRING)
        );
    }
}
