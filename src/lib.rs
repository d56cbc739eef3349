//! paraminfer: usage-based type inference for untyped function parameters.
//!
//! The library scans TypeScript sources for functions whose parameters
//! resolve to an open type, collects how each such parameter is used in its
//! function body, and synthesizes a structural type from that evidence.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod checker;
pub mod collector;
pub mod config;
pub mod driver;
pub mod error;
pub mod evidence;
pub mod parser;
pub mod scanner;
pub mod strategy;
pub mod synthesizer;
pub mod types;
pub mod utils;

pub use driver::{infer, FileReport, FunctionInference, Inferrer, ParameterInference};

/// Re-exports commonly used types and traits.
pub mod prelude {
    pub use crate::config::{ConflictPolicy, InferenceOptions, StrategyKind};
    pub use crate::driver::{infer, FileReport, FunctionInference, Inferrer, ParameterInference};
    pub use crate::error::{Error, Result};
    pub use crate::types::Type;
}
