//! Run configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::DEFAULT_FILE_NAME;

/// Which method-call interpretation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Method calls become callable fields of a structural shape.
    Baseline,
    /// Append-like calls make the receiver an array; other calls as baseline.
    #[default]
    Refined,
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "baseline" => Ok(Self::Baseline),
            "refined" => Ok(Self::Refined),
            other => Err(Error::config_error(format!("unknown strategy `{}`", other))),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Baseline => write!(f, "baseline"),
            StrategyKind::Refined => write!(f, "refined"),
        }
    }
}

/// What to do when two different concrete types claim the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Keep the first-discovered type; own-body evidence is discovered first.
    KeepFirst,
    /// Give up on the path and leave it open.
    #[default]
    Unresolved,
}

/// Options for one inference run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceOptions {
    /// Method-call interpretation.
    pub strategy: StrategyKind,
    /// Methods that mark their receiver as an array under the refined strategy.
    pub append_methods: Vec<String>,
    /// Tie-break between disagreeing concrete types.
    pub conflict_policy: ConflictPolicy,
    /// Maximum syntax depth the collector descends into.
    pub max_depth: usize,
    /// Synthetic file name used in diagnostics.
    pub file_name: String,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            append_methods: vec!["push".to_string()],
            conflict_policy: ConflictPolicy::default(),
            max_depth: 256,
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl InferenceOptions {
    /// Returns these options with another strategy.
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Parses options from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::config_error("max_depth must be at least 1"));
        }
        if let Some(bad) = self.append_methods.iter().find(|m| m.trim().is_empty()) {
            return Err(Error::config_error(format!("invalid append method `{}`", bad)));
        }
        Ok(())
    }
}
