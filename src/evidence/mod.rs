//! Usage evidence: the facts the collector observes about a parameter.

use std::fmt;

use serde::Serialize;

use crate::types::Type;

/// Field names leading from a parameter to the value that was used.
/// The empty path is the parameter itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct AccessPath(Vec<String>);

impl AccessPath {
    /// The parameter itself.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns a new path extended by `field`.
    pub fn child(&self, field: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(field.into());
        Self(segments)
    }

    /// Path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Every prefix of this path, from the root up to and including itself.
    pub fn prefixes(&self) -> impl Iterator<Item = AccessPath> + '_ {
        (0..=self.0.len()).map(move |len| AccessPath(self.0[..len].to_vec()))
    }
}

impl<S: Into<String>> FromIterator<S> for AccessPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

/// Where a piece of evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    /// Observed directly in the function body.
    OwnBody,
    /// Read off the declared parameter type of a callee.
    CallArgument,
}

/// One observed use of a parameter or of a value reached through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UsageEvidence {
    /// The value at `path` was read.
    PropertyAccess(AccessPath),

    /// The value took part in arithmetic or a comparison with a non-string operand.
    NumericOperator(AccessPath),

    /// The value took part in concatenation or a comparison with a string operand.
    StringOperator(AccessPath),

    /// A method was invoked on the value.
    MethodCall {
        /// Receiver path.
        path: AccessPath,
        /// Method name.
        method: String,
        /// Static argument types, `Dynamic` where unknown.
        arguments: Vec<Type>,
    },

    /// The value was passed where a callee declares a non-open type.
    CallArgument {
        /// Path of the value passed (or of a field of it, for decomposed shapes).
        path: AccessPath,
        /// The callee's declared type at that position.
        declared: Type,
    },

    /// The value itself was called.
    Invocation {
        /// Callee path.
        path: AccessPath,
        /// Static argument types, `Dynamic` where unknown.
        arguments: Vec<Type>,
    },

    /// A value of known type was assigned to the path.
    Assignment {
        /// Assignment target.
        path: AccessPath,
        /// Static type of the right-hand side.
        assigned: Type,
    },
}

impl UsageEvidence {
    /// The path this evidence is about.
    pub fn path(&self) -> &AccessPath {
        match self {
            UsageEvidence::PropertyAccess(path)
            | UsageEvidence::NumericOperator(path)
            | UsageEvidence::StringOperator(path) => path,
            UsageEvidence::MethodCall { path, .. }
            | UsageEvidence::CallArgument { path, .. }
            | UsageEvidence::Invocation { path, .. }
            | UsageEvidence::Assignment { path, .. } => path,
        }
    }

    /// Which trie the evidence belongs to during synthesis.
    pub fn origin(&self) -> Origin {
        match self {
            UsageEvidence::CallArgument { .. } => Origin::CallArgument,
            _ => Origin::OwnBody,
        }
    }
}

impl fmt::Display for UsageEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageEvidence::PropertyAccess(path) => write!(f, "access {}", path),
            UsageEvidence::NumericOperator(path) => write!(f, "numeric {}", path),
            UsageEvidence::StringOperator(path) => write!(f, "string {}", path),
            UsageEvidence::MethodCall { path, method, arguments } => {
                write!(f, "method {}.{}/{}", path, method, arguments.len())
            },
            UsageEvidence::CallArgument { path, declared } => write!(f, "argument {}: {}", path, declared),
            UsageEvidence::Invocation { path, arguments } => {
                write!(f, "invoke {}/{}", path, arguments.len())
            },
            UsageEvidence::Assignment { path, assigned } => write!(f, "assign {}: {}", path, assigned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        let path: AccessPath = ["q", "a", "c"].into_iter().collect();
        let prefixes: Vec<String> = path.prefixes().map(|p| p.to_string()).collect();
        assert_eq!(prefixes, vec!["<root>", "q", "q.a", "q.a.c"]);
    }

    #[test]
    fn test_origin() {
        let root = AccessPath::root();
        assert_eq!(UsageEvidence::PropertyAccess(root.clone()).origin(), Origin::OwnBody);
        assert_eq!(
            UsageEvidence::CallArgument { path: root.child("k"), declared: Type::NUMBER }.origin(),
            Origin::CallArgument
        );
    }
}
