//! Turns the evidence collected for one parameter into a single type.
//!
//! Evidence is grouped into a trie keyed by access path. Own-body evidence is
//! inserted first and call-argument evidence second, so children are ordered
//! by first discovery with own-body fields ahead of call-only fields. Each
//! trie node is then resolved bottom-up:
//!
//! * a concrete claim (primitive, array, callable) beats any shape built from
//!   children, and a shape beats a bare access;
//! * named references are never unpacked: they are intersected with the
//!   fields their members do not already cover;
//! * claims that cannot be unified are settled by [`ConflictPolicy`].

use log::debug;

use crate::checker::TypeSystem;
use crate::config::ConflictPolicy;
use crate::evidence::{AccessPath, Origin, UsageEvidence};
use crate::strategy::{call_signature, InferenceStrategy, MethodUsage};
use crate::types::{Field, PrimitiveKind, Type};

/// Evidence accumulated at one access path.
#[derive(Debug, Default)]
struct PathNode {
    /// Concrete non-named types, unified where compatible, in discovery order.
    claims: Vec<Type>,
    /// Distinct named references in discovery order.
    named: Vec<Type>,
    /// Whether a named reference was the first claim of any kind.
    named_first: bool,
    /// An explicitly empty object type `{}` was seen here.
    empty_shape: bool,
    children: Vec<(String, PathNode)>,
}

impl PathNode {
    fn child(&mut self, name: &str) -> &mut PathNode {
        let index = match self.children.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.children.push((name.to_string(), PathNode::default()));
                self.children.len() - 1
            },
        };
        &mut self.children[index].1
    }

    fn descend(&mut self, path: &AccessPath) -> &mut PathNode {
        let mut node = self;
        for segment in path.segments() {
            node = node.child(segment);
        }
        node
    }

    fn absorb(&mut self, ty: Type) {
        match ty {
            Type::Dynamic => {},
            Type::Named(_) => {
                if self.claims.is_empty() && self.named.is_empty() {
                    self.named_first = true;
                }
                if !self.named.contains(&ty) {
                    self.named.push(ty);
                }
            },
            Type::Intersection(members) => {
                for member in members {
                    self.absorb(member);
                }
            },
            Type::Shape(fields) if fields.is_empty() => self.empty_shape = true,
            Type::Shape(fields) => {
                for field in fields {
                    self.child(&field.name).absorb(field.ty);
                }
            },
            concrete => self.claim(concrete),
        }
    }

    fn claim(&mut self, ty: Type) {
        for existing in self.claims.iter_mut() {
            if let Some(unified) = unify(existing, &ty) {
                *existing = unified;
                return;
            }
        }
        self.claims.push(ty);
    }
}

/// Combines two claims when one refines the other. Open positions yield to
/// concrete ones; anything else is a conflict.
fn unify(a: &Type, b: &Type) -> Option<Type> {
    match (a, b) {
        _ if a == b => Some(a.clone()),
        (Type::Dynamic, other) | (other, Type::Dynamic) => Some(other.clone()),
        (Type::ArrayOf(x), Type::ArrayOf(y)) => unify(x, y).map(Type::array_of),
        (
            Type::Function { params: a_params, returns: a_ret },
            Type::Function { params: b_params, returns: b_ret },
        ) if a_params.len() == b_params.len() => {
            let params = a_params
                .iter()
                .zip(b_params)
                .map(|(x, y)| unify(x, y))
                .collect::<Option<Vec<_>>>()?;
            Some(Type::Function { params, returns: Box::new(unify(a_ret, b_ret)?) })
        },
        _ => None,
    }
}

/// The merge engine for one inference run.
pub struct Synthesizer<'s, 't> {
    types: &'s dyn TypeSystem<'t>,
    strategy: &'s dyn InferenceStrategy,
    policy: ConflictPolicy,
}

impl<'s, 't> Synthesizer<'s, 't> {
    /// Creates a synthesizer using `strategy` for method calls.
    pub fn new(
        types: &'s dyn TypeSystem<'t>,
        strategy: &'s dyn InferenceStrategy,
        policy: ConflictPolicy,
    ) -> Self {
        Self { types, strategy, policy }
    }

    /// Produces the final type for a parameter from its ordered evidence.
    pub fn synthesize(&self, evidence: &[UsageEvidence]) -> Type {
        if evidence.is_empty() {
            return Type::Dynamic;
        }

        let mut root = PathNode::default();
        for origin in [Origin::OwnBody, Origin::CallArgument] {
            for item in evidence.iter().filter(|e| e.origin() == origin) {
                self.insert(&mut root, item);
            }
        }
        self.resolve(&root, &AccessPath::root())
    }

    fn insert(&self, root: &mut PathNode, evidence: &UsageEvidence) {
        let node = root.descend(evidence.path());
        match evidence {
            UsageEvidence::PropertyAccess(_) => {},
            UsageEvidence::NumericOperator(_) => node.absorb(self.types.build_primitive(PrimitiveKind::Number)),
            UsageEvidence::StringOperator(_) => node.absorb(self.types.build_primitive(PrimitiveKind::String)),
            UsageEvidence::MethodCall { method, arguments, .. } => {
                match self.strategy.interpret_method_call(method, arguments) {
                    MethodUsage::Collection(element) => node.absorb(self.types.build_array_of(element)),
                    MethodUsage::Member(ty) => node.child(method).absorb(ty),
                }
            },
            UsageEvidence::Invocation { arguments, .. } => node.absorb(call_signature(arguments)),
            UsageEvidence::CallArgument { declared, .. } => node.absorb(declared.clone()),
            UsageEvidence::Assignment { assigned, .. } => node.absorb(assigned.clone()),
        }
    }

    fn resolve(&self, node: &PathNode, path: &AccessPath) -> Type {
        let fields: Vec<Field> = node
            .children
            .iter()
            .map(|(name, child)| Field::new(name.clone(), self.resolve(child, &path.child(name.clone()))))
            .collect();

        let conflicting = node.claims.len() > 1 || (!node.claims.is_empty() && !node.named.is_empty());
        if conflicting {
            debug!(
                "conflicting types at {}: {}",
                path,
                node.named
                    .iter()
                    .chain(node.claims.iter())
                    .map(|t| self.types.type_to_display_string(t))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            match self.policy {
                ConflictPolicy::Unresolved => return Type::Dynamic,
                ConflictPolicy::KeepFirst if !node.named_first => return node.claims[0].clone(),
                ConflictPolicy::KeepFirst => {},
            }
        } else if let Some(claim) = node.claims.first() {
            return claim.clone();
        }

        if !node.named.is_empty() {
            return self.combine_named(&node.named, fields);
        }
        if !fields.is_empty() || node.empty_shape {
            return self.types.build_structural_shape(fields);
        }
        Type::Dynamic
    }

    /// `named[0] & named[1] & ... & { leftover }`, where leftover holds the
    /// fields no reference declares.
    fn combine_named(&self, named: &[Type], fields: Vec<Field>) -> Type {
        let covered: Vec<String> = named
            .iter()
            .filter_map(|n| self.types.named_type_members(n))
            .flatten()
            .collect();
        let leftover: Vec<Field> = fields.into_iter().filter(|f| !covered.contains(&f.name)).collect();

        let mut members = named.to_vec();
        if !leftover.is_empty() {
            members.push(self.types.build_structural_shape(leftover));
        }
        self.types.build_intersection(members)
    }
}
