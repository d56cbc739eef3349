//! Type representation shared by the type system adapter and the inference engine.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The primitive kinds the engine can infer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// `number`
    Number,
    /// `string`
    String,
    /// `boolean`
    Boolean,
}

impl PrimitiveKind {
    /// Maps a predefined type keyword to its kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKind::Number => write!(f, "number"),
            PrimitiveKind::String => write!(f, "string"),
            PrimitiveKind::Boolean => write!(f, "boolean"),
        }
    }
}

/// One named member of a structural shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Member name.
    pub name: String,
    /// Member type.
    pub ty: Type,
}

impl Field {
    /// Creates a new field.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty }
    }
}

/// A type as seen by the inference engine.
///
/// The same representation is used for declared types read from source and
/// for synthesized types, so declared callee types can flow into the merge
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Type {
    /// No refining information; the open type.
    #[default]
    Dynamic,

    /// `number`, `string` or `boolean`.
    Primitive(PrimitiveKind),

    /// Homogeneous array type.
    ArrayOf(Box<Type>),

    /// Anonymous object type. Field order is significant.
    Shape(Vec<Field>),

    /// Opaque reference to an already-declared type, or any declared type
    /// the adapter keeps verbatim.
    Named(String),

    /// Intersection of two or more distinct members, in member order.
    Intersection(Vec<Type>),

    /// Callable signature synthesized from an invocation.
    Function {
        /// Parameter types, positional.
        params: Vec<Type>,
        /// Return type.
        returns: Box<Type>,
    },
}

impl Type {
    /// `number`
    pub const NUMBER: Type = Type::Primitive(PrimitiveKind::Number);
    /// `string`
    pub const STRING: Type = Type::Primitive(PrimitiveKind::String);
    /// `boolean`
    pub const BOOLEAN: Type = Type::Primitive(PrimitiveKind::Boolean);

    /// Builds a shape from `(name, type)` pairs, keeping their order.
    pub fn shape<S: Into<String>>(fields: impl IntoIterator<Item = (S, Type)>) -> Type {
        Type::Shape(fields.into_iter().map(|(name, ty)| Field::new(name, ty)).collect())
    }

    /// Builds `element[]`.
    pub fn array_of(element: Type) -> Type {
        Type::ArrayOf(Box::new(element))
    }

    /// Builds a named reference.
    pub fn named(name: impl Into<String>) -> Type {
        Type::Named(name.into())
    }

    /// Builds a normalized intersection: nested intersections are flattened,
    /// duplicates dropped (first occurrence wins) and member order kept.
    /// A single remaining member is returned as is; no members gives `Dynamic`.
    pub fn intersection_of(members: Vec<Type>) -> Type {
        let mut flat: Vec<Type> = Vec::with_capacity(members.len());
        for member in members {
            let nested = match member {
                Type::Intersection(nested) => nested,
                other => vec![other],
            };
            for ty in nested {
                if !flat.contains(&ty) {
                    flat.push(ty);
                }
            }
        }

        match flat.len() {
            0 => Type::Dynamic,
            1 => flat.pop().unwrap_or_default(),
            _ => Type::Intersection(flat),
        }
    }

    /// Returns true for the open type.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic)
    }

    /// Verbatim unions and callables bind looser than `&` and `[]`.
    fn binds_loosely(&self) -> bool {
        match self {
            Type::Function { .. } => true,
            Type::Named(text) => text.contains('|') || text.contains("=>"),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Dynamic => write!(f, "any"),
            Type::Primitive(kind) => write!(f, "{}", kind),
            Type::ArrayOf(inner) if inner.binds_loosely() || matches!(**inner, Type::Intersection(_)) => {
                write!(f, "({})[]", inner)
            },
            Type::ArrayOf(inner) => write!(f, "{}[]", inner),
            Type::Shape(fields) if fields.is_empty() => write!(f, "{{}}"),
            Type::Shape(fields) => {
                write!(f, "{{ ")?;
                for field in fields {
                    write!(f, "{}: {}; ", field.name, field.ty)?;
                }
                write!(f, "}}")
            },
            Type::Named(name) => write!(f, "{}", name),
            Type::Intersection(members) => {
                let members_str = members
                    .iter()
                    .map(|t| if t.binds_loosely() { format!("({})", t) } else { t.to_string() })
                    .collect::<Vec<_>>()
                    .join(" & ");
                write!(f, "{}", members_str)
            },
            Type::Function { params, returns } => {
                let params_str = params
                    .iter()
                    .enumerate()
                    .map(|(i, t)| format!("arg{}: {}", i, t))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "({}) => {}", params_str, returns)
            },
        }
    }
}

/// Type environment that maps local names of one function to their static types.
#[derive(Debug, Default, Clone)]
pub struct TypeEnv {
    bindings: HashMap<String, Type>,
}

impl TypeEnv {
    /// Creates a new empty type environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a name in the environment.
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.bindings.get(name)
    }

    /// Binds a name to a type, returning the type it shadows.
    pub fn bind(&mut self, name: String, ty: Type) -> Option<Type> {
        self.bindings.insert(name, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::NUMBER.to_string(), "number");
        assert_eq!(Type::array_of(Type::NUMBER).to_string(), "number[]");
        assert_eq!(Type::shape([("x", Type::Dynamic)]).to_string(), "{ x: any; }");
        assert_eq!(Type::Shape(vec![]).to_string(), "{}");
        assert_eq!(
            Type::Intersection(vec![Type::named("K"), Type::shape([("q", Type::Dynamic)])])
                .to_string(),
            "K & { q: any; }"
        );
        assert_eq!(
            Type::Function { params: vec![Type::NUMBER, Type::STRING], returns: Box::new(Type::Dynamic) }
                .to_string(),
            "(arg0: number, arg1: string) => any"
        );
        assert_eq!(
            Type::array_of(Type::Intersection(vec![Type::named("A"), Type::named("B")])).to_string(),
            "(A & B)[]"
        );
        assert_eq!(
            Type::Intersection(vec![Type::named("string | number"), Type::shape([("q", Type::Dynamic)])])
                .to_string(),
            "(string | number) & { q: any; }"
        );
    }

    #[test]
    fn test_intersection_of_normalizes() {
        let k = Type::named("K");
        let g = Type::named("G");
        assert_eq!(Type::intersection_of(vec![]), Type::Dynamic);
        assert_eq!(Type::intersection_of(vec![k.clone(), k.clone()]), k);
        assert_eq!(
            Type::intersection_of(vec![
                k.clone(),
                Type::Intersection(vec![g.clone(), k.clone()]),
            ]),
            Type::Intersection(vec![k, g])
        );
    }

    #[test]
    fn test_type_env() {
        let mut env = TypeEnv::new();
        assert_eq!(env.bind("x".to_string(), Type::NUMBER), None);

        assert_eq!(env.lookup("x"), Some(&Type::NUMBER));
        assert_eq!(env.lookup("y"), None);

        assert_eq!(env.bind("x".to_string(), Type::STRING), Some(Type::NUMBER));
        assert_eq!(env.lookup("x"), Some(&Type::STRING));
    }
}
