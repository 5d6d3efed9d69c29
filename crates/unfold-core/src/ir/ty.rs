use serde::{Deserialize, Serialize};

/// A resolved type in the IR.
///
/// Every IR node carries one; the translator never infers types, it only
/// renders them (declarations of lifted temporaries, casts, `typeof`,
/// lambda parameters) and collects the namespaces they live in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Void / no value.
    Void,
    /// Boolean.
    Bool,
    /// UTF-16 code unit.
    Char,
    /// Signed integer with bit width.
    Int(u8),
    /// Unsigned integer with bit width.
    UInt(u8),
    /// Floating point with bit width (32 or 64).
    Float(u8),
    /// 128-bit decimal.
    Decimal,
    /// String.
    String,
    /// Root object type.
    Object,
    /// Single-dimensional array.
    Array(Box<Type>),
    /// A named (possibly generic, possibly nested) type.
    Named(NamedType),
    /// Compiler-generated anonymous type; cannot be spelled in source.
    Anonymous(String),
}

/// A named type reference.
///
/// `path` holds the declaring-type chain followed by the type's own name,
/// so `Outer.Inner` is `["Outer", "Inner"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedType {
    #[serde(default)]
    pub namespace: Option<String>,
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Type>,
}

impl Type {
    /// Non-generic named type in a namespace.
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Type::Named(NamedType {
            namespace: Some(namespace.into()),
            path: vec![name.into()],
            args: Vec::new(),
        })
    }

    /// Generic named type in a namespace.
    pub fn generic(namespace: impl Into<String>, name: impl Into<String>, args: Vec<Type>) -> Self {
        Type::Named(NamedType {
            namespace: Some(namespace.into()),
            path: vec![name.into()],
            args,
        })
    }

    /// Nested type: `outer_path.name`.
    pub fn nested(namespace: impl Into<String>, path: &[&str]) -> Self {
        Type::Named(NamedType {
            namespace: Some(namespace.into()),
            path: path.iter().map(|s| s.to_string()).collect(),
            args: Vec::new(),
        })
    }

    pub fn int() -> Self {
        Type::Int(32)
    }

    pub fn double() -> Self {
        Type::Float(64)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Type::Anonymous(_))
    }

    /// Whether the type's name is visible in source, recursively.
    pub fn is_nameable(&self) -> bool {
        match self {
            Type::Anonymous(_) => false,
            Type::Array(elem) => elem.is_nameable(),
            Type::Named(named) => named.args.iter().all(Type::is_nameable),
            _ => true,
        }
    }

    /// Push every namespace this type reference needs into `out`.
    ///
    /// Nested types only need the namespace of their outermost declaring
    /// type, which is the one stored on the `NamedType`.
    pub fn collect_namespaces(&self, out: &mut impl Extend<String>) {
        match self {
            Type::Array(elem) => elem.collect_namespaces(out),
            Type::Named(named) => {
                if let Some(ns) = &named.namespace {
                    out.extend(std::iter::once(ns.clone()));
                }
                for arg in &named.args {
                    arg.collect_namespaces(out);
                }
            }
            _ => {}
        }
    }
}
