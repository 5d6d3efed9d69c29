use serde::{Deserialize, Serialize};

use crate::define_entity;

use super::ty::Type;

define_entity!(ObjectId);

/// A compile-time constant carried by a `Constant` IR node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Decimal kept in its textual form to avoid rounding.
    Decimal(String),
    Char(char),
    String(String),
    /// A type object (`typeof(T)`).
    Type(Type),
    /// A defined enum value; several members are OR-ed flags.
    Enum { ty: Type, members: Vec<String> },
    /// An enum value with no defined member; rendered as a cast.
    EnumValue { ty: Type, value: i64 },
    /// A value tuple.
    Tuple(Vec<Constant>),
    /// The default value of a value type (`default(T)`).
    Default(Type),
    /// An opaque host object. Only renderable through a caller-supplied
    /// constant replacement.
    Object(ObjectId),
}

impl Constant {
    /// Infer the type of this constant, where it has a fixed one.
    pub fn ty(&self) -> Option<Type> {
        Some(match self {
            Constant::Null => Type::Object,
            Constant::Bool(_) => Type::Bool,
            Constant::Int(_) => Type::Int(32),
            Constant::UInt(_) => Type::UInt(32),
            Constant::Float(_) => Type::Float(64),
            Constant::Decimal(_) => Type::Decimal,
            Constant::Char(_) => Type::Char,
            Constant::String(_) => Type::String,
            Constant::Type(_) => Type::named("System", "Type"),
            Constant::Enum { ty, .. } | Constant::EnumValue { ty, .. } | Constant::Default(ty) => {
                ty.clone()
            }
            Constant::Tuple(_) | Constant::Object(_) => return None,
        })
    }
}
