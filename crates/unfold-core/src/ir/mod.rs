pub mod builder;
pub mod node;
pub mod ty;
pub mod value;
pub mod walk;

pub use builder::IrBuilder;
pub use node::{
    BinaryOp, CatchHandler, ElementInit, GotoKind, LabelId, LabelTarget, MemberBinding, MethodKind, MethodRef,
    NewArrayKind, Node, NodeKind, ParamMode, SwitchCase, TypeTestKind, UnaryOp, VarId, Variable,
};
pub use ty::{NamedType, Type};
pub use value::{Constant, ObjectId};
