//! The expression-oriented input tree.
//!
//! Every construct is a value-producing [`Node`], including blocks,
//! conditionals and switches. Nodes are immutable once built; the
//! translator borrows them and may visit the same subtree more than once.

use serde::{Deserialize, Serialize};

use crate::define_entity;
use crate::error::CoreError;

use super::ty::Type;
use super::value::Constant;

define_entity!(VarId);
define_entity!(LabelId);

/// A variable: lambda parameter, block local, or captured from outside.
///
/// Identity is the handle. Two variables with the same display name are
/// distinct unless they share an `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub id: VarId,
    #[serde(default)]
    pub name: Option<String>,
    pub ty: Type,
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl std::hash::Hash for Variable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

/// A jump target. Identity is the handle; the name is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelTarget {
    pub id: LabelId,
    #[serde(default)]
    pub name: Option<String>,
    /// Value type carried by jumps to this label. Only `Void` is lowerable.
    pub ty: Type,
}

impl PartialEq for LabelTarget {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LabelTarget {}

/// A typed IR node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: Type,
}

/// Every IR node kind. The translator matches on this exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Literal or host constant.
    Constant(Constant),
    /// `default(ty)` of the node's own type.
    Default,
    /// Variable reference.
    Variable(Variable),
    /// Binary operator, including assignments.
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Unary operator.
    Unary { op: UnaryOp, operand: Box<Node> },
    /// Re-raise the exception being handled.
    Rethrow,
    /// Two-way conditional. A missing `if_false` only makes sense for
    /// void conditionals.
    Conditional {
        test: Box<Node>,
        if_true: Box<Node>,
        if_false: Option<Box<Node>>,
    },
    /// Multi-way branch over `value`.
    Switch {
        value: Box<Node>,
        cases: Vec<SwitchCase>,
        default: Option<Box<Node>>,
        /// Custom equality method; `None` means the built-in equality.
        comparison: Option<MethodRef>,
    },
    /// Sequence with its own locals; the value is the last member's.
    Block {
        locals: Vec<Variable>,
        body: Vec<Node>,
    },
    /// Infinite loop, exited through jumps to `break_label`.
    Loop {
        body: Box<Node>,
        break_label: Option<LabelTarget>,
        continue_label: Option<LabelTarget>,
    },
    /// Definition point of a jump target.
    Label(LabelTarget),
    /// Jump to a label.
    Goto {
        kind: GotoKind,
        target: LabelTarget,
        value: Option<Box<Node>>,
    },
    /// Exception-handling region.
    Try {
        body: Box<Node>,
        handlers: Vec<CatchHandler>,
        finally: Option<Box<Node>>,
        fault: Option<Box<Node>>,
    },
    /// Lambda; `ty` is the delegate type, `return_ty` the body's type.
    Lambda {
        params: Vec<Variable>,
        body: Box<Node>,
        return_ty: Type,
    },
    /// Method call; `receiver` is `None` for static and extension calls.
    Call {
        receiver: Option<Box<Node>>,
        method: MethodRef,
        args: Vec<Node>,
    },
    /// Object creation of the node's type.
    New {
        #[serde(default)]
        params: Vec<ParamMode>,
        args: Vec<Node>,
        /// Member names, required when the type is anonymous.
        #[serde(default)]
        members: Option<Vec<String>>,
    },
    /// Field or property access; `object` is `None` for statics.
    Member {
        object: Option<Box<Node>>,
        declaring_type: Type,
        name: String,
        /// A field the output cannot name directly; reached through
        /// reflection instead.
        #[serde(default)]
        non_public: bool,
    },
    /// Object creation followed by an object initializer. `creation` must
    /// lower to a constructor call.
    MemberInit {
        creation: Box<Node>,
        bindings: Vec<MemberBinding>,
    },
    /// Collection creation followed by a collection initializer.
    ListInit {
        creation: Box<Node>,
        /// Whether the created type is enumerable, which the initializer
        /// syntax requires.
        enumerable: bool,
        initializers: Vec<ElementInit>,
    },
    /// Indexer access.
    Index { object: Box<Node>, args: Vec<Node> },
    /// Array creation.
    NewArray {
        kind: NewArrayKind,
        element: Type,
        items: Vec<Node>,
    },
    /// Runtime type test.
    TypeTest {
        kind: TypeTestKind,
        operand: Box<Node>,
        tested: Type,
    },
    /// Delegate invocation. A `Lambda` target is inlined.
    Invoke { target: Box<Node>, args: Vec<Node> },
}

impl NodeKind {
    /// Short kind name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Constant(_) => "constant",
            NodeKind::Default => "default",
            NodeKind::Variable(_) => "variable",
            NodeKind::Binary { .. } => "binary",
            NodeKind::Unary { .. } => "unary",
            NodeKind::Rethrow => "rethrow",
            NodeKind::Conditional { .. } => "conditional",
            NodeKind::Switch { .. } => "switch",
            NodeKind::Block { .. } => "block",
            NodeKind::Loop { .. } => "loop",
            NodeKind::Label(_) => "label",
            NodeKind::Goto { .. } => "goto",
            NodeKind::Try { .. } => "try",
            NodeKind::Lambda { .. } => "lambda",
            NodeKind::Call { .. } => "call",
            NodeKind::New { .. } => "new",
            NodeKind::Member { .. } => "member",
            NodeKind::MemberInit { .. } => "member-init",
            NodeKind::ListInit { .. } => "list-init",
            NodeKind::Index { .. } => "index",
            NodeKind::NewArray { .. } => "new-array",
            NodeKind::TypeTest { .. } => "type-test",
            NodeKind::Invoke { .. } => "invoke",
        }
    }
}

/// One arm of a [`NodeKind::Switch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub tests: Vec<Node>,
    pub body: Node,
}

/// One member initializer of a [`NodeKind::MemberInit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberBinding {
    /// `Member = value`
    Assign { member: String, value: Node },
    /// `Member = { bindings }`, initializing the existing member value.
    Member {
        member: String,
        bindings: Vec<MemberBinding>,
    },
    /// `Member = { items }`, adding to the existing collection.
    List {
        member: String,
        enumerable: bool,
        initializers: Vec<ElementInit>,
    },
}

/// One element of a collection initializer: a call of `add_method`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInit {
    pub add_method: MethodRef,
    pub args: Vec<Node>,
}

/// One `catch` clause of a [`NodeKind::Try`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchHandler {
    pub test: Type,
    #[serde(default)]
    pub variable: Option<Variable>,
    #[serde(default)]
    pub filter: Option<Node>,
    pub body: Node,
}

/// A resolved method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRef {
    pub declaring_type: Type,
    pub name: String,
    #[serde(default)]
    pub kind: MethodKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_args: Vec<Type>,
    /// Set when the generic arguments cannot be inferred from the
    /// parameters and must be spelled out.
    #[serde(default)]
    pub explicit_generic_args: bool,
    /// Passing mode per parameter; missing entries are by-value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamMode>,
}

/// How a method is rendered at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MethodKind {
    #[default]
    Ordinary,
    /// Static extension method, rendered with the first argument as receiver.
    Extension,
    /// Single-parameter indexer getter, rendered as element access.
    IndexerGet,
    /// User-defined `==` operator.
    OperatorEquality,
}

/// Argument passing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParamMode {
    #[default]
    Value,
    Ref,
    Out,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GotoKind {
    Goto,
    Break,
    Continue,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewArrayKind {
    /// `new T[] { items… }`
    Init,
    /// `new T[n]`
    Bounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTestKind {
    /// `e is T`
    Is,
    /// Exact runtime type equality.
    Equal,
}

/// Binary operators, including assignment forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    And,
    Or,
    ExclusiveOr,
    LeftShift,
    RightShift,
    AndAlso,
    OrElse,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Coalesce,
    ArrayIndex,
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    AndAssign,
    OrAssign,
    ExclusiveOrAssign,
    LeftShiftAssign,
    RightShiftAssign,
    PowerAssign,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        self == BinaryOp::Assign || self.compound_base().is_some()
    }

    /// The operator a compound assignment applies (`+=` → `+`).
    pub fn compound_base(self) -> Option<BinaryOp> {
        Some(match self {
            BinaryOp::AddAssign => BinaryOp::Add,
            BinaryOp::SubtractAssign => BinaryOp::Subtract,
            BinaryOp::MultiplyAssign => BinaryOp::Multiply,
            BinaryOp::DivideAssign => BinaryOp::Divide,
            BinaryOp::ModuloAssign => BinaryOp::Modulo,
            BinaryOp::AndAssign => BinaryOp::And,
            BinaryOp::OrAssign => BinaryOp::Or,
            BinaryOp::ExclusiveOrAssign => BinaryOp::ExclusiveOr,
            BinaryOp::LeftShiftAssign => BinaryOp::LeftShift,
            BinaryOp::RightShiftAssign => BinaryOp::RightShift,
            BinaryOp::PowerAssign => BinaryOp::Power,
            _ => return None,
        })
    }

    /// Whether the right operand is evaluated conditionally.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse | BinaryOp::Coalesce)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    UnaryPlus,
    /// Logical for `bool` operands, bitwise otherwise.
    Not,
    OnesComplement,
    IsTrue,
    IsFalse,
    ArrayLength,
    /// Conversion to the node's type.
    Convert,
    /// `as` conversion to the node's type.
    TypeAs,
    /// Statement when the node is void-typed, throw-expression otherwise.
    Throw,
    Quote,
    Unbox,
    Increment,
    Decrement,
    PreIncrementAssign,
    PreDecrementAssign,
    PostIncrementAssign,
    PostDecrementAssign,
}

impl UnaryOp {
    /// Whether the operator writes back to its operand.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            UnaryOp::PreIncrementAssign
                | UnaryOp::PreDecrementAssign
                | UnaryOp::PostIncrementAssign
                | UnaryOp::PostDecrementAssign
        )
    }
}

impl Node {
    pub fn new(kind: NodeKind, ty: Type) -> Self {
        Self { kind, ty }
    }

    /// Deserialize a node tree handed over by an orchestrator.
    pub fn from_json(input: &str) -> Result<Node, CoreError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether this is `default(void)`, the IR's "nothing" node.
    pub fn is_void_default(&self) -> bool {
        matches!(self.kind, NodeKind::Default) && self.ty.is_void()
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.kind {
            NodeKind::Variable(v) => Some(v),
            _ => None,
        }
    }
}
