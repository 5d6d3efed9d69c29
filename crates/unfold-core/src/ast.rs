//! Statement-oriented output syntax.
//!
//! The AST mirrors a block-scoped, C#-shaped language: only statements can
//! hold loops, exception handling and labels, and only some expressions
//! may stand alone as statements (see [`Expr::is_valid_statement`]).
//! The lowering produces these trees; rendering them to text is left to
//! the caller.

use serde::{Deserialize, Serialize};

use crate::ir::{ParamMode, Type};

/// Literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(String),
    Char(char),
    String(String),
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal constant.
    Literal(Literal),
    /// Named variable or parameter reference; `_` is the discard.
    Ident(String),
    /// Binary operation: `lhs op rhs`.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Prefix unary operation: `op expr`.
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// Postfix unary operation: `expr op`.
    Postfix { op: PostfixOp, expr: Box<Expr> },
    /// Assignment: `target = value`, or `target op= value` when `op` is set.
    Assign {
        op: Option<BinOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Ternary: `cond ? then_val : else_val`.
    Ternary {
        cond: Box<Expr>,
        then_val: Box<Expr>,
        else_val: Box<Expr>,
    },
    /// Switch expression: `value switch { pattern => result, ... }`.
    Switch { value: Box<Expr>, arms: Vec<SwitchArm> },
    /// Invocation of a named method: `callee<generic_args>(args...)`.
    ///
    /// `callee` is an identifier or a member access.
    Call {
        callee: Box<Expr>,
        generic_args: Vec<Type>,
        args: Vec<Arg>,
    },
    /// Invocation of a delegate-valued expression: `callee(args...)`.
    CallIndirect { callee: Box<Expr>, args: Vec<Arg> },
    /// Member access: `object.field`.
    Field { object: Box<Expr>, field: String },
    /// A type used as an expression (static member receiver).
    TypeRef(Type),
    /// Element access: `collection[indices...]`.
    Index {
        collection: Box<Expr>,
        indices: Vec<Expr>,
    },
    /// Object creation: `new T(args...)`.
    New { ty: Type, args: Vec<Arg> },
    /// Object creation with an initializer: `new T(args...) { ... }`.
    NewWithInit {
        ty: Type,
        args: Vec<Arg>,
        init: Initializer,
    },
    /// Anonymous object creation: `new { Name = value, ... }`.
    AnonymousNew { fields: Vec<(String, Expr)> },
    /// Array creation with initializer: `new T[] { items... }`.
    ArrayInit { element: Type, items: Vec<Expr> },
    /// Array creation with a length: `new T[len]`.
    ArrayBounds { element: Type, len: Box<Expr> },
    /// Lambda: `(params) => body`.
    Lambda {
        params: Vec<LambdaParam>,
        body: LambdaBody,
    },
    /// Conversion: `(T)expr`.
    Cast { expr: Box<Expr>, ty: Type },
    /// Safe conversion: `expr as T`.
    As { expr: Box<Expr>, ty: Type },
    /// Runtime type check: `expr is T`.
    TypeCheck { expr: Box<Expr>, ty: Type },
    /// `typeof(T)`.
    TypeOf(Type),
    /// `default(T)`.
    Default(Type),
    /// Throw expression: `throw expr`.
    Throw(Box<Expr>),
    /// Tuple literal: `(elements...)`.
    TupleInit(Vec<Expr>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    LogicalAnd,
    LogicalOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Coalesce,
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    /// Logical NOT: `!expr`.
    Not,
    /// Bitwise NOT: `~expr`.
    BitNot,
    PreIncrement,
    PreDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostfixOp {
    PostIncrement,
    PostDecrement,
}

/// A call argument with its passing modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    pub mode: ParamMode,
    pub value: Expr,
}

impl Arg {
    pub fn value(value: Expr) -> Self {
        Self {
            mode: ParamMode::Value,
            value,
        }
    }
}

/// Brace initializer after an object creation or a member name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    /// `{ Name = value, Other = { ... } }`
    Object(Vec<(String, InitValue)>),
    /// `{ item, item }`
    Collection(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InitValue {
    Value(Expr),
    Nested(Initializer),
}

/// One arm of a switch expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchArm {
    pub pattern: Pattern,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Constant pattern.
    Const(Expr),
    /// `_`
    Discard,
}

/// Lambda parameter; `ty` is `None` when the type is left to inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaParam {
    pub name: String,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Expression statement.
    Expr(Expr),
    /// Local declaration: `T name [= init];`, or `var name = init;` when
    /// `ty` is `None`.
    VarDecl {
        name: String,
        ty: Option<Type>,
        init: Option<Expr>,
    },
    /// Nested block: `{ ... }`.
    Block(Vec<Stmt>),
    /// If/else. A single `If` in `else_body` renders as `else if`.
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    /// Switch statement.
    Switch {
        value: Expr,
        sections: Vec<SwitchSection>,
    },
    /// Infinite loop (`while (true) { ... }`).
    Loop { body: Vec<Stmt> },
    /// Break.
    Break,
    /// `goto label;`
    Goto(String),
    /// `label: stmt`
    Labeled { label: String, stmt: Box<Stmt> },
    /// Return.
    Return(Option<Expr>),
    /// `throw expr;`, or a bare rethrow when `None`.
    Throw(Option<Expr>),
    /// Try/catch/finally.
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    /// `;`
    Empty,
}

/// One section of a switch statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchSection {
    pub labels: Vec<SwitchLabel>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchLabel {
    Case(Expr),
    Default,
}

/// `catch (T name) when (filter) { body }`; `ty` is `None` for a
/// catch-all clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub ty: Option<Type>,
    pub name: Option<String>,
    pub filter: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// A translated fragment: either kind of node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Syntax {
    Expr(Expr),
    Stmt(Stmt),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn field(object: Expr, field: impl Into<String>) -> Self {
        Expr::Field {
            object: Box::new(object),
            field: field.into(),
        }
    }

    /// The `_` discard target.
    pub fn discard() -> Self {
        Expr::Ident("_".into())
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expr::Literal(Literal::Null))
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Whether the expression may stand alone as an expression statement.
    pub fn is_valid_statement(&self) -> bool {
        match self {
            Expr::Call { .. }
            | Expr::CallIndirect { .. }
            | Expr::Assign { .. }
            | Expr::New { .. }
            | Expr::NewWithInit { .. } => true,
            Expr::Unary { op, .. } => matches!(op, UnaryOp::PreIncrement | UnaryOp::PreDecrement),
            Expr::Postfix { .. } => true,
            _ => false,
        }
    }
}

impl Stmt {
    /// Plain assignment statement `target = value;`.
    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::Expr(Expr::assign(target, value))
    }
}
