use crate::entity::Minter;

use super::node::{
    BinaryOp, CatchHandler, ElementInit, GotoKind, LabelId, LabelTarget, MemberBinding, MethodKind, MethodRef,
    NewArrayKind, Node, NodeKind, ParamMode, SwitchCase, TypeTestKind, UnaryOp, VarId, Variable,
};
use super::ty::Type;
use super::value::Constant;

/// Builder for the identities inside one IR tree.
///
/// Mints the `VarId`/`LabelId` handles that give variables and labels
/// their identity. Node construction goes through the associated
/// functions on [`Node`] below, which fill in result types the way the
/// IR producer would.
#[derive(Debug, Default)]
pub struct IrBuilder {
    vars: Minter<VarId>,
    labels: Minter<LabelId>,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named variable.
    pub fn var(&mut self, name: impl Into<String>, ty: Type) -> Variable {
        Variable {
            id: self.vars.mint(),
            name: Some(name.into()),
            ty,
        }
    }

    /// Create a variable without a display name.
    pub fn unnamed_var(&mut self, ty: Type) -> Variable {
        Variable {
            id: self.vars.mint(),
            name: None,
            ty,
        }
    }

    /// Create a named void label.
    pub fn label(&mut self, name: impl Into<String>) -> LabelTarget {
        LabelTarget {
            id: self.labels.mint(),
            name: Some(name.into()),
            ty: Type::Void,
        }
    }

    /// Create an unnamed void label.
    pub fn unnamed_label(&mut self) -> LabelTarget {
        LabelTarget {
            id: self.labels.mint(),
            name: None,
            ty: Type::Void,
        }
    }

    /// Create a label whose jumps carry a value of type `ty`.
    pub fn value_label(&mut self, name: impl Into<String>, ty: Type) -> LabelTarget {
        LabelTarget {
            id: self.labels.mint(),
            name: Some(name.into()),
            ty,
        }
    }
}

impl MethodRef {
    /// An ordinary, non-generic method with by-value parameters.
    pub fn new(declaring_type: Type, name: impl Into<String>) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            kind: MethodKind::Ordinary,
            generic_args: Vec::new(),
            explicit_generic_args: false,
            params: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_params(mut self, params: Vec<ParamMode>) -> Self {
        self.params = params;
        self
    }

    /// Generic arguments that must be spelled out at the call site.
    pub fn with_explicit_generic_args(mut self, args: Vec<Type>) -> Self {
        self.generic_args = args;
        self.explicit_generic_args = true;
        self
    }
}

impl CatchHandler {
    pub fn new(test: Type, variable: Option<Variable>, body: Node) -> Self {
        Self {
            test,
            variable,
            filter: None,
            body,
        }
    }

    pub fn with_filter(mut self, filter: Node) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl SwitchCase {
    pub fn new(tests: Vec<Node>, body: Node) -> Self {
        Self { tests, body }
    }
}

impl ElementInit {
    /// `collection.Add(item)` on a collection of type `collection`.
    pub fn add(collection: Type, item: Node) -> Self {
        Self {
            add_method: MethodRef::new(collection, "Add"),
            args: vec![item],
        }
    }
}

impl MemberBinding {
    pub fn assign(member: impl Into<String>, value: Node) -> Self {
        MemberBinding::Assign {
            member: member.into(),
            value,
        }
    }
}

impl Node {
    pub fn constant(value: Constant, ty: Type) -> Node {
        Node::new(NodeKind::Constant(value), ty)
    }

    pub fn int(value: i64) -> Node {
        Node::constant(Constant::Int(value), Type::int())
    }

    pub fn bool(value: bool) -> Node {
        Node::constant(Constant::Bool(value), Type::Bool)
    }

    pub fn string(value: impl Into<String>) -> Node {
        Node::constant(Constant::String(value.into()), Type::String)
    }

    pub fn null(ty: Type) -> Node {
        Node::constant(Constant::Null, ty)
    }

    pub fn default_of(ty: Type) -> Node {
        Node::new(NodeKind::Default, ty)
    }

    /// `default(void)`: an empty arm.
    pub fn empty() -> Node {
        Node::default_of(Type::Void)
    }

    pub fn var(variable: &Variable) -> Node {
        Node::new(NodeKind::Variable(variable.clone()), variable.ty.clone())
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node, ty: Type) -> Node {
        Node::new(
            NodeKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
        )
    }

    /// Arithmetic/bitwise operator typed like its left operand.
    pub fn arith(op: BinaryOp, left: Node, right: Node) -> Node {
        let ty = left.ty.clone();
        Node::binary(op, left, right, ty)
    }

    pub fn add(left: Node, right: Node) -> Node {
        Node::arith(BinaryOp::Add, left, right)
    }

    pub fn equal(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Equal, left, right, Type::Bool)
    }

    pub fn and_also(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::AndAlso, left, right, Type::Bool)
    }

    pub fn assign(target: Node, value: Node) -> Node {
        let ty = target.ty.clone();
        Node::binary(BinaryOp::Assign, target, value, ty)
    }

    pub fn unary(op: UnaryOp, operand: Node, ty: Type) -> Node {
        Node::new(
            NodeKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn convert(operand: Node, ty: Type) -> Node {
        Node::unary(UnaryOp::Convert, operand, ty)
    }

    pub fn throw(operand: Node) -> Node {
        Node::unary(UnaryOp::Throw, operand, Type::Void)
    }

    /// Value conditional typed like its true arm.
    pub fn condition(test: Node, if_true: Node, if_false: Node) -> Node {
        let ty = if_true.ty.clone();
        Node::condition_typed(test, if_true, if_false, ty)
    }

    pub fn condition_typed(test: Node, if_true: Node, if_false: Node, ty: Type) -> Node {
        Node::new(
            NodeKind::Conditional {
                test: Box::new(test),
                if_true: Box::new(if_true),
                if_false: Some(Box::new(if_false)),
            },
            ty,
        )
    }

    pub fn if_then(test: Node, if_true: Node) -> Node {
        Node::new(
            NodeKind::Conditional {
                test: Box::new(test),
                if_true: Box::new(if_true),
                if_false: None,
            },
            Type::Void,
        )
    }

    pub fn if_then_else(test: Node, if_true: Node, if_false: Node) -> Node {
        Node::condition_typed(test, if_true, if_false, Type::Void)
    }

    pub fn switch(value: Node, cases: Vec<SwitchCase>, default: Option<Node>, ty: Type) -> Node {
        Node::new(
            NodeKind::Switch {
                value: Box::new(value),
                cases,
                default: default.map(Box::new),
                comparison: None,
            },
            ty,
        )
    }

    /// Block typed like its last member (void when empty).
    pub fn block(locals: Vec<Variable>, body: Vec<Node>) -> Node {
        let ty = body.last().map(|n| n.ty.clone()).unwrap_or(Type::Void);
        Node::new(NodeKind::Block { locals, body }, ty)
    }

    pub fn block_typed(locals: Vec<Variable>, body: Vec<Node>, ty: Type) -> Node {
        Node::new(NodeKind::Block { locals, body }, ty)
    }

    pub fn loop_(body: Node, break_label: Option<LabelTarget>, continue_label: Option<LabelTarget>) -> Node {
        Node::new(
            NodeKind::Loop {
                body: Box::new(body),
                break_label,
                continue_label,
            },
            Type::Void,
        )
    }

    pub fn label(target: &LabelTarget) -> Node {
        Node::new(NodeKind::Label(target.clone()), Type::Void)
    }

    pub fn goto(target: &LabelTarget) -> Node {
        Node::jump(GotoKind::Goto, target)
    }

    pub fn jump(kind: GotoKind, target: &LabelTarget) -> Node {
        Node::new(
            NodeKind::Goto {
                kind,
                target: target.clone(),
                value: None,
            },
            Type::Void,
        )
    }

    pub fn try_catch(body: Node, handlers: Vec<CatchHandler>) -> Node {
        let ty = body.ty.clone();
        Node::new(
            NodeKind::Try {
                body: Box::new(body),
                handlers,
                finally: None,
                fault: None,
            },
            ty,
        )
    }

    pub fn try_finally(body: Node, handlers: Vec<CatchHandler>, finally: Node) -> Node {
        let ty = body.ty.clone();
        Node::new(
            NodeKind::Try {
                body: Box::new(body),
                handlers,
                finally: Some(Box::new(finally)),
                fault: None,
            },
            ty,
        )
    }

    pub fn try_fault(body: Node, fault: Node) -> Node {
        let ty = body.ty.clone();
        Node::new(
            NodeKind::Try {
                body: Box::new(body),
                handlers: Vec::new(),
                finally: None,
                fault: Some(Box::new(fault)),
            },
            ty,
        )
    }

    /// Lambda whose return type is the body's type.
    pub fn lambda(params: Vec<Variable>, body: Node, delegate_ty: Type) -> Node {
        let return_ty = body.ty.clone();
        Node::new(
            NodeKind::Lambda {
                params,
                body: Box::new(body),
                return_ty,
            },
            delegate_ty,
        )
    }

    pub fn call(receiver: Node, method: MethodRef, args: Vec<Node>, ty: Type) -> Node {
        Node::new(
            NodeKind::Call {
                receiver: Some(Box::new(receiver)),
                method,
                args,
            },
            ty,
        )
    }

    pub fn call_static(method: MethodRef, args: Vec<Node>, ty: Type) -> Node {
        Node::new(
            NodeKind::Call {
                receiver: None,
                method,
                args,
            },
            ty,
        )
    }

    pub fn new_object(ty: Type, args: Vec<Node>) -> Node {
        Node::new(
            NodeKind::New {
                params: Vec::new(),
                args,
                members: None,
            },
            ty,
        )
    }

    /// `new T(args) { A = a, ... }`, typed as the created object.
    pub fn member_init(creation: Node, bindings: Vec<MemberBinding>) -> Node {
        let ty = creation.ty.clone();
        Node::new(
            NodeKind::MemberInit {
                creation: Box::new(creation),
                bindings,
            },
            ty,
        )
    }

    /// `new T(args) { x, y }` for an enumerable `T`.
    pub fn list_init(creation: Node, initializers: Vec<ElementInit>) -> Node {
        let ty = creation.ty.clone();
        Node::new(
            NodeKind::ListInit {
                creation: Box::new(creation),
                enumerable: true,
                initializers,
            },
            ty,
        )
    }

    pub fn new_anonymous(ty: Type, members: Vec<String>, args: Vec<Node>) -> Node {
        Node::new(
            NodeKind::New {
                params: Vec::new(),
                args,
                members: Some(members),
            },
            ty,
        )
    }

    pub fn member(object: Node, declaring_type: Type, name: impl Into<String>, ty: Type) -> Node {
        Node::new(
            NodeKind::Member {
                object: Some(Box::new(object)),
                declaring_type,
                name: name.into(),
                non_public: false,
            },
            ty,
        )
    }

    pub fn static_member(declaring_type: Type, name: impl Into<String>, ty: Type) -> Node {
        Node::new(
            NodeKind::Member {
                object: None,
                declaring_type,
                name: name.into(),
                non_public: false,
            },
            ty,
        )
    }

    /// Instance field the output can only reach through reflection.
    pub fn non_public_field(object: Node, declaring_type: Type, name: impl Into<String>, ty: Type) -> Node {
        Node::new(
            NodeKind::Member {
                object: Some(Box::new(object)),
                declaring_type,
                name: name.into(),
                non_public: true,
            },
            ty,
        )
    }

    pub fn index(object: Node, args: Vec<Node>, ty: Type) -> Node {
        Node::new(
            NodeKind::Index {
                object: Box::new(object),
                args,
            },
            ty,
        )
    }

    pub fn new_array(element: Type, items: Vec<Node>) -> Node {
        let ty = Type::Array(Box::new(element.clone()));
        Node::new(
            NodeKind::NewArray {
                kind: NewArrayKind::Init,
                element,
                items,
            },
            ty,
        )
    }

    pub fn new_array_bounds(element: Type, bound: Node) -> Node {
        let ty = Type::Array(Box::new(element.clone()));
        Node::new(
            NodeKind::NewArray {
                kind: NewArrayKind::Bounds,
                element,
                items: vec![bound],
            },
            ty,
        )
    }

    pub fn type_is(operand: Node, tested: Type) -> Node {
        Node::new(
            NodeKind::TypeTest {
                kind: TypeTestKind::Is,
                operand: Box::new(operand),
                tested,
            },
            Type::Bool,
        )
    }

    pub fn invoke(target: Node, args: Vec<Node>, ty: Type) -> Node {
        Node::new(
            NodeKind::Invoke {
                target: Box::new(target),
                args,
            },
            ty,
        )
    }
}
