//! Operators, calls, object creation and other value-only node kinds.

use tracing::trace;

use crate::ast::{self, Arg, BinOp, Expr, InitValue, Initializer, Literal, PostfixOp, Stmt, Syntax};
use crate::error::CoreError;
use crate::ir::{
    walk, BinaryOp, Constant, ElementInit, MemberBinding, MethodKind, MethodRef, NewArrayKind, Node, NodeKind,
    ParamMode, Type, TypeTestKind, UnaryOp, Variable,
};

use super::{can_reorder, two, Context, Session};

/// Output operator for a non-assigning IR operator.
fn binary_operator(op: BinaryOp) -> Result<BinOp, CoreError> {
    Ok(match op {
        BinaryOp::Add => BinOp::Add,
        BinaryOp::Subtract => BinOp::Sub,
        BinaryOp::Multiply => BinOp::Mul,
        BinaryOp::Divide => BinOp::Div,
        BinaryOp::Modulo => BinOp::Rem,
        BinaryOp::And => BinOp::BitAnd,
        BinaryOp::Or => BinOp::BitOr,
        BinaryOp::ExclusiveOr => BinOp::BitXor,
        BinaryOp::LeftShift => BinOp::Shl,
        BinaryOp::RightShift => BinOp::Shr,
        BinaryOp::AndAlso => BinOp::LogicalAnd,
        BinaryOp::OrElse => BinOp::LogicalOr,
        BinaryOp::Equal => BinOp::Eq,
        BinaryOp::NotEqual => BinOp::Ne,
        BinaryOp::LessThan => BinOp::Lt,
        BinaryOp::LessThanOrEqual => BinOp::Le,
        BinaryOp::GreaterThan => BinOp::Gt,
        BinaryOp::GreaterThanOrEqual => BinOp::Ge,
        BinaryOp::Coalesce => BinOp::Coalesce,
        other => {
            return Err(CoreError::Invariant(format!(
                "{other:?} has no direct operator form"
            )))
        }
    })
}

/// Attach passing modes to arguments; `offset` skips leading parameters.
fn with_modes(params: &[ParamMode], args: Vec<Expr>, offset: usize) -> Vec<Arg> {
    args.into_iter()
        .enumerate()
        .map(|(i, value)| Arg {
            mode: params.get(i + offset).copied().unwrap_or_default(),
            value,
        })
        .collect()
}

fn one() -> Expr {
    Expr::Literal(Literal::Int(1))
}

fn unassignable(target: &Node) -> CoreError {
    CoreError::Unsupported(format!("assignment to a {} target", target.kind.name()))
}

/// How an assignment target is rebuilt from its lowered operands.
enum Place {
    /// Needs no operands.
    Fixed(Expr),
    /// `object.name`
    Member(String),
    /// `collection[indices]`
    Element,
}

impl Place {
    fn build(self, mut operands: Vec<Expr>) -> Result<Expr, CoreError> {
        match self {
            Place::Fixed(expr) => Ok(expr),
            Place::Member(name) => match (operands.pop(), operands.is_empty()) {
                (Some(object), true) => Ok(Expr::field(object, name)),
                _ => Err(CoreError::Invariant("member target needs exactly one object".into())),
            },
            Place::Element if operands.is_empty() => {
                Err(CoreError::Invariant("element target without a collection".into()))
            }
            Place::Element => {
                let collection = operands.remove(0);
                Ok(Expr::Index {
                    collection: Box::new(collection),
                    indices: operands,
                })
            }
        }
    }
}

impl Session<'_> {
    // ------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------

    pub(super) fn lower_constant(&mut self, value: &Constant) -> Result<Expr, CoreError> {
        Ok(match value {
            Constant::Null => Expr::Literal(Literal::Null),
            Constant::Bool(b) => Expr::Literal(Literal::Bool(*b)),
            Constant::Int(i) => Expr::Literal(Literal::Int(*i)),
            Constant::UInt(u) => Expr::Literal(Literal::UInt(*u)),
            Constant::Float(f) => Expr::Literal(Literal::Float(*f)),
            Constant::Decimal(d) => Expr::Literal(Literal::Decimal(d.clone())),
            Constant::Char(c) => Expr::Literal(Literal::Char(*c)),
            Constant::String(s) => Expr::Literal(Literal::String(s.clone())),
            Constant::Type(ty) => Expr::TypeOf(self.use_type(ty)),
            Constant::Enum { ty, members } => {
                let ty = self.use_type(ty);
                let mut flags = members
                    .iter()
                    .map(|member| Expr::field(Expr::TypeRef(ty.clone()), member.clone()));
                match flags.next() {
                    Some(first) => flags.fold(first, |acc, flag| Expr::binary(BinOp::BitOr, acc, flag)),
                    None => Expr::Cast {
                        expr: Box::new(Expr::Literal(Literal::Int(0))),
                        ty: ty.clone(),
                    },
                }
            }
            Constant::EnumValue { ty, value } => Expr::Cast {
                expr: Box::new(Expr::Literal(Literal::Int(*value))),
                ty: self.use_type(ty),
            },
            Constant::Tuple(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.lower_constant(item)?);
                }
                Expr::TupleInit(out)
            }
            Constant::Default(ty) => Expr::Default(self.use_type(ty)),
            Constant::Object(id) => self.replacements.get(id).cloned().ok_or_else(|| {
                CoreError::Unsupported(format!("host object constant {id:?} has no replacement"))
            })?,
        })
    }

    pub(super) fn lower_default(&mut self, ty: &Type, cx: Context) -> Result<Syntax, CoreError> {
        if !ty.is_void() {
            return Ok(Syntax::Expr(Expr::Default(self.use_type(ty))));
        }
        match cx {
            Context::Statement => Ok(Syntax::Stmt(Stmt::Empty)),
            _ => Err(CoreError::Unsupported(
                "default(void) where a value is required".into(),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    pub(super) fn lower_binary(
        &mut self,
        node: &Node,
        op: BinaryOp,
        left: &Node,
        right: &Node,
        cx: Context,
    ) -> Result<Syntax, CoreError> {
        if op.is_assignment() {
            return Ok(Syntax::Expr(self.lower_assignment(op, left, right)?));
        }
        if op.is_short_circuit() {
            return self.lower_short_circuit(node, op, left, right, cx);
        }

        let (lhs, rhs) = two(self.lower_operands(&[left, right], "lifted")?)?;
        Ok(Syntax::Expr(match op {
            BinaryOp::ArrayIndex => Expr::Index {
                collection: Box::new(lhs),
                indices: vec![rhs],
            },
            BinaryOp::Power => {
                if left.ty != Type::double() || right.ty != Type::double() {
                    return Err(CoreError::NotImplemented(format!(
                        "power over {:?} and {:?} operands",
                        left.ty, right.ty
                    )));
                }
                self.math_pow(lhs, rhs)
            }
            _ => Expr::binary(binary_operator(op)?, lhs, rhs),
        }))
    }

    fn math_pow(&mut self, base: Expr, exponent: Expr) -> Expr {
        let math = self.use_type(&Type::named("System", "Math"));
        Expr::Call {
            callee: Box::new(Expr::field(Expr::TypeRef(math), "Pow")),
            generic_args: Vec::new(),
            args: vec![Arg::value(base), Arg::value(exponent)],
        }
    }

    /// `&&`, `||` and `??`. The right operand runs conditionally, so its
    /// lifted statements must not run ahead of the left operand's test.
    fn lower_short_circuit(
        &mut self,
        node: &Node,
        op: BinaryOp,
        left: &Node,
        right: &Node,
        cx: Context,
    ) -> Result<Syntax, CoreError> {
        let lhs = self.lower_expr(left)?;
        let (rhs, state) = self.isolated(|s| s.lower_expr(right))?;
        if state.is_empty() {
            self.absorb_names(&state);
            return Ok(Syntax::Expr(Expr::binary(binary_operator(op)?, lhs, rhs)));
        }
        if op == BinaryOp::Coalesce {
            return Err(CoreError::NotImplemented(
                "coalesce whose right operand requires statements".into(),
            ));
        }

        trace!(?op, "right operand lifts; rewriting as a conditional");
        let test = self.bind_synthetic(left.ty.clone(), lhs);
        let test_node = Node::var(&test);
        let (if_true, if_false) = match op {
            BinaryOp::AndAlso => (right.clone(), Node::bool(false)),
            _ => (Node::bool(true), right.clone()),
        };
        let out = self.lower_conditional(&test_node, &if_true, Some(&if_false), &node.ty, cx, None);
        self.substitutions.remove(&test.id);
        out
    }

    fn lower_assignment(&mut self, op: BinaryOp, target: &Node, value: &Node) -> Result<Expr, CoreError> {
        if op != BinaryOp::Assign {
            return self.lower_compound_assignment(op, target, value);
        }
        let (target_expr, value_expr) = match &target.kind {
            NodeKind::Variable(var) => {
                let target_expr = self.resolve_variable(var)?;
                let lowerable = target_expr.as_ident().map(str::to_string);
                let value_expr = self.lower_value(value, lowerable.as_deref())?;
                (target_expr, value_expr)
            }
            NodeKind::Member {
                object,
                declaring_type,
                name,
                non_public: true,
            } => {
                let Some(object) = object else {
                    return Err(CoreError::NotImplemented("non-public static field assignment".into()));
                };
                let mut seq = Vec::with_capacity(2);
                self.lower_ordered(&mut seq, "lifted", |s| s.lower_expr(object))?;
                self.lower_ordered(&mut seq, "lifted", |s| s.lower_value(value, None))?;
                let (object, value_expr) = two(seq)?;
                let field = self.field_info(declaring_type, name);
                return Ok(Expr::Call {
                    callee: Box::new(Expr::field(field, "SetValue")),
                    generic_args: Vec::new(),
                    args: vec![Arg::value(object), Arg::value(value_expr)],
                });
            }
            NodeKind::Member {
                object: Some(object),
                name,
                ..
            } => {
                let mut seq = Vec::with_capacity(2);
                self.lower_ordered(&mut seq, "lifted", |s| s.lower_expr(object))?;
                self.lower_ordered(&mut seq, "lifted", |s| s.lower_value(value, None))?;
                let (object, value_expr) = two(seq)?;
                (Expr::field(object, name.clone()), value_expr)
            }
            NodeKind::Member {
                object: None,
                declaring_type,
                name,
                ..
            } => {
                let owner = Expr::TypeRef(self.use_type(declaring_type));
                (Expr::field(owner, name.clone()), self.lower_value(value, None)?)
            }
            NodeKind::Index { object, args } => {
                let mut nodes: Vec<&Node> = vec![object.as_ref()];
                nodes.extend(args.iter());
                self.lower_element_assignment(&nodes, value)?
            }
            NodeKind::Binary {
                op: BinaryOp::ArrayIndex,
                left,
                right,
            } => self.lower_element_assignment(&[left.as_ref(), right.as_ref()], value)?,
            _ => return Err(unassignable(target)),
        };

        // The value was lowered straight into the target.
        if target_expr.as_ident().is_some() && value_expr == target_expr {
            return Ok(target_expr);
        }
        Ok(Expr::assign(target_expr, value_expr))
    }

    /// `target op= value`.
    ///
    /// The target's current value is read before `value` runs. When `value`
    /// lifts statements that could change it, the read is hoisted into a
    /// temporary ahead of them and the assignment is spelled out as
    /// `target = temp op value`.
    fn lower_compound_assignment(&mut self, op: BinaryOp, target: &Node, value: &Node) -> Result<Expr, CoreError> {
        let base = op
            .compound_base()
            .ok_or_else(|| CoreError::Invariant(format!("{op:?} is not an assignment operator")))?;
        if let NodeKind::Member { non_public: true, .. } = &target.kind {
            // Reflection has no compound form; read, combine and write back.
            let combined = Node::binary(base, target.clone(), value.clone(), target.ty.clone());
            return self.lower_assignment(BinaryOp::Assign, target, &combined);
        }

        let (nodes, place) = match &target.kind {
            NodeKind::Variable(var) => (Vec::new(), Place::Fixed(self.resolve_variable(var)?)),
            NodeKind::Member {
                object: Some(object),
                name,
                ..
            } => (vec![object.as_ref()], Place::Member(name.clone())),
            NodeKind::Member {
                object: None,
                declaring_type,
                name,
                ..
            } => {
                let owner = Expr::TypeRef(self.use_type(declaring_type));
                (Vec::new(), Place::Fixed(Expr::field(owner, name.clone())))
            }
            NodeKind::Index { object, args } => {
                let mut nodes: Vec<&Node> = vec![object.as_ref()];
                nodes.extend(args.iter());
                (nodes, Place::Element)
            }
            NodeKind::Binary {
                op: BinaryOp::ArrayIndex,
                left,
                right,
            } => (vec![left.as_ref(), right.as_ref()], Place::Element),
            _ => return Err(unassignable(target)),
        };

        let mut operands = self.lower_operands(&nodes, "lifted")?;
        let mark = self.lifted_len();
        let rhs = self.lower_value(value, None)?;
        let mut read_at = mark;
        if self.lifted_len() > mark {
            read_at += self.hoist_earlier(&mut operands, mark, "lifted");
        }
        let location = place.build(operands)?;

        let lifted_since_read = &self.lifted.current().statements[read_at..];
        if !lifted_since_read.is_empty()
            && !self.is_settled(&location)
            && !can_reorder(&location, lifted_since_read)
        {
            let name = self.fresh_temp("lifted");
            trace!(temp = %name, "compound assignment value lifts; reading the target first");
            self.lifted.current_mut().statements.insert(
                read_at,
                Stmt::VarDecl {
                    name: name.clone(),
                    ty: None,
                    init: Some(location.clone()),
                },
            );
            let combined = self.combine(base, Expr::Ident(name), rhs)?;
            return Ok(Expr::assign(location, combined));
        }

        if base == BinaryOp::Power {
            let combined = self.math_pow(location.clone(), rhs);
            return Ok(Expr::assign(location, combined));
        }
        Ok(Expr::Assign {
            op: Some(binary_operator(base)?),
            target: Box::new(location),
            value: Box::new(rhs),
        })
    }

    fn combine(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Result<Expr, CoreError> {
        match op {
            BinaryOp::Power => Ok(self.math_pow(lhs, rhs)),
            _ => Ok(Expr::binary(binary_operator(op)?, lhs, rhs)),
        }
    }

    /// `collection[indices] = value`, with the collection and indices
    /// evaluated before the value.
    fn lower_element_assignment(&mut self, nodes: &[&Node], value: &Node) -> Result<(Expr, Expr), CoreError> {
        let mut seq = Vec::with_capacity(nodes.len() + 1);
        for node in nodes {
            self.lower_ordered(&mut seq, "lifted", |s| s.lower_expr(node))?;
        }
        self.lower_ordered(&mut seq, "lifted", |s| s.lower_value(value, None))?;
        let value_expr = seq
            .pop()
            .ok_or_else(|| CoreError::Invariant("element assignment without a value".into()))?;
        if seq.is_empty() {
            return Err(CoreError::Invariant("element assignment without a collection".into()));
        }
        let collection = seq.remove(0);
        Ok((
            Expr::Index {
                collection: Box::new(collection),
                indices: seq,
            },
            value_expr,
        ))
    }

    pub(super) fn lower_unary(&mut self, ty: &Type, op: UnaryOp, operand: &Node) -> Result<Syntax, CoreError> {
        let e = self.lower_expr(operand)?;
        let prefix = |op, e| Expr::Unary {
            op,
            expr: Box::new(e),
        };
        let postfix = |op, e| Expr::Postfix {
            op,
            expr: Box::new(e),
        };
        Ok(Syntax::Expr(match op {
            UnaryOp::Negate => prefix(ast::UnaryOp::Neg, e),
            UnaryOp::UnaryPlus => prefix(ast::UnaryOp::Plus, e),
            UnaryOp::Not if operand.ty == Type::Bool => prefix(ast::UnaryOp::Not, e),
            UnaryOp::Not | UnaryOp::OnesComplement => prefix(ast::UnaryOp::BitNot, e),
            UnaryOp::IsTrue | UnaryOp::Quote | UnaryOp::Unbox => e,
            UnaryOp::IsFalse => prefix(ast::UnaryOp::Not, e),
            UnaryOp::ArrayLength => Expr::field(e, "Length"),
            UnaryOp::Convert => Expr::Cast {
                expr: Box::new(e),
                ty: self.use_type(ty),
            },
            UnaryOp::TypeAs => Expr::As {
                expr: Box::new(e),
                ty: self.use_type(ty),
            },
            UnaryOp::Throw if ty.is_void() => return Ok(Syntax::Stmt(Stmt::Throw(Some(e)))),
            UnaryOp::Throw => Expr::Throw(Box::new(e)),
            UnaryOp::Increment => Expr::binary(BinOp::Add, e, one()),
            UnaryOp::Decrement => Expr::binary(BinOp::Sub, e, one()),
            UnaryOp::PreIncrementAssign => prefix(ast::UnaryOp::PreIncrement, e),
            UnaryOp::PreDecrementAssign => prefix(ast::UnaryOp::PreDecrement, e),
            UnaryOp::PostIncrementAssign => postfix(PostfixOp::PostIncrement, e),
            UnaryOp::PostDecrementAssign => postfix(PostfixOp::PostDecrement, e),
        }))
    }

    // ------------------------------------------------------------------
    // Calls and creation
    // ------------------------------------------------------------------

    pub(super) fn lower_call(
        &mut self,
        receiver: Option<&Node>,
        method: &MethodRef,
        args: &[Node],
    ) -> Result<Expr, CoreError> {
        let declaring = self.use_type(&method.declaring_type);

        let mut nodes: Vec<&Node> = Vec::with_capacity(args.len() + 1);
        nodes.extend(receiver);
        nodes.extend(args.iter());
        let mut values = self.lower_operands(&nodes, "liftedArg")?;
        let receiver = match receiver {
            Some(_) if !values.is_empty() => Some(values.remove(0)),
            _ => None,
        };

        let generic_args = if method.explicit_generic_args {
            method.generic_args.iter().map(|t| self.use_type(t)).collect()
        } else {
            Vec::new()
        };

        match (method.kind, receiver) {
            (MethodKind::IndexerGet, Some(collection)) => Ok(Expr::Index {
                collection: Box::new(collection),
                indices: values,
            }),
            (MethodKind::IndexerGet, None) => Err(CoreError::Unsupported(format!(
                "indexer getter {} called without a receiver",
                method.name
            ))),
            (MethodKind::OperatorEquality, _) => {
                let (lhs, rhs) = two(values)?;
                Ok(Expr::binary(BinOp::Eq, lhs, rhs))
            }
            (MethodKind::Extension, None) if values.first().is_some_and(|v| !v.is_null_literal()) => {
                let this = values.remove(0);
                Ok(Expr::Call {
                    callee: Box::new(Expr::field(this, method.name.clone())),
                    generic_args,
                    args: with_modes(&method.params, values, 1),
                })
            }
            (_, Some(receiver)) => Ok(Expr::Call {
                callee: Box::new(Expr::field(receiver, method.name.clone())),
                generic_args,
                args: with_modes(&method.params, values, 0),
            }),
            (_, None) => Ok(Expr::Call {
                callee: Box::new(Expr::field(Expr::TypeRef(declaring), method.name.clone())),
                generic_args,
                args: with_modes(&method.params, values, 0),
            }),
        }
    }

    pub(super) fn lower_new(
        &mut self,
        ty: &Type,
        params: &[ParamMode],
        args: &[Node],
        members: Option<&[String]>,
    ) -> Result<Expr, CoreError> {
        let nodes: Vec<&Node> = args.iter().collect();
        let values = self.lower_operands(&nodes, "liftedArg")?;
        match members {
            Some(members) => {
                if members.len() != values.len() {
                    return Err(CoreError::Unsupported(format!(
                        "anonymous object with {} members but {} values",
                        members.len(),
                        values.len()
                    )));
                }
                Ok(Expr::AnonymousNew {
                    fields: members.iter().cloned().zip(values).collect(),
                })
            }
            None if ty.is_anonymous() => Err(CoreError::Unsupported(
                "anonymous type created without member names".into(),
            )),
            None => Ok(Expr::New {
                ty: self.use_type(ty),
                args: with_modes(params, values, 0),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Initializers
    // ------------------------------------------------------------------

    pub(super) fn lower_member_init(&mut self, creation: &Node, bindings: &[MemberBinding]) -> Result<Expr, CoreError> {
        let (ty, args) = self.lower_creation(creation)?;
        let mut fields = Vec::with_capacity(bindings.len());
        for binding in bindings {
            fields.push(self.lower_binding(binding)?);
        }
        Ok(Expr::NewWithInit {
            ty,
            args,
            init: Initializer::Object(fields),
        })
    }

    pub(super) fn lower_list_init(
        &mut self,
        creation: &Node,
        enumerable: bool,
        initializers: &[ElementInit],
    ) -> Result<Expr, CoreError> {
        let (ty, args) = self.lower_creation(creation)?;
        let items = self.lower_element_inits(enumerable, initializers)?;
        Ok(Expr::NewWithInit {
            ty,
            args,
            init: Initializer::Collection(items),
        })
    }

    fn lower_creation(&mut self, creation: &Node) -> Result<(Type, Vec<Arg>), CoreError> {
        match self.lower_expr(creation)? {
            Expr::New { ty, args } => Ok((ty, args)),
            other => Err(CoreError::Unsupported(format!(
                "initializer after a non-constructor expression {other:?}"
            ))),
        }
    }

    fn lower_binding(&mut self, binding: &MemberBinding) -> Result<(String, InitValue), CoreError> {
        match binding {
            MemberBinding::Assign { member, value } => {
                let mark = self.lifted_len();
                let value = self.lower_expr(value)?;
                if self.lifted_len() > mark {
                    return Err(CoreError::NotImplemented(
                        "member initializer whose value requires statements".into(),
                    ));
                }
                Ok((member.clone(), InitValue::Value(value)))
            }
            MemberBinding::Member { member, bindings } => {
                let mut nested = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    nested.push(self.lower_binding(binding)?);
                }
                Ok((member.clone(), InitValue::Nested(Initializer::Object(nested))))
            }
            MemberBinding::List {
                member,
                enumerable,
                initializers,
            } => {
                let items = self.lower_element_inits(*enumerable, initializers)?;
                Ok((member.clone(), InitValue::Nested(Initializer::Collection(items))))
            }
        }
    }

    /// Items of a collection initializer. The syntax only expresses
    /// single-argument `Add` calls on an enumerable collection.
    fn lower_element_inits(&mut self, enumerable: bool, initializers: &[ElementInit]) -> Result<Vec<Expr>, CoreError> {
        let incompatible = !enumerable
            || initializers
                .iter()
                .any(|init| init.add_method.name != "Add" || init.args.len() != 1);
        if incompatible {
            return Err(CoreError::NotImplemented(
                "collection initializer other than single-argument Add on an enumerable".into(),
            ));
        }
        let mut items = Vec::with_capacity(initializers.len());
        for init in initializers {
            let [item] = init.args.as_slice() else {
                return Err(CoreError::Invariant("Add initializer without exactly one argument".into()));
            };
            let mark = self.lifted_len();
            items.push(self.lower_expr(item)?);
            if self.lifted_len() > mark {
                return Err(CoreError::NotImplemented(
                    "collection initializer element that requires statements".into(),
                ));
            }
        }
        Ok(items)
    }

    pub(super) fn lower_member(
        &mut self,
        ty: &Type,
        object: Option<&Node>,
        declaring_type: &Type,
        name: &str,
        non_public: bool,
    ) -> Result<Expr, CoreError> {
        if non_public {
            let Some(object) = object else {
                return Err(CoreError::NotImplemented("non-public static field access".into()));
            };
            let object = self.lower_expr(object)?;
            let field = self.field_info(declaring_type, name);
            let read = Expr::Call {
                callee: Box::new(Expr::field(field, "GetValue")),
                generic_args: Vec::new(),
                args: vec![Arg::value(object)],
            };
            return Ok(Expr::Cast {
                expr: Box::new(read),
                ty: self.use_type(ty),
            });
        }
        let owner = match object {
            Some(object) => self.lower_expr(object)?,
            None => Expr::TypeRef(self.use_type(declaring_type)),
        };
        Ok(Expr::field(owner, name))
    }

    /// `typeof(D).GetField("name", ...)`, the reflection handle for an
    /// instance field the output cannot name directly.
    fn field_info(&mut self, declaring_type: &Type, name: &str) -> Expr {
        let flags = self.use_type(&Type::named("System.Reflection", "BindingFlags"));
        let flag = |member: &str| Expr::field(Expr::TypeRef(flags.clone()), member);
        let binding = Expr::binary(
            BinOp::BitOr,
            flag("Instance"),
            Expr::binary(BinOp::BitOr, flag("NonPublic"), flag("DeclaredOnly")),
        );
        Expr::Call {
            callee: Box::new(Expr::field(Expr::TypeOf(self.use_type(declaring_type)), "GetField")),
            generic_args: Vec::new(),
            args: vec![
                Arg::value(Expr::Literal(Literal::String(name.to_string()))),
                Arg::value(binding),
            ],
        }
    }

    pub(super) fn lower_index(&mut self, object: &Node, args: &[Node]) -> Result<Expr, CoreError> {
        let mut nodes: Vec<&Node> = vec![object];
        nodes.extend(args.iter());
        let mut values = self.lower_operands(&nodes, "liftedArg")?;
        let collection = values.remove(0);
        Ok(Expr::Index {
            collection: Box::new(collection),
            indices: values,
        })
    }

    pub(super) fn lower_new_array(
        &mut self,
        kind: NewArrayKind,
        element: &Type,
        items: &[Node],
    ) -> Result<Expr, CoreError> {
        let element = self.use_type(element);
        let nodes: Vec<&Node> = items.iter().collect();
        let mut values = self.lower_operands(&nodes, "liftedArg")?;
        match kind {
            NewArrayKind::Init => Ok(Expr::ArrayInit { element, items: values }),
            NewArrayKind::Bounds if values.len() == 1 => Ok(Expr::ArrayBounds {
                element,
                len: Box::new(values.remove(0)),
            }),
            NewArrayKind::Bounds => Err(CoreError::NotImplemented(format!(
                "array creation with {} bounds",
                values.len()
            ))),
        }
    }

    pub(super) fn lower_type_test(
        &mut self,
        kind: TypeTestKind,
        operand: &Node,
        tested: &Type,
    ) -> Result<Expr, CoreError> {
        let e = self.lower_expr(operand)?;
        let ty = self.use_type(tested);
        Ok(match kind {
            TypeTestKind::Is => Expr::TypeCheck {
                expr: Box::new(e),
                ty,
            },
            TypeTestKind::Equal => {
                let get_type = Expr::Call {
                    callee: Box::new(Expr::field(e, "GetType")),
                    generic_args: Vec::new(),
                    args: Vec::new(),
                };
                Expr::binary(BinOp::Eq, get_type, Expr::TypeOf(ty))
            }
        })
    }

    // ------------------------------------------------------------------
    // Invocation
    // ------------------------------------------------------------------

    pub(super) fn lower_invoke(&mut self, target: &Node, args: &[Node], cx: Context) -> Result<Syntax, CoreError> {
        if let NodeKind::Lambda { params, body, .. } = &target.kind {
            if self.config.inline_closure_invocations {
                return self.inline_closure(params, body, args, cx);
            }
        }
        let mut nodes: Vec<&Node> = vec![target];
        nodes.extend(args.iter());
        let mut values = self.lower_operands(&nodes, "liftedArg")?;
        let callee = values.remove(0);
        Ok(Syntax::Expr(Expr::CallIndirect {
            callee: Box::new(callee),
            args: values.into_iter().map(Arg::value).collect(),
        }))
    }

    /// `((a, b) => body)(x, y)`: translate `body` in place with the
    /// parameters bound to the arguments.
    fn inline_closure(
        &mut self,
        params: &[Variable],
        body: &Node,
        args: &[Node],
        cx: Context,
    ) -> Result<Syntax, CoreError> {
        if params.len() != args.len() {
            return Err(CoreError::Unsupported(format!(
                "closure with {} parameters invoked with {} arguments",
                params.len(),
                args.len()
            )));
        }
        for (param, arg) in params.iter().zip(args) {
            let value = self.lower_expr(arg)?;
            if value.is_literal() && !walk::assigns(body, param.id) {
                self.substitutions.insert(param.id, value);
                continue;
            }
            let base = param.name.as_deref().unwrap_or("lifted");
            // A parameter the body writes is an ordinary local, not a settled temporary.
            let name = if walk::assigns(body, param.id) {
                self.fresh_local(base)
            } else {
                self.fresh_temp(base)
            };
            trace!(param = %name, "binding closure argument to a temporary");
            let ty = if value.is_null_literal() {
                Some(self.declared_type(&param.ty)?)
            } else {
                None
            };
            self.lift(Stmt::VarDecl {
                name: name.clone(),
                ty,
                init: Some(value),
            });
            self.substitutions.insert(param.id, Expr::Ident(name));
        }
        let result = self.lower(body, cx);
        for param in params {
            self.substitutions.remove(&param.id);
        }
        result
    }
}
