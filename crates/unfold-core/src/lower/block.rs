//! Blocks, jumps, loops, exception regions and lambdas.

use std::collections::HashSet;

use tracing::trace;

use crate::ast::{CatchClause, Expr, LambdaBody, LambdaParam, Stmt, Syntax};
use crate::error::CoreError;
use crate::ir::{walk, BinaryOp, CatchHandler, LabelTarget, Node, NodeKind, Type, VarId, Variable};

use super::{expect_expr, Context, Session};

/// `[.., v = X, v]` where `v` is one of `locals` and nothing else touches
/// it: the pair can be replaced by `X`.
fn trailing_assignment<'a>(locals: &[&Variable], members: &[&'a Node]) -> Option<(VarId, &'a Node)> {
    let [rest @ .., assign, last] = members else {
        return None;
    };
    let assign: &'a Node = *assign;
    let var = last.as_variable()?;
    if !locals.iter().any(|local| local.id == var.id) {
        return None;
    }
    let NodeKind::Binary {
        op: BinaryOp::Assign,
        left,
        right,
    } = &assign.kind
    else {
        return None;
    };
    if left.as_variable().map(|v| v.id) != Some(var.id) {
        return None;
    }
    if walk::references(right, var.id) || rest.iter().any(|m| walk::references(m, var.id)) {
        return None;
    }
    Some((var.id, right.as_ref()))
}

fn labeled_empty(label: String) -> Stmt {
    Stmt::Labeled {
        label,
        stmt: Box::new(Stmt::Empty),
    }
}

impl Session<'_> {
    // ------------------------------------------------------------------
    // Block
    // ------------------------------------------------------------------

    pub(super) fn lower_block(&mut self, locals: &[Variable], body: &[Node], cx: Context) -> Result<Syntax, CoreError> {
        let mut locals: Vec<&Variable> = locals.iter().collect();
        let mut members: Vec<&Node> = body.iter().collect();

        if cx != Context::Statement && self.config.forward_trailing_assignment {
            if let Some((var, value)) = trailing_assignment(&locals, &members) {
                trace!("forwarding trailing assignment of a block local");
                locals.retain(|local| local.id != var);
                members.truncate(members.len() - 2);
                members.push(value);
            }
        }

        if members.is_empty() {
            return match cx {
                Context::Expression => Err(CoreError::Unsupported(
                    "empty block where a value is required".into(),
                )),
                _ => Ok(Syntax::Stmt(Stmt::Block(Vec::new()))),
            };
        }

        let own_frame = cx != Context::Expression;
        if own_frame {
            self.scopes.push();
            self.lifted.push();
        }

        for member in &members {
            if let NodeKind::Label(target) = &member.kind {
                self.label_name(target)?;
            }
        }
        for local in &locals {
            let name = self.uniquify(local.name.as_deref());
            if own_frame {
                self.scopes.bind_variable(local.id, name)?;
            } else {
                self.lifted.bind(local.id, name)?;
            }
        }

        let last = members.len() - 1;
        let mut initialized: HashSet<VarId> = HashSet::new();
        let mut pending_label: Option<String> = None;
        let mut value = None;

        for (i, member) in members.iter().enumerate() {
            if let NodeKind::Label(target) = &member.kind {
                if pending_label.is_some() {
                    return Err(CoreError::NotImplemented(
                        "more than one label on the same statement".into(),
                    ));
                }
                pending_label = Some(self.label_name(target)?);
                continue;
            }

            let member_cx = if i == last { cx } else { Context::Statement };
            let mark = self.lifted_len();
            let syntax = self.lower(member, member_cx)?;
            let syntax = if member_cx == Context::Statement && self.config.merge_local_initializers {
                self.merge_initializer(member, syntax, &locals, &members[..i], &mut initialized)?
            } else {
                syntax
            };

            if member_cx == Context::Expression {
                value = Some(expect_expr(syntax)?);
            } else if let Some(stmt) = self.statement_of(syntax, member_cx) {
                self.lift(stmt);
            }

            if let Some(label) = pending_label.take() {
                if self.lifted_len() > mark {
                    let statements = &mut self.lifted.current_mut().statements;
                    let target = std::mem::replace(&mut statements[mark], Stmt::Empty);
                    statements[mark] = Stmt::Labeled {
                        label,
                        stmt: Box::new(target),
                    };
                } else if member_cx == Context::Expression {
                    self.lift(labeled_empty(label));
                } else {
                    // Nothing was emitted; the label moves on to the next statement.
                    pending_label = Some(label);
                }
            }
        }

        if let Some(label) = pending_label {
            if cx == Context::Expression {
                return Err(CoreError::NotImplemented(
                    "label at the end of a block that produces a value".into(),
                ));
            }
            self.lift(labeled_empty(label));
        }

        let mut decls = Vec::new();
        for local in locals.iter().filter(|local| !initialized.contains(&local.id)) {
            decls.push(Stmt::VarDecl {
                name: self.bound_name(local)?,
                ty: Some(self.declared_type(&local.ty)?),
                init: None,
            });
        }

        if !own_frame {
            self.lifted.current_mut().unassigned_decls.extend(decls);
            let value = value.ok_or_else(|| CoreError::Invariant("expression block produced no value".into()))?;
            return Ok(Syntax::Expr(value));
        }

        let state = self.lifted.pop()?;
        for name in &state.names {
            self.scopes.reserve_name(name.clone());
        }
        self.scopes.pop()?;
        decls.extend(state.into_statements());
        Ok(Syntax::Stmt(Stmt::Block(decls)))
    }

    /// Turn `local = value;` into `var local = value;` when it is the first
    /// thing to touch `local`.
    fn merge_initializer(
        &mut self,
        member: &Node,
        syntax: Syntax,
        locals: &[&Variable],
        earlier: &[&Node],
        initialized: &mut HashSet<VarId>,
    ) -> Result<Syntax, CoreError> {
        let NodeKind::Binary {
            op: BinaryOp::Assign,
            left,
            right,
        } = &member.kind
        else {
            return Ok(syntax);
        };
        let Some(var) = left.as_variable() else {
            return Ok(syntax);
        };
        if !locals.iter().any(|local| local.id == var.id)
            || initialized.contains(&var.id)
            || walk::references(right, var.id)
            || earlier.iter().any(|m| walk::references(m, var.id))
        {
            return Ok(syntax);
        }
        let name = self.bound_name(var)?;
        let value = match syntax {
            Syntax::Expr(Expr::Assign {
                op: None,
                target,
                value,
            }) if target.as_ident() == Some(name.as_str()) => value,
            other => return Ok(other),
        };
        let ty = if value.is_null_literal() {
            Some(self.declared_type(&var.ty)?)
        } else {
            None
        };
        initialized.insert(var.id);
        Ok(Syntax::Stmt(Stmt::VarDecl {
            name,
            ty,
            init: Some(*value),
        }))
    }

    // ------------------------------------------------------------------
    // Labels and jumps
    // ------------------------------------------------------------------

    /// Output name of a label, registering it in the current frame on
    /// first sight.
    fn label_name(&mut self, target: &LabelTarget) -> Result<String, CoreError> {
        if !target.ty.is_void() {
            return Err(CoreError::Unsupported(format!(
                "label {:?} carries a value",
                target.name
            )));
        }
        if let Some(name) = self.scopes.resolve_label(target.id) {
            return Ok(name.to_string());
        }
        let name = match &target.name {
            Some(name) => name.clone(),
            None => self.scopes.uniquify_label("unnamedLabel"),
        };
        self.scopes.bind_label(target.id, name.clone());
        Ok(name)
    }

    pub(super) fn lower_label(&mut self, target: &LabelTarget, cx: Context) -> Result<Syntax, CoreError> {
        if cx == Context::Expression {
            return Err(CoreError::NotImplemented("label where a value is required".into()));
        }
        Ok(Syntax::Stmt(labeled_empty(self.label_name(target)?)))
    }

    pub(super) fn lower_goto(&mut self, target: &LabelTarget, value: Option<&Node>) -> Result<Syntax, CoreError> {
        if value.is_some() {
            return Err(CoreError::Unsupported("jump carrying a value".into()));
        }
        Ok(Syntax::Stmt(Stmt::Goto(self.label_name(target)?)))
    }

    // ------------------------------------------------------------------
    // Loop
    // ------------------------------------------------------------------

    pub(super) fn lower_loop(
        &mut self,
        body: &Node,
        break_label: Option<&LabelTarget>,
        continue_label: Option<&LabelTarget>,
        cx: Context,
    ) -> Result<Syntax, CoreError> {
        if cx == Context::Expression {
            return Err(CoreError::NotImplemented("loop where a value is required".into()));
        }
        let break_name = break_label.map(|l| self.label_name(l)).transpose()?;
        let continue_name = continue_label.map(|l| self.label_name(l)).transpose()?;

        let mut stmts = Vec::new();
        if let Some(name) = continue_name {
            stmts.push(labeled_empty(name));
        }
        stmts.extend(self.lower_body(body, Context::Statement)?);
        let looped = Stmt::Loop { body: stmts };

        Ok(Syntax::Stmt(match break_name {
            Some(name) => Stmt::Block(vec![looped, labeled_empty(name)]),
            None => looped,
        }))
    }

    // ------------------------------------------------------------------
    // Try
    // ------------------------------------------------------------------

    pub(super) fn lower_try(
        &mut self,
        body: &Node,
        handlers: &[CatchHandler],
        finally: Option<&Node>,
        fault: Option<&Node>,
        cx: Context,
    ) -> Result<Syntax, CoreError> {
        if cx == Context::Expression {
            return Err(CoreError::NotImplemented("try where a value is required".into()));
        }
        let body = self.lower_body(body, cx)?;

        let mut catches = Vec::with_capacity(handlers.len() + usize::from(fault.is_some()));
        for handler in handlers {
            catches.push(self.lower_catch(handler, cx)?);
        }
        if let Some(fault) = fault {
            let mut body = self.lower_body(fault, Context::Statement)?;
            body.push(Stmt::Throw(None));
            catches.push(CatchClause {
                ty: None,
                name: None,
                filter: None,
                body,
            });
        }
        let finally = finally.map(|f| self.lower_body(f, Context::Statement)).transpose()?;

        if catches.is_empty() && finally.is_none() {
            return Ok(Syntax::Stmt(Stmt::Block(body)));
        }
        Ok(Syntax::Stmt(Stmt::Try {
            body,
            catches,
            finally,
        }))
    }

    fn lower_catch(&mut self, handler: &CatchHandler, cx: Context) -> Result<CatchClause, CoreError> {
        self.scopes.push();
        let name = match &handler.variable {
            Some(var) => {
                let name = self.uniquify(var.name.as_deref());
                self.scopes.bind_variable(var.id, name.clone())?;
                Some(name)
            }
            None => None,
        };
        let filter = match &handler.filter {
            Some(filter) => {
                let (expr, state) = self.isolated(|s| s.lower_expr(filter))?;
                if !state.is_empty() {
                    return Err(CoreError::NotImplemented(
                        "exception filter that requires statements".into(),
                    ));
                }
                self.absorb_names(&state);
                Some(expr)
            }
            None => None,
        };
        let body = self.lower_body(&handler.body, cx)?;
        self.scopes.pop()?;
        Ok(CatchClause {
            ty: Some(self.use_type(&handler.test)),
            name,
            filter,
            body,
        })
    }

    // ------------------------------------------------------------------
    // Lambda
    // ------------------------------------------------------------------

    pub(super) fn lower_lambda(&mut self, params: &[Variable], body: &Node, return_ty: &Type) -> Result<Expr, CoreError> {
        self.scopes.push();
        self.lifted.push();

        let mut unnamed = 0u32;
        let mut out_params = Vec::with_capacity(params.len());
        for param in params {
            let name = match &param.name {
                Some(name) => name.clone(),
                None => {
                    unnamed += 1;
                    self.uniquify(Some(&format!("unnamed{unnamed}")))
                }
            };
            self.scopes.bind_variable(param.id, name.clone())?;
            let ty = if self.config.explicit_lambda_parameter_types && param.ty.is_nameable() {
                Some(self.use_type(&param.ty))
            } else {
                None
            };
            out_params.push(LambdaParam { name, ty });
        }

        let body_cx = if return_ty.is_void() {
            Context::Statement
        } else {
            Context::ExpressionLambda
        };
        let result = self.lower(body, body_cx)?;

        let state = self.lifted.pop()?;
        for name in &state.names {
            self.scopes.reserve_name(name.clone());
        }
        self.scopes.pop()?;

        let body = if state.is_empty() {
            match result {
                Syntax::Expr(e) if body_cx != Context::Statement || e.is_valid_statement() => {
                    LambdaBody::Expr(Box::new(e))
                }
                Syntax::Stmt(Stmt::Block(stmts)) => LambdaBody::Block(stmts),
                other => LambdaBody::Block(self.statement_of(other, body_cx).into_iter().collect()),
            }
        } else {
            trace!("lambda body lifted statements; using a block body");
            let mut stmts = state.into_statements();
            stmts.extend(self.statement_of(result, body_cx));
            LambdaBody::Block(stmts)
        };
        Ok(Expr::Lambda {
            params: out_params,
            body,
        })
    }
}
