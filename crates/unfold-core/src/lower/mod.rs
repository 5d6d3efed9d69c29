//! Lowering of the expression IR into statement-oriented syntax.
//!
//! The IR lets blocks, conditionals and switches appear anywhere a value
//! is expected; the output language only allows most of them as
//! statements. Lowering walks the IR once per call, and whenever a
//! sub-expression needs statements it *lifts* them into the innermost
//! [`LiftedState`]; the enclosing statement-context block splices them in
//! right before the statement that uses the value. Evaluation order is
//! kept by hoisting earlier siblings into temporaries when a later one
//! lifts.
//!
//! All per-call state lives in a [`Session`], threaded through every
//! recursive call together with the current [`Context`].

pub mod analysis;
mod block;
mod control;
mod expr;
mod lifted;
mod scope;

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, debug_span, trace};

use crate::ast::{Expr, Stmt, Syntax};
use crate::config::LowerConfig;
use crate::entity::EntityRef;
use crate::error::CoreError;
use crate::ir::{walk, Node, NodeKind, ObjectId, Type, VarId, Variable};

pub use analysis::{can_reorder, is_constant, SideEffects};

use lifted::{LiftedStack, LiftedState};
use scope::ScopeStack;

/// Which kind of root a translation call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Statement,
    Expression,
}

/// Position of the node being lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Context {
    /// A value is needed.
    Expression,
    /// The value is discarded; statements are allowed.
    Statement,
    /// The value is the result of a lambda; statements are allowed and the
    /// value is returned.
    ExpressionLambda,
}

/// Result of one translation call.
#[derive(Debug, Clone, Serialize)]
pub struct Translation {
    pub syntax: Syntax,
    /// Variables referenced but not bound anywhere in the root.
    pub captured: BTreeSet<Variable>,
    /// Namespaces of every type the output mentions.
    pub namespaces: BTreeSet<String>,
}

impl Translation {
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Translates IR roots into output syntax.
///
/// A translator can be reused for any number of calls; every call starts
/// from fresh naming state, so the same root always yields the same
/// output.
#[derive(Debug, Default)]
pub struct Translator {
    config: LowerConfig,
    replacements: HashMap<ObjectId, Expr>,
}

impl Translator {
    pub fn new(config: LowerConfig) -> Self {
        Self {
            config,
            replacements: HashMap::new(),
        }
    }

    /// Supply the expressions that stand in for host-object constants.
    pub fn with_replacements(mut self, replacements: HashMap<ObjectId, Expr>) -> Self {
        self.replacements = replacements;
        self
    }

    pub fn config(&self) -> &LowerConfig {
        &self.config
    }

    pub fn translate_statement(&mut self, root: &Node) -> Result<Translation, CoreError> {
        self.translate(root, Mode::Statement)
    }

    pub fn translate_expression(&mut self, root: &Node) -> Result<Translation, CoreError> {
        self.translate(root, Mode::Expression)
    }

    pub fn translate(&mut self, root: &Node, mode: Mode) -> Result<Translation, CoreError> {
        let span = debug_span!("translate", ?mode);
        let _guard = span.enter();
        debug!(nodes = walk::count_nodes(root), "translating");

        let mut session = Session::new(&self.config, &self.replacements);
        let cx = match mode {
            Mode::Statement => Context::Statement,
            Mode::Expression => Context::Expression,
        };
        let syntax = session.lower(root, cx)?;
        let syntax = session.finish(syntax, mode)?;

        debug!(
            captured = session.captured.len(),
            namespaces = session.namespaces.len(),
            "translated"
        );
        Ok(Translation {
            syntax,
            captured: session.captured,
            namespaces: session.namespaces,
        })
    }
}

/// Mutable state of one translation call.
pub(crate) struct Session<'a> {
    config: &'a LowerConfig,
    replacements: &'a HashMap<ObjectId, Expr>,
    scopes: ScopeStack,
    lifted: LiftedStack,
    captured: BTreeSet<Variable>,
    namespaces: BTreeSet<String>,
    /// Variables rendered as a fixed expression: inlined closure
    /// parameters and synthetic stand-ins for already-translated values.
    substitutions: HashMap<VarId, Expr>,
    /// Names of translator-introduced temporaries.
    temporaries: HashSet<String>,
    anonymous_names: u32,
    synthetic_vars: u32,
}

impl<'a> Session<'a> {
    fn new(config: &'a LowerConfig, replacements: &'a HashMap<ObjectId, Expr>) -> Self {
        Self {
            config,
            replacements,
            scopes: ScopeStack::new(),
            lifted: LiftedStack::new(),
            captured: BTreeSet::new(),
            namespaces: BTreeSet::new(),
            substitutions: HashMap::new(),
            temporaries: HashSet::new(),
            anonymous_names: 0,
            synthetic_vars: 0,
        }
    }

    /// Check the stacks are back at their roots and place any statements
    /// still lifted at the root.
    fn finish(&mut self, syntax: Syntax, mode: Mode) -> Result<Syntax, CoreError> {
        if self.lifted.depth() != 1 || !self.scopes.is_at_root() {
            return Err(CoreError::Invariant(
                "scope or lifted state left open at the end of translation".into(),
            ));
        }
        let leftover = self.lifted.take_root();
        match mode {
            Mode::Expression if leftover.is_empty() => Ok(syntax),
            Mode::Expression => Err(CoreError::Unsupported(
                "expression root requires statements to be lifted out of it".into(),
            )),
            Mode::Statement if leftover.is_empty() => Ok(Syntax::Stmt(
                self.statement_of(syntax, Context::Statement).unwrap_or(Stmt::Empty),
            )),
            Mode::Statement => {
                let mut body = leftover.into_statements();
                body.extend(self.statement_of(syntax, Context::Statement));
                Ok(Syntax::Stmt(Stmt::Block(body)))
            }
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    pub(crate) fn lower(&mut self, node: &Node, cx: Context) -> Result<Syntax, CoreError> {
        match &node.kind {
            NodeKind::Constant(value) => Ok(Syntax::Expr(self.lower_constant(value)?)),
            NodeKind::Default => self.lower_default(&node.ty, cx),
            NodeKind::Variable(var) => Ok(Syntax::Expr(self.resolve_variable(var)?)),
            NodeKind::Binary { op, left, right } => self.lower_binary(node, *op, left, right, cx),
            NodeKind::Unary { op, operand } => self.lower_unary(&node.ty, *op, operand),
            NodeKind::Rethrow => Ok(Syntax::Stmt(Stmt::Throw(None))),
            NodeKind::Conditional {
                test,
                if_true,
                if_false,
            } => self.lower_conditional(test, if_true, if_false.as_deref(), &node.ty, cx, None),
            NodeKind::Switch {
                value,
                cases,
                default,
                comparison,
            } => self.lower_switch(
                value,
                cases,
                default.as_deref(),
                comparison.as_ref(),
                &node.ty,
                cx,
                None,
            ),
            NodeKind::Block { locals, body } => self.lower_block(locals, body, cx),
            NodeKind::Loop {
                body,
                break_label,
                continue_label,
            } => self.lower_loop(body, break_label.as_ref(), continue_label.as_ref(), cx),
            NodeKind::Label(target) => self.lower_label(target, cx),
            NodeKind::Goto { target, value, .. } => self.lower_goto(target, value.as_deref()),
            NodeKind::Try {
                body,
                handlers,
                finally,
                fault,
            } => self.lower_try(body, handlers, finally.as_deref(), fault.as_deref(), cx),
            NodeKind::Lambda {
                params,
                body,
                return_ty,
            } => Ok(Syntax::Expr(self.lower_lambda(params, body, return_ty)?)),
            NodeKind::Call {
                receiver,
                method,
                args,
            } => Ok(Syntax::Expr(self.lower_call(receiver.as_deref(), method, args)?)),
            NodeKind::New {
                params,
                args,
                members,
            } => Ok(Syntax::Expr(self.lower_new(&node.ty, params, args, members.as_deref())?)),
            NodeKind::Member {
                object,
                declaring_type,
                name,
                non_public,
            } => Ok(Syntax::Expr(self.lower_member(
                &node.ty,
                object.as_deref(),
                declaring_type,
                name,
                *non_public,
            )?)),
            NodeKind::MemberInit { creation, bindings } => {
                Ok(Syntax::Expr(self.lower_member_init(creation, bindings)?))
            }
            NodeKind::ListInit {
                creation,
                enumerable,
                initializers,
            } => Ok(Syntax::Expr(self.lower_list_init(creation, *enumerable, initializers)?)),
            NodeKind::Index { object, args } => Ok(Syntax::Expr(self.lower_index(object, args)?)),
            NodeKind::NewArray { kind, element, items } => {
                Ok(Syntax::Expr(self.lower_new_array(*kind, element, items)?))
            }
            NodeKind::TypeTest {
                kind,
                operand,
                tested,
            } => Ok(Syntax::Expr(self.lower_type_test(*kind, operand, tested)?)),
            NodeKind::Invoke { target, args } => self.lower_invoke(target, args, cx),
        }
    }

    /// Lower a node whose value is needed.
    pub(crate) fn lower_expr(&mut self, node: &Node) -> Result<Expr, CoreError> {
        let syntax = self.lower(node, Context::Expression)?;
        expect_expr(syntax)
    }

    /// Lower a node whose value is assigned to `target` (when it is an
    /// identifier), letting conditionals and switches assign it directly
    /// instead of going through a temporary.
    pub(crate) fn lower_value(&mut self, node: &Node, target: Option<&str>) -> Result<Expr, CoreError> {
        let syntax = match &node.kind {
            NodeKind::Conditional {
                test,
                if_true,
                if_false,
            } => self.lower_conditional(
                test,
                if_true,
                if_false.as_deref(),
                &node.ty,
                Context::Expression,
                target,
            )?,
            NodeKind::Switch {
                value,
                cases,
                default,
                comparison,
            } => self.lower_switch(
                value,
                cases,
                default.as_deref(),
                comparison.as_ref(),
                &node.ty,
                Context::Expression,
                target,
            )?,
            _ => return self.lower_expr(node),
        };
        expect_expr(syntax)
    }

    /// Lower a node into a self-contained statement list, with its own
    /// lifted statements spliced in front.
    pub(crate) fn lower_body(&mut self, node: &Node, cx: Context) -> Result<Vec<Stmt>, CoreError> {
        if let NodeKind::Block { locals, body } = &node.kind {
            if cx != Context::Expression {
                return Ok(match self.lower_block(locals, body, cx)? {
                    Syntax::Stmt(Stmt::Block(stmts)) => stmts,
                    other => self.statement_of(other, cx).into_iter().collect(),
                });
            }
        }
        let (syntax, state) = self.isolated(|s| s.lower(node, cx))?;
        self.absorb_names(&state);
        let mut out = state.into_statements();
        match self.statement_of(syntax, cx) {
            Some(Stmt::Block(inner)) if out.is_empty() => out = inner,
            Some(stmt) => out.push(stmt),
            None => {}
        }
        Ok(out)
    }

    /// Turn a translated fragment into a statement for position `cx`, or
    /// `None` when it can be dropped.
    pub(crate) fn statement_of(&self, syntax: Syntax, cx: Context) -> Option<Stmt> {
        if cx == Context::Statement && self.config.elide_pure_statements && !syntax.may_have_side_effects() {
            return None;
        }
        Some(match syntax {
            Syntax::Stmt(stmt) => stmt,
            Syntax::Expr(e) if cx == Context::ExpressionLambda => Stmt::Return(Some(e)),
            Syntax::Expr(e) if e.is_valid_statement() => Stmt::Expr(e),
            Syntax::Expr(e) => Stmt::assign(Expr::discard(), e),
        })
    }

    // ------------------------------------------------------------------
    // Lifting
    // ------------------------------------------------------------------

    /// Run `f` with a fresh lifted state and hand back what it lifted.
    pub(crate) fn isolated<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CoreError>,
    ) -> Result<(T, LiftedState), CoreError> {
        self.lifted.push();
        let out = f(self)?;
        let state = self.lifted.pop()?;
        Ok((out, state))
    }

    /// Keep the names an isolated state used taken for the rest of the
    /// enclosing statement.
    pub(crate) fn absorb_names(&mut self, state: &LiftedState) {
        self.lifted.current_mut().names.extend(state.names.iter().cloned());
    }

    pub(crate) fn lift(&mut self, stmt: Stmt) {
        self.lifted.current_mut().statements.push(stmt);
    }

    pub(crate) fn lifted_len(&self) -> usize {
        self.lifted.current().statements.len()
    }

    /// Lower one operand of an ordered sequence and append it to `seq`.
    ///
    /// When the operand lifts statements, every earlier operand that could
    /// observe them is hoisted into a `var` temporary placed right before
    /// them, so the output still evaluates operands left to right.
    pub(crate) fn lower_ordered(
        &mut self,
        seq: &mut Vec<Expr>,
        temp_base: &str,
        lower: impl FnOnce(&mut Self) -> Result<Expr, CoreError>,
    ) -> Result<(), CoreError> {
        let mark = self.lifted_len();
        let expr = lower(self)?;
        if self.lifted_len() > mark {
            self.hoist_earlier(seq, mark, temp_base);
        }
        seq.push(expr);
        Ok(())
    }

    /// Hoist the operands in `seq` that must run before the statements
    /// lifted since `mark`. Returns how many declarations were inserted.
    fn hoist_earlier(&mut self, seq: &mut [Expr], mark: usize, temp_base: &str) -> usize {
        let mut hoisted = Vec::new();
        for prev in seq.iter_mut() {
            if self.is_settled(prev) || can_reorder(prev, &self.lifted.current().statements[mark..]) {
                continue;
            }
            let name = self.fresh_temp(temp_base);
            trace!(temp = %name, "hoisting earlier operand ahead of lifted statements");
            let value = std::mem::replace(prev, Expr::Ident(name.clone()));
            hoisted.push(Stmt::VarDecl {
                name,
                ty: None,
                init: Some(value),
            });
        }
        let count = hoisted.len();
        if count > 0 {
            self.lifted.current_mut().statements.splice(mark..mark, hoisted);
        }
        count
    }

    /// Lower `nodes` left to right as one ordered sequence.
    pub(crate) fn lower_operands(&mut self, nodes: &[&Node], temp_base: &str) -> Result<Vec<Expr>, CoreError> {
        let mut seq = Vec::with_capacity(nodes.len());
        for node in nodes {
            self.lower_ordered(&mut seq, temp_base, |s| s.lower_expr(node))?;
        }
        Ok(seq)
    }

    /// A value that no lifted statement can change: a literal, or a
    /// temporary that is only ever written by its declaration.
    pub(crate) fn is_settled(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Literal(_) => true,
            Expr::Ident(name) => self.temporaries.contains(name),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Naming
    // ------------------------------------------------------------------

    fn name_in_use(&self, name: &str) -> bool {
        self.scopes.is_name_used(name)
            || self.lifted.is_name_used(name)
            || self.captured.iter().any(|v| v.name.as_deref() == Some(name))
    }

    /// First free variable name for `name` (`unnamed` when absent).
    ///
    /// Tries the name itself, then numeric suffixes. Unnamed variables
    /// start the suffix search at a counter shared by the whole call.
    pub(crate) fn uniquify(&mut self, name: Option<&str>) -> String {
        let base = name.unwrap_or("unnamed");
        if !self.name_in_use(base) {
            return base.to_string();
        }
        let mut suffix = if name.is_none() {
            self.anonymous_names += 1;
            self.anonymous_names - 1
        } else {
            0
        };
        loop {
            let candidate = format!("{base}{suffix}");
            if !self.name_in_use(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Reserve a fresh temporary name in the current lifted state.
    ///
    /// Temporaries are written once, by their declaration, so a read of
    /// one never needs hoisting.
    pub(crate) fn fresh_temp(&mut self, base: &str) -> String {
        let name = self.uniquify(Some(base));
        self.reserve_temp(&name);
        name
    }

    /// Reserve a fresh name for a lifted local that later statements may
    /// assign again.
    pub(crate) fn fresh_local(&mut self, base: &str) -> String {
        let name = self.uniquify(Some(base));
        self.lifted.current_mut().names.insert(name.clone());
        name
    }

    fn reserve_temp(&mut self, name: &str) {
        self.lifted.current_mut().names.insert(name.to_string());
        self.temporaries.insert(name.to_string());
    }

    /// Render a variable reference, recording it as captured when it is
    /// bound nowhere in the root.
    pub(crate) fn resolve_variable(&mut self, var: &Variable) -> Result<Expr, CoreError> {
        if let Some(expr) = self.substitutions.get(&var.id) {
            return Ok(expr.clone());
        }
        if let Some(name) = self.bound_name_of(var.id) {
            return Ok(Expr::Ident(name.to_string()));
        }
        let Some(name) = &var.name else {
            return Err(CoreError::Unsupported(format!(
                "captured variable {:?} has no name",
                var.id
            )));
        };
        if self.captured.insert(var.clone()) {
            trace!(name = %name, "captured variable");
        }
        Ok(Expr::Ident(name.clone()))
    }

    fn bound_name_of(&self, var: VarId) -> Option<&str> {
        self.scopes.resolve_variable(var).or_else(|| self.lifted.resolve(var))
    }

    /// Name of a variable declared by the root.
    pub(crate) fn bound_name(&self, var: &Variable) -> Result<String, CoreError> {
        self.bound_name_of(var.id)
            .map(str::to_string)
            .ok_or_else(|| CoreError::Invariant(format!("local {:?} has no bound name", var.name)))
    }

    /// Bind a synthetic variable that renders as `value`.
    ///
    /// Synthetic ids count down from the top of the id space, away from
    /// the ids the IR builder hands out.
    pub(crate) fn bind_synthetic(&mut self, ty: Type, value: Expr) -> Variable {
        self.synthetic_vars += 1;
        let var = Variable {
            id: VarId::new(u32::MAX - self.synthetic_vars),
            name: None,
            ty,
        };
        self.substitutions.insert(var.id, value);
        var
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Record the namespaces of a type placed into the output.
    pub(crate) fn use_type(&mut self, ty: &Type) -> Type {
        ty.collect_namespaces(&mut self.namespaces);
        ty.clone()
    }

    /// A type spelled in a local declaration.
    pub(crate) fn declared_type(&mut self, ty: &Type) -> Result<Type, CoreError> {
        if !ty.is_nameable() {
            return Err(CoreError::Unsupported(format!(
                "cannot declare a local of unnameable type {ty:?}"
            )));
        }
        Ok(self.use_type(ty))
    }
}

pub(crate) fn expect_expr(syntax: Syntax) -> Result<Expr, CoreError> {
    match syntax {
        Syntax::Expr(e) => Ok(e),
        Syntax::Stmt(stmt) => Err(CoreError::Unsupported(format!(
            "statement produced where a value is required: {stmt:?}"
        ))),
    }
}

/// Split a two-element operand list.
pub(crate) fn two(mut seq: Vec<Expr>) -> Result<(Expr, Expr), CoreError> {
    match (seq.pop(), seq.pop()) {
        (Some(right), Some(left)) if seq.is_empty() => Ok((left, right)),
        _ => Err(CoreError::Invariant("expected exactly two operands".into())),
    }
}
