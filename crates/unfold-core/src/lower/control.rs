//! Conditionals and switches.
//!
//! In statement position both become their statement forms. Where a value
//! is needed, the expression forms are tried first; if an arm needs
//! statements, lambda bodies get a statement form whose arms return, and
//! anything else assigns a temporary (or the enclosing assignment's
//! target) in each arm and yields it.

use tracing::trace;

use crate::ast::{Expr, Pattern, Stmt, SwitchArm, SwitchLabel, SwitchSection, Syntax};
use crate::error::CoreError;
use crate::ir::{BinaryOp, MethodRef, Node, NodeKind, SwitchCase, Type};

use super::analysis::{is_constant, SideEffects};
use super::lifted::LiftedState;
use super::{Context, Session};

/// An arm translated as a value, with what it lifted.
type ValueArm = (Expr, LiftedState);

/// Whether control can fall off the end of a section body.
fn falls_through(body: &[Stmt]) -> bool {
    !matches!(
        body.last(),
        Some(Stmt::Return(_) | Stmt::Throw(_) | Stmt::Goto(_) | Stmt::Break)
    )
}

fn end_section(mut body: Vec<Stmt>) -> Vec<Stmt> {
    if falls_through(&body) {
        body.push(Stmt::Break);
    }
    body
}

impl Session<'_> {
    // ------------------------------------------------------------------
    // Conditional
    // ------------------------------------------------------------------

    pub(super) fn lower_conditional(
        &mut self,
        test: &Node,
        if_true: &Node,
        if_false: Option<&Node>,
        ty: &Type,
        cx: Context,
        target: Option<&str>,
    ) -> Result<Syntax, CoreError> {
        let cond = self.lower_expr(test)?;
        let if_false = if_false.filter(|n| !n.is_void_default());

        if cx == Context::Statement {
            let then_body = self.lower_body(if_true, Context::Statement)?;
            let else_body = match if_false {
                Some(arm) => self.lower_body(arm, Context::Statement)?,
                None => Vec::new(),
            };
            return Ok(Syntax::Stmt(Stmt::If {
                cond,
                then_body,
                else_body,
            }));
        }

        let Some(if_false) = if_false else {
            return Err(CoreError::Unsupported(
                "conditional without an else arm where a value is required".into(),
            ));
        };

        let (target_name, mut arms) =
            self.lower_value_arms("liftedConditional", target, &[if_true, if_false])?;
        let (Some(else_arm), Some(then_arm)) = (arms.pop(), arms.pop()) else {
            return Err(CoreError::Invariant("conditional arms went missing".into()));
        };

        if then_arm.1.is_empty() && else_arm.1.is_empty() {
            self.absorb_names(&then_arm.1);
            self.absorb_names(&else_arm.1);
            return Ok(Syntax::Expr(Expr::Ternary {
                cond: Box::new(cond),
                then_val: Box::new(then_arm.0),
                else_val: Box::new(else_arm.0),
            }));
        }

        if cx == Context::ExpressionLambda {
            trace!("conditional arm lifts; returning from each branch");
            let then_body = self.lower_body(if_true, Context::ExpressionLambda)?;
            let else_body = self.lower_body(if_false, Context::ExpressionLambda)?;
            return Ok(Syntax::Stmt(Stmt::If {
                cond,
                then_body,
                else_body,
            }));
        }

        trace!(target = %target_name, "conditional arm lifts; assigning in each branch");
        if target.is_none() {
            self.declare_target(&target_name, ty)?;
        }
        let then_body = self.assigning_arm(then_arm, &target_name);
        let else_body = self.assigning_arm(else_arm, &target_name);
        self.lift(Stmt::If {
            cond,
            then_body,
            else_body,
        });
        Ok(Syntax::Expr(Expr::Ident(target_name)))
    }

    /// Translate each arm as a value in its own lifted state.
    ///
    /// Arms receive the name they would assign if the construct ends up
    /// lowered to statements, so a nested conditional can assign it
    /// directly. A fresh name stays reserved only while the arms are
    /// translated.
    fn lower_value_arms(
        &mut self,
        temp_base: &str,
        target: Option<&str>,
        arms: &[&Node],
    ) -> Result<(String, Vec<ValueArm>), CoreError> {
        self.lifted.push();
        let name = match target {
            Some(name) => name.to_string(),
            None => {
                let name = self.uniquify(Some(temp_base));
                self.lifted.current_mut().names.insert(name.clone());
                name
            }
        };
        let mut out = Vec::with_capacity(arms.len());
        for arm in arms {
            out.push(self.isolated(|s| s.lower_value(arm, Some(&name)))?);
        }
        self.lifted.pop()?;
        Ok((name, out))
    }

    fn declare_target(&mut self, name: &str, ty: &Type) -> Result<(), CoreError> {
        let ty = self.declared_type(ty)?;
        self.reserve_temp(name);
        self.lift(Stmt::VarDecl {
            name: name.to_string(),
            ty: Some(ty),
            init: None,
        });
        Ok(())
    }

    /// Arm body that leaves its value in `target`.
    fn assigning_arm(&mut self, (value, state): ValueArm, target: &str) -> Vec<Stmt> {
        self.absorb_names(&state);
        let mut body = state.into_statements();
        // The arm already lowered into the target.
        if value.as_ident() != Some(target) {
            body.push(Stmt::assign(Expr::ident(target), value));
        }
        body
    }

    // ------------------------------------------------------------------
    // Switch
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub(super) fn lower_switch(
        &mut self,
        value: &Node,
        cases: &[SwitchCase],
        default: Option<&Node>,
        comparison: Option<&MethodRef>,
        ty: &Type,
        cx: Context,
        target: Option<&str>,
    ) -> Result<Syntax, CoreError> {
        if let Some(method) = comparison {
            return Err(CoreError::NotImplemented(format!(
                "switch with custom comparison method {}",
                method.name
            )));
        }
        let default = default.filter(|d| !(cx == Context::Statement && d.is_void_default()));
        // A case without test values can never match.
        let cases: Vec<&SwitchCase> = cases.iter().filter(|c| !c.tests.is_empty()).collect();

        let subject = self.lower_expr(value)?;

        let (labels, label_state) = self.isolated(|s| {
            let mut labels = Vec::with_capacity(cases.len());
            for case in &cases {
                let mut tests = Vec::with_capacity(case.tests.len());
                for test in &case.tests {
                    tests.push(s.lower_expr(test)?);
                }
                labels.push(tests);
            }
            Ok(labels)
        })?;
        let constant_labels = label_state.is_empty() && labels.iter().flatten().all(is_constant);
        if !constant_labels {
            return self.lower_switch_as_conditionals(subject, &value.ty, &cases, default, ty, cx, target);
        }

        if cx == Context::Statement {
            let sections = self.statement_sections(&cases, labels, default, Context::Statement)?;
            return Ok(Syntax::Stmt(Stmt::Switch {
                value: subject,
                sections,
            }));
        }

        // Value forms: case bodies first, then the default.
        let mut arm_nodes: Vec<&Node> = cases.iter().map(|c| &c.body).collect();
        arm_nodes.extend(default);
        let (name, mut arms) = self.lower_value_arms("liftedSwitch", target, &arm_nodes)?;
        let default_arm = if default.is_some() { arms.pop() } else { None };

        let lifted_any = arms.iter().chain(default_arm.as_ref()).any(|(_, st)| !st.is_empty());
        if !lifted_any {
            let Some((default_value, default_state)) = default_arm else {
                return Err(CoreError::Unsupported(
                    "switch without a default arm where a value is required".into(),
                ));
            };
            let mut out = Vec::new();
            for ((value, state), tests) in arms.into_iter().zip(labels) {
                self.absorb_names(&state);
                for test in tests {
                    out.push(SwitchArm {
                        pattern: Pattern::Const(test),
                        value: value.clone(),
                    });
                }
            }
            self.absorb_names(&default_state);
            out.push(SwitchArm {
                pattern: Pattern::Discard,
                value: default_value,
            });
            return Ok(Syntax::Expr(Expr::Switch {
                value: Box::new(subject),
                arms: out,
            }));
        }

        if cx == Context::ExpressionLambda {
            trace!("switch arm lifts; returning from each section");
            let sections = self.statement_sections(&cases, labels, default, Context::ExpressionLambda)?;
            return Ok(Syntax::Stmt(Stmt::Switch {
                value: subject,
                sections,
            }));
        }

        trace!(target = %name, "switch arm lifts; assigning in each section");
        if target.is_none() {
            self.declare_target(&name, ty)?;
        }
        let mut sections = Vec::with_capacity(arms.len() + 1);
        for (arm, tests) in arms.into_iter().zip(labels) {
            sections.push(SwitchSection {
                labels: tests.into_iter().map(SwitchLabel::Case).collect(),
                body: self.assigning_section(arm, &name),
            });
        }
        if let Some(arm) = default_arm {
            sections.push(SwitchSection {
                labels: vec![SwitchLabel::Default],
                body: self.assigning_section(arm, &name),
            });
        }
        self.lift(Stmt::Switch {
            value: subject,
            sections,
        });
        Ok(Syntax::Expr(Expr::Ident(name)))
    }

    fn statement_sections(
        &mut self,
        cases: &[&SwitchCase],
        labels: Vec<Vec<Expr>>,
        default: Option<&Node>,
        cx: Context,
    ) -> Result<Vec<SwitchSection>, CoreError> {
        let mut sections = Vec::with_capacity(cases.len() + 1);
        for (case, tests) in cases.iter().zip(labels) {
            sections.push(SwitchSection {
                labels: tests.into_iter().map(SwitchLabel::Case).collect(),
                body: end_section(self.lower_body(&case.body, cx)?),
            });
        }
        if let Some(default) = default {
            sections.push(SwitchSection {
                labels: vec![SwitchLabel::Default],
                body: end_section(self.lower_body(default, cx)?),
            });
        }
        Ok(sections)
    }

    /// Section body assigning `target`; sections that lifted get a block
    /// of their own.
    fn assigning_section(&mut self, arm: ValueArm, target: &str) -> Vec<Stmt> {
        let lifted = !arm.1.is_empty();
        let body = self.assigning_arm(arm, target);
        if lifted {
            vec![Stmt::Block(body), Stmt::Break]
        } else {
            end_section(body)
        }
    }

    /// Rewrite a switch whose labels are not all constants into nested
    /// conditionals over `subject == label` and lower those instead.
    #[allow(clippy::too_many_arguments)]
    fn lower_switch_as_conditionals(
        &mut self,
        subject: Expr,
        subject_ty: &Type,
        cases: &[&SwitchCase],
        default: Option<&Node>,
        ty: &Type,
        cx: Context,
        target: Option<&str>,
    ) -> Result<Syntax, CoreError> {
        trace!("switch labels are not constant; rewriting as conditionals");
        let subject = if subject.may_have_side_effects() {
            let name = self.fresh_temp("liftedSwitchValue");
            self.lift(Stmt::VarDecl {
                name: name.clone(),
                ty: None,
                init: Some(subject),
            });
            Expr::Ident(name)
        } else {
            subject
        };
        let subject = self.bind_synthetic(subject_ty.clone(), subject);
        let subject_node = Node::var(&subject);

        let mut folded: Option<Node> = default.cloned();
        for case in cases.iter().rev() {
            let test = case
                .tests
                .iter()
                .map(|label| Node::equal(subject_node.clone(), label.clone()))
                .reduce(|acc, next| Node::binary(BinaryOp::OrElse, acc, next, Type::Bool));
            let Some(test) = test else {
                continue;
            };
            folded = Some(Node::new(
                NodeKind::Conditional {
                    test: Box::new(test),
                    if_true: Box::new(case.body.clone()),
                    if_false: folded.map(Box::new),
                },
                ty.clone(),
            ));
        }

        let result = match &folded {
            Some(Node {
                kind:
                    NodeKind::Conditional {
                        test,
                        if_true,
                        if_false,
                    },
                ..
            }) => self.lower_conditional(test, if_true, if_false.as_deref(), ty, cx, target),
            Some(only_default) if cx == Context::Statement => self.lower(only_default, cx),
            Some(only_default) => self.lower_value(only_default, target).map(Syntax::Expr),
            None if cx == Context::Statement => Ok(Syntax::Stmt(Stmt::Empty)),
            None => Err(CoreError::Unsupported(
                "switch without cases or default where a value is required".into(),
            )),
        };
        self.substitutions.remove(&subject.id);
        result
    }
}
