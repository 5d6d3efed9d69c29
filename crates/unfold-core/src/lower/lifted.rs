//! Buffers for statements that must run before the value being produced.

use std::collections::{HashMap, HashSet};

use crate::ast::Stmt;
use crate::error::CoreError;
use crate::ir::VarId;

/// Pending output for one statement-list insertion point.
#[derive(Debug, Default)]
pub(crate) struct LiftedState {
    /// Statements to emit ahead of the current statement, in order.
    pub statements: Vec<Stmt>,
    /// Locals of expression blocks, bound here instead of in a frame.
    pub vars: HashMap<VarId, String>,
    /// Names taken by lifted locals and temporaries.
    pub names: HashSet<String>,
    /// `T x;` declarations for expression-block locals never initialized
    /// by a top-level assignment.
    pub unassigned_decls: Vec<Stmt>,
}

impl LiftedState {
    /// Whether nothing needs to be emitted.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.unassigned_decls.is_empty()
    }

    /// Declarations followed by statements.
    pub fn into_statements(self) -> Vec<Stmt> {
        let mut out = self.unassigned_decls;
        out.extend(self.statements);
        out
    }
}

/// Stack of lifted states; the bottom one belongs to the translation root.
#[derive(Debug)]
pub(crate) struct LiftedStack {
    states: Vec<LiftedState>,
}

impl Default for LiftedStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LiftedStack {
    pub fn new() -> Self {
        Self {
            states: vec![LiftedState::default()],
        }
    }

    pub fn depth(&self) -> usize {
        self.states.len()
    }

    pub fn push(&mut self) {
        self.states.push(LiftedState::default());
    }

    pub fn pop(&mut self) -> Result<LiftedState, CoreError> {
        if self.states.len() <= 1 {
            return Err(CoreError::Invariant("attempted to pop the root lifted state".into()));
        }
        self.states
            .pop()
            .ok_or_else(|| CoreError::Invariant("empty lifted stack".into()))
    }

    /// Remove and return the root state, leaving a fresh one.
    pub fn take_root(&mut self) -> LiftedState {
        std::mem::take(&mut self.states[0])
    }

    pub fn current(&self) -> &LiftedState {
        // The root state is never popped, so the stack is never empty.
        &self.states[self.states.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut LiftedState {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    /// Bind an expression-block local in the current state.
    pub fn bind(&mut self, var: VarId, name: String) -> Result<(), CoreError> {
        let state = self.current_mut();
        if state.vars.contains_key(&var) {
            return Err(CoreError::Unsupported(format!(
                "variable {name} bound twice while lifting an expression block"
            )));
        }
        state.names.insert(name.clone());
        state.vars.insert(var, name);
        Ok(())
    }

    pub fn resolve(&self, var: VarId) -> Option<&str> {
        self.states.iter().rev().find_map(|s| s.vars.get(&var)).map(String::as_str)
    }

    pub fn is_name_used(&self, name: &str) -> bool {
        self.states.iter().any(|s| s.names.contains(name))
    }
}
