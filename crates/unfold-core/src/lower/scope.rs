//! Lexical environments binding IR variables and labels to output names.

use std::collections::{HashMap, HashSet};

use crate::error::CoreError;
use crate::ir::{LabelId, VarId};

/// One lexical frame. Holds only what was bound in this frame; lookups
/// walk outwards through the parents.
#[derive(Debug, Default)]
struct Frame {
    vars: HashMap<VarId, String>,
    var_names: HashSet<String>,
    /// Names declared by frames already closed inside this one. A later
    /// declaration in this frame must avoid them; a sibling frame may not.
    nested_names: HashSet<String>,
    labels: HashMap<LabelId, String>,
    label_names: HashSet<String>,
}

/// Stack of scope frames. The root frame lives for the whole translation.
#[derive(Debug)]
pub(crate) struct ScopeStack {
    frames: Vec<Frame>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pop the innermost frame.
    ///
    /// Bindings go away with the frame. Its names, and those of frames
    /// closed inside it, are remembered by the parent: the target language
    /// forbids an enclosing scope from declaring a name already declared
    /// in a nested one.
    pub fn pop(&mut self) -> Result<(), CoreError> {
        if self.frames.len() <= 1 {
            return Err(CoreError::Invariant("attempted to pop the root scope frame".into()));
        }
        let popped = self.frames.pop().ok_or_else(|| CoreError::Invariant("empty scope stack".into()))?;
        let parent = self.innermost_mut();
        parent.nested_names.extend(popped.var_names);
        parent.nested_names.extend(popped.nested_names);
        parent.label_names.extend(popped.label_names);
        Ok(())
    }

    fn innermost_mut(&mut self) -> &mut Frame {
        // The root frame is never popped, so the stack is never empty.
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Bind `var` to `name` in the innermost frame.
    pub fn bind_variable(&mut self, var: VarId, name: String) -> Result<(), CoreError> {
        let frame = self.innermost_mut();
        if frame.vars.contains_key(&var) {
            return Err(CoreError::Invariant(format!(
                "variable {name} declared twice in the same scope"
            )));
        }
        frame.var_names.insert(name.clone());
        frame.vars.insert(var, name);
        Ok(())
    }

    /// Reserve a name in the innermost frame without binding a variable.
    pub fn reserve_name(&mut self, name: String) {
        self.innermost_mut().var_names.insert(name);
    }

    pub fn resolve_variable(&self, var: VarId) -> Option<&str> {
        self.frames.iter().rev().find_map(|f| f.vars.get(&var)).map(String::as_str)
    }

    /// Whether declaring `name` in the innermost frame would clash with a
    /// visible declaration or with one in a closed nested frame.
    pub fn is_name_used(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.var_names.contains(name))
            || self.frames.last().is_some_and(|f| f.nested_names.contains(name))
    }

    /// Bind a label in the innermost frame. Returns `false` when the label
    /// was already bound there.
    pub fn bind_label(&mut self, label: LabelId, name: String) -> bool {
        let frame = self.innermost_mut();
        if frame.labels.contains_key(&label) {
            return false;
        }
        frame.label_names.insert(name.clone());
        frame.labels.insert(label, name);
        true
    }

    pub fn resolve_label(&self, label: LabelId) -> Option<&str> {
        self.frames.iter().rev().find_map(|f| f.labels.get(&label)).map(String::as_str)
    }

    /// First free label name: `base`, then `base0`, `base1`, ...
    pub fn uniquify_label(&self, base: &str) -> String {
        let used = |name: &str| self.frames.iter().any(|f| f.label_names.contains(name));
        if !used(base) {
            return base.to_string();
        }
        (0u32..)
            .map(|i| format!("{base}{i}"))
            .find(|candidate| !used(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Whether only the root frame remains and it binds no variables.
    pub fn is_at_root(&self) -> bool {
        self.frames.len() == 1 && self.frames[0].vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn inner_bindings_shadow_and_disappear_on_pop() {
        let mut scopes = ScopeStack::new();
        let x = VarId::new(0);
        let y = VarId::new(1);
        scopes.bind_variable(x, "x".into()).unwrap();
        scopes.push();
        scopes.bind_variable(y, "y".into()).unwrap();
        assert_eq!(scopes.resolve_variable(x), Some("x"));
        assert_eq!(scopes.resolve_variable(y), Some("y"));
        scopes.pop().unwrap();
        assert_eq!(scopes.resolve_variable(y), None);
        // The name stays taken in the enclosing frame.
        assert!(scopes.is_name_used("y"));
    }

    #[test]
    fn sibling_frames_may_reuse_closed_names() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.push();
        scopes.bind_variable(VarId::new(0), "y".into()).unwrap();
        scopes.pop().unwrap();
        scopes.pop().unwrap();
        // Grandchild names still block the enclosing frame.
        assert!(scopes.is_name_used("y"));
        scopes.push();
        assert!(!scopes.is_name_used("y"));
        scopes.bind_variable(VarId::new(1), "y".into()).unwrap();
        assert_eq!(scopes.resolve_variable(VarId::new(1)), Some("y"));
    }

    #[test]
    fn popping_root_is_an_invariant_violation() {
        let mut scopes = ScopeStack::new();
        match scopes.pop() {
            Err(CoreError::Invariant(_)) => {}
            other => panic!("Expected Invariant, got: {other:?}"),
        }
    }

    #[test]
    fn duplicate_binding_in_one_frame_fails() {
        let mut scopes = ScopeStack::new();
        let x = VarId::new(0);
        scopes.bind_variable(x, "x".into()).unwrap();
        assert!(matches!(
            scopes.bind_variable(x, "x0".into()),
            Err(CoreError::Invariant(_))
        ));
    }

    #[test]
    fn label_names_are_uniquified() {
        let mut scopes = ScopeStack::new();
        assert_eq!(scopes.uniquify_label("unnamedLabel"), "unnamedLabel");
        scopes.bind_label(LabelId::new(0), "unnamedLabel".into());
        assert_eq!(scopes.uniquify_label("unnamedLabel"), "unnamedLabel0");
        scopes.push();
        scopes.bind_label(LabelId::new(1), "unnamedLabel0".into());
        assert_eq!(scopes.uniquify_label("unnamedLabel"), "unnamedLabel1");
        assert_eq!(scopes.resolve_label(LabelId::new(0)), Some("unnamedLabel"));
    }
}
