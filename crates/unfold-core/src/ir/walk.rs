//! Read-only traversals over IR trees.

use super::node::{MemberBinding, Node, NodeKind, VarId};

/// Direct children of `node`, in evaluation order.
pub fn children(node: &Node) -> Vec<&Node> {
    let mut out = Vec::new();
    match &node.kind {
        NodeKind::Constant(_)
        | NodeKind::Default
        | NodeKind::Variable(_)
        | NodeKind::Rethrow
        | NodeKind::Label(_) => {}
        NodeKind::Binary { left, right, .. } => {
            out.push(left.as_ref());
            out.push(right.as_ref());
        }
        NodeKind::Unary { operand, .. } => out.push(operand),
        NodeKind::TypeTest { operand, .. } => out.push(operand),
        NodeKind::Conditional {
            test,
            if_true,
            if_false,
        } => {
            out.push(test.as_ref());
            out.push(if_true.as_ref());
            out.extend(if_false.as_deref());
        }
        NodeKind::Switch {
            value, cases, default, ..
        } => {
            out.push(value.as_ref());
            for case in cases {
                out.extend(case.tests.iter());
                out.push(&case.body);
            }
            out.extend(default.as_deref());
        }
        NodeKind::Block { body, .. } => out.extend(body.iter()),
        NodeKind::Loop { body, .. } => out.push(body),
        NodeKind::Goto { value, .. } => out.extend(value.as_deref()),
        NodeKind::Try {
            body,
            handlers,
            finally,
            fault,
        } => {
            out.push(body.as_ref());
            for handler in handlers {
                out.extend(handler.filter.as_ref());
                out.push(&handler.body);
            }
            out.extend(finally.as_deref());
            out.extend(fault.as_deref());
        }
        NodeKind::Lambda { body, .. } => out.push(body),
        NodeKind::Call { receiver, args, .. } => {
            out.extend(receiver.as_deref());
            out.extend(args.iter());
        }
        NodeKind::New { args, .. } => out.extend(args.iter()),
        NodeKind::Member { object, .. } => out.extend(object.as_deref()),
        NodeKind::MemberInit { creation, bindings } => {
            out.push(creation.as_ref());
            for binding in bindings {
                binding_children(binding, &mut out);
            }
        }
        NodeKind::ListInit {
            creation,
            initializers,
            ..
        } => {
            out.push(creation.as_ref());
            for init in initializers {
                out.extend(init.args.iter());
            }
        }
        NodeKind::Index { object, args } => {
            out.push(object.as_ref());
            out.extend(args.iter());
        }
        NodeKind::NewArray { items, .. } => out.extend(items.iter()),
        NodeKind::Invoke { target, args } => {
            out.push(target.as_ref());
            out.extend(args.iter());
        }
    }
    out
}

fn binding_children<'a>(binding: &'a MemberBinding, out: &mut Vec<&'a Node>) {
    match binding {
        MemberBinding::Assign { value, .. } => out.push(value),
        MemberBinding::Member { bindings, .. } => {
            for nested in bindings {
                binding_children(nested, out);
            }
        }
        MemberBinding::List { initializers, .. } => {
            for init in initializers {
                out.extend(init.args.iter());
            }
        }
    }
}

/// Pre-order search for a node matching `pred`.
pub fn any(node: &Node, pred: &mut impl FnMut(&Node) -> bool) -> bool {
    if pred(node) {
        return true;
    }
    children(node).into_iter().any(|child| any(child, pred))
}

/// Whether `node` reads or writes variable `var` anywhere.
pub fn references(node: &Node, var: VarId) -> bool {
    any(node, &mut |n| matches!(&n.kind, NodeKind::Variable(v) if v.id == var))
}

/// Whether `node` contains an assignment (plain, compound or increment)
/// whose target is variable `var`.
pub fn assigns(node: &Node, var: VarId) -> bool {
    any(node, &mut |n| match &n.kind {
        NodeKind::Binary { op, left, .. } if op.is_assignment() => is_var(left, var),
        NodeKind::Unary { op, operand } if op.is_assignment() => is_var(operand, var),
        _ => false,
    })
}

/// Total number of nodes in the tree.
pub fn count_nodes(node: &Node) -> usize {
    1 + children(node).into_iter().map(count_nodes).sum::<usize>()
}

fn is_var(node: &Node, var: VarId) -> bool {
    node.as_variable().is_some_and(|v| v.id == var)
}
