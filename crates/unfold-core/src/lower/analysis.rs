//! Conservative classifiers over translated fragments.

use crate::ast::{Expr, Stmt, Syntax};

/// Side-effect classification of an output fragment.
///
/// Only identifiers, literals and statements built purely from them are
/// known to be free of side effects; everything else is assumed to have
/// some.
pub trait SideEffects {
    fn may_have_side_effects(&self) -> bool;
}

impl SideEffects for Expr {
    fn may_have_side_effects(&self) -> bool {
        !matches!(self, Expr::Ident(_) | Expr::Literal(_))
    }
}

impl SideEffects for Stmt {
    fn may_have_side_effects(&self) -> bool {
        match self {
            Stmt::Expr(e) => e.may_have_side_effects(),
            Stmt::Empty => false,
            Stmt::Block(body) => body.may_have_side_effects(),
            _ => true,
        }
    }
}

impl SideEffects for [Stmt] {
    fn may_have_side_effects(&self) -> bool {
        self.iter().any(Stmt::may_have_side_effects)
    }
}

impl SideEffects for Syntax {
    fn may_have_side_effects(&self) -> bool {
        match self {
            Syntax::Expr(e) => e.may_have_side_effects(),
            Syntax::Stmt(s) => s.may_have_side_effects(),
        }
    }
}

/// Whether evaluating `first` after `second` is indistinguishable from
/// the original order.
pub fn can_reorder<T: SideEffects + ?Sized>(first: &Expr, second: &T) -> bool {
    first.is_literal() || (!first.may_have_side_effects() && !second.may_have_side_effects())
}

/// Whether the expression is a compile-time constant usable as a `case`
/// label.
pub fn is_constant(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) => true,
        Expr::Binary { lhs, rhs, .. } => is_constant(lhs) && is_constant(rhs),
        Expr::Unary { expr, .. } | Expr::Postfix { expr, .. } => is_constant(expr),
        _ => false,
    }
}
