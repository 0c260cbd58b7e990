//! Function registry
//!
//! Single source of truth for the functions the parser accepts, how they evaluate
//! numerically and how they differentiate.

use std::sync::Arc;

use crate::{Expr, ExprKind};

pub(crate) mod definitions;
pub(crate) mod registry;

/// Function call from an `Arc` argument without a deep clone
pub(crate) fn func_arc(name: &str, arg: Arc<Expr>) -> Expr {
    Expr::func_from_arcs(&crate::core::InternedSymbol::new(name), vec![arg])
}

/// Multiply, short-circuiting 0 and 1
pub(crate) fn mul_opt(a: Expr, b: Expr) -> Expr {
    match (&a.kind, &b.kind) {
        (ExprKind::Number(x), _) if *x == 0.0 => Expr::zero(),
        (_, ExprKind::Number(x)) if *x == 0.0 => Expr::zero(),
        (ExprKind::Number(x), _) if *x == 1.0 => b,
        (_, ExprKind::Number(x)) if *x == 1.0 => a,
        _ => Expr::product(vec![a, b]),
    }
}

pub(crate) fn neg(e: Expr) -> Expr {
    e.negate()
}

/// Whether `name` is a known function (aliases included).
pub fn is_known_function(name: &str) -> bool {
    registry::Registry::get(registry::Registry::canonical(name)).is_some()
}
