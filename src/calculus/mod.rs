//! Symbolic calculus over [`Expr`]: antiderivatives, definite integrals, limits and
//! equation solving.
//!
//! Distribution parameters are assumed positive unless an [`Assumptions`] says otherwise.

pub mod integrate;
pub mod limit;
pub(crate) mod poly;
pub mod solve;

pub use integrate::{antiderivative, integrate, integrate_with, interval_assumptions};
pub use limit::{Side, limit, limit_with};
pub use solve::solve;

use std::collections::{BTreeSet, HashMap};

use crate::core::Assumptions;
use crate::{Expr, ExprKind};

/// Whether any numeric literal in the tree is NaN or infinite.
pub(crate) fn has_non_finite(expr: &Expr) -> bool {
    match expr.kind() {
        ExprKind::Number(n) => !n.is_finite(),
        ExprKind::Symbol(_) => false,
        _ => expr.children().iter().any(|c| has_non_finite(c)),
    }
}

/// Sample values for free parameters when a property has to be checked numerically.
/// Values are positive and irregular so accidental cancellations are unlikely.
pub(crate) fn sample_bindings<'a>(
    symbols: &'a BTreeSet<String>,
    skip: &str,
) -> HashMap<&'a str, f64> {
    symbols
        .iter()
        .filter(|s| s.as_str() != skip)
        .enumerate()
        .map(|(i, s)| (s.as_str(), 1.13 + 0.41 * i as f64))
        .collect()
}

/// Assumptions used throughout the distribution layer.
pub(crate) fn default_assumptions() -> Assumptions {
    Assumptions::positive_parameters()
}
