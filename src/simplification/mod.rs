//! Simplification framework - reduces expressions to a canonical form
//!
//! The engine applies rule packs bottom-up until a fixed point:
//! numeric folding, expansion of products and small integer powers, collection of like
//! terms and factors, and exp/ln cancellation. Two expressions that are equal after
//! expansion usually simplify to structurally equal trees.

pub(crate) mod engine;
pub(crate) mod helpers;
pub(crate) mod rules;

pub use engine::DEFAULT_MAX_ITERATIONS;

use crate::Expr;

/// Simplify an expression with default settings.
pub fn simplify(expr: Expr) -> Expr {
    engine::Simplifier::new().simplify(expr)
}

/// Simplify without rules that may enlarge the domain (`x * x^-1 -> 1`).
pub fn simplify_domain_safe(expr: Expr) -> Expr {
    engine::Simplifier::new()
        .with_domain_safe(true)
        .simplify(expr)
}

impl Expr {
    /// Simplified copy of this expression.
    ///
    /// ```
    /// use symb_prob::Expr;
    ///
    /// let x = Expr::symbol("x");
    /// let e = x.clone() + x.clone() * 2.0 - x.clone();
    /// assert_eq!(e.simplified(), x * 2.0);
    /// ```
    pub fn simplified(&self) -> Expr {
        simplify(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn assert_same(a: &str, b: &str) {
        let ea = parse(a).map(simplify);
        let eb = parse(b).map(simplify);
        assert!(ea.is_ok() && eb.is_ok());
        assert_eq!(ea.ok(), eb.ok(), "{a} vs {b}");
    }

    #[test]
    fn test_expansion_normalizes() {
        assert_same("(x + 1)^2", "x^2 + 2*x + 1");
        assert_same("x*(1 - x)", "x - x^2");
        assert_same("2*(x + y) - y", "2*x + y");
    }

    #[test]
    fn test_exp_log_cancellation() {
        assert_same("exp(ln(x))", "x");
        assert_same("ln(exp(x + 1))", "1 + x");
        assert_same("exp(x)*exp(-x)", "1");
        assert_same("exp(-x)^2", "exp(-2*x)");
    }

    #[test]
    fn test_min_of_exponentials() {
        // 1 - (1 - (1 - e^-x))(1 - (1 - e^-x)) = 1 - e^-2x
        assert_same(
            "1 - (1 - (1 - exp(-x)))*(1 - (1 - exp(-x)))",
            "1 - exp(-2*x)",
        );
    }

    #[test]
    fn test_cancellation_and_folding() {
        assert_same("x/x", "1");
        assert_same("x^2/x", "x");
        assert_same("exp(0) + ln(1)", "1");
        assert_same("sqrt(x)^2", "x");
    }

    #[test]
    fn test_domain_safe_keeps_quotient() {
        let x = Expr::symbol("x");
        let e = Expr::product(vec![x.clone(), x.clone().recip()]);
        assert_ne!(simplify_domain_safe(e.clone()), Expr::one());
        assert_eq!(simplify(e), Expr::one());
    }
}
