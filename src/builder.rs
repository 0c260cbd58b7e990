//! Builder for configured simplification.
//!
//! # Example
//! ```
//! use symb_prob::Simplify;
//!
//! let out = Simplify::new()
//!     .max_iterations(50)
//!     .simplify_str("x + x + exp(0)")
//!     .unwrap();
//! assert_eq!(out, Simplify::new().simplify_str("2*x + 1").unwrap());
//! ```

use crate::simplification::engine::Simplifier;
use crate::simplification::DEFAULT_MAX_ITERATIONS;
use crate::{CasError, Expr, parse};

/// Builder for simplification with explicit limits.
#[derive(Debug, Clone, Copy)]
pub struct Simplify {
    domain_safe: bool,
    max_iterations: usize,
    max_depth: Option<usize>,
    max_nodes: Option<usize>,
}

impl Default for Simplify {
    fn default() -> Self {
        Self::new()
    }
}

impl Simplify {
    pub fn new() -> Self {
        Simplify {
            domain_safe: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_depth: None,
            max_nodes: None,
        }
    }

    /// Skip rules that can enlarge the domain, such as `x/x -> 1`.
    pub fn domain_safe(mut self, safe: bool) -> Self {
        self.domain_safe = safe;
        self
    }

    /// Bound on full rewrite passes.
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Reject inputs nested deeper than `depth`.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Reject inputs with more than `nodes` nodes.
    pub fn max_nodes(mut self, nodes: usize) -> Self {
        self.max_nodes = Some(nodes);
        self
    }

    pub fn simplify(&self, expr: Expr) -> Result<Expr, CasError> {
        if let Some(max_d) = self.max_depth
            && expr.max_depth() > max_d
        {
            return Err(CasError::MaxDepthExceeded);
        }
        if let Some(max_n) = self.max_nodes
            && expr.node_count() > max_n
        {
            return Err(CasError::MaxNodesExceeded);
        }

        let mut engine = Simplifier::new()
            .with_max_iterations(self.max_iterations)
            .with_domain_safe(self.domain_safe);
        if let Some(depth) = self.max_depth {
            engine = engine.with_max_depth(depth);
        }
        Ok(engine.simplify(expr))
    }

    /// Parse and simplify a formula, rendering the result.
    pub fn simplify_str(&self, formula: &str) -> Result<String, CasError> {
        let expr = parse(formula)?;
        Ok(self.simplify(expr)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_builder_basic() {
        let x = Expr::symbol("x");
        let e = Expr::sum(vec![x.clone(), x.clone()]);
        let out = Simplify::new().simplify(e).unwrap();
        assert_eq!(out, Expr::product(vec![Expr::number(2.0), x]));
    }

    #[test]
    fn test_limits_are_enforced() {
        let e = parse("exp(sin(cos(x)))").unwrap();
        assert_eq!(
            Simplify::new().max_depth(2).simplify(e.clone()),
            Err(CasError::MaxDepthExceeded)
        );
        assert_eq!(
            Simplify::new().max_nodes(2).simplify(e),
            Err(CasError::MaxNodesExceeded)
        );
    }

    #[test]
    fn test_domain_safe_keeps_quotient() {
        let out = Simplify::new().domain_safe(true).simplify_str("x/x").unwrap();
        assert_ne!(out, "1");
        assert_eq!(Simplify::new().simplify_str("x/x").unwrap(), "1");
    }

    #[test]
    fn test_parse_errors_propagate() {
        assert!(matches!(
            Simplify::new().simplify_str(""),
            Err(CasError::EmptyFormula)
        ));
    }
}
