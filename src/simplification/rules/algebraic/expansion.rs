use std::sync::Arc;

use crate::simplification::helpers::{EXPANSION_LIMIT, expand_factors};
use crate::simplification::rules::ExprKind;
use crate::traits::as_integer;
use crate::{Expr, ExprKind as AstKind};

rule!(
    DistributeNumericRule,
    "distribute_numeric",
    80,
    &[ExprKind::Product],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Product(factors) = expr.kind() else {
            return None;
        };
        if factors.len() != 2 {
            return None;
        }
        let c = factors[0].as_number()?;
        let AstKind::Sum(terms) = factors[1].kind() else {
            return None;
        };
        Some(Expr::sum(
            terms
                .iter()
                .map(|t| Expr::product_from_arcs(vec![Arc::new(Expr::number(c)), Arc::clone(t)]))
                .collect(),
        ))
    }
);

rule!(
    ExpandProductRule,
    "expand_product",
    70,
    &[ExprKind::Product],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Product(factors) = expr.kind() else {
            return None;
        };
        expand_factors(factors)
    }
);

rule!(
    ExpandPowerRule,
    "expand_power",
    70,
    &[ExprKind::Pow],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Pow(base, exponent) = expr.kind() else {
            return None;
        };
        let AstKind::Sum(terms) = base.kind() else {
            return None;
        };
        let n = exponent.as_number().and_then(as_integer)?;
        if !(2..=4).contains(&n) {
            return None;
        }
        let size = terms.len().checked_pow(n as u32)?;
        if size > EXPANSION_LIMIT {
            return None;
        }
        let repeated: Vec<Arc<Expr>> = (0..n).map(|_| Arc::clone(base)).collect();
        expand_factors(&repeated)
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplification::rules::{Rule, RuleContext};

    #[test]
    fn test_distribute() {
        let ctx = RuleContext::default();
        let x = Expr::symbol("x");
        let e = Expr::product(vec![
            Expr::number(2.0),
            Expr::sum(vec![Expr::one(), x.clone()]),
        ]);
        let out = DistributeNumericRule.apply(&e, &ctx);
        assert_eq!(
            out,
            Some(Expr::sum(vec![
                Expr::number(2.0),
                Expr::product(vec![Expr::number(2.0), x])
            ]))
        );
    }

    #[test]
    fn test_expand_square() {
        let ctx = RuleContext::default();
        let x = Expr::symbol("x");
        let e = Expr::pow(Expr::sum(vec![Expr::one(), x]), Expr::number(2.0));
        let out = ExpandPowerRule.apply(&e, &ctx);
        assert!(matches!(out.as_ref().map(|o| o.kind()), Some(AstKind::Sum(_))));
        let v = out.and_then(|o| o.eval_at("x", 3.0));
        assert_eq!(v, Some(16.0));
    }

    #[test]
    fn test_negative_power_not_expanded() {
        let ctx = RuleContext::default();
        let e = Expr::pow(
            Expr::sum(vec![Expr::one(), Expr::symbol("x")]),
            Expr::number(-2.0),
        );
        assert_eq!(ExpandPowerRule.apply(&e, &ctx), None);
    }
}
