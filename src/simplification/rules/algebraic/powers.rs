use std::sync::Arc;

use crate::simplification::helpers::is_provably_positive;
use crate::simplification::rules::ExprKind;
use crate::traits::{as_integer, is_one};
use crate::{Expr, ExprKind as AstKind};

rule!(
    PowerPowerRule,
    "power_power",
    75,
    &[ExprKind::Pow],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Pow(u, outer) = expr.kind() else {
            return None;
        };
        let AstKind::Pow(base, inner) = u.kind() else {
            return None;
        };

        // (x^2k)^(1/2k) = |x|
        if let (Some(i), Some(o)) = (inner.as_number(), outer.as_number())
            && let Some(k) = as_integer(i)
            && k > 0
            && k % 2 == 0
            && is_one(i * o)
            && !is_provably_positive(base)
        {
            return Some((**base).clone().abs());
        }

        let outer_is_integer = outer.as_number().and_then(as_integer).is_some();
        if outer_is_integer || is_provably_positive(base) {
            let exponent = Expr::product(vec![(**inner).clone(), (**outer).clone()]);
            return Some(Expr::pow_from_arcs(Arc::clone(base), Arc::new(exponent)));
        }
        None
    }
);

rule!(
    PowerOfProductRule,
    "power_of_product",
    74,
    &[ExprKind::Pow],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Pow(u, exponent) = expr.kind() else {
            return None;
        };
        let AstKind::Product(factors) = u.kind() else {
            return None;
        };

        let integer = exponent.as_number().and_then(as_integer).is_some();
        if integer {
            return Some(Expr::product(
                factors
                    .iter()
                    .map(|f| Expr::pow_from_arcs(Arc::clone(f), Arc::clone(exponent)))
                    .collect(),
            ));
        }

        // Non-integer exponent: only positive factors may be pulled out
        let (positive, rest): (Vec<&Arc<Expr>>, Vec<&Arc<Expr>>) =
            factors.iter().partition(|f| is_provably_positive(f));
        if positive.is_empty() {
            return None;
        }
        let mut out: Vec<Expr> = positive
            .into_iter()
            .map(|f| Expr::pow_from_arcs(Arc::clone(f), Arc::clone(exponent)))
            .collect();
        if !rest.is_empty() {
            let remaining = Expr::product_from_arcs(rest.into_iter().cloned().collect());
            out.push(Expr::pow_from_arcs(Arc::new(remaining), Arc::clone(exponent)));
        }
        Some(Expr::product(out))
    }
);
