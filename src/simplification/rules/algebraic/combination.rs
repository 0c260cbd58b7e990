use crate::simplification::helpers::{combine_like_factors, combine_like_terms};
use crate::simplification::rules::ExprKind;
use crate::{Expr, ExprKind as AstKind};

rule!(
    CombineTermsRule,
    "combine_terms",
    50,
    &[ExprKind::Sum],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Sum(terms) = expr.kind() else {
            return None;
        };
        let combined = Expr::sum(combine_like_terms(terms));
        if combined == *expr { None } else { Some(combined) }
    }
);

rule!(
    CombineFactorsRule,
    "combine_factors",
    50,
    &[ExprKind::Product],
    alters_domain: true,
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Product(factors) = expr.kind() else {
            return None;
        };
        let combined = combine_like_factors(factors);
        if combined == *expr { None } else { Some(combined) }
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplification::rules::{Rule, RuleContext};

    #[test]
    fn test_terms_are_collected() {
        let ctx = RuleContext::default();
        let x = Expr::symbol("x");
        let e = Expr::sum(vec![x.clone(), x.clone().negate(), Expr::number(2.0)]);
        assert_eq!(CombineTermsRule.apply(&e, &ctx), Some(Expr::number(2.0)));
    }

    #[test]
    fn test_canonical_sum_is_fixed_point() {
        let ctx = RuleContext::default();
        let e = Expr::sum(vec![Expr::number(1.0), Expr::symbol("x")]);
        assert_eq!(CombineTermsRule.apply(&e, &ctx), None);
    }

    #[test]
    fn test_factors_are_collected() {
        let ctx = RuleContext::default();
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        let e = Expr::product(vec![y.clone(), x.clone(), y.clone()]);
        let out = CombineFactorsRule.apply(&e, &ctx);
        assert_eq!(
            out,
            Some(Expr::product(vec![x, Expr::pow(y, Expr::number(2.0))]))
        );
    }
}
