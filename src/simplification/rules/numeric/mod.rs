use std::sync::Arc;

use crate::core::{Assumptions, Sign, sign_of};
use crate::functions::registry::Registry;
use crate::simplification::rules::{ExprKind, Rule};
use crate::{Expr, ExprKind as AstKind};

// Calls whose arguments are all numbers become numbers, as long as the value is not NaN.
// Infinities are kept: exp(-inf) = 0 and erf(inf) = 1 are exactly what limits need.
rule!(
    FoldNumericCallRule,
    "fold_numeric_call",
    100,
    &[ExprKind::Function],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::FunctionCall { name, args } = expr.kind() else {
            return None;
        };
        let values: Vec<f64> = args
            .iter()
            .map(|a| a.as_number())
            .collect::<Option<Vec<f64>>>()?;
        let def = Registry::get(name.as_str())?;
        let v = (def.eval)(&values)?;
        if v.is_nan() { None } else { Some(Expr::number(v)) }
    }
);

// Powers of numbers that the constructor leaves alone (infinite results such as 0^-1).
rule!(
    FoldNumericPowRule,
    "fold_numeric_pow",
    100,
    &[ExprKind::Pow],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Pow(b, e) = expr.kind() else {
            return None;
        };
        let (b, e) = (b.as_number()?, e.as_number()?);
        let v = crate::core::expr::eval_pow(b, e);
        if v.is_nan() { None } else { Some(Expr::number(v)) }
    }
);

rule!(
    SqrtToPowerRule,
    "sqrt_to_power",
    98,
    &[ExprKind::Function],
    |expr: &Expr, _context: &RuleContext| {
        let arg = expr.as_call("sqrt")?;
        Some(Expr::pow((**arg).clone(), Expr::number(0.5)))
    }
);

rule!(
    AbsOfSignedRule,
    "abs_of_signed",
    95,
    &[ExprKind::Function],
    |expr: &Expr, _context: &RuleContext| {
        let arg = expr.as_call("abs")?;
        match sign_of(arg, &Assumptions::none()) {
            Sign::Positive | Sign::Zero => Some((**arg).clone()),
            Sign::Negative => Some((**arg).clone().negate()),
            Sign::Unknown => {
                // abs(c*u) = |c|*abs(u)
                let (c, rest) = arg.split_coefficient();
                if c != 1.0 && c.is_finite() {
                    Some(Expr::product(vec![Expr::number(c.abs()), rest.abs()]))
                } else {
                    None
                }
            }
        }
    }
);

rule!(
    SignOfSignedRule,
    "sign_of_signed",
    95,
    &[ExprKind::Function],
    |expr: &Expr, _context: &RuleContext| {
        let arg = expr.as_call("sign")?;
        match sign_of(arg, &Assumptions::none()) {
            Sign::Positive => Some(Expr::one()),
            Sign::Negative => Some(Expr::number(-1.0)),
            Sign::Zero => Some(Expr::zero()),
            Sign::Unknown => None,
        }
    }
);

pub(crate) fn get_numeric_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(FoldNumericCallRule),
        Arc::new(FoldNumericPowRule),
        Arc::new(SqrtToPowerRule),
        Arc::new(AbsOfSignedRule),
        Arc::new(SignOfSignedRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplification::rules::RuleContext;

    #[test]
    fn test_fold_call() {
        let ctx = RuleContext::default();
        let e = Expr::func("exp", Expr::number(0.0));
        assert_eq!(FoldNumericCallRule.apply(&e, &ctx), Some(Expr::one()));
        let neg_inf = Expr::func("exp", Expr::neg_infinity());
        assert_eq!(FoldNumericCallRule.apply(&neg_inf, &ctx), Some(Expr::zero()));
        let nan = Expr::func("ln", Expr::number(-1.0));
        assert_eq!(FoldNumericCallRule.apply(&nan, &ctx), None);
    }

    #[test]
    fn test_abs_of_exp() {
        let ctx = RuleContext::default();
        let inner = Expr::symbol("x").exp();
        let e = inner.clone().abs();
        assert_eq!(AbsOfSignedRule.apply(&e, &ctx), Some(inner));
    }
}
