use std::sync::Arc;

use crate::functions::func_arc;
use crate::simplification::helpers::is_provably_positive;
use crate::simplification::rules::{ExprKind, Rule};
use crate::traits::as_integer;
use crate::{Expr, ExprKind as AstKind};

/// `k * ln(u)` as `(k, u)`
fn as_scaled_ln(term: &Expr) -> Option<(f64, Arc<Expr>)> {
    if let Some(u) = term.as_call("ln") {
        return Some((1.0, Arc::clone(u)));
    }
    if let AstKind::Product(factors) = term.kind()
        && factors.len() == 2
        && let Some(k) = factors[0].as_number()
        && let Some(u) = factors[1].as_call("ln")
    {
        return Some((k, Arc::clone(u)));
    }
    None
}

// exp(ln u) = u, exp(k ln u) = u^k, exp(a + k ln u) = u^k exp(a)
rule!(
    ExpOfLnRule,
    "exp_of_ln",
    92,
    &[ExprKind::Function],
    |expr: &Expr, _context: &RuleContext| {
        let arg = expr.as_call("exp")?;
        let terms: Vec<Arc<Expr>> = match arg.kind() {
            AstKind::Sum(terms) => terms.clone(),
            _ => vec![Arc::clone(arg)],
        };
        let mut powers = Vec::new();
        let mut rest = Vec::new();
        for t in terms {
            match as_scaled_ln(&t) {
                Some((k, u)) => powers.push(Expr::pow_from_arcs(u, Arc::new(Expr::number(k)))),
                None => rest.push(t),
            }
        }
        if powers.is_empty() {
            return None;
        }
        if !rest.is_empty() {
            powers.push(func_arc("exp", Arc::new(Expr::sum_from_arcs(rest))));
        }
        Some(Expr::product(powers))
    }
);

rule!(
    LnOfExpRule,
    "ln_of_exp",
    92,
    &[ExprKind::Function],
    |expr: &Expr, _context: &RuleContext| {
        let arg = expr.as_call("ln")?;
        arg.as_call("exp").map(|u| (**u).clone())
    }
);

// ln(c * u) = ln|c| + ln(sign(c) u), and positive factors split off
rule!(
    LnOfProductRule,
    "ln_of_product",
    85,
    &[ExprKind::Function],
    |expr: &Expr, _context: &RuleContext| {
        let arg = expr.as_call("ln")?;
        let AstKind::Product(factors) = arg.kind() else {
            return None;
        };
        let mut logs = Vec::new();
        let mut rest: Vec<Arc<Expr>> = Vec::new();
        for f in factors {
            match f.as_number() {
                Some(c) if c == -1.0 => rest.push(Arc::clone(f)),
                Some(c) if c < 0.0 => {
                    logs.push(Expr::number(-c).ln());
                    rest.push(Arc::new(Expr::number(-1.0)));
                }
                Some(_) => logs.push((**f).clone().ln()),
                None if is_provably_positive(f) => logs.push((**f).clone().ln()),
                None => rest.push(Arc::clone(f)),
            }
        }
        if logs.is_empty() {
            return None;
        }
        if !rest.is_empty() {
            logs.push(func_arc("ln", Arc::new(Expr::product_from_arcs(rest))));
        }
        Some(Expr::sum(logs))
    }
);

// ln(u^k) = k ln u, except u^(2n) with u of unknown sign
rule!(
    LnOfPowerRule,
    "ln_of_power",
    85,
    &[ExprKind::Function],
    |expr: &Expr, _context: &RuleContext| {
        let arg = expr.as_call("ln")?;
        let AstKind::Pow(u, k) = arg.kind() else {
            return None;
        };
        if !is_provably_positive(u) {
            let even = k
                .as_number()
                .and_then(as_integer)
                .is_some_and(|n| n % 2 == 0);
            let odd = k.as_number().and_then(as_integer).is_some();
            if even || !odd {
                return None;
            }
        }
        Some(Expr::product(vec![
            (**k).clone(),
            func_arc("ln", Arc::clone(u)),
        ]))
    }
);

rule!(
    ExpPowerRule,
    "exp_power",
    75,
    &[ExprKind::Pow],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Pow(base, k) = expr.kind() else {
            return None;
        };
        let u = base.as_call("exp")?;
        Some(Expr::product(vec![(**k).clone(), (**u).clone()]).exp())
    }
);

rule!(
    ExpMergeRule,
    "exp_merge",
    55,
    &[ExprKind::Product],
    |expr: &Expr, _context: &RuleContext| {
        let AstKind::Product(factors) = expr.kind() else {
            return None;
        };
        let (exps, others): (Vec<&Arc<Expr>>, Vec<&Arc<Expr>>) =
            factors.iter().partition(|f| f.as_call("exp").is_some());
        if exps.len() < 2 {
            return None;
        }
        let args: Vec<Arc<Expr>> = exps
            .iter()
            .filter_map(|f| f.as_call("exp").cloned())
            .collect();
        let mut out: Vec<Arc<Expr>> = others.into_iter().cloned().collect();
        out.push(Arc::new(func_arc("exp", Arc::new(Expr::sum_from_arcs(args)))));
        Some(Expr::product_from_arcs(out))
    }
);

pub(crate) fn get_exponential_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(ExpOfLnRule),
        Arc::new(LnOfExpRule),
        Arc::new(LnOfProductRule),
        Arc::new(LnOfPowerRule),
        Arc::new(ExpPowerRule),
        Arc::new(ExpMergeRule),
    ]
}
