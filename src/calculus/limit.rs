//! Limits by direct substitution and leading-term asymptotics.
//!
//! Every limit is reduced to one at `+inf`. There each subexpression is approximated by
//! a leading term `c * x^p * ln(x)^q * exp(g)`; sums keep their dominant terms and
//! products multiply them. Finite one-sided points substitute `x = a ± 1/t`.

use std::cmp::Ordering;

use tracing::trace;

use super::has_non_finite;
use crate::core::{Assumptions, InternedSymbol, Sign, sign_of};
use crate::error::CasError;
use crate::{Expr, ExprKind};

/// Side from which a finite point is approached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Both,
}

/// Fresh variable tending to `+inf` after a change of variables
const LIMIT_VAR: &str = "_lim";

/// Recursion bound for the asymptotic analysis
const MAX_DEPTH: usize = 24;

/// Limit of `expr` as `var` approaches `point`, parameters assumed positive.
///
/// ```
/// use symb_prob::{Expr, parse, calculus::{limit, Side}};
///
/// let f = parse("1 - exp(-x)").unwrap();
/// assert_eq!(limit(&f, "x", &Expr::infinity(), Side::Both).unwrap(), Expr::one());
/// ```
pub fn limit(expr: &Expr, var: &str, point: &Expr, side: Side) -> Result<Expr, CasError> {
    limit_with(expr, var, point, side, &Assumptions::positive_parameters())
}

pub fn limit_with(
    expr: &Expr,
    var: &str,
    point: &Expr,
    side: Side,
    assumptions: &Assumptions,
) -> Result<Expr, CasError> {
    let e = expr.simplified();
    if !e.contains_var(var) {
        return Ok(e);
    }
    let t = Expr::symbol(LIMIT_VAR);
    let assumptions = assumptions.clone().with(LIMIT_VAR, Sign::Positive);

    match point.infinity_sign() {
        Some(1) => {
            let assumptions = assumptions.with(var, Sign::Positive);
            at_infinity(&e, var, &assumptions)
        }
        Some(_) => {
            let flipped = e.substitute(var, &t.negate()).simplified();
            at_infinity(&flipped, LIMIT_VAR, &assumptions)
        }
        None => {
            let direct = e.substitute(var, point).simplified();
            if !has_non_finite(&direct) {
                return Ok(direct);
            }
            match side {
                Side::Right => one_sided(&e, var, point, 1.0, &assumptions),
                Side::Left => one_sided(&e, var, point, -1.0, &assumptions),
                Side::Both => {
                    let right = one_sided(&e, var, point, 1.0, &assumptions)?;
                    let left = one_sided(&e, var, point, -1.0, &assumptions)?;
                    if right == left {
                        Ok(right)
                    } else {
                        Err(CasError::Indeterminate(format!(
                            "one-sided limits of {e} at {point} differ: {left} and {right}"
                        )))
                    }
                }
            }
        }
    }
}

fn one_sided(
    e: &Expr,
    var: &str,
    point: &Expr,
    direction: f64,
    assumptions: &Assumptions,
) -> Result<Expr, CasError> {
    // x = a + direction / t
    let shifted = Expr::sum(vec![
        point.clone(),
        Expr::product(vec![
            Expr::number(direction),
            Expr::symbol(LIMIT_VAR).recip(),
        ]),
    ]);
    let g = e.substitute(var, &shifted).simplified();
    at_infinity(&g, LIMIT_VAR, assumptions)
}

fn at_infinity(e: &Expr, var: &str, assumptions: &Assumptions) -> Result<Expr, CasError> {
    let analysis = Asymptotic {
        sym: InternedSymbol::new(var),
        x: Expr::symbol(var),
        assumptions,
    };
    match analysis.limit_of(e, 0) {
        Ok(v) => Ok(v.simplified()),
        Err(err) => {
            trace!(expr = %e, error = %err, "asymptotic analysis failed, trying numeric");
            numeric_extrapolation(e, var).ok_or(err)
        }
    }
}

/// Evaluate far out and accept the value when it has settled.
fn numeric_extrapolation(e: &Expr, var: &str) -> Option<Expr> {
    let symbols = e.free_symbols();
    if symbols.iter().any(|s| s != var) {
        return None;
    }
    let v: Vec<f64> = [1e4, 1e6, 1e8]
        .iter()
        .map(|&x| e.eval_at(var, x))
        .collect::<Option<Vec<f64>>>()?;
    if v.iter().all(|x| x.is_finite()) {
        let settled = (v[2] - v[1]).abs() <= 1e-6 * v[2].abs().max(1.0)
            && (v[2] - v[1]).abs() <= (v[1] - v[0]).abs() + f64::EPSILON;
        if settled {
            return Some(Expr::number(if v[2].abs() < 1e-6 { 0.0 } else { v[2] }));
        }
        if v[2].abs() > 1e12 && v[2].abs() > v[1].abs() && v[1].abs() > v[0].abs() {
            return Some(Expr::number(v[2].signum() * f64::INFINITY));
        }
        return None;
    }
    let last = v[2];
    if last.is_infinite() && v[1].signum() == last.signum() {
        return Some(Expr::number(last));
    }
    None
}

/// Leading behaviour `coeff * x^power * ln(x)^log_power * exp(growth)`
#[derive(Debug, Clone)]
struct Term {
    coeff: Expr,
    power: Expr,
    log_power: f64,
    growth: Expr,
}

impl Term {
    fn constant(c: Expr) -> Self {
        Term {
            coeff: c,
            power: Expr::zero(),
            log_power: 0.0,
            growth: Expr::zero(),
        }
    }

    fn multiply(self, other: Term) -> Term {
        Term {
            coeff: Expr::product(vec![self.coeff, other.coeff]).simplified(),
            power: Expr::sum(vec![self.power, other.power]).simplified(),
            log_power: self.log_power + other.log_power,
            growth: Expr::sum(vec![self.growth, other.growth]).simplified(),
        }
    }
}

struct Asymptotic<'a> {
    sym: InternedSymbol,
    x: Expr,
    assumptions: &'a Assumptions,
}

impl Asymptotic<'_> {
    fn limit_of(&self, e: &Expr, depth: usize) -> Result<Expr, CasError> {
        if !e.contains_symbol(&self.sym) {
            return Ok(e.clone());
        }
        let t = self.term(e, depth)?;
        self.term_limit(&t, depth)
    }

    fn signed_infinity(&self, coeff: &Expr) -> Result<Expr, CasError> {
        match sign_of(coeff, self.assumptions) {
            Sign::Positive => Ok(Expr::infinity()),
            Sign::Negative => Ok(Expr::neg_infinity()),
            Sign::Zero => Ok(Expr::zero()),
            Sign::Unknown => Err(CasError::Indeterminate(format!(
                "sign of {coeff} is unknown"
            ))),
        }
    }

    fn term_limit(&self, t: &Term, depth: usize) -> Result<Expr, CasError> {
        if t.coeff.is_number_eq(0.0) {
            return Ok(Expr::zero());
        }
        if !t.growth.is_number_eq(0.0) {
            let g = self.limit_of(&t.growth, depth + 1)?;
            match g.infinity_sign() {
                Some(1) => return self.signed_infinity(&t.coeff),
                Some(_) => return Ok(Expr::zero()),
                None => {
                    let rest = Term {
                        coeff: Expr::product(vec![t.coeff.clone(), g.exp()]).simplified(),
                        growth: Expr::zero(),
                        ..t.clone()
                    };
                    return self.term_limit(&rest, depth + 1);
                }
            }
        }
        match sign_of(&t.power, self.assumptions) {
            Sign::Positive => self.signed_infinity(&t.coeff),
            Sign::Negative => Ok(Expr::zero()),
            Sign::Zero => {
                if t.log_power > 0.0 {
                    self.signed_infinity(&t.coeff)
                } else if t.log_power < 0.0 {
                    Ok(Expr::zero())
                } else {
                    Ok(t.coeff.clone())
                }
            }
            Sign::Unknown => Err(CasError::Indeterminate(format!(
                "sign of exponent {} is unknown",
                t.power
            ))),
        }
    }

    fn term(&self, e: &Expr, depth: usize) -> Result<Term, CasError> {
        if depth > MAX_DEPTH {
            return Err(CasError::unsupported(format!("limit of {e} nests too deeply")));
        }
        if !e.contains_symbol(&self.sym) {
            return Ok(Term::constant(e.clone()));
        }
        match e.kind() {
            ExprKind::Symbol(_) => Ok(Term {
                coeff: Expr::one(),
                power: Expr::one(),
                log_power: 0.0,
                growth: Expr::zero(),
            }),
            ExprKind::Number(_) => Ok(Term::constant(e.clone())),
            ExprKind::Product(factors) => {
                let mut acc = Term::constant(Expr::one());
                for f in factors {
                    acc = acc.multiply(self.term(f, depth + 1)?);
                }
                Ok(acc)
            }
            ExprKind::Sum(terms) => self.dominant(terms, depth),
            ExprKind::Pow(base, n) if !n.contains_symbol(&self.sym) => {
                let tb = self.term(base, depth + 1)?;
                if tb.log_power != 0.0 && n.as_number().is_none() {
                    return Err(CasError::unsupported(format!("symbolic power of a log in {e}")));
                }
                let k = n.as_number().unwrap_or(0.0);
                Ok(Term {
                    coeff: Expr::pow(tb.coeff, (**n).clone()).simplified(),
                    power: Expr::product(vec![tb.power, (**n).clone()]).simplified(),
                    log_power: tb.log_power * k,
                    growth: Expr::product(vec![tb.growth, (**n).clone()]).simplified(),
                })
            }
            ExprKind::Pow(base, v) => {
                let rewritten = Expr::product(vec![(**v).clone(), (**base).clone().ln()])
                    .exp()
                    .simplified();
                self.term(&rewritten, depth + 1)
            }
            ExprKind::FunctionCall { name, args } => {
                let Some(u) = args.first() else {
                    return Err(CasError::unsupported(format!("limit of {e}")));
                };
                self.function_term(name.as_str(), u, e, depth)
            }
        }
    }

    fn function_term(
        &self,
        name: &str,
        u: &Expr,
        whole: &Expr,
        depth: usize,
    ) -> Result<Term, CasError> {
        match name {
            "exp" => {
                let lu = self.limit_of(u, depth + 1)?;
                if lu.is_infinite() {
                    Ok(Term {
                        coeff: Expr::one(),
                        power: Expr::zero(),
                        log_power: 0.0,
                        growth: u.clone(),
                    })
                } else {
                    Ok(Term::constant(lu.exp().simplified()))
                }
            }
            "ln" => {
                if *u == self.x {
                    return Ok(Term {
                        coeff: Expr::one(),
                        power: Expr::zero(),
                        log_power: 1.0,
                        growth: Expr::zero(),
                    });
                }
                let tu = self.term(u, depth + 1)?;
                if tu.log_power != 0.0 {
                    return Err(CasError::unsupported(format!("iterated logarithm in {whole}")));
                }
                // ln(c x^p e^g) = ln c + p ln x + g
                let expanded = Expr::sum(vec![
                    tu.coeff.ln(),
                    Expr::product(vec![tu.power, self.x.clone().ln()]),
                    tu.growth,
                ])
                .simplified();
                self.term(&expanded, depth + 1)
            }
            "abs" => {
                let tu = self.term(u, depth + 1)?;
                Ok(Term {
                    coeff: tu.coeff.abs().simplified(),
                    ..tu
                })
            }
            _ => {
                let lu = self.limit_of(u, depth + 1)?;
                let value = match lu.infinity_sign() {
                    Some(s) => at_infinite_argument(name, s)
                        .ok_or_else(|| CasError::Indeterminate(format!("{whole} oscillates or diverges")))?,
                    None => Expr::func(name, lu).simplified(),
                };
                Ok(Term::constant(value))
            }
        }
    }

    /// Leading term of a sum: the dominant terms, with their coefficients added.
    fn dominant(&self, terms: &[std::sync::Arc<Expr>], depth: usize) -> Result<Term, CasError> {
        let mut group: Vec<Term> = Vec::new();
        for t in terms {
            let candidate = self.term(t, depth + 1)?;
            let Some(lead) = group.first() else {
                group.push(candidate);
                continue;
            };
            match self.compare(&candidate, lead, depth)? {
                Ordering::Greater => group = vec![candidate],
                Ordering::Equal => group.push(candidate),
                Ordering::Less => {}
            }
        }
        let Some(lead) = group.first().cloned() else {
            return Ok(Term::constant(Expr::zero()));
        };

        let mut coeffs = Vec::with_capacity(group.len());
        for member in &group {
            let offset = Expr::sub_expr(member.growth.clone(), lead.growth.clone()).simplified();
            if offset.is_number_eq(0.0) {
                coeffs.push(member.coeff.clone());
            } else {
                let shift = self.limit_of(&offset, depth + 1)?;
                coeffs.push(Expr::product(vec![member.coeff.clone(), shift.exp()]));
            }
        }
        let coeff = Expr::sum(coeffs).simplified();
        if coeff.is_number_eq(0.0) && group.len() > 1 {
            return Err(CasError::Indeterminate(
                "leading terms cancel".to_string(),
            ));
        }
        Ok(Term { coeff, ..lead })
    }

    fn compare(&self, a: &Term, b: &Term, depth: usize) -> Result<Ordering, CasError> {
        let dg = Expr::sub_expr(a.growth.clone(), b.growth.clone()).simplified();
        if !dg.is_number_eq(0.0) {
            let l = self.limit_of(&dg, depth + 1)?;
            match l.infinity_sign() {
                Some(1) => return Ok(Ordering::Greater),
                Some(_) => return Ok(Ordering::Less),
                None => {}
            }
        }
        let dp = Expr::sub_expr(a.power.clone(), b.power.clone()).simplified();
        match sign_of(&dp, self.assumptions) {
            Sign::Positive => return Ok(Ordering::Greater),
            Sign::Negative => return Ok(Ordering::Less),
            Sign::Zero => {}
            Sign::Unknown => {
                return Err(CasError::Indeterminate(format!(
                    "cannot order x^{} against x^{}",
                    a.power, b.power
                )));
            }
        }
        Ok(a.log_power
            .partial_cmp(&b.log_power)
            .unwrap_or(Ordering::Equal))
    }
}

/// Value of a bounded function as its argument tends to `±inf`.
fn at_infinite_argument(name: &str, sign: i8) -> Option<Expr> {
    let s = f64::from(sign);
    let half_pi = std::f64::consts::FRAC_PI_2;
    match name {
        "erf" | "tanh" | "sign" => Some(Expr::number(s)),
        "erfc" => Some(Expr::number(1.0 - s)),
        "atan" => Some(Expr::number(s * half_pi)),
        "sinh" => Some(Expr::number(s * f64::INFINITY)),
        "cosh" | "sqrt" | "gamma" => (sign > 0).then(Expr::infinity),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn lim(src: &str, point: Expr, side: Side) -> Expr {
        let e = parse(src).unwrap();
        limit(&e, "x", &point, side).unwrap_or_else(|err| panic!("{src}: {err}"))
    }

    #[test]
    fn test_direct_substitution() {
        assert_eq!(lim("x^2 + 1", Expr::number(2.0), Side::Both), Expr::number(5.0));
    }

    #[test]
    fn test_exponential_decay_beats_polynomial() {
        assert_eq!(lim("x^3*exp(-x)", Expr::infinity(), Side::Both), Expr::zero());
        assert_eq!(
            lim("-x*exp(-theta*x) - exp(-theta*x)/theta", Expr::infinity(), Side::Both),
            Expr::zero()
        );
    }

    #[test]
    fn test_bounded_functions() {
        assert_eq!(lim("erf(x)", Expr::infinity(), Side::Both), Expr::one());
        assert_eq!(lim("erf(x)", Expr::neg_infinity(), Side::Both), Expr::number(-1.0));
        let a = lim("atan(x)", Expr::infinity(), Side::Both);
        assert_eq!(a.as_number(), Some(std::f64::consts::FRAC_PI_2));
    }

    #[test]
    fn test_one_sided() {
        assert_eq!(lim("x*ln(x)", Expr::zero(), Side::Right), Expr::zero());
        assert_eq!(lim("1/x", Expr::zero(), Side::Right), Expr::infinity());
        assert_eq!(lim("1/x", Expr::zero(), Side::Left), Expr::neg_infinity());
        let both = parse("1/x").and_then(|e| limit(&e, "x", &Expr::zero(), Side::Both));
        assert!(matches!(both, Err(CasError::Indeterminate(_))));
    }

    #[test]
    fn test_growth() {
        assert_eq!(lim("ln(x) - x", Expr::infinity(), Side::Both), Expr::neg_infinity());
        assert_eq!(lim("x^2 - 3*x", Expr::neg_infinity(), Side::Both), Expr::infinity());
        assert_eq!(lim("(1 + x)/(2 + x)", Expr::infinity(), Side::Both), Expr::one());
    }

    #[test]
    fn test_weibull_tail() {
        assert_eq!(
            lim("1 - exp(-(x/lambda)^k)", Expr::infinity(), Side::Both),
            Expr::one()
        );
    }
}
