//! Polynomial view of an expression in one variable.
//!
//! Coefficients are arbitrary expressions free of the variable, so `theta*x^2 - 2*x`
//! is the polynomial `[0, -2, theta]`.

use crate::core::InternedSymbol;
use crate::traits::as_integer;
use crate::{Expr, ExprKind};

/// Powers above this are not expanded.
const MAX_DEGREE: usize = 32;

/// Coefficients `[c0, c1, ...]` of `expr` as a polynomial in `var`, or `None`.
/// Trailing zero coefficients are trimmed; the zero polynomial is `[0]`.
pub(crate) fn coefficients(expr: &Expr, var: &InternedSymbol) -> Option<Vec<Expr>> {
    let raw = raw_coefficients(expr, var)?;
    let mut out: Vec<Expr> = raw.into_iter().map(|c| c.simplified()).collect();
    while out.len() > 1 && out.last().is_some_and(|c| c.is_number_eq(0.0)) {
        out.pop();
    }
    Some(out)
}

fn raw_coefficients(expr: &Expr, var: &InternedSymbol) -> Option<Vec<Expr>> {
    if !expr.contains_symbol(var) {
        return Some(vec![expr.clone()]);
    }
    match expr.kind() {
        ExprKind::Symbol(_) => Some(vec![Expr::zero(), Expr::one()]),
        ExprKind::Sum(terms) => {
            let mut acc = vec![Expr::zero()];
            for t in terms {
                acc = add(&acc, &raw_coefficients(t, var)?);
            }
            Some(acc)
        }
        ExprKind::Product(factors) => {
            let mut acc = vec![Expr::one()];
            for f in factors {
                acc = mul(&acc, &raw_coefficients(f, var)?);
                if acc.len() > MAX_DEGREE + 1 {
                    return None;
                }
            }
            Some(acc)
        }
        ExprKind::Pow(base, exponent) => {
            let n = exponent.as_number().and_then(as_integer)?;
            if n < 0 || n as usize > MAX_DEGREE {
                return None;
            }
            let b = raw_coefficients(base, var)?;
            let mut acc = vec![Expr::one()];
            for _ in 0..n {
                acc = mul(&acc, &b);
                if acc.len() > MAX_DEGREE + 1 {
                    return None;
                }
            }
            Some(acc)
        }
        _ => None,
    }
}

fn add(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
    let n = a.len().max(b.len());
    (0..n)
        .map(|i| match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) => Expr::sum(vec![x.clone(), y.clone()]),
            (Some(x), None) | (None, Some(x)) => x.clone(),
            (None, None) => Expr::zero(),
        })
        .collect()
}

fn mul(a: &[Expr], b: &[Expr]) -> Vec<Expr> {
    let mut out: Vec<Vec<Expr>> = vec![Vec::new(); a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j].push(Expr::product(vec![x.clone(), y.clone()]));
        }
    }
    out.into_iter().map(Expr::sum).collect()
}

/// Rebuild `sum(c_k * var^k)`.
pub(crate) fn from_coefficients(coeffs: &[Expr], var: &Expr) -> Expr {
    Expr::sum(
        coeffs
            .iter()
            .enumerate()
            .map(|(k, c)| {
                Expr::product(vec![c.clone(), Expr::pow(var.clone(), Expr::number(k as f64))])
            })
            .collect(),
    )
}

/// Derivative of a coefficient vector.
pub(crate) fn derivative(coeffs: &[Expr]) -> Vec<Expr> {
    if coeffs.len() <= 1 {
        return vec![Expr::zero()];
    }
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| Expr::product(vec![Expr::number(k as f64), c.clone()]).simplified())
        .collect()
}

pub(crate) fn degree(coeffs: &[Expr]) -> usize {
    coeffs.len().saturating_sub(1)
}

/// Quotient and remainder of `p / q`; the remainder has `degree(q)` coefficients.
pub(crate) fn divide(p: &[Expr], q: &[Expr]) -> (Vec<Expr>, Vec<Expr>) {
    let dq = degree(q);
    let lead = q[dq].clone();
    let mut rem = p.to_vec();
    if rem.len() <= dq {
        rem.resize(dq, Expr::zero());
        return (vec![Expr::zero()], rem);
    }
    let mut quot = vec![Expr::zero(); rem.len() - dq];
    for k in (0..quot.len()).rev() {
        let c = Expr::div_expr(rem[k + dq].clone(), lead.clone()).simplified();
        for (j, qj) in q.iter().enumerate() {
            rem[k + j] = Expr::sub_expr(
                rem[k + j].clone(),
                Expr::product(vec![c.clone(), qj.clone()]),
            )
            .simplified();
        }
        quot[k] = c;
    }
    rem.truncate(dq);
    (quot, rem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn coeffs(src: &str) -> Vec<Expr> {
        let e = parse(src).unwrap();
        coefficients(&e, &InternedSymbol::new("x")).unwrap()
    }

    #[test]
    fn test_expanded_polynomial() {
        let c = coeffs("(1 - x)^3");
        assert_eq!(c.len(), 4);
        let values: Vec<f64> = c.iter().filter_map(|e| e.as_number()).collect();
        assert_eq!(values, vec![1.0, -3.0, 3.0, -1.0]);
    }

    #[test]
    fn test_symbolic_coefficients() {
        let c = coeffs("theta*x^2 - 2*x");
        assert_eq!(degree(&c), 2);
        assert_eq!(c[2], Expr::symbol("theta"));
        assert!(c[0].is_number_eq(0.0));
    }

    #[test]
    fn test_non_polynomial() {
        let e = parse("exp(x) + x").unwrap();
        assert!(coefficients(&e, &InternedSymbol::new("x")).is_none());
        let r = parse("x^-1").unwrap();
        assert!(coefficients(&r, &InternedSymbol::new("x")).is_none());
    }

    #[test]
    fn test_derivative() {
        let d = derivative(&coeffs("x^3 + 2*x"));
        let values: Vec<f64> = d.iter().filter_map(|e| e.as_number()).collect();
        assert_eq!(values, vec![2.0, 0.0, 3.0]);
    }

    #[test]
    fn test_division_with_remainder() {
        // x^3 + 1 = (x - 2)(x^2 + 2x + 5) + (11 - x)
        let (q, r) = divide(&coeffs("x^3 + 1"), &coeffs("x^2 + 2*x + 5"));
        let q: Vec<f64> = q.iter().filter_map(|e| e.as_number()).collect();
        let r: Vec<f64> = r.iter().filter_map(|e| e.as_number()).collect();
        assert_eq!(q, vec![-2.0, 1.0]);
        assert_eq!(r, vec![11.0, -1.0]);

        let (q, r) = divide(&coeffs("3"), &coeffs("x^2 + 1"));
        assert!(q[0].is_number_eq(0.0));
        assert_eq!(r.len(), 2);
        assert!(r[0].is_number_eq(3.0) && r[1].is_number_eq(0.0));
    }
}
