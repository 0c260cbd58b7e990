//! Combinations of independent random variables: sums, extremes, iid repetitions and
//! mixtures. None of these overload arithmetic operators.

use std::cmp::Ordering;

use tracing::debug;

use super::product::product;
use super::support::{Coverage, coverage, merge_atoms, ordered, union_partition};
use super::{DUMMY, Form, Kind, MASS_TOLERANCE, Piecewise, Transform, VAR};
use crate::calculus::integrate_with;
use crate::core::{Assumptions, Sign};
use crate::error::{DistError, Result};
use crate::Expr;

/// Distribution of `X + Y` for independent `X` and `Y`.
///
/// ```
/// use symb_prob::{catalog, convolution};
///
/// let x = catalog::exponential(1.0).unwrap();
/// let s = convolution(&x, &x).unwrap();
/// let mean = s.mean().unwrap().to_f64().unwrap();
/// assert!((mean - 2.0).abs() < 1e-9);
/// ```
pub fn convolution(x: &Piecewise, y: &Piecewise) -> Result<Piecewise> {
    x.require_same_kind(y)?;
    match x.kind {
        Kind::Discrete => cross_product(x, y, |a, b| {
            Ok(Expr::sum(vec![a.clone(), b.clone()]).simplified())
        }),
        Kind::Continuous => {
            let (fx, fy) = (x.pdf()?, y.pdf()?);
            if is_lifetime(&fx) && is_lifetime(&fy) {
                return lifetime_convolution(&fx, &fy);
            }
            // e^(X+Y) = e^X * e^Y
            let exp = Transform::function(Expr::symbol(VAR).exp())?;
            let ln = Transform::function(Expr::symbol(VAR).ln())?;
            let lifted = product(&fx.transform(&exp)?, &fy.transform(&exp)?)?;
            lifted.transform(&ln)
        }
    }
}

/// Single segment on `[0, inf)`.
fn is_lifetime(d: &Piecewise) -> bool {
    d.segments.len() == 1
        && d.breakpoints[0].is_number_eq(0.0)
        && d.breakpoints[1].infinity_sign() == Some(1)
}

/// `f(z) = integral over [0, z] of f1(s) f2(z - s) ds`
fn lifetime_convolution(fx: &Piecewise, fy: &Piecewise) -> Result<Piecewise> {
    let s = Expr::symbol(DUMMY);
    let z = Expr::symbol(VAR);
    let integrand = Expr::product(vec![
        fx.segments[0].substitute(VAR, &s),
        fy.segments[0].substitute(VAR, &Expr::sub_expr(z.clone(), s.clone())),
    ]);
    let assumptions = Assumptions::positive_parameters()
        .with(DUMMY, Sign::Positive)
        .with(VAR, Sign::Positive);
    let density = integrate_with(&integrand, DUMMY, &Expr::zero(), &z, &assumptions)?;
    debug!(%density, "lifetime convolution");
    Piecewise::from_parts(
        vec![density],
        fx.breakpoints.clone(),
        Kind::Continuous,
        Form::Pdf,
    )
}

/// Pair every atom of `x` with every atom of `y`, pooling the mass of equal results.
fn cross_product(
    x: &Piecewise,
    y: &Piecewise,
    combine: impl Fn(&Expr, &Expr) -> Result<Expr>,
) -> Result<Piecewise> {
    let (fx, fy) = (x.pdf()?, y.pdf()?);
    let mut pairs = Vec::with_capacity(fx.segments.len() * fy.segments.len());
    for (a, p) in fx.breakpoints.iter().zip(&fx.segments) {
        for (b, q) in fy.breakpoints.iter().zip(&fy.segments) {
            let value = combine(a, b)?;
            let mass = Expr::product(vec![p.clone(), q.clone()]).simplified();
            pairs.push((value, mass));
        }
    }
    let (atoms, probs) = merge_atoms(pairs)?;
    Piecewise::from_parts(probs, atoms, Kind::Discrete, Form::Pdf)
}

pub(crate) fn discrete_product(x: &Piecewise, y: &Piecewise) -> Result<Piecewise> {
    cross_product(x, y, |a, b| {
        Ok(Expr::product(vec![a.clone(), b.clone()]).simplified())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Max,
    Min,
}

/// Distribution of `max(X, Y)`: `F = F_X * F_Y`.
pub fn maximum(x: &Piecewise, y: &Piecewise) -> Result<Piecewise> {
    extreme(x, y, Extreme::Max)
}

/// Distribution of `min(X, Y)`: `F = 1 - (1 - F_X)(1 - F_Y)`.
pub fn minimum(x: &Piecewise, y: &Piecewise) -> Result<Piecewise> {
    extreme(x, y, Extreme::Min)
}

fn extreme(x: &Piecewise, y: &Piecewise, which: Extreme) -> Result<Piecewise> {
    x.require_same_kind(y)?;
    if x.kind == Kind::Discrete {
        return cross_product(x, y, |a, b| {
            let pick_a = match (which, ordered(a, b)?) {
                (Extreme::Max, Ordering::Less) | (Extreme::Min, Ordering::Greater) => false,
                _ => true,
            };
            Ok(if pick_a { a.clone() } else { b.clone() })
        });
    }

    let (fx, fy) = (x.cdf()?, y.cdf()?);
    // Walk the merged breakpoints; below its support an operand's CDF is 0, above it 1.
    // Two lifetimes on [0, inf) give a single piece, the closed form itself.
    let partition = union_partition(&[&fx.breakpoints, &fy.breakpoints])?;
    let mut segments = Vec::with_capacity(partition.len() - 1);
    for w in partition.windows(2) {
        let a = cdf_on(&fx, &w[0], &w[1])?;
        let b = cdf_on(&fy, &w[0], &w[1])?;
        let f = match which {
            Extreme::Max => Expr::product(vec![a, b]),
            Extreme::Min => {
                let survive = Expr::product(vec![
                    Expr::sub_expr(Expr::one(), a),
                    Expr::sub_expr(Expr::one(), b),
                ]);
                Expr::sub_expr(Expr::one(), survive)
            }
        };
        segments.push(f.simplified());
    }
    Piecewise::from_parts(segments, partition, Kind::Continuous, Form::Cdf)?.pdf()
}

fn cdf_on(cdf: &Piecewise, lo: &Expr, hi: &Expr) -> Result<Expr> {
    Ok(match coverage(&cdf.breakpoints, lo, hi)? {
        Coverage::Before => Expr::zero(),
        Coverage::Inside(i) => cdf.segments[i].clone(),
        Coverage::After => Expr::one(),
    })
}

fn require_count(n: u32) -> Result<()> {
    if n == 0 {
        Err(DistError::domain("an iid combination needs at least one copy"))
    } else {
        Ok(())
    }
}

/// Sum of `n` independent copies of `x`.
pub fn convolution_iid(x: &Piecewise, n: u32) -> Result<Piecewise> {
    require_count(n)?;
    let mut acc = x.pdf()?;
    for _ in 1..n {
        acc = convolution(&acc, x)?;
    }
    Ok(acc)
}

/// Product of `n` independent copies of `x`.
pub fn product_iid(x: &Piecewise, n: u32) -> Result<Piecewise> {
    require_count(n)?;
    let mut acc = x.pdf()?;
    for _ in 1..n {
        acc = product(&acc, x)?;
    }
    Ok(acc)
}

/// Largest of `n` independent copies: `F^n`.
pub fn maximum_iid(x: &Piecewise, n: u32) -> Result<Piecewise> {
    require_count(n)?;
    let cdf = x.cdf()?;
    let segments = cdf
        .segments
        .iter()
        .map(|f| Expr::pow(f.clone(), Expr::number(f64::from(n))).simplified())
        .collect();
    Piecewise::from_parts(segments, cdf.breakpoints.clone(), cdf.kind, Form::Cdf)?.pdf()
}

/// Smallest of `n` independent copies: survivor function `S^n`.
pub fn minimum_iid(x: &Piecewise, n: u32) -> Result<Piecewise> {
    require_count(n)?;
    let sf = x.sf()?;
    let segments = sf
        .segments
        .iter()
        .map(|s| Expr::pow(s.clone(), Expr::number(f64::from(n))).simplified())
        .collect();
    Piecewise::from_parts(segments, sf.breakpoints.clone(), sf.kind, Form::Sf)?.pdf()
}

/// Weighted mixture of distributions of one kind. Weights must add up to one.
///
/// ```
/// use symb_prob::{catalog, mixture};
///
/// let a = catalog::uniform(0.0, 1.0).unwrap();
/// let b = catalog::uniform(1.0, 3.0).unwrap();
/// let m = mixture(&[0.5, 0.5], &[a, b]).unwrap();
/// assert_eq!(m.pdf_at(2.0).unwrap().to_f64(), Some(0.25));
/// ```
pub fn mixture<W: Into<Expr> + Clone>(weights: &[W], dists: &[Piecewise]) -> Result<Piecewise> {
    if dists.is_empty() || weights.len() != dists.len() {
        return Err(DistError::structural(format!(
            "a mixture needs one weight per distribution, got {} weights for {}",
            weights.len(),
            dists.len()
        )));
    }
    for d in &dists[1..] {
        dists[0].require_same_kind(d)?;
    }
    let weights: Vec<Expr> = weights.iter().cloned().map(Into::into).collect();
    let total = Expr::sum(weights.clone()).simplified();
    if let Some(t) = total.to_f64()
        && (t - 1.0).abs() > MASS_TOLERANCE
    {
        return Err(DistError::domain(format!("mixture weights add up to {t}, not 1")));
    }

    let pdfs = dists.iter().map(Piecewise::pdf).collect::<Result<Vec<_>>>()?;
    match dists[0].kind {
        Kind::Discrete => {
            let mut pairs = Vec::new();
            for (w, pdf) in weights.iter().zip(&pdfs) {
                for (atom, p) in pdf.breakpoints.iter().zip(&pdf.segments) {
                    let mass = Expr::product(vec![w.clone(), p.clone()]).simplified();
                    pairs.push((atom.clone(), mass));
                }
            }
            let (atoms, probs) = merge_atoms(pairs)?;
            Piecewise::from_parts(probs, atoms, Kind::Discrete, Form::Pdf)
        }
        Kind::Continuous => {
            let lists: Vec<&[Expr]> = pdfs.iter().map(|p| p.breakpoints.as_slice()).collect();
            let partition = union_partition(&lists)?;
            let mut segments = Vec::with_capacity(partition.len() - 1);
            for win in partition.windows(2) {
                let mut terms = Vec::new();
                for (w, pdf) in weights.iter().zip(&pdfs) {
                    if let Coverage::Inside(i) = coverage(&pdf.breakpoints, &win[0], &win[1])? {
                        terms.push(Expr::product(vec![w.clone(), pdf.segments[i].clone()]));
                    }
                }
                segments.push(Expr::sum(terms).simplified());
            }
            Piecewise::from_parts(segments, partition, Kind::Continuous, Form::Pdf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::catalog;

    fn value(e: Result<Expr>) -> f64 {
        e.unwrap().to_f64().unwrap()
    }

    #[test]
    fn test_minimum_of_exponentials() {
        let x = catalog::exponential(1.0).unwrap();
        let m = minimum(&x, &x).unwrap();
        for t in [0.1_f64, 0.7, 2.5] {
            let expected = 1.0 - (-2.0 * t).exp();
            assert!((value(m.cdf_at(t)) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_maximum_over_different_supports() {
        let a = catalog::uniform(0.0, 1.0).unwrap();
        let b = catalog::uniform(0.0, 2.0).unwrap();
        let m = maximum(&a, &b).unwrap();
        assert_eq!(m.numeric_breakpoints().unwrap(), vec![0.0, 1.0, 2.0]);
        assert!((value(m.cdf_at(0.5)) - 0.125).abs() < 1e-12);
        assert!((value(m.cdf_at(1.5)) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_lifetime_convolution_is_gamma() {
        let x = catalog::exponential(1.0).unwrap();
        let s = convolution(&x, &x).unwrap();
        let f = value(s.pdf_at(2.0));
        assert!((f - 2.0 * (-2.0_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_sum_is_triangular() {
        let u = catalog::uniform(0.0, 1.0).unwrap();
        let s = convolution(&u, &u).unwrap();
        let (lo, hi) = s.support();
        assert!(lo.to_f64().unwrap().abs() < 1e-9);
        assert!((hi.to_f64().unwrap() - 2.0).abs() < 1e-9);
        assert!((value(s.pdf_at(0.5)) - 0.5).abs() < 1e-9);
        assert!((value(s.pdf_at(1.5)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_discrete_convolution() {
        let coin = catalog::bernoulli(0.5).unwrap();
        let two = convolution(&coin, &coin).unwrap();
        assert_eq!(two.numeric_breakpoints().unwrap(), vec![0.0, 1.0, 2.0]);
        assert_eq!(two.segments()[1].as_number(), Some(0.5));
    }

    #[test]
    fn test_discrete_extremes() {
        let d = Piecewise::discrete(vec![0.5, 0.5], [1.0, 2.0]).unwrap();
        let hi = maximum(&d, &d).unwrap();
        assert_eq!(hi.segments()[1].as_number(), Some(0.75));
        let lo = minimum(&d, &d).unwrap();
        assert_eq!(lo.segments()[0].as_number(), Some(0.75));
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        let c = catalog::uniform(0.0, 1.0).unwrap();
        let d = catalog::bernoulli(0.5).unwrap();
        assert!(matches!(convolution(&c, &d), Err(DistError::Domain(_))));
        assert!(matches!(maximum(&c, &d), Err(DistError::Domain(_))));
    }

    #[test]
    fn test_iid_closed_forms() {
        let u = catalog::uniform(0.0, 1.0).unwrap();
        let top = maximum_iid(&u, 3).unwrap();
        assert!((value(top.pdf_at(0.5)) - 0.75).abs() < 1e-12);
        let bottom = minimum_iid(&u, 3).unwrap();
        assert!((value(bottom.pdf_at(0.5)) - 0.75).abs() < 1e-12);
        assert!(maximum_iid(&u, 0).is_err());
    }

    #[test]
    fn test_iid_accumulates_copies() {
        let coin = catalog::bernoulli(0.5).unwrap();
        let three = convolution_iid(&coin, 3).unwrap();
        assert_eq!(three.segments().len(), 4);
        assert_eq!(three.segments()[1].as_number(), Some(0.375));
        let one = convolution_iid(&coin, 1).unwrap();
        assert_eq!(one, coin);
    }

    #[test]
    fn test_mixture_weights_checked() {
        let a = catalog::uniform(0.0, 1.0).unwrap();
        assert!(mixture(&[0.3, 0.3], &[a.clone(), a.clone()]).is_err());
        assert!(mixture(&[1.0], &[a.clone(), a]).is_err());
    }

    #[test]
    fn test_discrete_mixture() {
        let a = Piecewise::discrete(1.0, [0.0]).unwrap();
        let b = Piecewise::discrete(1.0, [1.0]).unwrap();
        let m = mixture(&[0.25, 0.75], &[a, b]).unwrap();
        assert_eq!(m.segments()[1].as_number(), Some(0.75));
    }
}
