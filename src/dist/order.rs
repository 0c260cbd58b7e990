//! Order statistics and truncation.

use std::cmp::Ordering;

use tracing::debug;

use super::support::{Coverage, coverage, ordered};
use super::{Form, Kind, Piecewise};
use crate::error::{DistError, Result};
use crate::math::binomial;
use crate::Expr;

/// Distribution of the `r`-th smallest of `n` independent copies of `x`.
///
/// Continuous variables get the density
/// `n! / ((r-1)! (n-r)!) F^(r-1) S^(n-r) f` on the breakpoints of `x`. Discrete variables
/// (sampling with replacement) go through the cumulative form
/// `sum_{k=r}^{n} C(n,k) F^k (1-F)^(n-k)`.
///
/// ```
/// use symb_prob::{catalog, order_stat};
///
/// let u = catalog::uniform(0.0, 1.0).unwrap();
/// let median = order_stat(&u, 3, 2).unwrap();
/// // 6 x (1 - x)
/// assert!((median.pdf_at(0.5).unwrap().to_f64().unwrap() - 1.5).abs() < 1e-12);
/// ```
pub fn order_stat(x: &Piecewise, n: u32, r: u32) -> Result<Piecewise> {
    if r == 0 || r > n {
        return Err(DistError::domain(format!(
            "order statistic {r} of {n} needs 1 <= r <= n"
        )));
    }
    debug!(n, r, kind = %x.kind, "order statistic");
    match x.kind {
        Kind::Continuous => continuous_order_stat(x, n, r),
        Kind::Discrete => discrete_order_stat(x, n, r),
    }
}

fn continuous_order_stat(x: &Piecewise, n: u32, r: u32) -> Result<Piecewise> {
    let (pdf, cdf, sf) = (x.pdf()?, x.cdf()?, x.sf()?);
    // n C(n-1, r-1) stays finite long after n! overflows
    let coefficient = f64::from(n) * binomial(n - 1, r - 1);
    let segments = pdf
        .segments
        .iter()
        .zip(&cdf.segments)
        .zip(&sf.segments)
        .map(|((f, big_f), s)| {
            Expr::product(vec![
                Expr::number(coefficient),
                big_f.clone().pow_of(f64::from(r - 1)),
                s.clone().pow_of(f64::from(n - r)),
                f.clone(),
            ])
            .simplified()
        })
        .collect();
    Piecewise::from_parts(segments, pdf.breakpoints, Kind::Continuous, Form::Pdf)
}

fn discrete_order_stat(x: &Piecewise, n: u32, r: u32) -> Result<Piecewise> {
    let cdf = x.cdf()?;
    let segments = cdf
        .segments
        .iter()
        .map(|big_f| {
            let terms = (r..=n)
                .map(|k| {
                    Expr::product(vec![
                        Expr::number(binomial(n, k)),
                        big_f.clone().pow_of(f64::from(k)),
                        Expr::sub_expr(Expr::one(), big_f.clone()).pow_of(f64::from(n - k)),
                    ])
                })
                .collect();
            Expr::sum(terms).simplified()
        })
        .collect();
    Piecewise::from_parts(segments, cdf.breakpoints, Kind::Discrete, Form::Cdf)?.pdf()
}

/// `x` conditioned on `lo <= X <= hi`, renormalised to unit mass.
///
/// The bounds are clipped to the support; an interval that misses the support, or holds no
/// probability, is a [`DistError::Domain`].
pub fn truncate(x: &Piecewise, lo: impl Into<Expr>, hi: impl Into<Expr>) -> Result<Piecewise> {
    let (lo, hi) = (lo.into(), hi.into());
    if ordered(&lo, &hi)? != Ordering::Less {
        return Err(DistError::domain(format!(
            "truncation needs lo < hi, got [{lo}, {hi}]"
        )));
    }
    let pdf = x.pdf()?;
    match pdf.kind {
        Kind::Continuous => truncate_continuous(&pdf, lo, hi),
        Kind::Discrete => truncate_discrete(&pdf, &lo, &hi),
    }
}

fn truncate_continuous(pdf: &Piecewise, lo: Expr, hi: Expr) -> Result<Piecewise> {
    let (s_lo, s_hi) = pdf.support();
    let lo = if ordered(&lo, s_lo)? == Ordering::Less {
        s_lo.clone()
    } else {
        lo
    };
    let hi = if ordered(&hi, s_hi)? == Ordering::Greater {
        s_hi.clone()
    } else {
        hi
    };
    if ordered(&lo, &hi)? != Ordering::Less {
        return Err(DistError::domain(format!(
            "[{lo}, {hi}] does not meet the support [{s_lo}, {s_hi}]"
        )));
    }

    let mass = Expr::sub_expr(pdf.cdf_at(&hi)?, pdf.cdf_at(&lo)?).simplified();
    if mass.as_number().is_some_and(|m| m <= 0.0) {
        return Err(DistError::domain(format!("[{lo}, {hi}] carries no probability")));
    }
    debug!(%lo, %hi, %mass, "truncation");

    let mut breakpoints = vec![lo.clone()];
    for b in &pdf.breakpoints {
        if ordered(b, &lo)? == Ordering::Greater && ordered(b, &hi)? == Ordering::Less {
            breakpoints.push(b.clone());
        }
    }
    breakpoints.push(hi);

    let scale = mass.recip();
    let mut segments = Vec::with_capacity(breakpoints.len() - 1);
    for w in breakpoints.windows(2) {
        let segment = match coverage(&pdf.breakpoints, &w[0], &w[1])? {
            Coverage::Inside(i) => {
                Expr::product(vec![pdf.segments[i].clone(), scale.clone()]).simplified()
            }
            Coverage::Before | Coverage::After => Expr::zero(),
        };
        segments.push(segment);
    }
    Piecewise::from_parts(segments, breakpoints, Kind::Continuous, Form::Pdf)
}

fn truncate_discrete(pdf: &Piecewise, lo: &Expr, hi: &Expr) -> Result<Piecewise> {
    let mut atoms = Vec::new();
    let mut probs = Vec::new();
    for (atom, p) in pdf.breakpoints.iter().zip(&pdf.segments) {
        if ordered(atom, lo)? != Ordering::Less && ordered(atom, hi)? != Ordering::Greater {
            atoms.push(atom.clone());
            probs.push(p.clone());
        }
    }
    if atoms.is_empty() {
        return Err(DistError::domain(format!("no atom lies in [{lo}, {hi}]")));
    }
    let mass = Expr::sum(probs.clone()).simplified();
    if mass.as_number().is_some_and(|m| m <= 0.0) {
        return Err(DistError::domain(format!("[{lo}, {hi}] carries no probability")));
    }
    let scale = mass.recip();
    let probs = probs
        .into_iter()
        .map(|p| Expr::product(vec![p, scale.clone()]).simplified())
        .collect();
    Piecewise::from_parts(probs, atoms, Kind::Discrete, Form::Pdf)
}
