//! Product of two independent random variables.
//!
//! Both supports are split at zero so every pair of segments spans a rectangle
//! `[a, b] x [c, d]` inside one sign quadrant. The corners `ac, ad, bc, bd` bound the
//! values `v = xy` the rectangle can produce; the union of all corners is the output
//! partition. For `v` in one piece of that partition the admissible `x` form the interval
//! `[a, b]` cut by the hyperbola crossings `v/c` and `v/d`, and the rectangle contributes
//! `integral of f(x) g(v/x) / |x| dx` over it. Which bound is active is constant on each
//! piece and is read off at the piece's test point.

use std::cmp::Ordering;

use tracing::debug;

use super::combine::discrete_product;
use super::support::{Probe, ordered, sort_unique};
use super::{DUMMY, Form, Kind, Piecewise, VAR};
use crate::calculus::integrate_with;
use crate::core::{Assumptions, Sign};
use crate::error::{DistError, Result};
use crate::Expr;

/// Distribution of `X * Y` for independent `X` and `Y`.
///
/// ```
/// use symb_prob::{catalog, product};
///
/// let u = catalog::uniform(0.0, 1.0).unwrap();
/// let p = product(&u, &u).unwrap();
/// let f = p.pdf_at(0.5).unwrap().to_f64().unwrap();
/// assert!((f - 2.0_f64.ln()).abs() < 1e-9);
/// ```
pub fn product(x: &Piecewise, y: &Piecewise) -> Result<Piecewise> {
    x.require_same_kind(y)?;
    match x.kind {
        Kind::Discrete => discrete_product(x, y),
        Kind::Continuous => continuous_product(&x.pdf()?, &y.pdf()?),
    }
}

/// A piece of one operand lying on one side of zero.
#[derive(Debug, Clone)]
struct Strip {
    lo: Expr,
    hi: Expr,
    density: Expr,
    sign: Sign,
}

fn strips(pdf: &Piecewise) -> Result<Vec<Strip>> {
    let zero = Expr::zero();
    let mut out = Vec::with_capacity(pdf.segments.len() + 1);
    for (i, density) in pdf.segments.iter().enumerate() {
        if density.is_number_eq(0.0) {
            continue;
        }
        let (lo, hi) = pdf.interval(i);
        let below = ordered(lo, &zero)? == Ordering::Less;
        let above = ordered(hi, &zero)? == Ordering::Greater;
        let mut push = |lo: &Expr, hi: &Expr, sign| {
            out.push(Strip {
                lo: lo.clone(),
                hi: hi.clone(),
                density: density.clone(),
                sign,
            });
        };
        match (below, above) {
            (true, true) => {
                push(lo, &zero, Sign::Negative);
                push(&zero, hi, Sign::Positive);
            }
            (true, false) => push(lo, hi, Sign::Negative),
            _ => push(lo, hi, Sign::Positive),
        }
    }
    Ok(out)
}

fn sign_of_value(e: &Expr) -> Result<Sign> {
    Ok(match ordered(e, &Expr::zero())? {
        Ordering::Less => Sign::Negative,
        Ordering::Equal => Sign::Zero,
        Ordering::Greater => Sign::Positive,
    })
}

/// Corner product with `0 * inf = 0`.
fn corner(p: &Expr, q: &Expr) -> Result<Expr> {
    if p.is_number_eq(0.0) || q.is_number_eq(0.0) {
        return Ok(Expr::zero());
    }
    if p.is_infinite() || q.is_infinite() {
        let positive = sign_of_value(p)? == sign_of_value(q)?;
        return Ok(if positive {
            Expr::infinity()
        } else {
            Expr::neg_infinity()
        });
    }
    Ok(Expr::product(vec![p.clone(), q.clone()]).simplified())
}

/// Where `v / x` meets the bound `q` on the side of zero given by `sign`.
fn crossing(q: &Expr, sign: Sign) -> Expr {
    if q.is_number_eq(0.0) {
        if sign == Sign::Negative {
            Expr::neg_infinity()
        } else {
            Expr::infinity()
        }
    } else if q.is_infinite() {
        Expr::zero()
    } else {
        Expr::div_expr(Expr::symbol(VAR), q.clone()).simplified()
    }
}

struct Rectangle<'a> {
    x: &'a Strip,
    y: &'a Strip,
    lo: Expr,
    hi: Expr,
}

impl Rectangle<'_> {
    /// `f(t) g(v/t) / |t|` in the dummy `t`, with `v` the output variable.
    fn integrand(&self) -> Expr {
        let t = Expr::symbol(DUMMY);
        let ratio = Expr::div_expr(Expr::symbol(VAR), t.clone());
        let abs_recip = match self.x.sign {
            Sign::Negative => Expr::product(vec![Expr::number(-1.0), t.clone().recip()]),
            _ => t.clone().recip(),
        };
        Expr::product(vec![
            self.x.density.substitute(VAR, &t),
            self.y.density.substitute(VAR, &ratio),
            abs_recip,
        ])
    }

    fn covers(&self, lo: &Expr, hi: &Expr) -> Result<bool> {
        Ok(ordered(&self.lo, lo)? != Ordering::Greater
            && ordered(hi, &self.hi)? != Ordering::Greater)
    }

    /// Contribution to the output density on `[v0, v1]`, or `None` when the admissible
    /// `x`-interval is empty there.
    fn contribution(&self, v0: &Expr, v1: &Expr, probe: &Probe) -> Result<Option<Expr>> {
        let v = probe.test_point(v0, v1).ok_or_else(|| {
            DistError::parameter(format!("no numeric test point on [{v0}, {v1}]"))
        })?;
        let eval = |e: &Expr| {
            probe.eval_at(e, VAR, v).ok_or_else(|| {
                DistError::parameter(format!("cannot evaluate {e} at {VAR} = {v}"))
            })
        };

        let q1 = crossing(&self.y.lo, self.x.sign);
        let q2 = crossing(&self.y.hi, self.x.sign);
        let (n1, n2) = (eval(&q1)?, eval(&q2)?);
        let ((near, near_v), (far, far_v)) = if n1 <= n2 {
            ((q1, n1), (q2, n2))
        } else {
            ((q2, n2), (q1, n1))
        };

        let (a, b) = (eval(&self.x.lo)?, eval(&self.x.hi)?);
        let (lower, lower_v) = if a >= near_v {
            (self.x.lo.clone(), a)
        } else {
            (near, near_v)
        };
        let (upper, upper_v) = if b <= far_v {
            (self.x.hi.clone(), b)
        } else {
            (far, far_v)
        };
        if lower_v >= upper_v {
            return Ok(None);
        }

        let v_sign = if eval(v0)? >= 0.0 {
            Sign::Positive
        } else {
            Sign::Negative
        };
        let assumptions = Assumptions::positive_parameters()
            .with(DUMMY, self.x.sign)
            .with(VAR, v_sign);
        let part = integrate_with(&self.integrand(), DUMMY, &lower, &upper, &assumptions)?;
        Ok(Some(part))
    }
}

fn continuous_product(fx: &Piecewise, fy: &Piecewise) -> Result<Piecewise> {
    let (xs, ys) = (strips(fx)?, strips(fy)?);
    let mut params = fx.parameters();
    params.extend(fy.parameters());
    let probe = Probe::for_params(&params);

    let mut rectangles = Vec::with_capacity(xs.len() * ys.len());
    let mut ends = Vec::new();
    for x in &xs {
        for y in &ys {
            let corners = [
                corner(&x.lo, &y.lo)?,
                corner(&x.lo, &y.hi)?,
                corner(&x.hi, &y.lo)?,
                corner(&x.hi, &y.hi)?,
            ];
            let sorted = sort_unique(corners.to_vec())?;
            let (Some(lo), Some(hi)) = (sorted.first(), sorted.last()) else {
                continue;
            };
            if sorted.len() < 2 {
                continue;
            }
            debug!(
                x = %format!("[{}, {}]", x.lo, x.hi),
                y = %format!("[{}, {}]", y.lo, y.hi),
                image = %format!("[{lo}, {hi}]"),
                "product rectangle"
            );
            ends.extend(sorted.iter().cloned());
            rectangles.push(Rectangle {
                x,
                y,
                lo: lo.clone(),
                hi: hi.clone(),
            });
        }
    }
    if rectangles.is_empty() {
        return Err(DistError::domain("the product has no probability mass"));
    }

    let partition = sort_unique(ends)?;
    let mut segments = Vec::with_capacity(partition.len() - 1);
    for w in partition.windows(2) {
        let mut parts = Vec::new();
        for rect in &rectangles {
            if rect.covers(&w[0], &w[1])?
                && let Some(part) = rect.contribution(&w[0], &w[1], &probe)?
            {
                parts.push(part);
            }
        }
        segments.push(Expr::sum(parts).simplified());
    }
    Piecewise::from_parts(segments, partition, Kind::Continuous, Form::Pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::catalog;
    use crate::tests::numeric_mass;

    #[test]
    fn test_uniform_product_density() {
        let u = catalog::uniform(0.0, 1.0).unwrap();
        let p = product(&u, &u).unwrap();
        assert_eq!(p.numeric_breakpoints().unwrap(), vec![0.0, 1.0]);
        let f = p.pdf_at(0.25).unwrap().to_f64().unwrap();
        assert!((f + 0.25_f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_sign_product_has_unit_mass() {
        let x = catalog::uniform(-1.0, 2.0).unwrap();
        let y = catalog::uniform(-1.0, 1.0).unwrap();
        let p = product(&x, &y).unwrap();
        assert_eq!(p.numeric_breakpoints().unwrap(), vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert!((numeric_mass(&p) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_negative_times_negative() {
        let x = catalog::uniform(-2.0, -1.0).unwrap();
        let p = product(&x, &x).unwrap();
        assert_eq!(p.numeric_breakpoints().unwrap(), vec![1.0, 2.0, 4.0]);
        assert!((numeric_mass(&p) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_corner_conventions() {
        assert_eq!(corner(&Expr::zero(), &Expr::infinity()).unwrap(), Expr::zero());
        assert_eq!(
            corner(&Expr::number(-1.0), &Expr::infinity()).unwrap(),
            Expr::neg_infinity()
        );
    }

    #[test]
    fn test_strips_split_at_zero() {
        let u = catalog::uniform(-1.0, 1.0).unwrap();
        let s = strips(&u).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].sign, Sign::Negative);
        assert_eq!(s[1].lo, Expr::zero());
    }
}
