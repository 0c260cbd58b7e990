//! Support bookkeeping: ordering breakpoints, merging partitions, probing segments at
//! representative points and picking inverse branches.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::{BRANCH_TOLERANCE, DUMMY, INVERSE_VAR, VAR};
use crate::calculus::{Side, default_assumptions, has_non_finite, interval_assumptions, limit};
use crate::core::{Assumptions, Sign, sign_of};
use crate::error::{DistError, Result};
use crate::traits::{FLOAT_TOLERANCE, approx_eq};
use crate::Expr;

/// Order two breakpoints. Numbers compare numerically, symbolic values through their
/// difference's sign with parameters taken positive. `None` when undecidable.
pub(crate) fn compare(a: &Expr, b: &Expr) -> Option<Ordering> {
    if a == b {
        return Some(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (a.to_f64(), b.to_f64()) {
        if x.is_finite() && y.is_finite() && approx_eq(x, y, FLOAT_TOLERANCE) {
            return Some(Ordering::Equal);
        }
        return x.partial_cmp(&y);
    }
    match (a.infinity_sign(), b.infinity_sign()) {
        (Some(s), _) => return Some(if s > 0 { Ordering::Greater } else { Ordering::Less }),
        (_, Some(s)) => return Some(if s > 0 { Ordering::Less } else { Ordering::Greater }),
        _ => {}
    }
    let diff = Expr::sub_expr(a.clone(), b.clone()).simplified();
    match sign_of(&diff, &default_assumptions()) {
        Sign::Positive => Some(Ordering::Greater),
        Sign::Negative => Some(Ordering::Less),
        Sign::Zero => Some(Ordering::Equal),
        Sign::Unknown => None,
    }
}

pub(crate) fn ordered(a: &Expr, b: &Expr) -> Result<Ordering> {
    compare(a, b)
        .ok_or_else(|| DistError::parameter(format!("cannot order {a} and {b}")))
}

/// Sort values ascending, dropping duplicates.
pub(crate) fn sort_unique(values: Vec<Expr>) -> Result<Vec<Expr>> {
    let mut out: Vec<Expr> = Vec::with_capacity(values.len());
    for v in values {
        let mut at = out.len();
        let mut duplicate = false;
        for (i, existing) in out.iter().enumerate() {
            match ordered(&v, existing)? {
                Ordering::Less => {
                    at = i;
                    break;
                }
                Ordering::Equal => {
                    duplicate = true;
                    break;
                }
                Ordering::Greater => {}
            }
        }
        if !duplicate {
            out.insert(at, v);
        }
    }
    Ok(out)
}

/// Union of ascending breakpoint lists.
pub(crate) fn union_partition(lists: &[&[Expr]]) -> Result<Vec<Expr>> {
    let mut out: Vec<Expr> = Vec::new();
    for list in lists {
        out = merge_two(&out, list)?;
    }
    Ok(out)
}

fn merge_two(a: &[Expr], b: &[Expr]) -> Result<Vec<Expr>> {
    let mut out: Vec<Expr> = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let next = match (a.get(i), b.get(j)) {
            (Some(p), Some(q)) => match ordered(p, q)? {
                Ordering::Less => {
                    i += 1;
                    p
                }
                Ordering::Greater => {
                    j += 1;
                    q
                }
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                    p
                }
            },
            (Some(p), None) => {
                i += 1;
                p
            }
            (None, Some(q)) => {
                j += 1;
                q
            }
            (None, None) => break,
        };
        let repeated = out
            .last()
            .is_some_and(|last| compare(last, next) == Some(Ordering::Equal));
        if !repeated {
            out.push(next.clone());
        }
    }
    Ok(out)
}

/// Where a sub-interval of a union partition falls relative to one operand's support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Coverage {
    Before,
    Inside(usize),
    After,
}

/// Locate `[lo, hi]`, a piece of a refinement of `breakpoints`, within the operand.
pub(crate) fn coverage(breakpoints: &[Expr], lo: &Expr, hi: &Expr) -> Result<Coverage> {
    let last = breakpoints.len() - 1;
    if ordered(hi, &breakpoints[0])? != Ordering::Greater {
        return Ok(Coverage::Before);
    }
    if ordered(lo, &breakpoints[last])? != Ordering::Less {
        return Ok(Coverage::After);
    }
    for i in 0..last {
        if ordered(lo, &breakpoints[i + 1])? == Ordering::Less {
            return Ok(Coverage::Inside(i));
        }
    }
    Ok(Coverage::After)
}

/// Sort `(value, probability)` pairs by value and add probabilities of equal values.
pub(crate) fn merge_atoms(pairs: Vec<(Expr, Expr)>) -> Result<(Vec<Expr>, Vec<Expr>)> {
    let atoms = sort_unique(pairs.iter().map(|(v, _)| v.clone()).collect())?;
    let mut probs: Vec<Vec<Expr>> = vec![Vec::new(); atoms.len()];
    for (v, p) in pairs {
        let i = atoms
            .iter()
            .position(|a| compare(a, &v) == Some(Ordering::Equal))
            .ok_or_else(|| DistError::parameter(format!("lost atom {v} while merging")))?;
        probs[i].push(p);
    }
    let probs = probs
        .into_iter()
        .map(|ps| Expr::sum(ps).simplified())
        .collect();
    Ok((atoms, probs))
}

/// Sign and bound assumptions for integrating over `[lo, hi]` in either the dummy or the
/// variable.
pub(crate) fn segment_assumptions(lo: &Expr, hi: &Expr) -> Assumptions {
    let mut assumptions = interval_assumptions(DUMMY, lo, hi);
    let sign = assumptions.sign_of_symbol(DUMMY);
    assumptions.set(VAR, sign);
    let l = lo.to_f64().filter(|v| !v.is_nan()).unwrap_or(f64::NEG_INFINITY);
    let h = hi.to_f64().filter(|v| !v.is_nan()).unwrap_or(f64::INFINITY);
    assumptions.set_bounds(VAR, l, h);
    assumptions
}

/// Value of `seg` at a breakpoint, through a one-sided limit when substitution is singular
/// or the breakpoint infinite.
pub(crate) fn edge_value(seg: &Expr, at: &Expr, side: Side) -> Result<Expr> {
    if !at.is_infinite() {
        let direct = seg.substitute(VAR, at).simplified();
        if !has_non_finite(&direct) {
            return Ok(direct);
        }
    }
    Ok(limit(seg, VAR, at, side)?)
}

/// Numeric stand-ins for free parameters, used to probe segments at test points.
#[derive(Debug, Clone, Default)]
pub(crate) struct Probe {
    values: Vec<(String, f64)>,
}

impl Probe {
    pub(crate) fn for_params(params: &BTreeSet<String>) -> Self {
        let values = params
            .iter()
            .filter(|p| p.as_str() != VAR && p.as_str() != DUMMY && p.as_str() != INVERSE_VAR)
            .enumerate()
            .map(|(i, p)| (p.clone(), 1.13 + 0.41 * i as f64))
            .collect();
        Probe { values }
    }

    fn bindings(&self) -> HashMap<&str, f64> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v)).collect()
    }

    pub(crate) fn eval(&self, e: &Expr) -> Option<f64> {
        e.eval_with(&self.bindings())
    }

    pub(crate) fn eval_at(&self, e: &Expr, var: &str, x: f64) -> Option<f64> {
        let mut vars = self.bindings();
        vars.insert(var, x);
        e.eval_with(&vars)
    }

    /// Representative interior point: the midpoint, or an offset from the finite end.
    pub(crate) fn test_point(&self, lo: &Expr, hi: &Expr) -> Option<f64> {
        let (l, h) = (self.eval(lo)?, self.eval(hi)?);
        Some(match (l.is_finite(), h.is_finite()) {
            (true, true) => 0.5 * (l + h),
            (true, false) => l + 1.0,
            (false, true) => h - 1.0,
            (false, false) => 0.0,
        })
    }

    /// A spread of interior points for sign checks.
    pub(crate) fn test_points(&self, lo: &Expr, hi: &Expr) -> Vec<f64> {
        let (Some(l), Some(h)) = (self.eval(lo), self.eval(hi)) else {
            return Vec::new();
        };
        match (l.is_finite(), h.is_finite()) {
            (true, true) => [0.125, 0.375, 0.625, 0.875]
                .iter()
                .map(|k| l + k * (h - l))
                .collect(),
            (true, false) => [0.125, 0.5, 1.0, 2.0, 8.0].iter().map(|d| l + d).collect(),
            (false, true) => [0.125, 0.5, 1.0, 2.0, 8.0].iter().map(|d| h - d).collect(),
            (false, false) => vec![-4.0, -1.0, 0.0, 1.0, 4.0],
        }
    }
}

/// Pick the inverse of `forward` on `[lo, hi]` among `candidates` (functions of
/// [`INVERSE_VAR`]): the one that sends `forward(t)` back to the test point `t`.
pub(crate) fn select_branch(
    candidates: Vec<Expr>,
    forward: &Expr,
    lo: &Expr,
    hi: &Expr,
    probe: &Probe,
) -> Result<Expr> {
    let t = probe.test_point(lo, hi).ok_or_else(|| {
        DistError::parameter(format!("no numeric test point on [{lo}, {hi}]"))
    })?;
    let y = probe
        .eval_at(forward, VAR, t)
        .filter(|v| v.is_finite())
        .ok_or_else(|| DistError::inversion(format!("{forward} is not finite at {t}")))?;

    let total = candidates.len();
    let mut passing: Vec<Expr> = candidates
        .into_iter()
        .filter(|c| {
            probe
                .eval_at(c, INVERSE_VAR, y)
                .is_some_and(|v| approx_eq(v, t, BRANCH_TOLERANCE))
        })
        .collect();
    debug!(%forward, test_point = t, total, passing = passing.len(), "branch selection");

    match passing.len() {
        0 => Err(DistError::inversion(format!(
            "no inverse of {forward} maps {y} back to {t}"
        ))),
        1 => Ok(passing.remove(0)),
        n => Err(DistError::inversion(format!(
            "{n} inverses of {forward} map {y} back to {t}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> Expr {
        Expr::number(v)
    }

    #[test]
    fn test_compare_numbers_and_infinities() {
        assert_eq!(compare(&n(1.0), &n(2.0)), Some(Ordering::Less));
        assert_eq!(compare(&Expr::symbol("a"), &Expr::infinity()), Some(Ordering::Less));
        assert_eq!(compare(&Expr::neg_infinity(), &Expr::symbol("a")), Some(Ordering::Less));
        assert_eq!(compare(&Expr::symbol("a"), &n(0.0)), Some(Ordering::Greater));
        assert_eq!(compare(&Expr::symbol("a"), &Expr::symbol("b")), None);
    }

    #[test]
    fn test_union_partition() {
        let a = vec![n(0.0), n(1.0), n(3.0)];
        let b = vec![n(1.0), n(2.0)];
        let u = union_partition(&[&a, &b]).unwrap();
        assert_eq!(u, vec![n(0.0), n(1.0), n(2.0), n(3.0)]);
    }

    #[test]
    fn test_coverage() {
        let bps = vec![n(1.0), n(2.0), n(4.0)];
        assert_eq!(coverage(&bps, &n(0.0), &n(1.0)).unwrap(), Coverage::Before);
        assert_eq!(coverage(&bps, &n(2.0), &n(3.0)).unwrap(), Coverage::Inside(1));
        assert_eq!(coverage(&bps, &n(4.0), &Expr::infinity()).unwrap(), Coverage::After);
    }

    #[test]
    fn test_merge_atoms_adds_equal_values() {
        let pairs = vec![(n(2.0), n(0.25)), (n(1.0), n(0.5)), (n(2.0), n(0.25))];
        let (atoms, probs) = merge_atoms(pairs).unwrap();
        assert_eq!(atoms, vec![n(1.0), n(2.0)]);
        assert_eq!(probs, vec![n(0.5), n(0.5)]);
    }

    #[test]
    fn test_select_branch_picks_positive_root() {
        let forward = Expr::pow(Expr::symbol(VAR), n(2.0));
        let v = Expr::symbol(INVERSE_VAR);
        let candidates = vec![v.clone().sqrt(), v.sqrt().negate()];
        let probe = Probe::default();
        let picked = select_branch(candidates, &forward, &n(0.0), &n(2.0), &probe).unwrap();
        assert_eq!(picked.eval_at(INVERSE_VAR, 4.0), Some(2.0));
    }

    #[test]
    fn test_select_branch_rejects_ambiguity() {
        let forward = Expr::symbol(VAR);
        let v = Expr::symbol(INVERSE_VAR);
        let candidates = vec![v.clone(), v.abs()];
        let err = select_branch(candidates, &forward, &n(1.0), &n(2.0), &Probe::default());
        assert!(matches!(err, Err(DistError::Inversion(_))));
    }

    #[test]
    fn test_edge_value_uses_limits() {
        let seg = Expr::symbol(VAR).negate().exp();
        assert_eq!(edge_value(&seg, &Expr::infinity(), Side::Left).unwrap(), Expr::zero());
        assert_eq!(edge_value(&seg, &n(0.0), Side::Right).unwrap(), Expr::one());
    }
}
