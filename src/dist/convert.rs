//! Conversion between the six functional forms, and evaluation of a form at a point.
//!
//! Conversions walk a route table keyed by `(kind, from, to)`: each entry names the next
//! form on the shortest path, and each hop is a pure function of the distribution.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::support::{Probe, compare, edge_value, ordered, segment_assumptions, select_branch};
use super::{DUMMY, INVERSE_VAR, Kind, Piecewise, VAR, sample};
use crate::calculus::{Side, integrate_with, solve};
use crate::error::{DistError, Result};
use crate::Expr;

/// Functional form carried by a distribution's segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    /// Density or probability mass
    Pdf,
    /// Cumulative distribution `P(X <= x)`
    Cdf,
    /// Survivor function; `P(X > x)` continuous, `P(X >= x)` discrete
    Sf,
    /// Hazard function
    Hf,
    /// Cumulative hazard `-ln S`
    Chf,
    /// Inverse of the CDF, over probabilities
    Idf,
}

impl Form {
    pub const ALL: [Form; 6] = [Form::Pdf, Form::Cdf, Form::Sf, Form::Hf, Form::Chf, Form::Idf];
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Form::Pdf => "pdf",
            Form::Cdf => "cdf",
            Form::Sf => "sf",
            Form::Hf => "hf",
            Form::Chf => "chf",
            Form::Idf => "idf",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Form {
    type Err = DistError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Form::ALL
            .into_iter()
            .find(|f| f.to_string() == lower)
            .ok_or_else(|| DistError::structural(format!("unknown functional form '{s}'")))
    }
}

// =============================================================================
// ROUTE TABLE
// =============================================================================

type Hop = fn(&Piecewise) -> Result<Piecewise>;

static CONTINUOUS_EDGES: [(Form, Form, Hop); 13] = [
    (Form::Pdf, Form::Cdf, continuous::pdf_to_cdf),
    (Form::Pdf, Form::Hf, continuous::pdf_to_hf),
    (Form::Cdf, Form::Pdf, continuous::cdf_to_pdf),
    (Form::Cdf, Form::Sf, complement),
    (Form::Cdf, Form::Idf, continuous::invert),
    (Form::Sf, Form::Cdf, complement),
    (Form::Sf, Form::Pdf, continuous::sf_to_pdf),
    (Form::Sf, Form::Chf, sf_to_chf),
    (Form::Chf, Form::Sf, chf_to_sf),
    (Form::Chf, Form::Hf, continuous::chf_to_hf),
    (Form::Hf, Form::Chf, continuous::hf_to_chf),
    (Form::Hf, Form::Pdf, continuous::hf_to_pdf),
    (Form::Idf, Form::Cdf, continuous::invert),
];

static DISCRETE_EDGES: [(Form, Form, Hop); 12] = [
    (Form::Pdf, Form::Cdf, discrete::pdf_to_cdf),
    (Form::Pdf, Form::Sf, discrete::pdf_to_sf),
    (Form::Pdf, Form::Hf, discrete::pdf_to_hf),
    (Form::Cdf, Form::Pdf, discrete::cdf_to_pdf),
    (Form::Cdf, Form::Sf, discrete::cdf_to_sf),
    (Form::Cdf, Form::Idf, discrete::swap_roles),
    (Form::Sf, Form::Cdf, discrete::sf_to_cdf),
    (Form::Sf, Form::Pdf, discrete::sf_to_pdf),
    (Form::Sf, Form::Chf, sf_to_chf),
    (Form::Chf, Form::Sf, chf_to_sf),
    (Form::Hf, Form::Pdf, discrete::hf_to_pdf),
    (Form::Idf, Form::Cdf, discrete::swap_roles),
];

fn edges(kind: Kind) -> &'static [(Form, Form, Hop)] {
    match kind {
        Kind::Continuous => &CONTINUOUS_EDGES,
        Kind::Discrete => &DISCRETE_EDGES,
    }
}

static ROUTES: OnceLock<FxHashMap<(Kind, Form, Form), Form>> = OnceLock::new();

/// Breadth-first search from every form, recording the first hop towards each target.
fn build_routes() -> FxHashMap<(Kind, Form, Form), Form> {
    let mut routes = FxHashMap::default();
    for kind in [Kind::Continuous, Kind::Discrete] {
        for from in Form::ALL {
            let mut first_hop: FxHashMap<Form, Form> = FxHashMap::default();
            let mut queue = VecDeque::from([from]);
            while let Some(current) = queue.pop_front() {
                for (_, next, _) in edges(kind).iter().filter(|(a, _, _)| *a == current) {
                    if *next == from || first_hop.contains_key(next) {
                        continue;
                    }
                    let hop = first_hop.get(&current).copied().unwrap_or(*next);
                    first_hop.insert(*next, hop);
                    queue.push_back(*next);
                }
            }
            for (to, hop) in first_hop {
                routes.insert((kind, from, to), hop);
            }
        }
    }
    routes
}

fn next_hop(kind: Kind, from: Form, to: Form) -> Option<Form> {
    ROUTES
        .get_or_init(build_routes)
        .get(&(kind, from, to))
        .copied()
}

fn hop_fn(kind: Kind, from: Form, to: Form) -> Option<Hop> {
    edges(kind)
        .iter()
        .find(|(a, b, _)| *a == from && *b == to)
        .map(|(_, _, hop)| *hop)
}

impl Piecewise {
    /// The same distribution in another functional form.
    pub fn to_form(&self, target: Form) -> Result<Piecewise> {
        let mut current = self.clone();
        while current.form != target {
            let (kind, from) = (current.kind, current.form);
            let next = next_hop(kind, from, target).ok_or_else(|| {
                DistError::structural(format!("no conversion from {kind} {from} to {target}"))
            })?;
            let hop = hop_fn(kind, from, next).ok_or_else(|| {
                DistError::structural(format!("missing {kind} conversion {from} -> {next}"))
            })?;
            debug!(%kind, %from, to = %next, "form conversion");
            current = hop(&current)?;
        }
        Ok(current)
    }

    pub fn pdf(&self) -> Result<Piecewise> {
        self.to_form(Form::Pdf)
    }

    pub fn cdf(&self) -> Result<Piecewise> {
        self.to_form(Form::Cdf)
    }

    pub fn sf(&self) -> Result<Piecewise> {
        self.to_form(Form::Sf)
    }

    pub fn hf(&self) -> Result<Piecewise> {
        self.to_form(Form::Hf)
    }

    pub fn chf(&self) -> Result<Piecewise> {
        self.to_form(Form::Chf)
    }

    pub fn idf(&self) -> Result<Piecewise> {
        self.to_form(Form::Idf)
    }

    /// Density (or mass) at a point of the support.
    pub fn pdf_at(&self, point: impl Into<Expr>) -> Result<Expr> {
        self.value_at(Form::Pdf, &point.into())
    }

    pub fn cdf_at(&self, point: impl Into<Expr>) -> Result<Expr> {
        self.value_at(Form::Cdf, &point.into())
    }

    pub fn sf_at(&self, point: impl Into<Expr>) -> Result<Expr> {
        self.value_at(Form::Sf, &point.into())
    }

    pub fn hf_at(&self, point: impl Into<Expr>) -> Result<Expr> {
        self.value_at(Form::Hf, &point.into())
    }

    pub fn chf_at(&self, point: impl Into<Expr>) -> Result<Expr> {
        self.value_at(Form::Chf, &point.into())
    }

    /// Quantile at probability `u`. Continuous distributions not already in IDF form are
    /// inverted numerically with the sampler's Newton iteration.
    pub fn idf_at(&self, u: impl Into<Expr>) -> Result<Expr> {
        self.value_at(Form::Idf, &u.into())
    }

    pub(crate) fn value_at(&self, form: Form, point: &Expr) -> Result<Expr> {
        if form == Form::Idf {
            return self.quantile(point);
        }
        let dist = self.to_form(form)?;
        match dist.kind {
            Kind::Continuous => {
                let i = dist.locate(point)?;
                let side = match compare(point, &dist.breakpoints[i + 1]) {
                    Some(Ordering::Equal) => Side::Left,
                    _ => Side::Right,
                };
                edge_value(&dist.segments[i], point, side)
            }
            Kind::Discrete => dist.step_value(point),
        }
    }

    /// Segment of a continuous distribution whose interval holds `point`.
    pub(crate) fn locate(&self, point: &Expr) -> Result<usize> {
        let (lo, hi) = self.support();
        if compare(point, lo) == Some(Ordering::Less) || compare(point, hi) == Some(Ordering::Greater)
        {
            return Err(DistError::domain(format!(
                "{point} is not within the support [{lo}, {hi}]"
            )));
        }
        let last = self.segments.len() - 1;
        for i in 0..last {
            match compare(point, &self.breakpoints[i + 1]) {
                Some(Ordering::Less) => return Ok(i),
                Some(_) => {}
                None => {
                    return Err(DistError::parameter(format!(
                        "cannot place {point} relative to breakpoint {}",
                        self.breakpoints[i + 1]
                    )));
                }
            }
        }
        Ok(last)
    }

    /// Step-function value of a discrete form: off-atom masses and hazards are zero,
    /// cumulative forms take the value of the governing atom.
    fn step_value(&self, point: &Expr) -> Result<Expr> {
        let (lo, hi) = self.support();
        if ordered(point, lo)? == Ordering::Less || ordered(point, hi)? == Ordering::Greater {
            return Err(DistError::domain(format!(
                "{point} is not within the support [{lo}, {hi}]"
            )));
        }
        let mut order = Vec::with_capacity(self.breakpoints.len());
        for atom in &self.breakpoints {
            order.push(ordered(atom, point)?);
        }
        let index = match self.form {
            Form::Pdf | Form::Hf => order.iter().position(|o| *o == Ordering::Equal),
            Form::Cdf => order.iter().rposition(|o| *o != Ordering::Greater),
            Form::Sf | Form::Chf => order.iter().position(|o| *o != Ordering::Less),
            Form::Idf => None,
        };
        Ok(index.map_or_else(Expr::zero, |i| self.segments[i].clone()))
    }

    fn quantile(&self, u: &Expr) -> Result<Expr> {
        if let Some(p) = u.to_f64()
            && !(0.0..=1.0).contains(&p)
        {
            return Err(DistError::domain(format!("{p} is not a probability")));
        }
        match (self.kind, self.form) {
            (Kind::Continuous, Form::Idf) => {
                let i = self.locate(u)?;
                edge_value(&self.segments[i], u, Side::Right)
            }
            (Kind::Continuous, _) => {
                let p = u.to_f64().ok_or_else(|| {
                    DistError::parameter(format!("quantile needs a numeric probability, got {u}"))
                })?;
                Ok(Expr::number(sample::idf_at(self, p)?))
            }
            (Kind::Discrete, _) => {
                let idf = self.idf()?;
                for (i, cum) in idf.breakpoints.iter().enumerate() {
                    if ordered(cum, u)? != Ordering::Less {
                        return Ok(idf.segments[i].clone());
                    }
                }
                let last = idf.segments.len() - 1;
                Ok(idf.segments[last].clone())
            }
        }
    }
}

// =============================================================================
// HOPS SHARED BY BOTH KINDS
// =============================================================================

fn map_segments(
    dist: &Piecewise,
    form: Form,
    f: impl Fn(&Expr) -> Result<Expr>,
) -> Result<Piecewise> {
    let segments = dist.segments.iter().map(f).collect::<Result<Vec<_>>>()?;
    Piecewise::from_parts(segments, dist.breakpoints.clone(), dist.kind, form)
}

/// `F = 1 - S` and `S = 1 - F` for continuous variables; discrete ones shift the atom.
fn complement(dist: &Piecewise) -> Result<Piecewise> {
    let target = if dist.form == Form::Cdf { Form::Sf } else { Form::Cdf };
    map_segments(dist, target, |s| {
        Ok(Expr::sub_expr(Expr::one(), s.clone()).simplified())
    })
}

fn sf_to_chf(dist: &Piecewise) -> Result<Piecewise> {
    map_segments(dist, Form::Chf, |s| Ok(s.clone().ln().negate().simplified()))
}

fn chf_to_sf(dist: &Piecewise) -> Result<Piecewise> {
    map_segments(dist, Form::Sf, |h| Ok(h.clone().negate().exp().simplified()))
}

mod continuous {
    use super::*;

    /// Running integral anchored at 0 on the left and continuous across breakpoints.
    fn cumulative(dist: &Piecewise, target: Form) -> Result<Piecewise> {
        let t = Expr::symbol(DUMMY);
        let x = Expr::symbol(VAR);
        let mut offset = Expr::zero();
        let mut segments = Vec::with_capacity(dist.segments.len());
        for (i, seg) in dist.segments.iter().enumerate() {
            let (lo, hi) = dist.interval(i);
            let assumptions = segment_assumptions(lo, hi);
            let integrand = seg.substitute(VAR, &t);
            let running = integrate_with(&integrand, DUMMY, lo, &x, &assumptions)?;
            segments.push(Expr::sum(vec![offset.clone(), running]).simplified());
            // a hazard diverges at the right end; that mass is never carried
            if i + 1 == dist.segments.len() {
                break;
            }
            let mass = integrate_with(&integrand, DUMMY, lo, hi, &assumptions)?;
            offset = Expr::sum(vec![offset, mass]).simplified();
        }
        Piecewise::from_parts(segments, dist.breakpoints.clone(), Kind::Continuous, target)
    }

    pub(super) fn pdf_to_cdf(dist: &Piecewise) -> Result<Piecewise> {
        cumulative(dist, Form::Cdf)
    }

    pub(super) fn hf_to_chf(dist: &Piecewise) -> Result<Piecewise> {
        cumulative(dist, Form::Chf)
    }

    pub(super) fn cdf_to_pdf(dist: &Piecewise) -> Result<Piecewise> {
        map_segments(dist, Form::Pdf, |s| Ok(s.diff(VAR)?))
    }

    pub(super) fn sf_to_pdf(dist: &Piecewise) -> Result<Piecewise> {
        map_segments(dist, Form::Pdf, |s| Ok(s.diff(VAR)?.negate().simplified()))
    }

    pub(super) fn chf_to_hf(dist: &Piecewise) -> Result<Piecewise> {
        map_segments(dist, Form::Hf, |s| Ok(s.diff(VAR)?))
    }

    /// `f = h * exp(-H)`
    pub(super) fn hf_to_pdf(dist: &Piecewise) -> Result<Piecewise> {
        let chf = cumulative(dist, Form::Chf)?;
        let segments = dist
            .segments
            .iter()
            .zip(&chf.segments)
            .map(|(h, cum)| Expr::product(vec![h.clone(), cum.clone().negate().exp()]).simplified())
            .collect();
        Piecewise::from_parts(segments, dist.breakpoints.clone(), Kind::Continuous, Form::Pdf)
    }

    /// `h = f / S`
    pub(super) fn pdf_to_hf(dist: &Piecewise) -> Result<Piecewise> {
        let sf = complement(&pdf_to_cdf(dist)?)?;
        let segments = dist
            .segments
            .iter()
            .zip(&sf.segments)
            .map(|(f, s)| Expr::div_expr(f.clone(), s.clone()).simplified())
            .collect();
        Piecewise::from_parts(segments, dist.breakpoints.clone(), Kind::Continuous, Form::Hf)
    }

    /// CDF to IDF and back: invert every non-flat segment, choosing the branch that maps
    /// the segment's test point back onto itself. The new breakpoints are the segment
    /// values at the old ones.
    pub(super) fn invert(dist: &Piecewise) -> Result<Piecewise> {
        let target = if dist.form == Form::Idf { Form::Cdf } else { Form::Idf };
        let probe = Probe::for_params(&dist.parameters());
        let v = Expr::symbol(INVERSE_VAR);
        let x = Expr::symbol(VAR);

        let mut segments = Vec::with_capacity(dist.segments.len());
        let mut breakpoints = vec![edge_value(&dist.segments[0], &dist.breakpoints[0], Side::Right)?];
        for (i, seg) in dist.segments.iter().enumerate() {
            // flat pieces carry no probability
            if !seg.contains_var(VAR) {
                continue;
            }
            let (lo, hi) = dist.interval(i);
            let candidates = solve(&Expr::sub_expr(seg.clone(), v.clone()), VAR)?;
            let inverse = select_branch(candidates, seg, lo, hi, &probe)?;
            segments.push(inverse.substitute(INVERSE_VAR, &x).simplified());
            breakpoints.push(edge_value(seg, hi, Side::Left)?);
        }
        Piecewise::from_parts(segments, breakpoints, Kind::Continuous, target)
    }
}

mod discrete {
    use super::*;

    fn build(dist: &Piecewise, segments: Vec<Expr>, form: Form) -> Result<Piecewise> {
        Piecewise::from_parts(segments, dist.breakpoints.clone(), Kind::Discrete, form)
    }

    /// `S_i = sum of f_j for j >= i`
    fn tail_sums(probs: &[Expr]) -> Vec<Expr> {
        let mut out = vec![Expr::zero(); probs.len()];
        let mut acc = Expr::zero();
        for (i, p) in probs.iter().enumerate().rev() {
            acc = Expr::sum(vec![acc, p.clone()]).simplified();
            out[i] = acc.clone();
        }
        out
    }

    pub(super) fn pdf_to_cdf(dist: &Piecewise) -> Result<Piecewise> {
        let mut acc = Expr::zero();
        let segments = dist
            .segments
            .iter()
            .map(|p| {
                acc = Expr::sum(vec![acc.clone(), p.clone()]).simplified();
                acc.clone()
            })
            .collect();
        build(dist, segments, Form::Cdf)
    }

    pub(super) fn cdf_to_pdf(dist: &Piecewise) -> Result<Piecewise> {
        let mut previous = Expr::zero();
        let segments = dist
            .segments
            .iter()
            .map(|f| {
                let p = Expr::sub_expr(f.clone(), previous.clone()).simplified();
                previous = f.clone();
                p
            })
            .collect();
        build(dist, segments, Form::Pdf)
    }

    pub(super) fn pdf_to_sf(dist: &Piecewise) -> Result<Piecewise> {
        build(dist, tail_sums(&dist.segments), Form::Sf)
    }

    /// `S_i = P(X >= x_i) = 1 - F_{i-1}`
    pub(super) fn cdf_to_sf(dist: &Piecewise) -> Result<Piecewise> {
        let segments = std::iter::once(Expr::one())
            .chain(
                dist.segments[..dist.segments.len() - 1]
                    .iter()
                    .map(|f| Expr::sub_expr(Expr::one(), f.clone()).simplified()),
            )
            .collect();
        build(dist, segments, Form::Sf)
    }

    /// `F_i = 1 - S_{i+1}`, and the last atom closes the mass at 1
    pub(super) fn sf_to_cdf(dist: &Piecewise) -> Result<Piecewise> {
        let segments = dist.segments[1..]
            .iter()
            .map(|s| Expr::sub_expr(Expr::one(), s.clone()).simplified())
            .chain(std::iter::once(Expr::one()))
            .collect();
        build(dist, segments, Form::Cdf)
    }

    pub(super) fn sf_to_pdf(dist: &Piecewise) -> Result<Piecewise> {
        let n = dist.segments.len();
        let segments = (0..n)
            .map(|i| match dist.segments.get(i + 1) {
                Some(next) => Expr::sub_expr(dist.segments[i].clone(), next.clone()).simplified(),
                None => dist.segments[i].clone(),
            })
            .collect();
        build(dist, segments, Form::Pdf)
    }

    /// `h_i = f_i / S_i`
    pub(super) fn pdf_to_hf(dist: &Piecewise) -> Result<Piecewise> {
        let segments = dist
            .segments
            .iter()
            .zip(tail_sums(&dist.segments))
            .map(|(f, s)| Expr::div_expr(f.clone(), s).simplified())
            .collect();
        build(dist, segments, Form::Hf)
    }

    /// `f_i = h_i * prod_{j<i} (1 - h_j)`
    pub(super) fn hf_to_pdf(dist: &Piecewise) -> Result<Piecewise> {
        let mut survival = Expr::one();
        let segments = dist
            .segments
            .iter()
            .map(|h| {
                let f = Expr::product(vec![h.clone(), survival.clone()]).simplified();
                survival = Expr::product(vec![
                    survival.clone(),
                    Expr::sub_expr(Expr::one(), h.clone()),
                ])
                .simplified();
                f
            })
            .collect();
        build(dist, segments, Form::Pdf)
    }

    /// CDF and IDF of a discrete variable are the same table read the other way round.
    /// Atoms of zero probability have no quantile and are dropped.
    pub(super) fn swap_roles(dist: &Piecewise) -> Result<Piecewise> {
        let target = if dist.form == Form::Idf { Form::Cdf } else { Form::Idf };
        let mut segments: Vec<Expr> = Vec::with_capacity(dist.segments.len());
        let mut breakpoints: Vec<Expr> = Vec::with_capacity(dist.segments.len());
        for (value, key) in dist.breakpoints.iter().zip(&dist.segments) {
            let repeated = breakpoints
                .last()
                .is_some_and(|last| compare(last, key) == Some(Ordering::Equal));
            if !repeated {
                segments.push(value.clone());
                breakpoints.push(key.clone());
            }
        }
        Piecewise::from_parts(segments, breakpoints, Kind::Discrete, target)
    }
}
