//! Distribution of `g(X)` for a piecewise map `g`.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::debug;

use super::support::{
    Coverage, Probe, compare, coverage, edge_value, merge_atoms, ordered, select_branch, sort_unique,
    union_partition,
};
use super::{INVERSE_VAR, IntoSegments, Kind, Piecewise, VAR};
use crate::calculus::{Side, has_non_finite, solve};
use crate::dist::Form;
use crate::error::{DistError, Result};
use crate::Expr;

/// A piecewise map applied to a random variable: `segments[i]` (in `x`) holds on
/// `[breakpoints[i], breakpoints[i + 1]]`.
///
/// ```
/// use symb_prob::{Transform, catalog};
///
/// let u = catalog::uniform(0.0, 1.0).unwrap();
/// let y = u.transform(&Transform::function("x^2").unwrap()).unwrap();
/// let f = y.pdf_at(0.25).unwrap().to_f64().unwrap();
/// assert!((f - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    segments: Vec<Expr>,
    breakpoints: Vec<Expr>,
}

impl Transform {
    pub fn new<B: Into<Expr>>(
        segments: impl IntoSegments,
        breakpoints: impl IntoIterator<Item = B>,
    ) -> Result<Self> {
        let segments = segments.into_segments()?;
        let breakpoints: Vec<Expr> = breakpoints.into_iter().map(Into::into).collect();
        if segments.is_empty() || breakpoints.len() != segments.len() + 1 {
            return Err(DistError::structural(format!(
                "a transform with {} segments needs {} breakpoints, got {}",
                segments.len(),
                segments.len() + 1,
                breakpoints.len()
            )));
        }
        for pair in breakpoints.windows(2) {
            if let Some(Ordering::Greater | Ordering::Equal) =
                super::support::compare(&pair[0], &pair[1])
            {
                return Err(DistError::structural(format!(
                    "transform breakpoints are not ascending: {}, {}",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(Transform {
            segments,
            breakpoints,
        })
    }

    /// One expression over the whole real line.
    pub fn function(g: impl IntoSegments) -> Result<Self> {
        Self::new(g, [f64::NEG_INFINITY, f64::INFINITY])
    }

    pub fn segments(&self) -> &[Expr] {
        &self.segments
    }

    pub fn breakpoints(&self) -> &[Expr] {
        &self.breakpoints
    }

    fn parameters(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .segments
            .iter()
            .chain(&self.breakpoints)
            .flat_map(Expr::free_symbols)
            .collect();
        out.remove(VAR);
        out
    }

    /// Segment holding `point`; the last one includes its right end.
    fn piece_for(&self, point: &Expr) -> Result<usize> {
        let last = self.segments.len() - 1;
        if ordered(point, &self.breakpoints[0])? == Ordering::Less
            || ordered(point, &self.breakpoints[last + 1])? == Ordering::Greater
        {
            return Err(DistError::domain(format!("transform is not defined at {point}")));
        }
        for i in 0..last {
            if ordered(point, &self.breakpoints[i + 1])? == Ordering::Less {
                return Ok(i);
            }
        }
        Ok(last)
    }
}

/// Image of one monotone piece of the support and its density contribution there.
struct Image {
    lo: Expr,
    hi: Expr,
    density: Expr,
}

impl Piecewise {
    /// Distribution of `g(X)`.
    pub fn transform(&self, g: &Transform) -> Result<Piecewise> {
        match self.kind {
            Kind::Continuous => transform_continuous(self, g),
            Kind::Discrete => transform_discrete(self, g),
        }
    }
}

fn transform_continuous(x: &Piecewise, g: &Transform) -> Result<Piecewise> {
    let pdf = x.pdf()?;
    let (lo, hi) = pdf.support();

    let mut inner = Vec::new();
    for b in &g.breakpoints {
        if ordered(b, lo)? == Ordering::Greater && ordered(b, hi)? == Ordering::Less {
            inner.push(b.clone());
        }
    }
    let partition = union_partition(&[&pdf.breakpoints, &inner])?;

    let mut params = pdf.parameters();
    params.extend(g.parameters());
    let probe = Probe::for_params(&params);

    let mut images: Vec<Image> = Vec::new();
    for w in partition.windows(2) {
        let (a, b) = (&w[0], &w[1]);
        let Coverage::Inside(i) = coverage(&pdf.breakpoints, a, b)? else {
            continue;
        };
        let Coverage::Inside(j) = coverage(&g.breakpoints, a, b)? else {
            return Err(DistError::domain(format!(
                "transform is not defined on [{a}, {b}]"
            )));
        };
        let density = &pdf.segments[i];
        if density.is_number_eq(0.0) {
            continue;
        }
        let map = &g.segments[j];
        if !map.contains_var(VAR) {
            return Err(DistError::domain(format!(
                "transform {map} is constant on [{a}, {b}], which carries probability"
            )));
        }
        for (lo, hi) in monotone_pieces(map, a, b, &probe)? {
            images.push(image_of(density, map, &lo, &hi, &probe)?);
        }
    }
    if images.is_empty() {
        return Err(DistError::domain("the transform leaves no probability mass"));
    }

    let ends = sort_unique(
        images
            .iter()
            .flat_map(|im| [im.lo.clone(), im.hi.clone()])
            .collect(),
    )?;
    let mut segments = Vec::with_capacity(ends.len() - 1);
    for w in ends.windows(2) {
        let mut terms = Vec::new();
        for im in &images {
            let covers = ordered(&im.lo, &w[0])? != Ordering::Greater
                && ordered(&w[1], &im.hi)? != Ordering::Greater;
            if covers {
                terms.push(im.density.clone());
            }
        }
        segments.push(Expr::sum(terms).simplified());
    }
    Piecewise::from_parts(segments, ends, Kind::Continuous, Form::Pdf)
}

/// Split `[a, b]` at the interior zeros of `map'` so that `map` is monotone on each piece.
/// Zeros the solver cannot find are caught by a sign check of the slope.
fn monotone_pieces(map: &Expr, a: &Expr, b: &Expr, probe: &Probe) -> Result<Vec<(Expr, Expr)>> {
    let slope = map.diff(VAR)?;
    let mut cuts = Vec::new();
    if slope.contains_var(VAR)
        && let Ok(roots) = solve(&slope, VAR)
    {
        for r in roots {
            let inside = compare(&r, a) == Some(Ordering::Greater)
                && compare(&r, b) == Some(Ordering::Less);
            if inside {
                cuts.push(r);
            }
        }
    }
    let mut ends = vec![a.clone()];
    ends.extend(sort_unique(cuts)?);
    ends.push(b.clone());

    let pieces: Vec<(Expr, Expr)> = ends
        .windows(2)
        .map(|w| (w[0].clone(), w[1].clone()))
        .collect();
    for (lo, hi) in &pieces {
        let slopes: Vec<f64> = probe
            .test_points(lo, hi)
            .into_iter()
            .filter_map(|t| probe.eval_at(&slope, VAR, t))
            .filter(|d| d.is_finite() && *d != 0.0)
            .collect();
        if slopes.iter().any(|d| *d > 0.0) && slopes.iter().any(|d| *d < 0.0) {
            return Err(not_monotone(map, lo, hi));
        }
    }
    if pieces.len() > 1 {
        debug!(%map, %slope, pieces = pieces.len(), "split at critical points");
    }
    Ok(pieces)
}

fn not_monotone(map: &Expr, a: &Expr, b: &Expr) -> DistError {
    DistError::domain(format!("transform {map} is not monotone on [{a}, {b}]"))
}

/// Image of `[a, b]` under a map monotone there, with the change-of-variables density.
fn image_of(density: &Expr, map: &Expr, a: &Expr, b: &Expr, probe: &Probe) -> Result<Image> {
    let v = Expr::symbol(INVERSE_VAR);
    let y = Expr::symbol(VAR);
    let ya = edge_value(map, a, Side::Right)?;
    let yb = edge_value(map, b, Side::Left)?;
    let increasing = match ordered(&ya, &yb)? {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => return Err(not_monotone(map, a, b)),
    };

    let candidates = solve(&Expr::sub_expr(map.clone(), v), VAR)?;
    let inverse = select_branch(candidates, map, a, b, probe)?;
    let jacobian = inverse.diff(INVERSE_VAR)?;
    let jacobian = if increasing { jacobian } else { jacobian.negate() };
    let contribution = Expr::product(vec![density.substitute(VAR, &inverse), jacobian])
        .substitute(INVERSE_VAR, &y)
        .simplified();
    debug!(piece = %format!("[{a}, {b}]"), %map, %inverse, %contribution, "transform piece");

    let (lo, hi) = if increasing { (ya, yb) } else { (yb, ya) };
    Ok(Image {
        lo,
        hi,
        density: contribution,
    })
}

/// Every atom moves to its image; atoms landing on the same value pool their mass.
fn transform_discrete(x: &Piecewise, g: &Transform) -> Result<Piecewise> {
    let pdf = x.pdf()?;
    let mut pairs = Vec::with_capacity(pdf.segments.len());
    for (atom, p) in pdf.breakpoints.iter().zip(&pdf.segments) {
        let map = &g.segments[g.piece_for(atom)?];
        let image = map.substitute(VAR, atom).simplified();
        if has_non_finite(&image) {
            return Err(DistError::domain(format!("{map} is not finite at {atom}")));
        }
        pairs.push((image, p.clone()));
    }
    let (atoms, probs) = merge_atoms(pairs)?;
    Piecewise::from_parts(probs, atoms, Kind::Discrete, Form::Pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::catalog;

    fn pdf_value(x: &Piecewise, at: f64) -> f64 {
        x.pdf_at(at).unwrap().to_f64().unwrap()
    }

    #[test]
    fn test_transform_validation() {
        assert!(Transform::new(vec!["x", "x"], [0.0, 1.0]).is_err());
        assert!(Transform::new("x", [1.0, 0.0]).is_err());
    }

    #[test]
    fn test_square_of_uniform() {
        let u = catalog::uniform(0.0, 1.0).unwrap();
        let y = u.transform(&Transform::function("x^2").unwrap()).unwrap();
        assert_eq!(y.numeric_breakpoints().unwrap(), vec![0.0, 1.0]);
        assert!((pdf_value(&y, 0.25) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decreasing_map() {
        let u = catalog::uniform(0.0, 1.0).unwrap();
        let y = u.transform(&Transform::function("-x").unwrap()).unwrap();
        assert_eq!(y.numeric_breakpoints().unwrap(), vec![-1.0, 0.0]);
        assert!((pdf_value(&y, -0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_many_to_one_square() {
        let u = catalog::uniform(-1.0, 1.0).unwrap();
        let g = Transform::new(vec!["x^2", "x^2"], [f64::NEG_INFINITY, 0.0, f64::INFINITY])
            .unwrap();
        let y = u.transform(&g).unwrap();
        assert_eq!(y.numeric_breakpoints().unwrap(), vec![0.0, 1.0]);
        // f(y) = 1 / (2 sqrt(y))
        assert!((pdf_value(&y, 0.25) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_log_of_exponential() {
        let x = catalog::exponential(1.0).unwrap();
        let y = x.transform(&Transform::function("ln(x)").unwrap()).unwrap();
        let (lo, hi) = y.support();
        assert_eq!(lo, &Expr::neg_infinity());
        assert_eq!(hi, &Expr::infinity());
        // Gumbel-type density exp(y - exp(y))
        let expected = (0.5_f64 - 0.5_f64.exp()).exp();
        assert!((pdf_value(&y, 0.5) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_constant_piece_is_domain_error() {
        let u = catalog::uniform(0.0, 2.0).unwrap();
        let g = Transform::new(vec!["x", "1"], [0.0, 1.0, 2.0]).unwrap();
        assert!(matches!(u.transform(&g), Err(DistError::Domain(_))));
    }

    #[test]
    fn test_square_of_straddling_uniform_splits_at_the_vertex() {
        let u = catalog::uniform(-1.0, 2.0).unwrap();
        let y = u.transform(&Transform::function("x^2").unwrap()).unwrap();
        assert_eq!(y.numeric_breakpoints().unwrap(), vec![0.0, 1.0, 4.0]);
        // both branches below 1, only the right one above
        assert!((pdf_value(&y, 0.25) - 2.0 / 3.0).abs() < 1e-12);
        assert!((pdf_value(&y, 2.25) - 1.0 / 9.0).abs() < 1e-12);
        let total = y.cdf_at(4.0).unwrap().to_f64().unwrap();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sine_past_its_peak() {
        let u = catalog::uniform(0.0, 4.0).unwrap();
        let y = u.transform(&Transform::function("sin(x)").unwrap()).unwrap();
        let bps = y.numeric_breakpoints().unwrap();
        assert_eq!(bps.len(), 3);
        assert!((bps[0] - 4.0_f64.sin()).abs() < 1e-12);
        assert!(bps[1].abs() < 1e-12 && (bps[2] - 1.0).abs() < 1e-12);
        let arc = 0.25 / 0.75_f64.sqrt();
        assert!((pdf_value(&y, 0.5) - 2.0 * arc).abs() < 1e-9);
        assert!((pdf_value(&y, -0.5) - arc).abs() < 1e-9);
        assert!((crate::tests::numeric_mass(&y) - 1.0).abs() < 5e-3);
    }

    #[test]
    fn test_unsolved_turning_point_is_reported() {
        let u = catalog::uniform(-2.0, 1.0).unwrap();
        let err = u
            .transform(&Transform::function("x^2 + exp(x)").unwrap())
            .unwrap_err();
        assert!(matches!(&err, DistError::Domain(m) if m.contains("not monotone")), "{err}");
    }

    #[test]
    fn test_discrete_images_merge() {
        let d = Piecewise::discrete(vec![0.25, 0.5, 0.25], [-1.0, 0.0, 1.0]).unwrap();
        let y = d.transform(&Transform::function("x^2").unwrap()).unwrap();
        assert_eq!(y.numeric_breakpoints().unwrap(), vec![0.0, 1.0]);
        assert_eq!(y.segments()[1].as_number(), Some(0.5));
    }
}
