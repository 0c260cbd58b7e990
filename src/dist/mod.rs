//! Piecewise probability distributions.
//!
//! A [`Piecewise`] stores one symbolic expression per interval of its support (continuous)
//! or one per atom (discrete), tagged with the functional form those expressions carry.
//! Every segment is written in the variable [`VAR`]; parameters are ordinary symbols until
//! [`Piecewise::substitute`] binds them.
//!
//! Values are immutable: conversions and combinators return new distributions.
//!
//! # Example
//! ```
//! use symb_prob::{Piecewise, catalog};
//!
//! let u = catalog::uniform(0.0, 1.0).unwrap();
//! assert_eq!(u.cdf_at(0.5).unwrap().to_f64(), Some(0.5));
//! ```

pub mod catalog;
mod combine;
mod convert;
mod moments;
mod order;
mod product;
mod sample;
mod support;
mod transform;

pub use combine::{
    convolution, convolution_iid, maximum, maximum_iid, minimum, minimum_iid, mixture,
    product_iid,
};
pub use convert::Form;
pub use order::{order_stat, truncate};
pub use product::product;
pub use sample::{Sampler, idf_at};
pub use transform::Transform;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::calculus::integrate;
use crate::error::{DistError, Result};
use crate::{Expr, parse};
use support::{Probe, compare};

/// The random variable's symbol in every segment.
pub const VAR: &str = "x";

/// Absolute tolerance when checking that an inverse branch maps a test point back.
pub const BRANCH_TOLERANCE: f64 = 1e-5;

/// Tolerance on total probability mass.
pub const MASS_TOLERANCE: f64 = 1e-4;

/// Newton refinement steps per variate.
pub const NEWTON_ITERATIONS: usize = 10;

/// Integration dummy standing in for [`VAR`]
pub(crate) const DUMMY: &str = "_t";

/// Right-hand side of an equation being inverted
pub(crate) const INVERSE_VAR: &str = "_v";

/// Whether the variable takes values in intervals or at atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Continuous,
    Discrete,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Continuous => write!(f, "continuous"),
            Kind::Discrete => write!(f, "discrete"),
        }
    }
}

impl FromStr for Kind {
    type Err = DistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" => Ok(Kind::Continuous),
            "discrete" => Ok(Kind::Discrete),
            other => Err(DistError::structural(format!(
                "random variable must be continuous or discrete, got '{other}'"
            ))),
        }
    }
}

/// Anything that can be the segment list of a [`Piecewise`]. A single expression is
/// wrapped into a one-element list; strings are parsed.
pub trait IntoSegments {
    fn into_segments(self) -> Result<Vec<Expr>>;
}

impl IntoSegments for Expr {
    fn into_segments(self) -> Result<Vec<Expr>> {
        Ok(vec![self])
    }
}

impl IntoSegments for f64 {
    fn into_segments(self) -> Result<Vec<Expr>> {
        Ok(vec![Expr::number(self)])
    }
}

impl IntoSegments for &str {
    fn into_segments(self) -> Result<Vec<Expr>> {
        Ok(vec![parse(self)?])
    }
}

impl IntoSegments for Vec<Expr> {
    fn into_segments(self) -> Result<Vec<Expr>> {
        Ok(self)
    }
}

impl IntoSegments for Vec<f64> {
    fn into_segments(self) -> Result<Vec<Expr>> {
        Ok(self.into_iter().map(Expr::number).collect())
    }
}

impl IntoSegments for Vec<&str> {
    fn into_segments(self) -> Result<Vec<Expr>> {
        self.into_iter()
            .map(|s| parse(s).map_err(DistError::from))
            .collect()
    }
}

impl<const N: usize> IntoSegments for [&str; N] {
    fn into_segments(self) -> Result<Vec<Expr>> {
        self.to_vec().into_segments()
    }
}

impl<const N: usize> IntoSegments for [f64; N] {
    fn into_segments(self) -> Result<Vec<Expr>> {
        self.to_vec().into_segments()
    }
}

impl<const N: usize> IntoSegments for [Expr; N] {
    fn into_segments(self) -> Result<Vec<Expr>> {
        Ok(self.to_vec())
    }
}

/// A random variable as ordered symbolic segments over an ordered breakpoint list.
///
/// Continuous: `breakpoints.len() == segments.len() + 1`, segment `i` lives on
/// `[breakpoints[i], breakpoints[i + 1]]`. Discrete: one atom per segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Piecewise {
    pub(crate) segments: Vec<Expr>,
    pub(crate) breakpoints: Vec<Expr>,
    pub(crate) kind: Kind,
    pub(crate) form: Form,
}

impl Piecewise {
    /// Build and validate a distribution.
    ///
    /// ```
    /// use symb_prob::{Kind, Form, Piecewise};
    ///
    /// let x = Piecewise::new("2*x", [0.0, 1.0], Kind::Continuous, Form::Pdf).unwrap();
    /// assert_eq!(x.segments().len(), 1);
    /// assert!(Piecewise::new(1.0, [1.0, 0.0], Kind::Continuous, Form::Pdf).is_err());
    /// ```
    pub fn new<B: Into<Expr>>(
        segments: impl IntoSegments,
        breakpoints: impl IntoIterator<Item = B>,
        kind: Kind,
        form: Form,
    ) -> Result<Self> {
        let segments = segments.into_segments()?;
        let breakpoints = breakpoints.into_iter().map(Into::into).collect();
        Self::from_parts(segments, breakpoints, kind, form)
    }

    /// Continuous density.
    pub fn continuous<B: Into<Expr>>(
        segments: impl IntoSegments,
        breakpoints: impl IntoIterator<Item = B>,
    ) -> Result<Self> {
        Self::new(segments, breakpoints, Kind::Continuous, Form::Pdf)
    }

    /// Discrete probability mass function: `segments[i]` is `P(X = breakpoints[i])`.
    pub fn discrete<B: Into<Expr>>(
        segments: impl IntoSegments,
        breakpoints: impl IntoIterator<Item = B>,
    ) -> Result<Self> {
        Self::new(segments, breakpoints, Kind::Discrete, Form::Pdf)
    }

    /// Constructor taking the kind and form as labels, e.g. `("continuous", "cdf")`.
    pub fn with_labels<B: Into<Expr>>(
        segments: impl IntoSegments,
        breakpoints: impl IntoIterator<Item = B>,
        kind: &str,
        form: &str,
    ) -> Result<Self> {
        Self::new(segments, breakpoints, kind.parse()?, form.parse()?)
    }

    pub(crate) fn from_parts(
        segments: Vec<Expr>,
        breakpoints: Vec<Expr>,
        kind: Kind,
        form: Form,
    ) -> Result<Self> {
        let dist = Piecewise {
            segments,
            breakpoints,
            kind,
            form,
        };
        dist.validate()?;
        Ok(dist)
    }

    fn validate(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(DistError::structural("a distribution needs at least one segment"));
        }
        let expected = match self.kind {
            Kind::Continuous => self.segments.len() + 1,
            Kind::Discrete => self.segments.len(),
        };
        if self.breakpoints.len() != expected {
            return Err(DistError::structural(format!(
                "{} {} with {} segments needs {expected} breakpoints, got {}",
                self.kind,
                self.form,
                self.segments.len(),
                self.breakpoints.len()
            )));
        }

        let last = self.breakpoints.len() - 1;
        for (i, bp) in self.breakpoints.iter().enumerate() {
            if bp.as_number().is_some_and(f64::is_nan) {
                return Err(DistError::structural("breakpoint is NaN"));
            }
            let interior = self.kind == Kind::Discrete || (i != 0 && i != last);
            if interior && bp.is_infinite() {
                return Err(DistError::structural(format!(
                    "infinite breakpoint {bp} is only allowed at the ends of a continuous support"
                )));
            }
        }

        for pair in self.breakpoints.windows(2) {
            match compare(&pair[0], &pair[1]) {
                Some(std::cmp::Ordering::Greater) => {
                    return Err(DistError::structural(format!(
                        "breakpoints are not in ascending order: {} > {}",
                        pair[0], pair[1]
                    )));
                }
                Some(std::cmp::Ordering::Equal) => {
                    return Err(DistError::structural(format!(
                        "repeated breakpoint {}",
                        pair[0]
                    )));
                }
                // symbolic neighbours: ordering is the caller's contract
                _ => {}
            }
        }

        if self.form == Form::Idf && self.kind == Kind::Continuous {
            let outside = self
                .breakpoints
                .iter()
                .filter_map(Expr::to_f64)
                .any(|p| !(-MASS_TOLERANCE..=1.0 + MASS_TOLERANCE).contains(&p));
            if outside {
                return Err(DistError::structural(
                    "inverse distribution breakpoints must be probabilities",
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// ACCESSORS
// =============================================================================

impl Piecewise {
    pub fn segments(&self) -> &[Expr] {
        &self.segments
    }

    pub fn breakpoints(&self) -> &[Expr] {
        &self.breakpoints
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn form(&self) -> Form {
        self.form
    }

    pub fn is_continuous(&self) -> bool {
        self.kind == Kind::Continuous
    }

    /// Lowest and highest support value (probabilities for an IDF).
    pub fn support(&self) -> (&Expr, &Expr) {
        let last = self.breakpoints.len() - 1;
        (&self.breakpoints[0], &self.breakpoints[last])
    }

    /// Interval of continuous segment `i`.
    pub(crate) fn interval(&self, i: usize) -> (&Expr, &Expr) {
        (&self.breakpoints[i], &self.breakpoints[i + 1])
    }

    /// Free symbols other than [`VAR`], in segments and breakpoints.
    pub fn parameters(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self
            .segments
            .iter()
            .chain(self.breakpoints.iter())
            .flat_map(Expr::free_symbols)
            .collect();
        out.remove(VAR);
        out
    }

    /// Fails with [`DistError::Parameter`] while any parameter is unbound.
    pub(crate) fn require_numeric(&self, operation: &str) -> Result<()> {
        let params = self.parameters();
        if params.is_empty() {
            Ok(())
        } else {
            let names: Vec<&str> = params.iter().map(String::as_str).collect();
            Err(DistError::parameter(format!(
                "{operation} needs concrete parameters, unresolved: {}",
                names.join(", ")
            )))
        }
    }

    pub(crate) fn require_same_kind(&self, other: &Piecewise) -> Result<()> {
        if self.kind == other.kind {
            Ok(())
        } else {
            Err(DistError::domain(format!(
                "cannot combine a {} variable with a {} one",
                self.kind, other.kind
            )))
        }
    }

    /// Bind a parameter to a value.
    ///
    /// ```
    /// use symb_prob::catalog;
    ///
    /// let x = catalog::exponential("theta").unwrap().substitute("theta", 2.0).unwrap();
    /// assert!(x.parameters().is_empty());
    /// ```
    pub fn substitute(&self, param: &str, value: impl Into<Expr>) -> Result<Piecewise> {
        if param == VAR {
            return Err(DistError::domain(format!(
                "'{VAR}' is the random variable, not a parameter"
            )));
        }
        let value = value.into();
        let map = |e: &Expr| e.substitute(param, &value).simplified();
        Self::from_parts(
            self.segments.iter().map(map).collect(),
            self.breakpoints.iter().map(map).collect(),
            self.kind,
            self.form,
        )
    }
}

// =============================================================================
// DIAGNOSTICS AND EXPORT
// =============================================================================

/// Outcome of [`Piecewise::verify_pdf`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfCheck {
    /// Total probability mass
    pub area: f64,
    /// No negative value found at the probed points
    pub non_negative: bool,
    pub valid: bool,
}

/// A numeric piece of a distribution restricted to a display window.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSegment {
    pub lo: f64,
    pub hi: f64,
    pub expr: Expr,
}

impl PlotSegment {
    pub fn eval(&self, x: f64) -> Option<f64> {
        self.expr.eval_at(VAR, x)
    }
}

impl Piecewise {
    /// Best-effort validity check of the density: total area and sign at probe points.
    /// Requires concrete parameters.
    pub fn verify_pdf(&self) -> Result<PdfCheck> {
        self.require_numeric("verify_pdf")?;
        let pdf = self.pdf()?;
        let probe = Probe::default();

        let (area, non_negative) = match pdf.kind {
            Kind::Continuous => {
                let mut area = 0.0;
                let mut non_negative = true;
                for (i, seg) in pdf.segments.iter().enumerate() {
                    let (lo, hi) = pdf.interval(i);
                    let mass = integrate(seg, VAR, lo, hi)?;
                    area += mass.to_f64().ok_or_else(|| {
                        DistError::parameter(format!("segment mass {mass} is not numeric"))
                    })?;
                    for t in probe.test_points(lo, hi) {
                        if probe.eval_at(seg, VAR, t).is_some_and(|v| v < 0.0) {
                            non_negative = false;
                        }
                    }
                }
                (area, non_negative)
            }
            Kind::Discrete => {
                let values: Vec<f64> = pdf
                    .segments
                    .iter()
                    .map(|s| {
                        s.to_f64().ok_or_else(|| {
                            DistError::parameter(format!("probability {s} is not numeric"))
                        })
                    })
                    .collect::<Result<_>>()?;
                (values.iter().sum(), values.iter().all(|v| *v >= 0.0))
            }
        };

        let upper = match pdf.kind {
            Kind::Continuous => 1.00001,
            Kind::Discrete => 1.0001,
        };
        let valid = area > 1.0 - MASS_TOLERANCE && area < upper && non_negative;
        if valid {
            debug!(area, "density verified");
        } else {
            warn!(area, non_negative, "density is not valid");
        }
        Ok(PdfCheck {
            area,
            non_negative,
            valid,
        })
    }

    /// Label for plot titles, e.g. `continuous cdf`.
    pub fn display_form_label(&self) -> String {
        format!("{} {}", self.kind, self.form)
    }

    /// Segments as parseable strings.
    pub fn segment_strings(&self) -> Vec<String> {
        self.segments.iter().map(ToString::to_string).collect()
    }

    /// Breakpoints as numbers (infinities included).
    pub fn numeric_breakpoints(&self) -> Result<Vec<f64>> {
        self.breakpoints
            .iter()
            .map(|b| {
                b.to_f64().ok_or_else(|| {
                    DistError::parameter(format!("breakpoint {b} is not numeric"))
                })
            })
            .collect()
    }

    /// Numeric pieces clipped to `window`. Discrete atoms become zero-width pieces.
    pub fn plot_segments(&self, window: (f64, f64)) -> Result<Vec<PlotSegment>> {
        let (lo, hi) = window;
        if !lo.is_finite() || !hi.is_finite() {
            return Err(DistError::domain("plot window cannot contain infinities"));
        }
        if lo >= hi {
            return Err(DistError::domain("plot window must be in ascending order"));
        }
        self.require_numeric("plotting")?;
        let bps = self.numeric_breakpoints()?;

        let pieces = match self.kind {
            Kind::Continuous => self
                .segments
                .iter()
                .zip(bps.windows(2))
                .filter(|(_, w)| w[1] > lo && w[0] < hi)
                .map(|(expr, w)| PlotSegment {
                    lo: w[0].max(lo),
                    hi: w[1].min(hi),
                    expr: expr.clone(),
                })
                .collect(),
            Kind::Discrete => self
                .segments
                .iter()
                .zip(bps.iter())
                .filter(|(_, a)| (lo..=hi).contains(*a))
                .map(|(expr, a)| PlotSegment {
                    lo: *a,
                    hi: *a,
                    expr: expr.clone(),
                })
                .collect(),
        };
        Ok(pieces)
    }

    /// Empirical distribution of observed values, each observation equally likely.
    ///
    /// ```
    /// use symb_prob::Piecewise;
    ///
    /// let x = Piecewise::bootstrap(&[2.0, 1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(x.pdf_at(2.0).unwrap().to_f64(), Some(0.5));
    /// ```
    pub fn bootstrap(data: &[f64]) -> Result<Piecewise> {
        if data.is_empty() {
            return Err(DistError::structural("bootstrap needs at least one observation"));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(DistError::domain("bootstrap observations must be finite"));
        }
        let mut sorted = data.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mut atoms: Vec<Expr> = Vec::new();
        let mut probs: Vec<Expr> = Vec::new();
        for chunk in sorted.chunk_by(|a, b| a == b) {
            atoms.push(Expr::number(chunk[0]));
            probs.push(Expr::number(chunk.len() as f64 / n));
        }
        Self::from_parts(probs, atoms, Kind::Discrete, Form::Pdf)
    }
}

impl fmt::Display for Piecewise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Continuous => {
                writeln!(f, "{} {} with support {}:", self.kind, self.form, self.breakpoint_list())?;
                for (i, seg) in self.segments.iter().enumerate() {
                    let (lo, hi) = self.interval(i);
                    write!(f, "  [{lo}, {hi}]: {seg}")?;
                    if i + 1 < self.segments.len() {
                        writeln!(f)?;
                    }
                }
                Ok(())
            }
            Kind::Discrete => {
                write!(f, "{} {} where {{x -> f(x)}}: ", self.kind, self.form)?;
                let pairs: Vec<String> = self
                    .breakpoints
                    .iter()
                    .zip(&self.segments)
                    .map(|(a, p)| format!("{{{a} -> {p}}}"))
                    .collect();
                write!(f, "{}", pairs.join(", "))
            }
        }
    }
}

impl Piecewise {
    fn breakpoint_list(&self) -> String {
        let items: Vec<String> = self.breakpoints.iter().map(ToString::to_string).collect();
        format!("[{}]", items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::catalog;

    #[test]
    fn test_single_expression_is_wrapped() {
        let x = Piecewise::continuous(Expr::one(), [0.0, 1.0]).unwrap();
        assert_eq!(x.segments(), &[Expr::one()]);
        assert_eq!(x.kind(), Kind::Continuous);
        assert_eq!(x.form(), Form::Pdf);
    }

    #[test]
    fn test_descending_breakpoints_rejected() {
        let err = Piecewise::continuous(1.0, [1.0, 0.0]).unwrap_err();
        assert!(matches!(err, DistError::Structural(_)));
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let err = Piecewise::continuous(vec![1.0, 2.0], [0.0, 1.0]).unwrap_err();
        assert!(matches!(err, DistError::Structural(_)));
        let err = Piecewise::discrete(vec![0.5, 0.5], [0.0]).unwrap_err();
        assert!(matches!(err, DistError::Structural(_)));
    }

    #[test]
    fn test_labels() {
        let x = Piecewise::with_labels("x", [0.0, 1.0], "continuous", "cdf").unwrap();
        assert_eq!(x.form(), Form::Cdf);
        let err = Piecewise::with_labels("x", [0.0, 1.0], "mixed", "cdf").unwrap_err();
        assert!(matches!(err, DistError::Structural(_)));
        let err = Piecewise::with_labels("x", [0.0, 1.0], "continuous", "mgf").unwrap_err();
        assert!(matches!(err, DistError::Structural(_)));
    }

    #[test]
    fn test_symbolic_breakpoints_skip_ordering() {
        let bps = vec![Expr::symbol("a"), Expr::symbol("b")];
        assert!(Piecewise::continuous("1/(b - a)", bps).is_ok());
    }

    #[test]
    fn test_interior_infinity_rejected() {
        let bps = vec![0.0, f64::INFINITY, f64::INFINITY];
        assert!(Piecewise::continuous(vec![1.0, 1.0], bps).is_err());
        assert!(Piecewise::discrete(1.0, [f64::INFINITY]).is_err());
    }

    #[test]
    fn test_substitute_binds_parameter() {
        let x = catalog::exponential("theta").unwrap();
        assert_eq!(x.parameters().len(), 1);
        let bound = x.substitute("theta", 3.0).unwrap();
        assert!(bound.parameters().is_empty());
        assert!(x.substitute(VAR, 1.0).is_err());
    }

    #[test]
    fn test_verify_pdf() {
        let good = catalog::uniform(0.0, 2.0).unwrap().verify_pdf().unwrap();
        assert!(good.valid);
        assert!((good.area - 1.0).abs() < 1e-12);

        let bad = Piecewise::continuous(2.0, [0.0, 1.0]).unwrap().verify_pdf().unwrap();
        assert!(!bad.valid);

        let negative = Piecewise::continuous("4*x - 1", [0.0, 1.0]).unwrap();
        let check = negative.verify_pdf().unwrap();
        assert!(!check.non_negative);
        assert!(!check.valid);
    }

    #[test]
    fn test_verify_pdf_needs_concrete_parameters() {
        let x = catalog::exponential("theta").unwrap();
        assert!(matches!(x.verify_pdf(), Err(DistError::Parameter(_))));
    }

    #[test]
    fn test_bootstrap_merges_duplicates() {
        let x = Piecewise::bootstrap(&[3.0, 1.0, 3.0, 3.0]).unwrap();
        assert_eq!(x.kind(), Kind::Discrete);
        assert_eq!(x.numeric_breakpoints().unwrap(), vec![1.0, 3.0]);
        assert_eq!(x.segments()[1].as_number(), Some(0.75));
        assert!(Piecewise::bootstrap(&[]).is_err());
    }

    #[test]
    fn test_plot_segments_clip_to_window() {
        let x = catalog::exponential(1.0).unwrap();
        let pieces = x.plot_segments((-1.0, 5.0)).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!((pieces[0].lo, pieces[0].hi), (0.0, 5.0));
        let v = pieces[0].eval(1.0).unwrap();
        assert!((v - (-1.0_f64).exp()).abs() < 1e-12);
        assert!(x.plot_segments((0.0, f64::INFINITY)).is_err());
        assert!(x.plot_segments((2.0, 1.0)).is_err());
    }

    #[test]
    fn test_display() {
        let x = Piecewise::continuous(1.0, [0.0, 1.0]).unwrap();
        let text = x.to_string();
        assert!(text.starts_with("continuous pdf with support [0, 1]"));
        let d = Piecewise::discrete(vec![0.5, 0.5], [0.0, 1.0]).unwrap();
        assert_eq!(d.to_string(), "discrete pdf where {x -> f(x)}: {0 -> 0.5}, {1 -> 0.5}");
        assert_eq!(d.display_form_label(), "discrete pdf");
    }
}
