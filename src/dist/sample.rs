//! Random variates by Newton inversion of the CDF.
//!
//! Each draw solves `F(x) = u` for a uniform `u`, starting from the mean and taking a
//! fixed number of steps `x <- x - (F(x) - u) / f(x)`. An iterate that leaves the support
//! keeps using the nearest boundary segment's expressions, so the step stays smooth.
//! An iterate where the density vanishes restarts inside the segment whose CDF range
//! brackets `u`.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::support::Probe;
use super::{Kind, NEWTON_ITERATIONS, Piecewise, VAR};
use crate::error::{CasError, DistError, Result};
use crate::Expr;

/// Builder for drawing variates.
///
/// ```
/// use symb_prob::{Sampler, catalog};
///
/// let x = catalog::exponential(1.0).unwrap();
/// let draws = Sampler::new().seed(7).variate(&x, 100).unwrap();
/// assert_eq!(draws.len(), 100);
/// assert!(draws.windows(2).all(|w| w[0] <= w[1]));
/// assert!(draws.iter().all(|v| *v >= 0.0));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    seed: Option<u64>,
    iterations: usize,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler {
    pub fn new() -> Self {
        Sampler {
            seed: None,
            iterations: NEWTON_ITERATIONS,
        }
    }

    /// Fix the seed for reproducible draws. Unseeded samplers draw from OS entropy.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Newton refinement steps per draw.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// `n` draws from `x`, sorted ascending.
    pub fn variate(&self, x: &Piecewise, n: usize) -> Result<Vec<f64>> {
        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        self.variate_with(x, n, &mut rng)
    }

    /// `n` draws using the caller's generator.
    pub fn variate_with<R: Rng>(&self, x: &Piecewise, n: usize, rng: &mut R) -> Result<Vec<f64>> {
        let inverter = Inverter::prepare(x, self.iterations)?;
        let mut draws = (0..n)
            .map(|_| inverter.solve(rng.random::<f64>()))
            .collect::<Result<Vec<_>>>()?;
        draws.sort_by(f64::total_cmp);
        debug!(n, iterations = self.iterations, "variates drawn");
        Ok(draws)
    }
}

/// Quantile of `x` at the fixed percentile `u`, using the default number of Newton steps
/// for continuous variables.
///
/// ```
/// use symb_prob::{catalog, idf_at};
///
/// let x = catalog::exponential(1.0).unwrap();
/// let median = idf_at(&x, 0.5).unwrap();
/// assert!((median - 2.0_f64.ln()).abs() < 1e-9);
/// ```
pub fn idf_at(x: &Piecewise, u: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&u) {
        return Err(DistError::domain(format!("{u} is not a probability")));
    }
    Inverter::prepare(x, NEWTON_ITERATIONS)?.solve(u)
}

/// Numeric view of a distribution prepared once per batch of draws.
enum Inverter {
    Continuous {
        breakpoints: Vec<f64>,
        cdf: Vec<Expr>,
        pdf: Vec<Expr>,
        /// CDF at each breakpoint
        levels: Vec<f64>,
        start: f64,
        iterations: usize,
    },
    Discrete {
        atoms: Vec<f64>,
        cumulative: Vec<f64>,
    },
}

impl Inverter {
    fn prepare(x: &Piecewise, iterations: usize) -> Result<Self> {
        x.require_numeric("sampling")?;
        match x.kind {
            Kind::Continuous => {
                let (pdf, cdf) = (x.pdf()?, x.cdf()?);
                let breakpoints = pdf.numeric_breakpoints()?;
                let start = match x.mean().ok().and_then(|m| m.to_f64()) {
                    Some(m) if m.is_finite() => m,
                    _ => {
                        let (lo, hi) = pdf.support();
                        Probe::default().test_point(lo, hi).unwrap_or(0.0)
                    }
                };
                let last = breakpoints.len() - 1;
                let mut levels = Vec::with_capacity(breakpoints.len());
                for (k, b) in breakpoints.iter().enumerate() {
                    let level = if k == 0 {
                        0.0
                    } else if k == last {
                        1.0
                    } else {
                        x.cdf_at(*b)?.to_f64().filter(|v| v.is_finite()).ok_or_else(|| {
                            DistError::parameter(format!("cumulative mass at {b} is not numeric"))
                        })?
                    };
                    levels.push(level);
                }
                Ok(Inverter::Continuous {
                    breakpoints,
                    cdf: cdf.segments,
                    pdf: pdf.segments,
                    levels,
                    start,
                    iterations,
                })
            }
            Kind::Discrete => {
                let cdf = x.cdf()?;
                let atoms = cdf.numeric_breakpoints()?;
                let cumulative = cdf
                    .segments
                    .iter()
                    .map(|s| {
                        s.to_f64().ok_or_else(|| {
                            DistError::parameter(format!("cumulative mass {s} is not numeric"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Inverter::Discrete { atoms, cumulative })
            }
        }
    }

    fn solve(&self, u: f64) -> Result<f64> {
        match self {
            Inverter::Continuous {
                breakpoints,
                cdf,
                pdf,
                levels,
                start,
                iterations,
            } => {
                let last = breakpoints.len() - 1;
                if u <= 0.0 {
                    return Ok(breakpoints[0]);
                }
                if u >= 1.0 {
                    return Ok(breakpoints[last]);
                }
                let mut x = *start;
                for step in 0..*iterations {
                    let i = segment_for(breakpoints, x);
                    let (big_f, f) = (cdf[i].eval_at(VAR, x), pdf[i].eval_at(VAR, x));
                    let next = match (big_f, f) {
                        // no slope to follow on a flat stretch of the CDF
                        (Some(_), Some(f)) if f == 0.0 => bracketed_start(breakpoints, levels, u),
                        (Some(big_f), Some(f)) => x - (big_f - u) / f,
                        _ => f64::NAN,
                    };
                    if !next.is_finite() {
                        return Err(CasError::Indeterminate(format!(
                            "Newton step {step} for F(x) = {u} left the reals at x = {x}"
                        ))
                        .into());
                    }
                    x = next;
                }
                Ok(x)
            }
            Inverter::Discrete { atoms, cumulative } => {
                let i = cumulative
                    .iter()
                    .position(|c| *c >= u)
                    .unwrap_or(atoms.len() - 1);
                Ok(atoms[i])
            }
        }
    }
}

/// Segment whose interval holds `x`; outside the support, the nearest boundary segment.
fn segment_for(breakpoints: &[f64], x: f64) -> usize {
    let segments = breakpoints.len() - 1;
    breakpoints[1..segments]
        .iter()
        .position(|b| x < *b)
        .unwrap_or(segments - 1)
}

/// Point in the segment whose CDF range brackets `u`, placed by linear interpolation of the
/// CDF across the segment when both ends are finite.
fn bracketed_start(breakpoints: &[f64], levels: &[f64], u: f64) -> f64 {
    let i = levels[1..]
        .iter()
        .position(|l| u <= *l)
        .unwrap_or(levels.len() - 2);
    let (a, b) = (breakpoints[i], breakpoints[i + 1]);
    match (a.is_finite(), b.is_finite()) {
        (true, true) => {
            let span = levels[i + 1] - levels[i];
            let w = if span > 0.0 { (u - levels[i]) / span } else { 0.5 };
            a + w.clamp(0.0, 1.0) * (b - a)
        }
        (true, false) => a + 1.0,
        (false, true) => b - 1.0,
        (false, false) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::catalog;
    use crate::mixture;

    #[test]
    fn test_exponential_median() {
        let x = catalog::exponential(2.0).unwrap();
        let m = idf_at(&x, 0.5).unwrap();
        assert!((m - 2.0_f64.ln() / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_piecewise_quantile() {
        let t = catalog::triangular(0.0, 1.0, 2.0).unwrap();
        assert!((idf_at(&t, 0.125).unwrap() - 0.5).abs() < 1e-9);
        assert!((idf_at(&t, 0.875).unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_quantile_bounds() {
        let u = catalog::uniform(0.0, 1.0).unwrap();
        assert_eq!(idf_at(&u, 0.0).unwrap(), 0.0);
        assert_eq!(idf_at(&u, 1.0).unwrap(), 1.0);
        assert!(matches!(idf_at(&u, 1.5), Err(DistError::Domain(_))));
    }

    #[test]
    fn test_symbolic_parameters_rejected() {
        let x = catalog::exponential("theta").unwrap();
        assert!(matches!(
            Sampler::new().seed(1).variate(&x, 3),
            Err(DistError::Parameter(_))
        ));
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let x = catalog::uniform(0.0, 1.0).unwrap();
        let a = Sampler::new().seed(42).variate(&x, 20).unwrap();
        let b = Sampler::new().seed(42).variate(&x, 20).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_gap_in_support() {
        let halves = [catalog::uniform(0.0, 1.0).unwrap(), catalog::uniform(2.0, 3.0).unwrap()];
        let x = mixture(&[0.5, 0.5], &halves).unwrap();
        // the mean 1.5 sits where the density is zero
        assert!((idf_at(&x, 0.25).unwrap() - 0.5).abs() < 1e-9);
        assert!((idf_at(&x, 0.75).unwrap() - 2.5).abs() < 1e-9);
        let draws = Sampler::new().seed(11).variate(&x, 200).unwrap();
        assert!(draws
            .iter()
            .all(|v| (0.0..=1.0).contains(v) || (2.0..=3.0).contains(v)));
        assert!(draws.iter().any(|v| *v < 1.0) && draws.iter().any(|v| *v > 2.0));
    }

    #[test]
    fn test_discrete_draws_land_on_atoms() {
        let d = Piecewise::discrete(vec![0.2, 0.3, 0.5], [1.0, 2.0, 5.0]).unwrap();
        let draws = Sampler::new().seed(3).variate(&d, 50).unwrap();
        assert!(draws.iter().all(|v| [1.0, 2.0, 5.0].contains(v)));
        assert_eq!(idf_at(&d, 0.5).unwrap(), 2.0);
        assert_eq!(idf_at(&d, 0.51).unwrap(), 5.0);
    }

    #[test]
    fn test_caller_supplied_generator() {
        let x = catalog::uniform(2.0, 3.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        let draws = Sampler::new().variate_with(&x, 5, &mut rng).unwrap();
        assert!(draws.iter().all(|v| (2.0..=3.0).contains(v)));
    }

    #[test]
    fn test_segment_for_uses_boundaries() {
        let bps = [0.0, 1.0, 2.0];
        assert_eq!(segment_for(&bps, -3.0), 0);
        assert_eq!(segment_for(&bps, 1.5), 1);
        assert_eq!(segment_for(&bps, 9.0), 1);
    }
}
