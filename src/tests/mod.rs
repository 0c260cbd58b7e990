//! Crate-level tests that exercise several modules together.

mod algebra_tests;
mod distribution_scenarios;
mod property_tests;
mod round_trip_tests;

use crate::{Piecewise, VAR};

/// Numeric mass of a continuous density with finite breakpoints.
///
/// Each segment is mapped through the smoothstep `x = lo + w (3s^2 - 2s^3)`, whose zero
/// derivative at both ends tames logarithmic endpoint singularities, then integrated by
/// Simpson's rule in `s`.
pub(crate) fn numeric_mass(pdf: &Piecewise) -> f64 {
    let Ok(bps) = pdf.numeric_breakpoints() else {
        return f64::NAN;
    };
    let n = 2000;
    let h = 1.0 / n as f64;
    let mut total = 0.0;
    for (seg, w) in pdf.segments().iter().zip(bps.windows(2)) {
        let width = w[1] - w[0];
        let g = |s: f64| {
            let x = w[0] + width * (3.0 * s * s - 2.0 * s * s * s);
            let jac = width * 6.0 * s * (1.0 - s);
            if jac == 0.0 {
                return 0.0;
            }
            seg.eval_at(VAR, x).filter(|v| v.is_finite()).unwrap_or(0.0) * jac
        };
        let mut acc = g(0.0) + g(1.0);
        for k in 1..n {
            let weight = if k % 2 == 1 { 4.0 } else { 2.0 };
            acc += weight * g(k as f64 * h);
        }
        total += acc * h / 3.0;
    }
    total
}
