//! Parallel batch evaluation using Rayon
//!
//! Enable with the `parallel` feature:
//! ```toml
//! symb_prob = { version = "0.3", features = ["parallel"] }
//! ```

use rayon::prelude::*;

use crate::dist::{Form, Piecewise};
use crate::error::{DistError, Result};
use crate::Expr;

/// Evaluate one functional form of `x` at many points.
///
/// The conversion to `form` happens once; the points are then evaluated in parallel.
/// Results keep the order of `points`.
///
/// ```
/// use symb_prob::{Form, catalog, parallel::evaluate_form};
///
/// let u = catalog::uniform(0.0, 1.0).unwrap();
/// let cdf = evaluate_form(&u, Form::Cdf, &[0.25, 0.5]).unwrap();
/// assert_eq!(cdf, vec![0.25, 0.5]);
/// ```
pub fn evaluate_form(x: &Piecewise, form: Form, points: &[f64]) -> Result<Vec<f64>> {
    let dist = if form == Form::Idf {
        x.clone()
    } else {
        x.to_form(form)?
    };
    points
        .par_iter()
        .map(|p| {
            let value = dist.value_at(form, &Expr::number(*p))?;
            value.to_f64().ok_or_else(|| {
                DistError::parameter(format!("{form} at {p} is not numeric: {value}"))
            })
        })
        .collect()
}

/// Numeric values of several expressions in `var` over a shared grid.
///
/// `None` marks points where an expression has no real value.
pub fn evaluate_parallel(exprs: &[&Expr], var: &str, points: &[f64]) -> Vec<Vec<Option<f64>>> {
    exprs
        .par_iter()
        .map(|e| points.par_iter().map(|p| e.eval_at(var, *p)).collect())
        .collect()
}
