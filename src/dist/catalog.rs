//! Named distribution families.
//!
//! Every constructor accepts numbers or symbols (`&str` names become parameters) and
//! returns an ordinary [`Piecewise`] in PDF form. Numeric parameters are range-checked;
//! symbolic ones are assumed valid until bound with [`Piecewise::substitute`].
//!
//! ```
//! use symb_prob::catalog;
//!
//! let x = catalog::weibull(1.0, 2.0).unwrap();
//! assert!(x.verify_pdf().unwrap().valid);
//! ```

use std::collections::HashMap;

use super::Piecewise;
use crate::error::{DistError, Result};
use crate::math::{binomial as choose, factorial};
use crate::{Expr, parse};

/// Parse the density templates and bind each named parameter.
fn family(
    templates: &[&str],
    breakpoints: Vec<Expr>,
    params: &[(&str, &Expr)],
) -> Result<Piecewise> {
    let bindings: HashMap<&str, Expr> = params.iter().map(|(k, v)| (*k, (*v).clone())).collect();
    let segments = templates
        .iter()
        .map(|t| Ok(parse(t)?.substitute_all(&bindings).simplified()))
        .collect::<Result<Vec<_>>>()?;
    Piecewise::continuous(segments, breakpoints)
}

fn require(name: &str, value: &Expr, valid: impl Fn(f64) -> bool, rule: &str) -> Result<()> {
    match value.to_f64() {
        Some(v) if !valid(v) => Err(DistError::domain(format!("{name} = {v} must be {rule}"))),
        _ => Ok(()),
    }
}

fn positive(name: &str, value: &Expr) -> Result<()> {
    require(name, value, |v| v > 0.0, "positive")
}

fn probability(name: &str, value: &Expr) -> Result<()> {
    require(name, value, |v| (0.0..=1.0).contains(&v), "within [0, 1]")
}

fn half_line() -> Vec<Expr> {
    vec![Expr::zero(), Expr::infinity()]
}

fn real_line() -> Vec<Expr> {
    vec![Expr::neg_infinity(), Expr::infinity()]
}

fn unit_interval() -> Vec<Expr> {
    vec![Expr::zero(), Expr::one()]
}

// =============================================================================
// CONTINUOUS FAMILIES
// =============================================================================

pub fn uniform(a: impl Into<Expr>, b: impl Into<Expr>) -> Result<Piecewise> {
    let (a, b) = (a.into(), b.into());
    family(&["1/(b - a)"], vec![a.clone(), b.clone()], &[("a", &a), ("b", &b)])
}

/// Rate parameterisation: `theta * exp(-theta x)` on `[0, inf)`.
pub fn exponential(theta: impl Into<Expr>) -> Result<Piecewise> {
    let theta = theta.into();
    positive("theta", &theta)?;
    family(&["theta*exp(-theta*x)"], half_line(), &[("theta", &theta)])
}

/// Triangle on `[a, b]` peaking at the mode `m`.
pub fn triangular(a: impl Into<Expr>, m: impl Into<Expr>, b: impl Into<Expr>) -> Result<Piecewise> {
    let (a, m, b) = (a.into(), m.into(), b.into());
    family(
        &["2*(x - a)/((b - a)*(m - a))", "2*(b - x)/((b - a)*(b - m))"],
        vec![a.clone(), m.clone(), b.clone()],
        &[("a", &a), ("m", &m), ("b", &b)],
    )
}

pub fn weibull(theta: impl Into<Expr>, kappa: impl Into<Expr>) -> Result<Piecewise> {
    let (theta, kappa) = (theta.into(), kappa.into());
    positive("theta", &theta)?;
    positive("kappa", &kappa)?;
    family(
        &["kappa*theta^kappa*x^(kappa - 1)*exp(-(theta*x)^kappa)"],
        half_line(),
        &[("theta", &theta), ("kappa", &kappa)],
    )
}

/// Rate `theta`, shape `kappa`.
pub fn gamma(theta: impl Into<Expr>, kappa: impl Into<Expr>) -> Result<Piecewise> {
    let (theta, kappa) = (theta.into(), kappa.into());
    positive("theta", &theta)?;
    positive("kappa", &kappa)?;
    family(
        &["theta*(theta*x)^(kappa - 1)*exp(-theta*x)/gamma(kappa)"],
        half_line(),
        &[("theta", &theta), ("kappa", &kappa)],
    )
}

/// Sum of `n` exponentials with rate `theta`.
pub fn erlang(theta: impl Into<Expr>, n: u32) -> Result<Piecewise> {
    let theta = theta.into();
    positive("theta", &theta)?;
    if n == 0 {
        return Err(DistError::domain("an Erlang variable needs at least one phase"));
    }
    let n_expr = Expr::number(f64::from(n));
    let norm = Expr::number(factorial(n - 1));
    family(
        &["theta*(theta*x)^(n - 1)*exp(-theta*x)/c"],
        half_line(),
        &[("theta", &theta), ("n", &n_expr), ("c", &norm)],
    )
}

pub fn normal(mu: impl Into<Expr>, sigma: impl Into<Expr>) -> Result<Piecewise> {
    let (mu, sigma) = (mu.into(), sigma.into());
    positive("sigma", &sigma)?;
    family(
        &["exp(-(x - mu)^2/(2*sigma^2))/(sigma*sqrt(2*pi))"],
        real_line(),
        &[("mu", &mu), ("sigma", &sigma)],
    )
}

pub fn arcsin() -> Result<Piecewise> {
    family(&["1/(pi*sqrt(x*(1 - x)))"], unit_interval(), &[])
}

pub fn beta(alpha: impl Into<Expr>, beta: impl Into<Expr>) -> Result<Piecewise> {
    let (alpha, beta) = (alpha.into(), beta.into());
    positive("alpha", &alpha)?;
    positive("beta", &beta)?;
    family(
        &["gamma(alpha + beta)*x^(alpha - 1)*(1 - x)^(beta - 1)/(gamma(alpha)*gamma(beta))"],
        unit_interval(),
        &[("alpha", &alpha), ("beta", &beta)],
    )
}

/// Location `a`, scale `alpha`.
pub fn cauchy(a: impl Into<Expr>, alpha: impl Into<Expr>) -> Result<Piecewise> {
    let (a, alpha) = (a.into(), alpha.into());
    positive("alpha", &alpha)?;
    family(
        &["1/(alpha*pi*(1 + ((x - a)/alpha)^2))"],
        real_line(),
        &[("a", &a), ("alpha", &alpha)],
    )
}

pub fn chi_square(n: impl Into<Expr>) -> Result<Piecewise> {
    let n = n.into();
    positive("n", &n)?;
    family(
        &["x^(n/2 - 1)*exp(-x/2)/(2^(n/2)*gamma(n/2))"],
        half_line(),
        &[("n", &n)],
    )
}

/// Scale `theta` (the left end of the support), shape `kappa`.
pub fn pareto(theta: impl Into<Expr>, kappa: impl Into<Expr>) -> Result<Piecewise> {
    let (theta, kappa) = (theta.into(), kappa.into());
    positive("theta", &theta)?;
    positive("kappa", &kappa)?;
    family(
        &["kappa*theta^kappa/x^(kappa + 1)"],
        vec![theta.clone(), Expr::infinity()],
        &[("theta", &theta), ("kappa", &kappa)],
    )
}

pub fn lomax(theta: impl Into<Expr>, kappa: impl Into<Expr>) -> Result<Piecewise> {
    let (theta, kappa) = (theta.into(), kappa.into());
    positive("theta", &theta)?;
    positive("kappa", &kappa)?;
    family(
        &["kappa*theta*(1 + theta*x)^(-kappa - 1)"],
        half_line(),
        &[("theta", &theta), ("kappa", &kappa)],
    )
}

pub fn log_logistic(theta: impl Into<Expr>, kappa: impl Into<Expr>) -> Result<Piecewise> {
    let (theta, kappa) = (theta.into(), kappa.into());
    positive("theta", &theta)?;
    positive("kappa", &kappa)?;
    family(
        &["theta*kappa*(theta*x)^(kappa - 1)/(1 + (theta*x)^kappa)^2"],
        half_line(),
        &[("theta", &theta), ("kappa", &kappa)],
    )
}

/// Rate `kappa`, location `theta`.
pub fn logistic(kappa: impl Into<Expr>, theta: impl Into<Expr>) -> Result<Piecewise> {
    let (kappa, theta) = (kappa.into(), theta.into());
    positive("kappa", &kappa)?;
    family(
        &["kappa*exp(-kappa*(x - theta))/(1 + exp(-kappa*(x - theta)))^2"],
        real_line(),
        &[("kappa", &kappa), ("theta", &theta)],
    )
}

// =============================================================================
// DISCRETE FAMILIES
// =============================================================================

pub fn bernoulli(p: impl Into<Expr>) -> Result<Piecewise> {
    let p = p.into();
    probability("p", &p)?;
    let q = Expr::sub_expr(Expr::one(), p.clone()).simplified();
    Piecewise::discrete(vec![q, p], [0.0, 1.0])
}

/// Successes in `n` independent trials with success probability `p`.
pub fn binomial(n: u32, p: impl Into<Expr>) -> Result<Piecewise> {
    let p = p.into();
    probability("p", &p)?;
    let q = Expr::sub_expr(Expr::one(), p.clone());
    let probs = (0..=n)
        .map(|k| {
            Expr::product(vec![
                Expr::number(choose(n, k)),
                p.clone().pow_of(f64::from(k)),
                q.clone().pow_of(f64::from(n - k)),
            ])
            .simplified()
        })
        .collect::<Vec<_>>();
    Piecewise::discrete(probs, (0..=n).map(f64::from))
}

/// Equally likely integers `lo..=hi`.
pub fn discrete_uniform(lo: i32, hi: i32) -> Result<Piecewise> {
    if lo > hi {
        return Err(DistError::domain(format!("empty range {lo}..={hi}")));
    }
    let count = f64::from(hi - lo + 1);
    let probs = vec![Expr::number(1.0 / count); (hi - lo + 1) as usize];
    Piecewise::discrete(probs, (lo..=hi).map(f64::from))
}

/// Trial of the first success, conditioned on it happening within `n` trials.
pub fn geometric_trunc(p: impl Into<Expr>, n: u32) -> Result<Piecewise> {
    let p = p.into();
    probability("p", &p)?;
    if n == 0 {
        return Err(DistError::domain("a truncated geometric needs at least one trial"));
    }
    let q = Expr::sub_expr(Expr::one(), p.clone());
    let mass = Expr::sub_expr(Expr::one(), q.clone().pow_of(f64::from(n)));
    let probs = (1..=n)
        .map(|k| {
            Expr::div_expr(
                Expr::product(vec![p.clone(), q.clone().pow_of(f64::from(k - 1))]),
                mass.clone(),
            )
            .simplified()
        })
        .collect::<Vec<_>>();
    Piecewise::discrete(probs, (1..=n).map(f64::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::Form;

    fn assert_valid(x: &Piecewise) {
        let check = x.verify_pdf().unwrap();
        assert!(check.valid, "{x}: {check:?}");
    }

    #[test]
    fn test_closed_form_families_have_unit_mass() {
        assert_valid(&uniform(-1.0, 3.0).unwrap());
        assert_valid(&exponential(0.5).unwrap());
        assert_valid(&triangular(0.0, 1.0, 3.0).unwrap());
        assert_valid(&weibull(2.0, 1.0).unwrap());
        assert_valid(&gamma(1.5, 3.0).unwrap());
        assert_valid(&erlang(2.0, 3).unwrap());
        assert_valid(&pareto(1.0, 2.0).unwrap());
        assert_valid(&lomax(1.0, 3.0).unwrap());
    }

    #[test]
    fn test_discrete_families_have_unit_mass() {
        assert_valid(&bernoulli(0.3).unwrap());
        assert_valid(&binomial(4, 0.25).unwrap());
        assert_valid(&discrete_uniform(1, 6).unwrap());
        assert_valid(&geometric_trunc(0.5, 4).unwrap());
    }

    #[test]
    fn test_symbolic_parameters() {
        let x = exponential("theta").unwrap();
        assert_eq!(x.form(), Form::Pdf);
        assert!(x.parameters().contains("theta"));
        let u = uniform("a", "b").unwrap();
        assert_eq!(u.support().0, &Expr::symbol("a"));
    }

    #[test]
    fn test_parameter_ranges() {
        assert!(matches!(exponential(-1.0), Err(DistError::Domain(_))));
        assert!(matches!(bernoulli(1.5), Err(DistError::Domain(_))));
        assert!(matches!(erlang(1.0, 0), Err(DistError::Domain(_))));
        assert!(matches!(uniform(1.0, 0.0), Err(DistError::Structural(_))));
    }

    #[test]
    fn test_binomial_masses() {
        let b = binomial(2, 0.5).unwrap();
        let probs: Vec<f64> = b.segments().iter().map(|s| s.to_f64().unwrap()).collect();
        assert_eq!(probs, vec![0.25, 0.5, 0.25]);
    }

    #[test]
    fn test_normal_density_at_mean() {
        let n = normal(0.0, 1.0).unwrap();
        let f = n.pdf_at(0.0).unwrap().to_f64().unwrap();
        assert!((f - 1.0 / (2.0 * std::f64::consts::PI).sqrt()).abs() < 1e-12);
    }
}
