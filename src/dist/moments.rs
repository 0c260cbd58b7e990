//! Moments and expectations.

use tracing::debug;

use super::support::segment_assumptions;
use super::{Kind, Piecewise, VAR};
use crate::calculus::integrate_with;
use crate::error::Result;
use crate::Expr;

impl Piecewise {
    /// `E[g(X)]` for an expression `g` in [`VAR`].
    ///
    /// ```
    /// use symb_prob::{Expr, catalog};
    ///
    /// let u = catalog::uniform(0.0, 2.0).unwrap();
    /// let g = symb_prob::parse("x^2").unwrap();
    /// let e = u.expected_value(&g).unwrap().to_f64().unwrap();
    /// assert!((e - 4.0 / 3.0).abs() < 1e-12);
    /// ```
    pub fn expected_value(&self, g: &Expr) -> Result<Expr> {
        let pdf = self.pdf()?;
        let mut terms = Vec::with_capacity(pdf.segments.len());
        match pdf.kind {
            Kind::Continuous => {
                for (i, f) in pdf.segments.iter().enumerate() {
                    if f.is_number_eq(0.0) {
                        continue;
                    }
                    let (lo, hi) = pdf.interval(i);
                    let integrand = Expr::product(vec![g.clone(), f.clone()]);
                    terms.push(integrate_with(
                        &integrand,
                        VAR,
                        lo,
                        hi,
                        &segment_assumptions(lo, hi),
                    )?);
                }
            }
            Kind::Discrete => {
                for (atom, p) in pdf.breakpoints.iter().zip(&pdf.segments) {
                    terms.push(Expr::product(vec![g.substitute(VAR, atom), p.clone()]));
                }
            }
        }
        let value = Expr::sum(terms).simplified();
        debug!(%g, %value, "expectation");
        Ok(value)
    }

    /// `E[X^k]`.
    pub fn raw_moment(&self, k: u32) -> Result<Expr> {
        self.expected_value(&Expr::symbol(VAR).pow_of(f64::from(k)))
    }

    pub fn mean(&self) -> Result<Expr> {
        self.expected_value(&Expr::symbol(VAR))
    }

    /// `E[X^2] - E[X]^2`.
    pub fn variance(&self) -> Result<Expr> {
        let mean = self.mean()?;
        let second = self.raw_moment(2)?;
        Ok(Expr::sub_expr(second, mean.pow_of(2.0)).simplified())
    }

    /// Standard deviation over mean.
    pub fn coef_of_var(&self) -> Result<Expr> {
        let sd = self.variance()?.sqrt();
        Ok(Expr::div_expr(sd, self.mean()?).simplified())
    }

    /// Third standardised moment, from raw moments.
    pub fn skewness(&self) -> Result<Expr> {
        let m = self.mean()?;
        let (e2, e3) = (self.raw_moment(2)?, self.raw_moment(3)?);
        let central = Expr::sum(vec![
            e3,
            Expr::product(vec![Expr::number(-3.0), m.clone(), e2]),
            Expr::product(vec![Expr::number(2.0), m.pow_of(3.0)]),
        ]);
        let sd3 = self.variance()?.pow_of(1.5);
        Ok(Expr::div_expr(central, sd3).simplified())
    }

    /// Fourth standardised moment (not excess), from raw moments.
    pub fn kurtosis(&self) -> Result<Expr> {
        let m = self.mean()?;
        let (e2, e3, e4) = (self.raw_moment(2)?, self.raw_moment(3)?, self.raw_moment(4)?);
        let central = Expr::sum(vec![
            e4,
            Expr::product(vec![Expr::number(-4.0), m.clone(), e3]),
            Expr::product(vec![Expr::number(6.0), m.clone().pow_of(2.0), e2]),
            Expr::product(vec![Expr::number(-3.0), m.pow_of(4.0)]),
        ]);
        let var2 = self.variance()?.pow_of(2.0);
        Ok(Expr::div_expr(central, var2).simplified())
    }
}
