//! Differentiation engine - applies calculus rules
//!
//! Subtrees free of the variable short-circuit to zero, and products only build the
//! terms whose factor actually depends on the variable. This keeps the raw derivative
//! small before the simplifier sees it.

use std::sync::Arc;

use crate::core::InternedSymbol;
use crate::error::CasError;
use crate::functions::registry::Registry;
use crate::{Expr, ExprKind};

impl Expr {
    /// Unsimplified derivative with respect to `var`.
    pub(crate) fn derive(&self, var: &InternedSymbol) -> Result<Expr, CasError> {
        if !self.contains_symbol(var) {
            return Ok(Expr::zero());
        }

        match &self.kind {
            ExprKind::Number(_) => Ok(Expr::zero()),

            ExprKind::Symbol(s) => Ok(if s == var { Expr::one() } else { Expr::zero() }),

            ExprKind::FunctionCall { name, args } => {
                let def = Registry::get(name.as_str())
                    .ok_or_else(|| CasError::UnknownFunction(name.as_str().to_string()))?;
                if !def.validate_arity(args.len()) {
                    return Err(CasError::InvalidFunctionCall {
                        name: name.as_str().to_string(),
                        expected: def.arity,
                        got: args.len(),
                    });
                }
                let rule = def.derivative.ok_or_else(|| {
                    CasError::unsupported(format!("no closed-form derivative for {name}"))
                })?;
                let primes = args
                    .iter()
                    .map(|a| a.derive(var))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rule(args, &primes))
            }

            // Sum rule: (a + b + c + ...)' = a' + b' + c' + ...
            ExprKind::Sum(terms) => {
                let primes = terms
                    .iter()
                    .filter(|t| t.contains_symbol(var))
                    .map(|t| t.derive(var))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::sum(primes))
            }

            // N-ary product rule: (a * b * c)' = a' * b * c + a * b' * c + a * b * c'
            ExprKind::Product(factors) => {
                let mut terms = Vec::new();
                for (i, f) in factors.iter().enumerate() {
                    if !f.contains_symbol(var) {
                        continue;
                    }
                    let prime = f.derive(var)?;
                    if prime.is_number_eq(0.0) {
                        continue;
                    }
                    let mut row: Vec<Arc<Expr>> = Vec::with_capacity(factors.len());
                    for (j, g) in factors.iter().enumerate() {
                        if i == j {
                            row.push(Arc::new(prime.clone()));
                        } else {
                            row.push(Arc::clone(g));
                        }
                    }
                    terms.push(Expr::product_from_arcs(row));
                }
                Ok(Expr::sum(terms))
            }

            ExprKind::Pow(u, v) => {
                let u_dep = u.contains_symbol(var);
                let v_dep = v.contains_symbol(var);

                if !v_dep {
                    // d/dx u^c = c * u^(c-1) * u'
                    let exponent = Expr::sum(vec![(**v).clone(), Expr::number(-1.0)]);
                    return Ok(Expr::product(vec![
                        (**v).clone(),
                        Expr::pow_from_arcs(Arc::clone(u), Arc::new(exponent)),
                        u.derive(var)?,
                    ]));
                }

                if !u_dep {
                    // d/dx b^v = b^v * ln(b) * v'
                    return Ok(Expr::product(vec![
                        self.clone(),
                        (**u).clone().ln(),
                        v.derive(var)?,
                    ]));
                }

                // Logarithmic differentiation: (u^v)' = u^v * (v' ln u + v u'/u)
                let log_part = Expr::product(vec![v.derive(var)?, (**u).clone().ln()]);
                let ratio_part = Expr::product(vec![
                    (**v).clone(),
                    u.derive(var)?,
                    (**u).clone().recip(),
                ]);
                Ok(Expr::product(vec![
                    self.clone(),
                    Expr::sum(vec![log_part, ratio_part]),
                ]))
            }
        }
    }

    /// Simplified derivative with respect to `var`.
    ///
    /// ```
    /// use symb_prob::parse;
    ///
    /// let f = parse("x^3 + 2*x").unwrap();
    /// let df = f.diff("x").unwrap();
    /// assert_eq!(df.eval_at("x", 2.0), Some(14.0));
    /// ```
    pub fn diff(&self, var: &str) -> Result<Expr, CasError> {
        let sym = InternedSymbol::new(var);
        Ok(self.derive(&sym)?.simplified())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Expr, parse};

    fn d(src: &str) -> Expr {
        parse(src).and_then(|e| e.diff("x")).unwrap_or_else(|e| panic!("{src}: {e}"))
    }

    fn close(e: &Expr, x: f64, want: f64) -> bool {
        e.eval_at("x", x).is_some_and(|v| (v - want).abs() < 1e-9)
    }

    #[test]
    fn test_polynomial() {
        assert_eq!(d("x^2"), parse("2*x").unwrap());
        assert!(d("5").is_number_eq(0.0));
        assert!(d("theta").is_number_eq(0.0));
    }

    #[test]
    fn test_chain_rule() {
        let e = d("exp(-theta*x)");
        let mut vars = std::collections::HashMap::new();
        vars.insert("x", 1.0);
        vars.insert("theta", 2.0);
        let v = e.eval_with(&vars).unwrap();
        assert!((v + 2.0 * (-2.0_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_cdf_to_pdf() {
        assert_eq!(d("1 - exp(-x)"), parse("exp(-x)").unwrap());
        let erf = d("(1 + erf(x/sqrt(2)))/2");
        let phi = (-0.5_f64).exp() / (2.0 * std::f64::consts::PI).sqrt();
        assert!(close(&erf, 1.0, phi));
    }

    #[test]
    fn test_variable_exponent() {
        let e = d("x^x");
        // (x^x)' = x^x (ln x + 1)
        assert!(close(&e, 2.0, 4.0 * (2.0_f64.ln() + 1.0)));
        let b = d("2^x");
        assert!(close(&b, 1.0, 2.0 * 2.0_f64.ln()));
    }

    #[test]
    fn test_quotient() {
        let e = d("1/(1 + x)");
        assert!(close(&e, 1.0, -0.25));
    }

    #[test]
    fn test_missing_derivative_is_error() {
        let r = parse("digamma(x)").and_then(|e| e.diff("x"));
        assert!(matches!(r, Err(crate::CasError::Unsupported(_))));
    }
}
