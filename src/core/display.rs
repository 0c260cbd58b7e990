//! Display for expressions.
//!
//! Human-readable infix notation that parses back to an equal-valued expression:
//! - `x^2 + 2*x + 1`
//! - `1 - exp(-2*x)`
//! - negative powers print as division: `x*y^-1` shows as `x/y`
//! - `u^0.5` prints as `sqrt(u)`
//! - infinities print as `inf` / `-inf`

use std::fmt;
use std::sync::Arc;

use super::expr::{Expr, ExprKind};

/// Format a float compactly: integers without a fraction, extremes in exponent form.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let a = n.abs();
    if !(1e-6..1e16).contains(&a) {
        return format!("{n:e}");
    }
    if n.fract() == 0.0 {
        #[allow(clippy::cast_possible_truncation, reason = "checked integral and < 1e16")]
        return format!("{}", n as i64);
    }
    format!("{n}")
}

/// If the expression carries a leading minus sign, return its positive counterpart.
fn strip_negative(expr: &Expr) -> Option<Expr> {
    match expr.kind() {
        ExprKind::Number(n) if *n < 0.0 => Some(Expr::number(-*n)),
        ExprKind::Product(factors) => match factors.first().and_then(|f| f.as_number()) {
            Some(c) if c < 0.0 => {
                let mut rest: Vec<Arc<Expr>> = Vec::with_capacity(factors.len());
                if c != -1.0 {
                    rest.push(Arc::new(Expr::number(-c)));
                }
                rest.extend_from_slice(&factors[1..]);
                Some(Expr::product_from_arcs(rest))
            }
            _ => None,
        },
        _ => None,
    }
}

/// A factor with a negative numeric exponent, returned with the exponent flipped.
fn as_denominator(factor: &Expr) -> Option<Expr> {
    if let ExprKind::Pow(base, exp) = factor.kind()
        && let Some(e) = exp.as_number()
        && e < 0.0
    {
        return Some(Expr::pow_from_arcs(
            Arc::clone(base),
            Arc::new(Expr::number(-e)),
        ));
    }
    None
}

fn needs_parens_in_product(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::Sum(_) => true,
        ExprKind::Number(n) => *n < 0.0,
        _ => false,
    }
}

fn needs_parens_as_base(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::Sum(_) | ExprKind::Product(_) | ExprKind::Pow(_, _) => true,
        ExprKind::Number(n) => *n < 0.0 || n.fract() != 0.0,
        _ => false,
    }
}

fn is_atom(e: &Expr) -> bool {
    match e.kind() {
        ExprKind::Number(n) => *n >= 0.0,
        ExprKind::Symbol(_) | ExprKind::FunctionCall { .. } => true,
        _ => false,
    }
}

fn write_factor(f: &mut fmt::Formatter<'_>, e: &Expr) -> fmt::Result {
    if needs_parens_in_product(e) {
        write!(f, "({e})")
    } else {
        write!(f, "{e}")
    }
}

fn write_product(f: &mut fmt::Formatter<'_>, factors: &[Arc<Expr>]) -> fmt::Result {
    let mut numer: Vec<&Expr> = Vec::new();
    let mut denom: Vec<Expr> = Vec::new();
    let mut coeff: Option<f64> = None;
    for (i, factor) in factors.iter().enumerate() {
        if i == 0
            && let Some(c) = factor.as_number()
        {
            coeff = Some(c);
            continue;
        }
        match as_denominator(factor) {
            Some(d) => denom.push(d),
            None => numer.push(factor),
        }
    }

    let mut first = true;
    match coeff {
        Some(c) if c == -1.0 && !numer.is_empty() => write!(f, "-")?,
        Some(c) => {
            write!(f, "{}", format_number(c))?;
            first = false;
        }
        None => {}
    }
    if numer.is_empty() && first {
        write!(f, "1")?;
    }
    for factor in numer {
        if !first {
            write!(f, "*")?;
        }
        write_factor(f, factor)?;
        first = false;
    }

    if !denom.is_empty() {
        write!(f, "/")?;
        if denom.len() == 1 && is_atom(&denom[0]) {
            write!(f, "{}", denom[0])?;
        } else if denom.len() == 1 && matches!(denom[0].kind(), ExprKind::Pow(_, _)) {
            write!(f, "{}", denom[0])?;
        } else {
            write!(f, "(")?;
            for (i, d) in denom.iter().enumerate() {
                if i > 0 {
                    write!(f, "*")?;
                }
                write_factor(f, d)?;
            }
            write!(f, ")")?;
        }
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Number(n) => write!(f, "{}", format_number(*n)),
            ExprKind::Symbol(s) => write!(f, "{s}"),
            ExprKind::FunctionCall { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            ExprKind::Sum(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i == 0 {
                        write!(f, "{term}")?;
                        continue;
                    }
                    match strip_negative(term) {
                        Some(pos) => write!(f, " - {pos}")?,
                        None => write!(f, " + {term}")?,
                    }
                }
                Ok(())
            }
            ExprKind::Product(factors) => write_product(f, factors),
            ExprKind::Pow(base, exp) => {
                if exp.is_number_eq(0.5) {
                    return write!(f, "sqrt({base})");
                }
                if as_denominator(self).is_some() {
                    return write_product(f, &[Arc::new(self.clone())]);
                }
                if needs_parens_as_base(base) {
                    write!(f, "({base})")?;
                } else {
                    write!(f, "{base}")?;
                }
                if is_atom(exp) && !matches!(exp.kind(), ExprKind::Number(n) if n.fract() != 0.0)
                {
                    write!(f, "^{exp}")
                } else {
                    write!(f, "^({exp})")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::symbol("x")
    }

    #[test]
    fn test_number_format() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::INFINITY), "inf");
        assert_eq!(format_number(1e-9), "1e-9");
    }

    #[test]
    fn test_sum_with_negative_term() {
        let e = Expr::sum(vec![Expr::one(), x().negate().exp().negate()]);
        assert_eq!(e.to_string(), "1 - exp(-x)");
    }

    #[test]
    fn test_division_display() {
        assert_eq!(x().recip().to_string(), "1/x");
        let e = Expr::product(vec![Expr::number(2.0), x(), Expr::symbol("y").recip()]);
        assert_eq!(e.to_string(), "2*x/y");
    }

    #[test]
    fn test_power_display() {
        assert_eq!(x().pow_of(2.0).to_string(), "x^2");
        assert_eq!(x().sqrt().to_string(), "sqrt(x)");
        let s = Expr::sum(vec![x(), Expr::one()]).pow_of(3.0);
        assert_eq!(s.to_string(), "(1 + x)^3");
    }
}
