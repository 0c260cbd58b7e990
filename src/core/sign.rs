//! Structural sign analysis under per-symbol assumptions.
//!
//! The simplifier asks with [`Assumptions::none`] (only provable facts). The calculus layer
//! asks with [`Assumptions::positive_parameters`]: distribution parameters such as rates,
//! shapes and scales are taken to be positive unless overridden.
//!
//! A symbol may also carry open bounds, e.g. the interior of the segment it is integrated
//! over. When the structure alone leaves a sign unknown, bounded symbols are pushed
//! through interval arithmetic, so `1 - x` is positive for `x` in `(0, 1)`.

use std::collections::HashMap;

use super::expr::{Expr, ExprKind};
use crate::traits::as_integer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
    Zero,
    Unknown,
}

impl Sign {
    pub fn of_f64(v: f64) -> Sign {
        if v > 0.0 {
            Sign::Positive
        } else if v < 0.0 {
            Sign::Negative
        } else if v == 0.0 {
            Sign::Zero
        } else {
            Sign::Unknown
        }
    }

    pub fn negate(self) -> Sign {
        match self {
            Sign::Positive => Sign::Negative,
            Sign::Negative => Sign::Positive,
            s => s,
        }
    }

    fn mul(self, other: Sign) -> Sign {
        match (self, other) {
            (Sign::Zero, _) | (_, Sign::Zero) => Sign::Zero,
            (Sign::Unknown, _) | (_, Sign::Unknown) => Sign::Unknown,
            (a, b) if a == b => Sign::Positive,
            _ => Sign::Negative,
        }
    }

    pub fn is_positive(self) -> bool {
        self == Sign::Positive
    }

    pub fn is_negative(self) -> bool {
        self == Sign::Negative
    }
}

/// Sign facts about symbols.
#[derive(Debug, Clone, Default)]
pub struct Assumptions {
    signs: HashMap<String, Sign>,
    bounds: HashMap<String, (f64, f64)>,
    default_sign: Option<Sign>,
}

impl Assumptions {
    /// No assumptions: unknown symbols have unknown sign.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every symbol without an explicit entry is assumed positive.
    pub fn positive_parameters() -> Self {
        Assumptions {
            default_sign: Some(Sign::Positive),
            ..Self::default()
        }
    }

    /// Fix the sign of one symbol.
    pub fn with(mut self, name: &str, sign: Sign) -> Self {
        self.signs.insert(name.to_string(), sign);
        self
    }

    pub fn set(&mut self, name: &str, sign: Sign) {
        self.signs.insert(name.to_string(), sign);
    }

    /// Restrict a symbol to the open interval `(lo, hi)`; either end may be infinite.
    pub fn with_bounds(mut self, name: &str, lo: f64, hi: f64) -> Self {
        self.set_bounds(name, lo, hi);
        self
    }

    pub fn set_bounds(&mut self, name: &str, lo: f64, hi: f64) {
        if lo < hi {
            self.bounds.insert(name.to_string(), (lo, hi));
        }
    }

    pub fn sign_of_symbol(&self, name: &str) -> Sign {
        if name == "pi" {
            return Sign::Positive;
        }
        self.signs
            .get(name)
            .copied()
            .or(self.default_sign)
            .unwrap_or(Sign::Unknown)
    }
}

/// Sign of `expr` as far as it can be determined structurally.
pub fn sign_of(expr: &Expr, assumptions: &Assumptions) -> Sign {
    let structural = structural_sign(expr, assumptions);
    if structural != Sign::Unknown {
        return structural;
    }
    if let Some(v) = expr.to_f64() {
        return Sign::of_f64(v);
    }
    match Range::of(expr, assumptions) {
        Some(r) if r.lo > 0.0 || (r.lo == 0.0 && r.lo_open) => Sign::Positive,
        Some(r) if r.hi < 0.0 || (r.hi == 0.0 && r.hi_open) => Sign::Negative,
        _ => Sign::Unknown,
    }
}

/// Interval enclosing every value of an expression; an open end is never attained.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    lo: f64,
    hi: f64,
    lo_open: bool,
    hi_open: bool,
}

impl Range {
    fn point(v: f64) -> Self {
        Range { lo: v, hi: v, lo_open: false, hi_open: false }
    }

    fn open(lo: f64, hi: f64) -> Self {
        Range { lo, hi, lo_open: true, hi_open: true }
    }

    fn of(expr: &Expr, assumptions: &Assumptions) -> Option<Range> {
        if let Some(v) = expr.to_f64() {
            return v.is_finite().then(|| Range::point(v));
        }
        match expr.kind() {
            ExprKind::Number(_) => None,
            ExprKind::Symbol(s) => Range::of_symbol(s.as_str(), assumptions),
            ExprKind::Sum(terms) => terms.iter().try_fold(Range::point(0.0), |acc, t| {
                acc.add(Range::of(t, assumptions)?)
            }),
            ExprKind::Product(factors) => factors
                .iter()
                .try_fold(Range::point(1.0), |acc, f| Some(acc.mul(Range::of(f, assumptions)?))),
            ExprKind::Pow(base, exponent) => {
                Range::of(base, assumptions)?.pow(exponent.as_number()?)
            }
            ExprKind::FunctionCall { name, args } => {
                let arg = Range::of(args.first()?, assumptions)?;
                match name.as_str() {
                    "exp" => Some(arg.increasing(f64::exp)),
                    "ln" if arg.lo > 0.0 || (arg.lo == 0.0 && arg.lo_open) => {
                        Some(arg.increasing(f64::ln))
                    }
                    "sqrt" if arg.lo >= 0.0 => Some(arg.increasing(f64::sqrt)),
                    _ => None,
                }
            }
        }
    }

    fn of_symbol(name: &str, assumptions: &Assumptions) -> Option<Range> {
        let from_sign = match assumptions.sign_of_symbol(name) {
            Sign::Positive => Some(Range::open(0.0, f64::INFINITY)),
            Sign::Negative => Some(Range::open(f64::NEG_INFINITY, 0.0)),
            Sign::Zero => Some(Range::point(0.0)),
            Sign::Unknown => None,
        };
        let from_bounds = assumptions
            .bounds
            .get(name)
            .map(|(lo, hi)| Range::open(*lo, *hi));
        match (from_sign, from_bounds) {
            (Some(a), Some(b)) => a.intersect(b),
            (a, b) => a.or(b),
        }
    }

    fn intersect(self, other: Range) -> Option<Range> {
        let (lo, lo_open) = if self.lo > other.lo {
            (self.lo, self.lo_open)
        } else if other.lo > self.lo {
            (other.lo, other.lo_open)
        } else {
            (self.lo, self.lo_open || other.lo_open)
        };
        let (hi, hi_open) = if self.hi < other.hi {
            (self.hi, self.hi_open)
        } else if other.hi < self.hi {
            (other.hi, other.hi_open)
        } else {
            (self.hi, self.hi_open || other.hi_open)
        };
        (lo < hi || (lo == hi && !lo_open && !hi_open)).then_some(Range { lo, hi, lo_open, hi_open })
    }

    fn add(self, other: Range) -> Option<Range> {
        let (lo, hi) = (self.lo + other.lo, self.hi + other.hi);
        if lo.is_nan() || hi.is_nan() {
            return None;
        }
        Some(Range {
            lo,
            hi,
            lo_open: self.lo_open || other.lo_open,
            hi_open: self.hi_open || other.hi_open,
        })
    }

    fn mul(self, other: Range) -> Range {
        let ends = |r: Range| [(r.lo, r.lo_open), (r.hi, r.hi_open)];
        let mut corners = Vec::with_capacity(4);
        for (x, x_open) in ends(self) {
            for (y, y_open) in ends(other) {
                let closed_zero = (x == 0.0 && !x_open) || (y == 0.0 && !y_open);
                let v = x * y;
                // 0 * inf: the product approaches zero from that corner
                let v = if v.is_nan() { 0.0 } else { v };
                corners.push((v, (x_open || y_open) && !closed_zero));
            }
        }
        let pick = |better: fn(f64, f64) -> bool| {
            corners.iter().copied().fold(corners[0], |best, c| {
                if better(c.0, best.0) || (c.0 == best.0 && !c.1) { c } else { best }
            })
        };
        let (lo, lo_open) = pick(|a, b| a < b);
        let (hi, hi_open) = pick(|a, b| a > b);
        Range { lo, hi, lo_open, hi_open }
    }

    fn increasing(self, f: fn(f64) -> f64) -> Range {
        Range { lo: f(self.lo), hi: f(self.hi), ..self }
    }

    fn decreasing(self, f: impl Fn(f64) -> f64) -> Range {
        Range {
            lo: f(self.hi),
            hi: f(self.lo),
            lo_open: self.hi_open,
            hi_open: self.lo_open,
        }
    }

    fn pow(self, k: f64) -> Option<Range> {
        if let Some(n) = as_integer(k)
            && n > 0
        {
            let f = |v: f64| v.powi(n as i32);
            if n % 2 == 1 || self.lo >= 0.0 {
                return Some(Range { lo: f(self.lo), hi: f(self.hi), ..self });
            }
            if self.hi <= 0.0 {
                return Some(self.decreasing(f));
            }
            let (hi, hi_open) = if -self.lo > self.hi {
                (f(self.lo), self.lo_open)
            } else {
                (f(self.hi), self.hi_open)
            };
            return Some(Range { lo: 0.0, hi, lo_open: false, hi_open });
        }
        let positive = self.lo > 0.0 || (self.lo == 0.0 && self.lo_open);
        if k > 0.0 && self.lo >= 0.0 {
            Some(Range { lo: self.lo.powf(k), hi: self.hi.powf(k), ..self })
        } else if k < 0.0 && positive {
            Some(self.decreasing(|v| v.powf(k)))
        } else {
            None
        }
    }
}

fn structural_sign(expr: &Expr, assumptions: &Assumptions) -> Sign {
    match expr.kind() {
        ExprKind::Number(n) => Sign::of_f64(*n),
        ExprKind::Symbol(s) => assumptions.sign_of_symbol(s.as_str()),
        ExprKind::Product(factors) => factors
            .iter()
            .fold(Sign::Positive, |acc, f| acc.mul(sign_of(f, assumptions))),
        ExprKind::Sum(terms) => {
            let signs: Vec<Sign> = terms.iter().map(|t| sign_of(t, assumptions)).collect();
            let nonzero = || signs.iter().filter(|s| **s != Sign::Zero);
            if nonzero().all(|s| *s == Sign::Positive) && nonzero().count() > 0 {
                Sign::Positive
            } else if nonzero().all(|s| *s == Sign::Negative) && nonzero().count() > 0 {
                Sign::Negative
            } else if signs.iter().all(|s| *s == Sign::Zero) {
                Sign::Zero
            } else {
                Sign::Unknown
            }
        }
        ExprKind::Pow(base, exponent) => {
            let b = sign_of(base, assumptions);
            match b {
                Sign::Positive => Sign::Positive,
                Sign::Zero => {
                    if sign_of(exponent, assumptions).is_positive() {
                        Sign::Zero
                    } else {
                        Sign::Unknown
                    }
                }
                Sign::Negative => match exponent.as_number().and_then(as_integer) {
                    Some(k) if k % 2 == 0 => Sign::Positive,
                    Some(_) => Sign::Negative,
                    None => Sign::Unknown,
                },
                Sign::Unknown => Sign::Unknown,
            }
        }
        ExprKind::FunctionCall { name, args } => {
            let arg = match args.first() {
                Some(a) => a,
                None => return Sign::Unknown,
            };
            match name.as_str() {
                "exp" | "cosh" => Sign::Positive,
                "erfc" => Sign::Positive,
                "abs" => match sign_of(arg, assumptions) {
                    Sign::Zero => Sign::Zero,
                    Sign::Unknown => Sign::Unknown,
                    _ => Sign::Positive,
                },
                "sqrt" => match sign_of(arg, assumptions) {
                    Sign::Positive => Sign::Positive,
                    Sign::Zero => Sign::Zero,
                    _ => Sign::Unknown,
                },
                "sign" | "erf" | "atan" | "sinh" | "tanh" | "asin" => sign_of(arg, assumptions),
                "gamma" => {
                    if sign_of(arg, assumptions).is_positive() {
                        Sign::Positive
                    } else {
                        Sign::Unknown
                    }
                }
                "ln" => {
                    // ln u has the sign of u - 1
                    let shifted = Expr::sum(vec![(**arg).clone(), Expr::number(-1.0)]);
                    structural_sign(&shifted, assumptions)
                }
                _ => Sign::Unknown,
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
    fn test_numbers_and_exp() {
        let none = Assumptions::none();
        assert_eq!(sign_of(&Expr::number(-2.0), &none), Sign::Negative);
        assert_eq!(sign_of(&x().exp(), &none), Sign::Positive);
        assert_eq!(sign_of(&x(), &none), Sign::Unknown);
        assert_eq!(sign_of(&x().exp().negate(), &none), Sign::Negative);
    }

    #[test]
    fn test_positive_parameters() {
        let pos = Assumptions::positive_parameters();
        let e = Expr::product(vec![Expr::symbol("theta"), x()]);
        assert_eq!(sign_of(&e, &pos), Sign::Positive);
        let neg = Assumptions::positive_parameters().with("x", Sign::Negative);
        assert_eq!(sign_of(&e, &neg), Sign::Negative);
    }

    #[test]
    fn test_powers() {
        let none = Assumptions::none();
        let sq = Expr::pow(Expr::number(-3.0).exp().negate(), Expr::number(2.0));
        assert_eq!(sign_of(&sq, &none), Sign::Positive);
        let odd = Expr::pow(Expr::number(-2.0), x());
        assert_eq!(sign_of(&odd, &none), Sign::Unknown);
    }

    #[test]
    fn test_bounded_symbols() {
        let unit = Assumptions::none().with_bounds("x", 0.0, 1.0);
        let one_minus = Expr::sub_expr(Expr::one(), x());
        assert_eq!(sign_of(&one_minus, &unit), Sign::Positive);
        assert_eq!(sign_of(&Expr::sum(vec![x(), Expr::number(-2.0)]), &unit), Sign::Negative);
        assert_eq!(sign_of(&Expr::product(vec![x(), one_minus]), &unit), Sign::Positive);

        let straddle = Assumptions::none().with_bounds("x", -1.0, 2.0);
        let shifted = Expr::sum(vec![x(), Expr::number(-0.5)]);
        assert_eq!(sign_of(&shifted, &straddle), Sign::Unknown);
        let half_line = Assumptions::positive_parameters().with_bounds("x", 0.0, f64::INFINITY);
        let tail = Expr::sum(vec![x(), Expr::symbol("theta")]).recip();
        assert_eq!(sign_of(&tail, &half_line), Sign::Positive);
    }

    #[test]
    fn test_even_power_touches_zero() {
        let a = Assumptions::none().with_bounds("x", -1.0, 1.0);
        let sq = Expr::pow(x(), Expr::number(2.0));
        assert_eq!(sign_of(&sq, &a), Sign::Unknown);
        let shifted = Expr::sum(vec![sq, Expr::number(0.5)]);
        assert_eq!(sign_of(&shifted, &a), Sign::Positive);
    }

    #[test]
    fn test_ln_against_one() {
        let none = Assumptions::none();
        assert_eq!(sign_of(&Expr::number(0.5).ln(), &none), Sign::Negative);
        let pos = Assumptions::positive_parameters();
        let e = Expr::sum(vec![Expr::one(), x()]).ln();
        assert_eq!(sign_of(&e, &pos), Sign::Positive);
    }
}
