//! Property-Based and Fuzz Testing
//!
//! Uses quickcheck for:
//! - Parser robustness (fuzz testing)
//! - Distribution invariants: monotone CDFs, unit mass, independence algebra

use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

use crate::{Piecewise, catalog, parse};

/// Generate random valid expression strings for fuzz testing
fn random_expr_string(g: &mut Gen) -> String {
    let depth = g.size().min(4);
    gen_expr_string_recursive(g, depth)
}

fn gen_expr_string_recursive(g: &mut Gen, depth: usize) -> String {
    if depth == 0 {
        return match u8::arbitrary(g) % 4 {
            0 => {
                let n = f64::arbitrary(g);
                if n.is_finite() && n.abs() < 1e10 {
                    format!("{n:.4}")
                } else {
                    "1.0".to_string()
                }
            }
            1 => "x".to_string(),
            2 => "theta".to_string(),
            _ => "2".to_string(),
        };
    }
    match u8::arbitrary(g) % 8 {
        0..=2 => {
            let ops = ["+", "-", "*", "/", "^"];
            let op = ops[usize::arbitrary(g) % ops.len()];
            let left = gen_expr_string_recursive(g, depth - 1);
            let right = gen_expr_string_recursive(g, depth - 1);
            format!("({left} {op} {right})")
        }
        3..=5 => {
            let fns = ["exp", "ln", "sqrt", "abs", "erf", "atan"];
            let f = fns[usize::arbitrary(g) % fns.len()];
            format!("{f}({})", gen_expr_string_recursive(g, depth - 1))
        }
        6 => format!("-({})", gen_expr_string_recursive(g, depth - 1)),
        _ => gen_expr_string_recursive(g, depth - 1),
    }
}

/// Uniform with small integer endpoints drawn from two bytes.
fn small_uniform(a: i8, w: u8) -> (f64, f64, Piecewise) {
    let lo = f64::from(a % 4);
    let hi = lo + 1.0 + f64::from(w % 3);
    let u = catalog::uniform(lo, hi).unwrap();
    (lo, hi, u)
}

fn uniform_cdf(lo: f64, hi: f64, t: f64) -> f64 {
    ((t - lo) / (hi - lo)).clamp(0.0, 1.0)
}

fn value(e: crate::error::Result<crate::Expr>) -> f64 {
    e.ok().and_then(|v| v.to_f64()).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod parser_fuzz_tests {
    use super::*;

    /// Property: Parser should never panic on arbitrary input
    #[test]
    fn test_parser_no_panic() {
        fn prop_parser_no_panic(input: String) -> TestResult {
            if input.len() > 200 {
                return TestResult::discard();
            }
            let _ = parse(&input);
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(2000)
            .quickcheck(prop_parser_no_panic as fn(String) -> TestResult);
    }

    /// Property: generated well-formed expressions always parse
    #[test]
    fn test_valid_expr_parses() {
        fn prop_valid_expr_parses() -> bool {
            let mut g = Gen::new(4);
            let src = random_expr_string(&mut g);
            parse(&src).is_ok()
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(prop_valid_expr_parses as fn() -> bool);
    }
}

#[cfg(test)]
mod distribution_property_tests {
    use super::*;
    use crate::{convolution, maximum, minimum, product, truncate};
    use crate::tests::numeric_mass;

    /// Property: CDFs rise from 0 to 1 without decreasing
    #[test]
    fn test_uniform_cdf_is_monotone() {
        fn prop(a: i8, w: u8) -> bool {
            let (lo, hi, u) = small_uniform(a, w);
            let values: Vec<f64> = (0..=8)
                .map(|k| value(u.cdf_at(lo + (hi - lo) * f64::from(k) / 8.0)))
                .collect();
            values.windows(2).all(|p| p[1] >= p[0] - 1e-12)
                && values[0].abs() < 1e-12
                && (values[8] - 1.0).abs() < 1e-12
        }
        QuickCheck::new().tests(30).quickcheck(prop as fn(i8, u8) -> bool);
    }

    #[test]
    fn test_exponential_cdf_is_monotone() {
        fn prop(r: u8) -> bool {
            let theta = 0.5 + f64::from(r % 8) / 2.0;
            let x = catalog::exponential(theta).unwrap();
            let values: Vec<f64> = (0..10).map(|k| value(x.cdf_at(f64::from(k) * 0.4))).collect();
            values.windows(2).all(|p| p[1] >= p[0] - 1e-12)
        }
        QuickCheck::new().tests(20).quickcheck(prop as fn(u8) -> bool);
    }

    /// Property: `F_max = F_X F_Y` and `S_min = S_X S_Y` for independent operands
    #[test]
    fn test_extremes_follow_independence() {
        fn prop(a1: i8, w1: u8, a2: i8, w2: u8) -> bool {
            let (lo1, hi1, x) = small_uniform(a1, w1);
            let (lo2, hi2, y) = small_uniform(a2, w2);
            let (mx, mn) = (maximum(&x, &y).unwrap(), minimum(&x, &y).unwrap());
            let (lo, hi) = (lo1.min(lo2), hi1.max(hi2));
            (1..8).all(|k| {
                let t = lo + (hi - lo) * f64::from(k) / 8.0;
                let (fx, fy) = (uniform_cdf(lo1, hi1, t), uniform_cdf(lo2, hi2, t));
                let max_ok = (value(mx.cdf_at(t)) - fx * fy).abs() < 1e-9;
                let min_ok = (value(mn.sf_at(t)) - (1.0 - fx) * (1.0 - fy)).abs() < 1e-9;
                max_ok && min_ok
            })
        }
        QuickCheck::new()
            .tests(15)
            .quickcheck(prop as fn(i8, u8, i8, u8) -> bool);
    }

    /// Property: the product of two uniforms is a proper density, whatever the signs
    #[test]
    fn test_product_has_unit_mass() {
        fn prop(a1: i8, w1: u8, a2: i8, w2: u8) -> bool {
            let (_, _, x) = small_uniform(a1, w1);
            let (_, _, y) = small_uniform(a2, w2);
            let p = product(&x, &y).unwrap();
            (numeric_mass(&p) - 1.0).abs() < 5e-3
        }
        QuickCheck::new()
            .tests(8)
            .quickcheck(prop as fn(i8, u8, i8, u8) -> bool);
    }

    /// Property: a truncated distribution reaches probability one at its upper bound
    #[test]
    fn test_truncation_renormalises() {
        fn prop(r: u8, a: u8, w: u8) -> bool {
            let theta = 0.5 + f64::from(r % 4) / 2.0;
            let lo = f64::from(a % 3) / 2.0;
            let hi = lo + 0.5 + f64::from(w % 3);
            let x = catalog::exponential(theta).unwrap();
            let t = truncate(&x, lo, hi).unwrap();
            (value(t.cdf_at(hi)) - 1.0).abs() < 1e-9 && value(t.cdf_at(lo)).abs() < 1e-9
        }
        QuickCheck::new()
            .tests(15)
            .quickcheck(prop as fn(u8, u8, u8) -> bool);
    }

    /// Property: means add under convolution
    #[test]
    fn test_convolution_adds_means() {
        fn prop(r1: u8, r2: u8) -> bool {
            let (t1, t2) = (1.0 + f64::from(r1 % 3), 1.0 + f64::from(r2 % 3));
            let x = catalog::exponential(t1).unwrap();
            let y = catalog::exponential(t2).unwrap();
            let s = convolution(&x, &y).unwrap();
            (value(s.mean()) - (1.0 / t1 + 1.0 / t2)).abs() < 1e-9
        }
        QuickCheck::new().tests(9).quickcheck(prop as fn(u8, u8) -> bool);
    }
}
