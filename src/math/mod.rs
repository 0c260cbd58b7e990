//! Numeric special functions backing the function registry and the combinatorial
//! coefficients used by order statistics.
//!
//! Functions with poles return `Option` and reject them.

use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Error function: Maclaurin series near zero, continued fraction for the tails.
pub fn eval_erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x.abs() >= 3.0 {
        return x.signum() * (1.0 - erfc_continued_fraction(x.abs()));
    }
    let mut sum = 0.0;
    let mut term = x;
    let x2 = x * x;
    for n in 0..80 {
        let contribution = term / f64::from(2 * n + 1);
        sum += contribution;
        if contribution.abs() < 1e-17 * sum.abs().max(1e-300) {
            break;
        }
        term *= -x2 / f64::from(n + 1);
    }
    2.0 / PI.sqrt() * sum
}

/// Complementary error function, accurate in the upper tail.
pub fn eval_erfc(x: f64) -> f64 {
    if x >= 3.0 {
        erfc_continued_fraction(x)
    } else {
        1.0 - eval_erf(x)
    }
}

fn erfc_continued_fraction(x: f64) -> f64 {
    // erfc(x) = exp(-x^2)/sqrt(pi) / (x + (1/2)/(x + 1/(x + (3/2)/(x + ...))))
    let mut k = x;
    for n in (1..=60).rev() {
        k = x + (f64::from(n) / 2.0) / k;
    }
    (-x * x).exp() / (PI.sqrt() * k)
}

/// Gamma function (Lanczos approximation with reflection).
pub fn eval_gamma(x: f64) -> Option<f64> {
    if x <= 0.0 && x.fract() == 0.0 {
        return None;
    }
    if x < 0.5 {
        return Some(PI / ((PI * x).sin() * eval_gamma(1.0 - x)?));
    }
    let x = x - 1.0;
    let mut ag = LANCZOS_COEFFS[0];
    for (i, &coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        ag += coeff / (x + i as f64);
    }
    let t = x + LANCZOS_G + 0.5;
    Some((2.0 * PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * ag)
}

/// Digamma function ψ(x) = Γ'(x)/Γ(x).
pub fn eval_digamma(x: f64) -> Option<f64> {
    if x <= 0.0 && x.fract() == 0.0 {
        return None;
    }
    if x < 0.5 {
        return Some(eval_digamma(1.0 - x)? - PI * (PI * x).cos() / (PI * x).sin());
    }
    let mut xv = x;
    let mut result = 0.0;
    while xv < 6.0 {
        result -= 1.0 / xv;
        xv += 1.0;
    }
    result += xv.ln() - 0.5 / xv;
    let x2 = xv * xv;
    let t1 = 1.0 / (12.0 * x2);
    let t2 = 1.0 / (120.0 * x2 * x2);
    let t3 = 1.0 / (252.0 * x2 * x2 * x2);
    Some(result - t1 + t2 - t3)
}

/// `n!` as a float.
pub fn factorial(n: u32) -> f64 {
    (1..=n).map(f64::from).product()
}

/// Binomial coefficient `C(n, k)`; zero when `k > n`.
pub fn binomial(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * f64::from(n - i) / f64::from(i + 1))
}
