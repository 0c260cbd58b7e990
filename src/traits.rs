use num_traits::Float;

/// Default tolerance for floating-point comparisons
pub(crate) const FLOAT_TOLERANCE: f64 = 1e-10;

/// Check if a value is approximately zero
#[inline]
pub fn is_zero<T: Float>(value: T) -> bool {
    match T::from(FLOAT_TOLERANCE) {
        Some(tol) => value.abs() < tol,
        None => value == T::zero(),
    }
}

/// Check if a value is approximately one
#[inline]
pub fn is_one<T: Float>(value: T) -> bool {
    is_zero(value - T::one())
}

/// Relative-or-absolute closeness, used when comparing values that may be large.
#[inline]
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    diff <= tol || diff <= tol * a.abs().max(b.abs())
}

/// Whether a float holds an integer value that fits comfortably in an i64.
#[inline]
pub fn as_integer(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        #[allow(clippy::cast_possible_truncation, reason = "checked integral and in range")]
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_zero() {
        assert!(is_zero(0.0_f64));
        assert!(is_zero(1e-11_f64));
        assert!(!is_zero(1e-9_f64));
        assert!(is_zero(-1e-11_f64));
    }

    #[test]
    fn test_is_one() {
        assert!(is_one(1.0_f64));
        assert!(is_one(1.0 + 1e-11_f64));
        assert!(!is_one(1.1_f64));
        assert!(is_one(1.0_f32));
    }

    #[test]
    fn test_approx_eq_relative() {
        assert!(approx_eq(1e12, 1e12 + 1.0, 1e-9));
        assert!(!approx_eq(1.0, 1.001, 1e-5));
        assert!(approx_eq(0.5, 0.500_000_001, 1e-5));
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(as_integer(3.0), Some(3));
        assert_eq!(as_integer(-2.0), Some(-2));
        assert_eq!(as_integer(2.5), None);
        assert_eq!(as_integer(f64::INFINITY), None);
    }
}
