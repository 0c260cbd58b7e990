//! Parser module - converts strings to expressions
mod implicit_mul;
mod lexer;
mod pratt;
mod tokens;

use crate::Expr;
use crate::error::CasError;

/// Parse a formula string into an expression.
///
/// Accepts `+ - * / ^` (and `**`), unary minus, function calls from the registry,
/// implicit multiplication (`2x`, `3(x+1)`, `(a)(b)`), the constants `pi` and `e`,
/// and `oo`/`inf`/`infinity` for positive infinity.
///
/// # Example
/// ```
/// use symb_prob::parse;
///
/// let f = parse("theta*exp(-theta*x)").unwrap();
/// assert!(f.contains_var("theta"));
/// ```
///
/// # Errors
/// Returns `CasError` for empty input, unknown characters, malformed numbers,
/// unbalanced parentheses, or a wrong number of function arguments.
pub fn parse(input: &str) -> Result<Expr, CasError> {
    // Pipeline: validate -> lex -> implicit_mul -> parse
    if input.trim().is_empty() {
        return Err(CasError::EmptyFormula);
    }
    let tokens = lexer::lex(input)?;
    let tokens = implicit_mul::insert_implicit_multiplication(tokens);
    pratt::parse_expression(&tokens)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Standard test relaxations")]
mod tests {
    use super::*;

    fn at(input: &str, x: f64) -> f64 {
        parse(input).unwrap().eval_at("x", x).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(at("1 + 2*x^2", 3.0), 19.0);
        assert_eq!(at("-x^2", 3.0), -9.0);
        assert_eq!(at("2^3^2", 0.0), 512.0);
        assert_eq!(at("(1 - x)/(1 + x)", 3.0), -0.5);
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(at("2x", 4.0), 8.0);
        assert_eq!(at("3(x+1)", 1.0), 6.0);
        assert_eq!(at("(x)(x)", 5.0), 25.0);
    }

    #[test]
    fn test_functions_and_constants() {
        assert!((at("exp(-x)", 1.0) - (-1.0_f64).exp()).abs() < 1e-15);
        assert!((at("log(x)", std::f64::consts::E) - 1.0).abs() < 1e-15);
        assert_eq!(at("sqrt(x)", 9.0), 3.0);
        assert!((at("pi*x", 1.0) - std::f64::consts::PI).abs() < 1e-15);
        assert_eq!(parse("oo").unwrap().infinity_sign(), Some(1));
        assert_eq!(parse("-inf").unwrap().infinity_sign(), Some(-1));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("   "), Err(CasError::EmptyFormula));
        assert_eq!(parse("x +"), Err(CasError::UnexpectedEndOfInput));
        assert!(matches!(parse("(x + 1"), Err(CasError::UnexpectedEndOfInput)));
        assert!(matches!(parse("x + 1)"), Err(CasError::UnexpectedToken { .. })));
        assert!(matches!(
            parse("exp(x, 2)"),
            Err(CasError::InvalidFunctionCall { .. })
        ));
    }

    #[test]
    fn test_display_round_trip() {
        for src in ["1 - exp(-2*x)", "x^2/2", "6*x*(1 - x)", "theta*exp(-theta*x)"] {
            let e = parse(src).unwrap();
            let back = parse(&e.to_string()).unwrap();
            let vars = [("x", 0.7), ("theta", 1.3)].into_iter().collect();
            let a = e.eval_with(&vars).unwrap();
            let b = back.eval_with(&vars).unwrap();
            assert!((a - b).abs() < 1e-12, "{src} -> {e}");
        }
    }
}
