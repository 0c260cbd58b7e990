#[cfg(test)]
mod tests {
    use crate::calculus::{Side, integrate, limit, solve};
    use crate::{CasError, Expr, parse};

    fn close(e: &Expr, v: f64) -> bool {
        e.to_f64().is_some_and(|x| (x - v).abs() < 1e-9)
    }

    #[test]
    fn test_display_parses_back_to_same_value() {
        for src in ["x^2 - 3*x + 1", "exp(-2*x)/x", "sqrt(x)*ln(x + 1)", "1/(1 + x^2)"] {
            let e = parse(src).unwrap().simplified();
            let again = parse(&e.to_string()).unwrap();
            for x in [0.3, 1.7, 4.0] {
                let (a, b) = (e.eval_at("x", x).unwrap(), again.eval_at("x", x).unwrap());
                assert!((a - b).abs() < 1e-12, "{src}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse(""), Err(CasError::EmptyFormula));
        assert!(matches!(parse("foo(x)"), Err(CasError::InvalidSyntax { .. })));
        assert!(parse("(x + 1").is_err());
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let f = parse("x^3*exp(-x) + sin(2*x)").unwrap();
        let df = f.diff("x").unwrap();
        let h = 1e-6;
        for x in [0.5, 1.0, 2.5] {
            let numeric =
                (f.eval_at("x", x + h).unwrap() - f.eval_at("x", x - h).unwrap()) / (2.0 * h);
            assert!((df.eval_at("x", x).unwrap() - numeric).abs() < 1e-5);
        }
    }

    #[test]
    fn test_gamma_density_integrates_to_one() {
        let f = parse("x^2*exp(-x)/2").unwrap();
        let area = integrate(&f, "x", &Expr::zero(), &Expr::infinity()).unwrap();
        assert!(close(&area, 1.0));
    }

    #[test]
    fn test_polynomial_integral() {
        let f = parse("3*x^2 - 2*x").unwrap();
        let area = integrate(&f, "x", &Expr::number(1.0), &Expr::number(2.0)).unwrap();
        assert!(close(&area, 4.0));
    }

    #[test]
    fn test_limit_of_decaying_tail() {
        let e = parse("x^4*exp(-x)").unwrap();
        let l = limit(&e, "x", &Expr::infinity(), Side::Both).unwrap();
        assert_eq!(l, Expr::zero());
    }

    #[test]
    fn test_solve_quadratic() {
        let e = parse("x^2 - 5*x + 6").unwrap();
        let mut roots: Vec<f64> = solve(&e, "x")
            .unwrap()
            .iter()
            .map(|r| r.to_f64().unwrap())
            .collect();
        roots.sort_by(f64::total_cmp);
        assert!((roots[0] - 2.0).abs() < 1e-12);
        assert!((roots[1] - 3.0).abs() < 1e-12);
    }
}
