#[cfg(test)]
mod tests {
    use crate::{
        DistError, Expr, Form, Kind, Piecewise, Sampler, Transform, catalog, convolution,
        maximum, minimum, minimum_iid, order_stat, truncate,
    };

    fn num(e: crate::error::Result<Expr>) -> f64 {
        e.unwrap().to_f64().unwrap()
    }

    #[test]
    fn test_uniform_density_and_half_cdf() {
        let x = catalog::uniform(0.0, 1.0).unwrap();
        let pdf = x.pdf().unwrap();
        assert_eq!(pdf.segments(), &[Expr::one()]);
        assert_eq!(pdf.numeric_breakpoints().unwrap(), vec![0.0, 1.0]);
        assert_eq!(x.cdf_at(0.5).unwrap().to_f64(), Some(0.5));
    }

    #[test]
    fn test_exponential_mean_and_variance() {
        let x = catalog::exponential(1.0).unwrap();
        assert!((num(x.mean()) - 1.0).abs() < 1e-12);
        assert!((num(x.variance()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_minimum_of_unit_exponentials_has_rate_two() {
        let x = catalog::exponential(1.0).unwrap();
        let m = minimum(&x, &x).unwrap();
        for t in [0.1_f64, 0.5, 1.0, 3.0] {
            let expected = 1.0 - (-2.0 * t).exp();
            assert!((num(m.cdf_at(t)) - expected).abs() < 1e-9);
        }
        let iid = minimum_iid(&x, 2).unwrap();
        assert!((num(iid.cdf_at(1.0)) - num(m.cdf_at(1.0))).abs() < 1e-12);
    }

    #[test]
    fn test_median_of_three_uniforms_is_beta_two_two() {
        let x = catalog::uniform(0.0, 1.0).unwrap();
        let m = order_stat(&x, 3, 2).unwrap();
        assert_eq!(m.numeric_breakpoints().unwrap(), vec![0.0, 1.0]);
        for v in [0.2, 0.5, 0.9] {
            assert!((num(m.pdf_at(v)) - 6.0 * v * (1.0 - v)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_descending_breakpoints_are_structural() {
        let r = Piecewise::continuous(1.0, [1.0, 0.0]);
        assert!(matches!(r, Err(DistError::Structural(_))));
    }

    #[test]
    fn test_unknown_labels_are_structural() {
        assert!(matches!(
            Piecewise::with_labels(1.0, [0.0, 1.0], "continuous", "mgf"),
            Err(DistError::Structural(_))
        ));
        assert!(matches!("lattice".parse::<Kind>(), Err(DistError::Structural(_))));
        assert_eq!("CDF".parse::<Form>().unwrap(), Form::Cdf);
    }

    #[test]
    fn test_mixing_kinds_is_domain_error() {
        let c = catalog::uniform(0.0, 1.0).unwrap();
        let d = catalog::bernoulli(0.5).unwrap();
        assert!(matches!(convolution(&c, &d), Err(DistError::Domain(_))));
        assert!(matches!(maximum(&c, &d), Err(DistError::Domain(_))));
    }

    #[test]
    fn test_sum_of_dice() {
        let die = catalog::discrete_uniform(1, 6).unwrap();
        let two = convolution(&die, &die).unwrap();
        assert_eq!(two.breakpoints().len(), 11);
        assert!((num(two.pdf_at(7.0)) - 6.0 / 36.0).abs() < 1e-12);
        assert!((num(two.mean()) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_truncated_exponential_is_proper() {
        let x = catalog::exponential(1.0).unwrap();
        let t = truncate(&x, 1.0, 2.0).unwrap();
        assert!((num(t.cdf_at(2.0)) - 1.0).abs() < 1e-9);
        assert!(matches!(t.pdf_at(0.5), Err(DistError::Domain(_))));
        assert!(t.verify_pdf().unwrap().valid);
    }

    #[test]
    fn test_transform_then_sample() {
        let x = catalog::uniform(0.0, 1.0).unwrap();
        let y = x.transform(&Transform::function("exp(x)").unwrap()).unwrap();
        let draws = Sampler::new().seed(11).variate(&y, 25).unwrap();
        assert!(draws.iter().all(|v| *v >= 1.0 - 1e-9 && *v <= 1.0_f64.exp() + 1e-9));
    }

    #[test]
    fn test_symbolic_parameter_flow() {
        let x = catalog::exponential("theta").unwrap();
        assert!(matches!(x.verify_pdf(), Err(DistError::Parameter(_))));
        let bound = x.substitute("theta", 3.0).unwrap();
        assert!(bound.verify_pdf().unwrap().valid);
        assert!((num(bound.mean()) - 1.0 / 3.0).abs() < 1e-12);
    }
}
