#[cfg(test)]
mod tests {
    use crate::{Form, Piecewise, VAR, catalog};

    const FORMS: [Form; 5] = [Form::Pdf, Form::Cdf, Form::Sf, Form::Hf, Form::Chf];

    /// Compare segment values at interior points of each finite or half-infinite piece.
    fn assert_same_values(a: &Piecewise, b: &Piecewise, label: &str) {
        assert_eq!(a.breakpoints(), b.breakpoints(), "{label}: breakpoints");
        let bps = a.numeric_breakpoints().unwrap();
        for (i, (sa, sb)) in a.segments().iter().zip(b.segments()).enumerate() {
            let (lo, hi) = (bps[i], bps[i + 1]);
            let points: Vec<f64> = if hi.is_finite() {
                vec![lo + 0.3 * (hi - lo), lo + 0.7 * (hi - lo)]
            } else {
                vec![lo + 0.5, lo + 2.0]
            };
            for p in points {
                let (va, vb) = (sa.eval_at(VAR, p).unwrap(), sb.eval_at(VAR, p).unwrap());
                assert!((va - vb).abs() < 1e-9, "{label} at {p}: {va} vs {vb}");
            }
        }
    }

    fn assert_round_trips(x: &Piecewise, forms: &[Form]) {
        for &from in forms {
            let start = x.to_form(from).unwrap();
            for &via in forms {
                let back = start.to_form(via).unwrap().to_form(from).unwrap();
                assert_same_values(&start, &back, &format!("{from} -> {via} -> {from}"));
            }
        }
    }

    #[test]
    fn test_exponential_round_trips() {
        let x = catalog::exponential(2.0).unwrap();
        assert_round_trips(&x, &FORMS);
    }

    #[test]
    fn test_uniform_round_trips() {
        let x = catalog::uniform(0.0, 1.0).unwrap();
        assert_round_trips(&x, &FORMS);
        let shifted = catalog::uniform(-2.0, 3.0).unwrap();
        assert_round_trips(&shifted, &FORMS);
    }

    #[test]
    fn test_uniform_hazard_forms() {
        let x = catalog::uniform(0.0, 1.0).unwrap();
        let hf = x.to_form(Form::Hf).unwrap();
        let chf = x.to_form(Form::Chf).unwrap();
        for t in [0.1, 0.5, 0.9] {
            let h = hf.segments()[0].eval_at(VAR, t).unwrap();
            let c = chf.segments()[0].eval_at(VAR, t).unwrap();
            assert!((h - 1.0 / (1.0 - t)).abs() < 1e-12);
            assert!((c + (1.0 - t).ln()).abs() < 1e-12);
        }
        assert!(!chf.segments()[0].to_string().contains("abs"));
    }

    #[test]
    fn test_triangular_round_trips() {
        let x = catalog::triangular(0.0, 1.0, 2.0).unwrap();
        assert_round_trips(&x, &FORMS);
        let skewed = catalog::triangular(0.0, 1.0, 3.0).unwrap();
        assert_round_trips(&skewed, &FORMS);
    }

    #[test]
    fn test_triangular_hazard_to_density() {
        let x = catalog::triangular(0.0, 1.0, 2.0).unwrap();
        let pdf = x.to_form(Form::Hf).unwrap().to_form(Form::Pdf).unwrap();
        for (t, want) in [(0.25, 0.25), (0.8, 0.8), (1.5, 0.5)] {
            let got = pdf.pdf_at(t).unwrap().to_f64().unwrap();
            assert!((got - want).abs() < 1e-9, "pdf({t}) = {got}");
        }
    }

    /// Families whose hazard has an elementary antiderivative go through every form.
    #[test]
    fn test_half_line_families_round_trip() {
        for x in [
            catalog::weibull(1.0, 2.0).unwrap(),
            catalog::lomax(1.0, 2.0).unwrap(),
            catalog::pareto(1.0, 3.0).unwrap(),
        ] {
            assert_round_trips(&x, &FORMS);
        }
    }

    #[test]
    fn test_discrete_round_trips_through_every_form() {
        let x = Piecewise::discrete(vec![0.1, 0.2, 0.3, 0.4], [-1.0, 0.0, 2.0, 5.0]).unwrap();
        for &from in &FORMS {
            let start = x.to_form(from).unwrap();
            for &via in &FORMS {
                let back = start.to_form(via).unwrap().to_form(from).unwrap();
                for (a, b) in start.segments().iter().zip(back.segments()) {
                    let (a, b) = (a.to_f64().unwrap(), b.to_f64().unwrap());
                    assert!((a - b).abs() < 1e-12, "{from} -> {via}: {a} vs {b}");
                }
            }
        }
    }

    #[test]
    fn test_total_mass_at_right_end() {
        for x in [
            catalog::uniform(-2.0, 5.0).unwrap(),
            catalog::triangular(0.0, 2.0, 3.0).unwrap(),
            catalog::exponential(0.5).unwrap(),
        ] {
            let (_, hi) = x.support();
            let total = x.cdf_at(hi).unwrap().to_f64().unwrap();
            assert!((total - 1.0).abs() < 1e-4, "{x}");
        }
        let d = catalog::binomial(5, 0.3).unwrap();
        let total: f64 = d.segments().iter().map(|s| s.to_f64().unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }
}
