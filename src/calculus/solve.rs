//! Solve `expr = 0` for one variable.
//!
//! Strategies, in order: closed forms for polynomials of degree one and two, isolation
//! (peel invertible functions off the only term that depends on the variable), and
//! kernel substitution, which turns `a e^(2h) + b e^h + c` or `a x^4 + b x^2 + c` into a
//! quadratic in a single kernel. All candidate roots are returned; choosing a branch is
//! left to the caller.

use std::f64::consts::PI;

use super::poly;
use crate::core::InternedSymbol;
use crate::error::CasError;
use crate::traits::as_integer;
use crate::{Expr, ExprKind};

const MAX_DEPTH: usize = 16;

/// Candidate roots of `expr = 0` in `var`.
///
/// ```
/// use symb_prob::{parse, calculus::solve};
///
/// let roots = solve(&parse("x^2 - 4").unwrap(), "x").unwrap();
/// let mut values: Vec<f64> = roots.iter().filter_map(|r| r.as_number()).collect();
/// values.sort_by(f64::total_cmp);
/// assert_eq!(values, vec![-2.0, 2.0]);
/// ```
pub fn solve(expr: &Expr, var: &str) -> Result<Vec<Expr>, CasError> {
    let solver = Solver {
        sym: InternedSymbol::new(var),
        x: Expr::symbol(var),
    };
    let e = expr.simplified();
    let mut out: Vec<Expr> = Vec::new();
    for r in solver.roots(&e, 0)? {
        let r = r.simplified();
        if !out.contains(&r) {
            out.push(r);
        }
    }
    Ok(out)
}

struct Solver {
    sym: InternedSymbol,
    x: Expr,
}

impl Solver {
    fn depends(&self, e: &Expr) -> bool {
        e.contains_symbol(&self.sym)
    }

    fn unsupported(&self, e: &Expr) -> CasError {
        CasError::unsupported(format!("cannot solve {e} = 0 for {}", self.x))
    }

    fn roots(&self, e: &Expr, depth: usize) -> Result<Vec<Expr>, CasError> {
        if depth > MAX_DEPTH || !self.depends(e) {
            return Err(self.unsupported(e));
        }
        if let Some(c) = poly::coefficients(e, &self.sym)
            && poly::degree(&c) <= 2
        {
            return polynomial_roots(&c).ok_or_else(|| self.unsupported(e));
        }
        match self.isolate(e, Expr::zero(), depth) {
            Ok(r) => Ok(r),
            Err(err) => self.kernel_substitution(e, depth).map_err(|_| err),
        }
    }

    /// Solve `f = rhs`.
    fn isolate(&self, f: &Expr, rhs: Expr, depth: usize) -> Result<Vec<Expr>, CasError> {
        if depth > MAX_DEPTH {
            return Err(self.unsupported(f));
        }
        if *f == self.x {
            return Ok(vec![rhs]);
        }
        let next = depth + 1;

        match f.kind() {
            ExprKind::Sum(terms) => {
                let (dep, rest): (Vec<Expr>, Vec<Expr>) = terms
                    .iter()
                    .map(|t| (**t).clone())
                    .partition(|t| self.depends(t));
                let rhs = Expr::sub_expr(rhs, Expr::sum(rest)).simplified();
                if dep.len() == 1 {
                    return self.isolate(&dep[0], rhs, next);
                }
                let g = Expr::sub_expr(Expr::sum(dep), rhs).simplified();
                if let Some(c) = poly::coefficients(&g, &self.sym)
                    && poly::degree(&c) <= 2
                {
                    return polynomial_roots(&c).ok_or_else(|| self.unsupported(&g));
                }
                self.kernel_substitution(&g, next)
            }
            ExprKind::Product(factors) => {
                let (dep, consts): (Vec<Expr>, Vec<Expr>) = factors
                    .iter()
                    .map(|t| (**t).clone())
                    .partition(|t| self.depends(t));
                if dep.len() == 1 {
                    let rhs = Expr::div_expr(rhs, Expr::product(consts)).simplified();
                    return self.isolate(&dep[0], rhs, next);
                }
                // Clear denominators: N * D^-1 = rhs  =>  N - rhs * D = 0
                let (den, num): (Vec<Expr>, Vec<Expr>) = factors
                    .iter()
                    .map(|t| (**t).clone())
                    .partition(|t| self.is_denominator(t));
                if den.is_empty() {
                    return Err(self.unsupported(f));
                }
                let d = Expr::product(den).recip();
                let g = Expr::sub_expr(Expr::product(num), Expr::product(vec![rhs, d])).simplified();
                self.roots(&g, next)
            }
            ExprKind::Pow(u, k) if !self.depends(k) => {
                let r = Expr::pow(rhs, (**k).clone().recip()).simplified();
                let even = k
                    .as_number()
                    .and_then(as_integer)
                    .is_some_and(|n| n % 2 == 0);
                let mut out = self.isolate(u, r.clone(), next)?;
                if even {
                    out.extend(self.isolate(u, r.negate(), next)?);
                }
                Ok(out)
            }
            ExprKind::Pow(b, u) if !self.depends(b) => {
                let r = Expr::div_expr(rhs.ln(), (**b).clone().ln()).simplified();
                self.isolate(u, r, next)
            }
            ExprKind::FunctionCall { name, args } if args.len() == 1 => {
                let u = &args[0];
                let candidates = invert_function(name.as_str(), rhs)
                    .ok_or_else(|| self.unsupported(f))?;
                let mut out = Vec::new();
                for c in candidates {
                    out.extend(self.isolate(u, c.simplified(), next)?);
                }
                Ok(out)
            }
            _ => Err(self.unsupported(f)),
        }
    }

    fn is_denominator(&self, e: &Expr) -> bool {
        matches!(e.kind(), ExprKind::Pow(b, k)
            if self.depends(b) && k.as_number().is_some_and(|n| n < 0.0 && n.fract() == 0.0))
    }

    /// Rewrite `g` as a polynomial of degree at most two in one kernel and solve.
    fn kernel_substitution(&self, g: &Expr, depth: usize) -> Result<Vec<Expr>, CasError> {
        let terms: Vec<Expr> = match g.kind() {
            ExprKind::Sum(ts) => ts.iter().map(|t| (**t).clone()).collect(),
            _ => return Err(self.unsupported(g)),
        };

        let mut constant = Vec::new();
        // (coefficient, kernel base, exponent)
        let mut parts: Vec<(Expr, Kernel, f64)> = Vec::new();
        for t in &terms {
            if !self.depends(t) {
                constant.push(t.clone());
                continue;
            }
            let (coeff, dep): (Vec<Expr>, Vec<Expr>) = match t.kind() {
                ExprKind::Product(fs) => fs
                    .iter()
                    .map(|f| (**f).clone())
                    .partition(|f| !self.depends(f)),
                _ => (Vec::new(), vec![t.clone()]),
            };
            let [single] = dep.as_slice() else {
                return Err(self.unsupported(g));
            };
            let (kernel, exponent) = self.classify(single).ok_or_else(|| self.unsupported(g))?;
            parts.push((Expr::product(coeff), kernel, exponent));
        }

        let Some((_, base, _)) = parts.first() else {
            return Err(self.unsupported(g));
        };
        let base = base.clone();
        if parts.iter().any(|(_, k, _)| *k != base) {
            return Err(self.unsupported(g));
        }
        let unit = parts
            .iter()
            .map(|(_, _, e)| *e)
            .min_by(|a, b| a.abs().total_cmp(&b.abs()))
            .ok_or_else(|| self.unsupported(g))?;

        let mut degrees = Vec::with_capacity(parts.len());
        for (_, _, e) in &parts {
            let n = as_integer(e / unit).ok_or_else(|| self.unsupported(g))?;
            degrees.push(n);
        }
        let shift = degrees.iter().copied().min().unwrap_or(0).min(0);
        let max_degree = degrees.iter().map(|n| n - shift).max().unwrap_or(0);
        if max_degree > 2 || max_degree < 1 {
            return Err(self.unsupported(g));
        }

        // sum c_i K^(n_i - shift) + constant * K^(-shift)
        let mut coeffs: Vec<Vec<Expr>> = vec![Vec::new(); 3];
        coeffs[(-shift) as usize].push(Expr::sum(constant));
        for ((c, _, _), n) in parts.into_iter().zip(degrees) {
            coeffs[(n - shift) as usize].push(c);
        }
        let coeffs: Vec<Expr> = coeffs.into_iter().map(|c| Expr::sum(c).simplified()).collect();
        let mut trimmed = coeffs;
        while trimmed.len() > 1 && trimmed.last().is_some_and(|c| c.is_number_eq(0.0)) {
            trimmed.pop();
        }
        let kernel_roots = polynomial_roots(&trimmed).ok_or_else(|| self.unsupported(g))?;

        let kernel = base.with_exponent(unit);
        let mut out = Vec::new();
        for r in kernel_roots {
            if r.as_number().is_some_and(|v| v == 0.0) && shift < 0 {
                continue;
            }
            match self.isolate(&kernel, r, depth + 1) {
                Ok(found) => out.extend(found),
                Err(CasError::Unsupported(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    fn classify(&self, f: &Expr) -> Option<(Kernel, f64)> {
        if *f == self.x {
            return Some((Kernel::Power(self.x.clone()), 1.0));
        }
        if let Some(arg) = f.as_call("exp") {
            let (c, h) = arg.split_coefficient();
            return Some((Kernel::Exp(h), c));
        }
        if let ExprKind::Pow(b, k) = f.kind()
            && let Some(k) = k.as_number()
            && self.depends(b)
        {
            return Some((Kernel::Power((**b).clone()), k));
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Kernel {
    Exp(Expr),
    Power(Expr),
}

impl Kernel {
    fn with_exponent(&self, e: f64) -> Expr {
        match self {
            Kernel::Exp(h) => Expr::product(vec![Expr::number(e), h.clone()]).exp(),
            Kernel::Power(b) => Expr::pow(b.clone(), Expr::number(e)),
        }
    }
}

/// Roots of `c0 + c1 y + c2 y^2`; `None` when the polynomial is constant.
fn polynomial_roots(c: &[Expr]) -> Option<Vec<Expr>> {
    match c {
        [c0, c1] => Some(vec![
            Expr::product(vec![Expr::number(-1.0), c0.clone(), c1.clone().recip()]).simplified(),
        ]),
        [c0, c1, c2] => {
            // (-b ± sqrt(b^2 - 4ac)) / 2a
            let disc = Expr::sum(vec![
                Expr::pow(c1.clone(), Expr::number(2.0)),
                Expr::product(vec![Expr::number(-4.0), c2.clone(), c0.clone()]),
            ])
            .simplified();
            if let Some(d) = disc.to_f64() {
                if d < 0.0 {
                    return Some(Vec::new());
                }
            }
            let root = disc.sqrt();
            let denom = Expr::product(vec![Expr::number(2.0), c2.clone()]).recip();
            let branch = |sign: f64| {
                Expr::product(vec![
                    Expr::sum(vec![
                        c1.clone().negate(),
                        Expr::product(vec![Expr::number(sign), root.clone()]),
                    ]),
                    denom.clone(),
                ])
                .simplified()
            };
            Some(vec![branch(1.0), branch(-1.0)])
        }
        _ => None,
    }
}

/// Preimages of `rhs` under a unary function, over all real branches we enumerate.
fn invert_function(name: &str, rhs: Expr) -> Option<Vec<Expr>> {
    let f = |n: &str| Expr::func(n, rhs.clone());
    Some(match name {
        "exp" => vec![rhs.ln()],
        "ln" => vec![rhs.exp()],
        "sin" => vec![
            f("asin"),
            Expr::sub_expr(Expr::number(PI), f("asin")),
        ],
        "cos" => vec![f("acos"), f("acos").negate()],
        "tan" => vec![f("atan")],
        "asin" => vec![f("sin")],
        "acos" => vec![f("cos")],
        "atan" => vec![f("tan")],
        "sinh" => {
            // asinh y = ln(y + sqrt(y^2 + 1))
            let inner = Expr::sum(vec![
                rhs.clone(),
                Expr::sum(vec![Expr::pow(rhs.clone(), Expr::number(2.0)), Expr::one()]).sqrt(),
            ]);
            vec![inner.ln()]
        }
        "tanh" => {
            // atanh y = ln((1 + y) / (1 - y)) / 2
            let ratio = Expr::div_expr(
                Expr::sum(vec![Expr::one(), rhs.clone()]),
                Expr::sub_expr(Expr::one(), rhs),
            );
            vec![Expr::product(vec![Expr::number(0.5), ratio.ln()])]
        }
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::parse;

    /// Every returned root satisfies the equation at the given parameter values.
    fn check_roots(src: &str, params: &[(&str, f64)], expected_count: usize) {
        let e = parse(src).unwrap();
        let roots = solve(&e, "x").unwrap_or_else(|err| panic!("{src}: {err}"));
        assert_eq!(roots.len(), expected_count, "{src}: {roots:?}");
        let mut vars: HashMap<&str, f64> = params.iter().copied().collect();
        for r in &roots {
            let Some(x) = r.eval_with(&vars) else { continue };
            vars.insert("x", x);
            let residual = e.eval_with(&vars).unwrap();
            assert!(residual.abs() < 1e-9, "{src}: root {r} leaves {residual}");
            vars.remove("x");
        }
    }

    #[test]
    fn test_polynomials() {
        check_roots("2*x - 3", &[], 1);
        check_roots("x^2 - 5*x + 6", &[], 2);
        check_roots("x^2/2 - u", &[("u", 0.3)], 2);
        let none = solve(&parse("x^2 + 1").unwrap(), "x").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_exponential_inverse_cdf() {
        check_roots("1 - exp(-theta*x) - u", &[("theta", 2.0), ("u", 0.4)], 1);
    }

    #[test]
    fn test_logistic_inverse_cdf() {
        check_roots("1/(1 + exp(-x)) - u", &[("u", 0.7)], 1);
    }

    #[test]
    fn test_power_and_log() {
        check_roots("1 - (1 + x)^-3 - u", &[("u", 0.5)], 1);
        check_roots("ln(x) - 2", &[], 1);
        check_roots("sqrt(x) - y", &[("y", 3.0)], 1);
    }

    #[test]
    fn test_kernel_substitution() {
        check_roots("exp(2*x) - 3*exp(x) + 2", &[], 2);
        check_roots("x^4 - 5*x^2 + 4", &[], 4);
    }

    #[test]
    fn test_unsolvable() {
        let r = solve(&parse("x*exp(x) - 1").unwrap(), "x");
        assert!(matches!(r, Err(CasError::Unsupported(_))));
    }
}
