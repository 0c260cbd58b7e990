//! Function definitions for the registry.
//!
//! Derivatives follow standard calculus; the error function uses
//! d/dx erf(x) = 2/sqrt(pi) exp(-x^2), gamma uses Γ'(x) = Γ(x)ψ(x).

use std::sync::Arc;

use super::registry::FunctionDefinition;
use super::{func_arc, mul_opt, neg};
use crate::Expr;
use crate::math::{eval_digamma, eval_erf, eval_erfc, eval_gamma};

fn square(u: &Arc<Expr>) -> Expr {
    Expr::pow_from_arcs(Arc::clone(u), Arc::new(Expr::number(2.0)))
}

/// Return all function definitions for populating the registry
pub(crate) fn all_definitions() -> Vec<FunctionDefinition> {
    vec![
        FunctionDefinition {
            name: "exp",
            arity: 1,
            eval: |args| Some(args[0].exp()),
            derivative: Some(|args, primes| {
                // d/dx exp(u) = exp(u) * u'
                mul_opt(func_arc("exp", Arc::clone(&args[0])), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "ln",
            arity: 1,
            eval: |args| {
                if args[0] < 0.0 {
                    None
                } else {
                    Some(args[0].ln())
                }
            },
            derivative: Some(|args, primes| {
                // d/dx ln(u) = u' / u
                mul_opt(Expr::pow_from_arcs(Arc::clone(&args[0]), Arc::new(Expr::number(-1.0))), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "sqrt",
            arity: 1,
            eval: |args| {
                if args[0] < 0.0 {
                    None
                } else {
                    Some(args[0].sqrt())
                }
            },
            derivative: Some(|args, primes| {
                // d/dx sqrt(u) = u' / (2 sqrt(u))
                let inv = Expr::pow_from_arcs(Arc::clone(&args[0]), Arc::new(Expr::number(-0.5)));
                mul_opt(Expr::product(vec![Expr::number(0.5), inv]), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "abs",
            arity: 1,
            eval: |args| Some(args[0].abs()),
            derivative: Some(|args, primes| {
                mul_opt(func_arc("sign", Arc::clone(&args[0])), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "sign",
            arity: 1,
            eval: |args| {
                Some(if args[0] > 0.0 {
                    1.0
                } else if args[0] < 0.0 {
                    -1.0
                } else {
                    0.0
                })
            },
            derivative: Some(|_, _| Expr::zero()),
        },
        FunctionDefinition {
            name: "sin",
            arity: 1,
            eval: |args| Some(args[0].sin()),
            derivative: Some(|args, primes| {
                mul_opt(func_arc("cos", Arc::clone(&args[0])), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "cos",
            arity: 1,
            eval: |args| Some(args[0].cos()),
            derivative: Some(|args, primes| {
                mul_opt(neg(func_arc("sin", Arc::clone(&args[0]))), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "tan",
            arity: 1,
            eval: |args| Some(args[0].tan()),
            derivative: Some(|args, primes| {
                // d/dx tan(u) = u' / cos^2(u)
                let cos = func_arc("cos", Arc::clone(&args[0]));
                mul_opt(Expr::pow(cos, Expr::number(-2.0)), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "asin",
            arity: 1,
            eval: |args| {
                if args[0].abs() > 1.0 {
                    None
                } else {
                    Some(args[0].asin())
                }
            },
            derivative: Some(|args, primes| {
                // d/dx asin(u) = u' / sqrt(1 - u^2)
                let inner = Expr::sub_expr(Expr::one(), square(&args[0]));
                mul_opt(Expr::pow(inner, Expr::number(-0.5)), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "acos",
            arity: 1,
            eval: |args| {
                if args[0].abs() > 1.0 {
                    None
                } else {
                    Some(args[0].acos())
                }
            },
            derivative: Some(|args, primes| {
                let inner = Expr::sub_expr(Expr::one(), square(&args[0]));
                mul_opt(neg(Expr::pow(inner, Expr::number(-0.5))), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "atan",
            arity: 1,
            eval: |args| Some(args[0].atan()),
            derivative: Some(|args, primes| {
                // d/dx atan(u) = u' / (1 + u^2)
                let inner = Expr::sum(vec![Expr::one(), square(&args[0])]);
                mul_opt(inner.recip(), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "sinh",
            arity: 1,
            eval: |args| Some(args[0].sinh()),
            derivative: Some(|args, primes| {
                mul_opt(func_arc("cosh", Arc::clone(&args[0])), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "cosh",
            arity: 1,
            eval: |args| Some(args[0].cosh()),
            derivative: Some(|args, primes| {
                mul_opt(func_arc("sinh", Arc::clone(&args[0])), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "tanh",
            arity: 1,
            eval: |args| Some(args[0].tanh()),
            derivative: Some(|args, primes| {
                let cosh = func_arc("cosh", Arc::clone(&args[0]));
                mul_opt(Expr::pow(cosh, Expr::number(-2.0)), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "erf",
            arity: 1,
            eval: |args| Some(eval_erf(args[0])),
            derivative: Some(|args, primes| {
                // d/dx erf(u) = 2/sqrt(pi) * exp(-u^2) * u'
                let coeff = 2.0 / std::f64::consts::PI.sqrt();
                let gauss = square(&args[0]).negate().exp();
                mul_opt(Expr::product(vec![Expr::number(coeff), gauss]), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "erfc",
            arity: 1,
            eval: |args| Some(eval_erfc(args[0])),
            derivative: Some(|args, primes| {
                let coeff = -2.0 / std::f64::consts::PI.sqrt();
                let gauss = square(&args[0]).negate().exp();
                mul_opt(Expr::product(vec![Expr::number(coeff), gauss]), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "gamma",
            arity: 1,
            eval: |args| eval_gamma(args[0]),
            derivative: Some(|args, primes| {
                let g = func_arc("gamma", Arc::clone(&args[0]));
                let psi = func_arc("digamma", Arc::clone(&args[0]));
                mul_opt(Expr::product(vec![g, psi]), primes[0].clone())
            }),
        },
        FunctionDefinition {
            name: "digamma",
            arity: 1,
            eval: |args| eval_digamma(args[0]),
            derivative: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::super::registry::Registry;

    #[test]
    fn test_every_definition_is_registered() {
        for def in super::all_definitions() {
            let found = Registry::get(def.name);
            assert!(found.is_some(), "{} missing", def.name);
            assert!(found.is_some_and(|d| d.validate_arity(1)));
        }
    }

    #[test]
    fn test_eval_domains() {
        let ln = Registry::get("ln").map(|d| d.eval);
        assert!(ln.is_some_and(|f| f(&[-1.0]).is_none()));
        assert!(ln.is_some_and(|f| f(&[1.0]) == Some(0.0)));
        assert_eq!(Registry::canonical("log"), "ln");
    }
}
