use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::Expr;

/// Derivative rule: receives the call's arguments and their derivatives and returns
/// the total derivative `sum(dF/d_arg_i * d_arg_i/dx)`.
pub(crate) type DerivativeFn = fn(&[Arc<Expr>], &[Expr]) -> Expr;

/// Definition of a function: evaluation and differentiation
#[derive(Clone)]
pub(crate) struct FunctionDefinition {
    /// Canonical name (e.g. "exp", "erf")
    pub name: &'static str,

    /// Number of arguments
    pub arity: usize,

    /// Numerical evaluation; `None` outside the domain
    pub eval: fn(&[f64]) -> Option<f64>,

    /// Symbolic derivative, `None` when no closed form is provided
    pub derivative: Option<DerivativeFn>,
}

impl FunctionDefinition {
    pub(crate) fn validate_arity(&self, args: usize) -> bool {
        self.arity == args
    }
}

static REGISTRY: OnceLock<HashMap<&'static str, FunctionDefinition>> = OnceLock::new();

fn init_registry() -> HashMap<&'static str, FunctionDefinition> {
    let defs = crate::functions::definitions::all_definitions();
    let mut map = HashMap::with_capacity(defs.len());
    for def in defs {
        map.insert(def.name, def);
    }
    map
}

/// Central registry for function definitions
pub(crate) struct Registry;

impl Registry {
    pub(crate) fn get(name: &str) -> Option<&'static FunctionDefinition> {
        REGISTRY.get_or_init(init_registry).get(name)
    }

    /// Canonical name for an alias accepted by the parser.
    pub(crate) fn canonical(name: &str) -> &str {
        match name {
            "log" => "ln",
            "arcsin" => "asin",
            "arccos" => "acos",
            "arctan" => "atan",
            other => other,
        }
    }
}
