//! The expression tree.
//!
//! ## N-ary Sum/Product
//! `a + b + c` is `Sum([a, b, c])`, not nested binary nodes. Constructors flatten nested
//! sums and products and fold numeric literals, so the tree stays shallow.
//!
//! Subtraction is `a + (-1)*b` and division is `a * b^-1`; there are no `Sub`/`Div` nodes.
//! Infinite breakpoints are plain `Number(±inf)`.
//!
//! ## Structural hashing
//! Each `Expr` carries a pre-computed hash for O(1) inequality rejection. Sum and product
//! hashes are commutative (sum of child hashes).

use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::core::symbol::InternedSymbol;
use crate::functions::registry::Registry;

/// Symbols with a fixed numeric value. They are never treated as free parameters.
pub const KNOWN_CONSTANTS: &[(&str, f64)] = &[("pi", std::f64::consts::PI)];

/// A symbolic expression.
///
/// # Example
/// ```
/// use symb_prob::Expr;
///
/// let x = Expr::symbol("x");
/// let f = (-x.clone()).exp() * x;  // x*exp(-x)
/// assert_eq!(f.eval_at("x", 0.0), Some(0.0));
/// ```
#[derive(Debug, Clone)]
pub struct Expr {
    pub(crate) hash: u64,
    pub(crate) kind: ExprKind,
}

/// The structure of an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Constant number, including `±inf`
    Number(f64),

    /// Variable, parameter or named constant
    Symbol(InternedSymbol),

    /// Function call, resolved against the function registry
    FunctionCall {
        name: InternedSymbol,
        args: Vec<Arc<Expr>>,
    },

    /// N-ary sum: a + b + c + ...
    Sum(Vec<Arc<Expr>>),

    /// N-ary product: a * b * c * ...
    Product(Vec<Arc<Expr>>),

    /// Exponentiation
    Pow(Arc<Expr>, Arc<Expr>),
}

impl Deref for Expr {
    type Target = ExprKind;
    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

impl PartialEq for Expr {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        if self.hash != other.hash {
            return false;
        }
        self.kind == other.kind
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl Hash for ExprKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Number(n) => {
                // -0.0 and 0.0 hash alike
                let normalized = if *n == 0.0 { 0.0 } else { *n };
                normalized.to_bits().hash(state);
            }
            Self::Symbol(s) => s.hash(state),
            Self::FunctionCall { name, args } => {
                name.hash(state);
                for a in args {
                    a.hash.hash(state);
                }
            }
            Self::Sum(children) | Self::Product(children) => {
                let mut acc: u64 = 0;
                for c in children {
                    acc = acc.wrapping_add(c.hash);
                }
                acc.hash(state);
            }
            Self::Pow(b, e) => {
                b.hash.hash(state);
                e.hash.hash(state);
            }
        }
    }
}

fn compute_hash(kind: &ExprKind) -> u64 {
    let mut hasher = FxHasher::default();
    kind.hash(&mut hasher);
    hasher.finish()
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::number(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Expr::number(f64::from(n))
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}

/// A bare name is a symbol. Use [`crate::parse`] for formulas.
impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::symbol(name)
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl Expr {
    pub(crate) fn new(kind: ExprKind) -> Self {
        Expr {
            hash: compute_hash(&kind),
            kind,
        }
    }

    pub fn number(n: f64) -> Self {
        Expr::new(ExprKind::Number(n))
    }

    pub fn zero() -> Self {
        Expr::number(0.0)
    }

    pub fn one() -> Self {
        Expr::number(1.0)
    }

    pub fn infinity() -> Self {
        Expr::number(f64::INFINITY)
    }

    pub fn neg_infinity() -> Self {
        Expr::number(f64::NEG_INFINITY)
    }

    pub fn symbol(name: &str) -> Self {
        Expr::new(ExprKind::Symbol(InternedSymbol::new(name)))
    }

    /// Single-argument function call.
    pub fn func(name: &str, arg: Expr) -> Self {
        Expr::func_multi(name, vec![arg])
    }

    pub fn func_multi(name: &str, args: Vec<Expr>) -> Self {
        Expr::func_from_arcs(
            &InternedSymbol::new(name),
            args.into_iter().map(Arc::new).collect(),
        )
    }

    pub(crate) fn func_from_arcs(name: &InternedSymbol, args: Vec<Arc<Expr>>) -> Self {
        Expr::new(ExprKind::FunctionCall {
            name: name.clone(),
            args,
        })
    }

    /// Flattening sum with numeric folding.
    pub fn sum(terms: Vec<Expr>) -> Self {
        Expr::sum_from_arcs(terms.into_iter().map(Arc::new).collect())
    }

    pub(crate) fn sum_from_arcs(terms: Vec<Arc<Expr>>) -> Self {
        let mut constant = 0.0;
        let mut flat: Vec<Arc<Expr>> = Vec::with_capacity(terms.len());
        for t in terms {
            match &t.kind {
                ExprKind::Number(n) => constant += n,
                ExprKind::Sum(inner) => {
                    for c in inner {
                        match &c.kind {
                            ExprKind::Number(n) => constant += n,
                            _ => flat.push(Arc::clone(c)),
                        }
                    }
                }
                _ => flat.push(t),
            }
        }
        if constant != 0.0 || constant.is_nan() {
            flat.insert(0, Arc::new(Expr::number(constant)));
        }
        match flat.len() {
            0 => Expr::zero(),
            1 => unwrap_arc(flat.pop()),
            _ => Expr::new(ExprKind::Sum(flat)),
        }
    }

    /// Flattening product with numeric folding; a zero coefficient annihilates.
    pub fn product(factors: Vec<Expr>) -> Self {
        Expr::product_from_arcs(factors.into_iter().map(Arc::new).collect())
    }

    pub(crate) fn product_from_arcs(factors: Vec<Arc<Expr>>) -> Self {
        let mut coeff = 1.0;
        let mut flat: Vec<Arc<Expr>> = Vec::with_capacity(factors.len());
        for f in factors {
            match &f.kind {
                ExprKind::Number(n) => coeff *= n,
                ExprKind::Product(inner) => {
                    for c in inner {
                        match &c.kind {
                            ExprKind::Number(n) => coeff *= n,
                            _ => flat.push(Arc::clone(c)),
                        }
                    }
                }
                _ => flat.push(f),
            }
        }
        if coeff == 0.0 {
            return Expr::zero();
        }
        if coeff != 1.0 {
            flat.insert(0, Arc::new(Expr::number(coeff)));
        }
        match flat.len() {
            0 => Expr::one(),
            1 => unwrap_arc(flat.pop()),
            _ => Expr::new(ExprKind::Product(flat)),
        }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Expr::pow_from_arcs(Arc::new(base), Arc::new(exponent))
    }

    pub(crate) fn pow_from_arcs(base: Arc<Expr>, exponent: Arc<Expr>) -> Self {
        if let Some(e) = exponent.as_number() {
            if e == 0.0 {
                return Expr::one();
            }
            if e == 1.0 {
                return unwrap_arc(Some(base));
            }
            if let Some(b) = base.as_number() {
                let v = b.powf(e);
                if v.is_finite() {
                    return Expr::number(v);
                }
            }
        }
        if base.is_number_eq(1.0) {
            return Expr::one();
        }
        Expr::new(ExprKind::Pow(base, exponent))
    }

    /// `a - b` as `a + (-1)*b`
    pub fn sub_expr(a: Expr, b: Expr) -> Self {
        Expr::sum(vec![a, b.negate()])
    }

    /// `a / b` as `a * b^-1`
    pub fn div_expr(a: Expr, b: Expr) -> Self {
        Expr::product(vec![a, b.recip()])
    }

    pub fn negate(self) -> Self {
        Expr::product(vec![Expr::number(-1.0), self])
    }

    pub fn recip(self) -> Self {
        Expr::pow(self, Expr::number(-1.0))
    }

    pub fn pow_of(self, exponent: impl Into<Expr>) -> Self {
        Expr::pow(self, exponent.into())
    }

    pub fn exp(self) -> Self {
        Expr::func("exp", self)
    }

    pub fn ln(self) -> Self {
        Expr::func("ln", self)
    }

    pub fn sqrt(self) -> Self {
        Expr::pow(self, Expr::number(0.5))
    }

    pub fn abs(self) -> Self {
        Expr::func("abs", self)
    }
}

/// Take the expression out of a single-owner `Arc`, cloning only when shared.
pub(crate) fn unwrap_arc(e: Option<Arc<Expr>>) -> Expr {
    match e {
        Some(arc) => Arc::try_unwrap(arc).unwrap_or_else(|shared| (*shared).clone()),
        None => Expr::zero(),
    }
}

// =============================================================================
// QUERIES
// =============================================================================

impl Expr {
    #[inline]
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            ExprKind::Number(n) => Some(n),
            _ => None,
        }
    }

    #[inline]
    pub fn is_number_eq(&self, value: f64) -> bool {
        matches!(self.kind, ExprKind::Number(n) if n == value)
    }

    pub fn as_symbol_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        self.as_symbol_name() == Some(name)
    }

    /// Argument of a unary call to `name`, if this is one.
    pub fn as_call(&self, name: &str) -> Option<&Arc<Expr>> {
        match &self.kind {
            ExprKind::FunctionCall { name: n, args } if n.as_str() == name && args.len() == 1 => {
                args.first()
            }
            _ => None,
        }
    }

    /// `Some(+1)` for `+inf`, `Some(-1)` for `-inf`.
    pub fn infinity_sign(&self) -> Option<i8> {
        match self.kind {
            ExprKind::Number(n) if n == f64::INFINITY => Some(1),
            ExprKind::Number(n) if n == f64::NEG_INFINITY => Some(-1),
            _ => None,
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.infinity_sign().is_some()
    }

    /// Split `c * rest` into its numeric coefficient and remainder.
    pub fn split_coefficient(&self) -> (f64, Expr) {
        match &self.kind {
            ExprKind::Number(n) => (*n, Expr::one()),
            ExprKind::Product(factors) => match factors.first().and_then(|f| f.as_number()) {
                Some(c) => (c, Expr::product_from_arcs(factors[1..].to_vec())),
                None => (1.0, self.clone()),
            },
            _ => (1.0, self.clone()),
        }
    }

    /// Children of this node, in order.
    pub fn children(&self) -> Vec<Arc<Expr>> {
        match &self.kind {
            ExprKind::Number(_) | ExprKind::Symbol(_) => Vec::new(),
            ExprKind::FunctionCall { args, .. } => args.clone(),
            ExprKind::Sum(c) | ExprKind::Product(c) => c.clone(),
            ExprKind::Pow(b, e) => vec![Arc::clone(b), Arc::clone(e)],
        }
    }

    /// Rebuild a node of the same kind over new children, re-running constructor folding.
    pub(crate) fn with_children(&self, children: Vec<Arc<Expr>>) -> Expr {
        match &self.kind {
            ExprKind::Number(_) | ExprKind::Symbol(_) => self.clone(),
            ExprKind::FunctionCall { name, .. } => Expr::func_from_arcs(name, children),
            ExprKind::Sum(_) => Expr::sum_from_arcs(children),
            ExprKind::Product(_) => Expr::product_from_arcs(children),
            ExprKind::Pow(_, _) => {
                let mut it = children.into_iter();
                match (it.next(), it.next()) {
                    (Some(b), Some(e)) => Expr::pow_from_arcs(b, e),
                    _ => self.clone(),
                }
            }
        }
    }

    pub fn contains_var(&self, var: &str) -> bool {
        let sym = InternedSymbol::new(var);
        self.contains_symbol(&sym)
    }

    pub(crate) fn contains_symbol(&self, sym: &InternedSymbol) -> bool {
        match &self.kind {
            ExprKind::Number(_) => false,
            ExprKind::Symbol(s) => s == sym,
            ExprKind::FunctionCall { args, .. } => args.iter().any(|a| a.contains_symbol(sym)),
            ExprKind::Sum(c) | ExprKind::Product(c) => c.iter().any(|a| a.contains_symbol(sym)),
            ExprKind::Pow(b, e) => b.contains_symbol(sym) || e.contains_symbol(sym),
        }
    }

    /// Names of the free symbols, excluding named constants such as `pi`.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match &self.kind {
            ExprKind::Number(_) => {}
            ExprKind::Symbol(s) => {
                if !KNOWN_CONSTANTS.iter().any(|(n, _)| *n == s.as_str()) {
                    out.insert(s.as_str().to_string());
                }
            }
            _ => {
                for c in self.children() {
                    c.collect_symbols(out);
                }
            }
        }
    }

    /// Whether the expression is a number or a named constant expression (no free symbols).
    pub fn is_constant(&self) -> bool {
        self.free_symbols().is_empty()
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|c| c.node_count())
            .sum::<usize>()
    }

    pub fn max_depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|c| c.max_depth())
            .max()
            .unwrap_or(0)
    }
}

// =============================================================================
// SUBSTITUTION AND EVALUATION
// =============================================================================

impl Expr {
    /// Replace every occurrence of `var` with `value`.
    pub fn substitute(&self, var: &str, value: &Expr) -> Expr {
        let sym = InternedSymbol::new(var);
        self.substitute_symbol(&sym, value)
    }

    pub(crate) fn substitute_symbol(&self, sym: &InternedSymbol, value: &Expr) -> Expr {
        match &self.kind {
            ExprKind::Number(_) => self.clone(),
            ExprKind::Symbol(s) => {
                if s == sym {
                    value.clone()
                } else {
                    self.clone()
                }
            }
            _ => {
                if !self.contains_symbol(sym) {
                    return self.clone();
                }
                let children = self
                    .children()
                    .iter()
                    .map(|c| Arc::new(c.substitute_symbol(sym, value)))
                    .collect();
                self.with_children(children)
            }
        }
    }

    /// Substitute several symbols at once.
    pub fn substitute_all(&self, values: &HashMap<&str, Expr>) -> Expr {
        let mut out = self.clone();
        for (name, value) in values {
            out = out.substitute(name, value);
        }
        out
    }

    /// Numeric value with `vars` bound. `None` when a symbol is unbound or a function unknown.
    pub fn eval_with(&self, vars: &HashMap<&str, f64>) -> Option<f64> {
        match &self.kind {
            ExprKind::Number(n) => Some(*n),
            ExprKind::Symbol(s) => {
                let name = s.as_str();
                vars.get(name).copied().or_else(|| {
                    KNOWN_CONSTANTS
                        .iter()
                        .find(|(n, _)| *n == name)
                        .map(|(_, v)| *v)
                })
            }
            ExprKind::Sum(terms) => {
                let mut acc = 0.0;
                for t in terms {
                    acc += t.eval_with(vars)?;
                }
                Some(acc)
            }
            ExprKind::Product(factors) => {
                let mut acc = 1.0;
                for f in factors {
                    acc *= f.eval_with(vars)?;
                }
                Some(acc)
            }
            ExprKind::Pow(b, e) => {
                let base = b.eval_with(vars)?;
                let exponent = e.eval_with(vars)?;
                Some(eval_pow(base, exponent))
            }
            ExprKind::FunctionCall { name, args } => {
                let def = Registry::get(name.as_str())?;
                let values = args
                    .iter()
                    .map(|a| a.eval_with(vars))
                    .collect::<Option<Vec<f64>>>()?;
                (def.eval)(&values)
            }
        }
    }

    /// Evaluate an expression with no free symbols.
    pub fn to_f64(&self) -> Option<f64> {
        self.eval_with(&HashMap::new())
    }

    /// Evaluate with a single variable bound.
    pub fn eval_at(&self, var: &str, x: f64) -> Option<f64> {
        let mut vars = HashMap::new();
        vars.insert(var, x);
        self.eval_with(&vars)
    }
}

/// `b^e` with real odd roots of negative bases (`(-8)^(1/3) = -2`).
pub(crate) fn eval_pow(base: f64, exponent: f64) -> f64 {
    if base < 0.0 && exponent.fract() != 0.0 {
        let recip = 1.0 / exponent;
        let rounded = recip.round();
        if (recip - rounded).abs() < 1e-9 && rounded.rem_euclid(2.0) == 1.0 {
            return -(-base).powf(exponent);
        }
    }
    base.powf(exponent)
}
