use std::collections::HashMap;
use std::sync::Arc;

use crate::Expr;

/// Expression kind for fast rule filtering.
/// Rules declare which expression kinds they can apply to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ExprKind {
    Number,
    Symbol,
    Sum,
    Product,
    Pow,
    Function,
}

const ALL_KINDS: [ExprKind; 6] = [
    ExprKind::Number,
    ExprKind::Symbol,
    ExprKind::Sum,
    ExprKind::Product,
    ExprKind::Pow,
    ExprKind::Function,
];

impl ExprKind {
    /// Get the kind of an expression (O(1))
    #[inline]
    pub fn of(expr: &Expr) -> Self {
        match expr.kind() {
            crate::ExprKind::Number(_) => ExprKind::Number,
            crate::ExprKind::Symbol(_) => ExprKind::Symbol,
            crate::ExprKind::Sum(_) => ExprKind::Sum,
            crate::ExprKind::Product(_) => ExprKind::Product,
            crate::ExprKind::Pow(_, _) => ExprKind::Pow,
            crate::ExprKind::FunctionCall { .. } => ExprKind::Function,
        }
    }
}

/// Core trait for all simplification rules
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Higher runs first. Ranges in use:
    /// - 90-100: numeric folding and inverse-function cancellation
    /// - 60-89: expansion (distribute, expand powers)
    /// - 1-59: consolidation (combine terms and factors, merge exponentials)
    fn priority(&self) -> i32;

    /// Rules that may enlarge the domain of an expression (e.g. `x*x^-1 -> 1`)
    /// are skipped in domain-safe mode.
    fn alters_domain(&self) -> bool {
        false
    }

    /// Which expression kinds this rule can apply to.
    fn applies_to(&self) -> &'static [ExprKind];

    fn apply(&self, expr: &Expr, context: &RuleContext) -> Option<Expr>;
}

/// Context passed to rules during application
#[derive(Clone, Debug, Default)]
pub struct RuleContext {
    pub depth: usize,
    pub domain_safe: bool,
}

impl RuleContext {
    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub fn with_domain_safe(mut self, domain_safe: bool) -> Self {
        self.domain_safe = domain_safe;
        self
    }
}

/// Declare a unit-struct rule from a closure-like body.
///
/// ```ignore
/// rule!(NameRule, "name", 50, &[ExprKind::Sum], |expr: &Expr, _context: &RuleContext| {
///     None
/// });
/// ```
macro_rules! rule {
    (
        $name:ident, $id:expr, $priority:expr, $kinds:expr,
        $(alters_domain: $alters:expr,)?
        |$e:ident : &Expr, $c:ident : &RuleContext| $body:block $(,)?
    ) => {
        pub struct $name;

        impl $crate::simplification::rules::Rule for $name {
            fn name(&self) -> &'static str {
                $id
            }

            fn priority(&self) -> i32 {
                $priority
            }

            $(
                fn alters_domain(&self) -> bool {
                    $alters
                }
            )?

            fn applies_to(&self) -> &'static [$crate::simplification::rules::ExprKind] {
                $kinds
            }

            #[allow(unused_variables)]
            fn apply(
                &self,
                $e: &$crate::Expr,
                $c: &$crate::simplification::rules::RuleContext,
            ) -> Option<$crate::Expr> $body
        }
    };
}

/// Numeric simplification rules
pub mod numeric;

/// Algebraic simplification rules
pub mod algebraic;

/// Exponential and logarithmic simplification rules
pub mod exponential;

/// Rule registry, indexed by expression kind
pub struct RuleRegistry {
    pub(crate) rules: Vec<Arc<dyn Rule>>,
    rules_by_kind: HashMap<ExprKind, Vec<Arc<dyn Rule>>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            rules_by_kind: HashMap::new(),
        }
    }

    pub fn load_all_rules(&mut self) {
        self.rules.extend(numeric::get_numeric_rules());
        self.rules.extend(algebraic::get_algebraic_rules());
        self.rules.extend(exponential::get_exponential_rules());
    }

    /// Sort by priority (higher first) and build the kind index
    pub fn order_by_priority(&mut self) {
        self.rules.sort_by_key(|r| std::cmp::Reverse(r.priority()));
        self.build_kind_index();
    }

    fn build_kind_index(&mut self) {
        self.rules_by_kind.clear();
        for kind in ALL_KINDS {
            self.rules_by_kind.insert(kind, Vec::new());
        }
        for rule in &self.rules {
            for &kind in rule.applies_to() {
                if let Some(rules) = self.rules_by_kind.get_mut(&kind) {
                    rules.push(Arc::clone(rule));
                }
            }
        }
    }

    /// Rules that apply to a specific expression kind
    #[inline]
    pub fn get_rules_for_kind(&self, kind: ExprKind) -> &[Arc<dyn Rule>] {
        self.rules_by_kind
            .get(&kind)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
