//! Core simplification engine with rule-based architecture
//!
//! Implements bottom-up tree traversal, rule application with memoization,
//! cycle detection, and configurable limits (iterations, depth).

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use super::rules::{ExprKind, RuleContext, RuleRegistry};
use crate::Expr;

/// Default cache capacity per rule before clearing
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Default bound on full bottom-up passes
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Default recursion depth bound
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Rewrites of a single node before handing back to the traversal
const MAX_NODE_ROUNDS: usize = 16;

/// Global rule registry singleton - built once, reused across all simplifications
fn global_registry() -> &'static RuleRegistry {
    static REGISTRY: OnceLock<RuleRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = RuleRegistry::new();
        registry.load_all_rules();
        registry.order_by_priority();
        registry
    })
}

type RuleCache = FxHashMap<Expr, Option<Arc<Expr>>>;

/// Main simplification engine
pub(crate) struct Simplifier {
    /// Per-rule caches, cleared when exceeding capacity to bound memory
    rule_caches: FxHashMap<&'static str, RuleCache>,
    cache_capacity: usize,
    max_iterations: usize,
    max_depth: usize,
    context: RuleContext,
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Simplifier {
    pub fn new() -> Self {
        Self {
            rule_caches: FxHashMap::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_depth: DEFAULT_MAX_DEPTH,
            context: RuleContext::default(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_domain_safe(mut self, domain_safe: bool) -> Self {
        self.context = self.context.with_domain_safe(domain_safe);
        self
    }

    /// Run passes until a fixed point, a cycle, or the iteration bound.
    pub fn simplify(&mut self, expr: Expr) -> Expr {
        let mut current = Arc::new(expr);
        let mut seen_hashes: HashSet<u64> = HashSet::new();
        let mut iterations = 0;

        loop {
            if iterations >= self.max_iterations {
                warn!(
                    max_iterations = self.max_iterations,
                    expr = %current,
                    "simplification hit the iteration bound"
                );
                break;
            }

            let original = Arc::clone(&current);
            current = self.apply_rules_bottom_up(current, 0);

            if *current == *original {
                break;
            }

            // Same structure seen after an earlier full pass: rules are cycling
            if !seen_hashes.insert(current.hash) {
                trace!(expr = %current, "cycle detected, stopping");
                break;
            }
            iterations += 1;
        }

        Arc::try_unwrap(current).unwrap_or_else(|shared| (*shared).clone())
    }

    fn apply_rules_bottom_up(&mut self, expr: Arc<Expr>, depth: usize) -> Arc<Expr> {
        if depth > self.max_depth {
            return expr;
        }
        let children = expr.children();
        if children.is_empty() {
            return self.apply_rules_to_node(expr, depth);
        }

        let simplified: Vec<Arc<Expr>> = children
            .iter()
            .map(|c| self.apply_rules_bottom_up(Arc::clone(c), depth + 1))
            .collect();
        let changed = simplified
            .iter()
            .zip(children.iter())
            .any(|(new, old)| !Arc::ptr_eq(new, old));

        if changed {
            let rebuilt = Arc::new(expr.with_children(simplified));
            self.apply_rules_to_node(rebuilt, depth)
        } else {
            self.apply_rules_to_node(expr, depth)
        }
    }

    /// Apply the rules for this node's kind in priority order. When a rewrite changes the
    /// node's kind, the rules for the new kind get a turn too.
    fn apply_rules_to_node(&mut self, mut current: Arc<Expr>, depth: usize) -> Arc<Expr> {
        self.context.set_depth(depth);

        for _ in 0..MAX_NODE_ROUNDS {
            let kind = ExprKind::of(&current);
            let mut kind_changed = false;

            for rule in global_registry().get_rules_for_kind(kind) {
                if self.context.domain_safe && rule.alters_domain() {
                    continue;
                }
                let name = rule.name();

                let cached = self
                    .rule_caches
                    .get(name)
                    .and_then(|cache| cache.get(current.as_ref()).cloned());
                let result = match cached {
                    Some(hit) => hit,
                    None => {
                        let fresh = rule.apply(&current, &self.context).map(Arc::new);
                        let cache = self.rule_caches.entry(name).or_default();
                        if cache.len() >= self.cache_capacity {
                            cache.clear();
                        }
                        cache.insert((*current).clone(), fresh.clone());
                        fresh
                    }
                };

                if let Some(new_expr) = result {
                    trace!(rule = name, from = %current, to = %new_expr, "rewrite");
                    current = new_expr;
                    if ExprKind::of(&current) != kind {
                        kind_changed = true;
                        break;
                    }
                }
            }

            if !kind_changed {
                break;
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaches_fixed_point() {
        let x = Expr::symbol("x");
        let e = Expr::sum(vec![
            x.clone(),
            Expr::product(vec![Expr::number(2.0), x.clone()]),
            x.clone().negate(),
        ]);
        let out = Simplifier::new().simplify(e);
        assert_eq!(out, Expr::product(vec![Expr::number(2.0), x]));
    }

    #[test]
    fn test_iteration_bound_still_returns() {
        let x = Expr::symbol("x");
        let e = Expr::pow(Expr::sum(vec![Expr::one(), x]), Expr::number(3.0));
        let out = Simplifier::new().with_max_iterations(1).simplify(e);
        assert!(out.eval_at("x", 1.0).is_some_and(|v| (v - 8.0).abs() < 1e-12));
    }
}
