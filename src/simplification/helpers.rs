//! Shared helpers for the rule packs.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::{Assumptions, expr_cmp, sign_of, term_cmp};
use crate::{Expr, ExprKind};

/// Coefficients whose magnitude falls below this fraction of the largest contribution
/// to their group are treated as cancelled.
const CANCELLATION_RATIO: f64 = 1e-12;

/// Maximum number of terms an expansion may produce.
pub(crate) const EXPANSION_LIMIT: usize = 48;

/// Provably positive, with no assumptions about symbols.
pub(crate) fn is_provably_positive(expr: &Expr) -> bool {
    sign_of(expr, &Assumptions::none()).is_positive()
}

/// Group terms by their non-numeric part and add coefficients. Result is sorted canonically.
pub(crate) fn combine_like_terms(terms: &[Arc<Expr>]) -> Vec<Expr> {
    let mut index: FxHashMap<Expr, usize> = FxHashMap::default();
    // (base, coefficient sum, largest |contribution|)
    let mut groups: Vec<(Expr, f64, f64)> = Vec::with_capacity(terms.len());

    for term in terms {
        let (coeff, base) = term.split_coefficient();
        match index.get(&base) {
            Some(&i) => {
                groups[i].1 += coeff;
                groups[i].2 = groups[i].2.max(coeff.abs());
            }
            None => {
                index.insert(base.clone(), groups.len());
                groups.push((base, coeff, coeff.abs()));
            }
        }
    }

    let mut out: Vec<Expr> = groups
        .into_iter()
        .filter(|(_, c, scale)| !(c.abs() <= CANCELLATION_RATIO * scale || *c == 0.0))
        .map(|(base, c, _)| {
            if base.is_number_eq(1.0) {
                Expr::number(c)
            } else if c == 1.0 {
                base
            } else {
                Expr::product(vec![Expr::number(c), base])
            }
        })
        .collect();
    out.sort_by(term_cmp);
    out
}

/// Group factors by base and add exponents. Result is sorted canonically.
pub(crate) fn combine_like_factors(factors: &[Arc<Expr>]) -> Expr {
    let mut coeff = 1.0;
    let mut index: FxHashMap<Expr, usize> = FxHashMap::default();
    let mut groups: Vec<(Arc<Expr>, Vec<Arc<Expr>>)> = Vec::with_capacity(factors.len());

    for factor in factors {
        let (base, exponent) = match factor.kind() {
            ExprKind::Number(n) => {
                coeff *= n;
                continue;
            }
            ExprKind::Pow(b, e) => (Arc::clone(b), Arc::clone(e)),
            _ => (Arc::clone(factor), Arc::new(Expr::one())),
        };
        match index.get(base.as_ref()) {
            Some(&i) => groups[i].1.push(exponent),
            None => {
                index.insert((*base).clone(), groups.len());
                groups.push((base, vec![exponent]));
            }
        }
    }

    let mut out: Vec<Expr> = groups
        .into_iter()
        .map(|(base, exps)| {
            let exponent = if exps.len() == 1 {
                crate::core::expr::unwrap_arc(exps.into_iter().next())
            } else {
                Expr::sum_from_arcs(exps)
            };
            Expr::pow_from_arcs(base, Arc::new(exponent))
        })
        .collect();
    out.sort_by(expr_cmp);
    out.insert(0, Expr::number(coeff));
    Expr::product(out)
}

/// Distribute a product over the sums among its factors.
/// Returns `None` when there is no sum or the expansion would exceed `EXPANSION_LIMIT` terms.
pub(crate) fn expand_factors(factors: &[Arc<Expr>]) -> Option<Expr> {
    let mut size = 1usize;
    let mut has_sum = false;
    for f in factors {
        if let ExprKind::Sum(terms) = f.kind() {
            has_sum = true;
            size = size.saturating_mul(terms.len());
        }
    }
    if !has_sum || size > EXPANSION_LIMIT {
        return None;
    }

    let mut partial: Vec<Vec<Arc<Expr>>> = vec![Vec::new()];
    for f in factors {
        match f.kind() {
            ExprKind::Sum(terms) => {
                let mut next = Vec::with_capacity(partial.len() * terms.len());
                for p in &partial {
                    for t in terms {
                        let mut row = p.clone();
                        row.push(Arc::clone(t));
                        next.push(row);
                    }
                }
                partial = next;
            }
            _ => {
                for p in &mut partial {
                    p.push(Arc::clone(f));
                }
            }
        }
    }
    Some(Expr::sum(
        partial.into_iter().map(Expr::product_from_arcs).collect(),
    ))
}
