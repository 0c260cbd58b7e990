//! Canonical ordering used to sort terms and factors.
//!
//! Numbers sort first, then symbols by name, then powers, products, calls and sums.
//! Factors are compared by base before exponent so `x`, `x^2`, `y` sort as `x, x^2, y`.

use std::cmp::Ordering;

use super::expr::{Expr, ExprKind};

fn rank(e: &Expr) -> u8 {
    match e.kind() {
        ExprKind::Number(_) => 0,
        ExprKind::Symbol(_) => 1,
        ExprKind::Pow(_, _) => 2,
        ExprKind::Product(_) => 3,
        ExprKind::FunctionCall { .. } => 4,
        ExprKind::Sum(_) => 5,
    }
}

/// `(base, exponent)` view of a factor; non-powers have exponent 1.
fn split_power(e: &Expr) -> (&Expr, Option<&Expr>) {
    match e.kind() {
        ExprKind::Pow(b, ex) => (b.as_ref(), Some(ex.as_ref())),
        _ => (e, None),
    }
}

/// Total order on expressions for canonical sorting.
pub fn expr_cmp(a: &Expr, b: &Expr) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (ba, ea) = split_power(a);
    let (bb, eb) = split_power(b);
    structural_cmp(ba, bb).then_with(|| match (ea, eb) {
        (None, None) => Ordering::Equal,
        (None, Some(y)) => structural_cmp(&Expr::one(), y),
        (Some(x), None) => structural_cmp(x, &Expr::one()),
        (Some(x), Some(y)) => structural_cmp(x, y),
    })
}

fn structural_cmp(a: &Expr, b: &Expr) -> Ordering {
    let (ra, rb) = (rank(a), rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a.kind(), b.kind()) {
        (ExprKind::Number(x), ExprKind::Number(y)) => x.total_cmp(y),
        (ExprKind::Symbol(x), ExprKind::Symbol(y)) => x.cmp(y),
        (ExprKind::Pow(b1, e1), ExprKind::Pow(b2, e2)) => {
            structural_cmp(b1, b2).then_with(|| structural_cmp(e1, e2))
        }
        (
            ExprKind::FunctionCall { name: n1, args: a1 },
            ExprKind::FunctionCall { name: n2, args: a2 },
        ) => n1.cmp(n2).then_with(|| slice_cmp(a1, a2)),
        (ExprKind::Sum(c1), ExprKind::Sum(c2)) | (ExprKind::Product(c1), ExprKind::Product(c2)) => {
            slice_cmp(c1, c2)
        }
        _ => Ordering::Equal,
    }
}

fn slice_cmp(a: &[std::sync::Arc<Expr>], b: &[std::sync::Arc<Expr>]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let o = expr_cmp(x, y);
        if o != Ordering::Equal {
            return o;
        }
    }
    a.len().cmp(&b.len())
}

/// Order for sum terms: compare without numeric coefficients, then by coefficient.
pub fn term_cmp(a: &Expr, b: &Expr) -> Ordering {
    let (ca, ra) = a.split_coefficient();
    let (cb, rb) = b.split_coefficient();
    let (na, nb) = (ra.as_number().is_some(), rb.as_number().is_some());
    match (na, nb) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    expr_cmp(&ra, &rb).then_with(|| ca.total_cmp(&cb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_before_symbols() {
        let n = Expr::number(3.0);
        let x = Expr::symbol("x");
        assert_eq!(expr_cmp(&n, &x), Ordering::Less);
        assert_eq!(expr_cmp(&x, &n), Ordering::Greater);
    }

    #[test]
    fn test_power_follows_its_base() {
        let x = Expr::symbol("x");
        let x2 = Expr::pow(x.clone(), Expr::number(2.0));
        let y = Expr::symbol("y");
        let mut v = vec![y.clone(), x2.clone(), x.clone()];
        v.sort_by(expr_cmp);
        assert_eq!(v, vec![x, x2, y]);
    }

    #[test]
    fn test_term_cmp_ignores_coefficient() {
        let x = Expr::symbol("x");
        let two_x = Expr::product(vec![Expr::number(2.0), x.clone()]);
        let y = Expr::symbol("y");
        assert_eq!(term_cmp(&two_x, &y), Ordering::Less);
        assert_eq!(term_cmp(&Expr::number(5.0), &x), Ordering::Less);
    }
}
