//! Arithmetic operators for building expressions.
//!
//! These build symbolic terms only. Combining random variables goes through the
//! named operations in [`crate::dist`].

use std::ops::{Add, Div, Mul, Neg, Sub};

use super::expr::Expr;

macro_rules! impl_binary_ops {
    ($lhs:ty, $rhs:ty, $to_lhs:expr, $to_rhs:expr) => {
        impl Add<$rhs> for $lhs {
            type Output = Expr;
            fn add(self, rhs: $rhs) -> Expr {
                Expr::sum(vec![$to_lhs(self), $to_rhs(rhs)])
            }
        }
        impl Sub<$rhs> for $lhs {
            type Output = Expr;
            fn sub(self, rhs: $rhs) -> Expr {
                Expr::sub_expr($to_lhs(self), $to_rhs(rhs))
            }
        }
        impl Mul<$rhs> for $lhs {
            type Output = Expr;
            fn mul(self, rhs: $rhs) -> Expr {
                Expr::product(vec![$to_lhs(self), $to_rhs(rhs)])
            }
        }
        impl Div<$rhs> for $lhs {
            type Output = Expr;
            fn div(self, rhs: $rhs) -> Expr {
                Expr::div_expr($to_lhs(self), $to_rhs(rhs))
            }
        }
    };
}

impl_binary_ops!(Expr, Expr, |s: Expr| s, |r: Expr| r);
impl_binary_ops!(Expr, &Expr, |s: Expr| s, |r: &Expr| r.clone());
impl_binary_ops!(&Expr, Expr, |s: &Expr| s.clone(), |r: Expr| r);
impl_binary_ops!(&Expr, &Expr, |s: &Expr| s.clone(), |r: &Expr| r.clone());
impl_binary_ops!(Expr, f64, |s: Expr| s, Expr::number);
impl_binary_ops!(&Expr, f64, |s: &Expr| s.clone(), Expr::number);
impl_binary_ops!(f64, Expr, Expr::number, |r: Expr| r);
impl_binary_ops!(f64, &Expr, Expr::number, |r: &Expr| r.clone());

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.negate()
    }
}

impl Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.clone().negate()
    }
}
