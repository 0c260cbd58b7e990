//! Expression core: tree, symbols, ordering, display and operators.

pub mod display;
pub mod expr;
pub mod ops;
pub mod ordering;
pub mod sign;
pub mod symbol;

pub use expr::{Expr, ExprKind};
pub use ordering::{expr_cmp, term_cmp};
pub use sign::{Assumptions, Sign, sign_of};
pub use symbol::InternedSymbol;
