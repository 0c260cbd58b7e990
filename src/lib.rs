//! Symbolic Algebra of Random Variables
//!
//! Random variables are represented as piecewise symbolic functions over an ordered
//! partition of their support, in one of six equivalent functional forms (PDF, CDF, SF,
//! HF, CHF, IDF). Conversions, changes of variable, sums, products, extremes, order
//! statistics, truncation, moments and sampling all produce new exact distributions.
//!
//! # Features
//! - In-crate computer algebra: parsing, simplification, differentiation, integration,
//!   limits and equation solving over [`Expr`]
//! - [`Piecewise`] distributions with numeric or symbolic parameters
//! - Named combinators ([`convolution`], [`product`], [`maximum`], [`minimum`], ...)
//!   rather than overloaded operators: they combine independent random variables
//! - A catalog of named families in [`catalog`]
//! - Newton-inversion sampling through [`Sampler`]
//!
//! # Usage
//! ```
//! use symb_prob::{catalog, convolution};
//!
//! let u = catalog::uniform(0.0, 1.0).unwrap();
//! let sum = convolution(&u, &u).unwrap();
//! let f = sum.pdf_at(1.0).unwrap().to_f64().unwrap();
//! assert!((f - 1.0).abs() < 1e-9);
//! ```

mod builder;
pub mod calculus;
pub mod core;
mod diff;
pub mod dist;
mod error;
pub mod functions;
pub(crate) mod math;
mod parser;
mod simplification;
pub mod traits;

#[cfg(feature = "parallel")]
pub mod parallel;

#[cfg(test)]
mod tests;

// Re-export key types for easier usage
pub use builder::Simplify;
pub use crate::core::{Assumptions, Expr, ExprKind, Sign};
pub use dist::{
    BRANCH_TOLERANCE, Form, IntoSegments, Kind, MASS_TOLERANCE, NEWTON_ITERATIONS, PdfCheck,
    Piecewise, PlotSegment, Sampler, Transform, VAR, catalog, convolution, convolution_iid,
    idf_at, maximum, maximum_iid, minimum, minimum_iid, mixture, order_stat, product,
    product_iid, truncate,
};
pub use error::{CasError, DistError, Span};
pub use parser::parse;
pub use simplification::{DEFAULT_MAX_ITERATIONS, simplify, simplify_domain_safe};
