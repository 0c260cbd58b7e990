//! Symbolic differentiation.

mod engine;
