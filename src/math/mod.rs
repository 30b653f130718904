//! Mathematical utilities: SVD-based least squares.

pub mod ols;

pub use ols::*;
