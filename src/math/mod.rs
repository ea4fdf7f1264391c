//! Numerical utilities: linear least squares and statistics.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
