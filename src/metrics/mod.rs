//! Per-replicate metric extraction (endpoint OD, AUC, SGR).

pub mod extract;

pub use extract::*;
