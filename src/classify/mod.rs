//! Growth-phenotype calls from fold change and p-value.

pub mod classifier;

pub use classifier::*;
