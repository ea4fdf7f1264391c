//! Cross-replicate aggregation and paired comparison against the negative control.

pub mod aggregate;
pub mod control;

pub use aggregate::*;
pub use control::*;
