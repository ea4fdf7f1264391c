//! Input/output helpers.
//!
//! - long-format plate CSV ingest + validation (`ingest`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
