//! Domain types used throughout the scoring pipeline.
//!
//! This module defines:
//!
//! - identifiers (`WellId`, `WellKey`, `ReplicateId`) and input series (`TimeSeries`)
//! - fit outputs (`GrowthModelParams`, `FitResult`)
//! - per-replicate and aggregated metrics, growth calls, and run configuration

pub mod types;

pub use types::*;
