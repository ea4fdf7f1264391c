//! `growthcall` library crate.
//!
//! The binary (`growthcall`) is a thin wrapper around this library so that:
//!
//! - the scoring engine is testable without spawning processes
//! - the input and output sides stay swappable around the core
//!   (`io`, `data`, `report` on the outside; `models`, `fit`, `metrics`,
//!   `compare`, `classify` inside)

pub mod app;
pub mod classify;
pub mod cli;
pub mod compare;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod metrics;
pub mod models;
pub mod report;
