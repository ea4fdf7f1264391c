//! Growth-curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - draw randomized initial guesses inside the model bounds
//! - run a bounded Levenberg–Marquardt fit per guess (parallel)
//! - keep the best-R² trial and gate it on `min_r2`

pub mod fitter;
pub mod guess;
pub mod selection;

pub use fitter::*;
pub use guess::*;
pub use selection::*;
