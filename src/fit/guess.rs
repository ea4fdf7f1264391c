//! Randomized initial guesses for the growth-curve fitter.
//!
//! Sigmoid least squares is non-convex and very sensitive to the starting
//! point, so each series is fitted from many independent random starts drawn
//! inside the model's parameter box:
//!
//! - `A` uniform (same order of magnitude as the data)
//! - `μ` log-uniform (plausible rates span several decades)
//! - `λ` uniform over the observed time window

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::Rng;

use crate::domain::{ReplicateId, WellKey};
use crate::models::ParamBounds;

/// Draw `x` with `ln x` uniform on `[ln lo, ln hi]`.
///
/// Both bounds must be finite and positive with `lo <= hi`.
pub fn log_uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    rng.gen_range(lo.ln()..=hi.ln()).exp()
}

/// One random `[A, μ, λ]` inside `bounds`.
pub fn draw_initial_guess<R: Rng + ?Sized>(bounds: &ParamBounds, rng: &mut R) -> [f64; 3] {
    let [a_lo, mu_lo, lag_lo] = bounds.lower;
    let [a_hi, mu_hi, lag_hi] = bounds.upper;
    [
        rng.gen_range(a_lo..=a_hi),
        log_uniform(rng, mu_lo, mu_hi),
        rng.gen_range(lag_lo..=lag_hi),
    ]
}

/// `n` guesses drawn sequentially from `rng`.
///
/// Sequential drawing keeps the guess list independent of how trials are later
/// scheduled across threads, and makes the first `k` guesses of a longer run
/// identical to a run with `max_trials = k`.
pub fn draw_initial_guesses<R: Rng + ?Sized>(bounds: &ParamBounds, n: usize, rng: &mut R) -> Vec<[f64; 3]> {
    (0..n).map(|_| draw_initial_guess(bounds, rng)).collect()
}

/// Seed for one (WellKey, replicate) fit task, derived from the run seed.
///
/// Distinct tasks get unrelated streams, so parallel fits never share
/// correlated retries, and a rerun with the same run seed reproduces them.
pub fn derive_seed(run_seed: u64, key: &WellKey, replicate: ReplicateId) -> u64 {
    let mut hasher = DefaultHasher::new();
    run_seed.hash(&mut hasher);
    key.hash(&mut hasher);
    replicate.hash(&mut hasher);
    hasher.finish()
}
