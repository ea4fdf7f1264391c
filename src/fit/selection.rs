//! Best-trial selection across randomized restarts.
//!
//! Rules:
//! 1. Only converged trials with a finite R² are candidates.
//! 2. The maximum R² wins, regardless of which trial finished first.
//! 3. Ties are broken by the lowest trial index, so selection is deterministic.

/// One converged Levenberg–Marquardt trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialFit {
    /// Position of the initial guess in the drawn sequence.
    pub idx: usize,
    pub params: [f64; 3],
    pub sse: f64,
    pub r2: f64,
}

/// Pick the best trial (max R², then lowest index).
pub fn select_best(trials: &[TrialFit]) -> Option<&TrialFit> {
    let mut best: Option<&TrialFit> = None;
    for c in trials.iter().filter(|c| c.r2.is_finite()) {
        best = match best {
            None => Some(c),
            Some(b) if c.r2 > b.r2 || (c.r2 == b.r2 && c.idx < b.idx) => Some(c),
            keep => keep,
        };
    }
    best
}
