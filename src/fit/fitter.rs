//! Growth-curve fitting for a single replicate series.
//!
//! Given:
//! - times `t_i` and blank-corrected OD `y_i`
//! - a growth model (Logistic / Gompertz)
//! - `max_trials` random initial guesses
//!
//! we run, for each guess, a bounded Levenberg–Marquardt fit and score the
//! converged parameters by R². The best-R² trial across all attempts is kept;
//! it is accepted only if R² reaches `min_r2`.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{FitResult, GrowthModel, GrowthModelParams, ScoreConfig, TimeSeries};
use crate::fit::guess::draw_initial_guesses;
use crate::fit::selection::{TrialFit, select_best};
use crate::math::{r_squared, solve_damped_step};
use crate::models::{ParamBounds, evaluate_raw, jacobian};

/// Fewer points than this leaves the 3-parameter models underdetermined.
pub const MIN_POINTS: usize = 4;

const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e10;
const MIN_DAMPING: f64 = 1e-12;
/// Relative SSE decrease below which a step counts as converged.
const FTOL: f64 = 1.5e-8;
/// Relative parameter change below which a step counts as converged.
const XTOL: f64 = 1.5e-8;
/// Gradient norm (‖Jᵀr‖∞) below which the current point is stationary.
const GTOL: f64 = 1e-14;

/// Options that affect how each series is fitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub model: GrowthModel,
    pub min_r2: f64,
    pub max_trials: usize,
    /// Levenberg–Marquardt iteration cap per trial.
    pub max_iterations: usize,
}

impl From<&ScoreConfig> for FitOptions {
    fn from(config: &ScoreConfig) -> Self {
        Self {
            model: config.growth_model,
            min_r2: config.min_r2,
            max_trials: config.max_trials,
            max_iterations: config.max_iterations,
        }
    }
}

/// Fit one series with a seeded RNG.
pub fn fit_growth_curve(series: &TimeSeries, opts: &FitOptions, seed: u64) -> FitResult {
    let mut rng = StdRng::seed_from_u64(seed);
    fit_growth_curve_with_rng(series, opts, &mut rng)
}

/// Fit one series, drawing initial guesses from `rng`.
///
/// Never fails: degenerate input or no converged trial yields
/// `FitResult::failure()`; a best R² below `min_r2` yields
/// `FitResult::below_threshold`.
pub fn fit_growth_curve_with_rng<R: Rng + ?Sized>(series: &TimeSeries, opts: &FitOptions, rng: &mut R) -> FitResult {
    if series.len() < MIN_POINTS {
        return FitResult::failure();
    }
    let (Some(guess_box), Some(fit_box)) = (ParamBounds::for_series(series), ParamBounds::for_fit(series)) else {
        return FitResult::failure();
    };
    let (t, y) = (series.times(), series.od());
    if y.iter().all(|v| *v == y[0]) {
        return FitResult::failure();
    }

    let guesses = draw_initial_guesses(&guess_box, opts.max_trials, rng);

    // Trials are independent; guesses are fixed up front so the outcome does
    // not depend on scheduling.
    let trials: Vec<TrialFit> = guesses
        .par_iter()
        .enumerate()
        .filter_map(|(idx, p0)| {
            let (params, sse) = levenberg_marquardt(opts.model, t, y, *p0, &fit_box, opts.max_iterations)?;
            let predicted: Vec<f64> = t.iter().map(|&ti| evaluate_raw(opts.model, params, ti)).collect();
            let r2 = r_squared(y, &predicted)?;
            Some(TrialFit { idx, params, sse, r2 })
        })
        .collect();

    let Some(best) = select_best(&trials) else {
        return FitResult::failure();
    };

    if best.r2 < opts.min_r2 {
        FitResult::below_threshold(best.r2, trials.len())
    } else {
        FitResult::accepted(GrowthModelParams::new(opts.model, best.params), best.r2, trials.len())
    }
}

/// Bounded Levenberg–Marquardt from a single starting point.
///
/// Returns the converged `(params, sse)`, or `None` when a step cannot be
/// solved, the objective turns non-finite, or `max_iterations` is reached
/// without convergence.
pub fn levenberg_marquardt(
    model: GrowthModel,
    t: &[f64],
    y: &[f64],
    p0: [f64; 3],
    bounds: &ParamBounds,
    max_iterations: usize,
) -> Option<([f64; 3], f64)> {
    let n = t.len();
    let mut p = bounds.clamp(p0);
    let mut sse = sse_at(model, p, t, y)?;
    let mut damping = INITIAL_DAMPING;

    let mut jac = DMatrix::<f64>::zeros(n, 3);
    let mut resid = DVector::<f64>::zeros(n);

    for _ in 0..max_iterations {
        let params = GrowthModelParams::new(model, p);
        for i in 0..n {
            let row = jacobian(&params, t[i]);
            for (j, v) in row.iter().enumerate() {
                jac[(i, j)] = *v;
            }
            resid[i] = y[i] - evaluate_raw(model, p, t[i]);
        }
        if jac.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let gradient = jac.transpose() * &resid;
        if gradient.amax() <= GTOL {
            return Some((p, sse));
        }

        // Marquardt scaling: damp each parameter relative to its own curvature.
        let scale: Vec<f64> = (0..3)
            .map(|j| (damping * jac.column(j).norm_squared().max(MIN_DAMPING)).sqrt())
            .collect();
        let delta = solve_damped_step(&jac, &resid, &scale)?;

        let mut candidate = p;
        for (j, v) in candidate.iter_mut().enumerate() {
            *v += delta[j];
        }
        let candidate = bounds.clamp(candidate);

        match sse_at(model, candidate, t, y) {
            Some(new_sse) if new_sse < sse => {
                let improvement = sse - new_sse;
                let step = candidate
                    .iter()
                    .zip(p.iter())
                    .map(|(a, b)| (a - b).abs() / (b.abs() + XTOL))
                    .fold(0.0, f64::max);
                p = candidate;
                sse = new_sse;
                damping = (damping * 0.3).max(MIN_DAMPING);
                if improvement <= FTOL * sse || step <= XTOL {
                    return Some((p, sse));
                }
            }
            _ => {
                damping *= 10.0;
                if damping > MAX_DAMPING {
                    // No downhill step left inside the box.
                    return Some((p, sse));
                }
            }
        }
    }

    None
}

fn sse_at(model: GrowthModel, p: [f64; 3], t: &[f64], y: &[f64]) -> Option<f64> {
    let sse: f64 = t
        .iter()
        .zip(y.iter())
        .map(|(&ti, &yi)| {
            let r = yi - evaluate_raw(model, p, ti);
            r * r
        })
        .sum();
    if sse.is_finite() { Some(sse) } else { None }
}
