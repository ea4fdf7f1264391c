//! Model evaluation for Logistic / Gompertz growth curves.
//!
//! Both models are parameterized by `(A, μ, λ)` (asymptote, maximum growth
//! rate, lag time):
//!
//! ```text
//! Logistic: OD(t) = A / (1 + exp(4μ/A·(λ − t) + 2))
//! Gompertz: OD(t) = A · exp(−exp(4μ/(A·e)·(λ − t) + 1))
//! ```
//!
//! The fitter relies on three primitives, dispatched once here on the model
//! tag:
//! - `evaluate`: OD(t)
//! - `jacobian`: ∂OD/∂(A, μ, λ) for Levenberg–Marquardt steps
//! - `slope`: dOD/dt (closed form)

use std::f64::consts::E;

use crate::domain::{GrowthModel, GrowthModelParams, TimeSeries};

/// Lower bound of the μ sampling/fit range.
pub const MU_MIN: f64 = 1e-4;
/// Upper bound of the μ sampling/fit range.
pub const MU_MAX: f64 = 10.0;
/// Smallest asymptote the optimizer may reach, as a fraction of max OD.
const A_FLOOR: f64 = 1e-6;

/// Box constraints on `[A, μ, λ]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamBounds {
    pub lower: [f64; 3],
    pub upper: [f64; 3],
}

impl ParamBounds {
    /// Initial-guess box derived from an observed series (shared by both
    /// models):
    /// - `A ∈ [0.5, 2] × max OD`
    /// - `μ ∈ [MU_MIN, MU_MAX]`
    /// - `λ` within the observed time window
    ///
    /// Returns `None` for an all-zero series or a single-instant window.
    pub fn for_series(series: &TimeSeries) -> Option<Self> {
        let (max_od, t0, t1) = series_extent(series)?;
        Some(Self {
            lower: [0.5 * max_od, MU_MIN, t0],
            upper: [2.0 * max_od, MU_MAX, t1],
        })
    }

    /// Optimizer box: the guess box with `A` only kept positive.
    ///
    /// Wells that have not plateaued by the last read have an asymptote well
    /// above the observed maximum.
    pub fn for_fit(series: &TimeSeries) -> Option<Self> {
        let (max_od, t0, t1) = series_extent(series)?;
        Some(Self {
            lower: [A_FLOOR * max_od, MU_MIN, t0],
            upper: [f64::INFINITY, MU_MAX, t1],
        })
    }

    /// Project a parameter vector into the box.
    pub fn clamp(&self, p: [f64; 3]) -> [f64; 3] {
        let mut out = p;
        for (j, v) in out.iter_mut().enumerate() {
            *v = v.clamp(self.lower[j], self.upper[j]);
        }
        out
    }

    pub fn contains(&self, p: &[f64; 3]) -> bool {
        p.iter()
            .enumerate()
            .all(|(j, v)| *v >= self.lower[j] && *v <= self.upper[j])
    }
}

fn series_extent(series: &TimeSeries) -> Option<(f64, f64, f64)> {
    let max_od = series.max_od();
    let (t0, t1) = (series.first_time(), series.last_time());
    if max_od > 0.0 && t1 > t0 { Some((max_od, t0, t1)) } else { None }
}

/// Evaluate `OD(t)`.
pub fn evaluate(params: &GrowthModelParams, t: f64) -> f64 {
    match *params {
        GrowthModelParams::Logistic { a, mu, lambda } => a * logistic_tail(logistic_z(a, mu, lambda, t)),
        GrowthModelParams::Gompertz { a, mu, lambda } => a * (-gompertz_z(a, mu, lambda, t).exp()).exp(),
    }
}

/// Closed-form `dOD/dt`.
///
/// For the Logistic model the maximum of this derivative is exactly `μ`.
pub fn slope(params: &GrowthModelParams, t: f64) -> f64 {
    match *params {
        GrowthModelParams::Logistic { a, mu, lambda } => {
            let s = logistic_tail(logistic_z(a, mu, lambda, t));
            4.0 * mu * s * (1.0 - s)
        }
        GrowthModelParams::Gompertz { a, mu, lambda } => {
            let g = gompertz_z(a, mu, lambda, t).exp();
            if !g.is_finite() {
                return 0.0;
            }
            let y = a * (-g).exp();
            y * g * gompertz_rate(a, mu)
        }
    }
}

/// Partial derivatives `[∂OD/∂A, ∂OD/∂μ, ∂OD/∂λ]` at time `t`.
pub fn jacobian(params: &GrowthModelParams, t: f64) -> [f64; 3] {
    match *params {
        GrowthModelParams::Logistic { a, mu, lambda } => {
            let s = logistic_tail(logistic_z(a, mu, lambda, t));
            let dy_dz = -a * s * (1.0 - s);
            let dt = lambda - t;
            [
                s + dy_dz * (-4.0 * mu * dt / (a * a)),
                dy_dz * (4.0 * dt / a),
                dy_dz * (4.0 * mu / a),
            ]
        }
        GrowthModelParams::Gompertz { a, mu, lambda } => {
            let g = gompertz_z(a, mu, lambda, t).exp();
            let decay = (-g).exp();
            let dy_dz = if g.is_finite() { -a * decay * g } else { 0.0 };
            let k = gompertz_rate(a, mu);
            let dt = lambda - t;
            [
                decay + dy_dz * (-k * dt / a),
                dy_dz * (4.0 * dt / (a * E)),
                dy_dz * k,
            ]
        }
    }
}

/// Evaluate a model given as a tag plus `[A, μ, λ]`.
pub fn evaluate_raw(model: GrowthModel, p: [f64; 3], t: f64) -> f64 {
    evaluate(&GrowthModelParams::new(model, p), t)
}

fn logistic_z(a: f64, mu: f64, lambda: f64, t: f64) -> f64 {
    4.0 * mu / a * (lambda - t) + 2.0
}

fn gompertz_rate(a: f64, mu: f64) -> f64 {
    4.0 * mu / (a * E)
}

fn gompertz_z(a: f64, mu: f64, lambda: f64, t: f64) -> f64 {
    gompertz_rate(a, mu) * (lambda - t) + 1.0
}

/// `1 / (1 + exp(z))` without overflow for large `|z|`.
fn logistic_tail(z: f64) -> f64 {
    if z >= 0.0 {
        let e = (-z).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + z.exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn logistic(a: f64, mu: f64, lambda: f64) -> GrowthModelParams {
        GrowthModelParams::Logistic { a, mu, lambda }
    }

    fn gompertz(a: f64, mu: f64, lambda: f64) -> GrowthModelParams {
        GrowthModelParams::Gompertz { a, mu, lambda }
    }

    #[test]
    fn logistic_matches_closed_form() {
        let p = logistic(1.5, 0.2, 4.0);
        for &t in &[0.0, 3.0, 7.5, 24.0] {
            let expected = 1.5 / (1.0 + (4.0 * 0.2 / 1.5 * (4.0 - t) + 2.0_f64).exp());
            assert!((evaluate(&p, t) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn gompertz_matches_closed_form() {
        let p = gompertz(1.5, 0.2, 4.0);
        for &t in &[0.0, 3.0, 7.5, 24.0] {
            let expected = 1.5 * (-(4.0 * 0.2 / (1.5 * E) * (4.0 - t) + 1.0_f64).exp()).exp();
            assert!((evaluate(&p, t) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn logistic_peak_slope_is_mu() {
        // Inflection where z = 0, i.e. t = λ + A/(2μ).
        let (a, mu, lambda) = (1.2, 0.15, 5.0);
        let t_inflect = lambda + a / (2.0 * mu);
        let peak = slope(&logistic(a, mu, lambda), t_inflect);
        assert!((peak - mu).abs() < 1e-12, "peak slope {peak} != {mu}");
    }

    #[test]
    fn extreme_times_stay_finite() {
        for p in [logistic(1.0, 5.0, 0.0), gompertz(1.0, 5.0, 0.0)] {
            for &t in &[-1e4, 1e4] {
                assert!(evaluate(&p, t).is_finite());
                assert!(slope(&p, t).is_finite());
                assert!(jacobian(&p, t).iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn bounds_follow_observed_series() {
        let s = TimeSeries::from_points(&[(0.0, 0.1), (12.0, 0.8), (24.0, 1.0)]).unwrap();
        let b = ParamBounds::for_series(&s).unwrap();
        assert_eq!(b.lower, [0.5, MU_MIN, 0.0]);
        assert_eq!(b.upper, [2.0, MU_MAX, 24.0]);
        assert_eq!(b.clamp([5.0, 0.0, 30.0]), [2.0, MU_MIN, 24.0]);

        let flat = TimeSeries::from_points(&[(0.0, 0.0), (1.0, 0.0)]).unwrap();
        assert!(ParamBounds::for_series(&flat).is_none());
        assert!(ParamBounds::for_fit(&flat).is_none());
    }

    #[test]
    fn fit_box_leaves_asymptote_open() {
        let s = TimeSeries::from_points(&[(0.0, 0.1), (12.0, 0.4), (24.0, 0.6)]).unwrap();
        let fit = ParamBounds::for_fit(&s).unwrap();
        let guess = ParamBounds::for_series(&s).unwrap();
        assert_eq!(fit.upper[0], f64::INFINITY);
        assert!(fit.lower[0] > 0.0 && fit.lower[0] < guess.lower[0]);
        assert_eq!(fit.clamp([5.0, 20.0, -1.0]), [5.0, MU_MAX, 0.0]);
        assert!(fit.contains(&guess.upper) && fit.contains(&guess.lower));
    }

    proptest! {
        #[test]
        fn analytic_derivatives_match_finite_differences(
            a in 0.2f64..3.0,
            mu in 0.01f64..1.0,
            lambda in 0.0f64..10.0,
            t in 0.0f64..30.0,
            use_gompertz in any::<bool>(),
        ) {
            let model = if use_gompertz { GrowthModel::Gompertz } else { GrowthModel::Logistic };
            let p = [a, mu, lambda];
            let params = GrowthModelParams::new(model, p);
            let h = 1e-6;

            let fd_t = (evaluate_raw(model, p, t + h) - evaluate_raw(model, p, t - h)) / (2.0 * h);
            prop_assert!((slope(&params, t) - fd_t).abs() < 1e-5);

            let jac = jacobian(&params, t);
            for j in 0..3 {
                let mut up = p;
                let mut down = p;
                up[j] += h;
                down[j] -= h;
                let fd = (evaluate_raw(model, up, t) - evaluate_raw(model, down, t)) / (2.0 * h);
                prop_assert!((jac[j] - fd).abs() < 1e-4, "param {} analytic {} fd {}", j, jac[j], fd);
            }
        }
    }
}
