//! Metric extraction for one WellKey's replicate group.
//!
//! Truncation policy differs per signal:
//! - endpoint OD is read at the last time common to every replicate, so all
//!   replicates are compared at the same elapsed time
//! - AUC integrates each replicate's own full series
//! - SGR comes from fitting each replicate's full series

use rayon::prelude::*;
use tracing::debug;

use crate::domain::{ReplicateSeries, TimeSeries, WellKey, WellMetrics};
use crate::error::ScoreError;
use crate::fit::{FitOptions, derive_seed, fit_growth_curve};
use crate::math::trapezoid;

/// Metrics for every replicate of a WellKey plus the shared endpoint time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedWell {
    pub last_common_time: f64,
    /// Sorted by replicate index.
    pub metrics: Vec<WellMetrics>,
}

/// Latest elapsed time observed by every replicate: the minimum of each
/// replicate's last time. `None` for an empty group.
pub fn last_common_time(replicates: &[ReplicateSeries]) -> Option<f64> {
    replicates
        .iter()
        .map(|r| r.series.last_time())
        .min_by(f64::total_cmp)
}

/// OD at `t_end`; NaN if the series starts after `t_end`.
pub fn endpoint_od(series: &TimeSeries, t_end: f64) -> f64 {
    series.value_at(t_end).unwrap_or(f64::NAN)
}

/// Trapezoidal area under the full observed series.
pub fn area_under_curve(series: &TimeSeries) -> f64 {
    trapezoid(series.times(), series.od())
}

/// Extract all three metrics for one replicate.
pub fn extract_replicate(replicate: &ReplicateSeries, t_end: f64, opts: &FitOptions, seed: u64) -> WellMetrics {
    let fit = fit_growth_curve(&replicate.series, opts, seed);
    WellMetrics {
        replicate: replicate.replicate,
        endpoint_od: endpoint_od(&replicate.series, t_end),
        auc: area_under_curve(&replicate.series),
        fit,
    }
}

/// Extract metrics for every replicate of `key` (fits run in parallel).
pub fn extract_well(
    key: &WellKey,
    replicates: &[ReplicateSeries],
    opts: &FitOptions,
    run_seed: u64,
) -> Result<ExtractedWell, ScoreError> {
    extract_well_until(key, replicates, f64::INFINITY, opts, run_seed)
}

/// Like [`extract_well`], but the endpoint is read no later than `t_limit`.
///
/// Scored wells pass their control's last common time so both sides of a fold
/// change are read at the same elapsed time.
pub fn extract_well_until(
    key: &WellKey,
    replicates: &[ReplicateSeries],
    t_limit: f64,
    opts: &FitOptions,
    run_seed: u64,
) -> Result<ExtractedWell, ScoreError> {
    let t_end = last_common_time(replicates)
        .ok_or_else(|| ScoreError::NoReplicates { key: key.clone() })?
        .min(t_limit);

    let mut metrics: Vec<WellMetrics> = replicates
        .par_iter()
        .map(|rep| {
            let seed = derive_seed(run_seed, key, rep.replicate);
            let m = extract_replicate(rep, t_end, opts, seed);
            debug!(
                well = %key,
                replicate = rep.replicate,
                r2 = m.fit.r2,
                status = ?m.fit.status,
                "growth curve fitted"
            );
            m
        })
        .collect();
    metrics.sort_by_key(|m| m.replicate);

    Ok(ExtractedWell {
        last_common_time: t_end,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GrowthModel;

    fn rep(replicate: u32, points: &[(f64, f64)]) -> ReplicateSeries {
        ReplicateSeries {
            replicate,
            series: TimeSeries::from_points(points).unwrap(),
        }
    }

    fn opts() -> FitOptions {
        FitOptions {
            model: GrowthModel::Logistic,
            min_r2: 0.9,
            max_trials: 5,
            max_iterations: 100,
        }
    }

    #[test]
    fn endpoint_is_read_at_shared_time_for_unequal_lengths() {
        let reps = vec![
            rep(1, &[(0.0, 0.1), (1.0, 0.2), (2.0, 0.4), (3.0, 0.8), (4.0, 1.0)]),
            rep(2, &[(0.0, 0.1), (1.0, 0.3), (2.0, 0.5)]),
            rep(3, &[(0.0, 0.1), (1.0, 0.2), (2.0, 0.6), (3.0, 0.9)]),
        ];
        let key = WellKey::new("WT", "PM1", "B1");
        let out = extract_well(&key, &reps, &opts(), 42).unwrap();

        assert_eq!(out.last_common_time, 2.0);
        let endpoints: Vec<f64> = out.metrics.iter().map(|m| m.endpoint_od).collect();
        assert_eq!(endpoints, vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn endpoint_is_capped_at_the_given_limit() {
        let reps = vec![
            rep(1, &[(0.0, 0.1), (1.0, 0.2), (2.0, 0.4), (3.0, 0.8), (4.0, 1.0)]),
            rep(2, &[(0.0, 0.1), (1.0, 0.3), (2.0, 0.5), (3.0, 0.7), (4.0, 0.9)]),
        ];
        let key = WellKey::new("WT", "PM1", "B2");

        let out = extract_well_until(&key, &reps, 3.0, &opts(), 42).unwrap();
        assert_eq!(out.last_common_time, 3.0);
        let endpoints: Vec<f64> = out.metrics.iter().map(|m| m.endpoint_od).collect();
        assert_eq!(endpoints, vec![0.8, 0.7]);

        let uncapped = extract_well_until(&key, &reps, 10.0, &opts(), 42).unwrap();
        assert_eq!(uncapped.last_common_time, 4.0);
        assert_eq!(uncapped, extract_well(&key, &reps, &opts(), 42).unwrap());
    }

    #[test]
    fn auc_uses_each_replicates_full_series() {
        let reps = vec![
            rep(1, &[(0.0, 0.0), (2.0, 1.0), (5.0, 1.0), (6.0, 3.0)]),
            rep(2, &[(0.0, 0.0), (2.0, 1.0)]),
        ];
        let key = WellKey::new("WT", "PM1", "C3");
        let out = extract_well(&key, &reps, &opts(), 1).unwrap();

        assert_eq!(out.last_common_time, 2.0);
        assert!((out.metrics[0].auc - 6.0).abs() < 1e-12);
        assert!((out.metrics[1].auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn endpoint_interpolates_when_grids_differ() {
        let reps = vec![
            rep(1, &[(0.0, 0.0), (1.0, 0.2), (3.0, 0.6)]),
            rep(2, &[(0.0, 0.0), (2.0, 0.4), (2.5, 0.5)]),
        ];
        let key = WellKey::new("WT", "PM1", "D4");
        let out = extract_well(&key, &reps, &opts(), 1).unwrap();
        assert_eq!(out.last_common_time, 2.5);
        assert!((out.metrics[0].endpoint_od - 0.5).abs() < 1e-12);
        assert!((out.metrics[1].endpoint_od - 0.5).abs() < 1e-12);
    }

    #[test]
    fn short_series_degrades_sgr_only() {
        let reps = vec![rep(1, &[(0.0, 0.05), (24.0, 1.6)])];
        let key = WellKey::new("WT", "PM1", "E5");
        let out = extract_well(&key, &reps, &opts(), 1).unwrap();
        let m = &out.metrics[0];
        assert_eq!(m.endpoint_od, 1.6);
        assert!((m.auc - 0.5 * 24.0 * 1.65).abs() < 1e-12);
        assert!(m.sgr().is_nan());
        assert_eq!(m.r2(), f64::NEG_INFINITY);
    }

    #[test]
    fn empty_group_is_reported() {
        let key = WellKey::new("WT", "PM1", "F6");
        let err = extract_well(&key, &[], &opts(), 1).unwrap_err();
        assert_eq!(err, ScoreError::NoReplicates { key });
    }

    #[test]
    fn metrics_are_sorted_by_replicate() {
        let pts = [(0.0, 0.1), (1.0, 0.2), (2.0, 0.3)];
        let reps = vec![rep(3, &pts), rep(1, &pts), rep(2, &pts)];
        let key = WellKey::new("WT", "PM1", "G7");
        let out = extract_well(&key, &reps, &opts(), 1).unwrap();
        let order: Vec<u32> = out.metrics.iter().map(|m| m.replicate).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }
}
