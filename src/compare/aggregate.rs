//! Per-signal aggregation across replicates.
//!
//! For one WellKey and one signal:
//! 1. keep the replicates with a value (NaN SGRs dropped)
//! 2. mean over the kept values
//! 3. pair with the control by replicate index, using only indices that have a
//!    value on both sides
//! 4. with at least 2 pairs: fold change of paired means and a two-sided
//!    paired t-test; otherwise both are undefined

use crate::domain::{AggregatedMetric, ReplicateId, Signal, WellMetrics};
use crate::math::{mean, paired_t_test};

/// Minimum number of matched replicates for fold change / p-value.
pub const MIN_PAIRS: usize = 2;

/// Values of one signal: `(replicate, value)` for replicates that have one.
pub fn signal_values(signal: Signal, metrics: &[WellMetrics]) -> Vec<(ReplicateId, f64)> {
    metrics
        .iter()
        .filter_map(|m| m.value(signal).map(|v| (m.replicate, v)))
        .collect()
}

/// Matched `(well, control)` value vectors, in replicate order of `well`.
pub fn paired_values(signal: Signal, well: &[WellMetrics], control: &[WellMetrics]) -> (Vec<f64>, Vec<f64>) {
    let control_values = signal_values(signal, control);
    signal_values(signal, well)
        .into_iter()
        .filter_map(|(rep, w)| {
            control_values
                .iter()
                .find(|(c_rep, _)| *c_rep == rep)
                .map(|&(_, c)| (w, c))
        })
        .unzip()
}

/// Ratio of paired means; undefined unless the control mean is positive.
pub fn fold_change(well: &[f64], control: &[f64]) -> Option<f64> {
    let w = mean(well)?;
    let c = mean(control)?;
    if !(c > 0.0 && c.is_finite()) {
        return None;
    }
    let fc = w / c;
    fc.is_finite().then_some(fc)
}

/// Aggregate a scored well against its control.
pub fn aggregate_signal(signal: Signal, well: &[WellMetrics], control: &[WellMetrics]) -> AggregatedMetric {
    let (replicates, values): (Vec<ReplicateId>, Vec<f64>) = signal_values(signal, well).into_iter().unzip();
    let (paired_well, paired_control) = paired_values(signal, well, control);
    let n_pairs = paired_well.len();

    let (mean_fold_change, p_value) = if n_pairs >= MIN_PAIRS {
        (
            fold_change(&paired_well, &paired_control),
            paired_t_test(&paired_well, &paired_control).map(|t| t.p_value),
        )
    } else {
        (None, None)
    };

    AggregatedMetric {
        signal,
        mean: mean(&values),
        replicates,
        values,
        n_pairs,
        mean_fold_change,
        p_value,
    }
}

/// Aggregate a negative control: trivial fold change, no test.
pub fn aggregate_control(signal: Signal, control: &[WellMetrics]) -> AggregatedMetric {
    let (replicates, values): (Vec<ReplicateId>, Vec<f64>) = signal_values(signal, control).into_iter().unzip();
    AggregatedMetric {
        signal,
        mean: mean(&values),
        n_pairs: values.len(),
        replicates,
        values,
        mean_fold_change: Some(1.0),
        p_value: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitResult, GrowthModelParams};

    fn metrics(replicate: ReplicateId, endpoint_od: f64, sgr: Option<f64>) -> WellMetrics {
        let fit = match sgr {
            Some(mu) => FitResult::accepted(
                GrowthModelParams::Logistic { a: 1.0, mu, lambda: 1.0 },
                0.99,
                1,
            ),
            None => FitResult::below_threshold(0.5, 1),
        };
        WellMetrics {
            replicate,
            endpoint_od,
            auc: endpoint_od * 10.0,
            fit,
        }
    }

    #[test]
    fn control_against_itself_has_unit_fold_change() {
        let control = vec![
            metrics(1, 0.80, Some(0.10)),
            metrics(2, 0.82, Some(0.11)),
            metrics(3, 0.79, Some(0.09)),
        ];
        for signal in Signal::ALL {
            let agg = aggregate_signal(signal, &control, &control);
            assert_eq!(agg.mean_fold_change, Some(1.0));
            assert!(matches!(agg.p_value, None | Some(1.0)));
        }
    }

    #[test]
    fn sgr_pairs_only_replicates_retained_on_both_sides() {
        let well = vec![
            metrics(1, 1.6, Some(0.30)),
            metrics(2, 1.6, None),
            metrics(3, 1.6, Some(0.32)),
            metrics(4, 1.6, Some(0.31)),
        ];
        let control = vec![
            metrics(1, 0.8, Some(0.10)),
            metrics(2, 0.8, Some(0.10)),
            metrics(3, 0.8, None),
            metrics(4, 0.8, Some(0.12)),
        ];
        let agg = aggregate_signal(Signal::Sgr, &well, &control);
        assert_eq!(agg.replicates, vec![1, 3, 4]);
        assert_eq!(agg.n_pairs, 2);
        // Pairs are replicates 1 and 4: (0.30 + 0.31) / (0.10 + 0.12).
        let fc = agg.mean_fold_change.unwrap();
        assert!((fc - 0.61 / 0.22).abs() < 1e-12);
        assert!(agg.p_value.is_some());
    }

    #[test]
    fn fewer_than_two_pairs_is_undefined() {
        let well = vec![metrics(1, 1.6, Some(0.3)), metrics(2, 1.7, None)];
        let control = vec![metrics(1, 0.8, Some(0.1)), metrics(2, 0.8, Some(0.1))];
        let agg = aggregate_signal(Signal::Sgr, &well, &control);
        assert_eq!(agg.n_pairs, 1);
        assert_eq!(agg.mean_fold_change, None);
        assert_eq!(agg.p_value, None);
        assert_eq!(agg.mean, Some(0.3));

        let endpoint = aggregate_signal(Signal::Endpoint, &well, &control);
        assert_eq!(endpoint.n_pairs, 2);
        assert!(endpoint.mean_fold_change.is_some());
    }

    #[test]
    fn replicates_missing_from_control_are_not_paired() {
        let well = vec![metrics(1, 1.0, None), metrics(2, 1.2, None), metrics(5, 9.0, None)];
        let control = vec![metrics(1, 0.5, None), metrics(2, 0.6, None)];
        let agg = aggregate_signal(Signal::Endpoint, &well, &control);
        assert_eq!(agg.n_pairs, 2);
        assert!((agg.mean_fold_change.unwrap() - 2.2 / 1.1).abs() < 1e-12);
        // The unpaired replicate still counts toward the well's own mean.
        assert!((agg.mean.unwrap() - 11.2 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_control_mean_gives_undefined_fold_change() {
        assert_eq!(fold_change(&[1.0, 2.0], &[0.0, 0.0]), None);
        assert_eq!(fold_change(&[], &[]), None);
        assert_eq!(fold_change(&[2.0, 4.0], &[1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn control_aggregate_is_trivial() {
        let control = vec![metrics(1, 0.8, Some(0.1)), metrics(2, 0.9, None)];
        let agg = aggregate_control(Signal::Sgr, &control);
        assert_eq!(agg.mean_fold_change, Some(1.0));
        assert_eq!(agg.p_value, None);
        assert_eq!(agg.values, vec![0.1]);
    }
}
