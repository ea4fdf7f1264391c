//! Phenotype classifier.
//!
//! For each signal independently:
//!
//! ```text
//! call = '+' if fold_change >= fc_cutoff and p_value < pvalue_cutoff else '-'
//! ```
//!
//! An undefined fold change or p-value (too few paired replicates) forces `-`.

use crate::domain::{AggregatedMetric, GrowthCall, GrowthStatus, ScoreConfig};

/// Decision thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cutoffs {
    pub fc_cutoff: f64,
    pub pvalue_cutoff: f64,
}

impl Default for Cutoffs {
    fn default() -> Self {
        Self::from(&ScoreConfig::default())
    }
}

impl From<&ScoreConfig> for Cutoffs {
    fn from(config: &ScoreConfig) -> Self {
        Self {
            fc_cutoff: config.fc_cutoff,
            pvalue_cutoff: config.pvalue_cutoff,
        }
    }
}

/// Call for one `(fold change, p-value)` pair.
pub fn call(fold_change: Option<f64>, p_value: Option<f64>, cutoffs: &Cutoffs) -> GrowthCall {
    match (fold_change, p_value) {
        (Some(fc), Some(p)) if fc >= cutoffs.fc_cutoff && p < cutoffs.pvalue_cutoff => GrowthCall::Plus,
        _ => GrowthCall::Minus,
    }
}

pub fn classify_metric(metric: &AggregatedMetric, cutoffs: &Cutoffs) -> GrowthCall {
    call(metric.mean_fold_change, metric.p_value, cutoffs)
}

/// Combine the three signals into a GrowthStatus (Endpoint, AUC, SGR).
pub fn classify(
    endpoint: &AggregatedMetric,
    auc: &AggregatedMetric,
    sgr: &AggregatedMetric,
    cutoffs: &Cutoffs,
) -> GrowthStatus {
    GrowthStatus {
        endpoint: classify_metric(endpoint, cutoffs),
        auc: classify_metric(auc, cutoffs),
        sgr: classify_metric(sgr, cutoffs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cutoffs(fc_cutoff: f64, pvalue_cutoff: f64) -> Cutoffs {
        Cutoffs {
            fc_cutoff,
            pvalue_cutoff,
        }
    }

    #[test]
    fn boundaries_follow_the_rule() {
        let c = cutoffs(1.2, 0.05);
        assert_eq!(call(Some(1.2), Some(0.049), &c), GrowthCall::Plus);
        assert_eq!(call(Some(1.19), Some(0.001), &c), GrowthCall::Minus);
        assert_eq!(call(Some(3.0), Some(0.05), &c), GrowthCall::Minus);
    }

    #[test]
    fn undefined_inputs_force_minus() {
        let c = cutoffs(0.0, 1.0);
        assert_eq!(call(None, Some(0.0), &c), GrowthCall::Minus);
        assert_eq!(call(Some(10.0), None, &c), GrowthCall::Minus);
        assert_eq!(call(None, None, &c), GrowthCall::Minus);
    }

    #[test]
    fn defaults_match_config_defaults() {
        assert_eq!(Cutoffs::default(), cutoffs(1.2, 0.05));
    }

    proptest! {
        #[test]
        fn raising_fc_cutoff_never_turns_minus_into_plus(
            fc in 0.0f64..5.0,
            p in 0.0f64..1.0,
            lo in 0.0f64..3.0,
            bump in 0.0f64..3.0,
            p_cut in 0.001f64..1.0,
        ) {
            let before = call(Some(fc), Some(p), &cutoffs(lo, p_cut));
            let after = call(Some(fc), Some(p), &cutoffs(lo + bump, p_cut));
            prop_assert!(!(before == GrowthCall::Minus && after == GrowthCall::Plus));
        }

        #[test]
        fn lowering_pvalue_cutoff_never_turns_minus_into_plus(
            fc in 0.0f64..5.0,
            p in 0.0f64..1.0,
            fc_cut in 0.0f64..3.0,
            hi in 0.001f64..1.0,
            shrink in 0.0f64..1.0,
        ) {
            let before = call(Some(fc), Some(p), &cutoffs(fc_cut, hi));
            let after = call(Some(fc), Some(p), &cutoffs(fc_cut, hi * shrink));
            prop_assert!(!(before == GrowthCall::Minus && after == GrowthCall::Plus));
        }
    }
}
