//! Shared scoring pipeline used by every front-end (`run`, `demo`, tests).
//!
//! Workflow per (strain, plate) group:
//! control extraction -> per-well extraction -> aggregation vs control -> classification
//!
//! Groups run in parallel; within a group every well waits only for its own
//! replicates and the group's control, never for unrelated wells.

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::classify::{Cutoffs, classify};
use crate::compare::{ControlRule, aggregate_control, aggregate_signal};
use crate::domain::{
    PlateDataset, ReplicateSeries, RunReport, ScoreConfig, Signal, UnscoredWell, WellKey, WellReport, WellRole,
};
use crate::error::{AppError, ScoreError};
use crate::fit::FitOptions;
use crate::metrics::{ExtractedWell, extract_well, extract_well_until};

/// Everything a group needs to score its wells.
struct Scorer<'a> {
    dataset: &'a PlateDataset,
    opts: FitOptions,
    rule: ControlRule,
    cutoffs: Cutoffs,
    seed: u64,
}

/// Score every WellKey in `dataset`.
///
/// Wells without a resolvable control are listed in `RunReport::unscored`;
/// they never abort the run.
pub fn score_dataset(dataset: &PlateDataset, config: &ScoreConfig) -> Result<RunReport, AppError> {
    config.validate()?;
    if dataset.wells.is_empty() {
        return Err(AppError::new(3, "No wells to score."));
    }

    let started = Instant::now();
    info!(
        wells = dataset.wells.len(),
        series = dataset.n_series(),
        model = config.growth_model.display_name(),
        max_trials = config.max_trials,
        "scoring started"
    );

    let scorer = Scorer {
        dataset,
        opts: FitOptions::from(config),
        rule: ControlRule::from(config),
        cutoffs: Cutoffs::from(config),
        seed: config.seed,
    };

    let groups = group_by_plate(dataset);
    let outcomes: Vec<Result<WellReport, ScoreError>> = groups
        .par_iter()
        .flat_map(|(_, keys)| scorer.score_group(keys))
        .collect();

    let mut wells = Vec::new();
    let mut unscored = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(report) => wells.push(report),
            Err(err) => {
                warn!(well = %err.key(), reason = %err, "well not scored");
                unscored.push(UnscoredWell {
                    key: err.key().clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    wells.sort_by(|a, b| a.key.cmp(&b.key));
    unscored.sort_by(|a, b| a.key.cmp(&b.key));

    info!(
        scored = wells.len(),
        unscored = unscored.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scoring finished"
    );

    Ok(RunReport {
        config: config.clone(),
        wells,
        unscored,
    })
}

/// WellKeys grouped by `(strain, plate)`, in report order.
fn group_by_plate(dataset: &PlateDataset) -> BTreeMap<(String, String), Vec<&WellKey>> {
    let mut groups: BTreeMap<(String, String), Vec<&WellKey>> = BTreeMap::new();
    for key in dataset.wells.keys() {
        groups
            .entry((key.strain.clone(), key.plate.clone()))
            .or_default()
            .push(key);
    }
    groups
}

impl Scorer<'_> {
    fn score_group(&self, keys: &[&WellKey]) -> Vec<Result<WellReport, ScoreError>> {
        let Some(first) = keys.first() else {
            return Vec::new();
        };
        let control_key = self.rule.control_for(first);
        let control = self
            .rule
            .resolve(first, &self.dataset.wells)
            .and_then(|reps| self.extract(&control_key, reps));

        keys.par_iter()
            .map(|key| {
                if self.rule.is_control(key) {
                    let extracted = control.clone()?;
                    Ok(self.control_report(key, extracted))
                } else {
                    self.score_well(key, &control)
                }
            })
            .collect()
    }

    fn extract(&self, key: &WellKey, reps: &[ReplicateSeries]) -> Result<ExtractedWell, ScoreError> {
        extract_well(key, reps, &self.opts, self.seed)
    }

    fn score_well(
        &self,
        key: &WellKey,
        control: &Result<ExtractedWell, ScoreError>,
    ) -> Result<WellReport, ScoreError> {
        let Ok(control) = control else {
            return Err(ScoreError::MissingControl {
                key: key.clone(),
                control: self.rule.control_for(key),
            });
        };
        let reps = self
            .dataset
            .wells
            .get(key)
            .ok_or_else(|| ScoreError::NoReplicates { key: key.clone() })?;
        let extracted = extract_well_until(key, reps, control.last_common_time, &self.opts, self.seed)?;

        let [endpoint, auc, sgr] =
            Signal::ALL.map(|signal| aggregate_signal(signal, &extracted.metrics, &control.metrics));
        let status = classify(&endpoint, &auc, &sgr, &self.cutoffs);

        Ok(WellReport {
            key: key.clone(),
            metabolite: self.dataset.metabolite(key).map(str::to_string),
            role: WellRole::Test,
            last_common_time: extracted.last_common_time,
            replicates: extracted.metrics,
            endpoint,
            auc,
            sgr,
            status: Some(status),
        })
    }

    fn control_report(&self, key: &WellKey, extracted: ExtractedWell) -> WellReport {
        let [endpoint, auc, sgr] = Signal::ALL.map(|signal| aggregate_control(signal, &extracted.metrics));
        WellReport {
            key: key.clone(),
            metabolite: self.dataset.metabolite(key).map(str::to_string),
            role: WellRole::Control,
            last_common_time: extracted.last_common_time,
            replicates: extracted.metrics,
            endpoint,
            auc,
            sgr,
            status: None,
        }
    }
}
