//! Reporting utilities: the Summary pivot and formatted terminal output.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{GrowthStatus, RunReport, WellId};

pub mod format;

pub use format::*;

/// Summary cell for a strain without a call in that row.
pub const NO_CALL: &str = "-";

/// One Summary row: a (plate, well) condition with each strain's call.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub plate: String,
    pub well: WellId,
    /// Metabolite name, or the well id when none is known.
    pub label: String,
    pub statuses: BTreeMap<String, GrowthStatus>,
}

impl SummaryRow {
    pub fn status(&self, strain: &str) -> Option<GrowthStatus> {
        self.statuses.get(strain).copied()
    }

    /// Rendered call for `strain`; `-` when the strain has no call here.
    pub fn status_cell(&self, strain: &str) -> String {
        self.status(strain)
            .map(|s| s.to_string())
            .unwrap_or_else(|| NO_CALL.to_string())
    }
}

/// Strains present among the classified wells, sorted.
pub fn report_strains(report: &RunReport) -> Vec<String> {
    report
        .wells
        .iter()
        .filter(|w| w.status.is_some())
        .map(|w| w.key.strain.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Pivot classified wells into one row per (plate, well), keeping only rows
/// where at least one strain has at least one '+' call.
pub fn summary_rows(report: &RunReport) -> Vec<SummaryRow> {
    let mut rows: BTreeMap<(String, WellId), SummaryRow> = BTreeMap::new();
    for well in &report.wells {
        let Some(status) = well.status else {
            continue;
        };
        let row = rows
            .entry((well.key.plate.clone(), well.key.well.clone()))
            .or_insert_with(|| SummaryRow {
                plate: well.key.plate.clone(),
                well: well.key.well.clone(),
                label: well.label().to_string(),
                statuses: BTreeMap::new(),
            });
        row.statuses.insert(well.key.strain.clone(), status);
    }

    rows.into_values()
        .filter(|row| row.statuses.values().any(GrowthStatus::has_growth))
        .collect()
}
