//! Formatted terminal output.
//!
//! Formatting lives in one place so the scoring code stays clean and output
//! changes stay localized.

use crate::domain::{FitStatus, RunReport, Signal, WellReport, WellRole};
use crate::report::SummaryRow;

/// Fit outcome counts across every replicate in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FitCounts {
    pub accepted: usize,
    pub below_threshold: usize,
    pub failed: usize,
}

impl FitCounts {
    pub fn from_report(report: &RunReport) -> Self {
        let mut counts = Self::default();
        for m in report.wells.iter().flat_map(|w| &w.replicates) {
            match m.fit.status {
                FitStatus::Accepted => counts.accepted += 1,
                FitStatus::BelowQualityThreshold => counts.below_threshold += 1,
                FitStatus::FitFailure => counts.failed += 1,
            }
        }
        counts
    }
}

/// Format the run header: configuration, counts and unscored wells.
pub fn format_run_summary(report: &RunReport) -> String {
    let config = &report.config;
    let mut out = String::new();

    out.push_str("=== growthcall - growth phenotype scoring ===\n");
    out.push_str(&format!(
        "Model: {} | min R²={:.2} | trials={} | seed={}\n",
        config.growth_model.display_name(),
        config.min_r2,
        config.max_trials,
        config.seed
    ));
    out.push_str(&format!(
        "Calls: fold change >= {:.2} and p < {:.3} (control well {})\n",
        config.fc_cutoff, config.pvalue_cutoff, config.control_well
    ));

    let controls = report.wells.iter().filter(|w| w.role == WellRole::Control).count();
    let scored = report.wells.len() - controls;
    let growing = report
        .wells
        .iter()
        .filter(|w| w.status.is_some_and(|s| s.has_growth()))
        .count();
    out.push_str(&format!(
        "Wells: scored={scored} | controls={controls} | unscored={} | with growth={growing}\n",
        report.unscored.len()
    ));

    let fits = FitCounts::from_report(report);
    out.push_str(&format!(
        "Fits: accepted={} | below R² threshold={} | failed={}\n",
        fits.accepted, fits.below_threshold, fits.failed
    ));

    if !report.unscored.is_empty() {
        out.push_str("\nUnscored wells:\n");
        for u in &report.unscored {
            out.push_str(&format!("  {}: {}\n", u.key, u.reason));
        }
    }
    out.push('\n');

    out
}

/// Format the Summary pivot: one column per strain.
pub fn format_summary_table(rows: &[SummaryRow], strains: &[String]) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        out.push_str("No growth calls.\n");
        return out;
    }

    let mut header = format!("{:<8} {:<5} {:<28}", "plate", "well", "metabolite");
    let mut rule = format!("{:-<8} {:-<5} {:-<28}", "", "", "");
    for strain in strains {
        header.push_str(&format!(" {:>10}", truncate(strain, 10)));
        rule.push_str(&format!(" {:->10}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    for row in rows {
        let mut line = format!(
            "{:<8} {:<5} {:<28}",
            truncate(&row.plate, 8),
            row.well.as_str(),
            truncate(&row.label, 28)
        );
        for strain in strains {
            line.push_str(&format!(" {:>10}", row.status_cell(strain)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Format every well with means, fold changes and p-values per signal.
pub fn format_well_table(wells: &[WellReport]) -> String {
    let mut out = String::new();
    let mut header = format!("{:<24} {:<6}", "well", "status");
    for signal in Signal::ALL {
        header.push_str(&format!(
            " {:>9} {:>6} {:>8}",
            signal.label(),
            "fc",
            "p"
        ));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for well in wells {
        let status = match well.status {
            Some(s) => s.to_string(),
            None => "ctrl".to_string(),
        };
        let mut line = format!("{:<24} {:<6}", truncate(&well.key.to_string(), 24), status);
        for signal in Signal::ALL {
            let m = well.metric(signal);
            line.push_str(&format!(
                " {:>9} {:>6} {:>8}",
                fmt_opt(m.mean, 4),
                fmt_opt(m.mean_fold_change, 2),
                fmt_opt(m.p_value, 4)
            ));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "NaN".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
