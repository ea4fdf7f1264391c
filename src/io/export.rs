//! Export run results to CSV and JSON.
//!
//! - `*_all.csv`: one row per WellKey with every signal's raw replicate values
//!   (`;`-joined), mean, fold change and p-value
//! - `*_summary.csv`: the Summary pivot (rows with at least one `+`)
//! - `*.json`: the full `RunReport`

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::{RunReport, Signal, WellReport, WellRole};
use crate::error::AppError;
use crate::report::{SummaryRow, report_strains, summary_rows};

/// Default file stem: `output_<YYYYmmdd_HHMMSS>` in local time.
pub fn default_stem() -> String {
    Local::now().format("output_%Y%m%d_%H%M%S").to_string()
}

/// Write all three exports into `dir` and return the written paths.
pub fn export_all(dir: &Path, stem: &str, report: &RunReport) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(4, format!("Failed to create export dir '{}': {e}", dir.display())))?;

    let all = dir.join(format!("{stem}_all.csv"));
    let summary = dir.join(format!("{stem}_summary.csv"));
    let json = dir.join(format!("{stem}.json"));

    write_all_csv(&all, report)?;
    write_summary_csv(&summary, &summary_rows(report), &report_strains(report))?;
    write_report_json(&json, report)?;

    Ok(vec![all, summary, json])
}

/// Write the per-WellKey "All" table.
pub fn write_all_csv(path: &Path, report: &RunReport) -> Result<(), AppError> {
    let mut writer = csv_writer(path)?;

    let mut header = vec![
        "strain".to_string(),
        "plate".to_string(),
        "well".to_string(),
        "metabolite".to_string(),
        "role".to_string(),
        "last_common_time".to_string(),
    ];
    for signal in Signal::ALL {
        let label = signal.label();
        header.push(format!("{label}_replicates"));
        header.push(format!("{label}_mean"));
        header.push(format!("{label}_fold_change"));
        header.push(format!("{label}_pvalue"));
    }
    header.push("R2_replicates".to_string());
    header.push("status".to_string());
    writer.write_record(&header).map_err(write_err)?;

    for well in &report.wells {
        writer.write_record(all_row(well)).map_err(write_err)?;
    }
    writer.flush().map_err(|e| AppError::new(4, format!("Failed to flush '{}': {e}", path.display())))
}

fn all_row(well: &WellReport) -> Vec<String> {
    let role = match well.role {
        WellRole::Control => "control",
        WellRole::Test => "test",
    };
    let mut row = vec![
        well.key.strain.clone(),
        well.key.plate.clone(),
        well.key.well.to_string(),
        well.metabolite.clone().unwrap_or_default(),
        role.to_string(),
        well.last_common_time.to_string(),
    ];
    for signal in Signal::ALL {
        let metric = well.metric(signal);
        let raw: Vec<String> = well
            .replicates
            .iter()
            .map(|m| fmt_value(m.value(signal)))
            .collect();
        row.push(raw.join(";"));
        row.push(fmt_value(metric.mean));
        row.push(fmt_value(metric.mean_fold_change));
        row.push(fmt_value(metric.p_value));
    }
    let r2: Vec<String> = well.replicates.iter().map(|m| m.r2().to_string()).collect();
    row.push(r2.join(";"));
    row.push(well.status.map(|s| s.to_string()).unwrap_or_default());
    row
}

/// Write the Summary pivot: one column per strain.
pub fn write_summary_csv(path: &Path, rows: &[SummaryRow], strains: &[String]) -> Result<(), AppError> {
    let mut writer = csv_writer(path)?;

    let mut header = vec!["plate".to_string(), "well".to_string(), "metabolite".to_string()];
    header.extend(strains.iter().cloned());
    writer.write_record(&header).map_err(write_err)?;

    for row in rows {
        let mut record = vec![row.plate.clone(), row.well.to_string(), row.label.clone()];
        record.extend(strains.iter().map(|s| row.status_cell(s)));
        writer.write_record(&record).map_err(write_err)?;
    }
    writer.flush().map_err(|e| AppError::new(4, format!("Failed to flush '{}': {e}", path.display())))
}

/// Write the full report as pretty JSON. Non-finite numbers become `null`.
pub fn write_report_json(path: &Path, report: &RunReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .map_err(|e| AppError::new(4, format!("Failed to write JSON '{}': {e}", path.display())))
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::new(4, format!("Failed to create CSV '{}': {e}", path.display())))
}

fn write_err(e: csv::Error) -> AppError {
    AppError::new(4, format!("Failed to write CSV row: {e}"))
}

fn fmt_value(v: Option<f64>) -> String {
    match v {
        Some(x) => x.to_string(),
        None => "NaN".to_string(),
    }
}
