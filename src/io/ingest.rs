//! CSV ingest for plate time series.
//!
//! Input is a long-format table, one OD reading per row:
//!
//! ```text
//! strain,plate,replicate,well,time,od[,metabolite]
//! WT,PM1,1,A1,0.0,0.05,Negative Control
//! ```
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Series-level validation** through `TimeSeries::new`; a rejected series
//!   is reported and left out, it never aborts the load

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{PlateDataset, ReplicateId, TimeSeries, WellKey};
use crate::error::{AppError, SeriesError};

const REQUIRED_COLUMNS: [&str; 6] = ["strain", "plate", "replicate", "well", "time", "od"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// A replicate series dropped because it failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSeries {
    pub key: WellKey,
    pub replicate: ReplicateId,
    pub error: SeriesError,
}

/// Ingest output: grouped dataset + what was skipped along the way.
#[derive(Debug, Clone)]
pub struct IngestedPlate {
    pub dataset: PlateDataset,
    pub row_errors: Vec<RowError>,
    pub rejected: Vec<RejectedSeries>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// One parsed CSV row.
#[derive(Debug, Clone, PartialEq)]
struct PlateRow {
    key: WellKey,
    replicate: ReplicateId,
    time: f64,
    od: f64,
    metabolite: Option<String>,
}

/// Load a long-format plate CSV from disk.
pub fn load_plate_csv(path: &Path) -> Result<IngestedPlate, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_plate_csv(file)
}

/// Parse a long-format plate CSV from any reader.
pub fn read_plate_csv<R: Read>(input: R) -> Result<IngestedPlate, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut points: BTreeMap<(WellKey, ReplicateId), Vec<(f64, f64)>> = BTreeMap::new();
    let mut dataset = PlateDataset::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(row) => {
                if let Some(name) = row.metabolite {
                    if dataset.metabolite(&row.key).is_none() {
                        dataset.set_metabolite(row.key.plate.clone(), row.key.well.clone(), name);
                    }
                }
                points
                    .entry((row.key, row.replicate))
                    .or_default()
                    .push((row.time, row.od));
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let mut rejected = Vec::new();
    let mut rows_used = 0usize;
    for ((key, replicate), mut pts) in points {
        pts.sort_by(|a, b| a.0.total_cmp(&b.0));
        match TimeSeries::from_points(&pts) {
            Ok(series) => {
                rows_used += series.len();
                dataset.insert(key, replicate, series);
            }
            Err(error) => rejected.push(RejectedSeries { key, replicate, error }),
        }
    }

    if dataset.wells.is_empty() {
        return Err(AppError::new(3, "No valid time series remain after ingest."));
    }

    Ok(IngestedPlate {
        dataset,
        row_errors,
        rejected,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::new(
            2,
            format!("Missing required column(s): {}", missing.join(", ")),
        ))
    }
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<PlateRow, String> {
    let strain = get_required(record, header_map, "strain")?;
    let plate = get_required(record, header_map, "plate")?;
    let well = get_required(record, header_map, "well")?;
    let replicate_raw = get_required(record, header_map, "replicate")?;
    let replicate = replicate_raw
        .parse::<ReplicateId>()
        .map_err(|_| format!("Invalid `replicate` '{replicate_raw}' (expected a non-negative integer)."))?;
    let time = parse_f64(get_required(record, header_map, "time")?, "time")?;
    let od = parse_f64(get_required(record, header_map, "od")?, "od")?;
    let metabolite = get_optional(record, header_map, "metabolite").map(str::to_string);

    Ok(PlateRow {
        key: WellKey::new(strain, plate, well),
        replicate,
        time,
        od,
        metabolite,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid `{name}` value '{s}'.")),
    }
}
