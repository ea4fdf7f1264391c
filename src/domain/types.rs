//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and aggregation
//! - exported to JSON/CSV
//! - compared across runs (idempotence checks)

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, SeriesError};

/// Which parametric growth model to fit for SGR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GrowthModel {
    #[default]
    Logistic,
    Gompertz,
}

impl GrowthModel {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            GrowthModel::Logistic => "Logistic",
            GrowthModel::Gompertz => "Gompertz",
        }
    }
}

/// A plate well coordinate such as `A1` or `H12`.
///
/// Ordering is row letters first, then the numeric column (`A2 < A10 < B1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WellId(String);

impl WellId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn sort_key(&self) -> (&str, u32) {
        let split = self
            .0
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.0.len());
        let (row, col) = self.0.split_at(split);
        (row, col.parse().unwrap_or(u32::MAX))
    }
}

impl Ord for WellId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for WellId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A biological condition: one well of one plate for one strain.
///
/// Field order defines the report order: strain, then plate, then well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WellKey {
    pub strain: String,
    pub plate: String,
    pub well: WellId,
}

impl WellKey {
    pub fn new(strain: impl Into<String>, plate: impl Into<String>, well: impl AsRef<str>) -> Self {
        Self {
            strain: strain.into(),
            plate: plate.into(),
            well: WellId::new(well),
        }
    }

    /// Same plate and strain, different well.
    pub fn with_well(&self, well: WellId) -> Self {
        Self {
            strain: self.strain.clone(),
            plate: self.plate.clone(),
            well,
        }
    }
}

impl fmt::Display for WellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.strain, self.plate, self.well)
    }
}

/// Replicate index (plate reading repeat).
pub type ReplicateId = u32;

/// Blank-corrected OD readings over time for one (plate, replicate, well).
///
/// Invariants (checked by [`TimeSeries::new`]): non-empty, times strictly
/// increasing, every value finite, OD non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    times: Vec<f64>,
    od: Vec<f64>,
}

impl TimeSeries {
    pub fn new(times: Vec<f64>, od: Vec<f64>) -> Result<Self, SeriesError> {
        if times.len() != od.len() {
            return Err(SeriesError::LengthMismatch {
                times: times.len(),
                od: od.len(),
            });
        }
        if times.is_empty() {
            return Err(SeriesError::Empty);
        }
        for (index, (&t, &y)) in times.iter().zip(od.iter()).enumerate() {
            if !(t.is_finite() && y.is_finite()) {
                return Err(SeriesError::NonFinite { index });
            }
            if y < 0.0 {
                return Err(SeriesError::NegativeOd { index, value: y });
            }
            if index > 0 && t <= times[index - 1] {
                return Err(SeriesError::NotIncreasing { index });
            }
        }
        Ok(Self { times, od })
    }

    /// Build from `(time, od)` pairs.
    pub fn from_points(points: &[(f64, f64)]) -> Result<Self, SeriesError> {
        let (times, od): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
        Self::new(times, od)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn od(&self) -> &[f64] {
        &self.od
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn first_time(&self) -> f64 {
        self.times[0]
    }

    pub fn last_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn max_od(&self) -> f64 {
        self.od.iter().copied().fold(0.0, f64::max)
    }

    /// OD at time `t`: exact when sampled, linearly interpolated between the
    /// bracketing samples otherwise. `None` outside the observed window.
    pub fn value_at(&self, t: f64) -> Option<f64> {
        if !(t >= self.first_time() && t <= self.last_time()) {
            return None;
        }
        let idx = self.times.partition_point(|&x| x < t);
        let t1 = self.times[idx];
        if t1 == t || idx == 0 {
            return Some(self.od[idx]);
        }
        let t0 = self.times[idx - 1];
        let (y0, y1) = (self.od[idx - 1], self.od[idx]);
        Some(y0 + (y1 - y0) * (t - t0) / (t1 - t0))
    }
}

/// One replicate's series for a WellKey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicateSeries {
    pub replicate: ReplicateId,
    pub series: TimeSeries,
}

/// Input to a run: every WellKey's replicate series.
///
/// Handed over by the input side already blank-corrected and aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlateDataset {
    pub wells: BTreeMap<WellKey, Vec<ReplicateSeries>>,
    /// Metabolite label per `(plate, well)`, when known.
    pub metabolites: BTreeMap<(String, WellId), String>,
}

impl PlateDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one replicate series (replacing an existing one with the same index).
    pub fn insert(&mut self, key: WellKey, replicate: ReplicateId, series: TimeSeries) {
        let reps = self.wells.entry(key).or_default();
        match reps.iter_mut().find(|r| r.replicate == replicate) {
            Some(existing) => existing.series = series,
            None => reps.push(ReplicateSeries { replicate, series }),
        }
        reps.sort_by_key(|r| r.replicate);
    }

    pub fn set_metabolite(&mut self, plate: impl Into<String>, well: WellId, name: impl Into<String>) {
        self.metabolites.insert((plate.into(), well), name.into());
    }

    pub fn metabolite(&self, key: &WellKey) -> Option<&str> {
        self.metabolites
            .get(&(key.plate.clone(), key.well.clone()))
            .map(String::as_str)
    }

    /// Total number of replicate series.
    pub fn n_series(&self) -> usize {
        self.wells.values().map(Vec::len).sum()
    }
}

/// Fitted growth model parameters.
///
/// `a` is the asymptote, `mu` the maximum specific growth rate and `lambda`
/// the lag time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum GrowthModelParams {
    Logistic { a: f64, mu: f64, lambda: f64 },
    Gompertz { a: f64, mu: f64, lambda: f64 },
}

impl GrowthModelParams {
    pub fn new(model: GrowthModel, [a, mu, lambda]: [f64; 3]) -> Self {
        match model {
            GrowthModel::Logistic => GrowthModelParams::Logistic { a, mu, lambda },
            GrowthModel::Gompertz => GrowthModelParams::Gompertz { a, mu, lambda },
        }
    }

    pub fn model(&self) -> GrowthModel {
        match self {
            GrowthModelParams::Logistic { .. } => GrowthModel::Logistic,
            GrowthModelParams::Gompertz { .. } => GrowthModel::Gompertz,
        }
    }

    /// Parameters as `[A, μ, λ]`.
    pub fn to_array(&self) -> [f64; 3] {
        match *self {
            GrowthModelParams::Logistic { a, mu, lambda }
            | GrowthModelParams::Gompertz { a, mu, lambda } => [a, mu, lambda],
        }
    }

    pub fn mu(&self) -> f64 {
        self.to_array()[1]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Outcome category of a curve fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Accepted,
    /// Converged, but the best R² is below `min_r2`.
    BelowQualityThreshold,
    /// No trial converged (or the series is degenerate).
    FitFailure,
}

/// Result of fitting one replicate's series.
///
/// `sgr` is NaN unless `status == Accepted`; `r2` is `-inf` when no trial
/// converged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub params: Option<GrowthModelParams>,
    pub r2: f64,
    pub sgr: f64,
    pub status: FitStatus,
    pub trials_converged: usize,
}

impl FitResult {
    pub fn failure() -> Self {
        Self {
            params: None,
            r2: f64::NEG_INFINITY,
            sgr: f64::NAN,
            status: FitStatus::FitFailure,
            trials_converged: 0,
        }
    }

    pub fn below_threshold(r2: f64, trials_converged: usize) -> Self {
        Self {
            params: None,
            r2,
            sgr: f64::NAN,
            status: FitStatus::BelowQualityThreshold,
            trials_converged,
        }
    }

    pub fn accepted(params: GrowthModelParams, r2: f64, trials_converged: usize) -> Self {
        Self {
            sgr: params.mu(),
            params: Some(params),
            r2,
            status: FitStatus::Accepted,
            trials_converged,
        }
    }
}

/// The three growth signals, in GrowthStatus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Endpoint,
    Auc,
    Sgr,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Endpoint, Signal::Auc, Signal::Sgr];

    pub fn label(self) -> &'static str {
        match self {
            Signal::Endpoint => "FinalOD",
            Signal::Auc => "AUC",
            Signal::Sgr => "SGR",
        }
    }
}

/// Per-replicate metrics for one WellKey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellMetrics {
    pub replicate: ReplicateId,
    pub endpoint_od: f64,
    pub auc: f64,
    pub fit: FitResult,
}

impl WellMetrics {
    pub fn sgr(&self) -> f64 {
        self.fit.sgr
    }

    pub fn r2(&self) -> f64 {
        self.fit.r2
    }

    /// Value of one signal; `None` when it is NaN (rejected fit).
    pub fn value(&self, signal: Signal) -> Option<f64> {
        let v = match signal {
            Signal::Endpoint => self.endpoint_od,
            Signal::Auc => self.auc,
            Signal::Sgr => self.fit.sgr,
        };
        if v.is_nan() { None } else { Some(v) }
    }
}

/// Cross-replicate statistics of one signal for one WellKey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedMetric {
    pub signal: Signal,
    /// Replicate indices of `values`, in the same order.
    pub replicates: Vec<ReplicateId>,
    /// Retained per-replicate values (NaN SGRs excluded).
    pub values: Vec<f64>,
    pub mean: Option<f64>,
    /// Number of replicate indices with a value on both well and control.
    pub n_pairs: usize,
    pub mean_fold_change: Option<f64>,
    pub p_value: Option<f64>,
}

/// Growth call for a single signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrowthCall {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
}

impl GrowthCall {
    pub fn as_char(self) -> char {
        match self {
            GrowthCall::Plus => '+',
            GrowthCall::Minus => '-',
        }
    }
}

/// Combined call in fixed order (Endpoint, AUC, SGR), rendered as e.g. `"+-+"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct GrowthStatus {
    pub endpoint: GrowthCall,
    pub auc: GrowthCall,
    pub sgr: GrowthCall,
}

impl GrowthStatus {
    pub fn calls(&self) -> [GrowthCall; 3] {
        [self.endpoint, self.auc, self.sgr]
    }

    /// True when at least one signal is `+`.
    pub fn has_growth(&self) -> bool {
        self.calls().contains(&GrowthCall::Plus)
    }
}

impl fmt::Display for GrowthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for call in self.calls() {
            write!(f, "{}", call.as_char())?;
        }
        Ok(())
    }
}

impl From<GrowthStatus> for String {
    fn from(value: GrowthStatus) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for GrowthStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let parse = |c: char| match c {
            '+' => Ok(GrowthCall::Plus),
            '-' => Ok(GrowthCall::Minus),
            other => Err(format!("invalid growth call '{other}' in '{value}'")),
        };
        let chars: Vec<char> = value.chars().collect();
        let &[e, a, s] = chars.as_slice() else {
            return Err(format!("growth status must have 3 calls, got '{value}'"));
        };
        Ok(GrowthStatus {
            endpoint: parse(e)?,
            auc: parse(a)?,
            sgr: parse(s)?,
        })
    }
}

/// Whether a WellKey is a negative control or a scored well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellRole {
    Control,
    Test,
}

/// Full metric/statistics bundle for one WellKey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellReport {
    pub key: WellKey,
    pub metabolite: Option<String>,
    pub role: WellRole,
    /// Elapsed time at which endpoint OD was read for every replicate.
    pub last_common_time: f64,
    pub replicates: Vec<WellMetrics>,
    pub endpoint: AggregatedMetric,
    pub auc: AggregatedMetric,
    pub sgr: AggregatedMetric,
    /// `None` for negative controls, which are reported but never classified.
    pub status: Option<GrowthStatus>,
}

impl WellReport {
    pub fn metric(&self, signal: Signal) -> &AggregatedMetric {
        match signal {
            Signal::Endpoint => &self.endpoint,
            Signal::Auc => &self.auc,
            Signal::Sgr => &self.sgr,
        }
    }

    /// Metabolite label if known, else the well coordinate.
    pub fn label(&self) -> &str {
        self.metabolite.as_deref().unwrap_or(self.key.well.as_str())
    }
}

/// A WellKey that could not be scored, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnscoredWell {
    pub key: WellKey,
    pub reason: String,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub config: ScoreConfig,
    pub wells: Vec<WellReport>,
    pub unscored: Vec<UnscoredWell>,
}

/// A full run's configuration.
///
/// Derived from CLI flags (plus defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub growth_model: GrowthModel,
    /// Minimum R² for accepting a growth curve fit.
    pub min_r2: f64,
    /// Randomized initial guesses tried per series.
    pub max_trials: usize,
    /// Levenberg–Marquardt iteration cap per trial.
    pub max_iterations: usize,
    /// Minimum mean fold change for a `+` call.
    pub fc_cutoff: f64,
    /// A `+` call requires `p < pvalue_cutoff`.
    pub pvalue_cutoff: f64,
    /// Run seed for initial-guess sampling.
    pub seed: u64,
    /// Negative-control well on every plate/strain group.
    pub control_well: WellId,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            growth_model: GrowthModel::Logistic,
            min_r2: 0.90,
            max_trials: 50,
            max_iterations: 200,
            fc_cutoff: 1.2,
            pvalue_cutoff: 0.05,
            seed: 42,
            control_well: WellId::new("A1"),
        }
    }
}

impl ScoreConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.min_r2 > 0.0 && self.min_r2 <= 1.0) {
            return Err(AppError::new(
                2,
                format!("Invalid min_r2 {} (must be in (0, 1]).", self.min_r2),
            ));
        }
        if self.max_trials == 0 {
            return Err(AppError::new(2, "max_trials must be >= 1."));
        }
        if self.max_iterations == 0 {
            return Err(AppError::new(2, "max_iterations must be >= 1."));
        }
        if !(self.fc_cutoff.is_finite() && self.fc_cutoff >= 0.0) {
            return Err(AppError::new(
                2,
                format!("Invalid fc_cutoff {} (must be finite and >= 0).", self.fc_cutoff),
            ));
        }
        if !(self.pvalue_cutoff > 0.0 && self.pvalue_cutoff <= 1.0) {
            return Err(AppError::new(
                2,
                format!("Invalid pvalue_cutoff {} (must be in (0, 1]).", self.pvalue_cutoff),
            ));
        }
        if self.control_well.as_str().is_empty() {
            return Err(AppError::new(2, "control_well must not be empty."));
        }
        Ok(())
    }
}
