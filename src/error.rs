use thiserror::Error;

use crate::domain::WellKey;

/// Run-level failure carrying the process exit code.
///
/// Exit codes:
/// - `2`: invalid configuration or unreadable input
/// - `3`: no usable data after ingest
/// - `4`: internal / export failure
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Rejected `TimeSeries` construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("time series is empty")]
    Empty,

    #[error("time and OD lengths differ ({times} vs {od})")]
    LengthMismatch { times: usize, od: usize },

    #[error("non-finite value at index {index}")]
    NonFinite { index: usize },

    #[error("negative OD {value} at index {index}")]
    NegativeOd { index: usize, value: f64 },

    #[error("times not strictly increasing at index {index}")]
    NotIncreasing { index: usize },
}

/// A WellKey that could not be scored.
///
/// These never abort a run; they are collected into the report so the output
/// side can flag the well.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("no negative control {control} for {key}")]
    MissingControl { key: WellKey, control: WellKey },

    #[error("no replicate series for {key}")]
    NoReplicates { key: WellKey },
}

impl ScoreError {
    pub fn key(&self) -> &WellKey {
        match self {
            ScoreError::MissingControl { key, .. } => key,
            ScoreError::NoReplicates { key } => key,
        }
    }
}
