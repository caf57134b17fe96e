// src/normalize/error.rs

use thiserror::Error;

/// Per-series normalization failures. `row` is the position of the offending
/// record in the response's `data` array, before sorting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("series {series_id}: row {row} has non-numeric value {value:?}")]
    MalformedValue {
        series_id: String,
        row: usize,
        value: String,
    },

    #[error("series {series_id}: row {row} has unsupported period code {period:?}")]
    MalformedPeriod {
        series_id: String,
        row: usize,
        period: String,
    },

    #[error("series {series_id}: row {row} has invalid year {year:?}")]
    MalformedYear {
        series_id: String,
        row: usize,
        year: String,
    },

    #[error("series object #{position} has no seriesID")]
    MissingSeriesId { position: usize },

    #[error("series {series_id} is not present in the response")]
    MissingSeries { series_id: String },
}

impl NormalizeError {
    /// Key under which this error is reported in a `Normalized` result.
    pub fn series_key(&self) -> String {
        match self {
            NormalizeError::MalformedValue { series_id, .. }
            | NormalizeError::MalformedPeriod { series_id, .. }
            | NormalizeError::MalformedYear { series_id, .. }
            | NormalizeError::MissingSeries { series_id } => series_id.clone(),
            NormalizeError::MissingSeriesId { position } => format!("#{}", position),
        }
    }
}
