//! Source adapter trait, raw record types, and structured fetch errors.
//!
//! The SourceAdapter trait abstracts over data sources (Yahoo chart API, FRED
//! CSV export, compiled datasets) so jobs can swap implementations and mock
//! them in tests. Adapters return raw provider records; the `Normalizer` each
//! adapter supplies turns them into a canonical `Series`.

use crate::domain::{DateRange, SeriesError};
use crate::normalize::Normalizer;
use chrono::NaiveDate;
use thiserror::Error;

/// A field value exactly as the provider delivered it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// JSON null or an otherwise explicit "nothing".
    Null,
    Number(f64),
    Text(String),
}

impl From<Option<f64>> for RawValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(RawValue::Null, RawValue::Number)
    }
}

/// A record date, parsed by the adapter when it could be.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDate {
    Day(NaiveDate),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: RawDate,
    /// Parallel to `RawSeries::fields`.
    pub values: Vec<RawValue>,
}

/// Provider response for one series key, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub key: String,
    pub source: String,
    /// Provider field names, e.g. `close` or `value`.
    pub fields: Vec<String>,
    pub records: Vec<RawRecord>,
}

/// Structured errors for a single-series fetch.
///
/// Every variant is per-series: jobs log it, drop the series, and continue.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name} unavailable for '{key}': {reason}")]
    SourceUnavailable {
        source_name: String,
        key: String,
        reason: String,
    },

    #[error("{source_name} returned no data for '{key}'")]
    EmptySeries { source_name: String, key: String },

    #[error("{source_name} response for '{key}' has an unexpected shape: {reason}")]
    MalformedResponse {
        source_name: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

impl SourceError {
    pub fn unavailable(source: &str, key: &str, reason: impl Into<String>) -> Self {
        SourceError::SourceUnavailable {
            source_name: source.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn empty(source: &str, key: &str) -> Self {
        SourceError::EmptySeries {
            source_name: source.to_string(),
            key: key.to_string(),
        }
    }

    pub fn malformed(source: &str, key: &str, reason: impl Into<String>) -> Self {
        SourceError::MalformedResponse {
            source_name: source.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Trait for data sources (Yahoo chart API, FRED, compiled datasets).
///
/// One `fetch` issues at most one logical request; pacing between calls is
/// the caller's job.
pub trait SourceAdapter: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch raw records for `key` over the half-open `range`.
    fn fetch(&self, key: &str, range: DateRange) -> Result<RawSeries, SourceError>;

    /// Field renames and sentinels for this source's payloads.
    fn normalizer(&self) -> Normalizer;
}

/// Progress callback for multi-series fetches.
pub trait FetchProgress: Send + Sync {
    fn on_start(&self, key: &str, index: usize, total: usize);

    fn on_complete(
        &self,
        key: &str,
        index: usize,
        total: usize,
        result: Result<usize, &SourceError>,
    );

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, key: &str, index: usize, total: usize) {
        tracing::info!(key, "[{}/{}] fetching", index + 1, total);
    }

    fn on_complete(
        &self,
        key: &str,
        _index: usize,
        _total: usize,
        result: Result<usize, &SourceError>,
    ) {
        match result {
            Ok(rows) => tracing::info!(key, rows, "fetched"),
            Err(e) => tracing::warn!(key, error = %e, "fetch failed, series skipped"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!(succeeded, failed, total, "fetch batch complete");
    }
}

/// Progress reporter that stays silent (tests, library callers).
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn on_start(&self, _key: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _key: &str,
        _index: usize,
        _total: usize,
        _result: Result<usize, &SourceError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
