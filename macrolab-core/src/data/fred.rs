//! FRED CSV adapter.
//!
//! Downloads `fredgraph.csv` for one series id: a header row followed by
//! `(date, value)` pairs. FRED marks missing observations with a literal `.`.

use super::http::{HttpFetcher, HttpSettings};
use super::provider::{RawDate, RawRecord, RawSeries, RawValue, SourceAdapter, SourceError};
use crate::domain::DateRange;
use crate::normalize::{FieldMap, Normalizer, SentinelTable};
use crate::table::DATE_FORMAT;
use chrono::NaiveDate;

pub const SOURCE_NAME: &str = "fred";
pub const DEFAULT_BASE_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";

/// FRED's placeholder for "no observation".
pub const MISSING_SENTINEL: &str = ".";

pub struct FredSource {
    http: HttpFetcher,
    base_url: String,
}

impl FredSource {
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(settings: &HttpSettings, base_url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: HttpFetcher::new(settings)?,
            base_url: base_url.to_string(),
        })
    }

    /// `cosd`/`coed` are inclusive on FRED's side, so the end is the range's last day.
    pub fn csv_url(&self, series_id: &str, range: DateRange) -> String {
        format!(
            "{}?id={series_id}&cosd={}&coed={}",
            self.base_url,
            range.start().format(DATE_FORMAT),
            range.last_day().format(DATE_FORMAT),
        )
    }
}

/// Parse a FRED CSV body. Column one is the date, column two the value.
///
/// Dates that parse but fall outside `range` are dropped; dates that do not
/// parse are passed through as text for the normalizer to report.
pub fn parse_fred_csv(
    series_id: &str,
    body: &str,
    range: DateRange,
) -> Result<RawSeries, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::malformed(SOURCE_NAME, series_id, e.to_string()))?;
    if headers.len() < 2 {
        return Err(SourceError::malformed(
            SOURCE_NAME,
            series_id,
            format!(
                "expected a date and a value column, got header {:?}",
                headers.iter().collect::<Vec<_>>()
            ),
        ));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| SourceError::malformed(SOURCE_NAME, series_id, e.to_string()))?;
        let date_text = row.get(0).unwrap_or_default();
        let value_text = row.get(1).unwrap_or_default();

        let date = match NaiveDate::parse_from_str(date_text, DATE_FORMAT) {
            Ok(d) if range.contains(d) => RawDate::Day(d),
            Ok(_) => continue,
            Err(_) => RawDate::Text(date_text.to_string()),
        };

        records.push(RawRecord {
            date,
            values: vec![RawValue::Text(value_text.to_string())],
        });
    }

    if records.is_empty() {
        return Err(SourceError::empty(SOURCE_NAME, series_id));
    }

    Ok(RawSeries {
        key: series_id.to_string(),
        source: SOURCE_NAME.to_string(),
        fields: vec!["value".into()],
        records,
    })
}

pub fn fred_normalizer() -> Normalizer {
    Normalizer::new(
        FieldMap::new([("value", "Value")]),
        SentinelTable::new([MISSING_SENTINEL]),
    )
}

impl SourceAdapter for FredSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch(&self, key: &str, range: DateRange) -> Result<RawSeries, SourceError> {
        let url = self.csv_url(key, range);
        let body = self.http.get_text(SOURCE_NAME, key, &url)?;
        parse_fred_csv(key, &body, range)
    }

    fn normalizer(&self) -> Normalizer {
        fred_normalizer()
    }
}
