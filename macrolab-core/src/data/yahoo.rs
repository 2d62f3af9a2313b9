//! Yahoo Finance chart adapter.
//!
//! Fetches daily OHLCV from Yahoo's v8 chart API: a `timestamp` array with
//! parallel `open/high/low/close/volume` arrays where `null` means no value.
//! Timestamps are shifted by `meta.gmtoffset` so each bar lands on its
//! exchange-local trading day.
//!
//! Yahoo has no official API and is subject to unannounced format changes.

use super::http::{HttpFetcher, HttpSettings};
use super::provider::{RawDate, RawRecord, RawSeries, RawValue, SourceAdapter, SourceError};
use crate::domain::DateRange;
use crate::normalize::{FieldMap, Normalizer, SentinelTable};
use reqwest::StatusCode;
use serde::Deserialize;

pub const SOURCE_NAME: &str = "yahoo_chart";
pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

const PROVIDER_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooChartSource {
    http: HttpFetcher,
    base_url: String,
}

impl YahooChartSource {
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(settings: &HttpSettings, base_url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: HttpFetcher::new(settings)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the chart API URL. `period2` is the exclusive range end at midnight UTC.
    pub fn chart_url(&self, symbol: &str, range: DateRange) -> String {
        let start_ts = range.start().and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        let end_ts = range.end().and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        format!(
            "{}/{symbol}?period1={}&period2={}&interval=1d&includeAdjustedClose=true",
            self.base_url,
            start_ts.unwrap_or_default(),
            end_ts.unwrap_or_default(),
        )
    }
}

/// Parse a chart payload into raw records, keeping only days inside `range`.
pub fn parse_chart(symbol: &str, body: &str, range: DateRange) -> Result<RawSeries, SourceError> {
    let resp: ChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(SOURCE_NAME, symbol, e.to_string()))?;

    let result = match resp.chart.result {
        Some(result) => result,
        None => {
            return Err(match resp.chart.error {
                Some(err) if err.code == "Not Found" => SourceError::empty(SOURCE_NAME, symbol),
                Some(err) => SourceError::unavailable(
                    SOURCE_NAME,
                    symbol,
                    format!("{}: {}", err.code, err.description),
                ),
                None => SourceError::malformed(SOURCE_NAME, symbol, "empty result with no error"),
            })
        }
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::empty(SOURCE_NAME, symbol))?;

    // A range with no trading days comes back without a timestamp array.
    let timestamps = data.timestamp.unwrap_or_default();
    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let columns = [&quote.open, &quote.high, &quote.low, &quote.close, &quote.volume];

    let mut records = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| {
                SourceError::malformed(SOURCE_NAME, symbol, format!("invalid timestamp: {ts}"))
            })?;
        if !range.contains(date) {
            continue;
        }

        let values: Vec<Option<f64>> = columns
            .iter()
            .map(|col| col.get(i).copied().flatten())
            .collect();

        // Holidays come back as all-null rows.
        if values.iter().all(Option::is_none) {
            continue;
        }

        records.push(RawRecord {
            date: RawDate::Day(date),
            values: values.into_iter().map(RawValue::from).collect(),
        });
    }

    if records.is_empty() {
        return Err(SourceError::empty(SOURCE_NAME, symbol));
    }

    Ok(RawSeries {
        key: symbol.to_string(),
        source: SOURCE_NAME.to_string(),
        fields: PROVIDER_FIELDS.iter().map(|f| f.to_string()).collect(),
        records,
    })
}

/// Field renames for chart payloads. Nulls are the only "no data" marker.
pub fn chart_normalizer() -> Normalizer {
    Normalizer::new(
        FieldMap::new([
            ("open", "Open"),
            ("high", "High"),
            ("low", "Low"),
            ("close", "Close"),
            ("volume", "Volume"),
        ]),
        SentinelTable::new(["null"]),
    )
}

impl SourceAdapter for YahooChartSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch(&self, key: &str, range: DateRange) -> Result<RawSeries, SourceError> {
        let url = self.chart_url(key, range);
        // Unknown and delisted symbols come back as 404 with a chart error body.
        let body = self
            .http
            .get_text_accepting(SOURCE_NAME, key, &url, &[StatusCode::NOT_FOUND])?;
        parse_chart(key, &body, range)
    }

    fn normalizer(&self) -> Normalizer {
        chart_normalizer()
    }
}
