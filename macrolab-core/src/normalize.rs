//! Normalizer: raw provider records → canonical `Series`.
//!
//! Each source adapter hands out a `Normalizer` configured with its own
//! `FieldMap` (provider field → canonical column) and `SentinelTable`
//! (placeholder strings meaning "no data"). Adding a provider never touches
//! this module.
//!
//! Guarantees on the output series:
//! - fields are the field map's canonical names, in map order
//! - dates strictly ascending, one observation per date (last write wins)
//! - a value that cannot be coerced is absent, never zero, and is reported
//!   as a `RecordWarning`

use crate::data::provider::{RawDate, RawSeries, RawValue, SourceError};
use crate::domain::{Observation, Series, SeriesMeta};
use crate::table::DATE_FORMAT;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Provider placeholder strings that mean "no data".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentinelTable {
    sentinels: BTreeSet<String>,
}

impl SentinelTable {
    pub fn new<I, S>(sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sentinels: sentinels.into_iter().map(Into::into).collect(),
        }
    }

    /// Empty text counts as missing for every provider.
    pub fn is_missing(&self, text: &str) -> bool {
        let trimmed = text.trim();
        trimmed.is_empty() || self.sentinels.contains(trimmed)
    }
}

/// Ordered mapping from provider field names to canonical column names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    pub fn new<I, A, B>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(a, b)| (a.into(), b.into()))
                .collect(),
        }
    }

    pub fn canonical_fields(&self) -> Vec<String> {
        self.entries.iter().map(|(_, c)| c.clone()).collect()
    }
}

/// A single value or row that could not be coerced (the `MalformedRecord` case).
///
/// Never fatal: the value becomes absent, or the undatable row is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordWarning {
    pub key: String,
    pub date: Option<NaiveDate>,
    pub field: Option<String>,
    pub raw: String,
}

impl fmt::Display for RecordWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.date, &self.field) {
            (Some(date), Some(field)) => write!(
                f,
                "{}: unparseable value '{}' in {field} on {date}, treated as missing",
                self.key, self.raw
            ),
            _ => write!(f, "{}: unparseable date '{}', row dropped", self.key, self.raw),
        }
    }
}

/// Normalized series plus the malformed-record warnings raised on the way.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub series: Series,
    pub warnings: Vec<RecordWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    fields: FieldMap,
    sentinels: SentinelTable,
}

impl Normalizer {
    pub fn new(fields: FieldMap, sentinels: SentinelTable) -> Self {
        Self { fields, sentinels }
    }

    pub fn normalize(&self, meta: SeriesMeta, raw: RawSeries) -> Result<Normalized, SourceError> {
        // For each canonical field, where it lives in the raw record (if anywhere).
        let positions: Vec<Option<usize>> = self
            .fields
            .entries
            .iter()
            .map(|(provider, _)| raw.fields.iter().position(|f| f == provider))
            .collect();

        let mut warnings = Vec::new();
        let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();

        for record in raw.records {
            let date = match record.date {
                RawDate::Day(d) => d,
                RawDate::Text(text) => match parse_date(&text) {
                    Some(d) => d,
                    None => {
                        warnings.push(RecordWarning {
                            key: meta.key.clone(),
                            date: None,
                            field: None,
                            raw: text,
                        });
                        continue;
                    }
                },
            };

            let values = positions
                .iter()
                .zip(&self.fields.entries)
                .map(|(pos, (_, canonical))| {
                    let raw_value = pos.and_then(|i| record.values.get(i));
                    match raw_value {
                        None => None,
                        Some(v) => match self.coerce(v) {
                            Ok(x) => x,
                            Err(text) => {
                                warnings.push(RecordWarning {
                                    key: meta.key.clone(),
                                    date: Some(date),
                                    field: Some(canonical.clone()),
                                    raw: text,
                                });
                                None
                            }
                        },
                    }
                })
                .collect();

            // Later records overwrite earlier ones on the same date.
            by_date.insert(date, values);
        }

        for w in &warnings {
            tracing::warn!("{w}");
        }

        if by_date.is_empty() {
            return Err(SourceError::empty(&raw.source, &meta.key));
        }

        let observations = by_date
            .into_iter()
            .map(|(date, values)| Observation::new(date, values))
            .collect();
        let series = Series::new(meta, self.fields.canonical_fields(), observations)?;

        Ok(Normalized { series, warnings })
    }

    /// `Ok(None)` for missing, `Err(raw text)` for an uncoercible value.
    fn coerce(&self, value: &RawValue) -> Result<Option<f64>, String> {
        match value {
            RawValue::Null => Ok(None),
            RawValue::Number(x) if x.is_finite() => Ok(Some(*x)),
            RawValue::Number(x) => Err(x.to_string()),
            RawValue::Text(text) => {
                if self.sentinels.is_missing(text) {
                    return Ok(None);
                }
                match text.trim().parse::<f64>() {
                    Ok(x) if x.is_finite() => Ok(Some(x)),
                    _ => Err(text.clone()),
                }
            }
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::RawRecord;
    use crate::domain::Category;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn fred_normalizer() -> Normalizer {
        Normalizer::new(FieldMap::new([("value", "Value")]), SentinelTable::new(["."]))
    }

    fn meta() -> SeriesMeta {
        SeriesMeta::new("DGS10", "10-Year Treasury", Category::Rate)
    }

    fn text_record(date: &str, value: &str) -> RawRecord {
        RawRecord {
            date: RawDate::Text(date.into()),
            values: vec![RawValue::Text(value.into())],
        }
    }

    fn raw(records: Vec<RawRecord>) -> RawSeries {
        RawSeries {
            key: "DGS10".into(),
            source: "fred".into(),
            fields: vec!["value".into()],
            records,
        }
    }

    #[test]
    fn sentinel_becomes_absent_not_zero() {
        let out = fred_normalizer()
            .normalize(
                meta(),
                raw(vec![text_record("2020-01-01", "."), text_record("2020-01-02", "1.88")]),
            )
            .unwrap();

        let values = out.series.column("Value").unwrap();
        assert_eq!(values, vec![None, Some(1.88)]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn legitimate_zero_is_kept() {
        let out = fred_normalizer()
            .normalize(meta(), raw(vec![text_record("2020-01-01", "0")]))
            .unwrap();
        assert_eq!(out.series.column("Value").unwrap(), vec![Some(0.0)]);
    }

    #[test]
    fn garbage_value_is_missing_with_warning() {
        let out = fred_normalizer()
            .normalize(
                meta(),
                raw(vec![text_record("2020-01-01", "n/a"), text_record("2020-01-02", "2.0")]),
            )
            .unwrap();

        assert_eq!(out.series.len(), 2);
        assert_eq!(out.series.column("Value").unwrap(), vec![None, Some(2.0)]);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].field.as_deref(), Some("Value"));
        assert_eq!(out.warnings[0].date, Some(d("2020-01-01")));
    }

    #[test]
    fn undatable_row_is_dropped_with_warning() {
        let out = fred_normalizer()
            .normalize(
                meta(),
                raw(vec![text_record("not-a-date", "1.0"), text_record("2020-01-02", "2.0")]),
            )
            .unwrap();
        assert_eq!(out.series.len(), 1);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].to_string().contains("row dropped"));
    }

    #[test]
    fn sorts_and_dedupes_last_write_wins() {
        let out = fred_normalizer()
            .normalize(
                meta(),
                raw(vec![
                    text_record("2020-01-03", "3.0"),
                    text_record("2020-01-01", "1.0"),
                    text_record("2020-01-03", "3.5"),
                ]),
            )
            .unwrap();

        let dates: Vec<_> = out.series.observations().iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d("2020-01-01"), d("2020-01-03")]);
        assert_eq!(out.series.column("Value").unwrap(), vec![Some(1.0), Some(3.5)]);
    }

    #[test]
    fn missing_provider_field_is_absent_everywhere() {
        let normalizer = Normalizer::new(
            FieldMap::new([("close", "Close"), ("volume", "Volume")]),
            SentinelTable::default(),
        );
        let raw = RawSeries {
            key: "SPY".into(),
            source: "yahoo".into(),
            fields: vec!["close".into()],
            records: vec![RawRecord {
                date: RawDate::Day(d("2020-01-02")),
                values: vec![RawValue::Number(321.0)],
            }],
        };
        let out = normalizer
            .normalize(SeriesMeta::new("SPY", "SPY", Category::EquityEtf), raw)
            .unwrap();
        assert_eq!(out.series.fields(), &["Close".to_string(), "Volume".to_string()]);
        assert_eq!(out.series.observations()[0].values, vec![Some(321.0), None]);
    }

    #[test]
    fn null_and_nan_numbers_are_absent() {
        let normalizer =
            Normalizer::new(FieldMap::new([("close", "Close")]), SentinelTable::default());
        let raw = RawSeries {
            key: "SPY".into(),
            source: "yahoo".into(),
            fields: vec!["close".into()],
            records: vec![
                RawRecord {
                    date: RawDate::Day(d("2020-01-02")),
                    values: vec![RawValue::Null],
                },
                RawRecord {
                    date: RawDate::Day(d("2020-01-03")),
                    values: vec![RawValue::Number(f64::NAN)],
                },
            ],
        };
        let out = normalizer
            .normalize(SeriesMeta::new("SPY", "SPY", Category::EquityEtf), raw)
            .unwrap();
        assert_eq!(out.series.column("Close").unwrap(), vec![None, None]);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn warnings_are_logged_even_when_no_row_survives() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let err = tracing::subscriber::with_default(subscriber, || {
            fred_normalizer()
                .normalize(meta(), raw(vec![text_record("01/02/2020", "1.0")]))
                .unwrap_err()
        });

        assert!(matches!(err, SourceError::EmptySeries { .. }));
        let text = logs.text();
        assert!(text.contains("WARN"), "{text}");
        assert!(text.contains("unparseable date '01/02/2020'"), "{text}");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn no_records_is_empty_series() {
        let err = fred_normalizer().normalize(meta(), raw(vec![])).unwrap_err();
        assert!(matches!(err, SourceError::EmptySeries { .. }));
    }
}
