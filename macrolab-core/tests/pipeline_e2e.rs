//! End-to-end: raw provider records → normalize → merge → persist → reload → summarize.
//!
//! No network; raw series are built in memory the way the adapters would
//! hand them over.

use chrono::NaiveDate;
use macrolab_core::data::{RawDate, RawRecord, RawSeries, RawValue};
use macrolab_core::{
    merge_series, read_table, summarize, Category, Cell, CsvPersister, FieldMap, Normalizer,
    SentinelTable, Series, SeriesMeta,
};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn raw(key: &str, points: &[(&str, &str)]) -> RawSeries {
    RawSeries {
        key: key.into(),
        source: "test".into(),
        fields: vec!["value".into()],
        records: points
            .iter()
            .map(|(date, v)| RawRecord {
                date: RawDate::Text(date.to_string()),
                values: vec![RawValue::Text(v.to_string())],
            })
            .collect(),
    }
}

fn normalize(key: &str, points: &[(&str, &str)]) -> Series {
    let normalizer =
        Normalizer::new(FieldMap::new([("value", "Value")]), SentinelTable::new(["."]));
    normalizer
        .normalize(SeriesMeta::new(key, key, Category::Rate), raw(key, points))
        .unwrap()
        .series
}

fn three_series() -> Vec<Series> {
    vec![
        normalize("A", &[("2020-01-01", "1.0"), ("2020-01-02", "2.0"), ("2020-01-03", "3.0")]),
        normalize("B", &[("2020-01-02", "20.0"), ("2020-01-03", "."), ("2020-01-04", "40.0")]),
        normalize("C", &[("2020-01-01", "0"), ("2020-01-04", "400.0")]),
    ]
}

#[test]
fn three_series_merge_into_four_rows() {
    let merged = merge_series(&three_series(), |s, _| s.key().to_string()).unwrap();

    assert_eq!(merged.columns(), ["A", "B", "C"]);
    let dates: Vec<_> = merged.dates().collect();
    assert_eq!(
        dates,
        vec![d("2020-01-01"), d("2020-01-02"), d("2020-01-03"), d("2020-01-04")]
    );

    let n = |v: f64| Some(Cell::Number(v));
    assert_eq!(merged.rows()[0].cells, vec![n(1.0), None, n(0.0)]);
    assert_eq!(merged.rows()[1].cells, vec![n(2.0), n(20.0), None]);
    // B's sentinel on 01-03 stays absent, not zero.
    assert_eq!(merged.rows()[2].cells, vec![n(3.0), None, None]);
    assert_eq!(merged.rows()[3].cells, vec![None, n(40.0), n(400.0)]);
}

#[test]
fn persisted_merge_reloads_and_summarizes() {
    let dir = tempfile::tempdir().unwrap();
    let persister = CsvPersister::new(dir.path());
    let merged = merge_series(&three_series(), |s, f| format!("{f}_{}", s.key())).unwrap();
    let path = persister.write("rates.csv", &merged).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().next(), Some("Date,Value_A,Value_B,Value_C"));
    assert_eq!(text.lines().nth(3), Some("2020-01-03,3,,"));
    assert!(!text.contains("None"));

    let reloaded = read_table(&path).unwrap();
    assert_eq!(reloaded, merged);

    let a = summarize(&three_series()[0], "Value").unwrap();
    assert_eq!(a.first, Some(1.0));
    assert_eq!(a.last, Some(3.0));
    assert_eq!(a.total_return_pct, Some(200.0));

    // C starts at a real zero: no return, but zero is still the minimum.
    let c = summarize(&three_series()[2], "Value").unwrap();
    assert_eq!(c.min, Some(0.0));
    assert_eq!(c.total_return_pct, None);
}

#[test]
fn malformed_value_is_a_warning_not_a_dropped_row() {
    let normalizer =
        Normalizer::new(FieldMap::new([("value", "Value")]), SentinelTable::new(["."]));
    let out = normalizer
        .normalize(
            SeriesMeta::new("X", "X", Category::Other),
            raw("X", &[("2020-01-01", "abc"), ("2020-01-02", "5")]),
        )
        .unwrap();

    assert_eq!(out.series.len(), 2);
    assert_eq!(out.series.column("Value").unwrap(), vec![None, Some(5.0)]);
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].date, Some(d("2020-01-01")));
}
