//! Integration tests for the fetch jobs.
//!
//! Mock adapters stand in for the chart and FRED endpoints, so nothing here
//! touches the network. Every test writes into its own temp directory.

use chrono::{Duration, NaiveDate};
use macrolab_core::data::fred::fred_normalizer;
use macrolab_core::data::yahoo::chart_normalizer;
use macrolab_core::data::{
    CompiledSource, NoProgress, RawDate, RawRecord, RawSeries, RawValue, SourceAdapter,
    SourceError,
};
use macrolab_core::{read_table, Category, Cell, CsvPersister, DateRange, Normalizer, SeriesMeta};
use macrolab_runner::catalog::MacroSplit;
use macrolab_runner::{run_job, run_jobs, FetchOptions, JobContext, JobKind, Manifest, Sources};
use std::path::Path;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn range() -> DateRange {
    DateRange::new(d("2020-01-01"), d("2021-01-01")).unwrap()
}

// ── Mock adapters ────────────────────────────────────────────────────

/// OHLCV bars: `days` consecutive days from 2020-01-02, close rising by 1 from `base`.
/// Keys starting with `BAD` fail; `GAP` skips its second day.
struct MockChart {
    days: i64,
}

impl SourceAdapter for MockChart {
    fn name(&self) -> &str {
        "mock_chart"
    }

    fn fetch(&self, key: &str, _range: DateRange) -> Result<RawSeries, SourceError> {
        if key.starts_with("BAD") {
            return Err(SourceError::unavailable("mock_chart", key, "HTTP 503"));
        }
        let base = if key == "GC=F" { 1500.0 } else { 100.0 };
        let records = (0..self.days)
            .filter(|i| !(key.starts_with("GAP") && *i == 1))
            .map(|i| {
                let close = base + i as f64;
                RawRecord {
                    date: RawDate::Day(d("2020-01-02") + Duration::days(i)),
                    values: vec![
                        RawValue::Number(close - 0.5),
                        RawValue::Number(close + 1.0),
                        RawValue::Number(close - 1.0),
                        RawValue::Number(close),
                        RawValue::Number(1000.0),
                    ],
                }
            })
            .collect();
        Ok(RawSeries {
            key: key.into(),
            source: "mock_chart".into(),
            fields: ["open", "high", "low", "close", "volume"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
            records,
        })
    }

    fn normalizer(&self) -> Normalizer {
        chart_normalizer()
    }
}

/// Date/value text rows with FRED's "." sentinel.
struct MockFred;

impl SourceAdapter for MockFred {
    fn name(&self) -> &str {
        "mock_fred"
    }

    fn fetch(&self, key: &str, _range: DateRange) -> Result<RawSeries, SourceError> {
        let rows: &[(&str, &str)] = match key {
            "DGS10" => &[("2020-01-02", "1.88"), ("2020-01-03", "."), ("2020-01-06", "1.81")],
            "DGS2" => &[("2020-01-02", "1.58"), ("2020-01-03", "1.53")],
            "CPIAUCSL" => &[("2020-01-01", "259.1"), ("2020-02-01", "259.2")],
            _ => return Err(SourceError::empty("mock_fred", key)),
        };
        Ok(RawSeries {
            key: key.into(),
            source: "mock_fred".into(),
            fields: vec!["value".into()],
            records: rows
                .iter()
                .map(|(date, v)| RawRecord {
                    date: RawDate::Text(date.to_string()),
                    values: vec![RawValue::Text(v.to_string())],
                })
                .collect(),
        })
    }

    fn normalizer(&self) -> Normalizer {
        fred_normalizer()
    }
}

fn metas(category: Category, keys: &[&str]) -> Vec<SeriesMeta> {
    keys.iter()
        .map(|k| SeriesMeta::new(*k, format!("{k} name"), category))
        .collect()
}

fn context(dir: &Path) -> JobContext<'static> {
    JobContext {
        range: range(),
        fetch: FetchOptions {
            pace: std::time::Duration::ZERO,
            max_concurrent: 1,
        },
        persister: CsvPersister::new(dir),
        progress: &NoProgress,
        etf: metas(Category::EquityEtf, &["SPY", "BAD1", "GAP"]),
        commodity: metas(Category::Commodity, &["CL=F", "GC=F"]),
        macro_series: metas(Category::Rate, &["DGS10", "DGS2", "CPIAUCSL", "MISSING"]),
        macro_split: vec![
            MacroSplit::new("interest_rate_data.csv", &["DGS2", "DGS10", "T10Y2Y"]),
            MacroSplit::new("cpi_data.csv", &["CPIAUCSL"]),
            MacroSplit::new("nothing.csv", &["NAPM"]),
        ],
    }
}

fn header(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

// ── ETF ──────────────────────────────────────────────────────────────

#[test]
fn etf_job_writes_long_pivot_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    let chart = MockChart { days: 3 };
    let sources = Sources { chart: &chart, fred: &MockFred, compiled: &CompiledSource };

    let report = run_job(JobKind::Etf, &ctx, sources).unwrap();
    assert_eq!(report.fetched, 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].starts_with("BAD1:"));

    let long_path = dir.path().join("etf_data_all.csv");
    assert_eq!(
        header(&long_path),
        "Date,Open,High,Low,Close,Volume,ETF_Name,Symbol,Dollar_Volume,Price_Change,Volume_Change"
    );
    let long = read_table(&long_path).unwrap();
    // GAP has 2 rows, SPY 3; series are concatenated by key.
    assert_eq!(long.len(), 5);
    assert_eq!(long.rows()[0].cells[6], Some(Cell::text("GAP")));
    assert_eq!(long.rows()[2].cells[6], Some(Cell::text("SPY")));

    let pivot_path = dir.path().join("etf_pivot_data.csv");
    assert_eq!(
        header(&pivot_path),
        "Date,Close_GAP,Close_SPY,Volume_GAP,Volume_SPY,Dollar_Volume_GAP,Dollar_Volume_SPY"
    );
    let pivot = read_table(&pivot_path).unwrap();
    assert_eq!(pivot.len(), 3);
    // GAP has no bar on 2020-01-03: absent, not zero.
    assert_eq!(pivot.rows()[1].date, d("2020-01-03"));
    assert_eq!(pivot.rows()[1].cells[0], None);
    assert_eq!(pivot.rows()[1].cells[1], Some(Cell::Number(101.0)));

    let summary = std::fs::read_to_string(dir.path().join("etf_summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 3);
    assert!(summary.lines().next().unwrap().starts_with("Symbol,Name,Data_Points"));
    assert_eq!(report.summaries.len(), 2);
    let spy_return = report.summaries[1].total_return_pct.unwrap();
    assert!((spy_return - 2.0).abs() < 1e-9);
}

// ── Commodities ──────────────────────────────────────────────────────

#[test]
fn commodity_job_writes_per_contract_files() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    let chart = MockChart { days: 4 };
    let sources = Sources { chart: &chart, fred: &MockFred, compiled: &CompiledSource };

    let report = run_job(JobKind::Commodities, &ctx, sources).unwrap();
    assert_eq!(report.fetched, 2);

    assert_eq!(
        header(&dir.path().join("commodity_futures_all.csv")),
        "Date,Open,High,Low,Close,Volume,Commodity,Symbol"
    );
    let gold = read_table(&dir.path().join("gc_futures.csv")).unwrap();
    assert_eq!(gold.len(), 4);
    assert_eq!(gold.rows()[0].cells[3], Some(Cell::Number(1500.0)));
    assert_eq!(gold.rows()[0].cells[5], Some(Cell::text("GC=F name")));
    assert!(dir.path().join("cl_futures.csv").exists());
    assert!(dir.path().join("commodity_summary.csv").exists());
}

// ── Macro ────────────────────────────────────────────────────────────

#[test]
fn macro_job_merges_and_splits() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    let chart = MockChart { days: 1 };
    let sources = Sources { chart: &chart, fred: &MockFred, compiled: &CompiledSource };

    let report = run_job(JobKind::Macro, &ctx, sources).unwrap();
    assert_eq!(report.fetched, 3);
    assert_eq!(report.failed.len(), 1);

    let merged = read_table(&dir.path().join("macro_data_all.csv")).unwrap();
    assert_eq!(merged.columns(), ["CPIAUCSL", "DGS10", "DGS2"]);
    // 2020-01-01, 01-02, 01-03, 01-06, 02-01
    assert_eq!(merged.len(), 5);
    let dgs10 = merged.column("DGS10").unwrap();
    assert_eq!(dgs10[2], None, "FRED '.' must stay absent");

    let rates = read_table(&dir.path().join("interest_rate_data.csv")).unwrap();
    assert_eq!(rates.columns(), ["DGS2", "DGS10"]);
    // Rows with no rate at all (the CPI-only dates) are dropped.
    let dates: Vec<_> = rates.dates().collect();
    assert_eq!(dates, vec![d("2020-01-02"), d("2020-01-03"), d("2020-01-06")]);

    let cpi = read_table(&dir.path().join("cpi_data.csv")).unwrap();
    assert_eq!(cpi.len(), 2);
    assert!(!dir.path().join("nothing.csv").exists());

    let summary = std::fs::read_to_string(dir.path().join("macro_summary.csv")).unwrap();
    let dgs10_line = summary.lines().find(|l| l.starts_with("DGS10,")).unwrap();
    // Two present values out of three dates.
    assert!(dgs10_line.contains(",2,2020-01-02,2020-01-06,"));
}

// ── PMI ──────────────────────────────────────────────────────────────

#[test]
fn pmi_job_labels_expansion_and_contraction() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    let chart = MockChart { days: 1 };
    let sources = Sources { chart: &chart, fred: &MockFred, compiled: &CompiledSource };

    let report = run_job(JobKind::Pmi, &ctx, sources).unwrap();
    let counts = report.pmi.unwrap();
    assert_eq!(counts.expansion + counts.contraction, 12);

    let path = dir.path().join("ism_pmi_data.csv");
    assert_eq!(header(&path), "Date,ISM_Manufacturing_PMI,PMI_Status");
    let table = read_table(&path).unwrap();
    assert_eq!(table.len(), 12);
    for row in table.rows() {
        let pmi = row.cells[0].as_ref().and_then(Cell::as_number).unwrap();
        let status = row.cells[1].as_ref().and_then(Cell::as_text).unwrap();
        assert_eq!(status == "Expansion", pmi >= 50.0);
    }
}

// ── Whole run ────────────────────────────────────────────────────────

#[test]
fn all_jobs_fill_one_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(dir.path());
    let chart = MockChart { days: 3 };
    let sources = Sources { chart: &chart, fred: &MockFred, compiled: &CompiledSource };

    let reports = run_jobs(&JobKind::ALL, &ctx, sources).unwrap();
    assert_eq!(reports.len(), 4);

    let manifest = Manifest::load(dir.path()).unwrap();
    let written: usize = reports.iter().map(|r| r.files.len()).sum();
    assert_eq!(manifest.files.len(), written);
    let entry = &manifest.files["etf_pivot_data.csv"];
    assert_eq!(entry.job, "etf");
    assert_eq!(entry.rows, 3);
    assert_eq!(entry.columns[0], "Date");

    // Re-running one job replaces its entries and keeps the rest.
    run_jobs(&[JobKind::Pmi], &ctx, sources).unwrap();
    assert_eq!(Manifest::load(dir.path()).unwrap().files.len(), written);
}

#[test]
fn pooled_run_writes_identical_files() {
    let seq_dir = tempfile::tempdir().unwrap();
    let par_dir = tempfile::tempdir().unwrap();
    let chart = MockChart { days: 5 };
    let sources = Sources { chart: &chart, fred: &MockFred, compiled: &CompiledSource };

    run_job(JobKind::Etf, &context(seq_dir.path()), sources).unwrap();
    let mut par_ctx = context(par_dir.path());
    par_ctx.fetch.max_concurrent = 3;
    run_job(JobKind::Etf, &par_ctx, sources).unwrap();

    for file in ["etf_data_all.csv", "etf_pivot_data.csv", "etf_summary.csv"] {
        let a = std::fs::read(seq_dir.path().join(file)).unwrap();
        let b = std::fs::read(par_dir.path().join(file)).unwrap();
        assert_eq!(a, b, "{file} differs between sequential and pooled runs");
    }
}

#[test]
fn nothing_fetched_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(dir.path());
    ctx.etf = metas(Category::EquityEtf, &["BAD1", "BAD2"]);
    let chart = MockChart { days: 3 };
    let sources = Sources { chart: &chart, fred: &MockFred, compiled: &CompiledSource };

    let report = run_job(JobKind::Etf, &ctx, sources).unwrap();
    assert_eq!(report.fetched, 0);
    assert!(report.files.is_empty());
    assert!(!dir.path().join("etf_data_all.csv").exists());
}

#[test]
fn unwritable_output_dir_is_a_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let ctx = context(&blocker.join("out"));
    let chart = MockChart { days: 3 };
    let sources = Sources { chart: &chart, fred: &MockFred, compiled: &CompiledSource };

    let err = run_job(JobKind::Etf, &ctx, sources).unwrap_err();
    assert!(err.is_write_error(), "unexpected error: {err}");
}
