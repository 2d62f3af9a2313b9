//! The fetch jobs: ETFs, commodity futures, FRED macro series, compiled ISM PMI.
//!
//! Each job is fetch → normalize → (derive) → merge/concat → persist over one
//! catalog. A failed series is logged and left out; only write failures
//! stop a job.

use crate::catalog::{contract_file_name, MacroSplit};
use crate::config::{ConfigError, PipelineConfig};
use crate::derive::{with_flow_fields, DOLLAR_VOLUME};
use crate::fetch::{fetch_all, FetchOptions, FetchOutcome};
use crate::manifest::{Manifest, ManifestError};
use crate::report::{write_rows, CommoditySummaryRow, EtfSummaryRow, MacroSummaryRow};
use chrono::NaiveDate;
use macrolab_core::data::compiled::ISM_PMI_KEY;
use macrolab_core::data::{FetchProgress, SourceAdapter};
use macrolab_core::summary::UnknownField;
use macrolab_core::{
    merge_series, outer_join, summarize, Category, Cell, CsvPersister, DateRange, PersistError,
    Row, Series, SeriesError, SeriesMeta, SummaryRecord, Table, TableError,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const PMI_COLUMN: &str = "ISM_Manufacturing_PMI";
pub const PMI_STATUS_COLUMN: &str = "PMI_Status";
/// PMI readings at or above this mean expansion.
pub const PMI_EXPANSION_THRESHOLD: f64 = 50.0;

const OHLCV: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];
const PIVOT_FIELDS: [&str; 3] = ["Close", "Volume", DOLLAR_VOLUME];

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("table assembly failed: {0}")]
    Table(#[from] TableError),

    #[error("derived series failed: {0}")]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Summary(#[from] UnknownField),
}

impl JobError {
    /// I/O failures on output files. A manifest that exists but does not
    /// parse is a data error, not a write error.
    pub fn is_write_error(&self) -> bool {
        matches!(
            self,
            JobError::Persist(PersistError::WriteError { .. })
                | JobError::Manifest(ManifestError::Io { .. })
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Etf,
    Commodities,
    Macro,
    Pmi,
}

impl JobKind {
    /// Order used by `all`.
    pub const ALL: [JobKind; 4] = [
        JobKind::Etf,
        JobKind::Commodities,
        JobKind::Macro,
        JobKind::Pmi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Etf => "etf",
            JobKind::Commodities => "commodities",
            JobKind::Macro => "macro",
            JobKind::Pmi => "pmi",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapters the jobs read from. Tests substitute mocks.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    /// OHLCV chart source for ETFs and futures.
    pub chart: &'a dyn SourceAdapter,
    /// Date/value CSV source for macro series.
    pub fred: &'a dyn SourceAdapter,
    pub compiled: &'a dyn SourceAdapter,
}

/// Everything a job needs besides its adapters.
pub struct JobContext<'a> {
    pub range: DateRange,
    pub fetch: FetchOptions,
    pub persister: CsvPersister,
    pub progress: &'a dyn FetchProgress,
    pub etf: Vec<SeriesMeta>,
    pub commodity: Vec<SeriesMeta>,
    pub macro_series: Vec<SeriesMeta>,
    pub macro_split: Vec<MacroSplit>,
}

impl<'a> JobContext<'a> {
    pub fn from_config(
        config: &PipelineConfig,
        today: NaiveDate,
        progress: &'a dyn FetchProgress,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            range: config.date_range(today)?,
            fetch: FetchOptions {
                pace: config.pace(),
                max_concurrent: config.max_concurrent,
            },
            persister: CsvPersister::new(&config.output_dir),
            progress,
            etf: config.etf.clone(),
            commodity: config.commodity.clone(),
            macro_series: config.macro_series.clone(),
            macro_split: config.macro_split.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub file_name: String,
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PmiCounts {
    pub expansion: usize,
    pub contraction: usize,
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: JobKind,
    pub fetched: usize,
    /// `key: reason` for every series left out.
    pub failed: Vec<String>,
    pub warnings: usize,
    pub files: Vec<WrittenFile>,
    pub summaries: Vec<SummaryRecord>,
    pub pmi: Option<PmiCounts>,
}

impl JobReport {
    fn new(job: JobKind, outcome: &FetchOutcome) -> Self {
        Self {
            job,
            fetched: outcome.series.len(),
            failed: outcome
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.key, f.error))
                .collect(),
            warnings: outcome.warnings.len(),
            files: Vec::new(),
            summaries: Vec::new(),
            pmi: None,
        }
    }
}

/// Run one job.
pub fn run_job(
    kind: JobKind,
    ctx: &JobContext<'_>,
    sources: Sources<'_>,
) -> Result<JobReport, JobError> {
    tracing::info!(job = %kind, start = %ctx.range.start(), end = %ctx.range.end(), "job started");
    let report = match kind {
        JobKind::Etf => etf_job(ctx, sources.chart)?,
        JobKind::Commodities => commodity_job(ctx, sources.chart)?,
        JobKind::Macro => macro_job(ctx, sources.fred)?,
        JobKind::Pmi => pmi_job(ctx, sources.compiled)?,
    };
    tracing::info!(
        job = %kind,
        fetched = report.fetched,
        failed = report.failed.len(),
        files = report.files.len(),
        "job finished"
    );
    Ok(report)
}

/// Run `kinds` in order, recording every written file in `manifest.json`.
///
/// The manifest is saved after each job, so a later failure keeps the
/// entries of jobs that already finished.
pub fn run_jobs(
    kinds: &[JobKind],
    ctx: &JobContext<'_>,
    sources: Sources<'_>,
) -> Result<Vec<JobReport>, JobError> {
    let dir = ctx.persister.output_dir();
    let mut manifest = Manifest::load(dir)?;
    let mut reports = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let report = run_job(kind, ctx, sources)?;
        if !report.files.is_empty() {
            for file in &report.files {
                manifest.record(kind.as_str(), &file.path)?;
            }
            manifest.save(dir)?;
        }
        reports.push(report);
    }
    Ok(reports)
}

// ── Shared helpers ───────────────────────────────────────────────────

fn to_cells(values: &[Option<f64>]) -> Vec<Option<Cell>> {
    values.iter().map(|v| v.and_then(Cell::number)).collect()
}

fn write_table(
    ctx: &JobContext<'_>,
    report: &mut JobReport,
    file_name: &str,
    table: &Table,
) -> Result<(), JobError> {
    let path = ctx.persister.write(file_name, table)?;
    report.files.push(WrittenFile {
        file_name: file_name.to_string(),
        path,
        rows: table.len(),
    });
    Ok(())
}

fn write_summary<T: Serialize>(
    ctx: &JobContext<'_>,
    report: &mut JobReport,
    file_name: &str,
    rows: &[T],
) -> Result<(), JobError> {
    let path = ctx.persister.path_for(file_name);
    write_rows(&path, rows)?;
    report.files.push(WrittenFile {
        file_name: file_name.to_string(),
        path,
        rows: rows.len(),
    });
    Ok(())
}

/// Long-format rows for one series: OHLCV fields, then `name_column` and `Symbol`.
fn long_table(series: &Series, name_column: &str) -> Result<Table, TableError> {
    let table = Table::from_series(series, |f| f.to_string())?
        .with_constant(name_column, Cell::text(series.name()))?
        .with_constant("Symbol", Cell::text(series.key()))?;
    let mut order: Vec<&str> = OHLCV.to_vec();
    order.extend([name_column, "Symbol"]);
    order.extend(
        series
            .fields()
            .iter()
            .map(String::as_str)
            .filter(|f| !OHLCV.contains(f)),
    );
    Ok(table.select(&order))
}

fn no_data(job: JobKind, report: JobReport) -> Result<JobReport, JobError> {
    tracing::warn!(job = %job, "no data retrieved, nothing written");
    Ok(report)
}

// ── Jobs ─────────────────────────────────────────────────────────────

fn etf_job(ctx: &JobContext<'_>, adapter: &dyn SourceAdapter) -> Result<JobReport, JobError> {
    let outcome = fetch_all(adapter, &ctx.etf, ctx.range, ctx.fetch, ctx.progress);
    let mut report = JobReport::new(JobKind::Etf, &outcome);
    if outcome.series.is_empty() {
        return no_data(JobKind::Etf, report);
    }

    let mut long = Vec::with_capacity(outcome.series.len());
    let mut wide = Vec::with_capacity(outcome.series.len());
    let mut rows = Vec::with_capacity(outcome.series.len());
    for series in &outcome.series {
        let derived = with_flow_fields(series)?;
        long.push(long_table(&derived, "ETF_Name")?);

        let key = derived.key();
        let columns: Vec<String> = PIVOT_FIELDS.iter().map(|f| format!("{f}_{key}")).collect();
        let names: Vec<&str> = columns.iter().map(String::as_str).collect();
        wide.push(Table::from_series(&derived, |f| format!("{f}_{key}"))?.select(&names));

        rows.push(EtfSummaryRow::from_series(&derived)?);
        report.summaries.push(summarize(&derived, "Close")?);
    }

    write_table(ctx, &mut report, "etf_data_all.csv", &Table::concat(&long))?;

    // Field-major columns: every Close_*, then every Volume_*, then every Dollar_Volume_*.
    let pivot = outer_join(&wide)?;
    let keys: Vec<&str> = outcome.series.iter().map(Series::key).collect();
    let ordered: Vec<String> = PIVOT_FIELDS
        .iter()
        .flat_map(|f| keys.iter().map(move |k| format!("{f}_{k}")))
        .collect();
    let ordered: Vec<&str> = ordered.iter().map(String::as_str).collect();
    write_table(ctx, &mut report, "etf_pivot_data.csv", &pivot.select(&ordered))?;

    write_summary(ctx, &mut report, "etf_summary.csv", &rows)?;
    Ok(report)
}

fn commodity_job(ctx: &JobContext<'_>, adapter: &dyn SourceAdapter) -> Result<JobReport, JobError> {
    let outcome = fetch_all(adapter, &ctx.commodity, ctx.range, ctx.fetch, ctx.progress);
    let mut report = JobReport::new(JobKind::Commodities, &outcome);
    if outcome.series.is_empty() {
        return no_data(JobKind::Commodities, report);
    }

    let mut long = Vec::with_capacity(outcome.series.len());
    let mut rows = Vec::with_capacity(outcome.series.len());
    for series in &outcome.series {
        long.push(long_table(series, "Commodity")?);
        rows.push(CommoditySummaryRow::from_series(series)?);
        report.summaries.push(summarize(series, "Close")?);
    }

    write_table(ctx, &mut report, "commodity_futures_all.csv", &Table::concat(&long))?;
    for (series, table) in outcome.series.iter().zip(&long) {
        write_table(ctx, &mut report, &contract_file_name(series.key()), table)?;
    }
    write_summary(ctx, &mut report, "commodity_summary.csv", &rows)?;
    Ok(report)
}

fn macro_job(ctx: &JobContext<'_>, adapter: &dyn SourceAdapter) -> Result<JobReport, JobError> {
    let outcome = fetch_all(adapter, &ctx.macro_series, ctx.range, ctx.fetch, ctx.progress);
    let mut report = JobReport::new(JobKind::Macro, &outcome);
    if outcome.series.is_empty() {
        return no_data(JobKind::Macro, report);
    }

    // One column per series id.
    let merged = merge_series(&outcome.series, |s, _| s.key().to_string())?;
    write_table(ctx, &mut report, "macro_data_all.csv", &merged)?;

    for split in &ctx.macro_split {
        let present: Vec<&str> = split
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| merged.column_index(c).is_some())
            .collect();
        if present.is_empty() {
            tracing::warn!(file = %split.file, "none of the split's series were fetched, skipping");
            continue;
        }
        let table = merged.select(&present).drop_empty_rows();
        write_table(ctx, &mut report, &split.file, &table)?;
    }

    let mut rows = Vec::with_capacity(outcome.series.len());
    for series in &outcome.series {
        let field = series.fields().first().map(String::as_str).unwrap_or("Value");
        rows.push(MacroSummaryRow::from_series(series, field)?);
        report.summaries.push(summarize(series, field)?);
    }
    write_summary(ctx, &mut report, "macro_summary.csv", &rows)?;
    Ok(report)
}

fn pmi_job(ctx: &JobContext<'_>, adapter: &dyn SourceAdapter) -> Result<JobReport, JobError> {
    let meta = SeriesMeta::new(ISM_PMI_KEY, "ISM Manufacturing PMI", Category::SurveyIndex);
    let outcome = fetch_all(adapter, &[meta], ctx.range, ctx.fetch, ctx.progress);
    let mut report = JobReport::new(JobKind::Pmi, &outcome);
    let Some(series) = outcome.series.first() else {
        return no_data(JobKind::Pmi, report);
    };

    let field = series.fields().first().map(String::as_str).unwrap_or("Value");
    let values = series.column(field).unwrap_or_default();
    let mut counts = PmiCounts::default();
    let status: Vec<Option<Cell>> = values
        .iter()
        .map(|v| {
            v.map(|x| {
                if x >= PMI_EXPANSION_THRESHOLD {
                    counts.expansion += 1;
                    Cell::text("Expansion")
                } else {
                    counts.contraction += 1;
                    Cell::text("Contraction")
                }
            })
        })
        .collect();

    let mut table = Table::new(vec![PMI_COLUMN.to_string()])?;
    for (obs, v) in series.observations().iter().zip(&values) {
        table.push_row(Row::new(obs.date, to_cells(&[*v])))?;
    }
    let table = table.with_column(PMI_STATUS_COLUMN, status)?;
    write_table(ctx, &mut report, "ism_pmi_data.csv", &table)?;

    tracing::info!(
        expansion = counts.expansion,
        contraction = counts.contraction,
        "PMI months by status"
    );
    report.summaries.push(summarize(series, field)?);
    report.pmi = Some(counts);
    Ok(report)
}
