//! Summary files, the stdout summary table, and table → series regrouping
//! for summarizing files that were persisted earlier.

use crate::derive::DOLLAR_VOLUME;
use chrono::NaiveDate;
use macrolab_core::summary::UnknownField;
use macrolab_core::{
    best_and_worst, summarize, Category, Cell, Observation, PersistError, Series, SeriesError,
    SeriesMeta, SummaryRecord, Table,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("column '{column}' not found")]
    UnknownColumn { column: String },

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Summary(#[from] UnknownField),
}

// ── Summary rows ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtfSummaryRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Data_Points")]
    pub data_points: usize,
    #[serde(rename = "Start_Date")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "End_Date")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "First_Close")]
    pub first_close: Option<f64>,
    #[serde(rename = "Last_Close")]
    pub last_close: Option<f64>,
    #[serde(rename = "Total_Return_Pct")]
    pub total_return_pct: Option<f64>,
    #[serde(rename = "Avg_Daily_Volume")]
    pub avg_daily_volume: Option<f64>,
    #[serde(rename = "Avg_Dollar_Volume")]
    pub avg_dollar_volume: Option<f64>,
}

impl EtfSummaryRow {
    /// `series` must already carry the flow fields.
    pub fn from_series(series: &Series) -> Result<Self, UnknownField> {
        let close = summarize(series, "Close")?;
        let volume = summarize(series, "Volume")?;
        let dollar_volume = summarize(series, DOLLAR_VOLUME)?;
        Ok(Self {
            symbol: close.key,
            name: close.name,
            data_points: close.count,
            start_date: close.start_date,
            end_date: close.end_date,
            first_close: close.first,
            last_close: close.last,
            total_return_pct: close.total_return_pct,
            avg_daily_volume: volume.mean,
            avg_dollar_volume: dollar_volume.mean,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommoditySummaryRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Data_Points")]
    pub data_points: usize,
    #[serde(rename = "Start_Date")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "End_Date")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "Min_Close")]
    pub min_close: Option<f64>,
    #[serde(rename = "Max_Close")]
    pub max_close: Option<f64>,
    #[serde(rename = "Last_Close")]
    pub last_close: Option<f64>,
    #[serde(rename = "Total_Return_Pct")]
    pub total_return_pct: Option<f64>,
}

impl CommoditySummaryRow {
    pub fn from_series(series: &Series) -> Result<Self, UnknownField> {
        let close = summarize(series, "Close")?;
        Ok(Self {
            symbol: close.key,
            name: close.name,
            data_points: close.count,
            start_date: close.start_date,
            end_date: close.end_date,
            min_close: close.min,
            max_close: close.max,
            last_close: close.last,
            total_return_pct: close.total_return_pct,
        })
    }
}

/// Macro series are sparse, so counts and "latest" only look at present values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroSummaryRow {
    #[serde(rename = "Series_ID")]
    pub series_id: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Category")]
    pub category: Category,
    #[serde(rename = "Data_Points")]
    pub data_points: usize,
    #[serde(rename = "Start_Date")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "End_Date")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "Min")]
    pub min: Option<f64>,
    #[serde(rename = "Max")]
    pub max: Option<f64>,
    #[serde(rename = "Mean")]
    pub mean: Option<f64>,
    #[serde(rename = "Latest")]
    pub latest: Option<f64>,
}

impl MacroSummaryRow {
    pub fn from_series(series: &Series, field: &str) -> Result<Self, UnknownField> {
        let s = summarize(series, field)?;
        let present: Vec<(NaiveDate, f64)> = series
            .observations()
            .iter()
            .zip(series.column(field).unwrap_or_default())
            .filter_map(|(o, v)| v.map(|v| (o.date, v)))
            .collect();
        Ok(Self {
            series_id: s.key,
            description: s.name,
            category: s.category,
            data_points: present.len(),
            start_date: present.first().map(|p| p.0),
            end_date: present.last().map(|p| p.0),
            min: s.min,
            max: s.max,
            mean: s.mean,
            latest: present.last().map(|p| p.1),
        })
    }
}

/// Write serializable rows as CSV with a header from the field names.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PersistError> {
    let write_error = |source: io::Error| PersistError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(|e| write_error(csv_to_io(e)))?;
    for row in rows {
        wtr.serialize(row).map_err(|e| write_error(csv_to_io(e)))?;
    }
    wtr.flush().map_err(write_error)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote summary");
    Ok(())
}

fn csv_to_io(e: csv::Error) -> io::Error {
    match e.into_kind() {
        csv::ErrorKind::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, format!("{other:?}")),
    }
}

// ── Stdout table ─────────────────────────────────────────────────────

fn opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|x| format!("{x:.decimals$}"))
        .unwrap_or_else(|| "-".to_string())
}

fn opt_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Fixed-width summary table followed by best/worst performer lines.
pub fn format_summary_table(records: &[SummaryRecord]) -> String {
    let width = records
        .iter()
        .map(|r| r.key.len())
        .max()
        .unwrap_or(0)
        .max(3);

    let mut out = String::with_capacity(128 * (records.len() + 3));
    out.push_str(&format!(
        "{:<width$}  {:>6}  {:<10}  {:<10}  {:>12}  {:>12}  {:>12}  {:>12}  {:>9}\n",
        "Key", "Points", "Start", "End", "First", "Last", "Min", "Max", "Return%"
    ));
    for r in records {
        out.push_str(&format!(
            "{:<width$}  {:>6}  {:<10}  {:<10}  {:>12}  {:>12}  {:>12}  {:>12}  {:>9}\n",
            r.key,
            r.count,
            opt_date(r.start_date),
            opt_date(r.end_date),
            opt(r.first, 2),
            opt(r.last, 2),
            opt(r.min, 2),
            opt(r.max, 2),
            opt(r.total_return_pct, 2),
        ));
    }

    if let Some((best, worst)) = best_and_worst(records) {
        out.push('\n');
        out.push_str(&format!(
            "Best:  {} ({}%)\n",
            best.key,
            opt(best.total_return_pct, 2)
        ));
        out.push_str(&format!(
            "Worst: {} ({}%)\n",
            worst.key,
            opt(worst.total_return_pct, 2)
        ));
    }
    out
}

// ── Table → series ───────────────────────────────────────────────────

fn build_series(
    key: &str,
    field: &str,
    points: BTreeMap<NaiveDate, Option<f64>>,
) -> Result<Series, SeriesError> {
    let observations = points
        .into_iter()
        .map(|(date, v)| Observation::new(date, vec![v]))
        .collect();
    Series::new(
        SeriesMeta::new(key, key, Category::Other),
        vec![field.to_string()],
        observations,
    )
}

fn insert_point(
    points: &mut BTreeMap<NaiveDate, Option<f64>>,
    key: &str,
    date: NaiveDate,
    value: Option<f64>,
) {
    if points.insert(date, value).is_some() {
        tracing::warn!(key, %date, "duplicate date, keeping the later row");
    }
}

/// One series per distinct value of `key_column`, holding `value_column`.
///
/// Groups keep first-seen order. Non-numeric values are treated as absent.
pub fn series_by_key(
    table: &Table,
    key_column: &str,
    value_column: &str,
) -> Result<Vec<Series>, ReportError> {
    let key_idx = table
        .column_index(key_column)
        .ok_or_else(|| ReportError::UnknownColumn {
            column: key_column.to_string(),
        })?;
    let value_idx = table
        .column_index(value_column)
        .ok_or_else(|| ReportError::UnknownColumn {
            column: value_column.to_string(),
        })?;

    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, BTreeMap<NaiveDate, Option<f64>>> = BTreeMap::new();
    for row in table.rows() {
        let Some(key) = row.cells[key_idx].as_ref().map(Cell::to_string) else {
            continue;
        };
        let value = row.cells[value_idx].as_ref().and_then(Cell::as_number);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        let points = groups.entry(key.clone()).or_default();
        insert_point(points, &key, row.date, value);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key).map(|points| (key, points)))
        .map(|(key, points)| build_series(&key, value_column, points).map_err(ReportError::from))
        .collect()
}

/// One series per numeric column (at least one number, no text).
pub fn numeric_series(table: &Table) -> Result<Vec<Series>, ReportError> {
    let mut out = Vec::new();
    for (idx, column) in table.columns().iter().enumerate() {
        let cells = table.rows().iter().map(|r| r.cells[idx].as_ref());
        let mut has_number = false;
        let mut has_text = false;
        for cell in cells.clone().flatten() {
            match cell {
                Cell::Number(_) => has_number = true,
                Cell::Text(_) => has_text = true,
            }
        }
        if !has_number || has_text {
            continue;
        }

        let mut points = BTreeMap::new();
        for (row, cell) in table.rows().iter().zip(cells) {
            insert_point(&mut points, column, row.date, cell.and_then(Cell::as_number));
        }
        out.push(build_series(column, column, points)?);
    }
    Ok(out)
}

/// Summarize every series on its single field.
pub fn summarize_all(series: &[Series]) -> Result<Vec<SummaryRecord>, ReportError> {
    series
        .iter()
        .map(|s| {
            let field = s.fields().first().map(String::as_str).unwrap_or_default();
            summarize(s, field).map_err(ReportError::from)
        })
        .collect()
}
