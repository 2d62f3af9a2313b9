//! Full outer join of date-keyed tables.
//!
//! Every date seen in any input survives. Where an input has no row for a
//! date, its columns are absent on that row; nothing is interpolated or
//! zero-filled.

use crate::domain::Series;
use crate::table::{Cell, Row, Table, TableError};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Outer-join `tables` on date.
///
/// Inputs must each have unique dates and must not share a column name.
/// Output columns are first-seen in input order; rows ascend by date.
pub fn outer_join(tables: &[Table]) -> Result<Table, TableError> {
    let mut columns: Vec<String> = Vec::new();
    let mut offsets = Vec::with_capacity(tables.len());
    let mut seen: HashSet<&str> = HashSet::new();
    for t in tables {
        offsets.push(columns.len());
        for c in t.columns() {
            if !seen.insert(c.as_str()) {
                return Err(TableError::DuplicateColumn { column: c.clone() });
            }
            columns.push(c.clone());
        }
    }

    let width = columns.len();
    let mut rows: BTreeMap<NaiveDate, Vec<Option<Cell>>> = BTreeMap::new();
    for (t, &offset) in tables.iter().zip(&offsets) {
        let mut dates = HashSet::with_capacity(t.len());
        for row in t.rows() {
            if !dates.insert(row.date) {
                return Err(TableError::DuplicateDate { date: row.date });
            }
            let slot = rows.entry(row.date).or_insert_with(|| vec![None; width]);
            for (i, cell) in row.cells.iter().enumerate() {
                slot[offset + i] = cell.clone();
            }
        }
    }

    let mut merged = Table::new(columns)?;
    for (date, cells) in rows {
        merged.push_row(Row::new(date, cells))?;
    }
    Ok(merged)
}

/// Convert each series to a table with `rename(series, field)` column names, then outer-join.
///
/// Series are joined in the order given; callers sort by key first when they
/// need a reproducible column order.
pub fn merge_series(
    series: &[Series],
    rename: impl Fn(&Series, &str) -> String,
) -> Result<Table, TableError> {
    let tables = series
        .iter()
        .map(|s| Table::from_series(s, |field| rename(s, field)))
        .collect::<Result<Vec<_>, _>>()?;
    outer_join(&tables)
}
