//! Date-keyed tabular data: the shape every persisted file takes.
//!
//! A `Table` has an implicit leading `Date` column followed by named columns.
//! Cells are absent, numeric, or text (identifying columns such as `Symbol`).
//! Rows are not required to have unique dates (long-format tables stack one
//! row per series per date); `merge::outer_join` produces tables that do.

use crate::domain::Series;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Name of the leading date column in every table.
pub const DATE_COLUMN: &str = "Date";

/// Calendar day format used for every persisted date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }

    /// Numeric cell, or `None` for non-finite input.
    pub fn number(value: f64) -> Option<Cell> {
        value.is_finite().then_some(Cell::Number(value))
    }

    pub fn text(value: impl Into<String>) -> Cell {
        Cell::Text(value.into())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Display for f64 is the shortest string that parses back to the same value.
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub date: NaiveDate,
    pub cells: Vec<Option<Cell>>,
}

impl Row {
    pub fn new(date: NaiveDate, cells: Vec<Option<Cell>>) -> Self {
        Self { date, cells }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column '{column}'")]
    DuplicateColumn { column: String },

    #[error("column name 'Date' is reserved for the date axis")]
    ReservedColumn,

    #[error("duplicate date {date} in a table that must be keyed by date")]
    DuplicateDate { date: NaiveDate },

    #[error("row for {date} has {got} cells, expected {expected}")]
    RowWidth {
        date: NaiveDate,
        got: usize,
        expected: usize,
    },

    #[error("column '{column}' has {got} values for {expected} rows")]
    ColumnLength {
        column: String,
        got: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Empty table with the given (non-date) columns.
    pub fn new(columns: Vec<String>) -> Result<Self, TableError> {
        check_columns(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn push_row(&mut self, row: Row) -> Result<(), TableError> {
        if row.cells.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                date: row.date,
                got: row.cells.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// One row per observation, one column per series field.
    ///
    /// `rename` maps a field name to its column name (e.g. `Close` → `Close_SPY`).
    pub fn from_series(
        series: &Series,
        rename: impl Fn(&str) -> String,
    ) -> Result<Self, TableError> {
        let columns: Vec<String> = series.fields().iter().map(|f| rename(f)).collect();
        let mut table = Table::new(columns)?;
        for obs in series.observations() {
            let cells = obs
                .values
                .iter()
                .map(|v| v.and_then(Cell::number))
                .collect();
            table.push_row(Row::new(obs.date, cells))?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.iter().map(|r| r.date)
    }

    /// Cells of one column in row order, or `None` if the column is unknown.
    pub fn column(&self, column: &str) -> Option<Vec<Option<&Cell>>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| r.cells[idx].as_ref()).collect())
    }

    /// Append a column with one value per row.
    pub fn with_column(
        mut self,
        column: impl Into<String>,
        values: Vec<Option<Cell>>,
    ) -> Result<Self, TableError> {
        let column = column.into();
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                column,
                got: values.len(),
                expected: self.rows.len(),
            });
        }
        self.columns.push(column);
        check_columns(&self.columns)?;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.cells.push(value);
        }
        Ok(self)
    }

    /// Append a column holding the same value on every row.
    pub fn with_constant(self, column: impl Into<String>, value: Cell) -> Result<Self, TableError> {
        let values = vec![Some(value); self.rows.len()];
        self.with_column(column, values)
    }

    /// Project onto `columns`, keeping their given order. Unknown names are skipped.
    pub fn select(&self, columns: &[&str]) -> Table {
        let picked: Vec<(usize, String)> = columns
            .iter()
            .filter_map(|c| self.column_index(c).map(|i| (i, c.to_string())))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| Row::new(r.date, picked.iter().map(|(i, _)| r.cells[*i].clone()).collect()))
            .collect();
        Table {
            columns: picked.into_iter().map(|(_, c)| c).collect(),
            rows,
        }
    }

    /// Drop rows in which every cell is absent.
    pub fn drop_empty_rows(mut self) -> Table {
        self.rows.retain(|r| r.cells.iter().any(Option::is_some));
        self
    }

    /// Stack tables vertically. Columns are the first-seen union; a table
    /// lacking a column contributes absent cells for it.
    pub fn concat(tables: &[Table]) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for t in tables {
            for c in &t.columns {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(Table::len).sum());
        for t in tables {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| t.column_index(c)).collect();
            for r in &t.rows {
                let cells = mapping
                    .iter()
                    .map(|m| m.and_then(|i| r.cells[i].clone()))
                    .collect();
                rows.push(Row::new(r.date, cells));
            }
        }

        Table { columns, rows }
    }
}

fn check_columns(columns: &[String]) -> Result<(), TableError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for c in columns {
        if c == DATE_COLUMN {
            return Err(TableError::ReservedColumn);
        }
        if !seen.insert(c.as_str()) {
            return Err(TableError::DuplicateColumn { column: c.clone() });
        }
    }
    Ok(())
}
