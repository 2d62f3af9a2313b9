//! Flat-file persistence: tables to and from comma-separated text.
//!
//! Format: UTF-8, header row `Date,<columns...>`, one row per table row,
//! dates as `YYYY-MM-DD`, absent cells as empty fields, numbers in the
//! shortest form that parses back to the same `f64`.

use crate::table::{Cell, Row, Table, TableError, DATE_COLUMN, DATE_FORMAT};
use chrono::NaiveDate;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to write {}: {source}", .path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {reason}")]
    Parse { line: u64, reason: String },

    #[error("first column must be 'Date', found '{found}'")]
    MissingDateColumn { found: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Writes tables under an explicit output directory.
#[derive(Debug, Clone)]
pub struct CsvPersister {
    output_dir: PathBuf,
}

impl CsvPersister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// Write `table` to `<output_dir>/<file_name>`, overwriting any previous file.
    pub fn write(&self, file_name: &str, table: &Table) -> Result<PathBuf, PersistError> {
        let path = self.path_for(file_name);
        std::fs::create_dir_all(&self.output_dir).map_err(|source| PersistError::WriteError {
            path: self.output_dir.clone(),
            source,
        })?;

        let file = std::fs::File::create(&path).map_err(|source| PersistError::WriteError {
            path: path.clone(),
            source,
        })?;
        write_table(table, io::BufWriter::new(file)).map_err(|source| PersistError::WriteError {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), rows = table.len(), "wrote table");
        Ok(path)
    }
}

/// Serialize `table` as CSV into `writer`.
pub fn write_table<W: io::Write>(table: &Table, writer: W) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push(DATE_COLUMN);
    header.extend(table.columns().iter().map(String::as_str));
    wtr.write_record(&header)?;

    for row in table.rows() {
        let mut record = Vec::with_capacity(row.cells.len() + 1);
        record.push(row.date.format(DATE_FORMAT).to_string());
        record.extend(
            row.cells
                .iter()
                .map(|c| c.as_ref().map(Cell::to_string).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()
}

/// Serialize `table` to an in-memory CSV string.
pub fn table_to_csv(table: &Table) -> io::Result<String> {
    let mut buf = Vec::new();
    write_table(table, &mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Reload a persisted table from `path`.
pub fn read_table(path: &Path) -> Result<Table, PersistError> {
    let file = std::fs::File::open(path).map_err(|source| PersistError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    read_table_from(io::BufReader::new(file))
}

/// Parse CSV produced by `write_table`.
///
/// Empty fields are absent. Cell types are decided per column: a column
/// whose non-empty fields all parse as numbers is numeric (non-finite values
/// become absent); any other column is text throughout, so identifiers such
/// as `NaN` or `1810` next to ordinary symbols come back unchanged. A text
/// column in which every value looks numeric reloads as numbers.
pub fn read_table_from<R: io::Read>(reader: R) -> Result<Table, PersistError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers().map_err(parse_error)?.clone();
    let mut names = headers.iter();
    match names.next() {
        Some(DATE_COLUMN) => {}
        other => {
            return Err(PersistError::MissingDateColumn {
                found: other.unwrap_or_default().to_string(),
            })
        }
    }
    let mut table = Table::new(names.map(str::to_string).collect())?;
    let width = table.columns().len();

    let mut raw_rows: Vec<(NaiveDate, csv::StringRecord)> = Vec::new();
    let mut numeric = vec![true; width];
    for record in rdr.records() {
        let record = record.map_err(parse_error)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let date_text = record.get(0).unwrap_or_default();
        let date =
            NaiveDate::parse_from_str(date_text, DATE_FORMAT).map_err(|e| PersistError::Parse {
                line,
                reason: format!("bad date '{date_text}': {e}"),
            })?;
        for (flag, text) in numeric.iter_mut().zip(record.iter().skip(1)) {
            if !text.is_empty() && text.parse::<f64>().is_err() {
                *flag = false;
            }
        }
        raw_rows.push((date, record));
    }

    for (date, record) in raw_rows {
        let cells = record
            .iter()
            .skip(1)
            .zip(&numeric)
            .map(|(text, &is_numeric)| parse_cell(text, is_numeric))
            .collect();
        table.push_row(Row::new(date, cells))?;
    }

    Ok(table)
}

fn parse_cell(text: &str, numeric: bool) -> Option<Cell> {
    if text.is_empty() {
        return None;
    }
    if !numeric {
        return Some(Cell::Text(text.to_string()));
    }
    text.parse::<f64>().ok().and_then(Cell::number)
}

fn parse_error(e: csv::Error) -> PersistError {
    let line = e.position().map(|p| p.line()).unwrap_or_default();
    PersistError::Parse {
        line,
        reason: e.to_string(),
    }
}
