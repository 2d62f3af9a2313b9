//! MacroLab Core: series model, source adapters, normalizer, merger, persister, summarizer.
//!
//! The fetch → normalize → merge → persist pipeline:
//! - `data`: source adapters (Yahoo chart API, FRED CSV, compiled datasets)
//! - `normalize`: provider records → canonical `Series` (sentinels, coercion, de-dup)
//! - `merge`: full outer join on date
//! - `persist`: flat CSV files under an explicit output directory
//! - `summary`: per-series descriptive statistics

pub mod data;
pub mod domain;
pub mod merge;
pub mod normalize;
pub mod persist;
pub mod summary;
pub mod table;

pub use domain::{Category, DateRange, Observation, Series, SeriesError, SeriesMeta};
pub use merge::{merge_series, outer_join};
pub use normalize::{FieldMap, Normalized, Normalizer, RecordWarning, SentinelTable};
pub use persist::{read_table, CsvPersister, PersistError};
pub use summary::{best_and_worst, summarize, total_return_pct, SummaryRecord};
pub use table::{Cell, Row, Table, TableError, DATE_COLUMN, DATE_FORMAT};
