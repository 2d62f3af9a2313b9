//! MacroLab Runner: job orchestration on top of `macrolab-core`.
//!
//! This crate provides:
//! - TOML pipeline configuration and the built-in series catalogs
//! - A paced, optionally pooled fetch over a catalog
//! - Derived flow columns (dollar volume, percent changes)
//! - The etf / commodities / macro / pmi jobs and their output files
//! - Summary files, stdout summary tables, and `manifest.json` with BLAKE3 hashes

pub mod catalog;
pub mod config;
pub mod derive;
pub mod fetch;
pub mod jobs;
pub mod manifest;
pub mod report;

pub use catalog::MacroSplit;
pub use config::{ConfigError, PipelineConfig};
pub use fetch::{fetch_all, FetchFailure, FetchOptions, FetchOutcome};
pub use jobs::{run_job, run_jobs, JobContext, JobError, JobKind, JobReport, PmiCounts, Sources};
pub use manifest::{Manifest, ManifestEntry, ManifestError, MANIFEST_FILE};
pub use report::{format_summary_table, numeric_series, series_by_key, summarize_all, ReportError};
