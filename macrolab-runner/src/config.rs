//! Pipeline configuration loaded from TOML.
//!
//! Every key is optional. Missing catalogs fall back to the built-in ones in
//! `catalog`; CLI flags are applied on top of whatever the file says.
//!
//! ```toml
//! output_dir = "market_data"
//! start = "2020-01-01"
//! pace_ms = 500
//!
//! [[etf]]
//! key = "SPY"
//! name = "SPDR S&P 500 ETF"
//! category = "equity_etf"
//! ```

use crate::catalog::{
    default_commodities, default_etfs, default_macro_series, default_macro_splits, MacroSplit,
};
use chrono::{Days, NaiveDate};
use macrolab_core::data::http::MAX_RETRIES;
use macrolab_core::data::HttpSettings;
use macrolab_core::{DateRange, SeriesMeta};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("empty date range: start {start} is not before end {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("max_retries must be 0 or 1, got {0}")]
    MaxRetries(u32),

    #[error("max_concurrent must be at least 1")]
    ZeroConcurrency,

    #[error("duplicate key '{key}' in [[{table}]]")]
    DuplicateKey { table: &'static str, key: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory every output file is written under.
    pub output_dir: PathBuf,
    /// First day fetched (inclusive).
    pub start: NaiveDate,
    /// First day not fetched. Defaults to tomorrow so today is included.
    pub end: Option<NaiveDate>,
    /// Delay each worker takes after every request.
    pub pace_ms: u64,
    /// Worker pool size; 1 means sequential.
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub etf: Vec<SeriesMeta>,
    pub commodity: Vec<SeriesMeta>,
    pub macro_series: Vec<SeriesMeta>,
    pub macro_split: Vec<MacroSplit>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("market_data"),
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
            end: None,
            pace_ms: 500,
            max_concurrent: 1,
            max_retries: MAX_RETRIES,
            timeout_secs: 30,
            etf: default_etfs(),
            commodity: default_commodities(),
            macro_series: default_macro_series(),
            macro_split: default_macro_splits(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that do not depend on the current date.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::MaxRetries(self.max_retries));
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if let Some(end) = self.end {
            if end <= self.start {
                return Err(ConfigError::EmptyRange {
                    start: self.start,
                    end,
                });
            }
        }
        check_unique("etf", &self.etf)?;
        check_unique("commodity", &self.commodity)?;
        check_unique("macro_series", &self.macro_series)?;
        Ok(())
    }

    /// The half-open fetch range, with an open end resolved against `today`.
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange, ConfigError> {
        let end = self
            .end
            .or_else(|| today.checked_add_days(Days::new(1)))
            .unwrap_or(today);
        DateRange::new(self.start, end).map_err(|_| ConfigError::EmptyRange {
            start: self.start,
            end,
        })
    }

    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            ..HttpSettings::default()
        }
    }
}

fn check_unique(table: &'static str, entries: &[SeriesMeta]) -> Result<(), ConfigError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for e in entries {
        if !seen.insert(e.key.as_str()) {
            return Err(ConfigError::DuplicateKey {
                table,
                key: e.key.clone(),
            });
        }
    }
    Ok(())
}
