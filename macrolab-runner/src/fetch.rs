//! Paced fetch of many series through one adapter.
//!
//! With `max_concurrent == 1` series are fetched one after another. Larger
//! values run a private rayon pool of that many workers. Either way each
//! worker sleeps `pace` after every request, and results are sorted by key
//! before anyone sees them.

use macrolab_core::data::{fetch_series, FetchProgress, SourceAdapter, SourceError};
use macrolab_core::{DateRange, RecordWarning, Series, SeriesMeta};
use rayon::prelude::*;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub pace: Duration,
    pub max_concurrent: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            pace: Duration::from_millis(500),
            max_concurrent: 1,
        }
    }
}

/// A series that was dropped from the run.
#[derive(Debug)]
pub struct FetchFailure {
    pub key: String,
    pub error: SourceError,
}

#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Successfully normalized series, ascending by key.
    pub series: Vec<Series>,
    /// Failed series, ascending by key.
    pub failures: Vec<FetchFailure>,
    pub warnings: Vec<RecordWarning>,
}

impl FetchOutcome {
    pub fn failed_keys(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.key.as_str()).collect()
    }
}

/// Fetch and normalize every series in `metas`. Per-series failures never abort the batch.
pub fn fetch_all(
    adapter: &dyn SourceAdapter,
    metas: &[SeriesMeta],
    range: DateRange,
    options: FetchOptions,
    progress: &dyn FetchProgress,
) -> FetchOutcome {
    let total = metas.len();
    let fetch_one = |index: usize, meta: &SeriesMeta| {
        progress.on_start(&meta.key, index, total);
        let result = fetch_series(adapter, meta.clone(), range);
        progress.on_complete(
            &meta.key,
            index,
            total,
            result.as_ref().map(|n| n.series.len()),
        );
        if !options.pace.is_zero() {
            std::thread::sleep(options.pace);
        }
        (meta.key.clone(), result)
    };

    let pool = if options.max_concurrent > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(options.max_concurrent)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::warn!(error = %e, "failed to build fetch pool, fetching sequentially");
                None
            }
        }
    } else {
        None
    };

    let mut results: Vec<(String, Result<_, SourceError>)> = match pool {
        Some(pool) => pool.install(|| {
            metas
                .par_iter()
                .enumerate()
                .map(|(i, m)| fetch_one(i, m))
                .collect()
        }),
        None => metas.iter().enumerate().map(|(i, m)| fetch_one(i, m)).collect(),
    };
    results.sort_by(|a, b| a.0.cmp(&b.0));

    let mut outcome = FetchOutcome::default();
    for (key, result) in results {
        match result {
            Ok(normalized) => {
                outcome.series.push(normalized.series);
                outcome.warnings.extend(normalized.warnings);
            }
            Err(error) => outcome.failures.push(FetchFailure { key, error }),
        }
    }

    progress.on_batch_complete(outcome.series.len(), outcome.failures.len(), total);
    outcome
}
