//! Source adapters and fetch plumbing.

pub mod compiled;
pub mod fred;
pub mod http;
pub mod provider;
pub mod yahoo;

#[cfg(test)]
mod test_server;

pub use compiled::CompiledSource;
pub use fred::FredSource;
pub use http::HttpSettings;
pub use provider::{
    FetchProgress, LogProgress, NoProgress, RawDate, RawRecord, RawSeries, RawValue,
    SourceAdapter, SourceError,
};
pub use yahoo::YahooChartSource;

use crate::domain::{DateRange, SeriesMeta};
use crate::normalize::Normalized;

/// Fetch one series and run it through the adapter's normalizer.
pub fn fetch_series(
    adapter: &dyn SourceAdapter,
    meta: SeriesMeta,
    range: DateRange,
) -> Result<Normalized, SourceError> {
    let raw = adapter.fetch(&meta.key, range)?;
    adapter.normalizer().normalize(meta, raw)
}
