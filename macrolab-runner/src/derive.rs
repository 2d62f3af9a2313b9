//! Derived flow columns for price/volume series.

use macrolab_core::{Series, SeriesError};

pub const DOLLAR_VOLUME: &str = "Dollar_Volume";
pub const PRICE_CHANGE: &str = "Price_Change";
pub const VOLUME_CHANGE: &str = "Volume_Change";

/// Percent change vs. the previous observation.
///
/// Absent on the first observation, when either side is absent, or when the
/// previous value is zero.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for v in values {
        let change = match (prev, v) {
            (Some(p), Some(c)) if p != 0.0 => Some((c / p - 1.0) * 100.0),
            _ => None,
        };
        out.push(change);
        prev = *v;
    }
    out
}

/// Element-wise product; absent where either side is absent.
pub fn product(a: &[Option<f64>], b: &[Option<f64>]) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| Some((*x)? * (*y)?))
        .collect()
}

/// The `Dollar_Volume`, `Price_Change`, `Volume_Change` columns, in that order.
///
/// Missing `Close` or `Volume` fields yield all-absent columns.
pub fn flow_columns(series: &Series) -> Vec<(&'static str, Vec<Option<f64>>)> {
    let blank = || vec![None; series.len()];
    let close = series.column("Close").unwrap_or_else(blank);
    let volume = series.column("Volume").unwrap_or_else(blank);

    vec![
        (DOLLAR_VOLUME, product(&close, &volume)),
        (PRICE_CHANGE, pct_change(&close)),
        (VOLUME_CHANGE, pct_change(&volume)),
    ]
}

/// `series` plus the flow columns as extra fields.
pub fn with_flow_fields(series: &Series) -> Result<Series, SeriesError> {
    flow_columns(series)
        .into_iter()
        .try_fold(series.clone(), |acc, (name, values)| acc.with_field(name, values))
}
