//! Descriptive statistics per series.
//!
//! `summarize` is pure: the same series and field always give the same record.
//! `first`/`last` are the field's values on the first and last observation, so
//! an absent value there makes them (and the total return) absent. `min`,
//! `max` and `mean` look at present values only.

use crate::domain::{Category, Series};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub key: String,
    pub name: String,
    pub category: Category,
    pub field: String,
    /// Number of observations (dates), present or not.
    pub count: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub first: Option<f64>,
    pub last: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub total_return_pct: Option<f64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("series '{key}' has no field '{field}'")]
pub struct UnknownField {
    pub key: String,
    pub field: String,
}

/// `(last / first − 1) × 100`; absent when either end is absent or `first` is zero.
pub fn total_return_pct(first: Option<f64>, last: Option<f64>) -> Option<f64> {
    match (first, last) {
        (Some(f), Some(l)) if f != 0.0 => Some((l / f - 1.0) * 100.0),
        _ => None,
    }
}

pub fn summarize(series: &Series, field: &str) -> Result<SummaryRecord, UnknownField> {
    let values = series.column(field).ok_or_else(|| UnknownField {
        key: series.key().to_string(),
        field: field.to_string(),
    })?;

    let count = values.len();
    let first = values.first().copied().flatten();
    let last = values.last().copied().flatten();

    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let min = present.iter().copied().reduce(f64::min);
    let max = present.iter().copied().reduce(f64::max);
    let mean = (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64);

    // One observation has no return to speak of.
    let total_return_pct = if count > 1 {
        total_return_pct(first, last)
    } else {
        None
    };

    Ok(SummaryRecord {
        key: series.key().to_string(),
        name: series.name().to_string(),
        category: series.category(),
        field: field.to_string(),
        count,
        start_date: series.first_date(),
        end_date: series.last_date(),
        first,
        last,
        min,
        max,
        mean,
        total_return_pct,
    })
}

/// Best and worst performers by total return. Records without a return are ignored;
/// ties keep the earlier record.
pub fn best_and_worst(records: &[SummaryRecord]) -> Option<(&SummaryRecord, &SummaryRecord)> {
    let mut ranked = records
        .iter()
        .filter_map(|r| r.total_return_pct.map(|ret| (r, ret)));
    let (first, first_ret) = ranked.next()?;
    let (mut best, mut best_ret) = (first, first_ret);
    let (mut worst, mut worst_ret) = (first, first_ret);
    for (r, ret) in ranked {
        if ret > best_ret {
            best = r;
            best_ret = ret;
        }
        if ret < worst_ret {
            worst = r;
            worst_ret = ret;
        }
    }
    Some((best, worst))
}
