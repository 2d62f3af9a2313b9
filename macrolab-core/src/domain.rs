//! Domain types: series identity, date ranges, observations, and the immutable series.
//!
//! A `Series` is built once per run from normalized provider data and never
//! mutated afterwards. Derived columns (dollar volume, percent changes) produce a
//! new `Series` value rather than editing the fetched one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What kind of instrument or statistic a series measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Commodity,
    EquityEtf,
    BondEtf,
    Rate,
    PriceIndex,
    SurveyIndex,
    EconomicActivity,
    /// Series reloaded from a flat file without catalog context.
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Commodity => "commodity",
            Category::EquityEtf => "equity_etf",
            Category::BondEtf => "bond_etf",
            Category::Rate => "rate",
            Category::PriceIndex => "price_index",
            Category::SurveyIndex => "survey_index",
            Category::EconomicActivity => "economic_activity",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a series: provider key, display name, category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub key: String,
    pub name: String,
    pub category: Category,
}

impl SeriesMeta {
    pub fn new(key: impl Into<String>, name: impl Into<String>, category: Category) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            category,
        }
    }
}

/// Half-open calendar range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("empty date range: start {start} is not before end {end}")]
pub struct EmptyRangeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, EmptyRangeError> {
        if start >= end {
            return Err(EmptyRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Last day inside the range.
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.start)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// One dated row of a series. `values` is parallel to the series' field list.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

impl Observation {
    pub fn new(date: NaiveDate, values: Vec<Option<f64>>) -> Self {
        Self { date, values }
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}

/// Structural violations rejected by `Series::new`.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("series '{key}': observation on {date} has {got} values, expected {expected}")]
    FieldCountMismatch {
        key: String,
        date: NaiveDate,
        got: usize,
        expected: usize,
    },

    #[error("series '{key}': dates must be strictly increasing (saw {date} after {previous})")]
    NotIncreasing {
        key: String,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("series '{key}': non-finite value in field '{field}' on {date}")]
    NonFinite {
        key: String,
        field: String,
        date: NaiveDate,
    },

    #[error("series '{key}': field '{field}' already exists")]
    DuplicateField { key: String, field: String },

    #[error("series '{key}': field '{field}' has {got} values for {expected} observations")]
    LengthMismatch {
        key: String,
        field: String,
        got: usize,
        expected: usize,
    },
}

/// A named, dated sequence of observations with unique, ascending dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    meta: SeriesMeta,
    fields: Vec<String>,
    observations: Vec<Observation>,
}

impl Series {
    /// Build a series, checking field widths, date order, and finiteness.
    pub fn new(
        meta: SeriesMeta,
        fields: Vec<String>,
        observations: Vec<Observation>,
    ) -> Result<Self, SeriesError> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].contains(field) {
                return Err(SeriesError::DuplicateField {
                    key: meta.key.clone(),
                    field: field.clone(),
                });
            }
        }

        let mut previous: Option<NaiveDate> = None;
        for obs in &observations {
            if obs.values.len() != fields.len() {
                return Err(SeriesError::FieldCountMismatch {
                    key: meta.key.clone(),
                    date: obs.date,
                    got: obs.values.len(),
                    expected: fields.len(),
                });
            }
            if let Some(prev) = previous {
                if obs.date <= prev {
                    return Err(SeriesError::NotIncreasing {
                        key: meta.key.clone(),
                        previous: prev,
                        date: obs.date,
                    });
                }
            }
            for (field, value) in fields.iter().zip(&obs.values) {
                if matches!(value, Some(v) if !v.is_finite()) {
                    return Err(SeriesError::NonFinite {
                        key: meta.key.clone(),
                        field: field.clone(),
                        date: obs.date,
                    });
                }
            }
            previous = Some(obs.date);
        }

        Ok(Self {
            meta,
            fields,
            observations,
        })
    }

    pub fn meta(&self) -> &SeriesMeta {
        &self.meta
    }

    pub fn key(&self) -> &str {
        &self.meta.key
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn category(&self) -> Category {
        self.meta.category
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Values of one field, in date order. `None` if the field does not exist.
    pub fn column(&self, field: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.field_index(field)?;
        Some(self.observations.iter().map(|o| o.get(idx)).collect())
    }

    /// Return a new series with one more field appended.
    ///
    /// `values` must have one entry per observation; non-finite values become absent.
    pub fn with_field(
        &self,
        field: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<Self, SeriesError> {
        let field = field.into();
        if self.fields.contains(&field) {
            return Err(SeriesError::DuplicateField {
                key: self.meta.key.clone(),
                field,
            });
        }
        if values.len() != self.observations.len() {
            return Err(SeriesError::LengthMismatch {
                key: self.meta.key.clone(),
                field,
                got: values.len(),
                expected: self.observations.len(),
            });
        }

        let mut fields = self.fields.clone();
        fields.push(field);
        let observations = self
            .observations
            .iter()
            .zip(values)
            .map(|(obs, v)| {
                let mut row = obs.values.clone();
                row.push(v.filter(|x| x.is_finite()));
                Observation::new(obs.date, row)
            })
            .collect();

        Ok(Self {
            meta: self.meta.clone(),
            fields,
            observations,
        })
    }
}
