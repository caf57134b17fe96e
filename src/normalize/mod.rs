// src/normalize/mod.rs

//! Turns a decoded API response into one sorted, pruned table per series.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

pub mod error;
pub mod period;
pub mod raw;
pub mod table;

pub use error::NormalizeError;
pub use raw::{BlsResponse, RawCatalog, RawFootnote, RawObservation, RawResults, RawSeries};
pub use table::{Cell, Column, NormalizedRow, SeriesTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Fill `percent_change` from the preceding row.
    pub percent_change: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            percent_change: true,
        }
    }
}

/// Outcome of normalizing one response: a table or an error per series id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    results: BTreeMap<String, Result<SeriesTable, NormalizeError>>,
}

impl Normalized {
    /// Table for `series_id`, its normalization error, or `MissingSeries`.
    pub fn table(&self, series_id: &str) -> Result<&SeriesTable, NormalizeError> {
        match self.results.get(series_id) {
            Some(Ok(t)) => Ok(t),
            Some(Err(e)) => Err(e.clone()),
            None => Err(NormalizeError::MissingSeries {
                series_id: series_id.to_string(),
            }),
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &SeriesTable> {
        self.results.values().filter_map(|r| r.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &NormalizeError)> {
        self.results
            .iter()
            .filter_map(|(k, r)| r.as_ref().err().map(|e| (k.as_str(), e)))
    }

    pub fn series_ids(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_results(self) -> BTreeMap<String, Result<SeriesTable, NormalizeError>> {
        self.results
    }
}

/// Normalize every series in `response`. Series are independent: one that
/// fails is reported under its id and does not affect the others.
#[instrument(level = "debug", skip_all, fields(series = response.series().len()))]
pub fn normalize(response: &BlsResponse, options: NormalizeOptions) -> Normalized {
    let outcomes: Vec<Result<SeriesTable, NormalizeError>> = response
        .series()
        .par_iter()
        .enumerate()
        .map(|(position, series)| normalize_series(series, position, options))
        .collect();

    let mut results = BTreeMap::new();
    for outcome in outcomes {
        let key = match &outcome {
            Ok(t) => t.series_id().to_string(),
            Err(e) => e.series_key(),
        };
        if let Err(e) = &outcome {
            warn!(series = %key, error = %e, "series failed to normalize");
        }
        if results.insert(key.clone(), outcome).is_some() {
            warn!(series = %key, "duplicate series in response; keeping the last one");
        }
    }

    Normalized { results }
}

/// Like [`normalize`], but every id in `requested` that the response lacks is
/// reported as `MissingSeries`.
pub fn normalize_requested(
    response: &BlsResponse,
    requested: &[String],
    options: NormalizeOptions,
) -> Normalized {
    let mut normalized = normalize(response, options);
    for id in requested {
        if !normalized.results.contains_key(id) {
            warn!(series = %id, "requested series missing from response");
            normalized.results.insert(
                id.clone(),
                Err(NormalizeError::MissingSeries {
                    series_id: id.clone(),
                }),
            );
        }
    }
    normalized
}

/// Normalize a single series object. `position` is its index in
/// `Results.series`, used to report a series with no identifier.
pub fn normalize_series(
    series: &RawSeries,
    position: usize,
    options: NormalizeOptions,
) -> Result<SeriesTable, NormalizeError> {
    let series_id = series
        .series_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(NormalizeError::MissingSeriesId { position })?;

    let series_title = series.catalog.as_ref().and_then(|c| c.series_title.clone());
    let survey_name = series.catalog.as_ref().and_then(|c| c.survey_name.clone());
    let catalog = series
        .catalog
        .as_ref()
        .filter(|c| !c.extra.is_empty())
        .map(|c| serde_json::Value::Object(c.extra.clone().into_iter().collect()));

    // 1) flatten + validate each record
    let mut rows = Vec::with_capacity(series.data.len());
    for (row, obs) in series.data.iter().enumerate() {
        let value = parse_value(&obs.value).ok_or_else(|| NormalizeError::MalformedValue {
            series_id: series_id.to_string(),
            row,
            value: obs.value.clone(),
        })?;
        let malformed_year = || NormalizeError::MalformedYear {
            series_id: series_id.to_string(),
            row,
            year: obs.year.clone(),
        };
        let year: i32 = obs.year.trim().parse().map_err(|_| malformed_year())?;
        let month =
            period::month_from_period(&obs.period).ok_or_else(|| NormalizeError::MalformedPeriod {
                series_id: series_id.to_string(),
                row,
                period: obs.period.clone(),
            })?;
        let date = period::first_of_month(year, month).ok_or_else(malformed_year)?;

        rows.push(NormalizedRow {
            index: row,
            date,
            value,
            percent_change: None,
            series_id: series_id.to_string(),
            series_title: series_title.clone(),
            year,
            month,
            period: obs.period.clone(),
            period_name: obs.period_name.clone(),
            survey_name: survey_name.clone(),
            catalog: catalog.clone(),
            latest: obs.latest.as_deref().and_then(parse_flag),
            calculations: obs.calculations.clone(),
            aspects: obs.aspects.clone(),
            footnotes: obs.joined_footnotes(),
        });
    }

    // 2) chronological order; sort_by_key is stable so ties keep input order
    rows.sort_by_key(|r| r.date);

    // 3) period-over-period change
    if options.percent_change {
        for i in 1..rows.len() {
            rows[i].percent_change = period::percent_change(rows[i - 1].value, rows[i].value);
        }
    }

    // 4) prune + re-index
    let table = SeriesTable::new(series_id.to_string(), rows);
    debug!(
        series = %series_id,
        rows = table.len(),
        columns = table.columns().len(),
        "normalized series"
    );
    Ok(table)
}

/// Parse a value field; empty, non-numeric and non-finite text is rejected.
fn parse_value(raw: &str) -> Option<f64> {
    let v: f64 = raw.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
