// src/normalize/table.rs

use chrono::NaiveDate;
use serde::Serialize;
use std::{collections::BTreeMap, fmt};

use super::raw::{RawCatalog, RawFootnote, RawObservation, RawSeries};

/// Fixed superset of columns a normalized table can carry, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Date,
    Value,
    PercentChange,
    SeriesId,
    SeriesTitle,
    Year,
    Month,
    Period,
    PeriodName,
    SurveyName,
    Catalog,
    Latest,
    Calculations,
    Aspects,
    Footnotes,
}

impl Column {
    pub const ALL: [Column; 15] = [
        Column::Date,
        Column::Value,
        Column::PercentChange,
        Column::SeriesId,
        Column::SeriesTitle,
        Column::Year,
        Column::Month,
        Column::Period,
        Column::PeriodName,
        Column::SurveyName,
        Column::Catalog,
        Column::Latest,
        Column::Calculations,
        Column::Aspects,
        Column::Footnotes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Value => "value",
            Column::PercentChange => "percent_change",
            Column::SeriesId => "series_id",
            Column::SeriesTitle => "series_title",
            Column::Year => "year",
            Column::Month => "month",
            Column::Period => "period",
            Column::PeriodName => "period_name",
            Column::SurveyName => "survey_name",
            Column::Catalog => "catalog",
            Column::Latest => "latest",
            Column::Calculations => "calculations",
            Column::Aspects => "aspects",
            Column::Footnotes => "footnotes",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell, borrowed from its row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Date(NaiveDate),
    Float(f64),
    Int(i32),
    UInt(u32),
    Bool(bool),
    Text(&'a str),
    Json(&'a serde_json::Value),
    Missing,
}

impl Cell<'_> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

/// One observation after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// Dense 0-based position within the sorted table.
    pub index: usize,
    pub date: NaiveDate,
    pub value: f64,
    pub percent_change: Option<f64>,
    pub series_id: String,
    pub series_title: Option<String>,
    pub year: i32,
    pub month: u32,
    pub period: String,
    pub period_name: Option<String>,
    pub survey_name: Option<String>,
    /// Catalog fields other than title and survey name, as a JSON object.
    pub catalog: Option<serde_json::Value>,
    pub latest: Option<bool>,
    pub calculations: Option<serde_json::Value>,
    pub aspects: Option<serde_json::Value>,
    pub footnotes: String,
}

fn text(s: &str) -> Cell<'_> {
    if s.is_empty() {
        Cell::Missing
    } else {
        Cell::Text(s)
    }
}

fn opt_text(s: &Option<String>) -> Cell<'_> {
    s.as_deref().map_or(Cell::Missing, text)
}

/// `null`, `{}` and `[]` carry nothing and count as missing.
fn json(v: &Option<serde_json::Value>) -> Cell<'_> {
    use serde_json::Value;
    match v {
        None | Some(Value::Null) => Cell::Missing,
        Some(Value::Object(m)) if m.is_empty() => Cell::Missing,
        Some(Value::Array(a)) if a.is_empty() => Cell::Missing,
        Some(v) => Cell::Json(v),
    }
}

impl NormalizedRow {
    /// Read one column. Empty strings, `None` and NaN are all `Missing`.
    pub fn cell(&self, column: Column) -> Cell<'_> {
        match column {
            Column::Date => Cell::Date(self.date),
            Column::Value if self.value.is_nan() => Cell::Missing,
            Column::Value => Cell::Float(self.value),
            Column::PercentChange => self
                .percent_change
                .filter(|c| !c.is_nan())
                .map_or(Cell::Missing, Cell::Float),
            Column::SeriesId => text(&self.series_id),
            Column::SeriesTitle => opt_text(&self.series_title),
            Column::Year => Cell::Int(self.year),
            Column::Month => Cell::UInt(self.month),
            Column::Period => text(&self.period),
            Column::PeriodName => opt_text(&self.period_name),
            Column::SurveyName => opt_text(&self.survey_name),
            Column::Catalog => json(&self.catalog),
            Column::Latest => self.latest.map_or(Cell::Missing, Cell::Bool),
            Column::Calculations => json(&self.calculations),
            Column::Aspects => json(&self.aspects),
            Column::Footnotes => text(&self.footnotes),
        }
    }
}

/// The normalized, chronologically ordered table for one series.
///
/// Built once by the normalizer and read-only afterwards. Rows keep every
/// field of the superset schema; `columns` lists the ones that survived
/// pruning, i.e. that have at least one non-missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    series_id: String,
    columns: Vec<Column>,
    rows: Vec<NormalizedRow>,
}

impl SeriesTable {
    /// Re-index `rows` (already sorted) and prune columns missing everywhere.
    pub(crate) fn new(series_id: String, mut rows: Vec<NormalizedRow>) -> Self {
        for (i, row) in rows.iter_mut().enumerate() {
            row.index = i;
        }
        let columns = Column::ALL
            .into_iter()
            .filter(|&c| rows.iter().any(|r| !r.cell(c).is_missing()))
            .collect();
        Self {
            series_id,
            columns,
            rows,
        }
    }

    pub fn series_id(&self) -> &str {
        &self.series_id
    }

    /// Retained columns, in display order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rebuild the raw series this table is equivalent to. Normalizing the
    /// result with the same options yields an equal table.
    pub fn to_raw_series(&self) -> RawSeries {
        let catalog = self.rows.first().and_then(|r| {
            let extra: BTreeMap<String, serde_json::Value> = match &r.catalog {
                Some(serde_json::Value::Object(m)) => {
                    m.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                }
                _ => BTreeMap::new(),
            };
            (r.series_title.is_some() || r.survey_name.is_some() || !extra.is_empty()).then(
                || RawCatalog {
                    series_title: r.series_title.clone(),
                    survey_name: r.survey_name.clone(),
                    extra,
                },
            )
        });

        let data = self
            .rows
            .iter()
            .map(|r| RawObservation {
                year: r.year.to_string(),
                period: r.period.clone(),
                period_name: r.period_name.clone(),
                latest: r.latest.map(|b| b.to_string()),
                value: r.value.to_string(),
                footnotes: if r.footnotes.is_empty() {
                    Vec::new()
                } else {
                    vec![RawFootnote {
                        code: None,
                        text: Some(r.footnotes.clone()),
                    }]
                },
                calculations: r.calculations.clone(),
                aspects: r.aspects.clone(),
            })
            .collect();

        RawSeries {
            series_id: Some(self.series_id.clone()),
            catalog,
            data,
        }
    }
}
