// src/fetch/request.rs

use anyhow::{bail, Result};
use serde::Serialize;

/// What to ask the API for: a set of series over an inclusive year range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub series_ids: Vec<String>,
    pub start_year: i32,
    pub end_year: i32,
    pub catalog: bool,
    pub calculations: bool,
    pub aspects: bool,
}

impl SeriesRequest {
    pub fn new(series_ids: Vec<String>, start_year: i32, end_year: i32) -> Self {
        Self {
            series_ids,
            start_year,
            end_year,
            catalog: false,
            calculations: false,
            aspects: false,
        }
    }

    pub fn with_catalog(mut self, catalog: bool) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_calculations(mut self, calculations: bool) -> Self {
        self.calculations = calculations;
        self
    }

    pub fn with_aspects(mut self, aspects: bool) -> Self {
        self.aspects = aspects;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.series_ids.is_empty() {
            bail!("request names no series");
        }
        if self.series_ids.iter().any(|s| s.trim().is_empty()) {
            bail!("request contains a blank series id");
        }
        if self.start_year > self.end_year {
            bail!(
                "start year {} is after end year {}",
                self.start_year,
                self.end_year
            );
        }
        Ok(())
    }

    pub(crate) fn body<'a>(&'a self, registration_key: Option<&'a str>) -> RequestBody<'a> {
        RequestBody {
            seriesid: &self.series_ids,
            startyear: self.start_year.to_string(),
            endyear: self.end_year.to_string(),
            registrationkey: registration_key,
            catalog: self.catalog,
            calculations: self.calculations,
            aspects: self.aspects,
        }
    }
}

/// JSON body of the POST, using the API's field names.
#[derive(Debug, Serialize)]
pub(crate) struct RequestBody<'a> {
    seriesid: &'a [String],
    startyear: String,
    endyear: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    registrationkey: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    catalog: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    calculations: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    aspects: bool,
}
