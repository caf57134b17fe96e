// src/fetch/mod.rs

//! Retrieval of raw timeseries payloads from the statistics API.

pub mod client;
pub mod request;

pub use client::{check_status, BlsClient};
pub use request::SeriesRequest;
