// src/export/mod.rs

//! Output side: Arrow batches, Parquet/JSON files and chart-ready groupings.

pub mod arrow;
pub mod chart;
pub mod write;

pub use self::arrow::{build_arrow_schema, to_record_batch};
pub use chart::chart_by_year;
pub use write::{to_json_records, write_json, write_parquet};
