// src/export/arrow.rs

use anyhow::{Context, Result};
use arrow::{
    array::{
        ArrayRef, BooleanArray, Date32Array, Float64Array, Int32Array, StringArray, UInt32Array,
    },
    datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

use crate::normalize::{Cell, Column, SeriesTable};

/// Days from 0001-01-01 (CE) to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Map a table column to its Arrow type.
///
/// - date                        → Date32
/// - value, percent_change       → Float64
/// - year                        → Int32
/// - month                       → UInt32
/// - latest                      → Boolean
/// - everything else             → Utf8 (calculations as JSON text)
pub fn arrow_type(column: Column) -> DataType {
    match column {
        Column::Date => DataType::Date32,
        Column::Value | Column::PercentChange => DataType::Float64,
        Column::Year => DataType::Int32,
        Column::Month => DataType::UInt32,
        Column::Latest => DataType::Boolean,
        Column::SeriesId
        | Column::SeriesTitle
        | Column::Period
        | Column::PeriodName
        | Column::SurveyName
        | Column::Catalog
        | Column::Calculations
        | Column::Aspects
        | Column::Footnotes => DataType::Utf8,
    }
}

/// Schema holding only the table's retained columns.
pub fn build_arrow_schema(table: &SeriesTable) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = table
        .columns()
        .iter()
        .map(|&c| ArrowField::new(c.name(), arrow_type(c), /* nullable = */ true))
        .collect();
    Arc::new(ArrowSchema::new(fields))
}

pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn column_array(table: &SeriesTable, column: Column) -> ArrayRef {
    let cells = table.rows().iter().map(|r| r.cell(column));
    match arrow_type(column) {
        DataType::Date32 => Arc::new(Date32Array::from(
            cells
                .map(|c| match c {
                    Cell::Date(d) => Some(days_since_epoch(d)),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Float64 => Arc::new(Float64Array::from(
            cells
                .map(|c| match c {
                    Cell::Float(v) => Some(v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Int32 => Arc::new(Int32Array::from(
            cells
                .map(|c| match c {
                    Cell::Int(v) => Some(v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::UInt32 => Arc::new(UInt32Array::from(
            cells
                .map(|c| match c {
                    Cell::UInt(v) => Some(v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Boolean => Arc::new(BooleanArray::from(
            cells
                .map(|c| match c {
                    Cell::Bool(v) => Some(v),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            cells
                .map(|c| match c {
                    Cell::Text(s) => Some(s.to_string()),
                    Cell::Json(v) => Some(v.to_string()),
                    _ => None,
                })
                .collect::<Vec<Option<String>>>(),
        )),
    }
}

/// One `RecordBatch` per table; pruned columns are not materialized.
pub fn to_record_batch(table: &SeriesTable) -> Result<RecordBatch> {
    let schema = build_arrow_schema(table);
    let arrays: Vec<ArrayRef> = table
        .columns()
        .iter()
        .map(|&c| column_array(table, c))
        .collect();
    let options = RecordBatchOptions::new().with_row_count(Some(table.len()));
    RecordBatch::try_new_with_options(schema, arrays, &options)
        .with_context(|| format!("building record batch for {}", table.series_id()))
}
