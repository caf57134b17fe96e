// src/export/write.rs

use anyhow::{bail, Context, Result};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::{Map, Value};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

use super::arrow::to_record_batch;
use crate::cache::short_digest;
use crate::normalize::{Cell, SeriesTable};

/// File stem for a series id: anything outside `[A-Za-z0-9_-]` becomes `_`,
/// and a rewritten id gets a digest suffix so it cannot collide with an id
/// that was already clean.
pub fn file_stem(series_id: &str) -> String {
    let clean: String = series_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if clean == series_id {
        clean
    } else {
        format!("{}-{}", clean, &short_digest(series_id)[..8])
    }
}

/// Write to `<final>.tmp` via `fill`, then rename over `final_path`.
fn write_atomically<F>(final_path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(File) -> Result<()>,
{
    let tmp_path = final_path.with_extension("tmp");
    let f = File::create(&tmp_path).with_context(|| format!("creating {:?}", tmp_path))?;
    fill(f)?;
    fs::rename(&tmp_path, final_path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, final_path))?;
    Ok(())
}

/// Write the table as `<dir>/<series_id>.parquet`. Tables with no retained
/// columns (no rows) are rejected.
pub fn write_parquet<P: AsRef<Path>>(table: &SeriesTable, dir: P) -> Result<PathBuf> {
    if table.columns().is_empty() {
        bail!("series {} has no columns to write", table.series_id());
    }
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    let path = dir.join(format!("{}.parquet", file_stem(table.series_id())));

    let batch = to_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    write_atomically(&path, |f| {
        let mut writer = ArrowWriter::try_new(f, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    })?;

    info!(series = %table.series_id(), rows = table.len(), path = %path.display(), "wrote parquet");
    Ok(path)
}

/// Rows as JSON objects holding only the retained columns.
pub fn to_json_records(table: &SeriesTable) -> Vec<Value> {
    table
        .rows()
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for &column in table.columns() {
                let v = match row.cell(column) {
                    Cell::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
                    Cell::Float(f) => serde_json::Number::from_f64(f)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    Cell::Int(i) => Value::from(i),
                    Cell::UInt(u) => Value::from(u),
                    Cell::Bool(b) => Value::Bool(b),
                    Cell::Text(s) => Value::String(s.to_string()),
                    Cell::Json(j) => j.clone(),
                    Cell::Missing => Value::Null,
                };
                obj.insert(column.name().to_string(), v);
            }
            Value::Object(obj)
        })
        .collect()
}

/// Write the table as a pretty-printed JSON array at `<dir>/<series_id>.json`.
pub fn write_json<P: AsRef<Path>>(table: &SeriesTable, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    let path = dir.join(format!("{}.json", file_stem(table.series_id())));

    let records = to_json_records(table);
    write_atomically(&path, |f| {
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, &records).context("serializing JSON")?;
        w.write_all(b"\n")?;
        w.flush()?;
        Ok(())
    })?;

    info!(series = %table.series_id(), rows = table.len(), path = %path.display(), "wrote json");
    Ok(path)
}
