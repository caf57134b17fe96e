// src/export/chart.rs

use std::collections::BTreeMap;

use crate::normalize::SeriesTable;

/// `(month, value)` points grouped by year, ready for a month-on-x-axis line
/// chart with one line per year. Points inside a year stay in date order.
pub fn chart_by_year(table: &SeriesTable) -> BTreeMap<i32, Vec<(u32, f64)>> {
    let mut lines: BTreeMap<i32, Vec<(u32, f64)>> = BTreeMap::new();
    for row in table.rows() {
        lines.entry(row.year).or_default().push((row.month, row.value));
    }
    lines
}
