//! CSV bar loading and writing.
//!
//! Expected header: `date,open,high,low,close,volume`, one daily bar per
//! row, dates in `YYYY-MM-DD`. Indices are assigned in row order.

use crate::domain::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors surfaced while loading or writing a bar file.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: bad date {value:?}")]
    BadDate { row: usize, value: String },

    #[error("no bars in {0}")]
    Empty(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Load a bar series from a CSV file. Row order defines bar indices.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>, FeedError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();

    for (row, record) in reader.deserialize::<CsvRow>().enumerate() {
        let record = record?;
        let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").map_err(|_| {
            FeedError::BadDate {
                row: row + 1,
                value: record.date.clone(),
            }
        })?;
        bars.push(Bar::daily(
            bars.len() as u64,
            date,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    if bars.is_empty() {
        return Err(FeedError::Empty(path.display().to_string()));
    }
    Ok(bars)
}

/// Write a bar series as CSV, the inverse of `load_bars`.
pub fn write_bars(path: &Path, bars: &[Bar]) -> Result<(), FeedError> {
    let mut writer = csv::Writer::from_path(path)?;
    for bar in bars {
        writer.serialize(CsvRow {
            date: bar.open_time.date_naive().format("%Y-%m-%d").to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })?;
    }
    writer.flush()?;
    Ok(())
}
