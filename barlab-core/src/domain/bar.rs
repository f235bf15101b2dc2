//! Bar — the fundamental market data unit.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single position in the dataset.
///
/// `index` is zero at dataset start and increases by one per bar. Absent
/// price fields are represented as NaN (void bar). A historical bar never
/// changes once committed; the forming realtime bar is re-delivered with
/// revised values until its close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub index: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
}

impl Bar {
    /// Build a daily bar: open at midnight UTC, close at the next midnight.
    pub fn daily(index: u64, date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        let open_time = date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always a valid time")
            .and_utc();
        Self {
            index,
            open,
            high,
            low,
            close,
            volume,
            open_time,
            close_time: open_time + Duration::days(1),
        }
    }

    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.close_time > self.open_time
    }
}
