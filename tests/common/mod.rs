#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use stratlang::domain::error::StratlangError;
pub use stratlang::domain::table::{OhlcvBar, PriceTable, RowKey};
use stratlang::ports::data_port::DataPort;

/// In-memory data port. Optionally fails every fetch with the given reason.
pub struct MockDataPort {
    pub table: PriceTable,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(table: PriceTable) -> Self {
        Self { table, error: None }
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_table(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceTable, StratlangError> {
        if let Some(reason) = &self.error {
            return Err(StratlangError::Io(std::io::Error::other(reason.clone())));
        }
        Ok(self.table.filter_dates(start, end))
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// One bar per calendar day from `start`, with open/high/low around close.
pub fn daily_bars(start: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let first = date(start);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            key: RowKey::Time(
                (first + Days::new(i as u64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0 * (i as f64 + 1.0),
        })
        .collect()
}

pub fn daily_table(start: &str, closes: &[f64]) -> PriceTable {
    PriceTable::from_bars(&daily_bars(start, closes)).unwrap()
}

/// CSV text for `daily_bars`, with a `date` column.
pub fn csv_text(start: &str, closes: &[f64]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for bar in daily_bars(start, closes) {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            bar.key, bar.open, bar.high, bar.low, bar.close, bar.volume
        )
        .unwrap();
    }
    out
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Closes with a clean SMA(2)/SMA(4) golden cross and a later death cross.
pub const SWING_CLOSES: [f64; 12] = [
    10.0, 10.0, 10.0, 10.0, 12.0, 14.0, 16.0, 16.0, 14.0, 11.0, 9.0, 8.0,
];
