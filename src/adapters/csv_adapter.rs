//! CSV file data adapter.
//!
//! Reads one OHLCV file. Header names are matched case-insensitively;
//! `open`, `high`, `low`, `close` and `volume` are required and a
//! `date`/`timestamp`/`datetime`/`time` column is optional. Without a time
//! column rows are keyed by their position in the file. Empty numeric cells
//! load as undefined values.
//!
//! Also writes the signal table and trade ledger back out as CSV.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::domain::backtest::Trade;
use crate::domain::error::{InputError, StratlangError};
use crate::domain::evaluator::Signals;
use crate::domain::table::{OhlcvBar, PriceTable, RowKey};
use crate::ports::data_port::DataPort;

pub const REQUIRED_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];
pub const TIME_COLUMNS: [&str; 4] = ["date", "timestamp", "datetime", "time"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

const TRADE_COLUMNS: [&str; 7] = [
    "entry_time",
    "exit_time",
    "entry_price",
    "exit_price",
    "pnl",
    "return_pct",
    "bars_held",
];

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file into a table, sorted by time when timestamped.
    pub fn read_table(&self) -> Result<PriceTable, StratlangError> {
        let file = File::open(&self.path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("failed to read {}: {e}", self.path.display()))
        })?;
        let table = parse_table(file)?;
        debug!(path = %self.path.display(), rows = table.len(), "loaded price table");
        Ok(table)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_table(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceTable, StratlangError> {
        let table = self.read_table()?;
        if start.is_none() && end.is_none() {
            return Ok(table);
        }
        let filtered = table.filter_dates(start, end);
        debug!(
            before = table.len(),
            after = filtered.len(),
            ?start,
            ?end,
            "applied date range"
        );
        Ok(filtered)
    }
}

/// Parse OHLCV rows from any reader.
pub fn parse_table<R: Read>(reader: R) -> Result<PriceTable, StratlangError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_lowercase()).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| position(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(InputError::MissingColumns { columns: missing }.into());
    }
    let columns: Vec<usize> = REQUIRED_COLUMNS.iter().filter_map(|c| position(c)).collect();
    let time_column = TIME_COLUMNS.iter().find_map(|c| position(c));

    let mut bars = Vec::new();
    for (n, record) in rdr.records().enumerate() {
        let record = record?;
        let line = record.position().map_or(n + 2, |p| p.line() as usize);
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        let number = |idx: usize, column: &str| -> Result<f64, InputError> {
            let raw = cell(idx);
            if raw.is_empty() {
                return Ok(f64::NAN);
            }
            raw.parse().map_err(|_| InputError::InvalidValue {
                row: line,
                column: column.to_string(),
                value: raw.to_string(),
            })
        };

        let key = match time_column {
            Some(idx) => RowKey::Time(parse_time(cell(idx)).ok_or_else(|| {
                InputError::InvalidValue {
                    row: line,
                    column: headers[idx].clone(),
                    value: cell(idx).to_string(),
                }
            })?),
            None => RowKey::Index(n),
        };
        bars.push(OhlcvBar {
            key,
            open: number(columns[0], "open")?,
            high: number(columns[1], "high")?,
            low: number(columns[2], "low")?,
            close: number(columns[3], "close")?,
            volume: number(columns[4], "volume")?,
        });
    }

    if time_column.is_some() {
        bars.sort_by_key(|b| b.key);
    }
    Ok(PriceTable::from_bars(&bars)?)
}

/// Accepts ISO dates and datetimes, RFC 3339 with offsets (converted to UTC)
/// and a few common date layouts.
pub fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

#[derive(Serialize)]
struct SignalRow<'a> {
    key: &'a RowKey,
    entry: u8,
    exit: u8,
}

/// `key,entry,exit` with 0/1 flags, one line per row.
pub fn write_signals<W: Write>(writer: W, signals: &Signals) -> Result<(), StratlangError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if signals.is_empty() {
        wtr.write_record(["key", "entry", "exit"])?;
    }
    for ((key, entry), exit) in signals.keys.iter().zip(&signals.entry).zip(&signals.exit) {
        wtr.serialize(SignalRow {
            key,
            entry: u8::from(*entry),
            exit: u8::from(*exit),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trades<W: Write>(writer: W, trades: &[Trade]) -> Result<(), StratlangError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if trades.is_empty() {
        wtr.write_record(TRADE_COLUMNS)?;
    }
    for trade in trades {
        wtr.serialize(trade)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_signals(path: &Path, signals: &Signals) -> Result<(), StratlangError> {
    write_signals(File::create(path)?, signals)?;
    debug!(path = %path.display(), rows = signals.len(), "exported signals");
    Ok(())
}

pub fn export_trades(path: &Path, trades: &[Trade]) -> Result<(), StratlangError> {
    write_trades(File::create(path)?, trades)?;
    debug!(path = %path.display(), trades = trades.len(), "exported trades");
    Ok(())
}
