//! Time-ordered OHLCV table the evaluator and backtest read from.
//!
//! Columns are stored densely; a NaN cell (for example an empty CSV field) is
//! exposed to the evaluator as an undefined value.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::domain::error::InputError;

/// Row key. Tables loaded without a time column are keyed by row number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    Index(usize),
    Time(NaiveDateTime),
}

impl RowKey {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            RowKey::Index(_) => None,
            RowKey::Time(t) => Some(t.date()),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Index(i) => write!(f, "{i}"),
            RowKey::Time(t) if t.time() == chrono::NaiveTime::MIN => {
                write!(f, "{}", t.format("%Y-%m-%d"))
            }
            RowKey::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl Serialize for RowKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Named input series. `Date` is derived from the row key rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    Open,
    High,
    Low,
    Close,
    Volume,
    Date,
}

impl Series {
    pub const ALL: [Series; 6] = [
        Series::Open,
        Series::High,
        Series::Low,
        Series::Close,
        Series::Volume,
        Series::Date,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Series::Open => "open",
            Series::High => "high",
            Series::Low => "low",
            Series::Close => "close",
            Series::Volume => "volume",
            Series::Date => "date",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Series> {
        Series::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub key: RowKey,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Columnar price/volume table with strictly increasing row keys.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    keys: Vec<RowKey>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

impl PriceTable {
    pub fn new(
        keys: Vec<RowKey>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Result<Self, InputError> {
        let expected = keys.len();
        for (name, column) in [
            ("open", &open),
            ("high", &high),
            ("low", &low),
            ("close", &close),
            ("volume", &volume),
        ] {
            if column.len() != expected {
                return Err(InputError::ColumnLength {
                    column: name.to_string(),
                    expected,
                    actual: column.len(),
                });
            }
        }
        if let Some(row) = keys.windows(2).position(|w| w[1] <= w[0]) {
            return Err(InputError::NonIncreasingIndex { row: row + 1 });
        }
        Ok(Self {
            keys,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Build from bars already in temporal order.
    pub fn from_bars(bars: &[OhlcvBar]) -> Result<Self, InputError> {
        Self::new(
            bars.iter().map(|b| b.key).collect(),
            bars.iter().map(|b| b.open).collect(),
            bars.iter().map(|b| b.high).collect(),
            bars.iter().map(|b| b.low).collect(),
            bars.iter().map(|b| b.close).collect(),
            bars.iter().map(|b| b.volume).collect(),
        )
    }

    /// Index-keyed table where open, high and low equal close and volume is zero.
    pub fn from_closes(closes: &[f64]) -> Self {
        Self {
            keys: (0..closes.len()).map(RowKey::Index).collect(),
            open: closes.to_vec(),
            high: closes.to_vec(),
            low: closes.to_vec(),
            close: closes.to_vec(),
            volume: vec![0.0; closes.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    /// Column values with NaN mapped to undefined. `date` yields Unix seconds
    /// for timestamped rows and the row number otherwise.
    pub fn series(&self, name: Series) -> Vec<Option<f64>> {
        let column = match name {
            Series::Open => &self.open,
            Series::High => &self.high,
            Series::Low => &self.low,
            Series::Close => &self.close,
            Series::Volume => &self.volume,
            Series::Date => {
                return self
                    .keys
                    .iter()
                    .map(|k| match k {
                        RowKey::Index(i) => Some(*i as f64),
                        RowKey::Time(t) => Some(t.and_utc().timestamp() as f64),
                    })
                    .collect();
            }
        };
        column.iter().map(|v| (!v.is_nan()).then_some(*v)).collect()
    }

    pub fn bar(&self, i: usize) -> Option<OhlcvBar> {
        (i < self.len()).then(|| OhlcvBar {
            key: self.keys[i],
            open: self.open[i],
            high: self.high[i],
            low: self.low[i],
            close: self.close[i],
            volume: self.volume[i],
        })
    }

    /// Rows whose date lies in `[start, end]`. Index-keyed rows carry no date
    /// and are always kept.
    pub fn filter_dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> PriceTable {
        let keep: Vec<usize> = self
            .keys
            .iter()
            .enumerate()
            .filter(|(_, k)| match k.date() {
                None => true,
                Some(d) => start.is_none_or(|s| d >= s) && end.is_none_or(|e| d <= e),
            })
            .map(|(i, _)| i)
            .collect();
        let pick = |col: &[f64]| keep.iter().map(|&i| col[i]).collect::<Vec<f64>>();
        PriceTable {
            keys: keep.iter().map(|&i| self.keys[i]).collect(),
            open: pick(&self.open),
            high: pick(&self.high),
            low: pick(&self.low),
            close: pick(&self.close),
            volume: pick(&self.volume),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> RowKey {
        RowKey::Time(
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn bar(key: RowKey, close: f64) -> OhlcvBar {
        OhlcvBar {
            key,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn from_bars_preserves_order() {
        let table = PriceTable::from_bars(&[bar(day(1), 10.0), bar(day(2), 11.0)]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.close(), &[10.0, 11.0]);
        assert_eq!(table.series(Series::High), vec![Some(11.0), Some(12.0)]);
    }

    #[test]
    fn rejects_non_increasing_keys() {
        let err = PriceTable::from_bars(&[bar(day(2), 10.0), bar(day(2), 11.0)]).unwrap_err();
        assert_eq!(err, InputError::NonIncreasingIndex { row: 1 });
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = PriceTable::new(
            vec![RowKey::Index(0), RowKey::Index(1)],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0],
            vec![1.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, InputError::ColumnLength { ref column, .. } if column == "close"));
    }

    #[test]
    fn nan_cells_are_undefined() {
        let table = PriceTable::from_closes(&[1.0, f64::NAN, 3.0]);
        assert_eq!(table.series(Series::Close), vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn date_series_uses_key() {
        let table = PriceTable::from_closes(&[5.0, 6.0]);
        assert_eq!(table.series(Series::Date), vec![Some(0.0), Some(1.0)]);

        let timed = PriceTable::from_bars(&[bar(day(1), 1.0)]).unwrap();
        let secs = timed.series(Series::Date)[0].unwrap();
        assert_eq!(secs, 1_704_067_200.0);
    }

    #[test]
    fn series_lookup_is_case_insensitive() {
        assert_eq!(Series::from_name("CLOSE"), Some(Series::Close));
        assert_eq!(Series::from_name("Volume"), Some(Series::Volume));
        assert_eq!(Series::from_name("price"), None);
    }

    #[test]
    fn filter_dates_is_inclusive() {
        let table = PriceTable::from_bars(&[
            bar(day(1), 1.0),
            bar(day(2), 2.0),
            bar(day(3), 3.0),
            bar(day(4), 4.0),
        ])
        .unwrap();
        let d = |n| NaiveDate::from_ymd_opt(2024, 1, n).unwrap();
        let filtered = table.filter_dates(Some(d(2)), Some(d(3)));
        assert_eq!(filtered.close(), &[2.0, 3.0]);
        assert_eq!(table.filter_dates(None, None).len(), 4);
    }

    #[test]
    fn row_key_display() {
        assert_eq!(day(5).to_string(), "2024-01-05");
        assert_eq!(RowKey::Index(7).to_string(), "7");
    }
}
