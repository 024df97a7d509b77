//! Technical indicators over time-ordered numeric sequences.
//!
//! Every function returns a sequence aligned with its input. `None` marks rows
//! where the lookback window is not yet full or touches an undefined input.
//! Non-positive windows are rejected with [`InputError::NonPositiveWindow`].

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::{BollingerBands, bbands};
pub use ema::ema;
pub use macd::{MacdOutput, macd};
pub use rsi::rsi;
pub use sma::sma;
pub use stddev::stddev;

use crate::domain::error::InputError;

/// Aligned indicator output; `None` is "not available".
pub type IndicatorSeries = Vec<Option<f64>>;

pub(crate) fn require_positive(window: usize) -> Result<(), InputError> {
    if window == 0 {
        return Err(InputError::NonPositiveWindow { window: 0 });
    }
    Ok(())
}

/// The `window` values ending at `i`, or `None` if the window is not full or
/// contains an undefined value.
pub(crate) fn trailing(series: &[Option<f64>], i: usize, window: usize) -> Option<Vec<f64>> {
    if i + 1 < window {
        return None;
    }
    series[i + 1 - window..=i].iter().copied().collect()
}

/// Elementwise `a - b`, undefined where either side is.
pub(crate) fn difference(a: &[Option<f64>], b: &[Option<f64>]) -> IndicatorSeries {
    a.iter()
        .zip(b)
        .map(|(x, y)| Some((*x)? - (*y)?))
        .collect()
}

#[cfg(test)]
pub(crate) fn defined(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}
