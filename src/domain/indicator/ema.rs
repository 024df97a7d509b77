//! Exponential Moving Average.
//!
//! alpha = 2/(n+1), EMA[i] = alpha*x[i] + (1-alpha)*EMA[i-1].
//! Seeded with the first defined observation, so output is defined from that
//! row onward. Later undefined inputs carry the previous average forward.

use crate::domain::error::InputError;
use crate::domain::indicator::{IndicatorSeries, require_positive};

pub fn ema(series: &[Option<f64>], window: usize) -> Result<IndicatorSeries, InputError> {
    require_positive(window)?;
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut prev: Option<f64> = None;
    Ok(series
        .iter()
        .map(|x| {
            prev = match (*x, prev) {
                (Some(x), None) => Some(x),
                (Some(x), Some(p)) => Some(alpha * x + (1.0 - alpha) * p),
                (None, p) => p,
            };
            prev
        })
        .collect())
}
