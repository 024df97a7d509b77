//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9. EMAs seed on the first
//! defined value, so all three lines are defined wherever the input is.

use crate::domain::error::InputError;
use crate::domain::indicator::{IndicatorSeries, difference, ema, require_positive};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdOutput {
    pub line: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

pub fn macd(
    series: &[Option<f64>],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Result<MacdOutput, InputError> {
    require_positive(fast)?;
    require_positive(slow)?;
    require_positive(signal_period)?;

    let line = difference(&ema(series, fast)?, &ema(series, slow)?);
    let signal = ema(&line, signal_period)?;
    let histogram = difference(&line, &signal);
    Ok(MacdOutput {
        line,
        signal,
        histogram,
    })
}
