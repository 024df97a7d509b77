//! Bollinger Bands.
//!
//! Middle = SMA(n)
//! Upper  = Middle + k * STDDEV(n)
//! Lower  = Middle - k * STDDEV(n)
//! STDDEV is the population standard deviation.
//! Warmup: first (n-1) rows are undefined.

use crate::domain::error::InputError;
use crate::domain::indicator::{IndicatorSeries, sma, stddev};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_STD_MULT: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: IndicatorSeries,
    pub middle: IndicatorSeries,
    pub lower: IndicatorSeries,
}

pub fn bbands(
    series: &[Option<f64>],
    period: usize,
    std_mult: f64,
) -> Result<BollingerBands, InputError> {
    let middle = sma(series, period)?;
    let sd = stddev(series, period)?;
    let band = |sign: f64| -> IndicatorSeries {
        middle
            .iter()
            .zip(&sd)
            .map(|(m, s)| Some((*m)? + sign * std_mult * (*s)?))
            .collect()
    };
    Ok(BollingerBands {
        upper: band(1.0),
        lower: band(-1.0),
        middle,
    })
}
