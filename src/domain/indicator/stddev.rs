//! Rolling population standard deviation.
//!
//! STDDEV(n)[i] = sqrt(sum((x[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//! Warmup: first (n-1) rows are undefined.

use crate::domain::error::InputError;
use crate::domain::indicator::{IndicatorSeries, require_positive, trailing};

pub fn stddev(series: &[Option<f64>], window: usize) -> Result<IndicatorSeries, InputError> {
    require_positive(window)?;
    Ok((0..series.len())
        .map(|i| {
            let values = trailing(series, i, window)?;
            let mean = values.iter().sum::<f64>() / window as f64;
            let variance = values
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / window as f64;
            Some(variance.sqrt())
        })
        .collect())
}
