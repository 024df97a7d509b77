//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(x[i-n+1..=i])
//! Warmup: first (n-1) rows are undefined.

use crate::domain::error::InputError;
use crate::domain::indicator::{IndicatorSeries, require_positive, trailing};

pub fn sma(series: &[Option<f64>], window: usize) -> Result<IndicatorSeries, InputError> {
    require_positive(window)?;
    Ok((0..series.len())
        .map(|i| trailing(series, i, window).map(|w| w.iter().sum::<f64>() / window as f64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::defined;
    use approx::assert_relative_eq;

    #[test]
    fn sma_warmup_and_values() {
        let out = sma(&defined(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_relative_eq!(out[2].unwrap(), 2.0);
        assert_relative_eq!(out[3].unwrap(), 3.0);
        assert_relative_eq!(out[4].unwrap(), 4.0);
    }

    #[test]
    fn sma_window_one_is_identity() {
        let input = defined(&[7.0, 8.5, 9.0]);
        assert_eq!(sma(&input, 1).unwrap(), input);
    }

    #[test]
    fn sma_window_longer_than_series() {
        let out = sma(&defined(&[1.0, 2.0]), 5).unwrap();
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn sma_undefined_input_poisons_window() {
        let out = sma(&[Some(1.0), None, Some(3.0), Some(5.0)], 2).unwrap();
        assert_eq!(out, vec![None, None, None, Some(4.0)]);
    }

    #[test]
    fn sma_rejects_zero_window() {
        let err = sma(&defined(&[1.0]), 0).unwrap_err();
        assert_eq!(err, InputError::NonPositiveWindow { window: 0 });
    }
}
