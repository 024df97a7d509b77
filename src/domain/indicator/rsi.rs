//! Relative Strength Index.
//!
//! gain = max(dx, 0), loss = max(-dx, 0), averaged with a simple rolling mean
//! over the last n changes (not Wilder's recursive smoothing).
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! avg_loss == 0 leaves the ratio undefined, so that row is undefined too.
//! Warmup: first n rows are undefined.

use crate::domain::error::InputError;
use crate::domain::indicator::{IndicatorSeries, require_positive, trailing};

pub const DEFAULT_WINDOW: usize = 14;

pub fn rsi(series: &[Option<f64>], window: usize) -> Result<IndicatorSeries, InputError> {
    require_positive(window)?;
    let changes: Vec<Option<f64>> = (0..series.len())
        .map(|i| {
            if i == 0 {
                None
            } else {
                Some(series[i]? - series[i - 1]?)
            }
        })
        .collect();

    Ok((0..series.len())
        .map(|i| {
            let deltas = trailing(&changes, i, window)?;
            let avg_gain = deltas.iter().map(|d| d.max(0.0)).sum::<f64>() / window as f64;
            let avg_loss = deltas.iter().map(|d| (-d).max(0.0)).sum::<f64>() / window as f64;
            if avg_loss == 0.0 {
                return None;
            }
            Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::defined;
    use approx::assert_relative_eq;

    #[test]
    fn rsi_warmup_is_window_rows() {
        let out = rsi(&defined(&[10.0, 11.0, 10.5, 11.5, 11.0, 12.0]), 3).unwrap();
        assert!(out[..3].iter().all(Option::is_none));
        assert!(out[3..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_known_value() {
        // changes: +1, -0.5, +1 → gain 2/3, loss 0.5/3, RS = 4
        let out = rsi(&defined(&[10.0, 11.0, 10.5, 11.5]), 3).unwrap();
        assert_relative_eq!(out[3].unwrap(), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn rsi_zero_loss_is_undefined() {
        let out = rsi(&defined(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2).unwrap();
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let out = rsi(&defined(&[5.0, 4.0, 3.0, 2.0]), 2).unwrap();
        assert_relative_eq!(out[3].unwrap(), 0.0);
    }

    #[test]
    fn rsi_bounded() {
        let prices = [44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1, 45.9, 46.0];
        let out = rsi(&defined(&prices), 4).unwrap();
        for v in out.into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn rsi_rejects_zero_window() {
        assert!(rsi(&defined(&[1.0, 2.0]), 0).is_err());
    }
}
