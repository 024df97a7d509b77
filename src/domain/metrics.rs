//! Summary statistics over a backtest's equity curve and trade ledger.

use serde::Serialize;

use crate::domain::backtest::{EquityPoint, Trade};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    /// (final equity multiplier - 1) * 100.
    pub total_return_pct: f64,
    /// Worst decline from a running peak, in percent. Zero or negative.
    pub max_drawdown_pct: f64,
    pub num_trades: usize,
    /// Annualized mean over population stddev of bar-to-bar equity returns.
    pub sharpe: f64,
    /// Fraction of trades with a positive return.
    pub win_rate: f64,
}

impl Stats {
    pub fn compute(equity_curve: &[EquityPoint], trades: &[Trade]) -> Self {
        let final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(1.0);
        let winners = trades.iter().filter(|t| t.return_pct > 0.0).count();
        let win_rate = if trades.is_empty() {
            0.0
        } else {
            winners as f64 / trades.len() as f64
        };

        Stats {
            total_return_pct: (final_equity - 1.0) * 100.0,
            max_drawdown_pct: compute_drawdown(equity_curve) * 100.0,
            num_trades: trades.len(),
            sharpe: compute_sharpe(equity_curve),
            win_rate,
        }
    }
}

/// Minimum of `equity / running_peak - 1`. Points under a non-positive peak
/// contribute no drawdown.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            let dd = point.equity / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

fn compute_sharpe(equity_curve: &[EquityPoint]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        (mean / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}
