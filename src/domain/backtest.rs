//! Long-only backtest engine.
//!
//! Two-state machine (flat, long) stepped once per row in table order:
//!
//! - flat and entry[i]: go long at close[i] inflated by the slippage.
//! - else long and exit[i]: close at close[i] deflated by the slippage, record
//!   a [`Trade`] and compound equity by `1 + return_pct * position_size`
//!   from its value at entry.
//! - else long with mark-to-market: compound equity by the bar's
//!   close-to-close return scaled by `position_size`.
//!
//! Rows with an undefined close neither open, close nor mark a position.
//! Because the branches are exclusive, a row can never both open and close a
//! trade. A position still open after the last row is not reported.

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::error::InputError;
use crate::domain::evaluator::Signals;
use crate::domain::metrics::Stats;
use crate::domain::table::{PriceTable, RowKey};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOptions {
    /// Fraction of equity committed to each trade.
    pub position_size: f64,
    /// Slippage in basis points applied against the trader on both fills.
    pub slippage_bps: f64,
    /// Flat fee per round trip, in price units.
    pub fee_per_trade: f64,
    pub mark_to_market: bool,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            position_size: 1.0,
            slippage_bps: 0.0,
            fee_per_trade: 0.0,
            mark_to_market: false,
        }
    }
}

pub fn apply_slippage_entry(price: f64, slippage_bps: f64) -> f64 {
    price * (1.0 + slippage_bps / 10_000.0)
}

pub fn apply_slippage_exit(price: f64, slippage_bps: f64) -> f64 {
    price * (1.0 - slippage_bps / 10_000.0)
}

/// A completed round trip. Created once, when the position closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_time: RowKey,
    pub exit_time: RowKey,
    pub entry_price: f64,
    pub exit_price: f64,
    /// exit_price - entry_price, per unit.
    pub pnl: f64,
    /// pnl / entry_price, net of fee_per_trade / entry_price.
    pub return_pct: f64,
    pub bars_held: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub key: RowKey,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub stats: Stats,
    pub equity_curve: Vec<EquityPoint>,
}

#[derive(Clone, Copy)]
enum Position {
    Flat,
    Long {
        row: usize,
        entry_price: f64,
        equity_at_entry: f64,
    },
}

pub fn run_backtest(
    table: &PriceTable,
    signals: &Signals,
    options: &BacktestOptions,
) -> Result<BacktestResult, InputError> {
    let len = table.len();
    for (side, actual) in [("entry", signals.entry.len()), ("exit", signals.exit.len())] {
        if actual != len {
            return Err(InputError::SignalLength {
                side,
                expected: len,
                actual,
            });
        }
    }

    let keys = table.keys();
    let close = table.close();
    let mut position = Position::Flat;
    let mut equity = 1.0_f64;
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(len);

    for i in 0..len {
        match position {
            Position::Flat if signals.entry[i] && close[i].is_finite() => {
                let entry_price = apply_slippage_entry(close[i], options.slippage_bps);
                debug!(row = i, key = %keys[i], price = entry_price, "open long");
                position = Position::Long {
                    row: i,
                    entry_price,
                    equity_at_entry: equity,
                };
            }
            Position::Long {
                row,
                entry_price,
                equity_at_entry,
            } if signals.exit[i] && close[i].is_finite() => {
                let exit_price = apply_slippage_exit(close[i], options.slippage_bps);
                let pnl = exit_price - entry_price;
                let return_pct = pnl / entry_price - options.fee_per_trade / entry_price;
                equity = equity_at_entry * (1.0 + return_pct * options.position_size);
                debug!(row = i, key = %keys[i], price = exit_price, return_pct, "close long");
                trades.push(Trade {
                    entry_time: keys[row],
                    exit_time: keys[i],
                    entry_price,
                    exit_price,
                    pnl,
                    return_pct,
                    bars_held: i - row,
                });
                position = Position::Flat;
            }
            Position::Long { .. } if options.mark_to_market && i > 0 => {
                let prev = close[i - 1];
                if !prev.is_finite() || !close[i].is_finite() {
                    warn!(row = i, "undefined close, skipping mark-to-market");
                } else if prev != 0.0 {
                    equity *= 1.0 + (close[i] / prev - 1.0) * options.position_size;
                } else {
                    warn!(row = i, "previous close is zero, skipping mark-to-market");
                }
            }
            _ => {}
        }
        equity_curve.push(EquityPoint {
            key: keys[i],
            equity,
        });
    }

    if let Position::Long { row, .. } = position {
        debug!(opened_at = %keys[row], "position still open at end of data, not counted");
    }

    let stats = Stats::compute(&equity_curve, &trades);
    Ok(BacktestResult {
        trades,
        stats,
        equity_curve,
    })
}
