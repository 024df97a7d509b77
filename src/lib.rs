//! stratlang: a small trading-rule language with a long-only backtester.
//!
//! Strategies are written as `ENTRY: <expr> EXIT: <expr>` over OHLCV
//! series, or described in English and translated to that form first.
//! Domain logic lives in [`domain`], port traits in [`ports`] and the file
//! based implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
