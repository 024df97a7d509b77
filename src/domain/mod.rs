//! Core domain: the rule language, indicators, evaluation and backtesting.

pub mod table;
pub mod indicator;
pub mod ast;
pub mod vocabulary;
pub mod lexer;
pub mod parser;
pub mod value;
pub mod evaluator;
pub mod backtest;
pub mod metrics;
pub mod translate;
pub mod config_validation;
pub mod error;
