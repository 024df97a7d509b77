//! Report generation port trait.

use std::path::Path;

use crate::domain::ast::Strategy;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::StratlangError;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        output_path: &Path,
    ) -> Result<(), StratlangError>;
}
