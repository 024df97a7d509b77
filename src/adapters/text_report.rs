//! Plain-text report adapter implementing ReportPort.
//!
//! Renders the strategy, the headline metrics and the trade log as
//! Markdown-style tables. The same text is printed by the CLI and written
//! to the `[export] report` file when one is configured.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::domain::ast::Strategy;
use crate::domain::backtest::{BacktestResult, Trade};
use crate::domain::error::StratlangError;
use crate::domain::metrics::Stats;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, result: &BacktestResult, strategy: &Strategy) -> String {
        let mut output = String::from("# Backtest Report\n\n");
        output.push_str(&render_strategy(strategy));
        output.push_str(&render_metrics_table(&result.stats, result.equity_curve.len()));
        output.push_str(&render_trade_log(&result.trades));
        output
    }
}

fn render_strategy(strategy: &Strategy) -> String {
    format!(
        "## Strategy\n\nENTRY: {}\nEXIT: {}\n\n",
        strategy.entry, strategy.exit
    )
}

fn render_metrics_table(stats: &Stats, bars: usize) -> String {
    let mut output = String::from("## Performance Metrics\n\n");
    output.push_str("| Metric | Value |\n| --- | --- |\n");
    output.push_str(&format!("| Bars | {} |\n", bars));
    output.push_str(&format!(
        "| Total Return | {:.2}% |\n",
        stats.total_return_pct
    ));
    output.push_str(&format!(
        "| Max Drawdown | {:.2}% |\n",
        stats.max_drawdown_pct
    ));
    output.push_str(&format!("| Trades | {} |\n", stats.num_trades));
    output.push_str(&format!("| Sharpe Ratio | {:.2} |\n", stats.sharpe));
    output.push_str(&format!("| Win Rate | {:.1}% |\n", stats.win_rate * 100.0));
    output.push('\n');
    output
}

fn render_trade_log(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return String::from("## Trade Log\n\nNo trades executed.\n");
    }

    let mut output = String::from("## Trade Log\n\n");
    output.push_str("| # | Entry | Exit | Entry Price | Exit Price | PnL | Return | Bars |\n");
    output.push_str("| --- | --- | --- | --- | --- | --- | --- | --- |\n");

    for (i, trade) in trades.iter().enumerate() {
        output.push_str(&format!(
            "| {} | {} | {} | {:.4} | {:.4} | {:.4} | {:.2}% | {} |\n",
            i + 1,
            trade.entry_time,
            trade.exit_time,
            trade.entry_price,
            trade.exit_price,
            trade.pnl,
            trade.return_pct * 100.0,
            trade.bars_held,
        ));
    }
    output
}

impl ReportPort for TextReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        output_path: &Path,
    ) -> Result<(), StratlangError> {
        fs::write(output_path, self.render(result, strategy))?;
        debug!(path = %output_path.display(), "wrote text report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestOptions, run_backtest};
    use crate::domain::evaluator::generate_signals;
    use crate::domain::parser::parse;
    use crate::domain::table::PriceTable;
    use tempfile::TempDir;

    fn sample() -> (BacktestResult, Strategy) {
        let strategy = parse("ENTRY: close > 105 EXIT: close > 115").unwrap();
        let table = PriceTable::from_closes(&[100.0, 110.0, 115.0, 120.0]);
        let signals = generate_signals(&strategy, &table).unwrap();
        let result = run_backtest(&table, &signals, &BacktestOptions::default()).unwrap();
        (result, strategy)
    }

    #[test]
    fn render_includes_all_sections() {
        let (result, strategy) = sample();
        let text = TextReportAdapter::new().render(&result, &strategy);
        assert!(text.contains("ENTRY: close > 105"));
        assert!(text.contains("EXIT: close > 115"));
        assert!(text.contains("| Total Return | 9.09% |"));
        assert!(text.contains("| Trades | 1 |"));
        assert!(text.contains("| Win Rate | 100.0% |"));
        assert!(text.contains("| 1 | 1 | 3 | 110.0000 | 120.0000 | 10.0000 | 9.09% | 2 |"));
    }

    #[test]
    fn render_without_trades() {
        let strategy = parse("ENTRY: FALSE EXIT: FALSE").unwrap();
        let table = PriceTable::from_closes(&[1.0, 2.0]);
        let signals = generate_signals(&strategy, &table).unwrap();
        let result = run_backtest(&table, &signals, &BacktestOptions::default()).unwrap();
        let text = TextReportAdapter::new().render(&result, &strategy);
        assert!(text.contains("No trades executed."));
        assert!(text.contains("| Total Return | 0.00% |"));
    }

    #[test]
    fn write_creates_report_file() {
        let (result, strategy) = sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        TextReportAdapter::new().write(&result, &strategy, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, TextReportAdapter::new().render(&result, &strategy));
    }
}
