//! End-to-end tests through the library API: parse, evaluate, backtest.
//!
//! Price data comes from `MockDataPort`, so nothing here touches the disk.

mod common;

use approx::assert_relative_eq;
use common::*;
use stratlang::domain::backtest::{BacktestOptions, run_backtest};
use stratlang::domain::error::{EvalError, InputError, ParseErrorKind, StratlangError};
use stratlang::domain::evaluator::{evaluate, generate_signals};
use stratlang::domain::parser::{parse, parse_expression};
use stratlang::domain::translate::TranslatorKind;
use stratlang::domain::value::Value;
use stratlang::ports::data_port::DataPort;

fn backtest(dsl: &str, table: &PriceTable, options: &BacktestOptions) -> stratlang::domain::backtest::BacktestResult {
    let strategy = parse(dsl).unwrap();
    let signals = generate_signals(&strategy, table).unwrap();
    run_backtest(table, &signals, options).unwrap()
}

mod accounting {
    use super::*;

    #[test]
    fn single_trade_return() {
        let table = PriceTable::from_closes(&[100.0, 110.0, 115.0, 120.0]);
        let result = backtest(
            "ENTRY: close > 105 AND close < 112\nEXIT: close > 117",
            &table,
            &BacktestOptions::default(),
        );

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_relative_eq!(trade.entry_price, 110.0);
        assert_relative_eq!(trade.exit_price, 120.0);
        assert_relative_eq!(trade.pnl, 10.0);
        assert_relative_eq!(trade.return_pct, 10.0 / 110.0, epsilon = 1e-12);
        assert_relative_eq!(result.stats.total_return_pct, 9.0909, epsilon = 1e-4);
        assert_eq!(result.stats.num_trades, 1);
    }

    #[test]
    fn mark_to_market_drawdown() {
        let table = PriceTable::from_closes(&[100.0, 110.0, 120.0, 115.0, 105.0, 90.0]);
        let options = BacktestOptions {
            mark_to_market: true,
            ..BacktestOptions::default()
        };
        let result = backtest("ENTRY: TRUE EXIT: FALSE", &table, &options);

        assert_relative_eq!(result.stats.max_drawdown_pct, -25.0, epsilon = 1e-9);
        assert!(result.trades.is_empty());
        assert_eq!(result.stats.num_trades, 0);
    }

    #[test]
    fn without_mark_to_market_open_position_is_invisible() {
        let table = PriceTable::from_closes(&[100.0, 110.0, 120.0, 115.0, 105.0, 90.0]);
        let result = backtest("ENTRY: TRUE EXIT: FALSE", &table, &BacktestOptions::default());
        assert_relative_eq!(result.stats.max_drawdown_pct, 0.0);
        assert_relative_eq!(result.stats.total_return_pct, 0.0);
    }

    #[test]
    fn slippage_and_fee_reduce_return() {
        let table = PriceTable::from_closes(&[100.0, 110.0, 115.0, 120.0]);
        let options = BacktestOptions {
            slippage_bps: 10.0,
            fee_per_trade: 1.0,
            ..BacktestOptions::default()
        };
        let result = backtest("ENTRY: close > 105 AND close < 112 EXIT: close > 117", &table, &options);
        let trade = &result.trades[0];
        assert_relative_eq!(trade.entry_price, 110.11, epsilon = 1e-9);
        assert_relative_eq!(trade.exit_price, 119.88, epsilon = 1e-9);
        assert!(result.stats.total_return_pct < 9.09);
    }
}

mod language {
    use super::*;

    #[test]
    fn and_binds_tighter_than_or() {
        let table = PriceTable::from_closes(&[1.0]);
        assert_eq!(
            evaluate(&parse_expression("TRUE OR FALSE AND FALSE").unwrap(), &table).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            evaluate(&parse_expression("(TRUE OR FALSE) AND FALSE").unwrap(), &table).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn arithmetic_binds_tighter_than_comparison() {
        let table = PriceTable::from_closes(&[1.0]);
        assert_eq!(
            evaluate(&parse_expression("1 + 2 * 3 == 7").unwrap(), &table).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            evaluate(&parse_expression("(1 + 2) * 3 > 8").unwrap(), &table).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn canonical_form_keeps_needed_parentheses() {
        let text = "(close > 1 OR close < 0) AND volume > 5";
        assert_eq!(parse_expression(text).unwrap().to_string(), text);
        assert_eq!(
            parse_expression("((close)) > ((1 + 2))").unwrap().to_string(),
            "close > 1 + 2"
        );
    }

    #[test]
    fn unknown_name_is_a_validation_error() {
        let err = parse("ENTRY: clse > 1 EXIT: TRUE").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Validation);
        assert!(err.message.contains("close"));
    }

    #[test]
    fn bad_window_surfaces_as_input_error() {
        let table = PriceTable::from_closes(&[1.0, 2.0, 3.0]);
        let strategy = parse("ENTRY: close > SMA(close, 0) EXIT: TRUE").unwrap();
        let err = generate_signals(&strategy, &table).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Input(InputError::NonPositiveWindow { .. })
        ));
    }

    #[test]
    fn macd_and_bands_on_flat_prices() {
        let table = PriceTable::from_closes(&[50.0; 8]);
        let strategy =
            parse("ENTRY: MACD(close) == 0 AND close == BBUPPER(close, 3) EXIT: MACD_HIST(close) != 0")
                .unwrap();
        let signals = generate_signals(&strategy, &table).unwrap();
        assert_eq!(
            signals.entry,
            vec![false, false, true, true, true, true, true, true]
        );
        assert!(signals.exit.iter().all(|x| !x));
    }
}

mod data_port {
    use super::*;

    const CROSS_DSL: &str =
        "ENTRY: SMA(close, 2) CROSSOVER SMA(close, 4)\nEXIT: SMA(close, 2) CROSSUNDER SMA(close, 4)";

    #[test]
    fn golden_and_death_cross_round_trip() {
        let port = MockDataPort::new(daily_table("2024-01-01", &SWING_CLOSES));
        let table = port.fetch_table(None, None).unwrap();
        let result = backtest(CROSS_DSL, &table, &BacktestOptions::default());

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_time.to_string(), "2024-01-05");
        assert_eq!(trade.exit_time.to_string(), "2024-01-10");
        assert_eq!(trade.bars_held, 5);
        assert_relative_eq!(trade.entry_price, 12.0);
        assert_relative_eq!(trade.exit_price, 11.0);
        assert_relative_eq!(result.stats.win_rate, 0.0);
    }

    #[test]
    fn date_range_filters_rows() {
        let port = MockDataPort::new(daily_table("2024-01-01", &SWING_CLOSES));
        let table = port
            .fetch_table(Some(date("2024-01-03")), Some(date("2024-01-06")))
            .unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.keys()[0].date(), Some(date("2024-01-03")));
    }

    #[test]
    fn port_failure_propagates() {
        let port = MockDataPort::new(PriceTable::from_closes(&[])).with_error("disk on fire");
        let err = port.fetch_table(None, None).unwrap_err();
        assert!(matches!(err, StratlangError::Io(_)));
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn english_rules_match_hand_written_dsl() {
        let table = daily_table("2024-01-01", &SWING_CLOSES);
        let dsl = TranslatorKind::Heuristic
            .build()
            .translate(
                "Buy when the 2-day SMA crosses above the 4-day SMA. \
                 Sell when the 2-day SMA crosses below the 4-day SMA.",
            )
            .unwrap();
        assert_eq!(dsl, CROSS_DSL);

        let translated = backtest(&dsl, &table, &BacktestOptions::default());
        let written = backtest(CROSS_DSL, &table, &BacktestOptions::default());
        assert_eq!(translated, written);
    }

    #[test]
    fn english_rsi_rules_trade_a_v_shaped_market() {
        let closes: Vec<f64> = (0..20)
            .map(|i| 100.0 - i as f64)
            .chain((1..=20).map(|k| 81.0 + 2.0 * k as f64))
            .collect();
        let table = PriceTable::from_closes(&closes);
        let dsl = TranslatorKind::Sentence
            .build()
            .translate("Buy when RSI(14) is below 30. Sell when RSI(14) is above 70.")
            .unwrap();
        let result = backtest(&dsl, &table, &BacktestOptions::default());

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_relative_eq!(trade.entry_price, 86.0);
        assert_relative_eq!(trade.exit_price, 97.0);
        assert!(result.stats.total_return_pct > 0.0);
    }
}
