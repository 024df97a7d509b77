//! Configuration validation.
//!
//! Checks INI-supplied values before any data is loaded, so a bad config
//! fails fast with the offending section and key.

use chrono::NaiveDate;

use crate::domain::error::StratlangError;
use crate::domain::translate::TranslatorKind;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), StratlangError> {
    validate_position_size(config)?;
    validate_slippage(config)?;
    validate_fee(config)?;
    config.get_bool("backtest", "mark_to_market", false)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), StratlangError> {
    validate_rule_sources(config)?;
    validate_translator(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StratlangError {
    StratlangError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_position_size(config: &dyn ConfigPort) -> Result<(), StratlangError> {
    let value = config.get_double("backtest", "position_size", 1.0)?;
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid(
            "backtest",
            "position_size",
            "position_size must be positive",
        ));
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), StratlangError> {
    let value = config.get_double("backtest", "slippage_bps", 0.0)?;
    if value < 0.0 {
        return Err(invalid(
            "backtest",
            "slippage_bps",
            "slippage_bps must be non-negative",
        ));
    }
    Ok(())
}

fn validate_fee(config: &dyn ConfigPort) -> Result<(), StratlangError> {
    let value = config.get_double("backtest", "fee_per_trade", 0.0)?;
    if value < 0.0 {
        return Err(invalid(
            "backtest",
            "fee_per_trade",
            "fee_per_trade must be non-negative",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), StratlangError> {
    let start_date = config_date(config, "start_date")?;
    let end_date = config_date(config, "end_date")?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(invalid(
                "data",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

/// Optional `[data]` date in `YYYY-MM-DD` form.
pub fn config_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, StratlangError> {
    match config.get_string("data", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid("data", key, format!("invalid {key} format, expected YYYY-MM-DD"))),
    }
}

fn non_empty(config: &dyn ConfigPort, key: &str) -> bool {
    config
        .get_string("strategy", key)
        .is_some_and(|s| !s.trim().is_empty())
}

/// At most one of `dsl`, `entry`/`exit` or `nl`; `entry` and `exit` come as a pair.
fn validate_rule_sources(config: &dyn ConfigPort) -> Result<(), StratlangError> {
    let dsl = non_empty(config, "dsl");
    let entry = non_empty(config, "entry");
    let exit = non_empty(config, "exit");
    let nl = non_empty(config, "nl");

    match (entry, exit) {
        (true, false) => {
            return Err(StratlangError::ConfigMissing {
                section: "strategy".to_string(),
                key: "exit".to_string(),
            });
        }
        (false, true) => {
            return Err(StratlangError::ConfigMissing {
                section: "strategy".to_string(),
                key: "entry".to_string(),
            });
        }
        _ => {}
    }

    let sources = [dsl, entry, nl].iter().filter(|set| **set).count();
    if sources > 1 {
        return Err(invalid(
            "strategy",
            "dsl",
            "set only one of dsl, entry/exit or nl",
        ));
    }
    Ok(())
}

fn validate_translator(config: &dyn ConfigPort) -> Result<(), StratlangError> {
    match config.get_string("strategy", "translator") {
        Some(name) => name
            .parse::<TranslatorKind>()
            .map(|_| ())
            .map_err(|reason| invalid("strategy", "translator", reason)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_backtest_config_passes() {
        let config = make_config(
            r#"
[data]
csv = prices.csv
start_date = 2020-01-01
end_date = 2024-12-31

[backtest]
position_size = 0.5
slippage_bps = 5
fee_per_trade = 1.0
mark_to_market = true
"#,
        );
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = make_config("[backtest]\n");
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn position_size_zero_fails() {
        let config = make_config("[backtest]\nposition_size = 0\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "position_size"));
    }

    #[test]
    fn position_size_negative_fails() {
        let config = make_config("[backtest]\nposition_size = -0.5\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "position_size"));
    }

    #[test]
    fn slippage_negative_fails() {
        let config = make_config("[backtest]\nslippage_bps = -1\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "slippage_bps"));
    }

    #[test]
    fn fee_negative_fails() {
        let config = make_config("[backtest]\nfee_per_trade = -0.01\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "fee_per_trade"));
    }

    #[test]
    fn unparseable_numbers_fail_instead_of_defaulting() {
        let config = make_config("[backtest]\nposition_size = abc\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "position_size"));

        let config = make_config("[backtest]\nslippage_bps = nan\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "slippage_bps"));
    }

    #[test]
    fn unparseable_mark_to_market_fails() {
        let config = make_config("[backtest]\nmark_to_market = sometimes\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "mark_to_market"));
    }

    #[test]
    fn invalid_date_format_fails() {
        let config = make_config("[data]\nstart_date = 2020/01/01\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config("[data]\nstart_date = 2024-12-31\nend_date = 2020-01-01\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn same_start_and_end_is_allowed() {
        let config = make_config("[data]\nstart_date = 2024-01-02\nend_date = 2024-01-02\n");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn config_date_reads_optional_dates() {
        let config = make_config("[data]\nstart_date = 2021-03-04\n");
        assert_eq!(
            config_date(&config, "start_date").unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 4)
        );
        assert_eq!(config_date(&config, "end_date").unwrap(), None);
    }

    #[test]
    fn entry_without_exit_fails() {
        let config = make_config("[strategy]\nentry = close > 1\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigMissing { key, .. } if key == "exit"));
    }

    #[test]
    fn two_rule_sources_fail() {
        let config = make_config(
            "[strategy]\ndsl = ENTRY: close > 1 EXIT: close < 1\nnl = Buy when RSI is below 30\n",
        );
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "dsl"));
    }

    #[test]
    fn unknown_translator_fails() {
        let config = make_config("[strategy]\nnl = Buy when RSI is below 30\ntranslator = spacy\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigInvalid { key, .. } if key == "translator"));
    }

    #[test]
    fn entry_exit_pair_passes() {
        let config = make_config(
            "[strategy]\nentry = close > SMA(close, 20)\nexit = close < SMA(close, 20)\ntranslator = sentence\n",
        );
        assert!(validate_strategy_config(&config).is_ok());
    }
}
