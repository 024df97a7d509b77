//! CLI definition and dispatch.
//!
//! Progress goes to stderr through `tracing`; stdout carries only results
//! (the report, the canonical strategy or the translation).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::adapters::csv_adapter::{self, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report::TextReportAdapter;
use crate::domain::ast::Strategy;
use crate::domain::backtest::{BacktestOptions, run_backtest};
use crate::domain::config_validation::{
    config_date, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::StratlangError;
use crate::domain::evaluator::generate_signals;
use crate::domain::parser;
use crate::domain::translate::TranslatorKind;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "stratlang",
    about = "Trading-rule DSL with a long-only backtester"
)]
pub struct Cli {
    /// Log pipeline detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest a strategy over a CSV price file
    Run(RunArgs),
    /// Parse a strategy and print its canonical form
    Validate {
        #[arg(long)]
        dsl: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Translate an English description into DSL
    Translate {
        #[arg(long)]
        nl: String,
        #[arg(long, default_value_t = TranslatorKind::Heuristic)]
        translator: TranslatorKind,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// INI file with [data], [strategy], [backtest] and [export] sections
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub csv: Option<PathBuf>,
    #[arg(long, conflicts_with = "nl")]
    pub dsl: Option<String>,
    /// English rules, translated to DSL before parsing
    #[arg(long)]
    pub nl: Option<String>,
    #[arg(long)]
    pub translator: Option<TranslatorKind>,
    #[arg(long)]
    pub position_size: Option<f64>,
    #[arg(long)]
    pub slippage_bps: Option<f64>,
    #[arg(long)]
    pub fee: Option<f64>,
    #[arg(long)]
    pub mark_to_market: bool,
    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,
    #[arg(long)]
    pub export_signals: Option<PathBuf>,
    #[arg(long)]
    pub export_trades: Option<PathBuf>,
    /// Also write the text report here
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    let outcome = match cli.command {
        Command::Run(args) => run_pipeline(&args),
        Command::Validate { dsl, config } => run_validate(dsl.as_deref(), config.as_deref()),
        Command::Translate { nl, translator } => run_translate(&nl, translator),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "stratlang=debug"
    } else {
        "stratlang=info"
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn fail(err: impl Into<StratlangError>) -> ExitCode {
    let err = err.into();
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, ExitCode> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path).map_err(fail)
        }
        None => FileConfigAdapter::from_string("").map_err(fail),
    }
}

/// Strategy rules as given by the user, before any parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSource {
    Dsl(String),
    Natural(String),
}

/// Command-line rules win; otherwise `[strategy] dsl`, then the
/// `entry`/`exit` pair, then `nl`.
pub fn resolve_rules(
    dsl: Option<&str>,
    nl: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<RuleSource, StratlangError> {
    if let Some(dsl) = dsl {
        return Ok(RuleSource::Dsl(dsl.to_string()));
    }
    if let Some(nl) = nl {
        return Ok(RuleSource::Natural(nl.to_string()));
    }
    let get = |key: &str| {
        config
            .get_string("strategy", key)
            .filter(|s| !s.trim().is_empty())
    };
    if let Some(dsl) = get("dsl") {
        return Ok(RuleSource::Dsl(dsl));
    }
    if let (Some(entry), Some(exit)) = (get("entry"), get("exit")) {
        return Ok(RuleSource::Dsl(format!("ENTRY: {entry}\nEXIT: {exit}")));
    }
    if let Some(nl) = get("nl") {
        return Ok(RuleSource::Natural(nl));
    }
    Err(StratlangError::ConfigMissing {
        section: "strategy".into(),
        key: "dsl".into(),
    })
}

fn translator_kind(
    flag: Option<TranslatorKind>,
    config: &dyn ConfigPort,
) -> Result<TranslatorKind, StratlangError> {
    if let Some(kind) = flag {
        return Ok(kind);
    }
    match config.get_string("strategy", "translator") {
        Some(name) => name
            .parse()
            .map_err(|reason| StratlangError::ConfigInvalid {
                section: "strategy".into(),
                key: "translator".into(),
                reason,
            }),
        None => Ok(TranslatorKind::default()),
    }
}

/// Turn a rule source into DSL text, translating English when needed.
fn rules_to_dsl(source: RuleSource, kind: TranslatorKind) -> Result<String, StratlangError> {
    match source {
        RuleSource::Dsl(dsl) => Ok(dsl),
        RuleSource::Natural(text) => {
            let dsl = kind.build().translate(&text)?;
            info!(translator = %kind, dsl = %dsl.replace('\n', " "), "translated rules");
            Ok(dsl)
        }
    }
}

/// Parse, printing the offending line with a caret on failure.
pub fn parse_strategy(dsl: &str) -> Result<Strategy, ExitCode> {
    parser::parse(dsl).map_err(|e| {
        eprintln!("error: failed to parse strategy:\n{}", e.display_with_context(dsl));
        (&StratlangError::from(e)).into()
    })
}

/// `[backtest]` values over the built-in defaults.
pub fn build_backtest_options(config: &dyn ConfigPort) -> Result<BacktestOptions, StratlangError> {
    let defaults = BacktestOptions::default();
    Ok(BacktestOptions {
        position_size: config.get_double("backtest", "position_size", defaults.position_size)?,
        slippage_bps: config.get_double("backtest", "slippage_bps", defaults.slippage_bps)?,
        fee_per_trade: config.get_double("backtest", "fee_per_trade", defaults.fee_per_trade)?,
        mark_to_market: config.get_bool("backtest", "mark_to_market", defaults.mark_to_market)?,
    })
}

fn apply_overrides(mut options: BacktestOptions, args: &RunArgs) -> Result<BacktestOptions, StratlangError> {
    let invalid = |key: &str, reason: &str| StratlangError::ConfigInvalid {
        section: "command line".into(),
        key: key.into(),
        reason: reason.into(),
    };
    if let Some(size) = args.position_size {
        if size <= 0.0 || !size.is_finite() {
            return Err(invalid("position-size", "must be positive"));
        }
        options.position_size = size;
    }
    if let Some(bps) = args.slippage_bps {
        if bps < 0.0 {
            return Err(invalid("slippage-bps", "must be non-negative"));
        }
        options.slippage_bps = bps;
    }
    if let Some(fee) = args.fee {
        if fee < 0.0 {
            return Err(invalid("fee", "must be non-negative"));
        }
        options.fee_per_trade = fee;
    }
    options.mark_to_market |= args.mark_to_market;
    Ok(options)
}

/// Config paths are relative to the config file, flag paths to the
/// working directory.
fn config_path(config: &dyn ConfigPort, base: Option<&Path>, section: &str, key: &str) -> Option<PathBuf> {
    let value = config.get_string(section, key).filter(|s| !s.trim().is_empty())?;
    let path = PathBuf::from(value.trim());
    match base.and_then(Path::parent) {
        Some(dir) if path.is_relative() => Some(dir.join(path)),
        _ => Some(path),
    }
}

fn run_pipeline(args: &RunArgs) -> Result<(), ExitCode> {
    // Stage 1: Load and validate config
    let config = load_config(args.config.as_deref())?;
    validate_backtest_config(&config).map_err(fail)?;
    validate_strategy_config(&config).map_err(fail)?;
    let base = args.config.as_deref();

    // Stage 2: Resolve, translate and parse the rules
    let source = resolve_rules(args.dsl.as_deref(), args.nl.as_deref(), &config).map_err(fail)?;
    let kind = translator_kind(args.translator, &config).map_err(fail)?;
    let dsl = rules_to_dsl(source, kind).map_err(fail)?;
    let strategy = parse_strategy(&dsl)?;
    info!(%strategy, "parsed strategy");

    // Stage 3: Backtest options, command line over config
    let options = build_backtest_options(&config)
        .and_then(|options| apply_overrides(options, args))
        .map_err(fail)?;

    // Stage 4: Load prices
    let csv_path = match args.csv.clone() {
        Some(path) => path,
        None => config_path(&config, base, "data", "csv").ok_or_else(|| {
            fail(StratlangError::ConfigMissing {
                section: "data".into(),
                key: "csv".into(),
            })
        })?,
    };
    let start = match args.start {
        Some(date) => Some(date),
        None => config_date(&config, "start_date").map_err(fail)?,
    };
    let end = match args.end {
        Some(date) => Some(date),
        None => config_date(&config, "end_date").map_err(fail)?,
    };
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(fail(StratlangError::ConfigInvalid {
                section: "data".into(),
                key: "start_date".into(),
                reason: "start_date must not be after end_date".into(),
            }));
        }
    }
    info!(path = %csv_path.display(), "loading prices");
    let data = CsvAdapter::new(&csv_path);
    let table = data.fetch_table(start, end).map_err(fail)?;

    // Stage 5: Signals and backtest
    info!(rows = table.len(), "evaluating strategy");
    let signals = generate_signals(&strategy, &table).map_err(fail)?;
    let result = run_backtest(&table, &signals, &options).map_err(fail)?;
    info!(
        trades = result.stats.num_trades,
        total_return_pct = result.stats.total_return_pct,
        "backtest complete"
    );

    // Stage 6: Report and exports
    let report = TextReportAdapter::new();
    print!("{}", report.render(&result, &strategy));

    let export = |flag: &Option<PathBuf>, key: &str| {
        flag.clone()
            .or_else(|| config_path(&config, base, "export", key))
    };
    if let Some(path) = export(&args.export_signals, "signals") {
        csv_adapter::export_signals(&path, &signals).map_err(fail)?;
        info!(path = %path.display(), "signals written");
    }
    if let Some(path) = export(&args.export_trades, "trades") {
        csv_adapter::export_trades(&path, &result.trades).map_err(fail)?;
        info!(path = %path.display(), "trades written");
    }
    if let Some(path) = export(&args.output, "report") {
        report.write(&result, &strategy, &path).map_err(fail)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn run_validate(dsl: Option<&str>, config_file: Option<&Path>) -> Result<(), ExitCode> {
    let config = load_config(config_file)?;
    validate_strategy_config(&config).map_err(fail)?;
    let source = resolve_rules(dsl, None, &config).map_err(fail)?;
    let kind = translator_kind(None, &config).map_err(fail)?;
    let text = rules_to_dsl(source, kind).map_err(fail)?;
    let strategy = parse_strategy(&text)?;
    println!("ENTRY: {}", strategy.entry);
    println!("EXIT: {}", strategy.exit);
    Ok(())
}

fn run_translate(nl: &str, kind: TranslatorKind) -> Result<(), ExitCode> {
    let translator = kind.build();
    let structured = translator.structure(nl).map_err(fail)?;
    let json = serde_json::to_string_pretty(&structured).map_err(fail)?;
    let dsl = crate::domain::translate::structured_to_dsl(&structured);
    parse_strategy(&dsl)?;
    println!("{json}");
    println!();
    println!("{dsl}");
    Ok(())
}
