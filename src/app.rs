//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves settings (environment, then flags)
//! - loads measures with fallback
//! - prints consensus / health reports

use clap::Parser;
use serde::Serialize;

use crate::app::pipeline::{LoadOutcome, MeasurePipeline};
use crate::cli::{Cli, Command, ConsensusArgs, HealthArgs, WeightsArgs};
use crate::config::{DataSource, Settings};
use crate::domain::{ConsensusResult, HealthReport};
use crate::error::{AppError, ErrorKind};

pub mod pipeline;

/// Entry point for the `infl` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let settings = settings_from_cli(&cli)?;

    match cli.command {
        Command::Consensus(args) => handle_consensus(&settings, args),
        Command::Health(args) => handle_health(&settings, args),
        Command::Weights(args) => handle_weights(args),
    }
}

/// Environment first, then `--data-url` / `--data-dir` on top.
pub fn settings_from_cli(cli: &Cli) -> Result<Settings, AppError> {
    let mut settings = Settings::from_env()?;
    if let Some(url) = &cli.data_url {
        settings.source = DataSource::Url(url.clone());
    } else if let Some(dir) = &cli.data_dir {
        settings.source = DataSource::Dir(dir.clone());
    }
    Ok(settings)
}

#[derive(Serialize)]
struct ConsensusOutput<'a> {
    result: &'a ConsensusResult,
    has_real_data: bool,
    fallback_used: bool,
    strategy: Option<&'a str>,
    warnings: &'a [String],
}

fn handle_consensus(settings: &Settings, args: ConsensusArgs) -> Result<(), AppError> {
    let pipeline = MeasurePipeline::from_settings(settings)?;
    let outcome: LoadOutcome = pipeline.load_currency_measures_with_fallback(&args.currency)?;
    let result =
        pipeline.calculate_consensus_inflation(&outcome.measures, &args.currency, args.from, args.to, args.amount)?;

    if args.json {
        let output = ConsensusOutput {
            result: &result,
            has_real_data: outcome.has_real_data,
            fallback_used: outcome.fallback_used,
            strategy: outcome.strategy.as_deref(),
            warnings: &outcome.warnings,
        };
        println!("{}", to_json(&output)?);
    } else {
        println!("{}", crate::report::format_consensus(&result, &outcome));
    }
    Ok(())
}

fn handle_health(settings: &Settings, args: HealthArgs) -> Result<(), AppError> {
    let pipeline = MeasurePipeline::from_settings(settings)?;
    let (measures, load_failures) = pipeline.load_for_diagnostics(&args.currency)?;
    let mut report: HealthReport = pipeline.validate_currency_measures(&args.currency, &measures);
    report.critical_issues.extend(load_failures);

    if args.json {
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", crate::report::format_health(&report));
    }
    Ok(())
}

fn handle_weights(args: WeightsArgs) -> Result<(), AppError> {
    let table = crate::data::WeightTable::builtin();
    if let Some(currency) = args.currency.as_deref() {
        if !table.contains(currency) {
            return Err(AppError::unknown_currency(currency));
        }
    }
    print!("{}", crate::report::format_weights(&table, args.currency.as_deref()));
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(ErrorKind::Calculation, format!("Failed to serialize output: {e}")))
}
