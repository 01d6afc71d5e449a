//! Command-line parsing for the `infl` binary.
//!
//! Argument parsing stays separate from the data and calculation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "infl", version, about = "Multi-measure consensus inflation calculator")]
pub struct Cli {
    /// Read measure documents from this directory (overrides INFLATION_DATA_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Read measure documents from this base URL (overrides INFLATION_DATA_URL).
    #[arg(long, global = true, value_name = "URL")]
    pub data_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Adjust an amount between two years using the weighted consensus of all measures.
    Consensus(ConsensusArgs),
    /// Validate every measure for a currency and print a data-quality report.
    Health(HealthArgs),
    /// Print the compiled-in measure weights.
    Weights(WeightsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ConsensusArgs {
    /// Currency code (USD, GBP, EUR, CAD, CHF, JPY, AUD, NZD).
    #[arg(short = 'c', long, default_value = "USD")]
    pub currency: String,

    /// Year the amount is expressed in.
    #[arg(long)]
    pub from: i32,

    /// Year to express the amount in.
    #[arg(long)]
    pub to: i32,

    /// Amount to adjust.
    #[arg(short = 'a', long, default_value_t = 100.0)]
    pub amount: f64,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct HealthArgs {
    /// Currency code.
    #[arg(short = 'c', long, default_value = "USD")]
    pub currency: String,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct WeightsArgs {
    /// Only show this currency.
    #[arg(short = 'c', long)]
    pub currency: Option<String>,
}
