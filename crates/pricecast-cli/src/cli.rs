//! CLI argument definitions for pricecast.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `history` | Load daily OHLCV history for a ticker |
//! | `forecast-input` | Print the `(ds, y)` table handed to a forecasting model |
//! | `profile` | Print descriptive fields for a ticker |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--mock` | `false` | Serve deterministic offline data |
//!
//! # Examples
//!
//! ```bash
//! pricecast history AAPL --start 2023-01-01 --end 2023-03-31 --format table
//! pricecast forecast-input BTC-USD --years 2 --pretty
//! pricecast --mock profile NFLX
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Tickers offered by the dashboard selector; any valid symbol is accepted.
pub const SUGGESTED_TICKERS: [&str; 4] = ["BTC-USD", "GOOG", "AAPL", "NFLX"];

/// Daily price history loading and forecast preparation
#[derive(Debug, Parser)]
#[command(
    name = "pricecast",
    author,
    version,
    about = "Daily price history and forecast input for a ticker",
    long_about = "pricecast loads daily OHLCV history from Yahoo Finance, caches it for the \
session, and prepares the (ds, y) table a forecasting model consumes.\n\
\n\
Suggested tickers: BTC-USD, GOOG, AAPL, NFLX.\n\
Loader settings are read from PRICECAST_* environment variables (a .env file is honoured)."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Use deterministic offline data instead of calling Yahoo Finance.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain-text columns for terminal display.
    Table,
    /// Single JSON document.
    Json,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load daily OHLCV history.
    ///
    ///   pricecast history AAPL
    ///   pricecast history GOOG --start 2023-01-01 --tail 5
    History(HistoryArgs),

    /// Print closing prices as the (ds, y) forecasting table.
    ///
    ///   pricecast forecast-input BTC-USD --years 3
    ForecastInput(ForecastInputArgs),

    /// Print name, sector, industry and business summary.
    Profile(ProfileArgs),
}

/// Ticker plus optional date bounds shared by the loading commands.
#[derive(Debug, Args)]
pub struct RangeArgs {
    /// Market symbol (e.g. BTC-USD, GOOG, AAPL, NFLX).
    #[arg(default_value = SUGGESTED_TICKERS[0])]
    pub ticker: String,

    /// First date (YYYY-MM-DD), defaults to 2015-01-01.
    #[arg(long)]
    pub start: Option<String>,

    /// Last date (YYYY-MM-DD, inclusive), defaults to today.
    #[arg(long)]
    pub end: Option<String>,
}

/// Arguments for the `history` command.
#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Only print the most recent N rows.
    #[arg(long)]
    pub tail: Option<usize>,
}

/// Arguments for the `forecast-input` command.
#[derive(Debug, Args)]
pub struct ForecastInputArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Years of prediction to request (1 to 5).
    #[arg(long, default_value_t = 1)]
    pub years: u32,
}

/// Arguments for the `profile` command.
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Market symbol.
    #[arg(default_value = SUGGESTED_TICKERS[0])]
    pub ticker: String,
}
