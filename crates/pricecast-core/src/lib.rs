//! # Pricecast Core
//!
//! Validated, cached loading of daily price history and the pipeline that
//! feeds it to a forecasting model.
//!
//! ## Overview
//!
//! - **Domain types** for tickers, inclusive date ranges, price series and
//!   instrument profiles
//! - **Market-data source trait** with a Yahoo Finance adapter
//! - **Time-series loader** memoizing one series per (ticker, range)
//! - **Retry and timeout** handling around every upstream fetch
//! - **Forecaster trait** and a session pipeline that loads before it predicts
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Upstream adapters (Yahoo Finance) |
//! | [`cache`] | Per-session series cache with optional TTL and size bound |
//! | [`config`] | Loader configuration and `PRICECAST_*` overrides |
//! | [`data_source`] | Source trait, raw rows and source errors |
//! | [`domain`] | Ticker, DateRange, PriceSeries, InstrumentProfile |
//! | [`error`] | Validation, fetch, load and pipeline errors |
//! | [`forecast`] | Forecast input/output and the model contract |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`loader`] | The memoizing time-series loader |
//! | [`retry`] | Retry policy and backoff |
//! | [`session`] | Load-then-forecast pipeline for one session |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pricecast_core::{DateRange, TimeSeriesLoader, YahooAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = TimeSeriesLoader::with_defaults(Arc::new(YahooAdapter::default()));
//!     let range = DateRange::parse(Some("2023-01-01"), Some("2023-01-31"))?;
//!
//!     let series = loader.load("AAPL", range).await?;
//!     if let Some(last) = series.last() {
//!         println!("AAPL close on {}: {:.2}", last.date, last.close);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use pricecast_core::LoadError;
//!
//! fn describe(error: &LoadError) -> &'static str {
//!     match error {
//!         LoadError::Validation(_) => "fix the input",
//!         LoadError::NoData { .. } => "pick another range",
//!         LoadError::Fetch { .. } => "try again later",
//!     }
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod http_client;
pub mod loader;
pub mod retry;
pub mod session;

// Adapter implementations
pub use adapters::YahooAdapter;

// Caching
pub use cache::{CachePolicy, SeriesCache, SeriesKey};

// Configuration
pub use config::LoaderConfig;

// Data source trait and types
pub use data_source::{
    HistoryRequest, MarketDataSource, RawBar, RawHistory, SourceError, SourceErrorKind,
};

// Domain models
pub use domain::{
    format_date, parse_date, DateRange, InstrumentProfile, PriceObservation, PriceSeries, Ticker,
    HISTORY_EPOCH, UNAVAILABLE,
};

// Error types
pub use error::{FetchError, ForecastError, LoadError, PipelineError, ValidationError};

// Forecasting contract
pub use forecast::{
    Forecast, ForecastHorizon, ForecastInput, ForecastPoint, ForecastRow, Forecaster,
};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

// Loading
pub use loader::TimeSeriesLoader;

// Retry logic
pub use retry::{Backoff, RetryPolicy};

// Sessions
pub use session::{Session, SessionOutcome};
