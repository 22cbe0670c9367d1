use std::time::Duration;

use thiserror::Error;

use crate::data_source::SourceError;
use crate::{DateRange, Ticker};

/// Input errors rejected before any upstream call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker must start with an ASCII letter, digit or '^': '{ch}'")]
    TickerInvalidStart { ch: char },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("date range start {start} is after end {end}")]
    InvertedRange { start: String, end: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("bar high must be >= low")]
    InvalidBarRange,

    #[error("forecast horizon of {years} years is outside 1..=5")]
    HorizonYearsOutOfRange { years: u32 },
    #[error("forecast horizon must cover at least one day")]
    EmptyHorizon,
}

/// Failure talking to the upstream market-data source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("market data fetch timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },
}

impl FetchError {
    /// Whether repeating the same request may succeed.
    pub fn retryable(&self) -> bool {
        match self {
            Self::Source(error) => error.retryable(),
            Self::Timeout { .. } => true,
        }
    }
}

/// Outcome of a failed [`TimeSeriesLoader::load`](crate::TimeSeriesLoader::load).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no price data for {ticker} between {range}")]
    NoData { ticker: Ticker, range: DateRange },

    #[error("failed to fetch {ticker}: {source}")]
    Fetch {
        ticker: Ticker,
        #[source]
        source: FetchError,
    },
}

impl LoadError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "load.validation",
            Self::NoData { .. } => "load.no_data",
            Self::Fetch { .. } => "load.fetch",
        }
    }
}

/// Failure reported by a [`Forecaster`](crate::Forecaster).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForecastError {
    #[error("forecast model needs at least {required} observations, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },
    #[error("forecast model failed: {0}")]
    Model(String),
}

/// Pipeline failure for a single dashboard request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
}
