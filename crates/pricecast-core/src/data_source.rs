//! Upstream market-data contract.
//!
//! The loader only knows this trait. A source hands back the rows it
//! received, unsorted and possibly repeated, with whatever optional columns
//! it has; normalization into a [`PriceSeries`](crate::PriceSeries) happens
//! in the loader.
//!
//! | Method | Request | Response |
//! |--------|---------|----------|
//! | [`daily_history`](MarketDataSource::daily_history) | [`HistoryRequest`] | [`RawHistory`] |
//! | [`profile`](MarketDataSource::profile) | [`Ticker`] | [`InstrumentProfile`] |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use time::Date;

use crate::{DateRange, InstrumentProfile, Ticker};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    NotFound,
    Internal,
}

/// Structured error raised by a market-data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request for daily bars of one ticker over an inclusive range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub ticker: Ticker,
    pub range: DateRange,
}

impl HistoryRequest {
    pub fn new(ticker: Ticker, range: DateRange) -> Self {
        Self { ticker, range }
    }
}

/// A row as delivered by the source. Any price may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub date: Date,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
    pub adj_close: Option<f64>,
}

impl RawBar {
    /// Complete row without an adjusted close.
    pub fn ohlcv(date: Date, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
            adj_close: None,
        }
    }

    pub fn with_adj_close(mut self, adj_close: f64) -> Self {
        self.adj_close = Some(adj_close);
        self
    }
}

/// Unnormalized source response for a [`HistoryRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawHistory {
    pub ticker: Ticker,
    pub bars: Vec<RawBar>,
}

impl RawHistory {
    pub fn new(ticker: Ticker, bars: Vec<RawBar>) -> Self {
        Self { ticker, bars }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Market-data source contract.
///
/// Implementations must be `Send + Sync`; one source is shared by every
/// request of a session.
pub trait MarketDataSource: Send + Sync {
    /// Short identifier used in logs.
    fn id(&self) -> &'static str;

    /// Fetches daily bars for the request.
    ///
    /// An empty [`RawHistory`] is a valid answer; it is the loader that
    /// turns it into a no-data failure.
    fn daily_history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawHistory, SourceError>> + Send + 'a>>;

    /// Fetches descriptive fields for a ticker.
    fn profile<'a>(
        &'a self,
        ticker: Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentProfile, SourceError>> + Send + 'a>>;
}
