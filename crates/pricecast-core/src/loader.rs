//! Validated, memoized loading of daily price history.
//!
//! A request moves through
//! `REQUESTED -> CACHE_HIT -> RETURNED` or
//! `REQUESTED -> FETCHING -> {CACHED_AND_RETURNED | FAILED(NoData) | FAILED(Fetch)}`.
//! Only successful, non-empty results are cached.

use std::sync::Arc;
use std::time::Duration;

use time::Date;

use crate::cache::{SeriesCache, SeriesKey};
use crate::data_source::{HistoryRequest, MarketDataSource, RawHistory};
use crate::{
    DateRange, FetchError, LoadError, LoaderConfig, PriceObservation, PriceSeries, RetryPolicy,
    Ticker,
};

/// Loads [`PriceSeries`] from a [`MarketDataSource`], memoizing by (ticker, range).
///
/// Concurrent loads of the same uncached key are coalesced: one caller
/// fetches while the others wait and then read its cached result.
#[derive(Clone)]
pub struct TimeSeriesLoader {
    source: Arc<dyn MarketDataSource>,
    cache: SeriesCache,
    fetch_timeout: Duration,
    retry: RetryPolicy,
}

impl TimeSeriesLoader {
    pub fn new(source: Arc<dyn MarketDataSource>, config: &LoaderConfig) -> Self {
        Self {
            source,
            cache: SeriesCache::new(config.cache),
            fetch_timeout: config.fetch_timeout,
            retry: config.retry.clone(),
        }
    }

    pub fn with_defaults(source: Arc<dyn MarketDataSource>) -> Self {
        Self::new(source, &LoaderConfig::default())
    }

    pub fn source_id(&self) -> &'static str {
        self.source.id()
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    /// Validates raw user input, then loads.
    pub async fn load(
        &self,
        ticker: &str,
        range: DateRange,
    ) -> Result<Arc<PriceSeries>, LoadError> {
        let ticker = Ticker::parse(ticker)?;
        self.load_ticker(ticker, range).await
    }

    /// Validates raw ticker and bounds, then loads.
    pub async fn load_between(
        &self,
        ticker: &str,
        start: Date,
        end: Date,
    ) -> Result<Arc<PriceSeries>, LoadError> {
        let ticker = Ticker::parse(ticker)?;
        let range = DateRange::new(start, end)?;
        self.load_ticker(ticker, range).await
    }

    /// Returns the cached series for (ticker, range) or fetches, normalizes and caches it.
    pub async fn load_ticker(
        &self,
        ticker: Ticker,
        range: DateRange,
    ) -> Result<Arc<PriceSeries>, LoadError> {
        let key = SeriesKey::new(ticker, range);

        if let Some(series) = self.cache.get(&key).await {
            tracing::debug!(ticker = %key.ticker, %range, rows = series.len(), "series cache hit");
            return Ok(series);
        }

        let _fetch_guard = self.cache.lock_fetch(&key).await;

        // another caller may have filled the entry while we waited
        if let Some(series) = self.cache.get(&key).await {
            tracing::debug!(ticker = %key.ticker, %range, "series filled by concurrent load");
            return Ok(series);
        }

        let request = HistoryRequest::new(key.ticker.clone(), range);
        let raw = self
            .fetch_with_retry(request)
            .await
            .map_err(|source| LoadError::Fetch {
                ticker: key.ticker.clone(),
                source,
            })?;

        let series = normalize(raw, &key.ticker, range);
        if series.is_empty() {
            tracing::info!(ticker = %key.ticker, %range, "source returned no usable rows");
            return Err(LoadError::NoData {
                ticker: key.ticker,
                range,
            });
        }

        let series = Arc::new(series);
        self.cache.put(key.clone(), Arc::clone(&series)).await;
        tracing::info!(
            ticker = %key.ticker,
            %range,
            rows = series.len(),
            source = self.source.id(),
            "series loaded and cached"
        );
        Ok(series)
    }

    /// Drops the cached entry for (ticker, range). Returns whether one existed.
    pub async fn invalidate(&self, ticker: &Ticker, range: DateRange) -> bool {
        let removed = self
            .cache
            .invalidate(&SeriesKey::new(ticker.clone(), range))
            .await;
        if removed {
            tracing::debug!(%ticker, %range, "series cache entry invalidated");
        }
        removed
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    async fn fetch_with_retry(&self, request: HistoryRequest) -> Result<RawHistory, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(request.clone()).await {
                Ok(raw) => return Ok(raw),
                Err(error) if self.retry.should_retry(&error, attempt) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        ticker = %request.ticker,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %error,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn fetch_once(&self, request: HistoryRequest) -> Result<RawHistory, FetchError> {
        tracing::debug!(
            ticker = %request.ticker,
            range = %request.range,
            source = self.source.id(),
            "fetching daily history"
        );
        match tokio::time::timeout(self.fetch_timeout, self.source.daily_history(request)).await {
            Ok(result) => result.map_err(FetchError::from),
            Err(_) => Err(FetchError::Timeout {
                after: self.fetch_timeout,
            }),
        }
    }
}

/// Turns raw source rows into a series: adjusted close is discarded, rows
/// outside `range` or with missing/invalid prices are dropped, and ordering
/// and uniqueness are enforced by [`PriceSeries::new`].
fn normalize(raw: RawHistory, ticker: &Ticker, range: DateRange) -> PriceSeries {
    let received = raw.bars.len();
    let mut observations = Vec::with_capacity(received);

    for bar in raw.bars {
        if !range.contains(bar.date) {
            continue;
        }
        let (Some(open), Some(high), Some(low), Some(close)) =
            (bar.open, bar.high, bar.low, bar.close)
        else {
            continue;
        };
        match PriceObservation::new(bar.date, open, high, low, close, bar.volume.unwrap_or(0)) {
            Ok(observation) => observations.push(observation),
            Err(error) => {
                tracing::debug!(%ticker, date = %bar.date, %error, "dropping invalid bar");
            }
        }
    }

    if observations.len() < received {
        tracing::debug!(
            %ticker,
            received,
            kept = observations.len(),
            "dropped incomplete or out-of-range rows"
        );
    }

    PriceSeries::new(ticker.clone(), range, observations)
}
