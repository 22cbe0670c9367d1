use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use time::{Date, OffsetDateTime, Weekday};
use tokio::sync::Mutex;

use crate::data_source::{HistoryRequest, MarketDataSource, RawBar, RawHistory, SourceError};
use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient};
use crate::{InstrumentProfile, LoaderConfig, Ticker};

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const REFERER: &str = "https://finance.yahoo.com/";
const CRUMB_TTL: Duration = Duration::from_secs(3600);

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

// ============================================================================
// Crumb session
// ============================================================================

/// Cookie/crumb pair required by the quoteSummary endpoint.
///
/// The cookie itself lives in the transport's jar; only the crumb and its
/// age are tracked here.
#[derive(Debug, Default)]
struct CrumbSession {
    crumb: Mutex<Option<(String, Instant)>>,
}

impl CrumbSession {
    async fn crumb(
        &self,
        http_client: &dyn HttpClient,
        timeout: Duration,
    ) -> Result<String, SourceError> {
        let mut slot = self.crumb.lock().await;
        if let Some((crumb, fetched)) = slot.as_ref() {
            if fetched.elapsed() < CRUMB_TTL {
                return Ok(crumb.clone());
            }
        }

        let crumb = fetch_crumb(http_client, timeout).await?;
        *slot = Some((crumb.clone(), Instant::now()));
        Ok(crumb)
    }

    async fn invalidate(&self) {
        *self.crumb.lock().await = None;
    }
}

async fn fetch_crumb(
    http_client: &dyn HttpClient,
    timeout: Duration,
) -> Result<String, SourceError> {
    // any status is fine here, the point is the session cookie
    let cookie_request = HttpRequest::get(COOKIE_URL)
        .with_header("referer", REFERER)
        .with_timeout(timeout);
    http_client
        .execute(cookie_request)
        .await
        .map_err(|error| transport_error("cookie", &error))?;

    for endpoint in CRUMB_URLS {
        let request = HttpRequest::get(endpoint)
            .with_header("referer", REFERER)
            .with_timeout(timeout);
        let response = match http_client.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(endpoint, %error, "crumb endpoint failed");
                continue;
            }
        };

        if response.status == 429 {
            return Err(SourceError::rate_limited("yahoo rate limited the crumb request"));
        }

        let body = response.body.trim();
        let plausible = response.is_success()
            && !body.is_empty()
            && body.len() < 100
            && !body.contains(char::is_whitespace)
            && !body.contains('<');
        if plausible {
            return Ok(body.to_owned());
        }
    }

    Err(SourceError::unavailable("failed to obtain yahoo crumb from any endpoint"))
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo Finance daily history and profile source.
///
/// Backed by a mock transport (the default) it serves deterministic
/// synthetic weekday bars so callers work offline.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    crumb: Arc<CrumbSession>,
    limiter: Arc<DirectRateLimiter>,
    request_timeout: Duration,
    use_real_api: bool,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient))
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        let defaults = LoaderConfig::default();
        Self {
            use_real_api: !http_client.is_mock(),
            http_client,
            crumb: Arc::new(CrumbSession::default()),
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(
                defaults.requests_per_minute,
            ))),
            request_timeout: defaults.fetch_timeout,
        }
    }

    /// Adapter tuned by the loader configuration (request budget and timeout).
    pub fn from_config(http_client: Arc<dyn HttpClient>, config: &LoaderConfig) -> Self {
        Self::with_http_client(http_client)
            .with_requests_per_minute(config.requests_per_minute)
            .with_request_timeout(config.fetch_timeout)
    }

    pub fn with_requests_per_minute(mut self, requests_per_minute: NonZeroU32) -> Self {
        self.limiter = Arc::new(RateLimiter::direct(Quota::per_minute(requests_per_minute)));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn is_offline(&self) -> bool {
        !self.use_real_api
    }

    async fn get(&self, url: String) -> Result<HttpResponse, SourceError> {
        self.limiter.until_ready().await;
        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_timeout(self.request_timeout);
        self.http_client
            .execute(request)
            .await
            .map_err(|error| transport_error("request", &error))
    }
}

impl MarketDataSource for YahooAdapter {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    fn daily_history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawHistory, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_history(&req).await
            } else {
                Ok(synthetic_history(&req))
            }
        })
    }

    fn profile<'a>(
        &'a self,
        ticker: Ticker,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentProfile, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_profile(ticker).await
            } else {
                Ok(synthetic_profile(ticker))
            }
        })
    }
}

// Real API implementation methods
impl YahooAdapter {
    async fn fetch_real_history(&self, req: &HistoryRequest) -> Result<RawHistory, SourceError> {
        let response = self.get(chart_url(req)).await?;
        parse_chart_response(&req.ticker, &response)
    }

    async fn fetch_real_profile(&self, ticker: Ticker) -> Result<InstrumentProfile, SourceError> {
        let crumb = self
            .crumb
            .crumb(self.http_client.as_ref(), self.request_timeout)
            .await?;
        let mut response = self.get(summary_url(&ticker, &crumb)).await?;

        // stale crumb: refresh once
        if response.status == 401 || response.status == 403 {
            self.crumb.invalidate().await;
            let crumb = self
                .crumb
                .crumb(self.http_client.as_ref(), self.request_timeout)
                .await?;
            response = self.get(summary_url(&ticker, &crumb)).await?;
        }

        parse_summary_response(ticker, &response)
    }
}

fn chart_url(req: &HistoryRequest) -> String {
    let start = req.range.start();
    // period2 is exclusive upstream, the range is inclusive here
    let end = req.range.end().next_day().unwrap_or(req.range.end());
    format!(
        "{CHART_URL}/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
        urlencoding::encode(req.ticker.as_str()),
        unix_midnight(start),
        unix_midnight(end),
    )
}

fn summary_url(ticker: &Ticker, crumb: &str) -> String {
    format!(
        "{SUMMARY_URL}/{}?modules=assetProfile,price&crumb={}",
        urlencoding::encode(ticker.as_str()),
        urlencoding::encode(crumb)
    )
}

fn unix_midnight(date: Date) -> i64 {
    date.midnight().assume_utc().unix_timestamp()
}

fn transport_error(context: &str, error: &HttpError) -> SourceError {
    if error.timed_out() {
        SourceError::unavailable(format!("yahoo {context} timed out: {}", error.message()))
    } else {
        SourceError::unavailable(format!("yahoo {context} transport error: {}", error.message()))
    }
}

/// Maps a non-success status to an error when the body carries no API error.
fn status_error(status: u16) -> SourceError {
    match status {
        429 => SourceError::rate_limited("yahoo returned status 429"),
        404 => SourceError::not_found("yahoo returned status 404"),
        408 | 500..=599 => SourceError::unavailable(format!("yahoo returned status {status}")),
        _ => SourceError::invalid_request(format!("yahoo returned status {status}")),
    }
}

fn api_error(error: YahooApiError) -> SourceError {
    let detail = match &error.description {
        Some(description) => format!("{}: {description}", error.code),
        None => error.code.clone(),
    };
    let message = format!("yahoo API error: {detail}");
    let no_data = error
        .description
        .as_deref()
        .is_some_and(|description| description.contains("No data found"));
    match error.code.as_str() {
        "Not Found" => SourceError::not_found(message),
        _ if no_data => SourceError::not_found(message),
        "Bad Request" | "Unprocessable Entity" => SourceError::invalid_request(message),
        "Too Many Requests" => SourceError::rate_limited(message),
        _ => SourceError::unavailable(message),
    }
}

fn is_empty_range(error: &YahooApiError) -> bool {
    error
        .description
        .as_deref()
        .is_some_and(|description| description.contains("Data doesn't exist"))
}

fn parse_chart_response(
    ticker: &Ticker,
    response: &HttpResponse,
) -> Result<RawHistory, SourceError> {
    if response.status == 429 {
        return Err(status_error(429));
    }

    let parsed: Result<YahooChartResponse, _> = serde_json::from_str(&response.body);
    let chart = match parsed {
        Ok(parsed) => parsed.chart,
        Err(_) if !response.is_success() => return Err(status_error(response.status)),
        Err(error) => {
            return Err(SourceError::internal(format!("failed to parse yahoo chart: {error}")))
        }
    };

    if let Some(error) = chart.error {
        // a range with no trading days comes back as a 400
        if is_empty_range(&error) {
            return Ok(RawHistory::new(ticker.clone(), Vec::new()));
        }
        return Err(api_error(error));
    }
    if !response.is_success() {
        return Err(status_error(response.status));
    }

    let Some(result) = chart.result.and_then(|results| results.into_iter().next()) else {
        return Ok(RawHistory::new(ticker.clone(), Vec::new()));
    };

    let offset = result.meta.as_ref().and_then(|meta| meta.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|series| series.adjclose)
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let local = OffsetDateTime::from_unix_timestamp(ts.saturating_add(offset)).map_err(
            |error| SourceError::internal(format!("invalid yahoo timestamp {ts}: {error}")),
        )?;

        bars.push(RawBar {
            date: local.date(),
            open: value_at(&quote.open, i),
            high: value_at(&quote.high, i),
            low: value_at(&quote.low, i),
            close: value_at(&quote.close, i),
            volume: value_at(&quote.volume, i).and_then(volume_from_f64),
            adj_close: value_at(&adjclose, i),
        });
    }

    Ok(RawHistory::new(ticker.clone(), bars))
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

fn volume_from_f64(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 {
        Some(value.round() as u64)
    } else {
        None
    }
}

fn parse_summary_response(
    ticker: Ticker,
    response: &HttpResponse,
) -> Result<InstrumentProfile, SourceError> {
    if response.status == 429 {
        return Err(status_error(429));
    }

    let parsed: Result<YahooSummaryResponse, _> = serde_json::from_str(&response.body);
    let summary = match parsed {
        Ok(parsed) => parsed.quote_summary,
        Err(_) if !response.is_success() => return Err(status_error(response.status)),
        Err(error) => {
            return Err(SourceError::internal(format!("failed to parse yahoo summary: {error}")))
        }
    };

    if let Some(error) = summary.error {
        return Err(api_error(error));
    }
    if !response.is_success() {
        return Err(status_error(response.status));
    }

    let result = summary
        .result
        .and_then(|results| results.into_iter().next())
        .unwrap_or_default();
    let asset = result.asset_profile.unwrap_or_default();
    let price = result.price.unwrap_or_default();

    Ok(InstrumentProfile {
        ticker,
        name: non_blank(price.long_name).or_else(|| non_blank(price.short_name)),
        sector: non_blank(asset.sector),
        industry: non_blank(asset.industry),
        business_summary: non_blank(asset.long_business_summary),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

// ============================================================================
// Offline data
// ============================================================================

/// Deterministic weekday bars across the requested range, with an adjusted
/// close column like the real endpoint returns.
fn synthetic_history(req: &HistoryRequest) -> RawHistory {
    let seed = ticker_seed(&req.ticker);
    let base = 40.0 + (seed % 400) as f64;
    let mut bars = Vec::new();
    let mut day = req.range.start();
    let mut index: u64 = 0;

    loop {
        if !matches!(day.weekday(), Weekday::Saturday | Weekday::Sunday) {
            // slow drift plus a bounded weekly wobble
            let wobble = ((seed.wrapping_add(index) % 11) as f64 - 5.0) / 10.0;
            let open = base + index as f64 * 0.05 + wobble;
            let close = open + 0.3;
            let volume = 20_000 + seed.wrapping_add(index) % 5_000;
            bars.push(
                RawBar::ohlcv(day, open, close + 0.9, open - 0.8, close, volume)
                    .with_adj_close(close * 0.98),
            );
            index += 1;
        }

        if day >= req.range.end() {
            break;
        }
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }

    RawHistory::new(req.ticker.clone(), bars)
}

fn synthetic_profile(ticker: Ticker) -> InstrumentProfile {
    InstrumentProfile {
        name: Some(format!("{ticker} (offline)")),
        ..InstrumentProfile::unavailable(ticker)
    }
}

fn ticker_seed(ticker: &Ticker) -> u64 {
    ticker
        .as_str()
        .bytes()
        .fold(0_u64, |acc, byte| acc.wrapping_mul(33).wrapping_add(u64::from(byte)))
}

// ============================================================================
// Yahoo Finance API response structures
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct YahooApiError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: YahooChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
    #[serde(default)]
    adjclose: Vec<YahooAdjClose>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: YahooSummaryData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooSummaryData {
    #[serde(default)]
    result: Option<Vec<YahooSummaryResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooSummaryResult {
    #[serde(rename = "assetProfile", default)]
    asset_profile: Option<YahooAssetProfile>,
    #[serde(default)]
    price: Option<YahooPrice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooAssetProfile {
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(rename = "longBusinessSummary", default)]
    long_business_summary: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooPrice {
    #[serde(rename = "longName", default)]
    long_name: Option<String>,
    #[serde(rename = "shortName", default)]
    short_name: Option<String>,
}
