//! Contract tests for the Yahoo Finance adapter
//!
//! A recording transport stands in for the network so these tests pin down
//! the URLs the adapter builds and how it reads (or rejects) chart and
//! quoteSummary payloads.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pricecast_core::{
    DateRange, HistoryRequest, HttpClient, HttpError, HttpRequest, HttpResponse, LoadError,
    MarketDataSource, SourceErrorKind, Ticker, TimeSeriesLoader, YahooAdapter,
};
use time::macros::date;

// =============================================================================
// Test Fixtures
// =============================================================================

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync>;

struct RecordingHttpClient {
    requests: Mutex<Vec<HttpRequest>>,
    respond: Responder,
}

impl RecordingHttpClient {
    fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    fn always(status: u16, body: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(HttpResponse::new(status, body)))
    }

    fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }

    fn last(&self) -> HttpRequest {
        self.requests
            .lock()
            .expect("requests lock")
            .last()
            .cloned()
            .expect("at least one request")
    }
}

impl HttpClient for RecordingHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let response = (self.respond)(&request);
            self.requests.lock().expect("requests lock").push(request);
            response
        })
    }
}

fn adapter(client: &Arc<RecordingHttpClient>) -> YahooAdapter {
    let client: Arc<dyn HttpClient> = client.clone();
    YahooAdapter::with_http_client(client)
}

fn request(ticker: &str) -> HistoryRequest {
    HistoryRequest::new(
        Ticker::parse(ticker).expect("ticker"),
        DateRange::new(date!(2023 - 01 - 01), date!(2023 - 01 - 05)).expect("range"),
    )
}

/// Two sessions (01-03 and 01-04, 09:30 New York) with an adjclose series
/// and a null volume on the second day.
const CHART_OK: &str = r#"{
  "chart": {
    "result": [{
      "meta": {"currency": "USD", "symbol": "ACME", "gmtoffset": -18000},
      "timestamp": [1672756200, 1672842600],
      "indicators": {
        "quote": [{
          "open": [10.0, 10.5],
          "high": [11.0, 11.5],
          "low": [9.5, 10.0],
          "close": [10.5, 11.0],
          "volume": [1000, null]
        }],
        "adjclose": [{"adjclose": [10.1, 10.6]}]
      }
    }],
    "error": null
  }
}"#;

/// 03:00 UTC on 01-03 is still 01-02 in New York.
const CHART_LATE_EVENING: &str = r#"{
  "chart": {
    "result": [{
      "meta": {"gmtoffset": -18000},
      "timestamp": [1672714800],
      "indicators": {"quote": [{"open": [1.0], "high": [1.0], "low": [1.0], "close": [1.0], "volume": [0]}]}
    }],
    "error": null
  }
}"#;

const CHART_NOT_FOUND: &str = r#"{
  "chart": {
    "result": null,
    "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
  }
}"#;

const CHART_EMPTY: &str = r#"{
  "chart": {
    "result": [{"meta": {"gmtoffset": 0}, "indicators": {"quote": [{}]}}],
    "error": null
  }
}"#;

const CHART_NO_TRADING_DAYS: &str = r#"{
  "chart": {
    "result": null,
    "error": {
      "code": "Bad Request",
      "description": "Data doesn't exist for startDate = 1673049600, endDate = 1673222400"
    }
  }
}"#;

const SUMMARY_OK: &str = r#"{
  "quoteSummary": {
    "result": [{
      "assetProfile": {
        "sector": "Technology",
        "industry": "Consumer Electronics",
        "longBusinessSummary": "Designs phones."
      },
      "price": {"longName": "Apple Inc.", "shortName": "Apple"}
    }],
    "error": null
  }
}"#;

const SUMMARY_SPARSE: &str = r#"{
  "quoteSummary": {
    "result": [{"price": {"shortName": "Bitcoin USD"}, "assetProfile": {"sector": "  "}}],
    "error": null
  }
}"#;

// =============================================================================
// Chart: Request Shape
// =============================================================================

#[tokio::test]
async fn when_history_is_requested_chart_url_covers_inclusive_range() {
    // Given: An adapter over a recording transport
    let client = RecordingHttpClient::always(200, CHART_OK);
    let adapter = adapter(&client);

    // When: History for 2023-01-01..=2023-01-05 is requested
    adapter.daily_history(request("BTC-USD")).await.expect("history");

    // Then: One chart request covers the range with an exclusive period2
    let sent = client.last();
    assert_eq!(client.urls().len(), 1);
    assert!(sent.url.contains("/v8/finance/chart/BTC-USD?"));
    assert!(sent.url.contains("period1=1672531200"));
    assert!(sent.url.contains("period2=1672963200"));
    assert!(sent.url.contains("interval=1d"));
    assert_eq!(
        sent.headers.get("referer").map(String::as_str),
        Some("https://finance.yahoo.com/")
    );
}

// =============================================================================
// Chart: Parsing
// =============================================================================

#[tokio::test]
async fn when_chart_has_adjclose_adapter_reports_it_and_loader_drops_it() {
    // Given: A chart payload with an adjclose series
    let client = RecordingHttpClient::always(200, CHART_OK);
    let yahoo = adapter(&client);

    // When: The adapter parses the payload directly
    let raw = yahoo.daily_history(request("ACME")).await.expect("history");

    // Then: Raw bars carry exchange-local dates and the adjusted close
    assert_eq!(raw.bars.len(), 2);
    assert_eq!(raw.bars[0].date, date!(2023 - 01 - 03));
    assert_eq!(raw.bars[0].adj_close, Some(10.1));
    assert_eq!(raw.bars[1].volume, None);

    // And: The loader's series has no adjusted close and defaults missing volume
    let loader = TimeSeriesLoader::with_defaults(Arc::new(yahoo));
    let series = loader
        .load("ACME", request("ACME").range)
        .await
        .expect("series");
    let json = serde_json::to_value(series.observations()).expect("serialize");
    assert!(json[0].get("adj_close").is_none());
    assert_eq!(json[0]["close"], 10.5);
    assert_eq!(series.observations()[1].volume, 0);
}

#[tokio::test]
async fn when_timestamp_is_late_evening_locally_exchange_date_is_used() {
    // Given: A bar stamped 03:00 UTC for an exchange at UTC-5
    let client = RecordingHttpClient::always(200, CHART_LATE_EVENING);

    // When: The chart is parsed
    let raw = adapter(&client)
        .daily_history(request("ACME"))
        .await
        .expect("history");

    // Then: The bar belongs to the previous local day
    assert_eq!(raw.bars[0].date, date!(2023 - 01 - 02));
}

#[tokio::test]
async fn when_chart_result_is_empty_loader_reports_no_data() {
    // Given: A chart with no timestamps
    let client = RecordingHttpClient::always(200, CHART_EMPTY);
    let yahoo = adapter(&client);
    assert!(yahoo.daily_history(request("ACME")).await.expect("history").is_empty());

    // When: The loader loads through the adapter
    let loader = TimeSeriesLoader::with_defaults(Arc::new(yahoo));
    let result = loader.load("ACME", request("ACME").range).await;

    // Then: It is a no-data failure, not a fetch failure
    assert!(matches!(result, Err(LoadError::NoData { .. })));
}

#[tokio::test]
async fn when_range_has_no_trading_days_loader_reports_no_data() {
    // Given: Yahoo answers a weekend-only range with a 400 "Data doesn't exist"
    let client = RecordingHttpClient::always(400, CHART_NO_TRADING_DAYS);
    let loader = TimeSeriesLoader::with_defaults(Arc::new(adapter(&client)));
    let weekend = DateRange::new(date!(2023 - 01 - 07), date!(2023 - 01 - 08)).expect("range");

    // When: The loader loads the weekend
    let result = loader.load("AAPL", weekend).await;

    // Then: It is a no-data failure, fetched once and not retried
    assert!(matches!(result, Err(LoadError::NoData { .. })));
    assert_eq!(client.urls().len(), 1);
}

// =============================================================================
// Chart: Error Classification
// =============================================================================

#[tokio::test]
async fn when_symbol_is_unknown_error_is_not_found() {
    // Given: Yahoo answers with its Not Found chart error
    let client = RecordingHttpClient::always(404, CHART_NOT_FOUND);

    // When: History is requested
    let error = adapter(&client)
        .daily_history(request("ZZZZZ"))
        .await
        .expect_err("unknown symbol");

    // Then: The error is a non-retryable not-found
    assert_eq!(error.kind(), SourceErrorKind::NotFound);
    assert!(!error.retryable());
    assert!(error.message().contains("delisted"));
}

#[tokio::test]
async fn when_rate_limited_error_is_retryable() {
    // Given: Yahoo returns 429 with a plain-text body
    let client = RecordingHttpClient::always(429, "Too Many Requests");

    // When: History is requested
    let error = adapter(&client)
        .daily_history(request("AAPL"))
        .await
        .expect_err("rate limited");

    // Then: The error is retryable rate limiting
    assert_eq!(error.kind(), SourceErrorKind::RateLimited);
    assert!(error.retryable());
}

#[tokio::test]
async fn when_server_fails_error_is_unavailable() {
    // Given: Yahoo returns a 503 HTML page
    let client = RecordingHttpClient::always(503, "<html>maintenance</html>");

    // When: History is requested
    let error = adapter(&client)
        .daily_history(request("AAPL"))
        .await
        .expect_err("server error");

    // Then: The error is retryable unavailability
    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert!(error.retryable());
}

#[tokio::test]
async fn when_transport_times_out_error_is_unavailable() {
    // Given: A transport that times out
    let client = RecordingHttpClient::new(|_| Err(HttpError::timeout("deadline elapsed")));

    // When: History is requested
    let error = adapter(&client)
        .daily_history(request("AAPL"))
        .await
        .expect_err("timeout");

    // Then: The error is retryable and mentions the timeout
    assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    assert!(error.message().contains("timed out"));
}

#[tokio::test]
async fn when_success_body_is_not_json_error_is_internal() {
    // Given: A 200 response that is not a chart payload
    let client = RecordingHttpClient::always(200, "<html>consent</html>");

    // When: History is requested
    let error = adapter(&client)
        .daily_history(request("AAPL"))
        .await
        .expect_err("bad payload");

    // Then: The parse failure is internal and not retried
    assert_eq!(error.kind(), SourceErrorKind::Internal);
    assert!(!error.retryable());
}

// =============================================================================
// Profile: Crumb Flow
// =============================================================================

fn summary_responder(summary_failures: usize) -> Arc<RecordingHttpClient> {
    let summary_calls = AtomicUsize::new(0);
    RecordingHttpClient::new(move |request| {
        if request.url.starts_with("https://fc.yahoo.com") {
            Ok(HttpResponse::new(404, "<html>not found</html>"))
        } else if request.url.contains("/v1/test/getcrumb") {
            Ok(HttpResponse::new(200, "abc/DEF123"))
        } else if request.url.contains("/v10/finance/quoteSummary/") {
            if summary_calls.fetch_add(1, Ordering::SeqCst) < summary_failures {
                Ok(HttpResponse::new(401, r#"{"finance":{"error":{"code":"Unauthorized"}}}"#))
            } else {
                Ok(HttpResponse::ok_json(SUMMARY_OK))
            }
        } else {
            Err(HttpError::new(format!("unexpected url {}", request.url)))
        }
    })
}

#[tokio::test]
async fn when_profile_is_requested_crumb_is_obtained_first() {
    // Given: A transport serving cookie, crumb and summary endpoints
    let client = summary_responder(0);
    let yahoo = adapter(&client);

    // When: A profile is requested twice
    let profile = yahoo
        .profile(Ticker::parse("AAPL").expect("ticker"))
        .await
        .expect("profile");
    yahoo
        .profile(Ticker::parse("AAPL").expect("ticker"))
        .await
        .expect("second profile");

    // Then: Fields are read and the crumb is fetched only once
    assert_eq!(profile.name.as_deref(), Some("Apple Inc."));
    assert_eq!(profile.sector.as_deref(), Some("Technology"));
    assert_eq!(profile.industry.as_deref(), Some("Consumer Electronics"));
    assert_eq!(profile.summary_or_unavailable(), "Designs phones.");

    let urls = client.urls();
    assert_eq!(urls.iter().filter(|url| url.contains("getcrumb")).count(), 1);
    let summary = urls
        .iter()
        .find(|url| url.contains("quoteSummary"))
        .expect("summary request");
    assert!(summary.contains("/AAPL?modules=assetProfile,price&crumb=abc%2FDEF123"));
}

#[tokio::test]
async fn when_crumb_is_rejected_it_is_refreshed_once() {
    // Given: The first summary call is unauthorized
    let client = summary_responder(1);

    // When: A profile is requested
    let profile = adapter(&client)
        .profile(Ticker::parse("AAPL").expect("ticker"))
        .await
        .expect("profile after refresh");

    // Then: A second crumb was fetched and the retry succeeded
    assert_eq!(profile.name.as_deref(), Some("Apple Inc."));
    let urls = client.urls();
    assert_eq!(urls.iter().filter(|url| url.contains("getcrumb")).count(), 2);
    assert_eq!(urls.iter().filter(|url| url.contains("quoteSummary")).count(), 2);
}

#[tokio::test]
async fn when_profile_fields_are_missing_they_read_as_unavailable() {
    // Given: A summary without industry or business summary, and a blank sector
    let client = RecordingHttpClient::new(|request| {
        if request.url.contains("getcrumb") {
            Ok(HttpResponse::new(200, "crumb"))
        } else if request.url.contains("quoteSummary") {
            Ok(HttpResponse::ok_json(SUMMARY_SPARSE))
        } else {
            Ok(HttpResponse::new(404, ""))
        }
    });

    // When: A profile is requested
    let profile = adapter(&client)
        .profile(Ticker::parse("BTC-USD").expect("ticker"))
        .await
        .expect("profile");

    // Then: Missing and blank fields are unavailable, not errors
    assert_eq!(profile.name_or_unavailable(), "Bitcoin USD");
    assert_eq!(profile.sector_or_unavailable(), "unavailable");
    assert_eq!(profile.industry_or_unavailable(), "unavailable");
    assert_eq!(profile.summary_or_unavailable(), "unavailable");
}

// =============================================================================
// Offline Mode
// =============================================================================

#[tokio::test]
async fn when_adapter_is_offline_synthetic_history_is_deterministic() {
    // Given: The default (offline) adapter
    let yahoo = YahooAdapter::default();
    assert!(yahoo.is_offline());

    // When: The same history is requested twice
    let first = yahoo.daily_history(request("GOOG")).await.expect("history");
    let second = yahoo.daily_history(request("GOOG")).await.expect("history");

    // Then: Weekday bars 01-02..01-05 come back identically
    assert_eq!(first, second);
    assert_eq!(first.bars.len(), 4);
    assert!(first
        .bars
        .iter()
        .all(|bar| bar.high >= bar.low && bar.close.unwrap_or_default() > 0.0));
}
