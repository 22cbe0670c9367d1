//! One dashboard session: a loader (and its cache) plus the
//! load-then-forecast pipeline that runs on every user interaction.

use std::sync::Arc;

use crate::data_source::MarketDataSource;
use crate::{
    DateRange, Forecast, ForecastHorizon, Forecaster, InstrumentProfile, LoaderConfig,
    PipelineError, PriceSeries, Ticker, TimeSeriesLoader, ValidationError,
};

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub series: Arc<PriceSeries>,
    pub forecast: Forecast,
}

/// Owns the series cache for as long as the session lives.
#[derive(Clone)]
pub struct Session {
    source: Arc<dyn MarketDataSource>,
    loader: TimeSeriesLoader,
}

impl Session {
    pub fn new(source: Arc<dyn MarketDataSource>, config: &LoaderConfig) -> Self {
        Self {
            loader: TimeSeriesLoader::new(Arc::clone(&source), config),
            source,
        }
    }

    pub fn loader(&self) -> &TimeSeriesLoader {
        &self.loader
    }

    /// Loads history and hands its closing prices to `forecaster`.
    ///
    /// Any load failure ends the run before the forecaster is called.
    pub async fn run(
        &self,
        ticker: &str,
        range: DateRange,
        horizon: ForecastHorizon,
        forecaster: &dyn Forecaster,
    ) -> Result<SessionOutcome, PipelineError> {
        let series = self.loader.load(ticker, range).await?;

        let input = series.forecast_input();
        tracing::info!(
            ticker = %series.ticker(),
            rows = input.len(),
            horizon_days = horizon.days(),
            model = forecaster.name(),
            "requesting forecast"
        );
        let forecast = forecaster.forecast(input, horizon).await?;

        Ok(SessionOutcome { series, forecast })
    }

    /// Descriptive fields for a ticker. Source failures are logged and
    /// reported as an all-unavailable profile.
    pub async fn profile(&self, ticker: &str) -> Result<InstrumentProfile, ValidationError> {
        let ticker = Ticker::parse(ticker)?;
        match self.source.profile(ticker.clone()).await {
            Ok(profile) => Ok(profile),
            Err(error) => {
                tracing::warn!(%ticker, %error, "profile lookup failed; fields unavailable");
                Ok(InstrumentProfile::unavailable(ticker))
            }
        }
    }
}
