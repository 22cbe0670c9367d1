//! Contract with the external forecasting model.
//!
//! The model is a black box: it takes `(ds, y)` history and a horizon and
//! returns predictions with bounds. Nothing here fits or evaluates a model.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::iso_date;
use crate::{ForecastError, PriceSeries, Ticker, ValidationError};

const DAYS_PER_YEAR: u32 = 365;
const MAX_HORIZON_YEARS: u32 = 5;

/// One `(ds, y)` training row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    #[serde(with = "iso_date")]
    pub ds: Date,
    pub y: f64,
}

/// Two-column training table derived from a series' closing prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInput {
    pub ticker: Ticker,
    pub rows: Vec<ForecastRow>,
}

impl ForecastInput {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_date(&self) -> Option<Date> {
        self.rows.last().map(|row| row.ds)
    }
}

impl PriceSeries {
    /// Builds the model input from `close`, leaving the series untouched.
    pub fn forecast_input(&self) -> ForecastInput {
        ForecastInput {
            ticker: self.ticker().clone(),
            rows: self
                .observations()
                .iter()
                .map(|observation| ForecastRow {
                    ds: observation.date,
                    y: observation.close,
                })
                .collect(),
        }
    }
}

/// Number of future days to predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastHorizon(u32);

impl ForecastHorizon {
    /// Horizon picked in whole years (1 to 5), 365 days each.
    pub fn from_years(years: u32) -> Result<Self, ValidationError> {
        if !(1..=MAX_HORIZON_YEARS).contains(&years) {
            return Err(ValidationError::HorizonYearsOutOfRange { years });
        }
        Ok(Self(years * DAYS_PER_YEAR))
    }

    pub fn from_days(days: u32) -> Result<Self, ValidationError> {
        if days == 0 {
            return Err(ValidationError::EmptyHorizon);
        }
        Ok(Self(days))
    }

    pub const fn days(self) -> u32 {
        self.0
    }
}

/// One predicted value with its uncertainty interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(with = "iso_date")]
    pub ds: Date,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Model output for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub ticker: Ticker,
    pub horizon: ForecastHorizon,
    pub points: Vec<ForecastPoint>,
}

/// External forecasting model.
pub trait Forecaster: Send + Sync {
    fn name(&self) -> &'static str;

    fn forecast<'a>(
        &'a self,
        input: ForecastInput,
        horizon: ForecastHorizon,
    ) -> Pin<Box<dyn Future<Output = Result<Forecast, ForecastError>> + Send + 'a>>;
}
