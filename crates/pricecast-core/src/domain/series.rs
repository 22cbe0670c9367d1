use serde::{Deserialize, Serialize};
use time::Date;

use super::date_range::iso_date;
use crate::{DateRange, Ticker, ValidationError};

/// One daily OHLCV bar. Adjusted prices are never carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceObservation {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_price("open", open)?;
        validate_price("high", high)?;
        validate_price("low", low)?;
        validate_price("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Daily history for one ticker over one range, strictly ascending by date.
///
/// Handed out behind an `Arc` by the loader; there are no mutating accessors,
/// so callers that need a different shape build a new value from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: Ticker,
    range: DateRange,
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    /// Builds a series, ordering rows by date and keeping the last row seen
    /// for any repeated date.
    pub fn new(ticker: Ticker, range: DateRange, mut observations: Vec<PriceObservation>) -> Self {
        // stable sort keeps arrival order within a date, so the later row wins below
        observations.sort_by_key(|observation| observation.date);

        let mut unique: Vec<PriceObservation> = Vec::with_capacity(observations.len());
        for observation in observations {
            match unique.last_mut() {
                Some(last) if last.date == observation.date => *last = observation,
                _ => unique.push(observation),
            }
        }

        Self {
            ticker,
            range,
            observations: unique,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first(&self) -> Option<&PriceObservation> {
        self.observations.first()
    }

    pub fn last(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }

    /// The most recent `n` rows, oldest first.
    pub fn tail(&self, n: usize) -> &[PriceObservation] {
        let start = self.observations.len().saturating_sub(n);
        &self.observations[start..]
    }
}

fn validate_price(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
