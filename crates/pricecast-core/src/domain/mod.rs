//! Domain types for daily price history.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated, normalized instrument symbol |
//! | [`DateRange`] | Inclusive calendar range with `start <= end` |
//! | [`PriceObservation`] | One daily OHLCV row |
//! | [`PriceSeries`] | Ordered, de-duplicated rows for one ticker and range |
//! | [`InstrumentProfile`] | Optional descriptive fields for a ticker |

mod date_range;
mod profile;
mod series;
mod ticker;

pub use date_range::{format_date, parse_date, DateRange, HISTORY_EPOCH};
pub(crate) use date_range::iso_date;
pub use profile::{InstrumentProfile, UNAVAILABLE};
pub use series::{PriceObservation, PriceSeries};
pub use ticker::Ticker;
