use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_TICKER_LEN: usize = 15;

/// Normalized instrument ticker (`AAPL`, `BTC-USD`, `^GSPC`, `GC=F`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Trim, uppercase and validate a ticker typed or selected by a user.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTicker);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_TICKER_LEN {
            return Err(ValidationError::TickerTooLong {
                len,
                max: MAX_TICKER_LEN,
            });
        }

        let mut chars = normalized.chars().enumerate();
        if let Some((_, first)) = chars.next() {
            if !(first.is_ascii_alphanumeric() || first == '^') {
                return Err(ValidationError::TickerInvalidStart { ch: first });
            }
        }

        for (index, ch) in chars {
            let valid = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '^' | '=');
            if !valid {
                return Err(ValidationError::TickerInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Ticker {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_uppercases() {
        let ticker = Ticker::parse("  btc-usd ").expect("ticker should parse");
        assert_eq!(ticker.as_str(), "BTC-USD");
    }

    #[test]
    fn rejects_blank_input() {
        assert_eq!(Ticker::parse(""), Err(ValidationError::EmptyTicker));
        assert_eq!(Ticker::parse(" \t "), Err(ValidationError::EmptyTicker));
    }

    #[test]
    fn accepts_index_and_futures_symbols() {
        assert_eq!(Ticker::parse("^gspc").expect("index").as_str(), "^GSPC");
        assert_eq!(Ticker::parse("gc=f").expect("future").as_str(), "GC=F");
        assert_eq!(Ticker::parse("brk.b").expect("class share").as_str(), "BRK.B");
    }

    #[test]
    fn accepts_numeric_exchange_listings() {
        for (input, expected) in [
            ("0700.hk", "0700.HK"),
            ("7203.T", "7203.T"),
            ("005930.ks", "005930.KS"),
        ] {
            let ticker = Ticker::parse(input).expect("numeric listing should parse");
            assert_eq!(ticker.as_str(), expected);
        }
    }

    #[test]
    fn rejects_invalid_start_and_chars() {
        assert!(matches!(
            Ticker::parse(".AAPL"),
            Err(ValidationError::TickerInvalidStart { ch: '.' })
        ));
        assert!(matches!(
            Ticker::parse("-X"),
            Err(ValidationError::TickerInvalidStart { ch: '-' })
        ));
        assert!(matches!(
            Ticker::parse("AA PL"),
            Err(ValidationError::TickerInvalidChar { ch: ' ', index: 2 })
        ));
    }

    #[test]
    fn rejects_overlong_ticker() {
        let err = Ticker::parse("ABCDEFGHIJKLMNOP").expect_err("must fail");
        assert_eq!(err, ValidationError::TickerTooLong { len: 16, max: 15 });
    }
}
