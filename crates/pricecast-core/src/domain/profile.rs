use serde::{Deserialize, Serialize};

use crate::Ticker;

/// Shown in place of any profile field the source did not provide.
pub const UNAVAILABLE: &str = "unavailable";

/// Descriptive instrument fields. Every field is optional upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentProfile {
    pub ticker: Ticker,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub business_summary: Option<String>,
}

impl InstrumentProfile {
    /// Profile with every field unavailable.
    pub fn unavailable(ticker: Ticker) -> Self {
        Self {
            ticker,
            name: None,
            sector: None,
            industry: None,
            business_summary: None,
        }
    }

    pub fn name_or_unavailable(&self) -> &str {
        or_unavailable(&self.name)
    }

    pub fn sector_or_unavailable(&self) -> &str {
        or_unavailable(&self.sector)
    }

    pub fn industry_or_unavailable(&self) -> &str {
        or_unavailable(&self.industry)
    }

    pub fn summary_or_unavailable(&self) -> &str {
        or_unavailable(&self.business_summary)
    }
}

fn or_unavailable(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(UNAVAILABLE)
}
