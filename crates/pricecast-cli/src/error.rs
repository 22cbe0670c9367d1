use pricecast_core::{LoadError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Load(LoadError::Validation(_)) => 2,
            Self::Load(LoadError::NoData { .. }) => 3,
            Self::Load(LoadError::Fetch { .. }) => 4,
            Self::Serialization(_) => 5,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use pricecast_core::{DateRange, FetchError, SourceError, Ticker};

    use super::*;

    #[test]
    fn load_failures_map_to_distinct_exit_codes() {
        let ticker = Ticker::parse("ACME").expect("ticker");

        let validation = CliError::from(LoadError::Validation(ValidationError::EmptyTicker));
        let no_data = CliError::from(LoadError::NoData {
            ticker: ticker.clone(),
            range: DateRange::default(),
        });
        let fetch = CliError::from(LoadError::Fetch {
            ticker,
            source: FetchError::Source(SourceError::unavailable("down")),
        });

        assert_eq!(validation.exit_code(), 2);
        assert_eq!(CliError::from(ValidationError::EmptyHorizon).exit_code(), 2);
        assert_eq!(no_data.exit_code(), 3);
        assert_eq!(fetch.exit_code(), 4);
    }
}
