mod forecast_input;
mod history;
mod profile;

use std::sync::Arc;

use pricecast_core::{
    DateRange, HttpClient, LoaderConfig, MarketDataSource, ReqwestHttpClient, Session,
    YahooAdapter,
};

use crate::cli::{Cli, Command, RangeArgs};
use crate::error::CliError;
use crate::output::Report;

pub async fn run(cli: &Cli) -> Result<Report, CliError> {
    let session = build_session(cli.mock);

    match &cli.command {
        Command::History(args) => history::run(args, &session).await,
        Command::ForecastInput(args) => forecast_input::run(args, &session).await,
        Command::Profile(args) => profile::run(args, &session).await,
    }
}

fn build_session(mock: bool) -> Session {
    let config = LoaderConfig::from_env();
    let adapter = if mock {
        YahooAdapter::default()
    } else {
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        YahooAdapter::from_config(http_client, &config)
    };
    tracing::debug!(offline = adapter.is_offline(), ?config, "session configured");

    let source: Arc<dyn MarketDataSource> = Arc::new(adapter);
    Session::new(source, &config)
}

fn resolve_range(args: &RangeArgs) -> Result<DateRange, CliError> {
    Ok(DateRange::parse(args.start.as_deref(), args.end.as_deref())?)
}
