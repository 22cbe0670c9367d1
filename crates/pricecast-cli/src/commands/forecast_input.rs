use pricecast_core::{ForecastHorizon, Session};
use time::Duration;

use crate::cli::ForecastInputArgs;
use crate::error::CliError;
use crate::output::{ForecastInputReport, Report};

use super::resolve_range;

pub async fn run(args: &ForecastInputArgs, session: &Session) -> Result<Report, CliError> {
    // reject a bad horizon before spending a fetch on it
    let horizon = ForecastHorizon::from_years(args.years)?;
    let range = resolve_range(&args.range)?;
    let series = session.loader().load(&args.range.ticker, range).await?;

    let input = series.forecast_input();
    let forecast_until = input
        .last_date()
        .and_then(|last| last.checked_add(Duration::days(i64::from(horizon.days()))));

    Ok(Report::ForecastInput(ForecastInputReport {
        ticker: input.ticker,
        range: series.range(),
        horizon_days: horizon.days(),
        forecast_until,
        rows: input.rows,
    }))
}
