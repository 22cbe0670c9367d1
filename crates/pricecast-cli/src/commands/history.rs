use pricecast_core::Session;

use crate::cli::HistoryArgs;
use crate::error::CliError;
use crate::output::{HistoryReport, Report};

use super::resolve_range;

pub async fn run(args: &HistoryArgs, session: &Session) -> Result<Report, CliError> {
    let range = resolve_range(&args.range)?;
    let series = session.loader().load(&args.range.ticker, range).await?;

    let observations = match args.tail {
        Some(n) => series.tail(n).to_vec(),
        None => series.observations().to_vec(),
    };

    Ok(Report::History(HistoryReport {
        ticker: series.ticker().clone(),
        range: series.range(),
        source: session.loader().source_id(),
        total_rows: series.len(),
        observations,
    }))
}
