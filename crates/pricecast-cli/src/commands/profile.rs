use pricecast_core::Session;

use crate::cli::ProfileArgs;
use crate::error::CliError;
use crate::output::{ProfileReport, Report};

pub async fn run(args: &ProfileArgs, session: &Session) -> Result<Report, CliError> {
    let profile = session.profile(&args.ticker).await?;

    Ok(Report::Profile(ProfileReport {
        name: profile.name_or_unavailable().to_owned(),
        sector: profile.sector_or_unavailable().to_owned(),
        industry: profile.industry_or_unavailable().to_owned(),
        business_summary: profile.summary_or_unavailable().to_owned(),
        ticker: profile.ticker,
    }))
}
