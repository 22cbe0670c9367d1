use std::io::Write;

use pricecast_core::{format_date, DateRange, ForecastRow, PriceObservation, Ticker};
use serde::{Serialize, Serializer};
use time::Date;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Result of one command, ready to render.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    History(HistoryReport),
    ForecastInput(ForecastInputReport),
    Profile(ProfileReport),
}

#[derive(Debug, Serialize)]
pub struct HistoryReport {
    pub ticker: Ticker,
    pub range: DateRange,
    pub source: &'static str,
    pub total_rows: usize,
    pub observations: Vec<PriceObservation>,
}

#[derive(Debug, Serialize)]
pub struct ForecastInputReport {
    pub ticker: Ticker,
    pub range: DateRange,
    pub horizon_days: u32,
    #[serde(serialize_with = "serialize_optional_date")]
    pub forecast_until: Option<Date>,
    pub rows: Vec<ForecastRow>,
}

#[derive(Debug, Serialize)]
pub struct ProfileReport {
    pub ticker: Ticker,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub business_summary: String,
}

pub fn render<W: Write>(
    report: &Report,
    format: OutputFormat,
    pretty: bool,
    out: &mut W,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(report)?
            } else {
                serde_json::to_string(report)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => match report {
            Report::History(report) => render_history_table(report, out)?,
            Report::ForecastInput(report) => render_forecast_input_table(report, out)?,
            Report::Profile(report) => render_profile_table(report, out)?,
        },
    }

    Ok(())
}

fn render_history_table<W: Write>(report: &HistoryReport, out: &mut W) -> Result<(), CliError> {
    writeln!(out, "ticker : {}", report.ticker)?;
    writeln!(out, "range  : {}", report.range)?;
    writeln!(out, "source : {}", report.source)?;
    writeln!(
        out,
        "rows   : {} of {}",
        report.observations.len(),
        report.total_rows
    )?;
    writeln!(
        out,
        "{:<10}  {:>12}  {:>12}  {:>12}  {:>12}  {:>14}",
        "date", "open", "high", "low", "close", "volume"
    )?;
    for row in &report.observations {
        writeln!(
            out,
            "{:<10}  {:>12.4}  {:>12.4}  {:>12.4}  {:>12.4}  {:>14}",
            format_date(row.date),
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume
        )?;
    }
    Ok(())
}

fn render_forecast_input_table<W: Write>(
    report: &ForecastInputReport,
    out: &mut W,
) -> Result<(), CliError> {
    writeln!(out, "ticker  : {}", report.ticker)?;
    writeln!(out, "range   : {}", report.range)?;
    writeln!(out, "horizon : {} days", report.horizon_days)?;
    if let Some(until) = report.forecast_until {
        writeln!(out, "until   : {}", format_date(until))?;
    }
    writeln!(out, "{:<10}  {:>12}", "ds", "y")?;
    for row in &report.rows {
        writeln!(out, "{:<10}  {:>12.4}", format_date(row.ds), row.y)?;
    }
    Ok(())
}

fn render_profile_table<W: Write>(report: &ProfileReport, out: &mut W) -> Result<(), CliError> {
    writeln!(out, "ticker   : {}", report.ticker)?;
    writeln!(out, "name     : {}", report.name)?;
    writeln!(out, "sector   : {}", report.sector)?;
    writeln!(out, "industry : {}", report.industry)?;
    writeln!(out, "summary  :")?;
    writeln!(out, "  {}", report.business_summary)?;
    Ok(())
}

fn serialize_optional_date<S>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(date) => serializer.serialize_some(&format_date(*date)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn profile_report() -> Report {
        Report::Profile(ProfileReport {
            ticker: Ticker::parse("NFLX").expect("ticker"),
            name: String::from("Netflix, Inc."),
            sector: String::from("unavailable"),
            industry: String::from("unavailable"),
            business_summary: String::from("unavailable"),
        })
    }

    fn rendered(report: &Report, format: OutputFormat) -> String {
        let mut buffer = Vec::new();
        render(report, format, false, &mut buffer).expect("render");
        String::from_utf8(buffer).expect("utf8")
    }

    #[test]
    fn json_output_is_the_bare_report() {
        let json: serde_json::Value =
            serde_json::from_str(&rendered(&profile_report(), OutputFormat::Json)).expect("json");
        assert_eq!(json["ticker"], "NFLX");
        assert_eq!(json["sector"], "unavailable");
    }

    #[test]
    fn forecast_input_serializes_dates_as_text() {
        let report = Report::ForecastInput(ForecastInputReport {
            ticker: Ticker::parse("GOOG").expect("ticker"),
            range: DateRange::new(date!(2023 - 01 - 01), date!(2023 - 01 - 05)).expect("range"),
            horizon_days: 365,
            forecast_until: Some(date!(2024 - 01 - 04)),
            rows: vec![ForecastRow {
                ds: date!(2023 - 01 - 04),
                y: 88.5,
            }],
        });

        let json: serde_json::Value =
            serde_json::from_str(&rendered(&report, OutputFormat::Json)).expect("json");
        assert_eq!(json["forecast_until"], "2024-01-04");
        assert_eq!(json["rows"][0]["ds"], "2023-01-04");

        let table = rendered(&report, OutputFormat::Table);
        assert!(table.contains("horizon : 365 days"));
        assert!(table
            .lines()
            .any(|line| line.starts_with("2023-01-04") && line.ends_with("88.5000")));
    }

    #[test]
    fn profile_table_lists_unavailable_fields() {
        let table = rendered(&profile_report(), OutputFormat::Table);
        assert!(table.contains("name     : Netflix, Inc."));
        assert!(table.contains("industry : unavailable"));
    }
}
