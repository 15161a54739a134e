//! One-shot weather fetch.

use std::path::Path;

use deskbar_core::services::{HttpWeatherSource, WeatherReport, WeatherSource};
use deskbar_core::{Clock, SystemClock, trace_operation};
use tracing::Instrument;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::load_settings;

/// Weather command handler
pub fn cmd_weather(config_path: Option<&Path>, format: OutputFormat) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    let source = HttpWeatherSource::from_settings(&settings.weather)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let body = runtime.block_on(
        source
            .fetch()
            .instrument(trace_operation!(deskbar_core::tracing::span_names::WEATHER_FETCH)),
    )?;
    let report = WeatherReport::from_json(&body, SystemClock.unix_timestamp())?;

    match format {
        OutputFormat::Table => println!("{}", format_report(&report)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "group": report.group,
                "description": report.description,
                "temperature": report.temperature,
            }))?
        ),
    }
    Ok(())
}

fn format_report(report: &WeatherReport) -> String {
    format!(
        "{}  {:.1}°  {}",
        report.group, report.temperature, report.description
    )
}
