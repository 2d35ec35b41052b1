use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use weather_mcp_core::{Arguments, FieldSpec, Schema, ToolOutcome, ToolResult, ToolSpec};

use super::ToolContext;
use crate::nws::{
    self, AlertProperties, AlertsResponse, ForecastPeriod, ForecastResponse, PointsResponse,
    WeatherSource,
};

pub fn alerts(ctx: &ToolContext) -> ToolSpec {
    let source = Arc::clone(&ctx.weather);
    ToolSpec::new(
        "get_alerts",
        "Get weather alerts for a state",
        Schema::new().field(
            "state",
            FieldSpec::string("Two-letter state code (e.g. CA, NY)")
                .required()
                .length(2),
        ),
        move |args: Arguments| -> ToolOutcome { get_alerts(source.as_ref(), args.parse()?) },
    )
}

pub fn forecast(ctx: &ToolContext) -> ToolSpec {
    let source = Arc::clone(&ctx.weather);
    ToolSpec::new(
        "get_forecast",
        "Get weather forecast for a location",
        Schema::new()
            .field(
                "latitude",
                FieldSpec::number("Latitude of the location")
                    .required()
                    .range(-90.0, 90.0),
            )
            .field(
                "longitude",
                FieldSpec::number("Longitude of the location")
                    .required()
                    .range(-180.0, 180.0),
            ),
        move |args: Arguments| -> ToolOutcome { get_forecast(source.as_ref(), args.parse()?) },
    )
}

#[derive(Debug, Deserialize)]
struct AlertsArgs {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
}

fn get_alerts(source: &dyn WeatherSource, args: AlertsArgs) -> ToolOutcome {
    let state = args.state.to_uppercase();
    info!(state = %state, "fetching alerts");

    let url = format!(
        "{}/alerts?area={}",
        source.base_url(),
        urlencoding::encode(&state)
    );
    let alerts: AlertsResponse = match nws::fetch(source, &url) {
        Ok(alerts) => alerts,
        Err(e) => {
            warn!(state = %state, error = %e, "could not retrieve alerts");
            return Ok(ToolResult::failure("Failed to retrieve alerts data"));
        }
    };

    if alerts.features.is_empty() {
        info!(state = %state, "no active alerts");
        return Ok(ToolResult::text(format!("No active alerts for {}", state)));
    }

    info!(state = %state, count = alerts.features.len(), "active alerts found");
    let formatted: Vec<String> = alerts
        .features
        .iter()
        .map(|f| format_alert(&f.properties))
        .collect();

    Ok(ToolResult::text(format!(
        "Active alerts for {}:\n\n{}",
        state,
        formatted.join("\n")
    )))
}

fn get_forecast(source: &dyn WeatherSource, args: ForecastArgs) -> ToolOutcome {
    let ForecastArgs {
        latitude,
        longitude,
    } = args;
    info!(latitude, longitude, "fetching forecast");

    let points_url = format!(
        "{}/points/{:.4},{:.4}",
        source.base_url(),
        latitude,
        longitude
    );
    let points: PointsResponse = match nws::fetch(source, &points_url) {
        Ok(points) => points,
        Err(e) => {
            warn!(latitude, longitude, error = %e, "could not retrieve grid point");
            return Ok(ToolResult::failure(format!(
                "Failed to retrieve grid point data for coordinates: {}, {}. \
                 This location may not be supported by the NWS API (only US locations are supported).",
                latitude, longitude
            )));
        }
    };

    let Some(forecast_url) = points.properties.and_then(|p| p.forecast) else {
        return Ok(ToolResult::failure(
            "Failed to get forecast URL from grid point data",
        ));
    };

    let forecast: ForecastResponse = match nws::fetch(source, &forecast_url) {
        Ok(forecast) => forecast,
        Err(e) => {
            warn!(url = %forecast_url, error = %e, "could not retrieve forecast");
            return Ok(ToolResult::failure("Failed to retrieve forecast data"));
        }
    };

    let periods = forecast.properties.map(|p| p.periods).unwrap_or_default();
    if periods.is_empty() {
        return Ok(ToolResult::text("No forecast periods available"));
    }

    let formatted: Vec<String> = periods.iter().map(format_period).collect();
    Ok(ToolResult::text(format!(
        "Forecast for {}, {}:\n\n{}",
        latitude,
        longitude,
        formatted.join("\n")
    )))
}

fn or<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
}

fn format_alert(props: &AlertProperties) -> String {
    [
        format!("Event: {}", or(&props.event, "Unknown")),
        format!("Area: {}", or(&props.area_desc, "Unknown")),
        format!("Severity: {}", or(&props.severity, "Unknown")),
        format!("Status: {}", or(&props.status, "Unknown")),
        format!("Headline: {}", or(&props.headline, "No headline")),
        "---".to_string(),
    ]
    .join("\n")
}

fn format_period(period: &ForecastPeriod) -> String {
    let temperature = period
        .temperature
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    [
        format!("{}:", or(&period.name, "Unknown")),
        format!(
            "Temperature: {}°{}",
            temperature,
            or(&period.temperature_unit, "F")
        ),
        format!(
            "Wind: {} {}",
            or(&period.wind_speed, "Unknown"),
            or(&period.wind_direction, "")
        ),
        or(&period.short_forecast, "No forecast available").to_string(),
        "---".to_string(),
    ]
    .join("\n")
}
