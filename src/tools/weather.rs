use reqwest::Client;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

use super::{ToolDefinition, ToolOutput};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct WeatherInput {
    #[schemars(description = "The latitude of the location")]
    latitude: f64,
    #[schemars(description = "The longitude of the location")]
    longitude: f64,
}

fn forecast_url(input: &WeatherInput) -> String {
    format!(
        "{}?latitude={}&longitude={}&current=temperature_2m&hourly=temperature_2m&daily=sunrise,sunset&timezone=auto",
        FORECAST_URL, input.latitude, input.longitude
    )
}

async fn get_current_weather_impl(http: Client, input: serde_json::Value) -> ToolOutput {
    let input: WeatherInput = serde_json::from_value(input)?;

    let response = http.get(forecast_url(&input)).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("Forecast API error: {} - {}", status, body).into());
    }

    Ok(response.json().await?)
}

pub(crate) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_current_weather",
        description: "Get the current weather at a location",
        parameters: serde_json::to_value(schema_for!(WeatherInput))
            .expect("schema for WeatherInput serializes"),
        handler: |http, input| Box::pin(get_current_weather_impl(http, input)),
    }
}
