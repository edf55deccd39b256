//! Weather tool
//!
//! OpenWeatherMap current-conditions client. The location is pulled from the
//! query ("weather in Eldoret") or falls back to the configured default.

use crate::config::WeatherConfig;
use crate::tools::{Tool, ToolInput, ToolKind, ToolOutput};
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

pub struct WeatherTool {
    client: Client,
    api_key: String,
    base_url: String,
    default_location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub name: String,
    pub main: WeatherMain,
    pub weather: Vec<WeatherCondition>,
    pub wind: WeatherWind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherWind {
    pub speed: f64,
}

impl WeatherTool {
    pub fn new(config: &WeatherConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_location: config.default_location.clone(),
        }
    }

    pub async fn current(&self, location: &str) -> AppResult<CurrentWeather> {
        let url = format!("{}/weather", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Tool {
                tool: "weather",
                message: format!("weather request failed: {e}"),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::Tool {
                tool: "weather",
                message: format!("unknown location: {location}"),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Tool {
                tool: "weather",
                message: format!("weather API returned {status}: {text}"),
            });
        }

        let weather: CurrentWeather = response.json().await.map_err(|e| AppError::Tool {
            tool: "weather",
            message: format!("invalid weather response: {e}"),
        })?;

        info!(location = %weather.name, temp = weather.main.temp, "Fetched current weather");

        Ok(weather)
    }
}

/// Pull a location out of "... in Eldoret", "... at Kitale", "... for Nakuru".
/// Trailing punctuation and question marks are stripped.
pub fn extract_location(query: &str) -> Option<String> {
    let lower = query.to_lowercase();

    for marker in [" in ", " at ", " for ", " near "] {
        if let Some(pos) = lower.rfind(marker) {
            // Offsets come from the lowercased copy; slice fallibly in case
            // lowercasing shifted byte positions.
            let Some(after) = query.get(pos + marker.len()..) else {
                continue;
            };
            let location: String = after
                .chars()
                .take_while(|c| c.is_alphabetic() || c.is_whitespace() || *c == '-' || *c == '\'')
                .collect();
            let location = location.trim();
            if !location.is_empty() {
                return Some(location.to_string());
            }
        }
    }

    None
}

fn format_weather(weather: &CurrentWeather) -> String {
    let description = weather
        .weather
        .first()
        .map(|c| c.description.clone())
        .unwrap_or_else(|| "conditions unavailable".to_string());

    format!(
        "Current weather in {}: {:.1}°C, {}, humidity {:.0}%, wind {:.1} m/s.",
        weather.name, weather.main.temp, description, weather.main.humidity, weather.wind.speed
    )
}

#[async_trait]
impl Tool for WeatherTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Weather
    }

    fn description(&self) -> &'static str {
        "Reports current weather conditions for a named location (temperature, humidity, wind)"
    }

    async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput> {
        let location =
            extract_location(&input.query).unwrap_or_else(|| self.default_location.clone());

        let weather = self.current(&location).await?;

        Ok(ToolOutput {
            tool: self.kind(),
            content: format_weather(&weather),
            data: Some(serde_json::json!({
                "location": weather.name,
                "temp_c": weather.main.temp,
                "humidity": weather.main.humidity,
                "wind_ms": weather.wind.speed,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_location() {
        assert_eq!(
            extract_location("What's the weather in Eldoret?"),
            Some("Eldoret".to_string())
        );
        assert_eq!(
            extract_location("forecast for Nakuru"),
            Some("Nakuru".to_string())
        );
        assert_eq!(extract_location("will it rain tomorrow"), None);
    }

    #[test]
    fn test_extract_location_uses_last_marker() {
        assert_eq!(
            extract_location("weather in the field in Kitale"),
            Some("Kitale".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_location_is_a_tool_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/weather")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body(r#"{"cod":"404","message":"city not found"}"#)
            .create_async()
            .await;

        let tool = WeatherTool::new(&WeatherConfig {
            api_key: "test-key".to_string(),
            base_url: server.url(),
            default_location: "Nairobi".to_string(),
        });

        let err = tool.current("Atlantis").await.unwrap_err();
        assert!(matches!(err, AppError::Tool { tool: "weather", .. }));
    }

    #[test]
    fn test_format_weather() {
        let weather = CurrentWeather {
            name: "Eldoret".to_string(),
            main: WeatherMain {
                temp: 21.3,
                humidity: 64.0,
            },
            weather: vec![WeatherCondition {
                description: "scattered clouds".to_string(),
            }],
            wind: WeatherWind { speed: 3.4 },
        };

        let formatted = format_weather(&weather);
        assert!(formatted.contains("Eldoret"));
        assert!(formatted.contains("21.3°C"));
        assert!(formatted.contains("scattered clouds"));
    }
}
