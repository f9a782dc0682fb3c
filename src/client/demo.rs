//! Scripted demonstration run used by the `weather-client` binary.
//!
//! Failures are collected per call instead of aborting the run.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::client::{ClientError, McpClient, ToolOutput, Transport};

pub struct Section {
    pub title: &'static str,
    pub tool: &'static str,
    pub cases: Vec<Value>,
}

pub struct Outcome {
    pub section: &'static str,
    pub tool: &'static str,
    pub arguments: Value,
    pub result: Result<ToolOutput, ClientError>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub fn temperature_conversions() -> Vec<Section> {
    vec![
        Section {
            title: "Temperature conversions",
            tool: "celsius_to_fahrenheit",
            cases: vec![json!({"celsius": 0}), json!({"celsius": 25})],
        },
        Section {
            title: "Temperature conversions",
            tool: "fahrenheit_to_celsius",
            cases: vec![json!({"fahrenheit": 32}), json!({"fahrenheit": 77})],
        },
    ]
}

pub fn weather_indices() -> Vec<Section> {
    vec![
        Section {
            title: "Heat index",
            tool: "calculate_heat_index",
            cases: vec![
                json!({"temperature_f": 85, "humidity": 70}),
                json!({"temperature_f": 95, "humidity": 50}),
                json!({"temperature_f": 100, "humidity": 80}),
            ],
        },
        Section {
            title: "Wind chill",
            tool: "calculate_wind_chill",
            cases: vec![
                json!({"temperature_f": 30, "wind_speed_mph": 15}),
                json!({"temperature_f": 10, "wind_speed_mph": 25}),
            ],
        },
        Section {
            title: "Dew point",
            tool: "calculate_dew_point",
            cases: vec![
                json!({"temperature_c": 20, "humidity": 60}),
                json!({"temperature_c": 30, "humidity": 85}),
            ],
        },
    ]
}

pub fn advanced_calculations() -> Vec<Section> {
    vec![
        Section {
            title: "Feels like",
            tool: "calculate_feels_like",
            cases: vec![
                json!({"temperature_c": 30, "humidity": 70, "wind_speed_kmh": 15}),
                json!({"temperature_c": 5, "humidity": 60, "wind_speed_kmh": 25}),
            ],
        },
        Section {
            title: "Sunrise and sunset",
            tool: "sunrise_sunset_times",
            cases: vec![
                json!({"latitude": 40.7128, "longitude": -74.0060, "day_of_year": 172}),
                json!({"latitude": 51.5074, "longitude": -0.1278, "day_of_year": 355}),
            ],
        },
        Section {
            title: "UV index",
            tool: "uv_index_from_solar_elevation",
            cases: vec![
                json!({"solar_elevation_degrees": 90, "ozone_thickness": 300, "cloud_cover": 0}),
                json!({"solar_elevation_degrees": 45, "ozone_thickness": 250, "cloud_cover": 50}),
            ],
        },
        Section {
            title: "Sea level pressure",
            tool: "pressure_altitude_to_sea_level",
            cases: vec![json!({"pressure_hpa": 1000, "altitude_m": 500, "temperature_c": 15})],
        },
        Section {
            title: "Saturation vapor pressure",
            tool: "saturation_vapor_pressure",
            cases: vec![json!({"temperature_c": 20}), json!({"temperature_c": 0})],
        },
    ]
}

pub fn all_sections() -> Vec<Section> {
    let mut sections = temperature_conversions();
    sections.extend(weather_indices());
    sections.extend(advanced_calculations());
    sections
}

/// Calls every case in `sections`, continuing past individual failures.
pub async fn run<T: Transport>(client: &mut McpClient<T>, sections: Vec<Section>) -> Vec<Outcome> {
    let mut outcomes = Vec::new();

    for section in sections {
        for arguments in section.cases {
            let object = arguments.as_object().cloned().unwrap_or_else(Map::new);
            let result = client.call_tool(section.tool, object).await;
            match &result {
                Ok(_) => info!(tool = section.tool, arguments = %arguments, "calculation succeeded"),
                Err(err) => warn!(tool = section.tool, arguments = %arguments, error = %err, "calculation failed"),
            }

            outcomes.push(Outcome {
                section: section.title,
                tool: section.tool,
                arguments,
                result,
            });
        }
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::client::LineTransport;
    use crate::domain::tools::{ToolRegistry, WeatherTool};
    use crate::mcp::{server::McpServer, stdio::serve};
    use tokio::io::{duplex, BufReader};

    #[test]
    fn every_tool_is_demonstrated() {
        let sections = all_sections();
        for tool in WeatherTool::ALL {
            assert!(
                sections.iter().any(|section| section.tool == tool.name()),
                "{} has no demonstration",
                tool.name()
            );
        }
    }

    #[tokio::test]
    async fn all_demonstrations_succeed_against_server() {
        let (client_side, server_side) = duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_side);
        tokio::spawn(serve(
            McpServer::new("weather-demo", ToolRegistry::default()),
            server_read,
            server_write,
        ));
        let (read, write) = tokio::io::split(client_side);
        let mut client = McpClient::new(LineTransport::new(
            BufReader::new(read),
            write,
            Duration::from_secs(5),
        ));
        client.initialize().await.expect("initialize");

        let outcomes = run(&mut client, all_sections()).await;
        assert_eq!(outcomes.len(), 20);
        for outcome in &outcomes {
            assert!(
                outcome.is_success(),
                "{} {} failed: {:?}",
                outcome.tool,
                outcome.arguments,
                outcome.result.as_ref().err()
            );
        }

        let london = outcomes
            .iter()
            .find(|outcome| outcome.arguments["latitude"] == 51.5074)
            .and_then(|outcome| outcome.result.as_ref().ok())
            .expect("london sunrise");
        assert!(london.result["sunrise_utc"].is_string());
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_run() {
        let (client_side, server_side) = duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_side);
        tokio::spawn(serve(
            McpServer::new("weather-demo", ToolRegistry::default()),
            server_read,
            server_write,
        ));
        let (read, write) = tokio::io::split(client_side);
        let mut client = McpClient::new(LineTransport::new(
            BufReader::new(read),
            write,
            Duration::from_secs(5),
        ));
        client.initialize().await.expect("initialize");

        let sections = vec![
            Section {
                title: "Broken",
                tool: "calculate_dew_point",
                cases: vec![json!({"temperature_c": "hot"})],
            },
            Section {
                title: "Working",
                tool: "celsius_to_fahrenheit",
                cases: vec![json!({"celsius": 100})],
            },
        ];

        let outcomes = run(&mut client, sections).await;
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].is_success());
        assert_eq!(
            outcomes[1].result.as_ref().map(|output| output.result["fahrenheit"].clone()).ok(),
            Some(json!(212.0))
        );
    }
}
