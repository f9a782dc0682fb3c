//! Weather calculation tools exposed via Model Context Protocol
//!
//! Tools form a closed set (`WeatherTool`). Each one has a typed parameter struct whose JSON
//! schema is derived for `tools/list`, and `tools/call` decodes arguments into that struct before
//! running the pure calculation.

use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::calculations::{self, DEFAULT_CLOUD_COVER, DEFAULT_OZONE_DU};
use crate::domain::filter::FunctionFilter;
use crate::mcp::rpc::{
    json_rpc_error, json_rpc_error_with_data, json_rpc_result, INTERNAL_ERROR, INVALID_PARAMS,
    METHOD_NOT_FOUND,
};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },
    #[error("failed to encode result: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[macros::mcp_tool(
    name = "celsius_to_fahrenheit",
    description = "Convert temperature from Celsius to Fahrenheit"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct CelsiusToFahrenheitTool {
    /// Temperature in Celsius
    pub celsius: f64,
}

#[macros::mcp_tool(
    name = "fahrenheit_to_celsius",
    description = "Convert temperature from Fahrenheit to Celsius"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct FahrenheitToCelsiusTool {
    /// Temperature in Fahrenheit
    pub fahrenheit: f64,
}

#[macros::mcp_tool(
    name = "calculate_heat_index",
    description = "Calculate heat index from temperature and humidity"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct HeatIndexTool {
    /// Temperature in Fahrenheit
    pub temperature_f: f64,
    /// Relative humidity percentage (0-100)
    pub humidity: f64,
}

#[macros::mcp_tool(
    name = "calculate_wind_chill",
    description = "Calculate wind chill temperature"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct WindChillTool {
    /// Temperature in Fahrenheit
    pub temperature_f: f64,
    /// Wind speed in miles per hour
    pub wind_speed_mph: f64,
}

#[macros::mcp_tool(
    name = "calculate_dew_point",
    description = "Calculate dew point from temperature and humidity"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct DewPointTool {
    /// Temperature in Celsius
    pub temperature_c: f64,
    /// Relative humidity percentage (0-100)
    pub humidity: f64,
}

#[macros::mcp_tool(
    name = "pressure_altitude_to_sea_level",
    description = "Convert pressure reading to sea level equivalent"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SeaLevelPressureTool {
    /// Pressure in hectopascals (hPa)
    pub pressure_hpa: f64,
    /// Altitude in meters above sea level
    pub altitude_m: f64,
    /// Temperature in Celsius
    pub temperature_c: f64,
}

#[macros::mcp_tool(
    name = "calculate_feels_like",
    description = "Calculate apparent temperature (feels like) considering wind and humidity"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct FeelsLikeTool {
    /// Temperature in Celsius
    pub temperature_c: f64,
    /// Relative humidity percentage (0-100)
    pub humidity: f64,
    /// Wind speed in km/h
    pub wind_speed_kmh: f64,
}

#[macros::mcp_tool(
    name = "sunrise_sunset_times",
    description = "Calculate sunrise and sunset times for given coordinates and date"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SunriseSunsetTool {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Day of year (1-365)
    pub day_of_year: i64,
}

#[macros::mcp_tool(
    name = "uv_index_from_solar_elevation",
    description = "Calculate UV index from solar elevation angle"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct UvIndexTool {
    /// Solar elevation angle in degrees (0-90)
    pub solar_elevation_degrees: f64,
    /// Ozone layer thickness in Dobson units (default: 300)
    pub ozone_thickness: Option<f64>,
    /// Cloud cover percentage (0-100, default: 0)
    pub cloud_cover: Option<f64>,
}

#[macros::mcp_tool(
    name = "saturation_vapor_pressure",
    description = "Calculate saturation vapor pressure at given temperature"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct VaporPressureTool {
    /// Temperature in Celsius
    pub temperature_c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherTool {
    CelsiusToFahrenheit,
    FahrenheitToCelsius,
    HeatIndex,
    WindChill,
    DewPoint,
    SeaLevelPressure,
    FeelsLike,
    SunriseSunset,
    UvIndex,
    VaporPressure,
}

impl WeatherTool {
    pub const ALL: [WeatherTool; 10] = [
        Self::CelsiusToFahrenheit,
        Self::FahrenheitToCelsius,
        Self::HeatIndex,
        Self::WindChill,
        Self::DewPoint,
        Self::SeaLevelPressure,
        Self::FeelsLike,
        Self::SunriseSunset,
        Self::UvIndex,
        Self::VaporPressure,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CelsiusToFahrenheit => "celsius_to_fahrenheit",
            Self::FahrenheitToCelsius => "fahrenheit_to_celsius",
            Self::HeatIndex => "calculate_heat_index",
            Self::WindChill => "calculate_wind_chill",
            Self::DewPoint => "calculate_dew_point",
            Self::SeaLevelPressure => "pressure_altitude_to_sea_level",
            Self::FeelsLike => "calculate_feels_like",
            Self::SunriseSunset => "sunrise_sunset_times",
            Self::UvIndex => "uv_index_from_solar_elevation",
            Self::VaporPressure => "saturation_vapor_pressure",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn descriptor(self) -> Tool {
        match self {
            Self::CelsiusToFahrenheit => CelsiusToFahrenheitTool::tool(),
            Self::FahrenheitToCelsius => FahrenheitToCelsiusTool::tool(),
            Self::HeatIndex => HeatIndexTool::tool(),
            Self::WindChill => WindChillTool::tool(),
            Self::DewPoint => DewPointTool::tool(),
            Self::SeaLevelPressure => SeaLevelPressureTool::tool(),
            Self::FeelsLike => FeelsLikeTool::tool(),
            Self::SunriseSunset => SunriseSunsetTool::tool(),
            Self::UvIndex => UvIndexTool::tool(),
            Self::VaporPressure => VaporPressureTool::tool(),
        }
    }
}

/// A tool invocation with its arguments already decoded into the tool's parameter struct.
#[derive(Debug)]
pub enum ToolCall {
    CelsiusToFahrenheit(CelsiusToFahrenheitTool),
    FahrenheitToCelsius(FahrenheitToCelsiusTool),
    HeatIndex(HeatIndexTool),
    WindChill(WindChillTool),
    DewPoint(DewPointTool),
    SeaLevelPressure(SeaLevelPressureTool),
    FeelsLike(FeelsLikeTool),
    SunriseSunset(SunriseSunsetTool),
    UvIndex(UvIndexTool),
    VaporPressure(VaporPressureTool),
}

impl ToolCall {
    pub fn parse(tool: WeatherTool, arguments: Map<String, Value>) -> Result<Self, ToolError> {
        let arguments = Value::Object(arguments);
        let invalid = |err: serde_json::Error| ToolError::InvalidArguments {
            tool: tool.name(),
            reason: err.to_string(),
        };

        let call = match tool {
            WeatherTool::CelsiusToFahrenheit => {
                Self::CelsiusToFahrenheit(serde_json::from_value(arguments).map_err(invalid)?)
            }
            WeatherTool::FahrenheitToCelsius => {
                Self::FahrenheitToCelsius(serde_json::from_value(arguments).map_err(invalid)?)
            }
            WeatherTool::HeatIndex => {
                Self::HeatIndex(serde_json::from_value(arguments).map_err(invalid)?)
            }
            WeatherTool::WindChill => {
                Self::WindChill(serde_json::from_value(arguments).map_err(invalid)?)
            }
            WeatherTool::DewPoint => {
                Self::DewPoint(serde_json::from_value(arguments).map_err(invalid)?)
            }
            WeatherTool::SeaLevelPressure => {
                Self::SeaLevelPressure(serde_json::from_value(arguments).map_err(invalid)?)
            }
            WeatherTool::FeelsLike => {
                Self::FeelsLike(serde_json::from_value(arguments).map_err(invalid)?)
            }
            WeatherTool::SunriseSunset => {
                Self::SunriseSunset(serde_json::from_value(arguments).map_err(invalid)?)
            }
            WeatherTool::UvIndex => {
                Self::UvIndex(serde_json::from_value(arguments).map_err(invalid)?)
            }
            WeatherTool::VaporPressure => {
                Self::VaporPressure(serde_json::from_value(arguments).map_err(invalid)?)
            }
        };

        Ok(call)
    }

    pub fn execute(&self) -> Result<Value, ToolError> {
        let payload = match self {
            Self::CelsiusToFahrenheit(params) => {
                serde_json::to_value(calculations::celsius_to_fahrenheit(params.celsius))?
            }
            Self::FahrenheitToCelsius(params) => {
                serde_json::to_value(calculations::fahrenheit_to_celsius(params.fahrenheit))?
            }
            Self::HeatIndex(params) => serde_json::to_value(calculations::calculate_heat_index(
                params.temperature_f,
                params.humidity,
            ))?,
            Self::WindChill(params) => serde_json::to_value(calculations::calculate_wind_chill(
                params.temperature_f,
                params.wind_speed_mph,
            ))?,
            Self::DewPoint(params) => serde_json::to_value(calculations::calculate_dew_point(
                params.temperature_c,
                params.humidity,
            ))?,
            Self::SeaLevelPressure(params) => {
                serde_json::to_value(calculations::pressure_altitude_to_sea_level(
                    params.pressure_hpa,
                    params.altitude_m,
                    params.temperature_c,
                ))?
            }
            Self::FeelsLike(params) => serde_json::to_value(calculations::calculate_feels_like(
                params.temperature_c,
                params.humidity,
                params.wind_speed_kmh,
            ))?,
            Self::SunriseSunset(params) => {
                serde_json::to_value(calculations::sunrise_sunset_times(
                    params.latitude,
                    params.longitude,
                    params.day_of_year,
                ))?
            }
            Self::UvIndex(params) => {
                serde_json::to_value(calculations::uv_index_from_solar_elevation(
                    params.solar_elevation_degrees,
                    params.ozone_thickness.unwrap_or(DEFAULT_OZONE_DU),
                    params.cloud_cover.unwrap_or(DEFAULT_CLOUD_COVER),
                ))?
            }
            Self::VaporPressure(params) => {
                serde_json::to_value(calculations::saturation_vapor_pressure(params.temperature_c))?
            }
        };

        Ok(payload)
    }
}

/// The set of tools a server instance exposes, fixed at startup.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<WeatherTool>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(&FunctionFilter::default())
    }
}

impl ToolRegistry {
    pub fn new(filter: &FunctionFilter) -> Self {
        let tools = WeatherTool::ALL
            .into_iter()
            .filter(|tool| filter.allows(tool.name()))
            .collect();
        Self { tools }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Result<WeatherTool, ToolError> {
        WeatherTool::from_name(name)
            .filter(|tool| self.tools.contains(tool))
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn descriptors(&self) -> Vec<Tool> {
        self.tools.iter().map(|tool| tool.descriptor()).collect()
    }

    pub fn call(&self, name: &str, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let tool = self.resolve(name)?;
        ToolCall::parse(tool, arguments)?.execute()
    }
}

pub fn build_tool_result(payload: Value) -> Result<CallToolResult, ToolError> {
    let text = serde_json::to_string_pretty(&payload)?;
    let structured_content = match payload {
        Value::Object(map) => Some(map),
        _ => None,
    };

    Ok(CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: None,
        meta: None,
        structured_content,
    })
}

pub fn tool_error_to_json_rpc(id: Option<Value>, err: ToolError) -> Value {
    match err {
        ToolError::UnknownTool(name) => json_rpc_error_with_data(
            id,
            METHOD_NOT_FOUND,
            "Method not found",
            Some(json!({
                "code": "tool_not_found",
                "message": "unknown tool name",
                "details": {
                    "name": name,
                },
            })),
        ),
        ToolError::InvalidArguments { tool, reason } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": "invalid_arguments",
                "message": reason,
                "details": {
                    "name": tool,
                },
            })),
        ),
        ToolError::Encoding(_) => json_rpc_error(id, INTERNAL_ERROR, "Internal error"),
    }
}

pub fn handle_tools_call(registry: &ToolRegistry, id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    debug!(tool = %tool_call.name, "dispatching tool call");

    let outcome = registry
        .call(&tool_call.name, tool_call.arguments.unwrap_or_default())
        .and_then(build_tool_result);

    match outcome {
        Ok(result) => match serde_json::to_value(result) {
            Ok(value) => json_rpc_result(id, value),
            Err(err) => tool_error_to_json_rpc(id, ToolError::Encoding(err)),
        },
        Err(err) => tool_error_to_json_rpc(id, err),
    }
}
