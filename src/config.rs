use std::{env, fmt, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use crate::domain::filter::FunctionFilter;

pub const DEFAULT_SERVER_NAME: &str = "weather-calculations-mcp-server";
pub const DEFAULT_BIND_PORT: u16 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Http,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            _ => Err(ConfigError::InvalidTransport),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportKind,
    pub server_name: String,
    pub api_token: Option<String>,
    pub bind_addr: String,
    pub bind_port: u16,
    pub enable_tools: bool,
    pub function_filter: FunctionFilter,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MCP_TRANSPORT must be one of: stdio, http")]
    InvalidTransport,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("{0} must be true or false")]
    InvalidFlag(&'static str),
    #[error("invalid function filter pattern: {0}")]
    InvalidFunctionPattern(#[from] regex::Error),
    #[error("WEATHER_MCP_TIMEOUT_SECS must be a positive integer")]
    InvalidTimeout,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let transport = optional_var("MCP_TRANSPORT")
            .map(|value| value.parse::<TransportKind>())
            .transpose()?
            .unwrap_or(TransportKind::Stdio);
        let server_name =
            optional_var("MCP_SERVER_NAME").unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());
        let api_token = optional_var("MCP_API_TOKEN");
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let bind_port = env::var("BIND_PORT")
            .ok()
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(DEFAULT_BIND_PORT);
        let enable_tools = optional_var("MCP_ENABLE_TOOLS")
            .map(|value| parse_flag("MCP_ENABLE_TOOLS", &value))
            .transpose()?
            .unwrap_or(true);
        let function_filter = FunctionFilter::from_lists(
            &env::var("MCP_FUNCTION_ALLOWLIST").unwrap_or_default(),
            &env::var("MCP_FUNCTION_DENYLIST").unwrap_or_default(),
        )?;

        let config = Self {
            transport,
            server_name,
            api_token,
            bind_addr,
            bind_port,
            enable_tools,
            function_filter,
        };

        if config.transport == TransportKind::Http {
            let _ = config.bind_socket()?;
        }
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

/// Settings for the demonstration client binary.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub transport: TransportKind,
    pub base_url: String,
    pub server_bin: PathBuf,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let transport = optional_var("WEATHER_MCP_TRANSPORT")
            .map(|value| value.parse::<TransportKind>())
            .transpose()?
            .unwrap_or(TransportKind::Stdio);
        let base_url = optional_var("WEATHER_MCP_URL")
            .unwrap_or_else(|| format!("http://127.0.0.1:{DEFAULT_BIND_PORT}"));
        let server_bin = optional_var("WEATHER_MCP_SERVER_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(default_server_bin);
        let timeout = optional_var("WEATHER_MCP_TIMEOUT_SECS")
            .map(|value| match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                _ => Err(ConfigError::InvalidTimeout),
            })
            .transpose()?
            .unwrap_or(Duration::from_secs(15));

        Ok(Self {
            transport,
            base_url,
            server_bin,
            api_token: optional_var("WEATHER_MCP_API_TOKEN"),
            timeout,
        })
    }
}

fn default_server_bin() -> PathBuf {
    let name = env!("CARGO_PKG_NAME");
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(name)))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag(key)),
    }
}
