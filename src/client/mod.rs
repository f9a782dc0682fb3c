//! MCP client for the weather calculation server
//!
//! `McpClient` drives the handshake and tool calls over any `Transport`: a spawned stdio
//! subprocess, a remote HTTP endpoint, or an in-memory pipe in tests. Calls are strictly
//! sequential. Line transports drop late replies to calls that already timed out; any
//! other id that differs from the outstanding request is an error.

pub mod demo;
pub mod envelope;
pub mod error;
pub mod http;
pub mod readiness;
pub mod stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

pub use envelope::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
pub use error::ClientError;
pub use http::HttpTransport;
pub use stdio::{LineTransport, StdioTransport};

/// Protocol revision the client asks for during `initialize`.
pub const CLIENT_PROTOCOL_VERSION: &str = "2025-03-26";

/// Moves one request/response pair, or one fire-and-forget notification, across a connection.
#[async_trait]
pub trait Transport: Send {
    async fn exchange(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ClientError>;

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSummary {
    pub protocol_version: String,
    pub server_name: String,
    pub server_version: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Decoded payload of a successful `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolOutput {
    pub input: Value,
    pub result: Value,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

pub struct McpClient<T> {
    transport: T,
    next_id: i64,
    client_name: String,
    client_version: String,
}

impl<T: Transport> McpClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: 1,
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_name = name.into();
        self.client_version = version.into();
        self
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Sends one request and returns its `result` member.
    pub async fn send(&mut self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        let response = self.transport.exchange(&request).await?;
        if !response.matches(id) {
            return Err(ClientError::MismatchedResponse {
                expected: id,
                received: response.id,
            });
        }

        debug!(method, id, "received response");
        response.into_result()
    }

    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        self.transport
            .notify(&JsonRpcNotification::new(method, params))
            .await
    }

    /// Performs the `initialize` handshake and confirms it with `notifications/initialized`.
    pub async fn initialize(&mut self) -> Result<ServerSummary, ClientError> {
        let params = json!({
            "protocolVersion": CLIENT_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": self.client_name,
                "version": self.client_version,
            },
        });
        let result = self.send("initialize", Some(params)).await?;

        let summary = ServerSummary {
            protocol_version: string_at(&result, "/protocolVersion")?,
            server_name: string_at(&result, "/serverInfo/name")?,
            server_version: string_at(&result, "/serverInfo/version")?,
            instructions: result
                .get("instructions")
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        self.notify("notifications/initialized", None).await?;
        info!(
            server = %summary.server_name,
            version = %summary.server_version,
            protocol_version = %summary.protocol_version,
            "MCP session initialized"
        );
        Ok(summary)
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.send("ping", None).await.map(|_| ())
    }

    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ClientError> {
        let mut result = self.send("tools/list", Some(json!({}))).await?;
        let tools = result
            .get_mut("tools")
            .map(Value::take)
            .ok_or_else(|| ClientError::malformed("tools/list result has no tools array"))?;
        serde_json::from_value(tools).map_err(ClientError::MalformedResponse)
    }

    /// Calls a tool and decodes the JSON document carried in its first text block.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ClientError> {
        let result = self
            .send(
                "tools/call",
                Some(json!({"name": name, "arguments": arguments})),
            )
            .await?;

        if result.get("isError").and_then(Value::as_bool) == Some(true) {
            return Err(ClientError::ToolInvocation {
                code: 0,
                message: first_text(&result)
                    .unwrap_or("tool reported an error")
                    .to_string(),
                data: None,
            });
        }

        let text = first_text(&result)
            .ok_or_else(|| ClientError::malformed("tool result has no text content"))?;
        serde_json::from_str(text).map_err(ClientError::MalformedResponse)
    }
}

fn first_text(result: &Value) -> Option<&str> {
    result.pointer("/content/0/text").and_then(Value::as_str)
}

fn string_at(value: &Value, pointer: &str) -> Result<String, ClientError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::malformed(format!("initialize result is missing {pointer}")))
}
