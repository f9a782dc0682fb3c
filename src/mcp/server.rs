//! The central Model Context Protocol engine
//!
//! Provides the primary MCP JSON-RPC decoding, method execution routing, capabilities
//! negotiation (`initialize`), and tool dispatch. Transports (stdio and HTTP) share this engine
//! and only differ in how they frame messages and track sessions.

use std::sync::Arc;

use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, JsonrpcMessage, ListToolsResult, ServerCapabilities,
    ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::info;

use crate::config::Config;
use crate::domain::tools::{handle_tools_call, ToolRegistry};
use crate::errors::AppError;
use crate::mcp::rpc::{
    app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_result,
    request_id_to_value, INTERNAL_ERROR, INVALID_REQUEST, METHOD_NOT_FOUND,
};

pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] =
    [LATEST_PROTOCOL_VERSION, "2025-03-26", "2024-11-05"];

#[derive(Clone)]
pub struct McpServer {
    server_name: Arc<str>,
    enable_tools: bool,
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(server_name: impl Into<Arc<str>>, registry: ToolRegistry) -> Self {
        Self {
            server_name: server_name.into(),
            enable_tools: true,
            registry: Arc::new(registry),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let registry = ToolRegistry::new(&config.function_filter);
        info!(
            server_name = %config.server_name,
            tools = registry.len(),
            enable_tools = config.enable_tools,
            "registered weather calculation tools"
        );

        Self::new(config.server_name.as_str(), registry).with_tools_enabled(config.enable_tools)
    }

    pub fn with_tools_enabled(mut self, enabled: bool) -> Self {
        self.enable_tools = enabled;
        self
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn handle_json_rpc_value(&self, payload: Value) -> Option<Value> {
        if !payload.is_object() {
            return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
        }

        let request_id = payload.get("id").cloned();
        let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
            Ok(message) => message,
            Err(_) => return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request")),
        };

        match parsed {
            JsonrpcMessage::Request(request) => {
                let request_id = request_id_to_value(request.id);
                if request.method.trim().is_empty() {
                    return Some(json_rpc_error(
                        Some(request_id),
                        INVALID_REQUEST,
                        "Invalid Request",
                    ));
                }

                Some(self.handle_json_rpc_request(
                    Some(request_id),
                    &request.method,
                    request.params.map(Value::Object),
                ))
            }
            JsonrpcMessage::Notification(notification) => {
                if notification.method.trim().is_empty() {
                    return None;
                }

                let _ = self.handle_json_rpc_request(
                    None,
                    &notification.method,
                    notification.params.map(Value::Object),
                );
                None
            }
            JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
                Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request"))
            }
        }
    }

    pub fn handle_json_rpc_request(
        &self,
        id: Option<Value>,
        method: &str,
        params: Option<Value>,
    ) -> Value {
        let audit_params = redact_audit_params(params.as_ref());

        let response = match method {
            "initialize" => self.handle_initialize(id, params.as_ref()),
            "ping" => json_rpc_result(id, json!({})),
            "tools/list" if self.enable_tools => {
                match serde_json::to_value(ListToolsResult {
                    meta: None,
                    next_cursor: None,
                    tools: self.registry.descriptors(),
                }) {
                    Ok(result) => json_rpc_result(id, result),
                    Err(_) => json_rpc_error(id, INTERNAL_ERROR, "Internal error"),
                }
            }
            "tools/call" if self.enable_tools => handle_tools_call(&self.registry, id, params),
            notification if notification.starts_with("notifications/") => {
                json_rpc_result(id, json!({}))
            }
            _ => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
        };

        info!(
            method = %method,
            params = %audit_params,
            outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
            "mcp action audited"
        );

        response
    }

    fn handle_initialize(&self, id: Option<Value>, params: Option<&Value>) -> Value {
        let protocol_version = match negotiate_protocol_version(params) {
            Ok(version) => version,
            Err(err) => return app_error_to_json_rpc(id, err),
        };

        let initialize_result = InitializeResult {
            server_info: Implementation {
                name: self.server_name.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                description: Some("Pure weather calculation functions MCP server".to_string()),
                icons: vec![],
                website_url: None,
            },
            capabilities: ServerCapabilities {
                tools: self.enable_tools.then_some(ServerCapabilitiesTools {
                    list_changed: Some(false),
                }),
                resources: None,
                prompts: None,
                ..Default::default()
            },
            protocol_version: protocol_version.to_string(),
            instructions: None,
            meta: None,
        };

        match serde_json::to_value(initialize_result) {
            Ok(result) => json_rpc_result(id, result),
            Err(err) => app_error_to_json_rpc(id, AppError::internal(err.to_string())),
        }
    }
}

/// Methods that may be sent before the `initialize` handshake has completed.
pub fn allowed_before_initialize(method: &str) -> bool {
    matches!(method, "initialize" | "ping")
}

/// Echoes a supported `protocolVersion`, otherwise answers with the latest supported one.
pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<&'static str, AppError> {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_protocol_version",
                "initialize params.protocolVersion is required",
            )
        })?;

    Ok(SUPPORTED_PROTOCOL_VERSIONS
        .into_iter()
        .find(|version| *version == offered_version)
        .unwrap_or(LATEST_PROTOCOL_VERSION))
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server() -> McpServer {
        McpServer::new("weather-test", ToolRegistry::default())
    }

    #[test]
    fn redacts_sensitive_fields_in_audit_params() {
        let params = json!({
            "name": "celsius_to_fahrenheit",
            "arguments": {
                "celsius": 25,
                "token": "should-not-appear",
                "nested": {
                    "secret": "should-not-appear"
                }
            }
        });

        let redacted = redact_audit_params(Some(&params));

        assert_eq!(redacted["name"], json!("celsius_to_fahrenheit"));
        assert_eq!(redacted["arguments"]["celsius"], json!(25));
        assert_eq!(redacted["arguments"]["token"], json!("[REDACTED]"));
        assert_eq!(
            redacted["arguments"]["nested"]["secret"],
            json!("[REDACTED]")
        );
    }

    #[test]
    fn negotiate_protocol_version_echoes_supported_version() {
        let params = json!({ "protocolVersion": "2025-03-26" });
        assert_eq!(
            negotiate_protocol_version(Some(&params)).expect("supported version"),
            "2025-03-26"
        );
    }

    #[test]
    fn negotiate_protocol_version_falls_back_to_latest() {
        let params = json!({ "protocolVersion": "2030-01-01" });
        assert_eq!(
            negotiate_protocol_version(Some(&params)).expect("fallback version"),
            LATEST_PROTOCOL_VERSION
        );
    }

    #[test]
    fn negotiate_protocol_version_requires_version() {
        let error = negotiate_protocol_version(Some(&json!({}))).expect_err("missing version");
        assert!(error.to_string().contains("bad request"));
    }

    #[test]
    fn response_id_matches_request_id() {
        let response = server()
            .handle_json_rpc_value(json!({"jsonrpc": "2.0", "id": 5, "method": "ping"}))
            .expect("requests get a response");
        assert_eq!(response["id"], json!(5));
        assert_eq!(response["result"], json!({}));
    }

    #[test]
    fn initialize_reports_server_info_and_tools_capability() {
        let response = server()
            .handle_json_rpc_value(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2025-03-26",
                    "clientInfo": {"name": "weather-client", "version": "1.0.0"}
                }
            }))
            .expect("initialize response");

        assert_eq!(response["result"]["protocolVersion"], json!("2025-03-26"));
        assert_eq!(response["result"]["serverInfo"]["name"], json!("weather-test"));
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn notifications_get_no_response() {
        let response = server().handle_json_rpc_value(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }));
        assert!(response.is_none());
    }

    #[test]
    fn disabled_tools_are_not_routed() {
        let server = server().with_tools_enabled(false);
        let response = server
            .handle_json_rpc_value(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
            .expect("response");
        assert_eq!(response["error"]["code"], json!(-32601));

        let initialize = server
            .handle_json_rpc_value(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "initialize",
                "params": {"protocolVersion": "2024-11-05"}
            }))
            .expect("response");
        assert!(initialize["result"]["capabilities"]["tools"].is_null());
    }

    #[test]
    fn non_object_payload_is_invalid_request() {
        let response = server()
            .handle_json_rpc_value(json!("ping"))
            .expect("response");
        assert_eq!(response["error"]["code"], json!(-32600));
    }

    #[test]
    fn before_initialize_only_handshake_methods_are_allowed() {
        assert!(allowed_before_initialize("initialize"));
        assert!(allowed_before_initialize("ping"));
        assert!(!allowed_before_initialize("tools/call"));
    }
}
