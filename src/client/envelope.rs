//! Client-side JSON-RPC 2.0 envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::error::ClientError;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: i64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// A request without an `id`; the server sends nothing back.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl JsonRpcResponse {
    pub fn matches(&self, request_id: i64) -> bool {
        self.id.as_i64() == Some(request_id)
    }

    /// True for a reply to a request issued before `request_id`.
    pub fn precedes(&self, request_id: i64) -> bool {
        self.id.as_i64().is_some_and(|id| id < request_id)
    }

    /// Unwraps the `result` member, surfacing an `error` member as `ToolInvocation`.
    pub fn into_result(self) -> Result<Value, ClientError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(ClientError::ToolInvocation {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ClientError::malformed(
                "response carries neither result nor error",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_absent_params() {
        let encoded = serde_json::to_value(JsonRpcRequest::new(1, "tools/list", None))
            .expect("serialize");
        assert_eq!(encoded, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}));
    }

    #[test]
    fn notification_has_no_id() {
        let encoded =
            serde_json::to_value(JsonRpcNotification::new("notifications/initialized", None))
                .expect("serialize");
        assert!(encoded.get("id").is_none());
    }

    #[test]
    fn error_member_becomes_tool_invocation_error() {
        let response: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .expect("decode");

        assert!(response.matches(3));
        let err = response.into_result().expect_err("error response");
        assert!(matches!(err, ClientError::ToolInvocation { code: -32601, .. }));
    }

    #[test]
    fn empty_response_is_malformed() {
        let response: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1})).expect("decode");
        assert!(matches!(
            response.into_result(),
            Err(ClientError::MalformedResponse(_))
        ));
    }
}
