//! Axum HTTP handlers for the web server
//!
//! Provides the primary Model Context Protocol endpoint, session teardown, and general
//! metadata endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::http::session::McpSessionId;
use crate::mcp::rpc::{is_json_rpc_error, json_rpc_error, INVALID_REQUEST, PARSE_ERROR};
use crate::mcp::server::{McpServer, LATEST_PROTOCOL_VERSION};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ServerInfoResponse {
    pub server: String,
    pub version: &'static str,
    pub transport: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub mcp_endpoint: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        server: state.mcp.server_name().to_string(),
        version: env!("CARGO_PKG_VERSION"),
        transport: "http",
    })
}

pub async fn discovery() -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        mcp_endpoint: "/mcp",
    })
}

pub async fn mcp_endpoint(
    State(state): State<AppState>,
    session_header: Option<TypedHeader<McpSessionId>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return Ok((
                StatusCode::OK,
                Json(json_rpc_error(None, PARSE_ERROR, "Parse error")),
            )
                .into_response())
        }
    };

    if is_initialize(&payload) {
        return Ok(initialize_session(&state, payload).await);
    }

    let session_id = require_session(&state, session_header).await?;
    let response = dispatch(&state.mcp, payload);
    Ok(with_session_header(session_id, response))
}

pub async fn delete_session(
    State(state): State<AppState>,
    session_header: Option<TypedHeader<McpSessionId>>,
) -> Result<StatusCode, AppError> {
    let session_id = require_session(&state, session_header).await?;
    if let Some(session) = state.sessions.remove(&session_id).await {
        let age_secs = (Utc::now() - session.created_at).num_seconds();
        info!(
            session_id = %session_id,
            protocol_version = %session.protocol_version,
            age_secs,
            "mcp session closed"
        );
    }
    Ok(StatusCode::NO_CONTENT)
}

fn is_initialize(payload: &Value) -> bool {
    payload.get("method").and_then(Value::as_str) == Some("initialize")
}

async fn initialize_session(state: &AppState, payload: Value) -> Response {
    let client_name = payload
        .pointer("/params/clientInfo/name")
        .and_then(Value::as_str)
        .map(str::to_string);

    let Some(response) = state.mcp.handle_json_rpc_value(payload) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    if is_json_rpc_error(&response) {
        return (StatusCode::OK, Json(response)).into_response();
    }

    let protocol_version = response
        .pointer("/result/protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(LATEST_PROTOCOL_VERSION);
    let session_id = state.sessions.create(protocol_version, client_name).await;
    info!(
        session_id = %session_id,
        protocol_version = %protocol_version,
        "mcp session created"
    );

    with_session_header(session_id, (StatusCode::OK, Json(response)).into_response())
}

async fn require_session(
    state: &AppState,
    session_header: Option<TypedHeader<McpSessionId>>,
) -> Result<String, AppError> {
    let Some(TypedHeader(McpSessionId(session_id))) = session_header else {
        return Err(AppError::bad_request(
            "missing_session",
            "Mcp-Session-Id header is required after initialize",
        ));
    };

    if !state.sessions.touch(&session_id).await {
        return Err(AppError::not_found(
            "unknown_session",
            "session does not exist or has been closed",
        ));
    }

    Ok(session_id)
}

fn with_session_header(session_id: String, response: Response) -> Response {
    (TypedHeader(McpSessionId(session_id)), response).into_response()
}

fn dispatch(server: &McpServer, payload: Value) -> Response {
    if let Some(batch) = payload.as_array() {
        if batch.is_empty() {
            return (
                StatusCode::OK,
                Json(vec![json_rpc_error(None, INVALID_REQUEST, "Invalid Request")]),
            )
                .into_response();
        }

        let responses = batch
            .iter()
            .filter_map(|item| server.handle_json_rpc_value(item.clone()))
            .collect::<Vec<_>>();

        if responses.is_empty() {
            return StatusCode::NO_CONTENT.into_response();
        }

        return (StatusCode::OK, Json(Value::Array(responses))).into_response();
    }

    match server.handle_json_rpc_value(payload) {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
