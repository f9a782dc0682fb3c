use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::http::session::MCP_SESSION_ID;

/// Logs go to stderr so stdout stays reserved for stdio transport messages.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// One summary event per HTTP request, levelled by status class.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let session_id = request
        .headers()
        .get(&MCP_SESSION_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let duration_ms = started_at.elapsed().as_millis();

    match status {
        500.. => error!(%method, %path, %session_id, status, duration_ms, "request failed"),
        401 => warn!(%method, %path, status, duration_ms, "authentication failure"),
        400 | 404 if path == "/mcp" => {
            warn!(%method, %session_id, status, duration_ms, "mcp session rejected")
        }
        _ => info!(%method, %path, %session_id, status, duration_ms, "request summary"),
    }

    response
}
