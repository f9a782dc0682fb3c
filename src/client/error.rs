//! Error types for MCP client operations.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by `McpClient` and its transports. None of them are retried.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection or HTTP level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response arrived within the per-call deadline.
    #[error("timed out after {timeout:?} waiting for {method} response")]
    Timeout { method: String, timeout: Duration },

    /// The response could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// The server answered with a JSON-RPC `error` member.
    #[error("server returned error {code}: {message}")]
    ToolInvocation {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The server subprocess exited; `stderr` holds the tail of its error output.
    #[error("server process terminated ({status}): {stderr}")]
    ProcessTerminated { status: String, stderr: String },

    /// A response arrived for a different request than the one outstanding.
    #[error("response id {received} does not match request id {expected}")]
    MismatchedResponse { expected: i64, received: Value },

    /// The readiness probe gave up.
    #[error("server not ready after {attempts} attempts in {elapsed:?}")]
    StartupTimeout { attempts: u32, elapsed: Duration },

    /// The peer closed its side of a line-delimited connection.
    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub(crate) fn malformed(message: impl std::fmt::Display) -> Self {
        Self::MalformedResponse(<serde_json::Error as serde::de::Error>::custom(message))
    }
}
