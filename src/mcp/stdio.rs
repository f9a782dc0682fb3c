//! Line-delimited JSON-RPC transport
//!
//! One JSON message per line in each direction. Requests are answered in the order they are
//! read, so a client on this transport sees responses in request order.

use std::io;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::mcp::rpc::{
    is_json_rpc_error, json_rpc_error, INVALID_REQUEST, PARSE_ERROR, SERVER_NOT_INITIALIZED,
};
use crate::mcp::server::{allowed_before_initialize, McpServer};

/// Per-connection handshake state.
#[derive(Debug, Default)]
struct Connection {
    initialized: bool,
}

impl Connection {
    fn handle(&mut self, server: &McpServer, payload: Value) -> Option<Value> {
        let method = payload
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(method) = method.as_deref() {
            let is_notification = payload.get("id").is_none();
            if !self.initialized && !allowed_before_initialize(method) {
                if is_notification {
                    return None;
                }
                return Some(json_rpc_error(
                    payload.get("id").cloned(),
                    SERVER_NOT_INITIALIZED,
                    "Server not initialized",
                ));
            }
        }

        let response = server.handle_json_rpc_value(payload);
        if method.as_deref() == Some("initialize")
            && response.as_ref().is_some_and(|value| !is_json_rpc_error(value))
        {
            self.initialized = true;
        }

        response
    }

    fn handle_batch(&mut self, server: &McpServer, batch: Vec<Value>) -> Option<Value> {
        if batch.is_empty() {
            return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
        }

        let responses = batch
            .into_iter()
            .filter_map(|item| self.handle(server, item))
            .collect::<Vec<_>>();

        (!responses.is_empty()).then_some(Value::Array(responses))
    }
}

pub async fn serve<R, W>(server: McpServer, reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(server_name = %server.server_name(), "serving MCP over stdio");

    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let mut connection = Connection::default();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&line) {
            Ok(text) if text.trim().is_empty() => continue,
            Ok(text) => match serde_json::from_str::<Value>(text.trim()) {
                Ok(Value::Array(batch)) => connection.handle_batch(&server, batch),
                Ok(payload) => connection.handle(&server, payload),
                Err(err) => {
                    warn!(error = %err, "failed to parse incoming line");
                    Some(json_rpc_error(None, PARSE_ERROR, "Parse error"))
                }
            },
            Err(err) => {
                warn!(error = %err, "incoming line is not valid UTF-8");
                Some(json_rpc_error(None, PARSE_ERROR, "Parse error"))
            }
        };

        if let Some(response) = response {
            write_message(&mut writer, &response).await?;
        }
    }

    info!("input closed, stdio transport shutting down");
    Ok(())
}

async fn write_message<W>(writer: &mut W, message: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = serde_json::to_vec(message).map_err(io::Error::other)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    debug!(bytes = encoded.len(), "wrote response line");
    Ok(())
}
