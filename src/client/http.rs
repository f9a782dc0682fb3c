//! HTTP transport for the MCP client.
//!
//! Every message is a `POST {base}/mcp`. The `Mcp-Session-Id` returned by `initialize` is
//! remembered and echoed on every later request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::envelope::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::client::error::ClientError;
use crate::client::Transport;
use crate::http::session::MCP_SESSION_ID;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub server: String,
    pub version: String,
    pub transport: String,
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
    session_id: Option<String>,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::Transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_id: None,
            bearer_token: None,
            timeout,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.get_json("/health", "health").await
    }

    pub async fn server_info(&self) -> Result<ServerInfo, ClientError> {
        self.get_json("/", "server_info").await
    }

    /// Ends the server-side session; later calls fail until `initialize` runs again.
    pub async fn close_session(&mut self) -> Result<(), ClientError> {
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };

        let request = self
            .client
            .delete(self.endpoint("/mcp"))
            .header(&MCP_SESSION_ID, &session_id);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| self.map_reqwest_error("session/close", err))?;
        ensure_success(response.status(), response).await?;

        info!(session_id = %session_id, "closed MCP session");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, label: &str) -> Result<T, ClientError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(|err| self.map_reqwest_error(label, err))?;
        let response = ensure_success(response.status(), response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| self.map_reqwest_error(label, err))?;
        serde_json::from_slice(&body).map_err(ClientError::MalformedResponse)
    }

    async fn post_mcp<T: Serialize + ?Sized>(
        &mut self,
        label: &str,
        message: &T,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self.client.post(self.endpoint("/mcp")).json(message);
        if let Some(session_id) = &self.session_id {
            request = request.header(&MCP_SESSION_ID, session_id);
        }

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| self.map_reqwest_error(label, err))?;
        self.capture_session(response.headers());
        ensure_success(response.status(), response).await
    }

    fn capture_session(&mut self, headers: &HeaderMap) {
        let Some(session_id) = headers
            .get(&MCP_SESSION_ID)
            .and_then(|value| value.to_str().ok())
        else {
            return;
        };

        if self.session_id.as_deref() != Some(session_id) {
            debug!(session_id = %session_id, "captured MCP session id");
            self.session_id = Some(session_id.to_string());
        }
    }

    fn map_reqwest_error(&self, method: &str, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout {
                method: method.to_string(),
                timeout: self.timeout,
            }
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

async fn ensure_success(
    status: StatusCode,
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Transport(format!("HTTP {status}: {body}")))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ClientError> {
        debug!(method = %request.method, id = request.id, "http request");
        let response = self.post_mcp(&request.method, request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| self.map_reqwest_error(&request.method, err))?;
        serde_json::from_slice(&body).map_err(ClientError::MalformedResponse)
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<(), ClientError> {
        self.post_mcp(&notification.method, notification).await?;
        Ok(())
    }
}
