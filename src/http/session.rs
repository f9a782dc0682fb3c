//! HTTP session tracking
//!
//! A session is created by a successful `initialize` and identified by the `Mcp-Session-Id`
//! header, which clients echo on every later request.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::http::{HeaderName, HeaderValue};
use axum_extra::headers::{self, Header};
use chrono::{DateTime, Utc};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::info;
use uuid::Uuid;

/// Sessions unused for this long are treated as closed.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub static MCP_SESSION_ID: HeaderName = HeaderName::from_static("mcp-session-id");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpSessionId(pub String);

impl Header for McpSessionId {
    fn name() -> &'static HeaderName {
        &MCP_SESSION_ID
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        values
            .next()
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .ok_or_else(headers::Error::invalid)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        if let Ok(value) = HeaderValue::from_str(&self.0) {
            values.extend(std::iter::once(value));
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub protocol_version: String,
    pub client_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl SessionInfo {
    fn is_idle(&self, now: DateTime<Utc>, max_idle: Duration) -> bool {
        (now - self.last_seen).to_std().is_ok_and(|idle| idle >= max_idle)
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionInfo>>>,
    max_idle: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(SESSION_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(max_idle: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            max_idle,
        }
    }

    pub async fn create(&self, protocol_version: &str, client_name: Option<String>) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let info = SessionInfo {
            protocol_version: protocol_version.to_string(),
            client_name,
            created_at: now,
            last_seen: now,
        };
        self.sessions.write().await.insert(id.clone(), info);
        id
    }

    /// Marks a live session as used. Idle sessions are dropped and reported as unknown.
    pub async fn touch(&self, id: &str) -> bool {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(info) if info.is_idle(now, self.max_idle) => {
                sessions.remove(id);
                false
            }
            Some(info) => {
                info.last_seen = now;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: &str) -> Option<SessionInfo> {
        self.sessions.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session idle past the timeout and returns how many were dropped.
    pub async fn expire_idle(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, info| !info.is_idle(now, self.max_idle));
        before - sessions.len()
    }

    /// Sweeps idle sessions every `period` for as long as the runtime lives.
    pub fn spawn_expiry(&self, period: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let expired = store.expire_idle().await;
                if expired > 0 {
                    info!(expired, "expired idle mcp sessions");
                }
            }
        })
    }
}
