use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod client;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;

use http::session::SessionStore;
use mcp::server::McpServer;

#[derive(Clone)]
pub struct AppState {
    pub api_token: Option<Arc<str>>,
    pub mcp: McpServer,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(api_token: Option<String>, mcp: McpServer) -> Self {
        Self {
            api_token: api_token.map(Arc::<str>::from),
            mcp,
            sessions: SessionStore::new(),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/mcp",
            post(http::handlers::mcp_endpoint).delete(http::handlers::delete_session),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/", get(http::handlers::server_info))
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .merge(protected)
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, Response, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::domain::{filter::FunctionFilter, tools::ToolRegistry};
    use crate::http::session::MCP_SESSION_ID;

    use super::*;

    const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test-client","version":"1.0.0"},"capabilities":{}}}"#;

    fn server() -> McpServer {
        McpServer::new(env!("CARGO_PKG_NAME"), ToolRegistry::default())
    }

    fn app() -> Router {
        build_app(AppState::new(None, server()))
    }

    fn app_with_token() -> Router {
        build_app(AppState::new(
            Some("token-1234567890ab".to_string()),
            server(),
        ))
    }

    async fn body_json(response: Response<Body>) -> Value {
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&body).expect("valid json response")
    }

    async fn post_mcp(app: Router, session: Option<&str>, body: &str) -> Response<Body> {
        let mut request = Request::builder()
            .uri("/mcp")
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(session) = session {
            request = request.header(&MCP_SESSION_ID, session);
        }

        app.oneshot(
            request
                .body(Body::from(body.to_string()))
                .expect("request build"),
        )
        .await
        .expect("request execution")
    }

    /// Runs `initialize` against `app` and returns the issued session id.
    async fn open_session(app: &Router) -> String {
        let response = post_mcp(app.clone(), None, INITIALIZE).await;
        assert_eq!(response.status(), StatusCode::OK);
        response
            .headers()
            .get(&MCP_SESSION_ID)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .expect("session header")
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app_with_token()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn root_reports_server_info() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["server"], env!("CARGO_PKG_NAME"));
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["transport"], "http");
    }

    #[tokio::test]
    async fn discovery_is_public() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/.well-known/mcp")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["mcp_endpoint"], "/mcp");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/services")
                    .method("GET")
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn mcp_requires_token_when_configured() {
        let response = post_mcp(app_with_token(), None, INITIALIZE).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "missing_token");

        let response = app_with_token()
            .oneshot(
                Request::builder()
                    .uri("/mcp")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, "Bearer token-1234567890ab")
                    .body(Body::from(INITIALIZE))
                    .expect("request build"),
            )
            .await
            .expect("request execution");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mcp_initialize_returns_result_and_session() {
        let response = post_mcp(app(), None, INITIALIZE).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(&MCP_SESSION_ID));
        let body = body_json(response).await;

        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(body["result"]["serverInfo"]["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(
            body["result"]["serverInfo"]["version"],
            env!("CARGO_PKG_VERSION")
        );
        assert!(body["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn mcp_without_session_is_bad_request() {
        let response = post_mcp(
            app(),
            None,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "missing_session");
    }

    #[tokio::test]
    async fn mcp_unknown_session_is_not_found() {
        let response = post_mcp(
            app(),
            Some("does-not-exist"),
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "unknown_session");
    }

    #[tokio::test]
    async fn mcp_tools_list_returns_weather_tools() {
        let app = app();
        let session = open_session(&app).await;
        let response = post_mcp(
            app,
            Some(&session),
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let tools = body["result"]["tools"].as_array().expect("tools array");
        assert_eq!(tools.len(), 10);
        assert!(tools
            .iter()
            .any(|tool| tool["name"] == "celsius_to_fahrenheit"));
    }

    #[tokio::test]
    async fn mcp_tools_list_respects_function_filter() {
        let filter = FunctionFilter::from_lists("/temperature|celsius|fahrenheit/", "")
            .expect("valid filter");
        let app = build_app(AppState::new(
            None,
            McpServer::new(env!("CARGO_PKG_NAME"), ToolRegistry::new(&filter)),
        ));
        let session = open_session(&app).await;
        let response = post_mcp(
            app,
            Some(&session),
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#,
        )
        .await;

        let body = body_json(response).await;
        let names = body["result"]["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["celsius_to_fahrenheit", "fahrenheit_to_celsius"]);
    }

    #[tokio::test]
    async fn mcp_tools_call_returns_double_encoded_result() {
        let app = app();
        let session = open_session(&app).await;
        let response = post_mcp(
            app,
            Some(&session),
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"celsius_to_fahrenheit","arguments":{"celsius":25}}}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 3);
        let text = body["result"]["content"][0]["text"]
            .as_str()
            .expect("text content");
        let payload: Value = serde_json::from_str(text).expect("text holds json");
        assert_eq!(payload["result"]["fahrenheit"], 77.0);
        assert_eq!(body["result"]["structuredContent"], payload);
    }

    #[tokio::test]
    async fn mcp_tools_call_unknown_tool_returns_tool_not_found_data() {
        let app = app();
        let session = open_session(&app).await;
        let response = post_mcp(
            app,
            Some(&session),
            r#"{"jsonrpc":"2.0","id":503,"method":"tools/call","params":{"name":"unknown_tool","arguments":{}}}"#,
        )
        .await;

        let body = body_json(response).await;
        assert_eq!(body["id"], 503);
        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["error"]["data"]["code"], "tool_not_found");
    }

    #[tokio::test]
    async fn mcp_tools_call_malformed_arguments_returns_invalid_params() {
        let app = app();
        let session = open_session(&app).await;
        let response = post_mcp(
            app,
            Some(&session),
            r#"{"jsonrpc":"2.0","id":502,"method":"tools/call","params":{"name":"calculate_dew_point","arguments":{"temperature_c":"warm"}}}"#,
        )
        .await;

        let body = body_json(response).await;
        assert_eq!(body["id"], 502);
        assert_eq!(body["error"]["code"], -32602);
        assert_eq!(body["error"]["data"]["code"], "invalid_arguments");
    }

    #[tokio::test]
    async fn mcp_unknown_method_returns_method_not_found() {
        let app = app();
        let session = open_session(&app).await;
        let response = post_mcp(
            app,
            Some(&session),
            r#"{"jsonrpc":"2.0","id":1,"method":"unknown"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["error"]["message"], "Method not found");
    }

    #[tokio::test]
    async fn mcp_notification_returns_no_content() {
        let app = app();
        let session = open_session(&app).await;
        let response = post_mcp(
            app,
            Some(&session),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn mcp_batch_mixed_requests_return_only_id_responses() {
        let app = app();
        let session = open_session(&app).await;
        let response = post_mcp(
            app,
            Some(&session),
            r#"[{"jsonrpc":"2.0","method":"notifications/initialized"},{"jsonrpc":"2.0","id":100,"method":"ping"},{"jsonrpc":"2.0","id":200,"method":"tools/list","params":{}}]"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let responses = body.as_array().expect("batch response array");
        assert_eq!(responses.len(), 2);
        let ids: Vec<i64> = responses
            .iter()
            .filter_map(|item| item["id"].as_i64())
            .collect();
        assert!(ids.contains(&100));
        assert!(ids.contains(&200));
    }

    #[tokio::test]
    async fn mcp_parse_error_for_invalid_json() {
        let response = post_mcp(app(), None, "{").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn delete_ends_session() {
        let app = app();
        let session = open_session(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/mcp")
                    .method("DELETE")
                    .header(&MCP_SESSION_ID, session.as_str())
                    .body(Body::empty())
                    .expect("request build"),
            )
            .await
            .expect("request execution");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = post_mcp(
            app,
            Some(&session),
            r#"{"jsonrpc":"2.0","id":5,"method":"ping"}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
