use std::time::Duration;

use weather_calculations_mcp::{
    build_app,
    config::{Config, TransportKind},
    logging,
    mcp::{self, server::McpServer},
    AppState,
};
use tracing::info;

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let server = McpServer::from_config(&config);

    match config.transport {
        TransportKind::Stdio => {
            mcp::stdio::serve(server, tokio::io::stdin(), tokio::io::stdout()).await?;
        }
        TransportKind::Http => {
            let bind_socket = config.bind_socket()?;
            let state = AppState::new(config.api_token.clone(), server);
            let _expiry = state.sessions.spawn_expiry(SESSION_SWEEP_PERIOD);
            let app = build_app(state);
            let listener = tokio::net::TcpListener::bind(bind_socket).await?;

            info!(
                bind_addr = %config.bind_addr,
                bind_port = config.bind_port,
                auth = config.api_token.is_some(),
                "server starting"
            );

            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
