use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};
use weather_calculations_mcp::{
    client::{
        demo::{self, Outcome},
        readiness::{wait_for_health, BackoffPolicy},
        HttpTransport, McpClient, StdioTransport, Transport,
    },
    config::{ClientConfig, TransportKind},
    logging,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = ClientConfig::from_env()?;
    info!(transport = %config.transport, "starting weather calculation demonstrations");

    let failures = match config.transport {
        TransportKind::Stdio => run_stdio(&config).await?,
        TransportKind::Http => run_http(&config).await?,
    };

    if failures > 0 {
        warn!(failures, "some demonstrations failed");
    }
    Ok(())
}

async fn run_stdio(config: &ClientConfig) -> Result<usize, Box<dyn std::error::Error>> {
    let mut command = Command::new(&config.server_bin);
    command.env("MCP_TRANSPORT", "stdio");
    let transport = StdioTransport::from_command(command, config.timeout)?;

    let mut client = McpClient::new(transport);
    let failures = run_all(&mut client).await;

    let status = client.into_transport().shutdown(SHUTDOWN_GRACE).await?;
    info!(%status, "server process stopped");
    failures
}

async fn run_http(config: &ClientConfig) -> Result<usize, Box<dyn std::error::Error>> {
    let mut transport = HttpTransport::new(config.base_url.as_str(), config.timeout)?;
    if let Some(token) = &config.api_token {
        transport = transport.with_bearer_token(token.as_str());
    }

    wait_for_health(&transport, BackoffPolicy::default()).await?;
    match transport.server_info().await {
        Ok(info) => println!(
            "Server: {} v{} ({})",
            info.server, info.version, info.transport
        ),
        Err(err) => warn!(error = %err, "could not fetch server info"),
    }

    let mut client = McpClient::new(transport);
    let failures = run_all(&mut client).await;

    if let Err(err) = client.transport_mut().close_session().await {
        warn!(error = %err, "failed to close session");
    }
    failures
}

async fn run_all<T: Transport>(
    client: &mut McpClient<T>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let summary = client.initialize().await?;
    println!(
        "Connected to {} v{} (protocol {})",
        summary.server_name, summary.server_version, summary.protocol_version
    );

    let tools = client.list_tools().await?;
    println!("Available tools: {}", tools.len());
    for tool in &tools {
        println!(
            "  - {}: {}",
            tool.name,
            tool.description.as_deref().unwrap_or("")
        );
    }

    let mut failures = 0;
    for (heading, sections) in [
        ("Temperature conversions", demo::temperature_conversions()),
        ("Weather indices", demo::weather_indices()),
        ("Advanced calculations", demo::advanced_calculations()),
    ] {
        println!("\n== {heading} ==");
        let outcomes = demo::run(client, sections).await;
        failures += outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        outcomes.iter().for_each(print_outcome);
    }

    Ok(failures)
}

fn print_outcome(outcome: &Outcome) {
    println!("\n[{}] {}({})", outcome.section, outcome.tool, outcome.arguments);
    match &outcome.result {
        Ok(output) => {
            println!("  result: {}", output.result);
            if let Some(formula) = &output.formula {
                println!("  formula: {formula}");
            }
            if let Some(note) = &output.note {
                println!("  note: {note}");
            }
        }
        Err(err) => println!("  failed: {err}"),
    }
}
