//! Startup readiness probing with exponential backoff and a hard deadline.

use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tracing::{debug, info};

use crate::client::error::ClientError;
use crate::client::http::HttpTransport;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub deadline: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            deadline: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

/// Polls `probe` until it succeeds, doubling the pause between attempts.
///
/// Gives up with `StartupTimeout` once `policy.deadline` has elapsed; never sleeps past it.
pub async fn wait_until_ready<F, Fut, T>(policy: BackoffPolicy, mut probe: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let started = Instant::now();
    let deadline = started + policy.deadline;
    let mut delay = policy.initial_delay;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match probe().await {
            Ok(value) => {
                info!(attempts, elapsed_ms = started.elapsed().as_millis(), "server is ready");
                return Ok(value);
            }
            Err(err) => debug!(attempts, error = %err, "server not ready yet"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ClientError::StartupTimeout {
                attempts,
                elapsed: started.elapsed(),
            });
        }

        tokio::time::sleep(delay.min(deadline - now)).await;
        delay = policy.next_delay(delay);
    }
}

pub async fn wait_for_health(
    transport: &HttpTransport,
    policy: BackoffPolicy,
) -> Result<(), ClientError> {
    wait_until_ready(policy, move || async move {
        let health = transport.health().await?;
        if health.status == "ok" {
            Ok(())
        } else {
            Err(ClientError::Transport(format!(
                "health status is {}",
                health.status
            )))
        }
    })
    .await
}
