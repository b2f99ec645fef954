//! Readiness polling against the inner agent server.
//!
//! Any HTTP response, including 401, proves the server process accepts
//! connections; only transport errors count as "not ready".

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::ReadinessSettings;
use crate::error::CaigedError;

/// One probe request. `Ok` carries the HTTP status of whatever answered.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn probe(&self, url: &str) -> Result<u16, String>;
}

/// [`ProbeTransport`] issuing short-timeout GET requests.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: reqwest::Client,
}

impl HttpProbe {
    pub fn new(request_timeout: Duration) -> Self {
        // Fall back to reqwest defaults if builder creation fails.
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }
}

#[async_trait]
impl ProbeTransport for HttpProbe {
    async fn probe(&self, url: &str) -> Result<u16, String> {
        self.http
            .get(url)
            .send()
            .await
            .map(|response| response.status().as_u16())
            .map_err(|err| err.to_string())
    }
}

/// Overall budget and capped exponential backoff for [`wait_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl From<&ReadinessSettings> for ReadinessPolicy {
    fn from(settings: &ReadinessSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }
}

impl ReadinessPolicy {
    /// Delay after the `attempt`-th failure (0-based): doubles, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let pow = 2u32.saturating_pow(attempt);
        let millis = self
            .initial_backoff
            .as_millis()
            .saturating_mul(pow as u128)
            .min(self.max_backoff.as_millis());
        Duration::from_millis(millis as u64)
    }
}

/// Result of a successful [`wait_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyReport {
    pub attempts: u32,
    /// Sum of the backoff delays slept between attempts.
    pub total_backoff: Duration,
    pub status: u16,
}

/// Poll `url` until any response arrives or the policy's budget runs out.
pub async fn wait_ready(
    transport: &dyn ProbeTransport,
    url: &str,
    policy: &ReadinessPolicy,
) -> Result<ReadyReport, CaigedError> {
    let started = Instant::now();
    let mut attempts = 0u32;
    let mut total_backoff = Duration::ZERO;

    loop {
        let budget = policy.timeout.saturating_sub(started.elapsed());
        let outcome = tokio::time::timeout(budget, transport.probe(url))
            .await
            .unwrap_or_else(|_| Err(format!("no response within {}ms", budget.as_millis())));
        let failure = match outcome {
            Ok(status) => {
                attempts += 1;
                info!(url, attempts, status, "agent server ready");
                return Ok(ReadyReport {
                    attempts,
                    total_backoff,
                    status,
                });
            }
            Err(err) => err,
        };
        let delay = policy.delay_for(attempts);
        attempts += 1;

        let elapsed = started.elapsed();
        let remaining = policy.timeout.saturating_sub(elapsed);
        if remaining.is_zero() {
            return Err(CaigedError::ServerNotReady {
                url: url.to_string(),
                attempts,
                elapsed,
            });
        }
        debug!(url, attempts, error = %failure, delay_ms = delay.as_millis() as u64, "agent server not ready");
        let delay = delay.min(remaining);
        tokio::time::sleep(delay).await;
        total_backoff += delay;
    }
}
