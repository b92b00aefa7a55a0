//! Bounded readiness polling.
//!
//! A fixed number of probes with a fixed delay between them. No backoff and
//! no jitter: the backend either answers within the budget or startup fails.

use crate::config::SupervisorConfig;
use crate::error::{DoctorinoError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A single readiness check against the backend.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Human-readable target, used in logs and errors.
    fn target(&self) -> &str;

    /// Returns `true` when the backend reports healthy.
    async fn probe(&self) -> bool;
}

/// Attempt budget for readiness polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: SupervisorConfig::HEALTH_CHECK_ATTEMPTS,
            interval: SupervisorConfig::HEALTH_CHECK_INTERVAL,
        }
    }
}

impl ReadinessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyReport {
    /// Probes made, including the successful one.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Poll `probe` until it succeeds or the policy is exhausted.
pub async fn wait_until_ready<P>(probe: &P, policy: &ReadinessPolicy) -> Result<ReadyReport>
where
    P: HealthProbe + ?Sized,
{
    poll_until_ready(probe, policy, || None).await
}

/// Like [`wait_until_ready`], but `abort` is consulted before each probe and
/// ends the wait early with the error it returns.
pub(crate) async fn poll_until_ready<P, F>(
    probe: &P,
    policy: &ReadinessPolicy,
    mut abort: F,
) -> Result<ReadyReport>
where
    P: HealthProbe + ?Sized,
    F: FnMut() -> Option<DoctorinoError>,
{
    let start = Instant::now();
    info!(
        "Waiting for backend at {} ({} attempts, {:?} apart)",
        probe.target(),
        policy.max_attempts,
        policy.interval
    );

    for attempt in 1..=policy.max_attempts {
        if let Some(err) = abort() {
            return Err(err);
        }

        if probe.probe().await {
            let report = ReadyReport {
                attempts: attempt,
                elapsed: start.elapsed(),
            };
            info!(
                "Backend ready after {} attempt(s) in {:?}",
                report.attempts, report.elapsed
            );
            return Ok(report);
        }

        debug!("Health check {}/{} failed", attempt, policy.max_attempts);
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    warn!(
        "Backend at {} not healthy after {} attempts",
        probe.target(),
        policy.max_attempts
    );
    Err(DoctorinoError::HealthCheckTimeout {
        url: probe.target().to_string(),
        attempts: policy.max_attempts,
    })
}
