//! Exponential backoff for rate-limited provider calls
//!
//! Only HTTP 429 is retried; every other failure is returned on the spot.

use super::{CompletionTransport, TransportError};
use crate::error::{BrainError, Result};
use std::time::Duration;
use tracing::{error, warn};

/// Retry settings for rate-limited calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (default: 5)
    pub max_retries: u32,

    /// Wait before the first retry, doubled each time (default: 2s)
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    /// Wait before retry number `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor)
    }

    /// Every wait the policy would perform, in order
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|n| self.delay_for(n)).collect()
    }
}

/// Send a prompt, sleeping and retrying while the provider answers 429
pub async fn send_with_backoff(
    transport: &dyn CompletionTransport,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String> {
    let provider = transport.name();
    let mut attempt: u32 = 0;

    loop {
        match transport.send(prompt).await {
            Ok(text) => return Ok(text),
            Err(TransportError::RateLimited) if attempt < policy.max_retries => {
                let wait = policy.delay_for(attempt);
                attempt += 1;
                warn!(
                    provider,
                    attempt,
                    max_retries = policy.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited by AI provider, backing off"
                );
                tokio::time::sleep(wait).await;
            }
            Err(TransportError::RateLimited) => {
                error!(provider, retries = attempt, "AI provider still rate limited, giving up");
                return Err(BrainError::RateLimited { retries: attempt });
            }
            Err(err) => {
                error!(provider, error = %err, "AI provider request failed");
                return Err(err.into());
            }
        }
    }
}
