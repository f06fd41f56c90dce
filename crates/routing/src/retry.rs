//! Retry layer above the routing core
//!
//! Transport handlers perform exactly one attempt per call; this module
//! is the layer above that applies a step's retry policy to surfaced
//! failures: exponential backoff with a multiplier and cap, and an
//! optional overall deadline covering all attempts.

use std::time::Duration;

use pipework_config::{PipelineStepConfig, RetryPolicy};
use pipework_protocol::{ProcessRequest, ProcessResponse};

use crate::error::{Result, RoutingError};
use crate::router::Router;

/// Backoff before the attempt following `failed_attempts` failures
///
/// The first failure waits `backoff_ms`, each further failure multiplies
/// by `backoff_multiplier`, capped at `max_backoff_ms`. A multiplier
/// below 1.0 is treated as 1.0.
pub fn backoff_delay(policy: &RetryPolicy, failed_attempts: u32) -> Duration {
    let exponent = failed_attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
    let multiplier = policy.backoff_multiplier.max(1.0);
    let raw = policy.backoff_ms as f64 * multiplier.powi(exponent);
    let capped = raw.min(policy.max_backoff_ms as f64);
    Duration::from_millis(capped as u64)
}

/// Route a request, retrying per the step's policy
///
/// Performs up to `max_retries + 1` attempts, sleeping the policy's
/// backoff between them. When `step_timeout_ms` is set the whole
/// sequence runs under that deadline.
///
/// # Errors
///
/// Returns the last attempt's error once retries are exhausted, or
/// [`RoutingError::StepTimeout`] when the overall deadline elapses first.
pub async fn route_request_with_retry(
    router: &Router,
    request: &ProcessRequest,
    step: &PipelineStepConfig,
) -> Result<ProcessResponse> {
    let policy = step.retry();

    let attempts = async {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match router.route_request(request.clone(), step).await {
                Ok(response) => return Ok(response),
                Err(error) if attempt <= policy.max_retries => {
                    let delay = backoff_delay(policy, attempt);
                    tracing::warn!(
                        step = %step.step_name(),
                        attempt,
                        max_attempts = policy.max_retries + 1,
                        backoff_ms = delay.as_millis() as u64,
                        error = %error,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    };

    match policy.step_timeout_ms {
        Some(timeout_ms) => {
            tokio::time::timeout(Duration::from_millis(timeout_ms), attempts)
                .await
                .unwrap_or_else(|_| {
                    Err(RoutingError::StepTimeout {
                        step: step.step_name().to_string(),
                        timeout_ms,
                    })
                })
        }
        None => attempts.await,
    }
}
