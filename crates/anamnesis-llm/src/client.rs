//! Retrying inference client
//!
//! Wraps a single-shot [`InferenceBackend`] with:
//!
//! - a per-attempt deadline
//! - a fixed back-off between attempts
//! - an in-flight ceiling shared by every caller of one client
//! - cooperative cancellation
//!
//! The last observed error is returned once attempts are exhausted.

use crate::InferenceBackend;
use anamnesis_domain::{ErrorDescriptor, ExtractionRequest};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default number of attempts per request (first try plus one retry)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default pause between attempts
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Default deadline for a single attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(500);

/// Default number of requests allowed in flight at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 20;

/// How a request is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Pause between a failed attempt and the next one
    pub backoff: Duration,

    /// Deadline for each individual attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

/// Issues requests against a backend, enforcing the [`RetryPolicy`]
///
/// A client is meant to be shared (behind an `Arc`) by every slot of a run:
/// its semaphore is what bounds concurrent requests against the backend.
pub struct InferenceClient<B> {
    backend: B,
    policy: RetryPolicy,
    limiter: Semaphore,
    max_in_flight: usize,
    cancel: CancellationToken,
}

impl<B> InferenceClient<B> {
    /// The wrapped backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The active retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Ceiling on concurrent requests
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

impl<B: InferenceBackend> InferenceClient<B> {
    /// Create a client allowing `max_in_flight` concurrent requests
    pub fn new(backend: B, policy: RetryPolicy, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            backend,
            policy,
            limiter: Semaphore::new(max_in_flight),
            max_in_flight,
            cancel: CancellationToken::new(),
        }
    }

    /// Tie the client to an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Issue `request`, retrying per policy
    ///
    /// Returns the backend's answer, or the error from the final attempt.
    /// Cancellation ends the call immediately with a `network_exception`.
    pub async fn call(&self, request: &ExtractionRequest) -> Result<String, ErrorDescriptor> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!(
                "Slot '{}' attempt {}/{} ({} chars, budget {})",
                request.slot_id,
                attempt,
                attempts,
                request.prompt.len(),
                request.max_output_tokens
            );

            match self.attempt(request).await {
                Ok(text) => return Ok(text),
                Err(e) if self.cancel.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        "Slot '{}' attempt {}/{} failed: {}",
                        request.slot_id, attempt, attempts, e
                    );
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(cancelled()),
                    _ = sleep(self.policy.backoff) => {}
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ErrorDescriptor::network("No attempt was made")))
    }

    /// One request, holding an in-flight permit for its whole duration
    async fn attempt(&self, request: &ExtractionRequest) -> Result<String, ErrorDescriptor> {
        // Cancellation wins over a permit or answer that is ready at the same time
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(cancelled()),
            permit = self.limiter.acquire() => permit
                .map_err(|_| ErrorDescriptor::network("Request limiter closed"))?,
        };

        let pending = timeout(
            self.policy.attempt_timeout,
            self.backend
                .generate(&request.prompt, request.max_output_tokens),
        );

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(cancelled()),
            outcome = pending => match outcome {
                Ok(result) => result,
                Err(_) => Err(ErrorDescriptor::network(format!(
                    "Request timed out after {:.1}s",
                    self.policy.attempt_timeout.as_secs_f64()
                ))),
            },
        }
    }
}

/// Outcome of a call interrupted by its cancellation token
pub fn cancelled() -> ErrorDescriptor {
    ErrorDescriptor::network("Request cancelled")
}
