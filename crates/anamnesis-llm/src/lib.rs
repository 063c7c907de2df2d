//! Anamnesis LLM Provider Layer
//!
//! Inference backends for slot extraction and the retrying client that sits
//! in front of them.
//!
//! # Architecture
//!
//! ```text
//! ExtractionRequest → InferenceClient (limiter, timeout, retry) → InferenceBackend
//! ```
//!
//! A backend performs exactly one request per call. Everything about
//! attempts, back-off, per-attempt deadlines and the in-flight ceiling lives
//! in [`InferenceClient`].
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use anamnesis_llm::{InferenceBackend, MockProvider};
//!
//! # async fn example() {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt", 50).await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod ollama;

use anamnesis_domain::ErrorDescriptor;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

pub use client::{InferenceClient, RetryPolicy};
pub use ollama::OllamaProvider;

/// Errors raised while setting up a provider
///
/// Request-level failures are reported as [`ErrorDescriptor`]s instead.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// The configured endpoint is unusable
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// A text-generation service: prompt in, text out
///
/// One call is one request. Implementations must not retry on their own.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Generate a completion for `prompt` within `max_output_tokens`
    async fn generate(&self, prompt: &str, max_output_tokens: u32)
        -> Result<String, ErrorDescriptor>;

    /// Model identifier, for logs
    fn model_name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<B: InferenceBackend + ?Sized> InferenceBackend for Arc<B> {
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, ErrorDescriptor> {
        (**self).generate(prompt, max_output_tokens).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured responses without making any network
/// calls. Clones share their counters and scripts.
///
/// Outcomes are chosen in this order:
/// 1. the next scripted outcome queued with [`MockProvider::push_outcome`]
/// 2. the first registered marker contained in the prompt
/// 3. the default response
///
/// # Examples
///
/// ```
/// use anamnesis_llm::{InferenceBackend, MockProvider};
///
/// # async fn example() {
/// let mut provider = MockProvider::default();
/// provider.add_response("allergies", "None known");
/// provider.add_response("complaints", r#"{"Complaint": "headache"}"#);
///
/// let answer = provider.generate("State any allergies.\n\n...", 40).await.unwrap();
/// assert_eq!(answer, "None known");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, Result<String, ErrorDescriptor>)>>>,
    scripted: Arc<Mutex<VecDeque<Result<String, ErrorDescriptor>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    latency: Duration,
    call_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            latency: Duration::ZERO,
            call_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulate backend latency on every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer prompts containing `marker` with `response`
    pub fn add_response(&mut self, marker: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).push((marker.into(), Ok(response.into())));
    }

    /// Fail prompts containing `marker` with `error`
    pub fn add_error(&mut self, marker: impl Into<String>, error: ErrorDescriptor) {
        lock(&self.responses).push((marker.into(), Err(error)));
    }

    /// Queue an outcome for the next call, ahead of markers and the default
    pub fn push_outcome(&self, outcome: Result<String, ErrorDescriptor>) {
        lock(&self.scripted).push_back(outcome);
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }

    /// Highest number of calls that were pending at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    fn next_outcome(&self, prompt: &str) -> Result<String, ErrorDescriptor> {
        if let Some(outcome) = lock(&self.scripted).pop_front() {
            return outcome;
        }

        lock(&self.responses)
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| Ok(self.default_response.clone()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl InferenceBackend for MockProvider {
    async fn generate(
        &self,
        prompt: &str,
        _max_output_tokens: u32,
    ) -> Result<String, ErrorDescriptor> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push(prompt.to_string());

        let _gauge = InFlightGauge::enter(&self.in_flight, &self.peak_in_flight);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.next_outcome(prompt)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// Tracks pending calls; decrements even when the call future is dropped
struct InFlightGauge<'a> {
    current: &'a AtomicUsize,
}

impl<'a> InFlightGauge<'a> {
    fn enter(current: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for InFlightGauge<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anamnesis_domain::ErrorKind;

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt", 10).await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_marker_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("say hello", 10).await.unwrap(), "world");
        assert_eq!(provider.generate("foo first", 10).await.unwrap(), "bar");
        assert_eq!(
            provider.generate("unknown", 10).await.unwrap(),
            "Default mock response"
        );
    }

    #[tokio::test]
    async fn test_mock_provider_scripted_outcomes_take_precedence() {
        let mut provider = MockProvider::new("fallback");
        provider.add_response("prompt", "marker");
        provider.push_outcome(Err(ErrorDescriptor::http_status(500, "boom")));
        provider.push_outcome(Ok("scripted".into()));

        let first = provider.generate("prompt", 10).await.unwrap_err();
        assert_eq!(first.kind, ErrorKind::HttpStatus);
        assert_eq!(provider.generate("prompt", 10).await.unwrap(), "scripted");
        assert_eq!(provider.generate("prompt", 10).await.unwrap(), "marker");
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1", 10).await.unwrap();
        provider.generate("prompt2", 10).await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["prompt1", "prompt2"]);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error("bad prompt", ErrorDescriptor::network("refused"));

        let result = provider.generate("a bad prompt", 10).await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::NetworkException);
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test", 10).await.unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_provider_tracks_peak_in_flight() {
        let provider = MockProvider::new("ok").with_latency(Duration::from_millis(50));

        let (a, b, c) = tokio::join!(
            provider.generate("a", 1),
            provider.generate("b", 1),
            provider.generate("c", 1),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(provider.peak_in_flight(), 3);
        assert_eq!(provider.in_flight.load(Ordering::SeqCst), 0);
    }
}
