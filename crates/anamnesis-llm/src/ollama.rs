//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local `/api/generate` endpoint.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama API
//! - Configurable endpoint, model and connection pool size
//! - Non-streaming requests: the entire answer is awaited as one unit
//!
//! Retries and timeouts are applied by [`crate::InferenceClient`].
//!
//! # Examples
//!
//! ```no_run
//! use anamnesis_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.2:3b").unwrap();
//! assert_eq!(provider.generate_url(), "http://localhost:11434/api/generate");
//! ```

use crate::{InferenceBackend, LlmError};
use anamnesis_domain::ErrorDescriptor;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "llama3.2:3b";

/// Default number of pooled connections kept per host
pub const DEFAULT_POOL_SIZE: usize = 20;

/// Ollama API provider for local LLM inference
///
/// Owns a `reqwest::Client`, i.e. one connection pool. Dropping the provider
/// releases every pooled connection.
#[derive(Debug)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    num_predict: u32,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the default pool size
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.2:3b")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_pool_size(endpoint, model, DEFAULT_POOL_SIZE)
    }

    /// Create a new Ollama provider keeping at most `pool_size` idle connections
    pub fn with_pool_size(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        pool_size: usize,
    ) -> Result<Self, LlmError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(LlmError::InvalidEndpoint(endpoint));
        }

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(pool_size)
            .build()
            .map_err(|e| LlmError::ClientBuild(e.to_string()))?;

        Ok(Self {
            endpoint,
            model: model.into(),
            client,
        })
    }

    /// Create a new Ollama provider against `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Full URL of the generate API
    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }
}

#[async_trait]
impl InferenceBackend for OllamaProvider {
    /// Issue one non-streaming generate request
    ///
    /// # Errors
    ///
    /// - `http_status` when Ollama answers with anything but 200
    /// - `network_exception` when the request fails or the body is not the
    ///   expected JSON object
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, ErrorDescriptor> {
        let url = self.generate_url();
        let request_body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            num_predict: max_output_tokens,
        };

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ErrorDescriptor::network(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ErrorDescriptor::network(format!("Failed to read response: {}", e)))?;

        debug!("Ollama answered {} with {} bytes", status, body.len());

        if status != StatusCode::OK {
            return Err(ErrorDescriptor::http_status(status.as_u16(), &body));
        }

        let parsed: OllamaGenerateResponse = serde_json::from_str(&body).map_err(|e| {
            ErrorDescriptor::network(format!("Failed to parse response: {}", e)).with_excerpt(&body)
        })?;

        Ok(parsed.response.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
