//! Configuration for the Extractor

use anamnesis_llm::client::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_IN_FLIGHT,
};
use anamnesis_llm::ollama::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use anamnesis_llm::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default output budget for slots that do not declare one
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 50;

/// Default delay between consecutive slot starts (milliseconds)
pub const DEFAULT_STAGGER_MS: u64 = 100;

/// Configuration for the Extractor
///
/// Passed explicitly into every run; nothing is read from global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Maximum requests in flight against the backend at any instant
    pub max_in_flight: usize,

    /// Delay between consecutive slot starts (milliseconds)
    pub stagger_ms: u64,

    /// Deadline for a single attempt (seconds)
    pub attempt_timeout_secs: u64,

    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Pause between attempts (milliseconds)
    pub retry_backoff_ms: u64,

    /// Output budget for slots that do not declare one
    pub default_max_output_tokens: u32,
}

impl ExtractorConfig {
    /// Delay between consecutive slot starts
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    /// Get the attempt timeout as a Duration
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Pause between attempts
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Retry policy handed to the inference client
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self.retry_backoff(),
            attempt_timeout: self.attempt_timeout(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("endpoint must not be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.max_in_flight == 0 {
            return Err("max_in_flight must be greater than 0".to_string());
        }
        if self.max_in_flight > Semaphore::MAX_PERMITS {
            return Err(format!("max_in_flight must be at most {}", Semaphore::MAX_PERMITS));
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".to_string());
        }
        if self.attempt_timeout_secs == 0 {
            return Err("attempt_timeout_secs must be greater than 0".to_string());
        }
        if self.default_max_output_tokens == 0 {
            return Err("default_max_output_tokens must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Matches the behaviour of a plain local Ollama setup
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            stagger_ms: DEFAULT_STAGGER_MS,
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT.as_secs(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: DEFAULT_BACKOFF.as_millis() as u64,
            default_max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: fewer concurrent requests, short deadlines
    pub fn aggressive() -> Self {
        Self {
            max_in_flight: 10,
            stagger_ms: 50,
            attempt_timeout_secs: 60,
            retry_backoff_ms: 500,
            default_max_output_tokens: 40,
            ..Self::default()
        }
    }

    /// Lenient preset: long deadlines, an extra attempt, larger budgets
    pub fn lenient() -> Self {
        Self {
            attempt_timeout_secs: 900,
            max_attempts: 3,
            retry_backoff_ms: 2_000,
            default_max_output_tokens: 80,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert_eq!(config.model, "llama3.2:3b");
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.retry_backoff(), Duration::from_secs(1));
        assert_eq!(config.stagger(), Duration::from_millis(100));
    }

    #[test]
    fn test_aggressive_config_is_valid() {
        assert!(ExtractorConfig::aggressive().validate().is_ok());
    }

    #[test]
    fn test_lenient_config_is_valid() {
        assert!(ExtractorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_invalid_max_in_flight() {
        let mut config = ExtractorConfig::default();
        config.max_in_flight = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_max_in_flight() {
        let mut config = ExtractorConfig::default();
        config.max_in_flight = usize::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.contains("max_in_flight"));

        config.max_in_flight = Semaphore::MAX_PERMITS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_max_attempts() {
        let mut config = ExtractorConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut config = ExtractorConfig::default();
        config.model = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_mirrors_config() {
        let config = ExtractorConfig::lenient();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(2));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config =
            ExtractorConfig::from_toml("model = \"mistral\"\nmax_in_flight = 4\n").unwrap();
        assert_eq!(config.model, "mistral");
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.endpoint, ExtractorConfig::default().endpoint);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::aggressive();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
