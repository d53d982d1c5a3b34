//! Generation backend trait and common types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from generation backends
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Timed out after {0} ms")]
    Timeout(u64),
    #[error("Rate limited")]
    RateLimited,
    #[error("Backend not available")]
    NotAvailable,
}

impl LlmError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::ConnectionFailed(_)
                | LlmError::Timeout(_)
                | LlmError::RateLimited
                | LlmError::NotAvailable
        )
    }
}

/// Sampling parameters for a single generation call.
///
/// Values are passed through untouched; the backend decides what range is
/// valid for `temperature` and what to do with unknown `extra` knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Temperature (0.0 = deterministic, higher = more varied)
    pub temperature: f32,
    /// Seed for reproducible sampling, if the backend supports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Repeat penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
    /// Backend-specific knobs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            seed: None,
            max_tokens: Some(100),
            repeat_penalty: Some(1.1),
            extra: BTreeMap::new(),
        }
    }
}

impl SamplingConfig {
    /// Default sampling at the given temperature
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            ..Self::default()
        }
    }

    /// Set the seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Add a backend-specific knob
    pub fn extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Produce a copy with the override's fields applied
    pub fn apply(&self, overrides: &SamplingOverride) -> Self {
        let mut sampling = self.clone();
        if let Some(temperature) = overrides.temperature {
            sampling.temperature = temperature;
        }
        if let Some(seed) = overrides.seed {
            sampling.seed = Some(seed);
        }
        if let Some(repeat_penalty) = overrides.repeat_penalty {
            sampling.repeat_penalty = Some(repeat_penalty);
        }
        sampling
    }
}

/// Partial sampling settings layered over a persona's own configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingOverride {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub repeat_penalty: Option<f32>,
}

impl SamplingOverride {
    /// No changes
    pub fn none() -> Self {
        Self::default()
    }

    /// Override temperature only
    pub fn temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Self::default()
        }
    }

    /// Override repeat penalty only
    pub fn repeat_penalty(repeat_penalty: f32) -> Self {
        Self {
            repeat_penalty: Some(repeat_penalty),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.seed.is_none() && self.repeat_penalty.is_none()
    }
}

impl From<f32> for SamplingOverride {
    fn from(temperature: f32) -> Self {
        Self::temperature(temperature)
    }
}

/// A request to a generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System prompt (persona instructions)
    pub system: String,
    /// User message
    pub prompt: String,
    /// Sampling parameters
    pub sampling: SamplingConfig,
}

impl GenerationRequest {
    pub fn new(system: &str, prompt: &str, sampling: &SamplingConfig) -> Self {
        Self {
            system: system.to_string(),
            prompt: prompt.to_string(),
            sampling: sampling.clone(),
        }
    }
}

/// Response from a generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// The generated text
    pub content: String,
    /// Model used
    pub model: String,
    /// Tokens used (if available)
    pub tokens_used: Option<u32>,
    /// Time taken in milliseconds
    pub latency_ms: u64,
}

/// Anything that can turn a system prompt and a user prompt into text
#[async_trait]
pub trait GenerationBackend: Send + Sync + std::fmt::Debug {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Generate a completion
    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;

    /// Generate text for a system/user prompt pair (convenience method)
    ///
    /// A blank completion is reported as [`LlmError::InvalidResponse`].
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<String, LlmError> {
        let response = self
            .complete(GenerationRequest::new(system, prompt, sampling))
            .await?;
        if response.content.trim().is_empty() {
            return Err(LlmError::InvalidResponse(format!(
                "{} returned an empty completion",
                self.name()
            )));
        }
        Ok(response.content)
    }
}
