//! Personas
//!
//! A [`Persona`] is one named generative role: a frozen system prompt, frozen
//! sampling configuration and a backend. It is a pure adapter from
//! `(system prompt, sampling, user input)` to backend output and keeps no
//! state between calls.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use personality_llm::{global_metrics, GenerationBackend, Metrics, SamplingConfig, SamplingOverride};

use crate::error::{ConfigError, GenerationError};

/// Whether a persona contributes an answer or picks one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// Answers the user input
    #[default]
    Ordinary,
    /// Selects or synthesizes a final reply from the Ordinary answers
    Referee,
}

/// Unvalidated description of a persona
#[derive(Debug, Clone)]
pub struct PersonaSpec {
    /// Unique (case-insensitive) name within a person
    pub name: String,
    /// Behavioral instructions
    pub system_prompt: String,
    /// Sampling configuration, frozen at construction
    pub sampling: SamplingConfig,
    /// Ordinary or referee
    pub role: RoleKind,
    /// Replaces the person's description as prompt context
    pub context: Option<String>,
    /// Per-persona backend; falls back to the person's default
    pub backend: Option<Arc<dyn GenerationBackend>>,
}

impl PersonaSpec {
    pub fn new(name: &str, system_prompt: &str, role: RoleKind) -> Self {
        Self {
            name: name.to_string(),
            system_prompt: system_prompt.to_string(),
            sampling: SamplingConfig::default(),
            role,
            context: None,
            backend: None,
        }
    }

    /// An Ordinary persona
    pub fn ordinary(name: &str, system_prompt: &str) -> Self {
        Self::new(name, system_prompt, RoleKind::Ordinary)
    }

    /// The Referee persona
    pub fn referee(name: &str, system_prompt: &str) -> Self {
        Self::new(name, system_prompt, RoleKind::Referee)
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.sampling.temperature = temperature;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sampling.seed = Some(seed);
        self
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn is_referee(&self) -> bool {
        self.role == RoleKind::Referee
    }
}

/// A validated persona bound to a backend
#[derive(Debug, Clone)]
pub struct Persona {
    name: String,
    instructions: String,
    system_prompt: String,
    sampling: SamplingConfig,
    role: RoleKind,
    backend: Arc<dyn GenerationBackend>,
    metrics: Arc<Metrics>,
}

impl Persona {
    /// Validate a spec and bind it to a backend.
    ///
    /// The effective system prompt is the spec's own context if it has one,
    /// otherwise `default_context` (the owning person's description), followed
    /// by the persona's instructions. A blank context is left out.
    pub fn new(
        spec: PersonaSpec,
        default_backend: Option<&Arc<dyn GenerationBackend>>,
        default_context: &str,
    ) -> Result<Self, ConfigError> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if spec.system_prompt.trim().is_empty() {
            return Err(ConfigError::EmptySystemPrompt { persona: name });
        }
        let backend = match spec.backend.or_else(|| default_backend.cloned()) {
            Some(backend) => backend,
            None => return Err(ConfigError::MissingBackend { persona: name }),
        };

        let context = spec.context.as_deref().unwrap_or(default_context).trim();
        let system_prompt = if context.is_empty() {
            spec.system_prompt.clone()
        } else {
            format!("{}\n\n{}", context, spec.system_prompt)
        };

        Ok(Self {
            name,
            instructions: spec.system_prompt,
            system_prompt,
            sampling: spec.sampling,
            role: spec.role,
            backend,
            metrics: global_metrics(),
        })
    }

    /// Record calls into `metrics` instead of the global collector
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> RoleKind {
        self.role
    }

    pub fn is_referee(&self) -> bool {
        self.role == RoleKind::Referee
    }

    /// The instructions as declared
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// The full system prompt sent to the backend
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }

    /// Name and system prompt, for display
    pub fn about(&self) -> String {
        format!("{}\n{}", self.name, self.system_prompt)
    }

    /// Generate a reply to `user_input` with this persona's own sampling
    pub async fn generate(&self, user_input: &str) -> Result<String, GenerationError> {
        self.call(user_input, &self.sampling).await
    }

    /// Generate with `overrides` layered over this persona's sampling.
    ///
    /// The persona itself is unchanged; the override applies to this call only.
    pub async fn generate_with(
        &self,
        user_input: &str,
        overrides: &SamplingOverride,
    ) -> Result<String, GenerationError> {
        if overrides.is_empty() {
            return self.call(user_input, &self.sampling).await;
        }
        let sampling = self.sampling.apply(overrides);
        self.call(user_input, &sampling).await
    }

    async fn call(
        &self,
        user_input: &str,
        sampling: &SamplingConfig,
    ) -> Result<String, GenerationError> {
        tracing::debug!(
            persona = %self.name,
            backend = %self.backend.name(),
            temperature = sampling.temperature,
            "Persona generating"
        );

        let result = self
            .backend
            .generate(&self.system_prompt, user_input, sampling)
            .await;
        self.metrics.record_generation(result.is_err());

        result.map_err(|e| {
            tracing::warn!(persona = %self.name, error = %e, "Persona generation failed");
            GenerationError::new(&self.name, e)
        })
    }
}
