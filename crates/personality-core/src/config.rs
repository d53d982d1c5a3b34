//! Configuration for personas and persons
//!
//! Sampling defaults come from the environment; persona rosters can be
//! declared as JSON documents. Backends are never part of a document and are
//! attached in code.

use serde::{Deserialize, Serialize};
use std::env;

use personality_llm::SamplingConfig;

use crate::error::ConfigError;
use crate::persona::{PersonaSpec, RoleKind};

/// Sampling defaults for personas that don't set their own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDefaults {
    /// Temperature (env: PERSONALITY_TEMPERATURE)
    pub temperature: f32,
    /// Max tokens per call (env: PERSONALITY_MAX_TOKENS)
    pub max_tokens: u32,
    /// Repeat penalty (env: PERSONALITY_REPEAT_PENALTY)
    pub repeat_penalty: f32,
}

impl Default for PersonaDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 100,
            repeat_penalty: 1.1,
        }
    }
}

impl PersonaDefaults {
    /// Load from environment, falling back to defaults for unset or unparsable values
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            temperature: env::var("PERSONALITY_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            max_tokens: env::var("PERSONALITY_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tokens),
            repeat_penalty: env::var("PERSONALITY_REPEAT_PENALTY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.repeat_penalty),
        }
    }

    /// Sampling configuration built from these defaults
    pub fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            temperature: self.temperature,
            seed: None,
            max_tokens: Some(self.max_tokens),
            repeat_penalty: Some(self.repeat_penalty),
            extra: Default::default(),
        }
    }
}

/// One persona as declared in a roster document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRecord {
    /// Persona name
    pub name: String,
    /// Behavioral instructions (the persona's system prompt)
    #[serde(alias = "function", alias = "system_prompt")]
    pub instructions: String,
    /// Ordinary or referee
    #[serde(default)]
    pub role: RoleKind,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub repeat_penalty: Option<f32>,
    /// Replaces the person's description as this persona's context
    #[serde(default)]
    pub context: Option<String>,
}

impl PersonaRecord {
    /// Turn this record into a spec, filling gaps from `defaults`
    pub fn to_spec(&self, defaults: &PersonaDefaults) -> PersonaSpec {
        let mut sampling = defaults.sampling();
        if let Some(temperature) = self.temperature {
            sampling.temperature = temperature;
        }
        sampling.seed = self.seed;
        if let Some(max_tokens) = self.max_tokens {
            sampling.max_tokens = Some(max_tokens);
        }
        if let Some(repeat_penalty) = self.repeat_penalty {
            sampling.repeat_penalty = Some(repeat_penalty);
        }

        let mut spec = PersonaSpec::new(&self.name, &self.instructions, self.role)
            .with_sampling(sampling);
        if let Some(context) = &self.context {
            spec = spec.with_context(context);
        }
        spec
    }
}

/// A person declared as data: name, description and persona roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub personas: Vec<PersonaRecord>,
}

impl PersonConfig {
    /// Parse a JSON roster document
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(document).map_err(|e| ConfigError::InvalidDocument(e.to_string()))
    }

    /// Persona specs in declaration order
    pub fn specs(&self, defaults: &PersonaDefaults) -> Vec<PersonaSpec> {
        self.personas.iter().map(|p| p.to_spec(defaults)).collect()
    }
}
