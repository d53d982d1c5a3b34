//! Error taxonomy
//!
//! [`ConfigError`] covers everything that can be rejected before a backend is
//! called. [`GenerationError`] is a backend failure attributed to the persona
//! that made the call.

use personality_llm::LlmError;
use thiserror::Error;

/// Malformed or incomplete configuration, or a request that can't be dispatched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Persona name must not be empty")]
    EmptyName,
    #[error("Persona '{persona}' has an empty system prompt")]
    EmptySystemPrompt { persona: String },
    #[error("Missing required persona: a Referee")]
    MissingReferee,
    #[error("Exactly one Referee persona is allowed, found {found}")]
    MultipleReferees { found: usize },
    #[error("At least two Ordinary personas are required, found {found}")]
    TooFewOrdinary { found: usize },
    #[error("Duplicate persona name: '{name}'")]
    DuplicatePersona { name: String },
    #[error("'{name}' is reserved and cannot name an Ordinary persona")]
    ReservedName { name: String },
    #[error("Persona '{persona}' has no backend and no default backend was given")]
    MissingBackend { persona: String },
    #[error("Input must not be empty")]
    EmptyInput,
    #[error("Unknown selector: '{selector}'")]
    UnknownSelector { selector: String },
    #[error("At least one selector is required")]
    EmptySelection,
    #[error("Got {prompts} prompts but {choices} choice sets")]
    LengthMismatch { prompts: usize, choices: usize },
    #[error("Turn counts differ: '{first}' has {first_len}, '{other}' has {other_len}")]
    TurnCountMismatch {
        first: String,
        first_len: usize,
        other: String,
        other_len: usize,
    },
    #[error("Invalid configuration document: {0}")]
    InvalidDocument(String),
}

/// A backend failure during a persona call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Persona '{persona}' failed to generate: {source}")]
pub struct GenerationError {
    /// Persona whose call failed
    pub persona: String,
    /// The backend error
    #[source]
    pub source: LlmError,
}

impl GenerationError {
    pub fn new(persona: &str, source: LlmError) -> Self {
        Self {
            persona: persona.to_string(),
            source,
        }
    }
}

/// Any error from the personality pipeline
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersonalityError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl PersonalityError {
    pub fn is_config(&self) -> bool {
        matches!(self, PersonalityError::Config(_))
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, PersonalityError::Generation(_))
    }
}
