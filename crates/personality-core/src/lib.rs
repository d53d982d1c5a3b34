//! # Personality Core
//!
//! Core types for composite agents:
//! - [`Persona`]: one named generative role bound to a backend
//! - [`PersonaSpec`]: the unvalidated description a persona is built from
//! - [`Turn`] / [`HistoryStore`]: append-only, turn-indexed record of a conversation
//! - [`ConfigError`] / [`GenerationError`]: the error taxonomy
//! - [`PersonaDefaults`] / [`PersonConfig`]: env defaults and JSON rosters

pub mod config;
pub mod error;
pub mod history;
pub mod persona;

pub use config::{PersonConfig, PersonaDefaults, PersonaRecord};
pub use error::{ConfigError, GenerationError, PersonalityError};
pub use history::{HistoryStore, Turn};
pub use persona::{Persona, PersonaSpec, RoleKind};
