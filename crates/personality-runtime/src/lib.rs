//! # Personality Runtime
//!
//! Orchestration for composite agents built from [`personality_core`] personas.
//!
//! A [`Person`] owns several Ordinary personas and one Referee. Each call to
//! [`Person::answer`] asks every Ordinary persona concurrently, waits for all
//! of them, hands the candidates to the referee and records the turn.
//!
//! ```rust
//! use std::sync::Arc;
//! use personality_core::PersonaSpec;
//! use personality_llm::MockBackend;
//! use personality_runtime::Person;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(
//!         MockBackend::scripted()
//!             .on_system("You are Angel", "Return it.")
//!             .on_system("You are Devil", "Keep it.")
//!             .on_system("You are Ref", "Return it."),
//!     );
//!     let mut alex = Person::new(
//!         "Alex",
//!         "Alex found a wallet.",
//!         vec![
//!             PersonaSpec::ordinary("Angel", "You are Angel."),
//!             PersonaSpec::ordinary("Devil", "You are Devil."),
//!             PersonaSpec::referee("Ref", "You are Ref."),
//!         ],
//!         Some(backend),
//!     )
//!     .unwrap();
//!
//!     let reply = alex.answer("What should I do?").await.unwrap();
//!     assert_eq!(reply, "Return it.");
//!     assert_eq!(alex.thoughts().len(), 1);
//! }
//! ```

pub mod ballot;
pub mod person;

pub use ballot::RefereeBallot;
pub use person::{validate_roster, Person};
