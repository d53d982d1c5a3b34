//! # Personality LLM
//!
//! The generation capability every persona is built on.
//!
//! A [`GenerationBackend`] turns `(system prompt, user prompt, sampling)` into
//! text. Concrete HTTP clients live outside this workspace; what lives here is
//! the trait, the sampling types, a scripted [`MockBackend`] for tests and
//! demos, and [`ResilientBackend`], the retry decorator.
//!
//! ## Quick Start
//!
//! ```rust
//! use personality_llm::{GenerationBackend, MockBackend, SamplingConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = MockBackend::scripted().on_system("Angel", "Be kind.");
//!
//!     let text = backend
//!         .generate("You are Angel", "Should I lie?", &SamplingConfig::default())
//!         .await
//!         .unwrap();
//!     assert_eq!(text, "Be kind.");
//! }
//! ```
//!
//! ## Retries
//!
//! ```rust
//! use personality_llm::{MockBackend, ResilientBackend};
//!
//! // Six attempts, three minutes apart
//! let backend = ResilientBackend::wrap(MockBackend::constant("ok"));
//! ```

pub mod backend;
pub mod metrics;
pub mod mock;
pub mod resilient;

pub use backend::{
    GenerationBackend, GenerationRequest, GenerationResponse, LlmError, SamplingConfig,
    SamplingOverride,
};
pub use metrics::{global_metrics, Metrics, MetricsSnapshot};
pub use mock::MockBackend;
pub use resilient::{ResilientBackend, RetryConfig, RetryStats};
