//! # Personality Experiments
//!
//! Tools for studying a [`Person`](personality_runtime::Person):
//! - [`response_collector`] re-drives a prompt batch and reads back the
//!   Ordinary outputs
//! - [`scan`], [`scan_person`] and [`scan_batch`] filter existing turns by
//!   [`Selector`], and [`answer_and_scan`] answers a batch first
//! - [`ref_response_collector`] sweeps the referee across sampling overrides
//!   with the candidates held fixed

pub mod extractor;
pub mod selector;
pub mod sweep;

pub use extractor::{
    answer_and_scan, response_collector, scan, scan_batch, scan_person, Extraction,
    COLLECT_REFEREE_TEMPERATURE,
};
pub use selector::{Collect, Selector};
pub use sweep::{ref_response_collector, Choices, SweepRequest};
