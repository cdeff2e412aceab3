//! a2v-core: shared types, errors, configuration, and media eligibility.
//!
//! This crate is the foundational dependency for all other a2v-* crates,
//! providing the unified error taxonomy, the job identifier, application
//! configuration, and the audio eligibility classifier.

pub mod config;
pub mod error;
pub mod ids;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result, Stage};
pub use ids::JobId;
pub use media::{classify, Eligibility};
