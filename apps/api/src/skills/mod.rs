//! Skill derivation: credentials in, confidence-scored skill facts out.

pub mod derivation;
pub mod evaluation;
pub mod prompts;
pub mod resume;

pub use derivation::{DerivationPipeline, ResyncReport};
