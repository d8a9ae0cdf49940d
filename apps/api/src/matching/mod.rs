//! Weighted skill matching between applicants and job postings.

pub mod engine;
pub mod handlers;
pub mod jobs;

pub use engine::{match_score, skill_set, MatchResult};
