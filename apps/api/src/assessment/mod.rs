//! Adaptive skill tests: generate a battery from the applicant's skills,
//! grade submissions, and nudge skill confidence by bounded deltas.

pub mod generator;
pub mod grading;
pub mod handlers;
pub mod prompts;
