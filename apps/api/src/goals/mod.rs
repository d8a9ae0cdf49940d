//! Goal-gap analysis: current skills vs. stated career goals.

pub mod analyzer;
pub mod handlers;
pub mod prompts;

pub use analyzer::{analyze_goals, GoalAnalysis};
