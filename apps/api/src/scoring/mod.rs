//! Confidence scoring primitives and the tunable policy behind them.
//!
//! Everything in here is pure: no I/O, no clocks. Callers pass `now` in.

pub mod confidence;
pub mod policy;

pub use policy::ScoringPolicy;
