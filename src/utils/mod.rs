//! Utility modules for scenario scoring
//!
//! - Normalization: baseline-anchored scalar scores and per-year min-max scores

pub mod normalization;

pub use normalization::{normalized_weights, per_year_scores, scalar_scores, RunValues};
