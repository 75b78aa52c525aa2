//! Fatal error taxonomy
//!
//! Configuration errors abort a request before any partial result is built.
//! Data sparsity never lands here; it is reported through [`crate::warnings`].

use crate::data::RunId;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ScoringError {
    #[error("unknown raw indicator '{code}'")]
    UnknownIndicator { code: String },

    #[error("unknown multi-criteria indicator '{code}'")]
    UnknownMultiCriteriaIndicator { code: String },

    #[error("preset for study area '{study_area}' has no enabled indicators")]
    EmptyPreset { study_area: String },

    #[error("study area '{study_area}' has no baseline run")]
    NoBaselineRun { study_area: String },

    #[error("scoring request for study area '{study_area}' names no runs")]
    NoRuns { study_area: String },

    #[error("indicator '{code}' has invalid weight {weight}")]
    InvalidWeight { code: String, weight: f64 },

    #[error("all enabled indicators have weight 0; totals withheld")]
    AllWeightsZero,

    #[error("run {run} has no '{indicator}' observations")]
    NoObservations { run: RunId, indicator: String },

    #[error("observation frame is missing column '{column}'")]
    MissingColumn { column: String },
}

pub type Result<T> = std::result::Result<T, ScoringError>;
