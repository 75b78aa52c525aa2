//! Scenario Scorer
//!
//! Multi-criteria scoring of land-management scenarios from monthly
//! hydrological and agronomic model output.
//!
//! Pipeline stages, one module each:
//! - `indicators/`: raw indicator registry
//! - `aggregation/`: monthly evaluation and yearly reduction
//! - `area`: area-weighted merge across sub-basins and crop shares
//! - `dependencies`: multi-criteria indicators and the raw data they read
//! - `variables`: economic parameter lookup with scope precedence
//! - `metrics/`: indicator calculators (BCR, economics, water, soil)
//! - `utils/`: scalar and per-year normalization
//! - `scorer`: request coordinator
//!
//! Inputs are in-memory snapshots; a request never mutates shared state, so
//! independent requests can run in parallel.

pub mod aggregation;
pub mod area;
pub mod config;
pub mod data;
pub mod dependencies;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod scorer;
pub mod utils;
pub mod variables;
pub mod warnings;

// Re-export commonly used types
pub use config::{Direction, Preset, PresetItem, RequestFile, ScoringRequest};
pub use data::{AreaRecord, MonthlyObservation, ObservationSet, RunId, SubbasinId};
pub use dependencies::{required_raw_indicators, McIndicator};
pub use error::{Result, ScoringError};
pub use metrics::{IndicatorResult, RatioAccumulator};
pub use scorer::{ComputationResult, ScenarioScorer, WeightedIndicator};
pub use variables::{VariableEntry, VariableStore, VariableValue};
pub use warnings::{Warning, WarningKind, Warnings};
