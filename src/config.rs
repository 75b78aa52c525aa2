//! Request configuration
//!
//! Everything a scoring request needs arrives as JSON: the preset, the runs,
//! variable values and crop areas. Observation tables are referenced by path
//! and read separately.

use crate::data::{AreaRecord, RunId};
use crate::error::{Result as ScoringResult, ScoringError};
use crate::indicators::SourceKind;
use crate::variables::VariableEntry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
}

/// One indicator of a preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetItem {
    pub indicator: String,
    pub weight: f64,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Indicators, weights and directions configured for a study area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub study_area: String,
    pub items: Vec<PresetItem>,
}

impl Preset {
    pub fn enabled(&self) -> impl Iterator<Item = &PresetItem> {
        self.items.iter().filter(|item| item.enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub study_area: String,
    /// Runs to score, in output order
    pub runs: Vec<RunId>,
    /// The study area's canonical baseline run
    #[serde(default)]
    pub baseline_run: Option<RunId>,
    #[serde(default)]
    pub crop_filter: Option<Vec<String>>,
    pub preset: Preset,
}

impl ScoringRequest {
    /// Canonical baseline run; cost and yield comparisons are made against it
    pub fn baseline(&self) -> ScoringResult<RunId> {
        if self.runs.is_empty() {
            return Err(ScoringError::NoRuns {
                study_area: self.study_area.clone(),
            });
        }
        self.baseline_run.ok_or_else(|| ScoringError::NoBaselineRun {
            study_area: self.study_area.clone(),
        })
    }

    /// Run scalar scores are anchored on
    ///
    /// The canonical baseline when it is among the scored runs, else the
    /// first scored run.
    pub fn normalization_anchor(&self) -> ScoringResult<RunId> {
        let baseline = self.baseline()?;
        if self.runs.contains(&baseline) {
            Ok(baseline)
        } else {
            Ok(self.runs[0])
        }
    }

    pub fn crop_filter(&self) -> Option<&[String]> {
        self.crop_filter.as_deref()
    }
}

/// Observation table on disk (CSV or Parquet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationFile {
    pub source: SourceKind,
    pub path: PathBuf,
}

/// A request with its variables, areas and observation tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFile {
    pub request: ScoringRequest,
    #[serde(default)]
    pub variables: Vec<VariableEntry>,
    #[serde(default)]
    pub areas: Vec<AreaRecord>,
    #[serde(default)]
    pub observations: Vec<ObservationFile>,
}

impl RequestFile {
    /// Load from JSON file
    ///
    /// Relative observation paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file: {:?}", path))?;

        let mut file: RequestFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse request JSON: {:?}", path))?;

        if let Some(dir) = path.parent() {
            for obs in &mut file.observations {
                if obs.path.is_relative() {
                    obs.path = dir.join(&obs.path);
                }
            }
        }

        tracing::debug!(
            "Loaded request for '{}': {} runs, {} variables, {} area records",
            file.request.study_area,
            file.request.runs.len(),
            file.variables.len(),
            file.areas.len()
        );
        Ok(file)
    }
}
