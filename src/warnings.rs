//! Data-sparsity warnings
//!
//! A missing price, yield or farm size turns the affected cell into `None`
//! and appends a warning here. Computation carries on for every other cell.

use crate::data::RunId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MissingYield,
    MissingVariable,
    DegradedCropWeights,
    ZeroDenominator,
    MissingFarmSize,
    MissingBaselineScalar,
    VariableTypeMismatch,
}

/// Human-readable warning attached to a computation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub run: Option<RunId>,
    pub crop: Option<String>,
    pub indicator: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            run: None,
            crop: None,
            indicator: None,
            message: message.into(),
        }
    }

    pub fn run(mut self, run: RunId) -> Self {
        self.run = Some(run);
        self
    }

    pub fn crop(mut self, crop: &str) -> Self {
        self.crop = Some(crop.to_string());
        self
    }

    pub fn indicator(mut self, code: &str) -> Self {
        self.indicator = Some(code.to_string());
        self
    }
}

/// Ordered, de-duplicated warning list
#[derive(Debug, Default, Clone)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning unless an identical one is already present
    pub fn push(&mut self, warning: Warning) {
        if self.items.contains(&warning) {
            return;
        }
        tracing::warn!(
            kind = ?warning.kind,
            run = ?warning.run,
            crop = ?warning.crop,
            indicator = ?warning.indicator,
            "{}",
            warning.message
        );
        self.items.push(warning);
    }

    pub fn extend(&mut self, other: Warnings) {
        for w in other.items {
            self.push(w);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    pub fn has_kind(&self, kind: WarningKind) -> bool {
        self.items.iter().any(|w| w.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}
