//! Indicator definitions
//!
//! A raw indicator says which observation table it reads, at which grain,
//! how one month's value is formed from the rows sharing a
//! (month, sub-basin, crop) key, and how twelve months reduce to a year.
//!
//! - `registry`: the static catalog and lookups

pub mod registry;

pub use registry::{definition_for, list_all, INDICATORS};

use crate::data::MonthlyObservation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw observation table an indicator is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Hydrologic response units: one row per (sub-basin, crop)
    Hru,
    /// Sub-basin totals
    Subbasin,
    /// Main channel reach leaving each sub-basin
    Reach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grain {
    Subbasin,
    SubbasinCrop,
}

/// How rows sharing a (month, sub-basin, crop) key collapse into one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyMode {
    MeanOfRows,
}

/// How monthly values collapse into one yearly value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YearlyMode {
    MeanOfMonths,
    SumOfMonths,
    MaxOfMonths,
    /// 1 only if strictly more months are 1 than 0
    MajorityVote,
}

/// Per-row formula, each variant carrying only what it needs
#[derive(Clone, Copy)]
pub enum ValueExpr {
    Field {
        field: &'static str,
    },
    Ratio {
        numerator: &'static str,
        denominator: &'static str,
    },
    Threshold {
        field: &'static str,
        threshold: f64,
    },
    Scaled {
        field: &'static str,
        factor: f64,
    },
    Custom {
        label: &'static str,
        eval: fn(&MonthlyObservation) -> Option<f64>,
    },
}

impl fmt::Debug for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueExpr::Field { field } => write!(f, "Field({field})"),
            ValueExpr::Ratio {
                numerator,
                denominator,
            } => write!(f, "Ratio({numerator}/{denominator})"),
            ValueExpr::Threshold { field, threshold } => {
                write!(f, "Threshold({field} > {threshold})")
            }
            ValueExpr::Scaled { field, factor } => write!(f, "Scaled({field} * {factor})"),
            ValueExpr::Custom { label, .. } => write!(f, "Custom({label})"),
        }
    }
}

impl ValueExpr {
    /// Threshold expressions produce 0/1 flags
    pub fn is_boolean(&self) -> bool {
        matches!(self, ValueExpr::Threshold { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndicatorDefinition {
    pub code: &'static str,
    pub sector: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub source: SourceKind,
    pub grain: Grain,
    pub expr: ValueExpr,
    pub monthly: MonthlyMode,
    pub yearly: YearlyMode,
}
