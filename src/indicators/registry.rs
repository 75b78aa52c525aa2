//! Static raw-indicator catalog
//!
//! Defined once, read-only, shared by every request.

use super::{Grain, IndicatorDefinition, MonthlyMode, SourceKind, ValueExpr, YearlyMode};
use crate::data::{MonthlyObservation, AREA_FIELD};
use crate::error::{Result, ScoringError};

pub const CROP_YIELD: &str = "crop_yield";
pub const IRRIGATION_DEPTH: &str = "irrigation_depth";
pub const IRRIGATED_AREA: &str = "irrigated_area";
pub const CARBON_SEQUESTRATION: &str = "carbon_sequestration";
pub const NITROGEN_USE_EFFICIENCY: &str = "nitrogen_use_efficiency";
pub const PHOSPHORUS_USE_EFFICIENCY: &str = "phosphorus_use_efficiency";

/// HRU area that received irrigation in the month
fn irrigated_area_ha(row: &MonthlyObservation) -> Option<f64> {
    let area = row.field(AREA_FIELD)?;
    let irrigation = row.field("irr_mm")?;
    Some(if irrigation > 0.0 { area } else { 0.0 })
}

pub static INDICATORS: &[IndicatorDefinition] = &[
    IndicatorDefinition {
        code: CROP_YIELD,
        sector: "crop",
        name: "Crop yield",
        unit: "t/ha",
        source: SourceKind::Hru,
        grain: Grain::SubbasinCrop,
        expr: ValueExpr::Field { field: "yield_t_ha" },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::SumOfMonths,
    },
    IndicatorDefinition {
        code: IRRIGATION_DEPTH,
        sector: "water",
        name: "Irrigation depth",
        unit: "mm",
        source: SourceKind::Hru,
        grain: Grain::SubbasinCrop,
        expr: ValueExpr::Field { field: "irr_mm" },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::SumOfMonths,
    },
    IndicatorDefinition {
        code: IRRIGATED_AREA,
        sector: "water",
        name: "Irrigated area",
        unit: "ha",
        source: SourceKind::Hru,
        grain: Grain::SubbasinCrop,
        expr: ValueExpr::Custom {
            label: "area where irrigation > 0",
            eval: irrigated_area_ha,
        },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::MeanOfMonths,
    },
    IndicatorDefinition {
        code: "nitrogen_applied",
        sector: "soil",
        name: "Nitrogen applied",
        unit: "kg/ha",
        source: SourceKind::Hru,
        grain: Grain::SubbasinCrop,
        expr: ValueExpr::Field { field: "n_applied_kg_ha" },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::SumOfMonths,
    },
    IndicatorDefinition {
        code: NITROGEN_USE_EFFICIENCY,
        sector: "soil",
        name: "Nitrogen use efficiency",
        unit: "-",
        source: SourceKind::Hru,
        grain: Grain::SubbasinCrop,
        expr: ValueExpr::Ratio {
            numerator: "n_uptake_kg_ha",
            denominator: "n_applied_kg_ha",
        },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::MeanOfMonths,
    },
    IndicatorDefinition {
        code: PHOSPHORUS_USE_EFFICIENCY,
        sector: "soil",
        name: "Phosphorus use efficiency",
        unit: "-",
        source: SourceKind::Hru,
        grain: Grain::SubbasinCrop,
        expr: ValueExpr::Ratio {
            numerator: "p_uptake_kg_ha",
            denominator: "p_applied_kg_ha",
        },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::MeanOfMonths,
    },
    IndicatorDefinition {
        code: CARBON_SEQUESTRATION,
        sector: "soil",
        name: "Soil carbon sequestration",
        unit: "t C/ha",
        source: SourceKind::Hru,
        grain: Grain::SubbasinCrop,
        // kg -> t
        expr: ValueExpr::Scaled {
            field: "soc_change_kg_ha",
            factor: 0.001,
        },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::SumOfMonths,
    },
    IndicatorDefinition {
        code: "water_stress",
        sector: "crop",
        name: "Water-stressed year",
        unit: "bool",
        source: SourceKind::Hru,
        grain: Grain::SubbasinCrop,
        expr: ValueExpr::Threshold {
            field: "w_stress_days",
            threshold: 5.0,
        },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::MajorityVote,
    },
    IndicatorDefinition {
        code: "water_yield",
        sector: "water",
        name: "Water yield",
        unit: "mm",
        source: SourceKind::Subbasin,
        grain: Grain::Subbasin,
        expr: ValueExpr::Field { field: "wyld_mm" },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::SumOfMonths,
    },
    IndicatorDefinition {
        code: "sediment_yield",
        sector: "soil",
        name: "Sediment yield",
        unit: "t/ha",
        source: SourceKind::Subbasin,
        grain: Grain::Subbasin,
        expr: ValueExpr::Field { field: "syld_t_ha" },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::SumOfMonths,
    },
    IndicatorDefinition {
        code: "peak_flow",
        sector: "water",
        name: "Peak monthly outflow",
        unit: "m3/s",
        source: SourceKind::Reach,
        grain: Grain::Subbasin,
        expr: ValueExpr::Field { field: "flow_out_cms" },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::MaxOfMonths,
    },
    IndicatorDefinition {
        code: "high_flow",
        sector: "water",
        name: "High-flow year",
        unit: "bool",
        source: SourceKind::Reach,
        grain: Grain::Subbasin,
        expr: ValueExpr::Threshold {
            field: "flow_out_cms",
            threshold: 50.0,
        },
        monthly: MonthlyMode::MeanOfRows,
        yearly: YearlyMode::MajorityVote,
    },
];

/// Look up a raw indicator by code
pub fn definition_for(code: &str) -> Result<&'static IndicatorDefinition> {
    INDICATORS
        .iter()
        .find(|d| d.code == code)
        .ok_or_else(|| ScoringError::UnknownIndicator {
            code: code.to_string(),
        })
}

pub fn list_all() -> &'static [IndicatorDefinition] {
    INDICATORS
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_codes_are_unique() {
        let codes: FxHashSet<&str> = list_all().iter().map(|d| d.code).collect();
        assert_eq!(codes.len(), list_all().len());
    }

    #[test]
    fn test_unknown_code_is_an_error() {
        let err = definition_for("nope").unwrap_err();
        assert_eq!(err, ScoringError::UnknownIndicator { code: "nope".into() });
    }

    #[test]
    fn test_grain_matches_source() {
        for def in list_all() {
            let crop_grain = def.grain == Grain::SubbasinCrop;
            assert_eq!(crop_grain, def.source == SourceKind::Hru, "{}", def.code);
        }
    }

    #[test]
    fn test_boolean_indicators_vote() {
        for def in list_all().iter().filter(|d| d.expr.is_boolean()) {
            assert_eq!(def.yearly, YearlyMode::MajorityVote, "{}", def.code);
        }
        assert!(definition_for("water_stress").unwrap().expr.is_boolean());
    }
}
