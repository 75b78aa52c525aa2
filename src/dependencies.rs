//! Multi-criteria indicators and the raw indicators they consume

use crate::error::{Result, ScoringError};
use crate::indicators::registry::{
    CARBON_SEQUESTRATION, CROP_YIELD, IRRIGATED_AREA, IRRIGATION_DEPTH, NITROGEN_USE_EFFICIENCY,
    PHOSPHORUS_USE_EFFICIENCY,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum McIndicator {
    BenefitCostRatio,
    PriceCostRatio,
    CostSaving,
    NetFarmIncome,
    IncomeIncrease,
    LabourUse,
    WaterUseIntensity,
    WaterTechnicalEfficiency,
    WaterEconomicEfficiency,
    CarbonSequestration,
    FertilizerUseEfficiencyN,
    FertilizerUseEfficiencyP,
    WaterRightsAccess,
}

impl McIndicator {
    pub const ALL: [McIndicator; 13] = [
        McIndicator::BenefitCostRatio,
        McIndicator::PriceCostRatio,
        McIndicator::CostSaving,
        McIndicator::NetFarmIncome,
        McIndicator::IncomeIncrease,
        McIndicator::LabourUse,
        McIndicator::WaterUseIntensity,
        McIndicator::WaterTechnicalEfficiency,
        McIndicator::WaterEconomicEfficiency,
        McIndicator::CarbonSequestration,
        McIndicator::FertilizerUseEfficiencyN,
        McIndicator::FertilizerUseEfficiencyP,
        McIndicator::WaterRightsAccess,
    ];

    pub fn code(self) -> &'static str {
        match self {
            McIndicator::BenefitCostRatio => "benefit_cost_ratio",
            McIndicator::PriceCostRatio => "price_cost_ratio",
            McIndicator::CostSaving => "cost_saving",
            McIndicator::NetFarmIncome => "net_farm_income",
            McIndicator::IncomeIncrease => "income_increase",
            McIndicator::LabourUse => "labour_use",
            McIndicator::WaterUseIntensity => "water_use_intensity",
            McIndicator::WaterTechnicalEfficiency => "water_technical_efficiency",
            McIndicator::WaterEconomicEfficiency => "water_economic_efficiency",
            McIndicator::CarbonSequestration => "carbon_sequestration",
            McIndicator::FertilizerUseEfficiencyN => "fertilizer_use_efficiency_n",
            McIndicator::FertilizerUseEfficiencyP => "fertilizer_use_efficiency_p",
            McIndicator::WaterRightsAccess => "water_rights_access",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.code() == code)
            .ok_or_else(|| ScoringError::UnknownMultiCriteriaIndicator {
                code: code.to_string(),
            })
    }

    /// Raw indicator codes this indicator reads
    pub fn raw_dependencies(self) -> &'static [&'static str] {
        match self {
            McIndicator::BenefitCostRatio | McIndicator::PriceCostRatio => &[CROP_YIELD],
            McIndicator::CostSaving | McIndicator::LabourUse => &[],
            McIndicator::NetFarmIncome
            | McIndicator::IncomeIncrease
            | McIndicator::WaterTechnicalEfficiency
            | McIndicator::WaterEconomicEfficiency => &[CROP_YIELD, IRRIGATION_DEPTH],
            McIndicator::WaterUseIntensity => &[IRRIGATION_DEPTH],
            McIndicator::CarbonSequestration => &[CARBON_SEQUESTRATION],
            McIndicator::FertilizerUseEfficiencyN => &[NITROGEN_USE_EFFICIENCY],
            McIndicator::FertilizerUseEfficiencyP => &[PHOSPHORUS_USE_EFFICIENCY],
            McIndicator::WaterRightsAccess => &[IRRIGATED_AREA],
        }
    }
}

impl fmt::Display for McIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Deduplicated raw indicators needed by the enabled indicators
///
/// `crop_yield` is always present when anything is enabled: it anchors the
/// time axis and the crop weighting.
pub fn required_raw_indicators(enabled: &[McIndicator]) -> BTreeSet<&'static str> {
    let mut required: BTreeSet<&'static str> = enabled
        .iter()
        .flat_map(|i| i.raw_dependencies().iter().copied())
        .collect();
    if !enabled.is_empty() {
        required.insert(CROP_YIELD);
    }
    required
}
