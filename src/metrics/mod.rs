//! Multi-criteria indicator calculators
//!
//! Each calculator reads the area-weighted per-crop series of its raw
//! indicators, the crop shares for the run and resolved variables, and
//! returns a yearly series plus a scalar summary. Missing inputs blank the
//! affected year (with a warning) rather than failing the run.
//!
//! - `bcr`: discounted benefit-cost ratio against the baseline run
//! - `economics`: price/cost ratio, cost saving, net farm income, income increase, labour
//! - `water`: use intensity, technical and economic efficiency, water-rights access
//! - `soil`: carbon sequestration and fertilizer-use efficiency passthroughs

pub mod bcr;
pub mod economics;
pub mod soil;
pub mod water;

pub use bcr::calculate_bcr;
pub use economics::{
    calculate_cost_saving, calculate_income_increase, calculate_labour_use,
    calculate_net_farm_income, calculate_price_cost_ratio,
};
pub use soil::{calculate_carbon_sequestration, calculate_fertilizer_use_efficiency};
pub use water::{
    calculate_water_economic_efficiency, calculate_water_rights_access,
    calculate_water_technical_efficiency, calculate_water_use_intensity,
};

use crate::area::{CropKey, CropWeights, OverallSeries, YearSeries};
use crate::data::RunId;
use crate::dependencies::McIndicator;
use crate::indicators::registry::{CROP_YIELD, NITROGEN_USE_EFFICIENCY, PHOSPHORUS_USE_EFFICIENCY};
use crate::variables::{keys, Scope, VariableResolver};
use crate::warnings::{Warning, WarningKind, Warnings};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Denominators smaller than this are treated as zero
pub const EPSILON: f64 = 1e-9;

/// Irrigation depth (mm) to volume per hectare (m³/ha)
pub const MM_TO_M3_PER_HA: f64 = 10.0;

/// Yearly series and scalar summary of one indicator for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorResult {
    pub series: BTreeMap<i32, Option<f64>>,
    pub scalar: Option<f64>,
}

impl IndicatorResult {
    /// Scalar is the mean of the non-null years
    pub fn from_series(series: BTreeMap<i32, Option<f64>>) -> Self {
        let valued: Vec<f64> = series.values().flatten().copied().collect();
        let scalar = if valued.is_empty() {
            None
        } else {
            Some(valued.iter().sum::<f64>() / valued.len() as f64)
        };
        Self { series, scalar }
    }

    /// Every year of the axis blank
    pub fn empty(years: &[i32]) -> Self {
        Self {
            series: years.iter().map(|y| (*y, None)).collect(),
            scalar: None,
        }
    }

    /// Same value on every year of the axis
    pub fn constant(years: &[i32], value: Option<f64>) -> Self {
        Self {
            series: years.iter().map(|y| (*y, value)).collect(),
            scalar: value,
        }
    }
}

/// Sum-then-divide accumulator
///
/// Numerators and denominators are summed across years (or crops) and
/// divided once in [`RatioAccumulator::finalize`]. Per-year ratios are
/// never averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatioAccumulator {
    pub numerator_sum: f64,
    pub denominator_sum: f64,
}

impl RatioAccumulator {
    pub fn add(&mut self, numerator: f64, denominator: f64) {
        self.numerator_sum += numerator;
        self.denominator_sum += denominator;
    }

    pub fn add_weighted(&mut self, other: &RatioAccumulator, weight: f64) {
        self.add(other.numerator_sum * weight, other.denominator_sum * weight);
    }

    /// `None` when the denominator sum is (numerically) zero
    pub fn finalize(&self) -> Option<f64> {
        if self.denominator_sum.abs() < EPSILON {
            None
        } else {
            Some(self.numerator_sum / self.denominator_sum)
        }
    }
}

/// Area-weighted series of every required raw indicator for one run
#[derive(Debug, Clone, Default)]
pub struct RunSeries {
    by_indicator: FxHashMap<&'static str, OverallSeries>,
}

impl RunSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: &'static str, series: OverallSeries) {
        self.by_indicator.insert(code, series);
    }

    pub fn get(&self, code: &str) -> Option<&OverallSeries> {
        self.by_indicator.get(code)
    }

    pub fn crop_series(&self, code: &str, crop: &str) -> Option<&YearSeries> {
        self.get(code)?.get(&CropKey::crop(crop))
    }

    /// Single cell lookup
    pub fn value(&self, code: &str, crop: &str, year: i32) -> Option<f64> {
        self.crop_series(code, crop)?.get(&year).copied().flatten()
    }
}

/// Everything a calculator needs for one (run, crop filter)
pub struct CalculatorContext<'a> {
    pub run: RunId,
    pub baseline_run: RunId,
    pub scenario: &'a RunSeries,
    pub baseline: &'a RunSeries,
    /// Shared by every calculator of the run
    pub weights: &'a CropWeights,
    pub variables: &'a VariableResolver<'a>,
    /// Time axis taken from the run's yield series
    pub years: Vec<i32>,
}

impl<'a> CalculatorContext<'a> {
    pub fn number(&self, key: &str, crop: Option<&str>, run: RunId) -> Option<f64> {
        let scope = match crop {
            Some(c) => Scope::CropRun(c, run),
            None => Scope::Run(run),
        };
        self.variables.number(key, scope)
    }

    /// Lookup with an explicit fallback that is always reported
    pub fn number_or(
        &self,
        key: &str,
        crop: Option<&str>,
        run: RunId,
        fallback: f64,
        warnings: &mut Warnings,
    ) -> f64 {
        match self.number(key, crop, run) {
            Some(v) => v,
            None => {
                let mut warning = Warning::new(
                    WarningKind::MissingVariable,
                    format!(
                        "'{}' missing for run {}{}; using {}",
                        key,
                        run,
                        crop.map(|c| format!(", crop {}", c)).unwrap_or_default(),
                        fallback
                    ),
                )
                .run(run);
                if let Some(c) = crop {
                    warning = warning.crop(c);
                }
                warnings.push(warning);
                fallback
            }
        }
    }

    pub fn crop_price(&self, crop: &str, run: RunId, warnings: &mut Warnings) -> Option<f64> {
        let price = self.number(keys::CROP_PRICE, Some(crop), run);
        if price.is_none() {
            warnings.push(
                Warning::new(
                    WarningKind::MissingVariable,
                    format!("no crop price for {} in run {}; crop skipped", crop, run),
                )
                .run(run)
                .crop(crop),
            );
        }
        price
    }

    /// Rate above −1; anything else is replaced by 0 and reported
    pub fn discount_rate(&self, warnings: &mut Warnings) -> f64 {
        let rate = self.number_or(keys::DISCOUNT_RATE, None, self.run, 0.0, warnings);
        if rate.is_finite() && rate > -1.0 {
            rate
        } else {
            self.invalid_variable(keys::DISCOUNT_RATE, None, rate, 0.0, warnings);
            0.0
        }
    }

    pub fn investment(&self, crop: &str, warnings: &mut Warnings) -> f64 {
        self.number_or(keys::INVESTMENT_COST, Some(crop), self.run, 0.0, warnings)
    }

    pub fn annual_om(&self, crop: &str, warnings: &mut Warnings) -> f64 {
        self.number_or(keys::ANNUAL_OM_COST, Some(crop), self.run, 0.0, warnings)
    }

    /// Years between investment renewals, at least 1
    ///
    /// Only consulted (and only reported missing) when there is an investment.
    pub fn economic_life(&self, crop: &str, investment: f64, warnings: &mut Warnings) -> u32 {
        if investment == 0.0 {
            return 1;
        }
        let life = self.number_or(keys::ECONOMIC_LIFE_YEARS, Some(crop), self.run, 1.0, warnings);
        if life.is_finite() && life >= 1.0 {
            life.round() as u32
        } else {
            self.invalid_variable(keys::ECONOMIC_LIFE_YEARS, Some(crop), life, 1.0, warnings);
            1
        }
    }

    fn invalid_variable(
        &self,
        key: &str,
        crop: Option<&str>,
        value: f64,
        fallback: f64,
        warnings: &mut Warnings,
    ) {
        let mut warning = Warning::new(
            WarningKind::MissingVariable,
            format!(
                "'{}' = {} is out of range for run {}; using {}",
                key, value, self.run, fallback
            ),
        )
        .run(self.run);
        if let Some(c) = crop {
            warning = warning.crop(c);
        }
        warnings.push(warning);
    }

    /// Investment charged in year offset `i` of the crop's series
    pub fn investment_due(investment: f64, life: u32, i: u32) -> f64 {
        if i % life.max(1) == 0 {
            investment
        } else {
            0.0
        }
    }

    /// Person-days per hectare for a crop under a run's practices
    pub fn labour_days(&self, crop: &str, run: RunId) -> Option<f64> {
        let days: Vec<f64> = keys::LABOUR_FACTORS
            .iter()
            .filter_map(|k| self.number(k, Some(crop), run))
            .collect();
        (!days.is_empty()).then(|| days.iter().sum())
    }

    /// Labour days × day rate + material costs, per hectare
    pub fn production_cost(&self, crop: &str, run: RunId, warnings: &mut Warnings) -> f64 {
        let materials: Vec<f64> = keys::MATERIAL_FACTORS
            .iter()
            .filter_map(|k| self.number(k, Some(crop), run))
            .collect();
        let labour_days = self.labour_days(crop, run);

        if materials.is_empty() && labour_days.is_none() {
            warnings.push(
                Warning::new(
                    WarningKind::MissingVariable,
                    format!("no production cost factors for {} in run {}; using 0", crop, run),
                )
                .run(run)
                .crop(crop),
            );
            return 0.0;
        }

        let labour_cost = match labour_days {
            Some(days) if days != 0.0 => {
                days * self.number_or(keys::LABOUR_DAY_RATE, None, run, 0.0, warnings)
            }
            _ => 0.0,
        };
        labour_cost + materials.iter().sum::<f64>()
    }

    /// What the farmer pays today for a crop
    ///
    /// An explicit reference cost (resolved against the baseline run) wins;
    /// otherwise the baseline run's own production cost.
    pub fn baseline_production_cost(&self, crop: &str, warnings: &mut Warnings) -> f64 {
        match self.number(keys::REFERENCE_PRODUCTION_COST, Some(crop), self.run) {
            Some(cost) => cost,
            None => self.production_cost(crop, self.baseline_run, warnings),
        }
    }

    /// Weighted mean over crops with a value, shares renormalised
    pub fn combine_crops<F>(&self, mut value: F) -> Option<f64>
    where
        F: FnMut(&str) -> Option<f64>,
    {
        let mut num = 0.0;
        let mut den = 0.0;
        for (crop, share) in self.weights.iter() {
            if share <= 0.0 {
                continue;
            }
            if let Some(v) = value(crop) {
                num += share * v;
                den += share;
            }
        }
        (den > 0.0).then(|| num / den)
    }

    /// Apply a per-year crop-weighted formula over the time axis
    pub fn yearly<F>(&self, mut per_year: F) -> IndicatorResult
    where
        F: FnMut(i32) -> Option<f64>,
    {
        let series = self.years.iter().map(|y| (*y, per_year(*y))).collect();
        IndicatorResult::from_series(series)
    }

    /// First year with a yield value for a crop on the scenario side
    pub fn first_year(&self, crop: &str) -> Option<i32> {
        self.scenario
            .crop_series(CROP_YIELD, crop)?
            .iter()
            .find(|(_, v)| v.is_some())
            .map(|(y, _)| *y)
    }
}

/// Dispatch one enabled indicator to its calculator
pub fn calculate(
    indicator: McIndicator,
    ctx: &CalculatorContext<'_>,
    warnings: &mut Warnings,
) -> IndicatorResult {
    match indicator {
        McIndicator::BenefitCostRatio => calculate_bcr(ctx, warnings),
        McIndicator::PriceCostRatio => calculate_price_cost_ratio(ctx, warnings),
        McIndicator::CostSaving => calculate_cost_saving(ctx, warnings),
        McIndicator::NetFarmIncome => calculate_net_farm_income(ctx, warnings),
        McIndicator::IncomeIncrease => calculate_income_increase(ctx, warnings),
        McIndicator::LabourUse => calculate_labour_use(ctx, warnings),
        McIndicator::WaterUseIntensity => calculate_water_use_intensity(ctx),
        McIndicator::WaterTechnicalEfficiency => calculate_water_technical_efficiency(ctx),
        McIndicator::WaterEconomicEfficiency => calculate_water_economic_efficiency(ctx, warnings),
        McIndicator::CarbonSequestration => calculate_carbon_sequestration(ctx),
        McIndicator::FertilizerUseEfficiencyN => {
            calculate_fertilizer_use_efficiency(ctx, NITROGEN_USE_EFFICIENCY)
        }
        McIndicator::FertilizerUseEfficiencyP => {
            calculate_fertilizer_use_efficiency(ctx, PHOSPHORUS_USE_EFFICIENCY)
        }
        McIndicator::WaterRightsAccess => calculate_water_rights_access(ctx, warnings),
    }
}
