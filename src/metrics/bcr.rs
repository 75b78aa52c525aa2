//! Benefit-Cost Ratio
//!
//! Discounted, baseline-relative BCR per crop, then combined across crops
//! by area share.
//!
//! For year offset `i` from the crop's first yield year:
//! - discount factor `1 / (1 + rate)^i`
//! - benefit `(yield_scenario − yield_baseline) × price`
//! - cost `(prodCost_scenario − prodCost_baseline) + investment_if_due + annual O&M`
//!
//! Discounted benefits and costs are summed over years and divided once.
//! Crops combine the same way: shares weight the sums, not the ratios.

use super::{CalculatorContext, IndicatorResult, RatioAccumulator};
use crate::area::YearSeries;
use crate::indicators::registry::CROP_YIELD;
use crate::warnings::{Warning, WarningKind, Warnings};
use std::collections::BTreeMap;

/// Economic inputs for one crop of one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropEconomics {
    pub price: f64,
    /// Scenario minus baseline production cost per hectare
    pub cost_delta: f64,
    pub investment: f64,
    pub annual_om: f64,
    pub life_years: u32,
    pub discount_rate: f64,
}

/// Discounted sums for one crop, overall and per year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropBcr {
    pub total: RatioAccumulator,
    pub by_year: BTreeMap<i32, RatioAccumulator>,
}

/// `1 / (1 + rate)^i`; no discounting when `1 + rate` is not positive
pub fn discount_factor(rate: f64, i: u32) -> f64 {
    let base = 1.0 + rate;
    if base > 0.0 && base.is_finite() {
        1.0 / libm::pow(base, i as f64)
    } else {
        1.0
    }
}

/// Accumulate one crop's discounted benefits and costs
///
/// Years without a baseline yield are left out of both sums.
pub fn crop_bcr(scenario: &YearSeries, baseline: &YearSeries, econ: &CropEconomics) -> CropBcr {
    let mut out = CropBcr::default();
    let Some(first_year) = scenario
        .iter()
        .find(|(_, v)| v.is_some())
        .map(|(y, _)| *y)
    else {
        return out;
    };

    for (year, y_scenario) in scenario {
        let (Some(y_s), Some(Some(y_b))) = (y_scenario, baseline.get(year)) else {
            continue;
        };
        let i = (*year - first_year) as u32;
        let df = discount_factor(econ.discount_rate, i);

        let benefit = (y_s - y_b) * econ.price * df;
        let investment = CalculatorContext::investment_due(econ.investment, econ.life_years, i);
        let cost = (econ.cost_delta + investment + econ.annual_om) * df;

        out.total.add(benefit, cost);
        out.by_year.entry(*year).or_default().add(benefit, cost);
    }
    out
}

pub fn calculate_bcr(ctx: &CalculatorContext<'_>, warnings: &mut Warnings) -> IndicatorResult {
    let indicator = "benefit_cost_ratio";
    let rate = ctx.discount_rate(warnings);

    let mut overall = RatioAccumulator::default();
    let mut by_year: BTreeMap<i32, RatioAccumulator> = BTreeMap::new();
    let mut crops_used = 0usize;

    for (crop, share) in ctx.weights.iter() {
        if share <= 0.0 {
            continue;
        }

        let (Some(scenario), Some(baseline)) = (
            ctx.scenario.crop_series(CROP_YIELD, crop),
            ctx.baseline.crop_series(CROP_YIELD, crop),
        ) else {
            warnings.push(
                Warning::new(
                    WarningKind::MissingYield,
                    format!(
                        "no yield series for {} on scenario {} or baseline {}; crop skipped",
                        crop, ctx.run, ctx.baseline_run
                    ),
                )
                .run(ctx.run)
                .crop(crop)
                .indicator(indicator),
            );
            continue;
        };

        let Some(price) = ctx.crop_price(crop, ctx.run, warnings) else {
            continue;
        };

        let cost_delta = ctx.production_cost(crop, ctx.run, warnings)
            - ctx.baseline_production_cost(crop, warnings);
        let investment = ctx.investment(crop, warnings);
        let econ = CropEconomics {
            price,
            cost_delta,
            investment,
            annual_om: ctx.annual_om(crop, warnings),
            life_years: ctx.economic_life(crop, investment, warnings),
            discount_rate: rate,
        };

        let crop_result = crop_bcr(scenario, baseline, &econ);
        overall.add_weighted(&crop_result.total, share);
        for (year, acc) in &crop_result.by_year {
            by_year.entry(*year).or_default().add_weighted(acc, share);
        }
        crops_used += 1;
    }

    if crops_used == 0 {
        warnings.push(
            Warning::new(
                WarningKind::MissingYield,
                format!("every crop skipped; no benefit-cost ratio for run {}", ctx.run),
            )
            .run(ctx.run)
            .indicator(indicator),
        );
        return IndicatorResult::empty(&ctx.years);
    }

    let scalar = overall.finalize();
    if scalar.is_none() {
        warnings.push(
            Warning::new(
                WarningKind::ZeroDenominator,
                format!("discounted cost is zero for run {}; ratio undefined", ctx.run),
            )
            .run(ctx.run)
            .indicator(indicator),
        );
    }

    let series = ctx
        .years
        .iter()
        .map(|y| (*y, by_year.get(y).and_then(RatioAccumulator::finalize)))
        .collect();

    IndicatorResult { series, scalar }
}
