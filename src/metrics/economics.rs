//! Farm economics indicators
//!
//! All values are per hectare and crop-weighted with the run's shares.

use super::{CalculatorContext, IndicatorResult, RatioAccumulator, EPSILON, MM_TO_M3_PER_HA};
use crate::data::RunId;
use crate::indicators::registry::{CROP_YIELD, IRRIGATION_DEPTH};
use crate::metrics::RunSeries;
use crate::variables::keys;
use crate::warnings::{Warning, WarningKind, Warnings};
use std::collections::BTreeMap;

/// Price / cost ratio
///
/// Per year: Σ(yield × price × w) / Σ((prodCost + amortised investment + O&M) × w),
/// then the mean of the years.
pub fn calculate_price_cost_ratio(
    ctx: &CalculatorContext<'_>,
    warnings: &mut Warnings,
) -> IndicatorResult {
    // (crop, share, price, cost per ha)
    let mut crops: Vec<(&str, f64, f64, f64)> = Vec::new();
    for (crop, share) in ctx.weights.iter() {
        if share <= 0.0 {
            continue;
        }
        let Some(price) = ctx.crop_price(crop, ctx.run, warnings) else {
            continue;
        };
        let cost = ctx.production_cost(crop, ctx.run, warnings) + amortised_costs(ctx, crop, warnings);
        crops.push((crop, share, price, cost));
    }

    ctx.yearly(|year| {
        let mut acc = RatioAccumulator::default();
        for (crop, share, price, cost) in &crops {
            if let Some(y) = ctx.scenario.value(CROP_YIELD, crop, year) {
                acc.add(y * price * share, cost * share);
            }
        }
        acc.finalize()
    })
}

/// Investment spread over its economic life, plus annual O&M
fn amortised_costs(ctx: &CalculatorContext<'_>, crop: &str, warnings: &mut Warnings) -> f64 {
    let investment = ctx.investment(crop, warnings);
    let life = ctx.economic_life(crop, investment, warnings);
    investment / life as f64 + ctx.annual_om(crop, warnings)
}

/// Baseline production cost − (scenario cost + amortised investment + O&M)
pub fn calculate_cost_saving(ctx: &CalculatorContext<'_>, warnings: &mut Warnings) -> IndicatorResult {
    let mut savings: BTreeMap<&str, f64> = BTreeMap::new();
    for (crop, share) in ctx.weights.iter() {
        if share <= 0.0 {
            continue;
        }
        let scenario_cost =
            ctx.production_cost(crop, ctx.run, warnings) + amortised_costs(ctx, crop, warnings);
        let saving = ctx.baseline_production_cost(crop, warnings) - scenario_cost;
        savings.insert(crop, saving);
    }

    let value = ctx.combine_crops(|crop| savings.get(crop).copied());
    IndicatorResult::constant(&ctx.years, value)
}

/// Person-days per hectare across field operations
pub fn calculate_labour_use(ctx: &CalculatorContext<'_>, warnings: &mut Warnings) -> IndicatorResult {
    let mut days: BTreeMap<&str, f64> = BTreeMap::new();
    for (crop, share) in ctx.weights.iter() {
        if share <= 0.0 {
            continue;
        }
        match ctx.labour_days(crop, ctx.run) {
            Some(d) => {
                days.insert(crop, d);
            }
            None => warnings.push(
                Warning::new(
                    WarningKind::MissingVariable,
                    format!("no labour factors for {} in run {}", crop, ctx.run),
                )
                .run(ctx.run)
                .crop(crop)
                .indicator("labour_use"),
            ),
        }
    }

    let value = ctx.combine_crops(|crop| days.get(crop).copied());
    IndicatorResult::constant(&ctx.years, value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Scenario,
    Baseline,
}

/// Per-hectare income terms of one crop on one side of the comparison
#[derive(Debug, Clone, Copy)]
struct IncomeTerms {
    price: f64,
    production_cost: f64,
    investment: f64,
    life: u32,
    annual_om: f64,
    land_rent: f64,
    water_fee: f64,
    water_price: f64,
    first_year: Option<i32>,
}

fn income_terms(
    ctx: &CalculatorContext<'_>,
    side: Side,
    warnings: &mut Warnings,
) -> BTreeMap<String, IncomeTerms> {
    let run: RunId = match side {
        Side::Scenario => ctx.run,
        Side::Baseline => ctx.baseline_run,
    };
    let series: &RunSeries = match side {
        Side::Scenario => ctx.scenario,
        Side::Baseline => ctx.baseline,
    };

    let mut out = BTreeMap::new();
    for (crop, share) in ctx.weights.iter() {
        if share <= 0.0 {
            continue;
        }
        let Some(price) = ctx.crop_price(crop, run, warnings) else {
            continue;
        };

        if series.crop_series(IRRIGATION_DEPTH, crop).is_none() {
            warnings.push(
                Warning::new(
                    WarningKind::MissingVariable,
                    format!("no irrigation series for {} in run {}; water volume cost 0", crop, run),
                )
                .run(run)
                .crop(crop),
            );
        }

        let (production_cost, investment, annual_om) = match side {
            Side::Scenario => (
                ctx.production_cost(crop, run, warnings),
                ctx.investment(crop, warnings),
                ctx.annual_om(crop, warnings),
            ),
            Side::Baseline => (ctx.baseline_production_cost(crop, warnings), 0.0, 0.0),
        };
        let life = ctx.economic_life(crop, investment, warnings);

        out.insert(
            crop.to_string(),
            IncomeTerms {
                price,
                production_cost,
                investment,
                life,
                annual_om,
                land_rent: ctx.number_or(keys::LAND_RENT, Some(crop), run, 0.0, warnings),
                water_fee: ctx.number_or(keys::WATER_FEE, Some(crop), run, 0.0, warnings),
                water_price: ctx.number_or(keys::WATER_PRICE_PER_M3, Some(crop), run, 0.0, warnings),
                first_year: ctx.first_year(crop),
            },
        );
    }
    out
}

/// Revenue minus every cost for one crop and year
fn net_income(series: &RunSeries, terms: &IncomeTerms, crop: &str, year: i32) -> Option<f64> {
    let yield_t_ha = series.value(CROP_YIELD, crop, year)?;
    let water_m3 = series.value(IRRIGATION_DEPTH, crop, year).unwrap_or(0.0) * MM_TO_M3_PER_HA;
    let i = terms
        .first_year
        .map(|first| (year - first).max(0) as u32)
        .unwrap_or(0);
    let investment = CalculatorContext::investment_due(terms.investment, terms.life, i);

    let revenue = yield_t_ha * terms.price;
    let costs = terms.production_cost
        + investment
        + terms.annual_om
        + terms.land_rent
        + terms.water_fee
        + water_m3 * terms.water_price;
    Some(revenue - costs)
}

fn combined_income(
    ctx: &CalculatorContext<'_>,
    series: &RunSeries,
    terms: &BTreeMap<String, IncomeTerms>,
    year: i32,
) -> Option<f64> {
    ctx.combine_crops(|crop| net_income(series, terms.get(crop)?, crop, year))
}

/// Net farm income per hectare
///
/// Revenue − (prodCost + investment-if-due + O&M + land rent + water fee + water volume cost)
pub fn calculate_net_farm_income(
    ctx: &CalculatorContext<'_>,
    warnings: &mut Warnings,
) -> IndicatorResult {
    let terms = income_terms(ctx, Side::Scenario, warnings);
    ctx.yearly(|year| combined_income(ctx, ctx.scenario, &terms, year))
}

/// Income increase (%) of the scenario over the baseline
///
/// Both sides are net farm income: the scenario with its own yields and
/// costs, the baseline with baseline yields and the reference cost. Each
/// year only combines crops with an income on both sides.
pub fn calculate_income_increase(
    ctx: &CalculatorContext<'_>,
    warnings: &mut Warnings,
) -> IndicatorResult {
    let after_terms = income_terms(ctx, Side::Scenario, warnings);
    let before_terms = income_terms(ctx, Side::Baseline, warnings);

    let mut zero_before = false;
    let result = ctx.yearly(|year| {
        let paired = |crop: &str| -> Option<(f64, f64)> {
            let after = net_income(ctx.scenario, after_terms.get(crop)?, crop, year)?;
            let before = net_income(ctx.baseline, before_terms.get(crop)?, crop, year)?;
            Some((after, before))
        };
        let after = ctx.combine_crops(|crop| paired(crop).map(|(a, _)| a))?;
        let before = ctx.combine_crops(|crop| paired(crop).map(|(_, b)| b))?;
        if before.abs() < EPSILON {
            zero_before = true;
            return None;
        }
        Some((after - before) / before * 100.0)
    });

    if zero_before {
        warnings.push(
            Warning::new(
                WarningKind::ZeroDenominator,
                format!("baseline income is zero in some years for run {}", ctx.run),
            )
            .run(ctx.run)
            .indicator("income_increase"),
        );
    }
    result
}
