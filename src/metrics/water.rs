//! Water indicators
//!
//! Irrigation depth arrives in mm; volumes are m³/ha (1 mm over 1 ha = 10 m³).

use super::{CalculatorContext, IndicatorResult, EPSILON, MM_TO_M3_PER_HA};
use crate::indicators::registry::{CROP_YIELD, IRRIGATED_AREA, IRRIGATION_DEPTH};
use crate::variables::keys;
use crate::warnings::{Warning, WarningKind, Warnings};
use std::collections::BTreeMap;

fn irrigation_m3(ctx: &CalculatorContext<'_>, crop: &str, year: i32) -> Option<f64> {
    ctx.scenario
        .value(IRRIGATION_DEPTH, crop, year)
        .map(|mm| mm * MM_TO_M3_PER_HA)
}

/// Per-hectare quantity over irrigation volume; rainfed crop-years are blank
fn per_m3(quantity: f64, water_m3: f64) -> Option<f64> {
    (water_m3.abs() >= EPSILON).then(|| quantity / water_m3)
}

pub fn calculate_water_use_intensity(ctx: &CalculatorContext<'_>) -> IndicatorResult {
    ctx.yearly(|year| ctx.combine_crops(|crop| irrigation_m3(ctx, crop, year)))
}

/// kg of crop per m³ of irrigation water
pub fn calculate_water_technical_efficiency(ctx: &CalculatorContext<'_>) -> IndicatorResult {
    ctx.yearly(|year| {
        ctx.combine_crops(|crop| {
            let yield_t_ha = ctx.scenario.value(CROP_YIELD, crop, year)?;
            per_m3(yield_t_ha * 1000.0, irrigation_m3(ctx, crop, year)?)
        })
    })
}

/// Revenue per m³ of irrigation water
pub fn calculate_water_economic_efficiency(
    ctx: &CalculatorContext<'_>,
    warnings: &mut Warnings,
) -> IndicatorResult {
    let mut prices: BTreeMap<&str, f64> = BTreeMap::new();
    for (crop, share) in ctx.weights.iter() {
        if share <= 0.0 {
            continue;
        }
        if let Some(price) = ctx.crop_price(crop, ctx.run, warnings) {
            prices.insert(crop, price);
        }
    }

    ctx.yearly(|year| {
        ctx.combine_crops(|crop| {
            let price = prices.get(crop)?;
            let yield_t_ha = ctx.scenario.value(CROP_YIELD, crop, year)?;
            per_m3(yield_t_ha * price, irrigation_m3(ctx, crop, year)?)
        })
    })
}

/// Average monthly irrigated area over the farm size
///
/// Without a positive farm size the whole series is blank.
pub fn calculate_water_rights_access(
    ctx: &CalculatorContext<'_>,
    warnings: &mut Warnings,
) -> IndicatorResult {
    let farm_size = ctx.number(keys::FARM_SIZE_HA, None, ctx.run);
    let farm_size = match farm_size {
        Some(ha) if ha > 0.0 => ha,
        other => {
            warnings.push(
                Warning::new(
                    WarningKind::MissingFarmSize,
                    match other {
                        Some(ha) => format!("farm size {} ha for run {} is not positive", ha, ctx.run),
                        None => format!("no farm size for run {}", ctx.run),
                    },
                )
                .run(ctx.run)
                .indicator("water_rights_access"),
            );
            return IndicatorResult::empty(&ctx.years);
        }
    };

    ctx.yearly(|year| {
        let irrigated_ha =
            ctx.combine_crops(|crop| ctx.scenario.value(IRRIGATED_AREA, crop, year))?;
        Some(irrigated_ha / farm_size)
    })
}
