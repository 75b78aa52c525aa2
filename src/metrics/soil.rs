//! Soil and nutrient passthroughs

use super::{CalculatorContext, IndicatorResult};
use crate::indicators::registry::CARBON_SEQUESTRATION;

/// Crop-weighted series of a per-crop raw indicator, unchanged otherwise
fn passthrough(ctx: &CalculatorContext<'_>, code: &str) -> IndicatorResult {
    ctx.yearly(|year| ctx.combine_crops(|crop| ctx.scenario.value(code, crop, year)))
}

/// t C/ha/yr
pub fn calculate_carbon_sequestration(ctx: &CalculatorContext<'_>) -> IndicatorResult {
    passthrough(ctx, CARBON_SEQUESTRATION)
}

/// Uptake over applied nutrient, for the nitrogen or phosphorus series
pub fn calculate_fertilizer_use_efficiency(
    ctx: &CalculatorContext<'_>,
    code: &'static str,
) -> IndicatorResult {
    passthrough(ctx, code)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::indicators::registry::NITROGEN_USE_EFFICIENCY;
    use crate::variables::VariableStore;
    use approx::assert_relative_eq;

    #[test]
    fn test_carbon_weighted_by_share() {
        let scenario = series(&[
            (CARBON_SEQUESTRATION, "WHEAT", &[(2001, 1.0), (2002, 2.0)]),
            (CARBON_SEQUESTRATION, "MAIZE", &[(2001, 3.0)]),
        ]);
        let store = VariableStore::new();
        let variables = resolver(&store);
        let w = weights(&[("WHEAT", 0.75), ("MAIZE", 0.25)]);
        let ctx = context(&scenario, &scenario, &w, &variables, &[2001, 2002]);

        let result = calculate_carbon_sequestration(&ctx);
        assert_relative_eq!(result.series[&2001].unwrap(), 1.5);
        // maize missing in 2002; wheat alone
        assert_relative_eq!(result.series[&2002].unwrap(), 2.0);
    }

    #[test]
    fn test_fertilizer_efficiency_reads_requested_nutrient() {
        let scenario = series(&[(NITROGEN_USE_EFFICIENCY, "WHEAT", &[(2001, 0.6)])]);
        let store = VariableStore::new();
        let variables = resolver(&store);
        let w = weights(&[("WHEAT", 1.0)]);
        let ctx = context(&scenario, &scenario, &w, &variables, &[2001]);

        let n = calculate_fertilizer_use_efficiency(&ctx, NITROGEN_USE_EFFICIENCY);
        assert_relative_eq!(n.scalar.unwrap(), 0.6);

        let p = calculate_fertilizer_use_efficiency(&ctx, "phosphorus_use_efficiency");
        assert_eq!(p.scalar, None);
    }
}
