//! Indicator aggregation pipeline
//!
//! Raw monthly rows → one value per (month, sub-basin, crop) → one value
//! per (sub-basin, crop, year).
//!
//! - `monthly`: value-expression evaluation over rows sharing a month key
//! - `yearly`: reduction of monthly values by the indicator's yearly mode

pub mod monthly;
pub mod yearly;

pub use monthly::{evaluate_month, row_value};
pub use yearly::reduce_year;

use crate::data::{MonthlyObservation, RunId, SubbasinId};
use crate::indicators::{Grain, IndicatorDefinition};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Derived value keyed by (run, indicator, sub-basin, crop, year)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyValue {
    pub run: RunId,
    pub indicator: &'static str,
    pub subbasin: SubbasinId,
    pub crop: Option<String>,
    pub year: i32,
    /// 0/1 for boolean indicators; `None` when no month had a value
    pub value: Option<f64>,
}

type MonthKey<'a> = (SubbasinId, Option<&'a str>, i32, u8);
type YearKey<'a> = (SubbasinId, Option<&'a str>, i32);

/// Yearly values for one indicator over one run's rows
///
/// Crop-grain indicators ignore rows without a crop; sub-basin-grain
/// indicators ignore the crop column entirely. `crop_filter` restricts
/// crop-grain rows to the listed crops.
pub fn yearly_values(
    run: RunId,
    def: &IndicatorDefinition,
    rows: &[MonthlyObservation],
    crop_filter: Option<&[String]>,
) -> Vec<YearlyValue> {
    let mut by_month: BTreeMap<MonthKey<'_>, Vec<&MonthlyObservation>> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.run == run) {
        let crop = match def.grain {
            Grain::Subbasin => None,
            Grain::SubbasinCrop => {
                let Some(crop) = row.crop.as_deref() else {
                    continue;
                };
                if let Some(filter) = crop_filter {
                    if !filter.iter().any(|c| c == crop) {
                        continue;
                    }
                }
                Some(crop)
            }
        };
        by_month
            .entry((row.subbasin, crop, row.year, row.month))
            .or_default()
            .push(row);
    }

    let mut by_year: BTreeMap<YearKey<'_>, SmallVec<[Option<f64>; 12]>> = BTreeMap::new();
    for ((subbasin, crop, year, _month), month_rows) in &by_month {
        by_year
            .entry((*subbasin, *crop, *year))
            .or_default()
            .push(evaluate_month(def, month_rows));
    }

    let values: Vec<YearlyValue> = by_year
        .into_iter()
        .map(|((subbasin, crop, year), months)| YearlyValue {
            run,
            indicator: def.code,
            subbasin,
            crop: crop.map(str::to_string),
            year,
            value: reduce_year(def.yearly, &months),
        })
        .collect();

    tracing::debug!(
        "run {}: {} yearly values for '{}' from {} month keys",
        run,
        values.len(),
        def.code,
        by_month.len()
    );
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::definition_for;
    use approx::assert_relative_eq;

    fn yield_row(sub: SubbasinId, crop: &str, year: i32, month: u8, v: f64) -> MonthlyObservation {
        MonthlyObservation::new(1, sub, Some(crop), year, month).with_field("yield_t_ha", v)
    }

    #[test]
    fn test_sum_of_months_per_unit_and_year() {
        let def = definition_for("crop_yield").unwrap();
        let rows = vec![
            yield_row(1, "WHEAT", 2001, 6, 1.0),
            yield_row(1, "WHEAT", 2001, 7, 2.0),
            yield_row(1, "WHEAT", 2002, 7, 5.0),
            yield_row(2, "WHEAT", 2001, 7, 4.0),
            yield_row(1, "MAIZE", 2001, 9, 7.0),
        ];
        let values = yearly_values(1, def, &rows, None);
        assert_eq!(values.len(), 4);

        let wheat_1_2001 = values
            .iter()
            .find(|v| v.subbasin == 1 && v.crop.as_deref() == Some("WHEAT") && v.year == 2001)
            .unwrap();
        assert_relative_eq!(wheat_1_2001.value.unwrap(), 3.0);
    }

    #[test]
    fn test_crop_filter_and_missing_crop() {
        let def = definition_for("crop_yield").unwrap();
        let mut rows = vec![
            yield_row(1, "WHEAT", 2001, 6, 1.0),
            yield_row(1, "MAIZE", 2001, 6, 2.0),
        ];
        rows.push(MonthlyObservation::new(1, 1, None, 2001, 6).with_field("yield_t_ha", 9.0));

        let filter = vec!["MAIZE".to_string()];
        let values = yearly_values(1, def, &rows, Some(&filter));
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].crop.as_deref(), Some("MAIZE"));
    }

    #[test]
    fn test_all_missing_months_yield_none() {
        let def = definition_for("nitrogen_use_efficiency").unwrap();
        let rows = vec![MonthlyObservation::new(1, 1, Some("WHEAT"), 2001, 3)
            .with_field("n_uptake_kg_ha", 4.0)
            .with_field("n_applied_kg_ha", 0.0)];
        let values = yearly_values(1, def, &rows, None);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, None);
    }

    #[test]
    fn test_majority_vote_from_monthly_flags() {
        let def = definition_for("high_flow").unwrap();
        let flows = [80.0, 80.0, 80.0, 80.0, 80.0, 80.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let rows: Vec<MonthlyObservation> = flows
            .iter()
            .enumerate()
            .map(|(m, f)| {
                MonthlyObservation::new(1, 3, Some("ignored"), 2001, m as u8 + 1)
                    .with_field("flow_out_cms", *f)
            })
            .collect();
        let values = yearly_values(1, def, &rows, None);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].crop, None);
        assert_eq!(values[0].value, Some(0.0));
    }
}
