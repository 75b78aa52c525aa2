//! Pipeline Integration Tests
//!
//! Drives the public API from monthly rows to weighted totals, checking the
//! aggregation properties and the two-run WHEAT scenarios end to end.

use approx::assert_relative_eq;
use scenario_scorer::aggregation::yearly_values;
use scenario_scorer::area::{crop_weights, overall_series, CropAreas, CropKey};
use scenario_scorer::indicators::{definition_for, SourceKind};
use scenario_scorer::metrics::bcr::{crop_bcr, CropEconomics};
use scenario_scorer::variables::keys;
use scenario_scorer::{
    AreaRecord, Direction, McIndicator, MonthlyObservation, ObservationSet, Preset, PresetItem,
    RunId, ScenarioScorer, ScoringError, ScoringRequest, VariableStore, WarningKind, Warnings,
};

const BASELINE: RunId = 1;
const SCENARIO: RunId = 2;

fn wheat_row(run: RunId, subbasin: u32, year: i32, month: u8) -> MonthlyObservation {
    MonthlyObservation::new(run, subbasin, Some("WHEAT"), year, month)
}

fn request(runs: &[RunId], items: &[(&str, f64, Direction)]) -> ScoringRequest {
    ScoringRequest {
        study_area: "lowlands".into(),
        runs: runs.to_vec(),
        baseline_run: Some(BASELINE),
        crop_filter: None,
        preset: Preset {
            study_area: "lowlands".into(),
            items: items
                .iter()
                .map(|(code, weight, direction)| PresetItem {
                    indicator: code.to_string(),
                    weight: *weight,
                    direction: *direction,
                    enabled: true,
                })
                .collect(),
        },
    }
}

/// Baseline 3.0 t/ha, scenario 3.6 t/ha, one year, one sub-basin
fn wheat_scorer(variables: VariableStore) -> ScenarioScorer {
    let mut observations = ObservationSet::new();
    for (run, yield_t_ha) in [(BASELINE, 3.0), (SCENARIO, 3.6)] {
        observations.push(
            SourceKind::Hru,
            wheat_row(run, 1, 2001, 6)
                .with_field("yield_t_ha", yield_t_ha)
                .with_field("irr_mm", 250.0),
        );
    }
    let areas = [BASELINE, SCENARIO]
        .iter()
        .map(|run| AreaRecord {
            run: *run,
            subbasin: 1,
            crop: "WHEAT".into(),
            area_ha: 40.0,
        })
        .collect();
    ScenarioScorer::new(observations, areas, variables)
}

fn wheat_variables() -> VariableStore {
    VariableStore::new()
        .set(keys::CROP_PRICE, Some("WHEAT"), None, 200.0)
        .set(keys::DISCOUNT_RATE, None, None, 0.0)
        .set(keys::ECONOMIC_LIFE_YEARS, None, None, 1.0)
        .set(keys::ANNUAL_OM_COST, None, None, 0.0)
        .set(keys::INVESTMENT_COST, None, None, 0.0)
        .set("cost_seed", Some("WHEAT"), None, 80.0)
}

#[test]
fn test_sum_of_months_ignores_null_months() {
    let def = definition_for("crop_yield").unwrap();
    let mut rows: Vec<MonthlyObservation> = (1..=12)
        .map(|m| wheat_row(1, 1, 2001, m).with_field("yield_t_ha", 0.25))
        .collect();
    rows[3].fields.clear();
    rows.extend((1..=12).map(|m| wheat_row(1, 1, 2002, m)));

    let values = yearly_values(1, def, &rows, None);
    assert_eq!(values.len(), 2);
    assert_relative_eq!(values[0].value.unwrap(), 2.75);
    assert_eq!(values[1].value, None);
}

#[test]
fn test_majority_vote_tie_is_false() {
    let def = definition_for("water_stress").unwrap();
    let months = |stressed: u8| -> Vec<MonthlyObservation> {
        (1..=12)
            .map(|m| {
                let days = if m <= stressed { 10.0 } else { 0.0 };
                wheat_row(1, 1, 2001, m).with_field("w_stress_days", days)
            })
            .collect()
    };

    let tie = yearly_values(1, def, &months(6), None);
    assert_eq!(tie[0].value, Some(0.0));

    let majority = yearly_values(1, def, &months(7), None);
    assert_eq!(majority[0].value, Some(1.0));
}

#[test]
fn test_single_contributor_ignores_its_area() {
    let def = definition_for("crop_yield").unwrap();
    let rows = vec![
        wheat_row(1, 1, 2001, 1).with_field("yield_t_ha", 4.2),
        wheat_row(1, 2, 2001, 1),
    ];
    let areas = CropAreas::from_records(
        1,
        &[
            AreaRecord { run: 1, subbasin: 1, crop: "WHEAT".into(), area_ha: 3.0 },
            AreaRecord { run: 1, subbasin: 2, crop: "WHEAT".into(), area_ha: 500.0 },
        ],
    );

    let values = yearly_values(1, def, &rows, None);
    let series = overall_series(&values, &areas, None);
    assert_relative_eq!(series[&CropKey::crop("WHEAT")][&2001].unwrap(), 4.2);
}

#[test]
fn test_crop_weights_sum_to_one() {
    let units = [("WHEAT", 1, 12.5), ("MAIZE", 1, 7.0), ("RICE", 2, 30.5), ("BEAN", 2, 0.0)];
    let records: Vec<AreaRecord> = units
        .iter()
        .map(|(crop, subbasin, area)| AreaRecord {
            run: 1,
            subbasin: *subbasin,
            crop: crop.to_string(),
            area_ha: *area,
        })
        .collect();
    let areas = CropAreas::from_records(1, &records);
    let mut warnings = Warnings::new();

    let weights = crop_weights(1, &areas, None, &Default::default(), &mut warnings);
    assert_relative_eq!(weights.total(), 1.0, epsilon = 1e-9);
    assert_eq!(weights.share("BEAN"), 0.0);
    assert!(warnings.is_empty());

    // no areas: equal shares over the crops in the yield series
    let def = definition_for("crop_yield").unwrap();
    let rows = vec![
        wheat_row(1, 1, 2001, 1).with_field("yield_t_ha", 3.0),
        MonthlyObservation::new(1, 1, Some("MAIZE"), 2001, 1).with_field("yield_t_ha", 5.0),
        MonthlyObservation::new(1, 1, Some("RICE"), 2001, 1).with_field("yield_t_ha", 4.0),
    ];
    let empty = CropAreas::from_records(1, &[]);
    let yield_series = overall_series(&yearly_values(1, def, &rows, None), &empty, None);
    let fallback = crop_weights(1, &empty, None, &yield_series, &mut warnings);
    assert_relative_eq!(fallback.total(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(fallback.share("MAIZE"), 1.0 / 3.0, epsilon = 1e-9);
    assert!(warnings.has_kind(WarningKind::DegradedCropWeights));
}

#[test]
fn test_bcr_sums_before_dividing() {
    let scenario = [(2001, Some(4.0)), (2002, Some(4.0))].into_iter().collect();
    let baseline = [(2001, Some(3.0)), (2002, Some(3.0))].into_iter().collect();
    let econ = CropEconomics {
        price: 100.0,
        cost_delta: -50.0,
        investment: 150.0,
        annual_om: 0.0,
        life_years: 2,
        discount_rate: 0.0,
    };
    let result = crop_bcr(&scenario, &baseline, &econ);

    // year denominators 100 and -50 have opposite signs
    let per_year: Vec<f64> = result.by_year.values().filter_map(|a| a.finalize()).collect();
    let mean_of_ratios = per_year.iter().sum::<f64>() / per_year.len() as f64;
    let summed = result.total.finalize().unwrap();
    assert_relative_eq!(summed, 4.0);
    assert!((summed - mean_of_ratios).abs() > 1e-6);
}

#[test]
fn test_zero_cost_bcr_is_null_not_an_error() {
    let scorer = wheat_scorer(wheat_variables());
    let req = request(
        &[BASELINE, SCENARIO],
        &[("benefit_cost_ratio", 1.0, Direction::HigherIsBetter)],
    );
    let result = scorer.score(&req).unwrap();

    let bcr = result.raw(SCENARIO, McIndicator::BenefitCostRatio).unwrap();
    assert_eq!(bcr.series[&2001], None);
    assert_eq!(bcr.scalar, None);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::ZeroDenominator && w.run == Some(SCENARIO)));
}

#[test]
fn test_investment_gives_bcr_of_1_2() {
    let variables = wheat_variables().set(keys::INVESTMENT_COST, None, Some(SCENARIO), 100.0);
    let scorer = wheat_scorer(variables);
    let req = request(
        &[BASELINE, SCENARIO],
        &[("benefit_cost_ratio", 1.0, Direction::HigherIsBetter)],
    );
    let result = scorer.score(&req).unwrap();

    let bcr = result.raw(SCENARIO, McIndicator::BenefitCostRatio).unwrap();
    assert_relative_eq!(bcr.series[&2001].unwrap(), 1.2, epsilon = 1e-9);
    assert_relative_eq!(bcr.scalar.unwrap(), 1.2, epsilon = 1e-9);
}

#[test]
fn test_run_identical_to_baseline_totals_half() {
    let mut observations = ObservationSet::new();
    for run in [BASELINE, SCENARIO, 3] {
        let yield_t_ha = if run == 3 { 4.5 } else { 3.0 };
        for year in [2001, 2002] {
            observations.push(
                SourceKind::Hru,
                wheat_row(run, 1, year, 5)
                    .with_field("yield_t_ha", yield_t_ha)
                    .with_field("irr_mm", 120.0)
                    .with_field("soc_change_kg_ha", 400.0),
            );
        }
    }
    let scorer = ScenarioScorer::new(observations, Vec::new(), wheat_variables());
    let req = request(
        &[BASELINE, SCENARIO, 3],
        &[
            ("net_farm_income", 2.0, Direction::HigherIsBetter),
            ("water_use_intensity", 1.0, Direction::LowerIsBetter),
            ("carbon_sequestration", 1.0, Direction::HigherIsBetter),
        ],
    );
    let result = scorer.score(&req).unwrap();

    for indicator in ["net_farm_income", "water_use_intensity", "carbon_sequestration"] {
        assert_relative_eq!(result.normalized_scalar[&SCENARIO][indicator].unwrap(), 0.5);
    }
    assert_relative_eq!(result.total(SCENARIO).unwrap(), 0.5, epsilon = 1e-12);
    assert_relative_eq!(result.total(BASELINE).unwrap(), 0.5, epsilon = 1e-12);
    assert!(result.total(3).unwrap() > 0.5);

    // equal water use in every run scores 0.5 in every year
    for run in [BASELINE, SCENARIO, 3] {
        for score in result.normalized_by_year[&run]["water_use_intensity"].values() {
            assert_relative_eq!(score.unwrap(), 0.5);
        }
    }
    // no area data for any run
    assert!(result
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::DegradedCropWeights));
}

#[test]
fn test_identical_runs_total_half_with_undefined_bcr() {
    let mut observations = ObservationSet::new();
    for run in [BASELINE, SCENARIO] {
        observations.push(
            SourceKind::Hru,
            wheat_row(run, 1, 2001, 6)
                .with_field("yield_t_ha", 3.0)
                .with_field("irr_mm", 250.0),
        );
    }
    let scorer = ScenarioScorer::new(observations, Vec::new(), wheat_variables());
    let req = request(
        &[BASELINE, SCENARIO],
        &[
            ("benefit_cost_ratio", 1.0, Direction::HigherIsBetter),
            ("water_use_intensity", 1.0, Direction::LowerIsBetter),
        ],
    );
    let result = scorer.score(&req).unwrap();

    // no yield gain and no cost change: 0/0 on both runs
    assert_eq!(result.raw(SCENARIO, McIndicator::BenefitCostRatio).unwrap().scalar, None);
    assert_relative_eq!(
        result.normalized_scalar[&SCENARIO]["benefit_cost_ratio"].unwrap(),
        0.5
    );
    for run in [BASELINE, SCENARIO] {
        assert_relative_eq!(result.total(run).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.weighted_totals_by_year[&run][&2001], 0.5, epsilon = 1e-12);
    }
}

#[test]
fn test_zero_weights_withhold_totals() {
    let scorer = wheat_scorer(wheat_variables());
    let req = request(
        &[BASELINE, SCENARIO],
        &[
            ("benefit_cost_ratio", 0.0, Direction::HigherIsBetter),
            ("labour_use", 0.0, Direction::LowerIsBetter),
        ],
    );
    let result = scorer.score(&req).unwrap();

    assert_eq!(result.scoring_error, Some(ScoringError::AllWeightsZero));
    assert!(result.weighted_totals.is_empty());
    assert!(result.normalized_by_year.is_empty());
    assert!(result.raw(SCENARIO, McIndicator::BenefitCostRatio).is_some());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["scoring_error"]["error"], "all_weights_zero");
}

#[test]
fn test_unknown_indicator_is_fatal() {
    assert_eq!(
        definition_for("evapotranspiration").unwrap_err(),
        ScoringError::UnknownIndicator {
            code: "evapotranspiration".into()
        }
    );

    let scorer = wheat_scorer(wheat_variables());
    let req = request(
        &[BASELINE, SCENARIO],
        &[
            ("benefit_cost_ratio", 1.0, Direction::HigherIsBetter),
            ("biodiversity", 1.0, Direction::HigherIsBetter),
        ],
    );
    assert_eq!(
        scorer.score(&req).unwrap_err(),
        ScoringError::UnknownMultiCriteriaIndicator {
            code: "biodiversity".into()
        }
    );
}
