//! Normalization Utilities
//!
//! Turns raw indicator values into [0, 1] scores, two ways:
//!
//! - **Scalar**: each run's scalar against the baseline run's scalar.
//!   `delta = (v − b) / |b|`, clamped to [−1, 1], score `0.5 + 0.5·delta`.
//!   A zero baseline is scaled by the largest deviation instead.
//! - **Per year**: min-max across runs, separately for every year.
//!
//! Lower-is-better indicators are inverted (`1 − score`) in both regimes.
//! A value that is missing on both sides of a comparison (the run and the
//! baseline, or every run in a year) scores a neutral 0.5.

use crate::area::YearSeries;
use crate::config::Direction;
use crate::data::RunId;
use crate::error::{Result, ScoringError};
use crate::warnings::{Warning, WarningKind, Warnings};
use std::collections::{BTreeMap, BTreeSet};

/// Spreads smaller than this count as zero
const EPSILON: f64 = 1e-9;

/// One value per run, `None` when the run has no value
pub type RunValues = BTreeMap<RunId, Option<f64>>;

fn orient(score: f64, direction: Direction) -> f64 {
    let score = match direction {
        Direction::HigherIsBetter => score,
        Direction::LowerIsBetter => 1.0 - score,
    };
    score.clamp(0.0, 1.0)
}

/// Rescale weights of the enabled indicators to sum to 1
///
/// Negative or non-finite weights are rejected; an all-zero set is
/// reported as [`ScoringError::AllWeightsZero`].
pub fn normalized_weights(items: &[(&str, f64)]) -> Result<Vec<f64>> {
    for (code, weight) in items {
        if !weight.is_finite() || *weight < 0.0 {
            return Err(ScoringError::InvalidWeight {
                code: code.to_string(),
                weight: *weight,
            });
        }
    }
    let total: f64 = items.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Err(ScoringError::AllWeightsZero);
    }
    Ok(items.iter().map(|(_, w)| w / total).collect())
}

/// Baseline-anchored scalar scores for one indicator
///
/// A missing baseline scalar is scored as a zero baseline and reported.
/// Runs that are missing a value alongside the baseline score 0.5.
pub fn scalar_scores(
    indicator: &str,
    raw: &RunValues,
    baseline_run: RunId,
    direction: Direction,
    warnings: &mut Warnings,
) -> RunValues {
    let baseline_value = raw.get(&baseline_run).copied().flatten();
    let baseline = match baseline_value {
        Some(b) => b,
        None => {
            warnings.push(
                Warning::new(
                    WarningKind::MissingBaselineScalar,
                    format!(
                        "baseline run {} has no value for {}; scoring against 0",
                        baseline_run, indicator
                    ),
                )
                .run(baseline_run)
                .indicator(indicator),
            );
            0.0
        }
    };

    let scale = if baseline.abs() > EPSILON {
        baseline.abs()
    } else {
        zero_baseline_scale(raw.values().flatten().copied(), baseline)
    };

    raw.iter()
        .map(|(run, value)| {
            let score = match (value, baseline_value) {
                (Some(v), _) => {
                    let delta = ((v - baseline) / scale).clamp(-1.0, 1.0);
                    Some(orient(0.5 + 0.5 * delta, direction))
                }
                (None, None) => Some(0.5),
                (None, Some(_)) => None,
            };
            (*run, score)
        })
        .collect()
}

/// Largest deviation from the baseline, else largest magnitude, else 1
fn zero_baseline_scale(values: impl Iterator<Item = f64> + Clone, baseline: f64) -> f64 {
    let max_deviation = values
        .clone()
        .map(|v| (v - baseline).abs())
        .fold(0.0_f64, f64::max);
    if max_deviation > EPSILON {
        return max_deviation;
    }
    let max_magnitude = values.map(f64::abs).fold(0.0_f64, f64::max);
    if max_magnitude > EPSILON {
        max_magnitude
    } else {
        1.0
    }
}

/// Cross-run min-max scores for one indicator, year by year
///
/// Years are the union over all runs. A year where every run has the same
/// value, or none has a value, scores 0.5 for all of them.
pub fn per_year_scores(
    raw: &BTreeMap<RunId, YearSeries>,
    direction: Direction,
) -> BTreeMap<RunId, YearSeries> {
    let years: BTreeSet<i32> = raw.values().flat_map(|s| s.keys().copied()).collect();

    let mut bounds: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for year in &years {
        let values = raw.values().filter_map(|s| s.get(year).copied().flatten());
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if min.is_finite() {
            bounds.insert(*year, (min, max));
        }
    }

    raw.iter()
        .map(|(run, series)| {
            let scored = years
                .iter()
                .map(|year| {
                    let score = match (series.get(year).copied().flatten(), bounds.get(year)) {
                        (_, None) => Some(0.5),
                        (Some(v), Some(&(min, max))) => {
                            let score = if max - min > EPSILON {
                                (v - min) / (max - min)
                            } else {
                                0.5
                            };
                            Some(orient(score, direction))
                        }
                        _ => None,
                    };
                    (*year, score)
                })
                .collect();
            (*run, scored)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run_values(points: &[(RunId, Option<f64>)]) -> RunValues {
        points.iter().copied().collect()
    }

    #[test]
    fn test_identical_to_baseline_scores_half() {
        let raw = run_values(&[(1, Some(2.5)), (2, Some(2.5))]);
        let mut warnings = Warnings::new();
        for direction in [Direction::HigherIsBetter, Direction::LowerIsBetter] {
            let scores = scalar_scores("x", &raw, 1, direction, &mut warnings);
            assert_relative_eq!(scores[&1].unwrap(), 0.5);
            assert_relative_eq!(scores[&2].unwrap(), 0.5);
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_scalar_delta_clamped_and_inverted() {
        let raw = run_values(&[(1, Some(10.0)), (2, Some(15.0)), (3, Some(40.0)), (4, None)]);
        let mut warnings = Warnings::new();

        let higher = scalar_scores("x", &raw, 1, Direction::HigherIsBetter, &mut warnings);
        assert_relative_eq!(higher[&2].unwrap(), 0.75);
        assert_relative_eq!(higher[&3].unwrap(), 1.0);
        assert_eq!(higher[&4], None);

        let lower = scalar_scores("x", &raw, 1, Direction::LowerIsBetter, &mut warnings);
        assert_relative_eq!(lower[&2].unwrap(), 0.25);
        assert_relative_eq!(lower[&3].unwrap(), 0.0);
    }

    #[test]
    fn test_negative_baseline_uses_magnitude() {
        let raw = run_values(&[(1, Some(-4.0)), (2, Some(-2.0))]);
        let mut warnings = Warnings::new();
        let scores = scalar_scores("x", &raw, 1, Direction::HigherIsBetter, &mut warnings);
        assert_relative_eq!(scores[&2].unwrap(), 0.75);
    }

    #[test]
    fn test_zero_baseline_scaled_by_largest_deviation() {
        let raw = run_values(&[(1, Some(0.0)), (2, Some(5.0)), (3, Some(-2.5))]);
        let mut warnings = Warnings::new();
        let scores = scalar_scores("x", &raw, 1, Direction::HigherIsBetter, &mut warnings);
        assert_relative_eq!(scores[&1].unwrap(), 0.5);
        assert_relative_eq!(scores[&2].unwrap(), 1.0);
        assert_relative_eq!(scores[&3].unwrap(), 0.25);

        let all_zero = run_values(&[(1, Some(0.0)), (2, Some(0.0))]);
        let scores = scalar_scores("x", &all_zero, 1, Direction::HigherIsBetter, &mut warnings);
        assert_relative_eq!(scores[&2].unwrap(), 0.5);
    }

    #[test]
    fn test_missing_baseline_is_reported() {
        let raw = run_values(&[(1, None), (2, Some(4.0))]);
        let mut warnings = Warnings::new();
        let scores = scalar_scores("x", &raw, 1, Direction::HigherIsBetter, &mut warnings);
        assert_relative_eq!(scores[&2].unwrap(), 1.0);
        // nothing to compare on the baseline itself
        assert_relative_eq!(scores[&1].unwrap(), 0.5);
        assert!(warnings.has_kind(WarningKind::MissingBaselineScalar));
    }

    #[test]
    fn test_null_on_both_sides_is_neutral() {
        let raw = run_values(&[(1, None), (2, None), (3, Some(1.5))]);
        let mut warnings = Warnings::new();
        for direction in [Direction::HigherIsBetter, Direction::LowerIsBetter] {
            let scores = scalar_scores("x", &raw, 1, direction, &mut warnings);
            assert_relative_eq!(scores[&1].unwrap(), 0.5);
            assert_relative_eq!(scores[&2].unwrap(), 0.5);
        }

        // run missing a value the baseline has stays unscored
        let raw = run_values(&[(1, Some(2.0)), (2, None)]);
        let scores = scalar_scores("x", &raw, 1, Direction::HigherIsBetter, &mut warnings);
        assert_eq!(scores[&2], None);
    }

    #[test]
    fn test_per_year_min_max() {
        let mut raw: BTreeMap<RunId, YearSeries> = BTreeMap::new();
        raw.insert(1, [(2001, Some(1.0)), (2002, Some(7.0))].into_iter().collect());
        raw.insert(2, [(2001, Some(3.0)), (2002, Some(7.0))].into_iter().collect());
        raw.insert(3, [(2001, Some(2.0)), (2002, None)].into_iter().collect());

        let scores = per_year_scores(&raw, Direction::HigherIsBetter);
        assert_relative_eq!(scores[&1][&2001].unwrap(), 0.0);
        assert_relative_eq!(scores[&2][&2001].unwrap(), 1.0);
        assert_relative_eq!(scores[&3][&2001].unwrap(), 0.5);
        // equal values in 2002
        assert_relative_eq!(scores[&1][&2002].unwrap(), 0.5);
        assert_relative_eq!(scores[&2][&2002].unwrap(), 0.5);
        assert_eq!(scores[&3][&2002], None);

        let inverted = per_year_scores(&raw, Direction::LowerIsBetter);
        assert_relative_eq!(inverted[&1][&2001].unwrap(), 1.0);
    }

    #[test]
    fn test_year_missing_from_one_run_is_still_scored() {
        let mut raw: BTreeMap<RunId, YearSeries> = BTreeMap::new();
        raw.insert(1, [(2001, Some(1.0))].into_iter().collect());
        raw.insert(2, [(2001, Some(2.0)), (2002, Some(5.0))].into_iter().collect());

        let scores = per_year_scores(&raw, Direction::HigherIsBetter);
        assert_eq!(scores[&1][&2002], None);
        assert_relative_eq!(scores[&2][&2002].unwrap(), 0.5);
    }

    #[test]
    fn test_year_without_any_value_is_neutral() {
        let mut raw: BTreeMap<RunId, YearSeries> = BTreeMap::new();
        raw.insert(1, [(2001, None)].into_iter().collect());
        raw.insert(2, [(2001, None)].into_iter().collect());

        let scores = per_year_scores(&raw, Direction::LowerIsBetter);
        assert_relative_eq!(scores[&1][&2001].unwrap(), 0.5);
        assert_relative_eq!(scores[&2][&2001].unwrap(), 0.5);
    }

    #[test]
    fn test_weights_rescaled() {
        let w = normalized_weights(&[("a", 2.0), ("b", 6.0)]).unwrap();
        assert_relative_eq!(w[0], 0.25);
        assert_relative_eq!(w[1], 0.75);

        assert_eq!(
            normalized_weights(&[("a", 0.0), ("b", 0.0)]),
            Err(ScoringError::AllWeightsZero)
        );
        assert!(matches!(
            normalized_weights(&[("a", -1.0)]),
            Err(ScoringError::InvalidWeight { .. })
        ));
    }
}
