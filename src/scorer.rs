//! Scenario Scorer - main coordinator for scoring scenario runs
//!
//! Runs one request end to end:
//!
//! 1. Validate the preset and rescale its weights
//! 2. Resolve the raw indicators the enabled indicators need
//! 3. Per run: yearly values → area-weighted series → crop weights
//! 4. Per run and indicator: calculator result
//! 5. Scalar and per-year normalization, weighted totals
//!
//! A single request is computed sequentially and owns its memo tables.
//! [`ScenarioScorer::score_batch`] spreads independent requests over Rayon.

use crate::aggregation::yearly_values;
use crate::area::{crop_weights, overall_series, CropAreas, CropWeights, OverallSeries, YearSeries};
use crate::config::{Direction, RequestFile, ScoringRequest};
use crate::data::{AreaRecord, ObservationSet, RunId, AREA_FIELD};
use crate::dependencies::{required_raw_indicators, McIndicator};
use crate::error::{Result, ScoringError};
use crate::indicators::{definition_for, SourceKind};
use crate::indicators::registry::CROP_YIELD;
use crate::metrics::{self, CalculatorContext, IndicatorResult, RunSeries};
use crate::utils::normalization::{normalized_weights, per_year_scores, scalar_scores, RunValues};
use crate::variables::{VariableResolver, VariableStore};
use crate::warnings::{Warning, Warnings};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Immutable inputs shared by every request
pub struct ScenarioScorer {
    observations: ObservationSet,
    areas: Vec<AreaRecord>,
    variables: VariableStore,
}

/// Enabled indicator with its rescaled weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedIndicator {
    pub indicator: McIndicator,
    pub weight: f64,
    pub direction: Direction,
}

/// Everything computed for one request
#[derive(Debug, Clone, Serialize)]
pub struct ComputationResult {
    pub study_area: String,
    pub runs: Vec<RunId>,
    pub baseline_run: RunId,
    /// Run scalar scores are anchored on
    pub normalization_anchor: RunId,
    /// Empty when weights are invalid for scoring
    pub indicators: Vec<WeightedIndicator>,
    pub crop_weights: BTreeMap<RunId, CropWeights>,
    pub raw_by_run: BTreeMap<RunId, BTreeMap<&'static str, IndicatorResult>>,
    pub normalized_scalar: BTreeMap<RunId, BTreeMap<&'static str, Option<f64>>>,
    pub normalized_by_year: BTreeMap<RunId, BTreeMap<&'static str, YearSeries>>,
    pub weighted_totals: BTreeMap<RunId, f64>,
    pub weighted_totals_by_year: BTreeMap<RunId, BTreeMap<i32, f64>>,
    pub warnings: Vec<Warning>,
    /// Set when raw results are valid but scores are withheld
    pub scoring_error: Option<ScoringError>,
}

impl ComputationResult {
    pub fn raw(&self, run: RunId, indicator: McIndicator) -> Option<&IndicatorResult> {
        self.raw_by_run.get(&run)?.get(indicator.code())
    }

    pub fn total(&self, run: RunId) -> Option<f64> {
        self.weighted_totals.get(&run).copied()
    }
}

impl ScenarioScorer {
    pub fn new(observations: ObservationSet, areas: Vec<AreaRecord>, variables: VariableStore) -> Self {
        Self {
            observations,
            areas,
            variables,
        }
    }

    /// Build a scorer from a request file, reading its observation tables
    pub fn from_request_file(file: &RequestFile) -> anyhow::Result<Self> {
        let mut observations = ObservationSet::new();
        for obs in &file.observations {
            let n = observations.load_file(obs.source, &obs.path)?;
            tracing::info!("Loaded {} {:?} rows from {:?}", n, obs.source, obs.path);
        }
        Ok(Self::new(
            observations,
            file.areas.clone(),
            VariableStore::from_entries(file.variables.iter().cloned()),
        ))
    }

    /// Score one request
    ///
    /// # Errors
    /// Configuration errors (unknown indicator, empty preset, missing
    /// baseline, invalid weight, a run without yield observations) abort the
    /// request. All-zero weights do not: raw results come back with
    /// `scoring_error` set.
    pub fn score(&self, request: &ScoringRequest) -> Result<ComputationResult> {
        tracing::info!(
            "Scoring {} run(s) for '{}'",
            request.runs.len(),
            request.study_area
        );

        let baseline_run = request.baseline()?;
        let anchor = request.normalization_anchor()?;
        let enabled = enabled_indicators(request)?;

        let weight_pairs: Vec<(&str, f64)> = enabled
            .iter()
            .map(|(indicator, weight, _)| (indicator.code(), *weight))
            .collect();
        let (weights, scoring_error) = match normalized_weights(&weight_pairs) {
            Ok(w) => (Some(w), None),
            Err(ScoringError::AllWeightsZero) => (None, Some(ScoringError::AllWeightsZero)),
            Err(e) => return Err(e),
        };

        let indicators: Vec<McIndicator> = enabled.iter().map(|(i, _, _)| *i).collect();
        let required = required_raw_indicators(&indicators);
        let definitions = required
            .iter()
            .map(|code| definition_for(code))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Raw indicators required: {:?}", required);

        let filter = request.crop_filter();
        let mut warnings = Warnings::new();

        // The baseline is computed even when it is not scored
        let mut computed: Vec<RunId> = request.runs.clone();
        if !computed.contains(&baseline_run) {
            computed.push(baseline_run);
        }

        let yield_def = definition_for(CROP_YIELD)?;
        let mut series_by_run: BTreeMap<RunId, RunSeries> = BTreeMap::new();
        let mut weights_by_run: BTreeMap<RunId, CropWeights> = BTreeMap::new();
        for &run in &computed {
            if self.observations.rows(run, yield_def.source).is_empty() {
                return Err(ScoringError::NoObservations {
                    run,
                    indicator: CROP_YIELD.to_string(),
                });
            }

            let areas = self.crop_areas(run);
            let mut series = RunSeries::new();
            for def in &definitions {
                let rows = self.observations.rows(run, def.source);
                let values = yearly_values(run, def, rows, filter);
                series.insert(def.code, overall_series(&values, &areas, filter));
            }

            let empty = OverallSeries::new();
            let yield_series = series.get(CROP_YIELD).unwrap_or(&empty);
            let run_weights = crop_weights(run, &areas, filter, yield_series, &mut warnings);
            tracing::debug!("Run {}: crop weights {:?}", run, run_weights);

            weights_by_run.insert(run, run_weights);
            series_by_run.insert(run, series);
        }

        let resolver = VariableResolver::new(&self.variables, baseline_run);
        let mut raw_by_run: BTreeMap<RunId, BTreeMap<&'static str, IndicatorResult>> =
            BTreeMap::new();
        for &run in &request.runs {
            let (Some(scenario), Some(baseline), Some(run_weights)) = (
                series_by_run.get(&run),
                series_by_run.get(&baseline_run),
                weights_by_run.get(&run),
            ) else {
                continue;
            };

            let ctx = CalculatorContext {
                run,
                baseline_run,
                scenario,
                baseline,
                weights: run_weights,
                variables: &resolver,
                years: time_axis(scenario),
            };

            let results = indicators
                .iter()
                .map(|indicator| (indicator.code(), metrics::calculate(*indicator, &ctx, &mut warnings)))
                .collect();
            raw_by_run.insert(run, results);
        }
        warnings.extend(resolver.take_warnings());

        let mut result = ComputationResult {
            study_area: request.study_area.clone(),
            runs: request.runs.clone(),
            baseline_run,
            normalization_anchor: anchor,
            indicators: Vec::new(),
            crop_weights: request
                .runs
                .iter()
                .filter_map(|run| Some((*run, weights_by_run.get(run)?.clone())))
                .collect(),
            raw_by_run,
            normalized_scalar: BTreeMap::new(),
            normalized_by_year: BTreeMap::new(),
            weighted_totals: BTreeMap::new(),
            weighted_totals_by_year: BTreeMap::new(),
            warnings: Vec::new(),
            scoring_error,
        };

        match weights {
            Some(weights) => {
                result.indicators = enabled
                    .iter()
                    .zip(weights)
                    .map(|((indicator, _, direction), weight)| WeightedIndicator {
                        indicator: *indicator,
                        weight,
                        direction: *direction,
                    })
                    .collect();
                apply_scores(&mut result, &mut warnings);
            }
            None => tracing::warn!(
                "All weights zero for '{}'; returning raw results only",
                request.study_area
            ),
        }

        result.warnings = warnings.into_vec();
        tracing::info!(
            "Scored '{}' with {} warning(s)",
            request.study_area,
            result.warnings.len()
        );
        Ok(result)
    }

    /// Unit areas of a run
    ///
    /// Supplied area records win. A run without any falls back to the
    /// `area_ha` field of its HRU rows, largest value per unit.
    fn crop_areas(&self, run: RunId) -> CropAreas {
        let supplied = CropAreas::from_records(run, &self.areas);
        if !supplied.is_empty() {
            return supplied;
        }
        let rows = self.observations.rows(run, SourceKind::Hru);
        let derived = AreaRecord::from_observations(rows, AREA_FIELD);
        tracing::debug!("Run {}: {} area record(s) taken from HRU rows", run, derived.len());
        CropAreas::from_records(run, &derived)
    }

    /// Score independent requests in parallel
    pub fn score_batch(&self, requests: &[ScoringRequest]) -> Vec<Result<ComputationResult>> {
        requests.par_iter().map(|request| self.score(request)).collect()
    }
}

/// Enabled preset items as (indicator, weight, direction)
fn enabled_indicators(request: &ScoringRequest) -> Result<Vec<(McIndicator, f64, Direction)>> {
    let mut seen = BTreeSet::new();
    let mut enabled = Vec::new();
    for item in request.preset.enabled() {
        let indicator = McIndicator::from_code(&item.indicator)?;
        if seen.insert(indicator) {
            enabled.push((indicator, item.weight, item.direction));
        }
    }
    if enabled.is_empty() {
        return Err(ScoringError::EmptyPreset {
            study_area: request.preset.study_area.clone(),
        });
    }
    Ok(enabled)
}

/// Years of the run's yield series, over all crops
fn time_axis(series: &RunSeries) -> Vec<i32> {
    let years: BTreeSet<i32> = series
        .get(CROP_YIELD)
        .map(|s| s.values().flat_map(|y| y.keys().copied()).collect())
        .unwrap_or_default();
    years.into_iter().collect()
}

/// Normalize every enabled indicator both ways and sum weighted scores
///
/// Null scores add nothing to a total.
fn apply_scores(result: &mut ComputationResult, warnings: &mut Warnings) {
    let indicators = result.indicators.clone();
    for item in &indicators {
        let code = item.indicator.code();

        let scalars: RunValues = result
            .runs
            .iter()
            .map(|run| {
                let value = result
                    .raw_by_run
                    .get(run)
                    .and_then(|r| r.get(code))
                    .and_then(|r| r.scalar);
                (*run, value)
            })
            .collect();
        let scalar = scalar_scores(code, &scalars, result.normalization_anchor, item.direction, warnings);
        for (run, score) in scalar {
            result.normalized_scalar.entry(run).or_default().insert(code, score);
            let total = result.weighted_totals.entry(run).or_insert(0.0);
            if let Some(s) = score {
                *total += item.weight * s;
            }
        }

        let yearly: BTreeMap<RunId, YearSeries> = result
            .runs
            .iter()
            .map(|run| {
                let series = result
                    .raw_by_run
                    .get(run)
                    .and_then(|r| r.get(code))
                    .map(|r| r.series.clone())
                    .unwrap_or_default();
                (*run, series)
            })
            .collect();
        for (run, series) in per_year_scores(&yearly, item.direction) {
            let totals = result.weighted_totals_by_year.entry(run).or_default();
            for (year, score) in &series {
                let total = totals.entry(*year).or_insert(0.0);
                if let Some(s) = score {
                    *total += item.weight * s;
                }
            }
            result.normalized_by_year.entry(run).or_default().insert(code, series);
        }
    }
}
