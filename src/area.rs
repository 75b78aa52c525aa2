//! Crop-Area Weighting
//!
//! Land area per (sub-basin, crop) unit is used for two things only:
//! merging per-sub-basin yearly values into scenario-wide per-crop series,
//! and the crop shares that later combine crop-level results into one
//! scenario value. It never weights across crops inside one sub-basin.

use crate::aggregation::YearlyValue;
use crate::data::{AreaRecord, RunId, SubbasinId};
use crate::warnings::{Warning, WarningKind, Warnings};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Series key: a crop, or the whole sub-basin for sub-basin-grain indicators
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CropKey {
    Crop(String),
    AllCrops,
}

impl CropKey {
    pub fn crop(name: &str) -> Self {
        CropKey::Crop(name.to_string())
    }
}

impl fmt::Display for CropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropKey::Crop(c) => write!(f, "{}", c),
            CropKey::AllCrops => write!(f, "all crops"),
        }
    }
}

pub type YearSeries = BTreeMap<i32, Option<f64>>;
pub type OverallSeries = BTreeMap<CropKey, YearSeries>;

fn in_filter(crop: &str, crop_filter: Option<&[String]>) -> bool {
    crop_filter.map_or(true, |f| f.iter().any(|c| c == crop))
}

/// Hectares per (sub-basin, crop) unit for one run
#[derive(Debug, Clone, Default)]
pub struct CropAreas {
    units: BTreeMap<(SubbasinId, String), f64>,
}

impl CropAreas {
    /// Largest observed area per unit; negative records never raise it above 0
    pub fn from_records(run: RunId, records: &[AreaRecord]) -> Self {
        let mut units: BTreeMap<(SubbasinId, String), f64> = BTreeMap::new();
        for record in records.iter().filter(|r| r.run == run) {
            let entry = units
                .entry((record.subbasin, record.crop.clone()))
                .or_insert(0.0);
            if record.area_ha > *entry {
                *entry = record.area_ha;
            }
        }
        Self { units }
    }

    pub fn is_empty(&self) -> bool {
        self.units.values().all(|a| *a <= 0.0)
    }

    pub fn area(&self, subbasin: SubbasinId, crop: &str) -> f64 {
        self.units
            .get(&(subbasin, crop.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Total crop area of one sub-basin, restricted to the filter
    pub fn subbasin_total(&self, subbasin: SubbasinId, crop_filter: Option<&[String]>) -> f64 {
        self.units
            .iter()
            .filter(|((sub, crop), _)| *sub == subbasin && in_filter(crop, crop_filter))
            .map(|(_, area)| *area)
            .sum()
    }

    /// Total area per crop across sub-basins
    pub fn crop_totals(&self, crop_filter: Option<&[String]>) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for ((_, crop), area) in &self.units {
            if in_filter(crop, crop_filter) {
                *totals.entry(crop.clone()).or_insert(0.0) += *area;
            }
        }
        totals
    }
}

/// Area-weighted merge of per-sub-basin yearly values
///
/// For each (crop, year): Σ(area·value) / Σ(area) over sub-basins with a
/// value and positive area. A year with entries but no contributor is `None`.
/// Without any area data for the run, sub-basins weigh equally.
pub fn overall_series(
    values: &[YearlyValue],
    areas: &CropAreas,
    crop_filter: Option<&[String]>,
) -> OverallSeries {
    let unweighted = areas.is_empty();
    if unweighted {
        tracing::debug!("No area data; sub-basins weigh equally");
    }

    // (numerator, denominator) per key and year
    let mut sums: BTreeMap<CropKey, BTreeMap<i32, (f64, f64)>> = BTreeMap::new();

    for v in values {
        let (key, weight) = match v.crop.as_deref() {
            Some(crop) => {
                if !in_filter(crop, crop_filter) {
                    continue;
                }
                (CropKey::crop(crop), areas.area(v.subbasin, crop))
            }
            None => (CropKey::AllCrops, areas.subbasin_total(v.subbasin, crop_filter)),
        };
        let weight = if unweighted { 1.0 } else { weight };

        let cell = sums.entry(key).or_default().entry(v.year).or_insert((0.0, 0.0));
        if let Some(value) = v.value {
            if weight > 0.0 {
                cell.0 += weight * value;
                cell.1 += weight;
            }
        }
    }

    sums.into_iter()
        .map(|(key, years)| {
            let series = years
                .into_iter()
                .map(|(year, (num, den))| (year, (den > 0.0).then(|| num / den)))
                .collect();
            (key, series)
        })
        .collect()
}

/// Crop shares used to combine crop-level results into scenario values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CropWeights {
    shares: BTreeMap<String, f64>,
    /// True when shares fell back to equal weighting
    pub degraded: bool,
}

impl CropWeights {
    pub fn from_shares(shares: BTreeMap<String, f64>) -> Self {
        Self {
            shares,
            degraded: false,
        }
    }

    pub fn share(&self, crop: &str) -> f64 {
        self.shares.get(crop).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.shares.iter().map(|(c, w)| (c.as_str(), *w))
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.shares.values().sum()
    }
}

/// Area shares per crop, summing to 1 over crops with positive area
///
/// Without area data every crop present in `yield_series` gets an equal
/// share and a degraded-weighting warning is recorded.
pub fn crop_weights(
    run: RunId,
    areas: &CropAreas,
    crop_filter: Option<&[String]>,
    yield_series: &OverallSeries,
    warnings: &mut Warnings,
) -> CropWeights {
    let totals: BTreeMap<String, f64> = areas
        .crop_totals(crop_filter)
        .into_iter()
        .filter(|(_, area)| *area > 0.0)
        .collect();
    let grand_total: f64 = totals.values().sum();

    if grand_total > 0.0 {
        let shares = totals
            .into_iter()
            .map(|(crop, area)| (crop, area / grand_total))
            .collect();
        return CropWeights::from_shares(shares);
    }

    let crops: Vec<&String> = yield_series
        .keys()
        .filter_map(|k| match k {
            CropKey::Crop(c) if in_filter(c, crop_filter) => Some(c),
            _ => None,
        })
        .collect();

    warnings.push(
        Warning::new(
            WarningKind::DegradedCropWeights,
            format!(
                "no crop area data for run {}; weighting {} crop(s) equally",
                run,
                crops.len()
            ),
        )
        .run(run),
    );

    let share = 1.0 / crops.len().max(1) as f64;
    CropWeights {
        shares: crops.into_iter().map(|c| (c.clone(), share)).collect(),
        degraded: true,
    }
}
