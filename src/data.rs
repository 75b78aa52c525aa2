//! Observation and Area Data
//!
//! Typed rows for the monthly simulation output of each scenario run, plus
//! the per-(run, sub-basin, crop) land areas used for weighting.
//!
//! Rows arrive already materialised. [`ObservationSet::extend_from_frame`]
//! turns a Polars `DataFrame` handed over by the ingestion layer into typed
//! rows: `run`, `subbasin`, `year` and `month` are key columns, `crop` is
//! optional, and every remaining column becomes a named numeric field.

use crate::error::ScoringError;
use crate::indicators::SourceKind;
use anyhow::{anyhow, bail, Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub type RunId = u32;
pub type SubbasinId = u32;

const KEY_COLUMNS: [&str; 4] = ["run", "subbasin", "year", "month"];
const CROP_COLUMN: &str = "crop";

/// Field of crop-grain rows holding the unit's land area in hectares
pub const AREA_FIELD: &str = "area_ha";

/// One row of monthly model output
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyObservation {
    pub run: RunId,
    pub subbasin: SubbasinId,
    /// Present only for crop-grain sources
    pub crop: Option<String>,
    pub year: i32,
    pub month: u8,
    pub fields: FxHashMap<String, f64>,
}

impl MonthlyObservation {
    pub fn new(run: RunId, subbasin: SubbasinId, crop: Option<&str>, year: i32, month: u8) -> Self {
        Self {
            run,
            subbasin,
            crop: crop.map(str::to_string),
            year,
            month,
            fields: FxHashMap::default(),
        }
    }

    pub fn with_field(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Field value, treating NaN as missing
    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied().filter(|v| !v.is_nan())
    }
}

/// Request-scoped snapshot of raw rows, grouped by run and source table
#[derive(Debug, Default, Clone)]
pub struct ObservationSet {
    rows: FxHashMap<(RunId, SourceKind), Vec<MonthlyObservation>>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: SourceKind, row: MonthlyObservation) {
        self.rows.entry((row.run, source)).or_default().push(row);
    }

    pub fn extend(&mut self, source: SourceKind, rows: impl IntoIterator<Item = MonthlyObservation>) {
        for row in rows {
            self.push(source, row);
        }
    }

    /// Rows for one run and source (empty if none were supplied)
    pub fn rows(&self, run: RunId, source: SourceKind) -> &[MonthlyObservation] {
        self.rows
            .get(&(run, source))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every row of a materialised frame
    ///
    /// # Errors
    /// Fails if a key column is absent, a key cell is null, or a column
    /// cannot be cast to the expected type.
    pub fn extend_from_frame(&mut self, source: SourceKind, df: &DataFrame) -> Result<usize> {
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.as_str().to_string())
            .collect();

        for key in KEY_COLUMNS {
            if !names.iter().any(|n| n == key) {
                return Err(ScoringError::MissingColumn {
                    column: key.to_string(),
                }
                .into());
            }
        }

        let runs = int_column(df, "run")?;
        let subbasins = int_column(df, "subbasin")?;
        let years = int_column(df, "year")?;
        let months = int_column(df, "month")?;

        let crops: Option<Vec<Option<String>>> = if names.iter().any(|n| n == CROP_COLUMN) {
            let column = df
                .column(CROP_COLUMN)?
                .cast(&DataType::String)
                .with_context(|| "crop column is not castable to string")?;
            let values = column
                .str()?
                .into_iter()
                .map(|opt| opt.map(str::to_string))
                .collect();
            Some(values)
        } else {
            None
        };

        let mut fields: Vec<(String, Vec<Option<f64>>)> = Vec::new();
        for name in &names {
            if KEY_COLUMNS.contains(&name.as_str()) || name == CROP_COLUMN {
                continue;
            }
            fields.push((name.clone(), float_column(df, name)?));
        }

        let height = df.height();
        for idx in 0..height {
            let key = |values: &[Option<i64>], name: &str| -> Result<i64> {
                values[idx].ok_or_else(|| anyhow!("row {} has null '{}'", idx, name))
            };
            let run = RunId::try_from(key(&runs, "run")?)
                .with_context(|| format!("row {}: run id out of range", idx))?;
            let subbasin = SubbasinId::try_from(key(&subbasins, "subbasin")?)
                .with_context(|| format!("row {}: sub-basin id out of range", idx))?;
            let year = i32::try_from(key(&years, "year")?)
                .with_context(|| format!("row {}: year out of range", idx))?;
            let month = u8::try_from(key(&months, "month")?)
                .ok()
                .filter(|m| (1..=12).contains(m))
                .ok_or_else(|| anyhow!("row {}: month outside 1-12", idx))?;

            let crop = crops.as_ref().and_then(|c| c[idx].clone());
            let mut row = MonthlyObservation {
                run,
                subbasin,
                crop,
                year,
                month,
                fields: FxHashMap::default(),
            };
            for (name, values) in &fields {
                if let Some(v) = values[idx] {
                    row.fields.insert(name.clone(), v);
                }
            }
            self.push(source, row);
        }

        tracing::debug!("Loaded {} {:?} rows from frame", height, source);
        Ok(height)
    }
}

impl ObservationSet {
    /// Read a CSV or Parquet observation table and append its rows
    pub fn load_file(&mut self, source: SourceKind, path: &Path) -> Result<usize> {
        let is_parquet = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

        let df = if is_parquet {
            LazyFrame::scan_parquet(path, Default::default())
                .with_context(|| format!("Failed to scan parquet: {:?}", path))?
                .collect()
                .with_context(|| format!("Failed to load observations parquet: {:?}", path))?
        } else {
            CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))
                .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
                .finish()
                .with_context(|| format!("Failed to load observations CSV: {:?}", path))?
        };

        self.extend_from_frame(source, &df)
            .with_context(|| format!("Invalid observation table: {:?}", path))
    }
}

/// Numeric field column as f64; text columns are rejected unless all null
fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?;
    let dtype = column.dtype();
    let all_null = column.null_count() == column.len();
    let numeric = dtype.is_float() || dtype.is_integer() || matches!(dtype, DataType::Boolean);
    if !numeric && !all_null {
        bail!("field column '{}' is not numeric ({})", name, dtype);
    }
    let column = column
        .strict_cast(&DataType::Float64)
        .with_context(|| format!("field column '{}' is not numeric", name))?;
    let values = column.f64()?.into_iter().collect();
    Ok(values)
}

fn int_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df
        .column(name)?
        .cast(&DataType::Int64)
        .with_context(|| format!("key column '{}' is not an integer column", name))?;
    let values = column.i64()?.into_iter().collect();
    Ok(values)
}

/// Land area of one (run, sub-basin, crop) unit in one observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub run: RunId,
    pub subbasin: SubbasinId,
    pub crop: String,
    pub area_ha: f64,
}

impl AreaRecord {
    /// Collect area records from crop-grain rows carrying an area field
    pub fn from_observations<'a>(
        rows: impl IntoIterator<Item = &'a MonthlyObservation>,
        area_field: &str,
    ) -> Vec<AreaRecord> {
        rows.into_iter()
            .filter_map(|row| {
                let crop = row.crop.as_ref()?;
                let area_ha = row.field(area_field)?;
                Some(AreaRecord {
                    run: row.run,
                    subbasin: row.subbasin,
                    crop: crop.clone(),
                    area_ha,
                })
            })
            .collect()
    }
}
