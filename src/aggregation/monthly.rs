//! Monthly value evaluation
//!
//! One value per (month, sub-basin, crop) key from all rows sharing it.
//! Rows whose formula is undefined (missing field, zero denominator) drop
//! out of the mean instead of counting as zero.

use crate::data::MonthlyObservation;
use crate::indicators::{IndicatorDefinition, MonthlyMode, ValueExpr};

/// Per-row value of an indicator's formula
pub fn row_value(expr: &ValueExpr, row: &MonthlyObservation) -> Option<f64> {
    match *expr {
        ValueExpr::Field { field } => row.field(field),
        ValueExpr::Ratio {
            numerator,
            denominator,
        } => {
            let den = row.field(denominator)?;
            if den > 0.0 {
                Some(row.field(numerator)? / den)
            } else {
                None
            }
        }
        ValueExpr::Threshold { field, threshold } => {
            row.field(field).map(|v| if v > threshold { 1.0 } else { 0.0 })
        }
        ValueExpr::Scaled { field, factor } => row.field(field).map(|v| v * factor),
        ValueExpr::Custom { eval, .. } => eval(row),
    }
}

/// Evaluate one month for one indicator
///
/// Threshold indicators return 1.0 only when more than half of the row
/// flags are set (an even split is 0.0).
pub fn evaluate_month(def: &IndicatorDefinition, rows: &[&MonthlyObservation]) -> Option<f64> {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| row_value(&def.expr, row))
        .collect();

    let value = match def.monthly {
        MonthlyMode::MeanOfRows => mean(&values)?,
    };

    if def.expr.is_boolean() {
        Some(if value > 0.5 { 1.0 } else { 0.0 })
    } else {
        Some(value)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
