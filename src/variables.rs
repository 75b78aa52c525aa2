//! Variable Resolution
//!
//! Economic parameters live at four scopes. Lookups go from most to least
//! specific:
//!
//! 1. crop + run override (per-scenario practice costs)
//! 2. crop default (study-area wide, e.g. crop price)
//! 3. run override (global-shaped, e.g. a scenario's discount rate)
//! 4. study-area default
//!
//! [`keys::REFERENCE_PRODUCTION_COST`] always resolves against the baseline
//! run: it is what the farmer pays today, whatever scenario is evaluated.
//!
//! Missing values resolve to `None`. Calculators pick the fallback and
//! record the warning.

use crate::data::RunId;
use crate::warnings::{Warning, WarningKind, Warnings};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// Variable keys understood by the calculators
pub mod keys {
    pub const DISCOUNT_RATE: &str = "discount_rate";
    pub const ECONOMIC_LIFE_YEARS: &str = "economic_life_years";
    pub const INVESTMENT_COST: &str = "investment_cost";
    pub const ANNUAL_OM_COST: &str = "annual_om_cost";
    pub const CROP_PRICE: &str = "crop_price";
    pub const LABOUR_DAY_RATE: &str = "labour_day_rate";
    pub const LAND_RENT: &str = "land_rent";
    pub const WATER_FEE: &str = "water_fee";
    pub const WATER_PRICE_PER_M3: &str = "water_price_per_m3";
    pub const FARM_SIZE_HA: &str = "farm_size_ha";
    pub const REFERENCE_PRODUCTION_COST: &str = "reference_production_cost";

    /// Person-days per hectare, per field operation
    pub const LABOUR_FACTORS: [&str; 6] = [
        "labour_land_preparation",
        "labour_sowing",
        "labour_fertilizing",
        "labour_irrigation",
        "labour_weeding",
        "labour_harvest",
    ];

    /// Currency per hectare, per material input
    pub const MATERIAL_FACTORS: [&str; 5] = [
        "cost_seed",
        "cost_fertilizer",
        "cost_pesticide",
        "cost_machinery",
        "cost_energy",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl VariableValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            VariableValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Where a lookup is made from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Global,
    Crop(&'a str),
    Run(RunId),
    CropRun(&'a str, RunId),
}

impl<'a> Scope<'a> {
    fn crop(&self) -> Option<&'a str> {
        match *self {
            Scope::Crop(c) | Scope::CropRun(c, _) => Some(c),
            _ => None,
        }
    }

    fn run(&self) -> Option<RunId> {
        match *self {
            Scope::Run(r) | Scope::CropRun(_, r) => Some(r),
            _ => None,
        }
    }
}

/// One stored value; absent `crop`/`run` widen the scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub key: String,
    #[serde(default)]
    pub crop: Option<String>,
    #[serde(default)]
    pub run: Option<RunId>,
    pub value: VariableValue,
}

/// Immutable per-request snapshot of every scope's values
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    study_area: FxHashMap<String, VariableValue>,
    crop: FxHashMap<(String, String), VariableValue>,
    run: FxHashMap<(String, RunId), VariableValue>,
    crop_run: FxHashMap<(String, String, RunId), VariableValue>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = VariableEntry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    pub fn insert(&mut self, entry: VariableEntry) {
        let VariableEntry {
            key,
            crop,
            run,
            value,
        } = entry;
        match (crop, run) {
            (Some(c), Some(r)) => {
                self.crop_run.insert((key, c, r), value);
            }
            (Some(c), None) => {
                self.crop.insert((key, c), value);
            }
            (None, Some(r)) => {
                self.run.insert((key, r), value);
            }
            (None, None) => {
                self.study_area.insert(key, value);
            }
        }
    }

    pub fn set(mut self, key: &str, crop: Option<&str>, run: Option<RunId>, value: f64) -> Self {
        self.insert(VariableEntry {
            key: key.to_string(),
            crop: crop.map(str::to_string),
            run,
            value: VariableValue::Number(value),
        });
        self
    }

    fn lookup(&self, key: &str, crop: Option<&str>, run: Option<RunId>) -> Option<&VariableValue> {
        let key = key.to_string();
        if let (Some(c), Some(r)) = (crop, run) {
            if let Some(v) = self.crop_run.get(&(key.clone(), c.to_string(), r)) {
                return Some(v);
            }
        }
        if let Some(c) = crop {
            if let Some(v) = self.crop.get(&(key.clone(), c.to_string())) {
                return Some(v);
            }
        }
        if let Some(r) = run {
            if let Some(v) = self.run.get(&(key.clone(), r)) {
                return Some(v);
            }
        }
        self.study_area.get(&key)
    }
}

type MemoKey = (String, Option<String>, Option<RunId>);

/// Request-scoped resolver with its own memo table
pub struct VariableResolver<'a> {
    store: &'a VariableStore,
    baseline_run: RunId,
    memo: RefCell<FxHashMap<MemoKey, Option<VariableValue>>>,
    warnings: RefCell<Warnings>,
}

impl<'a> VariableResolver<'a> {
    pub fn new(store: &'a VariableStore, baseline_run: RunId) -> Self {
        Self {
            store,
            baseline_run,
            memo: RefCell::new(FxHashMap::default()),
            warnings: RefCell::new(Warnings::new()),
        }
    }

    pub fn baseline_run(&self) -> RunId {
        self.baseline_run
    }

    pub fn resolve(&self, key: &str, scope: Scope<'_>) -> Option<VariableValue> {
        let crop = scope.crop();
        let run = if key == keys::REFERENCE_PRODUCTION_COST {
            Some(self.baseline_run)
        } else {
            scope.run()
        };

        let memo_key = (key.to_string(), crop.map(str::to_string), run);
        if let Some(hit) = self.memo.borrow().get(&memo_key) {
            return hit.clone();
        }

        let value = self.store.lookup(key, crop, run).cloned();
        self.memo.borrow_mut().insert(memo_key, value.clone());
        value
    }

    /// Numeric lookup; a non-numeric value reads as missing and is reported
    pub fn number(&self, key: &str, scope: Scope<'_>) -> Option<f64> {
        let value = self.resolve(key, scope)?;
        let number = value.as_number();
        if number.is_none() {
            self.warnings.borrow_mut().push(Warning::new(
                WarningKind::VariableTypeMismatch,
                format!("variable '{}' is {:?}, expected a number", key, value),
            ));
        }
        number
    }

    pub fn take_warnings(&self) -> Warnings {
        std::mem::take(&mut *self.warnings.borrow_mut())
    }
}
