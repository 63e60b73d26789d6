//! Finance engine: owns the dataset and scenario map.
//!
//! The engine is the only component that mutates the financial model. Every
//! mutation is transactional: the next dataset is built first and committed
//! only on success, so callers never re-read a half-applied state. The
//! engine also carries the built-in default café model used on first run and
//! after a reset.

use crate::core::compute::{self, ComputationResult};
use crate::core::error::{PlannerError, Result};
use crate::core::model::{
    DailySales, Dataset, FixedCost, Ingredient, LaborEntry, MenuItem, MenuItemUpdate, Metadata,
    SalesModel, SalesModelUpdate, Scenario, ScenarioMap, Utility,
};
use crate::storage::kv_store::SharedKvStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Store entry holding the serialized dataset.
pub const DATA_KEY: &str = "finance_data";
/// Store entry holding the serialized scenario map.
pub const SCENARIOS_KEY: &str = "finance_scenarios";

/// Caller-facing result of a JSON import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResult {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Wire form of a full export: dataset plus scenario map.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExportEnvelope {
    dataset: Dataset,
    scenarios: ScenarioMap,
}

/// The computation engine behind the state container.
pub struct FinanceEngine {
    dataset: Dataset,
    scenarios: ScenarioMap,
    store: SharedKvStore,
}

impl FinanceEngine {
    /// Creates an engine with an empty dataset and a bare base scenario.
    #[must_use]
    pub fn new(store: SharedKvStore) -> Self {
        let base = Scenario::base();
        Self {
            dataset: Dataset::default(),
            scenarios: std::iter::once((base.id.clone(), base)).collect(),
            store,
        }
    }

    /// Loads the persisted snapshot when one exists, otherwise installs the
    /// built-in defaults. Corrupt persisted entries fall back to defaults.
    ///
    /// # Errors
    /// Returns an error when the store itself cannot be read.
    pub fn init(&mut self) -> Result<()> {
        let stored_data = self.store.get(DATA_KEY).map_err(|e| {
            PlannerError::storage("load_failed", e.to_string(), "engine:init")
        })?;

        match stored_data.as_deref().map(serde_json::from_str::<Dataset>) {
            Some(Ok(dataset)) => {
                debug!(target: "prixfixe::engine", "loaded persisted dataset");
                self.dataset = dataset;
            }
            Some(Err(err)) => {
                warn!(target: "prixfixe::engine", %err, "persisted dataset is corrupt, using defaults");
                self.dataset = default_dataset();
            }
            None => self.dataset = default_dataset(),
        }

        let stored_scenarios = self.store.get(SCENARIOS_KEY).map_err(|e| {
            PlannerError::storage("load_failed", e.to_string(), "engine:init")
        })?;

        match stored_scenarios
            .as_deref()
            .map(serde_json::from_str::<ScenarioMap>)
        {
            Some(Ok(scenarios)) if !scenarios.is_empty() => self.scenarios = scenarios,
            Some(Ok(_)) | None => self.scenarios = default_scenarios(),
            Some(Err(err)) => {
                warn!(target: "prixfixe::engine", %err, "persisted scenarios are corrupt, using defaults");
                self.scenarios = default_scenarios();
            }
        }

        Ok(())
    }

    /// The current dataset.
    #[must_use]
    pub fn data(&self) -> &Dataset {
        &self.dataset
    }

    /// The current scenario map.
    #[must_use]
    pub fn scenarios(&self) -> &ScenarioMap {
        &self.scenarios
    }

    /// Applies a patch to one menu item.
    ///
    /// # Errors
    /// Fails without touching the dataset when the item is unknown.
    pub fn update_menu(&mut self, menu_id: &str, patch: &MenuItemUpdate) -> Result<()> {
        let mut next = self.dataset.clone();
        let item = next
            .menu
            .iter_mut()
            .find(|item| item.id == menu_id)
            .ok_or_else(|| {
                PlannerError::user(
                    "menu_item_not_found",
                    format!("menu item '{menu_id}' not found"),
                    "engine:update_menu",
                )
                .with_hint("Run `prixfixe menu list` to see known items")
            })?;
        *item = item.merged(patch);
        self.dataset = next;
        Ok(())
    }

    /// Applies a patch to the sales forecast.
    ///
    /// # Errors
    /// Infallible today; `Result` keeps the mutation surface uniform.
    pub fn update_sales_model(&mut self, patch: &SalesModelUpdate) -> Result<()> {
        self.dataset.sales = self.dataset.sales.merged(patch);
        Ok(())
    }

    /// Replaces the utilities list.
    ///
    /// # Errors
    /// Infallible today; `Result` keeps the mutation surface uniform.
    pub fn update_utilities(&mut self, items: Vec<Utility>) -> Result<()> {
        self.dataset.utilities = items;
        Ok(())
    }

    /// Replaces the labor list.
    ///
    /// # Errors
    /// Infallible today; `Result` keeps the mutation surface uniform.
    pub fn update_labor(&mut self, items: Vec<LaborEntry>) -> Result<()> {
        self.dataset.labor = items;
        Ok(())
    }

    /// Replaces the fixed-costs list.
    ///
    /// # Errors
    /// Infallible today; `Result` keeps the mutation surface uniform.
    pub fn update_fixed_costs(&mut self, items: Vec<FixedCost>) -> Result<()> {
        self.dataset.fixed_costs = items;
        Ok(())
    }

    /// Derives the full computation result under the given scenario.
    ///
    /// # Errors
    /// Fails when the scenario id is unknown.
    pub fn compute(&self, scenario_id: &str) -> Result<ComputationResult> {
        let scenario = self.scenarios.get(scenario_id).ok_or_else(|| {
            PlannerError::computation(
                "unknown_scenario",
                format!("unknown scenario '{scenario_id}'"),
                "engine:compute",
            )
        })?;
        Ok(compute::derive(&self.dataset, &self.scenarios, scenario))
    }

    /// Replaces the model from exported JSON.
    ///
    /// Parse or shape failures are reported in the result, never thrown; the
    /// current model is untouched on failure. An import without scenarios is
    /// seeded with the base scenario so the map is never empty.
    pub fn import_json(&mut self, text: &str) -> ImportResult {
        let envelope: ExportEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(err) => return ImportResult::failed(format!("invalid JSON: {err}")),
        };

        let mut scenarios = envelope.scenarios;
        for (key, scenario) in &scenarios {
            if scenario.id != *key {
                return ImportResult::failed(format!(
                    "scenario key '{key}' does not match scenario id '{}'",
                    scenario.id
                ));
            }
            if scenario.name.trim().is_empty() {
                return ImportResult::failed(format!("scenario '{key}' has no name"));
            }
        }
        if scenarios.is_empty() {
            let base = Scenario::base();
            scenarios.insert(base.id.clone(), base);
        }

        self.dataset = envelope.dataset;
        self.scenarios = scenarios;
        ImportResult::ok()
    }

    /// Serializes the full model (dataset + scenarios) as canonical JSON.
    ///
    /// # Errors
    /// Fails when serialization fails.
    pub fn export_json(&self) -> Result<String> {
        let envelope = ExportEnvelope {
            dataset: self.dataset.clone(),
            scenarios: self.scenarios.clone(),
        };
        serde_json::to_string_pretty(&envelope).map_err(|e| {
            PlannerError::system("export_failed", e.to_string(), "engine:export_json")
        })
    }

    /// Persists the current dataset and scenario map under the two named
    /// store entries. Callers treat failure as advisory.
    ///
    /// # Errors
    /// Fails when serialization or the store write fails.
    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_string(&self.dataset).map_err(|e| {
            PlannerError::storage("serialize_failed", e.to_string(), "engine:save")
        })?;
        let scenarios = serde_json::to_string(&self.scenarios).map_err(|e| {
            PlannerError::storage("serialize_failed", e.to_string(), "engine:save")
        })?;

        self.store.set(DATA_KEY, &data).map_err(|e| {
            PlannerError::storage("write_failed", e.to_string(), "engine:save")
        })?;
        self.store.set(SCENARIOS_KEY, &scenarios).map_err(|e| {
            PlannerError::storage("write_failed", e.to_string(), "engine:save")
        })?;
        Ok(())
    }
}

/// The built-in default model: a small café.
#[must_use]
pub fn default_dataset() -> Dataset {
    let menu = vec![
        MenuItem {
            id: "espresso".to_string(),
            name: "Espresso".to_string(),
            price: Decimal::new(320, 2),
            ingredients: vec![Ingredient::new(
                "coffee beans",
                Decimal::new(18, 0),
                "g",
                Decimal::new(3, 2),
            )],
        },
        MenuItem {
            id: "cappuccino".to_string(),
            name: "Cappuccino".to_string(),
            price: Decimal::new(420, 2),
            ingredients: vec![
                Ingredient::new("coffee beans", Decimal::new(18, 0), "g", Decimal::new(3, 2)),
                Ingredient::new("milk", Decimal::new(150, 0), "ml", Decimal::new(1, 3)),
            ],
        },
        MenuItem {
            id: "croque-monsieur".to_string(),
            name: "Croque Monsieur".to_string(),
            price: Decimal::new(950, 2),
            ingredients: vec![
                Ingredient::new("bread", Decimal::new(2, 0), "slices", Decimal::new(35, 2)),
                Ingredient::new("ham", Decimal::new(80, 0), "g", Decimal::new(15, 3)),
                Ingredient::new("gruyere", Decimal::new(60, 0), "g", Decimal::new(22, 3)),
                Ingredient::new("butter", Decimal::new(15, 0), "g", Decimal::new(9, 3)),
            ],
        },
        MenuItem {
            id: "soup-of-the-day".to_string(),
            name: "Soup of the Day".to_string(),
            price: Decimal::new(680, 2),
            ingredients: vec![
                Ingredient::new("vegetables", Decimal::new(200, 0), "g", Decimal::new(4, 3)),
                Ingredient::new("stock", Decimal::new(300, 0), "ml", Decimal::new(1, 3)),
                Ingredient::new("bread", Decimal::new(1, 0), "slices", Decimal::new(35, 2)),
            ],
        },
    ];

    let sales = SalesModel {
        days_open_per_month: 26,
        daily_sales: vec![
            DailySales {
                menu_id: "espresso".to_string(),
                units_per_day: Decimal::from(85),
            },
            DailySales {
                menu_id: "cappuccino".to_string(),
                units_per_day: Decimal::from(60),
            },
            DailySales {
                menu_id: "croque-monsieur".to_string(),
                units_per_day: Decimal::from(35),
            },
            DailySales {
                menu_id: "soup-of-the-day".to_string(),
                units_per_day: Decimal::from(25),
            },
        ],
    };

    Dataset {
        metadata: Metadata::new("Cafe Demo", "USD"),
        menu,
        sales,
        utilities: vec![
            Utility {
                name: "electricity".to_string(),
                monthly_cost: Decimal::from(420),
            },
            Utility {
                name: "water".to_string(),
                monthly_cost: Decimal::from(95),
            },
            Utility {
                name: "internet".to_string(),
                monthly_cost: Decimal::from(60),
            },
        ],
        labor: vec![
            LaborEntry {
                role: "barista".to_string(),
                hourly_wage: Decimal::new(1650, 2),
                hours_per_day: Decimal::from(8),
                headcount: 2,
            },
            LaborEntry {
                role: "cook".to_string(),
                hourly_wage: Decimal::new(1900, 2),
                hours_per_day: Decimal::from(8),
                headcount: 1,
            },
            LaborEntry {
                role: "server".to_string(),
                hourly_wage: Decimal::new(1400, 2),
                hours_per_day: Decimal::from(6),
                headcount: 1,
            },
        ],
        fixed_costs: vec![
            FixedCost {
                name: "rent".to_string(),
                monthly_cost: Decimal::from(3800),
            },
            FixedCost {
                name: "insurance".to_string(),
                monthly_cost: Decimal::from(240),
            },
            FixedCost {
                name: "POS subscription".to_string(),
                monthly_cost: Decimal::from(75),
            },
        ],
    }
}

/// The built-in scenario set: base plus a busy and a slow season.
#[must_use]
pub fn default_scenarios() -> ScenarioMap {
    let mut scenarios = ScenarioMap::new();
    scenarios.insert("base".to_string(), Scenario::base());
    scenarios.insert(
        "busy-season".to_string(),
        Scenario {
            id: "busy-season".to_string(),
            name: "Busy Season".to_string(),
            description: Some("Summer terrace traffic".to_string()),
            sales_multiplier: Decimal::new(120, 2),
            price_multiplier: Decimal::ONE,
            cost_multiplier: Decimal::new(105, 2),
        },
    );
    scenarios.insert(
        "slow-season".to_string(),
        Scenario {
            id: "slow-season".to_string(),
            name: "Slow Season".to_string(),
            description: Some("Winter with discounted prices".to_string()),
            sales_multiplier: Decimal::new(75, 2),
            price_multiplier: Decimal::new(92, 2),
            cost_multiplier: Decimal::ONE,
        },
    );
    scenarios
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validate;
    use crate::storage::kv_store::{InMemoryKvStore, KvStore};
    use std::sync::Arc;

    fn engine() -> FinanceEngine {
        let mut engine = FinanceEngine::new(Arc::new(InMemoryKvStore::new()));
        engine.init().unwrap();
        engine
    }

    #[test]
    fn defaults_validate_clean() {
        let engine = engine();
        let outcome = validate::validate_dataset(engine.data());
        assert!(outcome.is_valid, "errors: {:?}", outcome.errors);
    }

    #[test]
    fn init_prefers_persisted_snapshot() {
        let store = Arc::new(InMemoryKvStore::new());

        let mut first = FinanceEngine::new(store.clone());
        first.init().unwrap();
        first
            .update_menu(
                "espresso",
                &MenuItemUpdate {
                    price: Some(Decimal::new(350, 2)),
                    ..Default::default()
                },
            )
            .unwrap();
        first.save().unwrap();

        let mut second = FinanceEngine::new(store);
        second.init().unwrap();
        assert_eq!(
            second.data().menu_item("espresso").unwrap().price,
            Decimal::new(350, 2)
        );
    }

    #[test]
    fn corrupt_persisted_dataset_falls_back_to_defaults() {
        let store = Arc::new(InMemoryKvStore::new());
        store.set(DATA_KEY, "not json").unwrap();

        let mut engine = FinanceEngine::new(store);
        engine.init().unwrap();

        let defaults = default_dataset();
        assert_eq!(engine.data().menu, defaults.menu);
        assert_eq!(engine.data().sales, defaults.sales);
        assert_eq!(engine.data().metadata.venue_name, defaults.metadata.venue_name);
    }

    #[test]
    fn update_menu_unknown_id_leaves_dataset_unchanged() {
        let mut engine = engine();
        let before = engine.data().clone();

        let err = engine
            .update_menu("ghost", &MenuItemUpdate::default())
            .unwrap_err();
        assert_eq!(err.code, "menu_item_not_found");
        assert_eq!(engine.data(), &before);
    }

    #[test]
    fn compute_rejects_unknown_scenario() {
        let engine = engine();
        let err = engine.compute("mars-colony").unwrap_err();
        assert_eq!(err.code, "unknown_scenario");
    }

    #[test]
    fn export_import_round_trip() {
        let mut engine = engine();
        let exported = engine.export_json().unwrap();

        let mut other = FinanceEngine::new(Arc::new(InMemoryKvStore::new()));
        other.init().unwrap();
        other
            .update_fixed_costs(vec![FixedCost {
                name: "rent".to_string(),
                monthly_cost: Decimal::from(9999),
            }])
            .unwrap();

        let result = other.import_json(&exported);
        assert!(result.success, "{:?}", result.error);
        assert_eq!(other.data(), engine.data());
        assert_eq!(other.scenarios(), engine.scenarios());
    }

    #[test]
    fn import_invalid_json_reports_failure_and_keeps_model() {
        let mut engine = engine();
        let before = engine.data().clone();

        let result = engine.import_json("{nope");
        assert!(!result.success);
        assert!(result.error.unwrap().contains("invalid JSON"));
        assert_eq!(engine.data(), &before);
    }

    #[test]
    fn import_with_mismatched_scenario_key_fails() {
        let mut engine = engine();
        let mut exported: serde_json::Value =
            serde_json::from_str(&engine.export_json().unwrap()).unwrap();
        exported["scenarios"]["base"]["id"] = serde_json::Value::String("other".to_string());

        let result = engine.import_json(&exported.to_string());
        assert!(!result.success);
    }

    #[test]
    fn import_without_scenarios_seeds_base() {
        let mut engine = engine();
        let envelope = serde_json::json!({
            "dataset": default_dataset(),
            "scenarios": {},
        });

        let result = engine.import_json(&envelope.to_string());
        assert!(result.success);
        assert!(engine.scenarios().contains_key("base"));
    }

    #[test]
    fn save_writes_both_entries() {
        let store = Arc::new(InMemoryKvStore::new());
        let mut engine = FinanceEngine::new(store.clone());
        engine.init().unwrap();
        engine.save().unwrap();

        assert!(store.get(DATA_KEY).unwrap().is_some());
        assert!(store.get(SCENARIOS_KEY).unwrap().is_some());
    }
}
