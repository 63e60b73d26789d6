//! The state container.
//!
//! `StateManager` owns the single authoritative snapshot of application
//! state and orchestrates every mutation through the same pipeline:
//!
//! ```text
//! mutate request → validate payload → engine commit → DATA
//!                → compute → COMPUTATION → validate dataset → VALIDATION
//!                → LOADING(false)
//! ```
//!
//! Each transition stamps the snapshot and fans out one notification to
//! every subscriber. Transitions pass through a pending queue drained in
//! FIFO order, so a nested emission is ordered after the in-flight
//! transition instead of recursing. Persistence on a data transition is
//! best-effort advisory: a failed write is logged, never surfaced.
//!
//! The whole-dataset validation pass is memoized in a bounded LRU cache
//! keyed by a monotonic dataset version, bumped on every accepted data
//! transition.

use crate::core::compute::ComputationResult;
use crate::core::engine::{FinanceEngine, ImportResult, DATA_KEY, SCENARIOS_KEY};
use crate::core::error::{PlannerError, Result};
use crate::core::model::{
    Dataset, FixedCost, LaborEntry, MenuItemUpdate, SalesModelUpdate, Scenario, ScenarioMap,
    Utility,
};
use crate::core::state::{AppState, Transition};
use crate::core::validate::{self, ValidationOutcome};
use crate::storage::kv_store::SharedKvStore;
use chrono::Utc;
use hashlink::LruCache;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// Bound on distinct dataset versions with a memoized validation outcome.
const VALIDATION_CACHE_CAPACITY: usize = 8;

/// Handle returned by [`StateManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Observer callback invoked with the snapshot after every transition.
pub type Subscriber = Box<dyn FnMut(&AppState)>;

/// Validation-cache diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// The single-owner state container around the finance engine.
pub struct StateManager {
    engine: FinanceEngine,
    store: SharedKvStore,
    state: AppState,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    next_subscriber_id: u64,
    pending: VecDeque<Transition>,
    draining: bool,
    dataset_version: u64,
    validation_cache: LruCache<u64, ValidationOutcome>,
    cache_hits: u64,
    cache_misses: u64,
}

impl StateManager {
    /// Builds the container over the given store and runs the
    /// initialization sequence (engine init → data transition → compute and
    /// validate). Initialization failure is caught and surfaced as error
    /// state; the container stays usable.
    #[must_use]
    pub fn new(store: SharedKvStore) -> Self {
        let mut manager = Self {
            engine: FinanceEngine::new(store.clone()),
            store,
            state: AppState::empty(),
            subscribers: Vec::new(),
            next_subscriber_id: 0,
            pending: VecDeque::new(),
            draining: false,
            dataset_version: 0,
            validation_cache: LruCache::new(VALIDATION_CACHE_CAPACITY),
            cache_hits: 0,
            cache_misses: 0,
        };
        manager.initialize();
        manager
    }

    fn initialize(&mut self) {
        if let Err(err) = self.engine.init() {
            error!(target: "prixfixe::state", %err, "initialization failed");
            self.fail("Initialization failed", &err.to_string());
            return;
        }
        self.emit_data_from_engine();
        self.ensure_current_scenario();
        self.compute_and_validate();
    }

    // ---- transition plumbing ------------------------------------------------

    /// Queues a transition and drains the queue unless a drain is already in
    /// progress; nested emissions are ordered, never recursed into.
    fn apply(&mut self, transition: Transition) {
        self.pending.push_back(transition);
        if self.draining {
            return;
        }
        self.draining = true;
        while let Some(next) = self.pending.pop_front() {
            self.apply_one(&next);
        }
        self.draining = false;
    }

    fn apply_one(&mut self, transition: &Transition) {
        let now = Utc::now();
        debug!(target: "prixfixe::state", kind = transition.kind(), "applying transition");

        let applied =
            panic::catch_unwind(AssertUnwindSafe(|| self.state.apply_mut(transition, now)));
        if applied.is_err() {
            error!(
                target: "prixfixe::state",
                kind = transition.kind(),
                "transition handler panicked"
            );
            // The error handler only assigns fields, so this cannot recurse.
            if !matches!(transition, Transition::Error { .. }) {
                self.pending.push_back(Transition::Error {
                    message: Some(format!(
                        "Internal failure applying {} transition",
                        transition.kind()
                    )),
                });
            }
            return;
        }

        if matches!(transition, Transition::Data { .. }) {
            self.dataset_version += 1;
            if let Err(err) = self.engine.save() {
                warn!(target: "prixfixe::state", %err, "best-effort persist failed");
            }
        }

        self.notify();
    }

    fn notify(&mut self) {
        let state = &self.state;
        for (id, subscriber) in &mut self.subscribers {
            if panic::catch_unwind(AssertUnwindSafe(|| subscriber(state))).is_err() {
                error!(
                    target: "prixfixe::state",
                    subscriber = id.0,
                    "subscriber panicked during notification"
                );
            }
        }
    }

    fn fail(&mut self, prefix: &str, reason: &str) {
        self.apply(Transition::Error {
            message: Some(format!("{prefix}: {reason}")),
        });
    }

    /// Data transition carrying the engine's dataset and the *previous*
    /// scenario map: data edits never implicitly change scenarios.
    fn emit_data_keeping_scenarios(&mut self) {
        self.apply(Transition::Data {
            dataset: self.engine.data().clone(),
            scenarios: self.state.scenarios.clone(),
        });
    }

    /// Data transition carrying both the engine's dataset and its scenario
    /// map (initialization, import, reset).
    fn emit_data_from_engine(&mut self) {
        self.apply(Transition::Data {
            dataset: self.engine.data().clone(),
            scenarios: self.engine.scenarios().clone(),
        });
    }

    /// Re-anchors the active scenario when a wholesale scenario replacement
    /// (init, import, reset) dropped the current id.
    fn ensure_current_scenario(&mut self) {
        if self
            .state
            .scenarios
            .contains_key(&self.state.current_scenario_id)
        {
            return;
        }
        let fallback = if self.state.scenarios.contains_key("base") {
            "base".to_string()
        } else {
            match self.state.scenarios.keys().next() {
                Some(key) => key.clone(),
                None => return,
            }
        };
        warn!(
            target: "prixfixe::state",
            from = %self.state.current_scenario_id,
            to = %fallback,
            "active scenario vanished, re-anchoring"
        );
        self.apply(Transition::Scenario { id: fallback });
    }

    // ---- compute-and-validate ----------------------------------------------

    /// Recompute, validate through the cache, leave loading. Invoked after
    /// every accepted data mutation, after import, and after reset.
    fn compute_and_validate(&mut self) {
        let scenario_id = self.state.current_scenario_id.clone();
        let computed =
            panic::catch_unwind(AssertUnwindSafe(|| self.engine.compute(&scenario_id)));
        match computed {
            Ok(Ok(result)) => self.apply(Transition::Computation { result }),
            Ok(Err(err)) => {
                self.fail("Computation failed", &err.to_string());
                return;
            }
            Err(_) => {
                self.fail("Computation failed", "computation panicked");
                return;
            }
        }

        // A failure inside the validation pass is reported as data, not as a
        // pipeline error: log, skip the emission, keep going.
        if let Some(outcome) = self.cached_dataset_validation() {
            self.apply(Transition::Validation {
                outcomes: vec![outcome],
            });
        }

        self.apply(Transition::Loading { active: false });
    }

    fn cached_dataset_validation(&mut self) -> Option<ValidationOutcome> {
        let version = self.dataset_version;
        if let Some(hit) = self.validation_cache.get(&version) {
            self.cache_hits += 1;
            return Some(hit.clone());
        }

        let dataset = self.engine.data();
        let ran = panic::catch_unwind(AssertUnwindSafe(|| validate::validate_dataset(dataset)));
        match ran {
            Ok(outcome) => {
                self.cache_misses += 1;
                self.validation_cache.insert(version, outcome.clone());
                Some(outcome)
            }
            Err(_) => {
                error!(target: "prixfixe::state", version, "dataset validation pass panicked");
                None
            }
        }
    }

    // ---- mutation operations -----------------------------------------------

    /// Applies a patch to one menu item through the full pipeline.
    pub fn update_menu(&mut self, menu_id: &str, updates: &MenuItemUpdate) {
        self.apply(Transition::Loading { active: true });

        let candidate = match self.engine.data().menu_item(menu_id) {
            Some(item) => item.merged(updates),
            None => {
                self.fail(
                    "Failed to update menu",
                    &format!("menu item '{menu_id}' not found"),
                );
                return;
            }
        };
        let outcome = validate::validate_menu_item(&candidate);
        if !outcome.is_valid {
            self.fail("Failed to update menu", &outcome.errors.join(", "));
            return;
        }

        if let Err(err) = self.engine.update_menu(menu_id, updates) {
            self.fail("Failed to update menu", &err.to_string());
            return;
        }
        self.emit_data_keeping_scenarios();
        self.compute_and_validate();
    }

    /// Applies a patch to the sales forecast through the full pipeline.
    pub fn update_sales_model(&mut self, updates: &SalesModelUpdate) {
        self.apply(Transition::Loading { active: true });

        let candidate = self.engine.data().sales.merged(updates);
        let outcome = validate::validate_sales_model(&candidate);
        if !outcome.is_valid {
            self.fail("Failed to update sales model", &outcome.errors.join(", "));
            return;
        }

        if let Err(err) = self.engine.update_sales_model(updates) {
            self.fail("Failed to update sales model", &err.to_string());
            return;
        }
        self.emit_data_keeping_scenarios();
        self.compute_and_validate();
    }

    /// Replaces the utilities list through the full pipeline.
    pub fn update_utilities(&mut self, items: Vec<Utility>) {
        self.apply(Transition::Loading { active: true });

        let outcome = validate_items(&items, validate::validate_utility, |u| u.name.as_str());
        if !outcome.is_valid {
            self.fail("Failed to update utilities", &outcome.errors.join(", "));
            return;
        }

        if let Err(err) = self.engine.update_utilities(items) {
            self.fail("Failed to update utilities", &err.to_string());
            return;
        }
        self.emit_data_keeping_scenarios();
        self.compute_and_validate();
    }

    /// Replaces the labor list through the full pipeline.
    pub fn update_labor(&mut self, items: Vec<LaborEntry>) {
        self.apply(Transition::Loading { active: true });

        let outcome = validate_items(&items, validate::validate_labor_entry, |l| l.role.as_str());
        if !outcome.is_valid {
            self.fail("Failed to update labor", &outcome.errors.join(", "));
            return;
        }

        if let Err(err) = self.engine.update_labor(items) {
            self.fail("Failed to update labor", &err.to_string());
            return;
        }
        self.emit_data_keeping_scenarios();
        self.compute_and_validate();
    }

    /// Replaces the fixed-costs list through the full pipeline.
    pub fn update_fixed_costs(&mut self, items: Vec<FixedCost>) {
        self.apply(Transition::Loading { active: true });

        let outcome = validate_items(&items, validate::validate_fixed_cost, |f| f.name.as_str());
        if !outcome.is_valid {
            self.fail("Failed to update fixed costs", &outcome.errors.join(", "));
            return;
        }

        if let Err(err) = self.engine.update_fixed_costs(items) {
            self.fail("Failed to update fixed costs", &err.to_string());
            return;
        }
        self.emit_data_keeping_scenarios();
        self.compute_and_validate();
    }

    // ---- scenario / import / export / reset ---------------------------------

    /// Switches the active scenario; unknown ids are rejected with an error
    /// state and leave the current id unchanged.
    pub fn set_current_scenario(&mut self, id: &str) {
        if self.state.scenarios.contains_key(id) {
            self.apply(Transition::Scenario { id: id.to_string() });
        } else {
            self.apply(Transition::Error {
                message: Some(format!("Scenario {id} not found")),
            });
        }
    }

    /// Replaces the whole model from exported JSON. The result is returned
    /// to the caller; failure also lands in the error state.
    pub fn import_data(&mut self, text: &str) -> ImportResult {
        let result = self.engine.import_json(text);
        if result.success {
            self.emit_data_from_engine();
            self.ensure_current_scenario();
            self.compute_and_validate();
            // Imported data invalidates every memoized outcome.
            self.validation_cache.clear();
        } else {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "Import failed".to_string());
            self.apply(Transition::Error {
                message: Some(message),
            });
        }
        result
    }

    /// Serializes the full model. The only public operation whose failure
    /// propagates to the caller: export is read-only, there is no container
    /// state to protect.
    ///
    /// # Errors
    /// Fails when serialization fails.
    pub fn export_data(&self) -> Result<String> {
        self.engine.export_json().map_err(|err| {
            error!(target: "prixfixe::state", %err, "export failed");
            err
        })
    }

    /// Wipes the persisted entries and reinitializes from engine defaults.
    pub fn reset(&mut self) {
        self.apply(Transition::Loading { active: true });
        if let Err(err) = self.try_reset() {
            self.fail("Reset failed", &err.to_string());
        }
    }

    fn try_reset(&mut self) -> Result<()> {
        self.store.remove(DATA_KEY).map_err(|e| {
            PlannerError::storage("clear_failed", e.to_string(), "manager:reset")
        })?;
        self.store.remove(SCENARIOS_KEY).map_err(|e| {
            PlannerError::storage("clear_failed", e.to_string(), "manager:reset")
        })?;

        // The keys are gone, so a fresh engine's init lands on defaults.
        let mut engine = FinanceEngine::new(self.store.clone());
        engine.init()?;
        self.engine = engine;

        self.emit_data_from_engine();
        self.ensure_current_scenario();
        self.compute_and_validate();
        self.validation_cache.clear();
        Ok(())
    }

    // ---- observation --------------------------------------------------------

    /// Registers an observer invoked with the snapshot on every transition.
    /// One successful mutation produces five notifications: loading, data,
    /// computation, validation, loading-off.
    pub fn subscribe(&mut self, callback: impl FnMut(&AppState) + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber_id);
        self.next_subscriber_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes exactly the given registration. Returns `false` (a no-op)
    /// when the id was already removed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// A value-copy of the current snapshot; mutating it never affects
    /// container-owned state.
    #[must_use]
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    #[must_use]
    pub fn data(&self) -> &Dataset {
        &self.state.dataset
    }

    #[must_use]
    pub fn computation_result(&self) -> Option<&ComputationResult> {
        self.state.last_computation.as_ref()
    }

    #[must_use]
    pub fn validation_results(&self) -> &[ValidationOutcome] {
        &self.state.last_validation
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    #[must_use]
    pub fn current_scenario_id(&self) -> &str {
        &self.state.current_scenario_id
    }

    #[must_use]
    pub fn current_scenario(&self) -> Option<&Scenario> {
        self.state.scenarios.get(&self.state.current_scenario_id)
    }

    #[must_use]
    pub fn scenarios(&self) -> &ScenarioMap {
        &self.state.scenarios
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.cache_hits,
            misses: self.cache_misses,
            entries: self.validation_cache.len(),
        }
    }

    /// Dismisses the current error without touching anything else.
    pub fn clear_error(&mut self) {
        self.apply(Transition::Error { message: None });
    }
}

/// Validates every element of a list payload, aggregating all failing
/// elements' messages into one combined outcome.
fn validate_items<T>(
    items: &[T],
    validate_one: impl Fn(&T) -> ValidationOutcome,
    label: impl Fn(&T) -> &str,
) -> ValidationOutcome {
    let mut combined = ValidationOutcome::pass();
    for (idx, item) in items.iter().enumerate() {
        combined.absorb(
            &format!("#{} ({})", idx + 1, label(item)),
            validate_one(item),
        );
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv_store::InMemoryKvStore;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn manager() -> StateManager {
        StateManager::new(Arc::new(InMemoryKvStore::new()))
    }

    #[test]
    fn construction_lands_on_defaults_with_computation() {
        let manager = manager();

        assert!(!manager.is_loading());
        assert!(manager.error().is_none());
        assert!(!manager.data().menu.is_empty());
        assert!(manager.computation_result().is_some());
        assert_eq!(manager.validation_results().len(), 1);
        assert!(manager.validation_results()[0].is_valid);
    }

    #[test]
    fn second_compute_on_same_version_hits_the_cache() {
        let mut manager = manager();
        let misses_after_init = manager.cache_stats().misses;

        // No data transition in between: same version, cache hit.
        manager.compute_and_validate();

        let stats = manager.cache_stats();
        assert_eq!(stats.misses, misses_after_init);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn data_mutation_bumps_the_version_and_misses_once() {
        let mut manager = manager();
        let misses_after_init = manager.cache_stats().misses;

        manager.update_fixed_costs(vec![FixedCost {
            name: "rent".to_string(),
            monthly_cost: Decimal::from(4000),
        }]);

        assert_eq!(manager.cache_stats().misses, misses_after_init + 1);
    }

    #[test]
    fn validate_items_aggregates_across_elements() {
        let items = vec![
            Utility {
                name: String::new(),
                monthly_cost: Decimal::from(10),
            },
            Utility {
                name: "water".to_string(),
                monthly_cost: Decimal::from(-5),
            },
        ];
        let outcome = validate_items(&items, validate::validate_utility, |u| u.name.as_str());

        assert!(!outcome.is_valid);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors[0].starts_with("#1"));
        assert!(outcome.errors[1].starts_with("#2 (water)"));
    }

    #[test]
    fn clear_error_only_clears_the_error() {
        let mut manager = manager();
        manager.set_current_scenario("nope");
        assert!(manager.error().is_some());

        let before = manager.state();
        manager.clear_error();

        assert!(manager.error().is_none());
        assert_eq!(manager.data(), &before.dataset);
        assert_eq!(manager.current_scenario_id(), before.current_scenario_id);
    }
}
