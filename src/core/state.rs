//! The application state snapshot and its transitions.
//!
//! All observable state lives in one snapshot. Transitions are a closed set;
//! applying one stamps the snapshot's timestamp and upholds the coupling
//! rules between loading and error (entering loading clears the error, an
//! error forces loading off).

use crate::core::compute::ComputationResult;
use crate::core::model::{Dataset, Scenario, ScenarioMap};
use crate::core::validate::ValidationOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single owned snapshot of application state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub dataset: Dataset,
    pub scenarios: ScenarioMap,
    /// Always a key of `scenarios`.
    pub current_scenario_id: String,
    /// Last successful computation, attributed to the dataset and scenario
    /// it was computed under.
    pub last_computation: Option<ComputationResult>,
    /// Outcomes of the most recent validation pass (length ≤ 1).
    pub last_validation: Vec<ValidationOutcome>,
    /// True exactly while a mutation pipeline is in flight.
    pub is_loading: bool,
    pub last_error: Option<String>,
    /// Stamped on every accepted transition.
    pub updated_at: DateTime<Utc>,
}

impl AppState {
    /// The empty pre-initialization state. Seeds a bare base scenario so
    /// `current_scenario_id` is a key of `scenarios` from the start, even
    /// when initialization later fails.
    #[must_use]
    pub fn empty() -> Self {
        let base = Scenario::base();
        let current = base.id.clone();
        Self {
            dataset: Dataset::default(),
            scenarios: std::iter::once((base.id.clone(), base)).collect(),
            current_scenario_id: current,
            last_computation: None,
            last_validation: Vec::new(),
            is_loading: false,
            last_error: None,
            updated_at: Utc::now(),
        }
    }

    /// Applies a transition in place, stamping the timestamp.
    pub fn apply_mut(&mut self, transition: &Transition, now: DateTime<Utc>) {
        match transition {
            Transition::Data { dataset, scenarios } => {
                self.dataset.clone_from(dataset);
                self.scenarios.clone_from(scenarios);
            }
            Transition::Scenario { id } => {
                self.current_scenario_id.clone_from(id);
            }
            Transition::Computation { result } => {
                self.last_computation = Some(result.clone());
            }
            Transition::Validation { outcomes } => {
                self.last_validation.clone_from(outcomes);
            }
            Transition::Error { message } => {
                self.last_error.clone_from(message);
                self.is_loading = false;
            }
            Transition::Loading { active } => {
                self.is_loading = *active;
                if *active {
                    self.last_error = None;
                }
            }
        }
        self.updated_at = now;
    }
}

/// The closed set of state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Replace the dataset and scenario map.
    Data {
        dataset: Dataset,
        scenarios: ScenarioMap,
    },
    /// Replace the active scenario id (existence pre-checked by the caller).
    Scenario { id: String },
    /// Replace the last computation result.
    Computation { result: ComputationResult },
    /// Replace the last validation outcomes.
    Validation { outcomes: Vec<ValidationOutcome> },
    /// Set or clear the error message; forces loading off.
    Error { message: Option<String> },
    /// Set the loading flag; entering loading clears any prior error.
    Loading { active: bool },
}

impl Transition {
    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data { .. } => "data",
            Self::Scenario { .. } => "scenario",
            Self::Computation { .. } => "computation",
            Self::Validation { .. } => "validation",
            Self::Error { .. } => "error",
            Self::Loading { .. } => "loading",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_upholds_the_scenario_invariant() {
        let state = AppState::empty();
        assert!(state.scenarios.contains_key(&state.current_scenario_id));
    }

    #[test]
    fn loading_clears_error() {
        let mut state = AppState::empty();
        state.last_error = Some("boom".to_string());

        state.apply_mut(&Transition::Loading { active: true }, Utc::now());
        assert!(state.is_loading);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn leaving_loading_keeps_error_untouched() {
        let mut state = AppState::empty();
        state.apply_mut(
            &Transition::Error {
                message: Some("boom".to_string()),
            },
            Utc::now(),
        );
        state.apply_mut(&Transition::Loading { active: false }, Utc::now());
        assert_eq!(state.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn error_forces_loading_off() {
        let mut state = AppState::empty();
        state.apply_mut(&Transition::Loading { active: true }, Utc::now());
        state.apply_mut(
            &Transition::Error {
                message: Some("boom".to_string()),
            },
            Utc::now(),
        );

        assert!(!state.is_loading);
        assert_eq!(state.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn clearing_error_with_none_message() {
        let mut state = AppState::empty();
        state.apply_mut(
            &Transition::Error {
                message: Some("boom".to_string()),
            },
            Utc::now(),
        );
        state.apply_mut(&Transition::Error { message: None }, Utc::now());
        assert!(state.last_error.is_none());
    }

    #[test]
    fn every_transition_stamps_the_timestamp() {
        let mut state = AppState::empty();
        let stamp = Utc::now() + chrono::Duration::seconds(5);
        state.apply_mut(&Transition::Loading { active: false }, stamp);
        assert_eq!(state.updated_at, stamp);
    }
}
