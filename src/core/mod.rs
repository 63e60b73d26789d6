//! Core domain: the financial model, its validation, computation, and the
//! state container that orchestrates them.
//!
//! # Architecture
//!
//! ```text
//! mutation intent → validate fragment → engine commit (transactional)
//!                 → DATA → compute → COMPUTATION → validate dataset
//!                 → VALIDATION → LOADING(false)
//!                   each transition: stamp, persist (DATA, best-effort),
//!                   notify subscribers
//! ```
//!
//! # Key concepts
//!
//! ## One snapshot
//!
//! All observable state lives in a single [`AppState`](state::AppState)
//! owned by the [`StateManager`](manager::StateManager). Subscribers receive
//! a reference to it after every transition; readers get value-copies.
//!
//! ## Transitions
//!
//! State only changes through the closed [`Transition`](state::Transition)
//! set. Entering loading clears the error; an error forces loading off;
//! every transition stamps the snapshot's timestamp.
//!
//! ## Validation as data
//!
//! Category rules gate mutations (a failing payload never touches the
//! dataset); the whole-dataset pass after each accepted mutation is reported
//! as state, not as a pipeline error, and is memoized per dataset version.
//!
//! ## Scenarios
//!
//! Named parameterizations of the forecast. Every computation result embeds
//! a projection per scenario, so switching scenarios is a pure selection.
//!
//! # Modules
//!
//! - [`model`] - dataset and scenario types
//! - [`validate`] - validation rules
//! - [`compute`] - pure P&L/KPI derivation
//! - [`engine`] - finance engine (mutation, defaults, import/export, save)
//! - [`state`] - snapshot and transitions
//! - [`manager`] - the state container
//! - [`error`] - structured error types

pub mod compute;
pub mod engine;
pub mod error;
pub mod manager;
pub mod model;
pub mod state;
pub mod validate;
