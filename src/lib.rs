//! prixfixe - financial planning for small restaurants.
//!
//! This crate provides the core library functionality for prixfixe: the
//! financial model, the computation engine deriving profitability KPIs, and
//! the state container keeping everything consistent, validated, cached,
//! and persisted.

pub mod cli;
pub mod core;
pub mod storage;
