//! Persistence layer.
//!
//! Snapshots of the financial model are persisted as opaque blobs in a
//! key-value store. Two entries exist: the serialized dataset
//! (`finance_data`) and the serialized scenario map (`finance_scenarios`).
//! Persistence is best-effort advisory: the state container never fails a
//! transition because a write failed.
//!
//! # Modules
//!
//! - [`kv_store`] - Store trait, in-memory and file-backed implementations

pub mod kv_store;
