//! dprof library - capture, reconcile and reapply Windows display topologies.
//!
//! This library exposes the core functionality of the `dprof` CLI for use in
//! tests and other applications.
//!
//! # Modules
//!
//! - `platform`: Native display configuration layer (Windows backend and mock)
//! - `engine`: Capture, adapter reconciliation, clone repair, validation and apply
//! - `snapshot`: Snapshot data model, structural equality and the SQLite store
//! - `report`: Human-readable snapshot descriptions
//! - `config`: Engine configuration files
//! - `error`: Error types with user-recoverable hints
//! - `output`: Output mode abstraction (robot/human)
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod platform;
pub mod report;
pub mod snapshot;
pub mod theme;
