//! Per-process metrics collector.
//!
//! Tracks processes named by PID files or command line patterns, samples their
//! OS accounting data and answers namespaced metric requests of the form
//! `/staples/procfs/procstat/<process>/<field>`.

pub mod api;
pub mod cli;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

pub use error::{ProcstatError, Result};
