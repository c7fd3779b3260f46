//! Wires the planning kernel, risk gates, OMS and ledger into one
//! crash-safe cycle: configuration, logging, the per-cycle runner, and
//! startup recovery.

pub mod config;
pub mod cycle;
pub mod logging;
pub mod startup;

pub use config::Config;
pub use cycle::{CycleOutcome, CycleRunner};
pub use startup::{run_startup_recovery, StartupOutcome};
