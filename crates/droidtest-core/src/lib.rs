//! Core library for droidtest.
//!
//! droidtest drives Android instrumentation tests for an SDK split into
//! logical modules (base, conference, p2p, ...). The flow is strictly
//! sequential: a JSON case catalog is loaded, each module's test artifacts
//! are assembled and installed through the Gradle wrapper, every listed case
//! is executed on the device through `adb shell am instrument`, and the
//! captured output is analyzed into per-module pass/fail counts.
//!
//! # Components
//!
//! - [`catalog`] - loads and validates the JSON case catalog
//! - [`caselist`] - generates a catalog by scanning test sources
//! - [`gradle`] - wrapper around the project's Gradle wrapper script
//! - [`adb`] - wrapper around the Android debug bridge
//! - [`driver`] - per-module build/install/run/capture cycle
//! - [`analyzer`] - line-oriented analysis of instrumentation output
//! - [`junit`] - structured analysis of JUnit XML reports
//! - [`settings`] - scoped checkpoint/patch/restore of `settings.gradle`
//! - [`orchestrator`] - run sequencing and outcome aggregation
//!
//! The only shared mutable resource is the project's `settings.gradle`,
//! which [`settings::SettingsGuard`] checkpoints before patching in the
//! test submodules and restores on every exit path.

pub mod adb;
pub mod analyzer;
pub mod catalog;
pub mod caselist;
pub mod driver;
pub mod gradle;
pub mod junit;
pub mod orchestrator;
pub mod settings;
pub mod types;

// Re-export key types for convenience
pub use catalog::CatalogEntry;
pub use orchestrator::{RunPlan, RunReport};
pub use types::{DroidtestError, ModuleOutcome, ModuleSpec, ResultSummary, RunRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
