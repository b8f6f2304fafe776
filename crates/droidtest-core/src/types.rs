//! Core types for droidtest-core.
//!
//! This module defines the fundamental types used throughout the library:
//!
//! - [`DroidtestError`] - error taxonomy for catalog, build, and device failures
//! - [`ModuleSpec`] - static description of one test module
//! - [`RunRecord`] - per-module bookkeeping created while driving tests
//! - [`ResultSummary`] - pass/fail counts derived from captured output
//! - [`ModuleOutcome`] - one module's aggregated result

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Error types for droidtest operations.
///
/// Catalog and build errors are fatal to the whole run. Report-parse
/// problems and individual failing test invocations are deliberately *not*
/// represented here: they are contained in [`ResultSummary`] counts and only
/// surface in the final pass/fail decision.
#[derive(Debug, thiserror::Error)]
pub enum DroidtestError {
    /// The case catalog file is missing or is not valid JSON.
    ///
    /// Surfaced before any device interaction happens.
    #[error("catalog error: {0}. Check the case list JSON file")]
    Catalog(String),

    /// An external build step returned a nonzero exit status.
    ///
    /// This covers the optional dependency rebuild as well as Gradle
    /// assemble/install tasks.
    #[error("build error: {0}")]
    Build(String),

    /// The device bridge could not be invoked.
    ///
    /// A test that *runs* but fails is not a device error; this variant is
    /// reserved for adb itself being unavailable or refusing the command.
    #[error("device bridge error: {0}. Check that adb is on PATH and a device is attached")]
    Device(String),

    /// An I/O error occurred while writing result or log files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed while writing a generated catalog.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Static description of one test module.
///
/// A module is a named group of tests covering one SDK area. The driver
/// needs to know where its Gradle project lives, which Android package the
/// instrumentation targets, and which logcat tag to snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Module name as it appears in the case catalog (e.g. "base").
    pub name: String,

    /// Gradle project directory for the module's tests, relative to the
    /// project root.
    pub project_dir: PathBuf,

    /// Android package the instrumentation runner targets
    /// (e.g. "com.rtc.test.base").
    pub target_package: String,

    /// Logcat tag used when snapshotting the device log after each case.
    ///
    /// Defaults to the target package when not configured.
    pub logcat_tag: String,

    /// Instrumentation runner class.
    pub runner: String,

    /// Directory holding the module's test sources, used by caselist
    /// generation.
    pub source_dir: PathBuf,

    /// On-device path of the JUnit XML report produced in bulk (unit-test)
    /// mode. When absent, bulk runs fall back to the legacy text summary.
    pub report_path: Option<String>,
}

/// Per-module bookkeeping of where captured output was written and how many
/// cases were requested.
///
/// Created fresh by the driver at the start of a module run and read once by
/// the analyzer. Only the on-disk files outlive the process.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Module this record belongs to.
    pub module: String,

    /// File collecting the raw stdout of every instrumentation invocation.
    pub result_file: PathBuf,

    /// File collecting the per-case logcat snapshots.
    pub logcat_file: PathBuf,

    /// Local copy of the pulled JUnit XML report, bulk mode only.
    pub report_file: Option<PathBuf>,

    /// Number of cases requested for this module.
    ///
    /// The analyzer's `total` must reconcile with this; a shortfall means a
    /// crashed or hung run and is counted as failure.
    pub expected: u32,
}

/// Pass/fail counts derived from a module's captured output.
///
/// A pure derivation of file content; computing it twice over the same
/// input yields identical counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// Number of cases that were expected to run.
    pub total: u32,
    /// Number of cases with a recognized pass marker.
    pub succeeded: u32,
    /// Number of cases without a pass marker (includes crashed/hung runs).
    pub failed: u32,
    /// Number of harness-level error markers seen in the output.
    pub errored: u32,
}

impl ResultSummary {
    /// A module passes when every requested case succeeded and at least one
    /// case was requested. An empty run is not a pass: zero counts are what
    /// a missing or unparsable report degrades to.
    pub fn passed(&self) -> bool {
        self.total != 0 && self.succeeded == self.total
    }
}

/// One module's aggregated result, accumulated by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutcome {
    /// Module name.
    pub module: String,
    /// Counts derived from the captured output.
    pub summary: ResultSummary,
    /// Whether the module counts as passed for the overall run.
    pub passed: bool,
}

impl ModuleOutcome {
    /// Builds an outcome from a summary, deriving the pass flag.
    pub fn from_summary(module: impl Into<String>, summary: ResultSummary) -> Self {
        Self {
            module: module.into(),
            passed: summary.passed(),
            summary,
        }
    }

    /// Outcome for a module whose run never produced analyzable output.
    pub fn failed(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            summary: ResultSummary::default(),
            passed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_passes_when_all_succeeded() {
        let summary = ResultSummary {
            total: 3,
            succeeded: 3,
            failed: 0,
            errored: 0,
        };
        assert!(summary.passed());
    }

    #[test]
    fn summary_fails_on_shortfall() {
        let summary = ResultSummary {
            total: 3,
            succeeded: 2,
            failed: 1,
            errored: 0,
        };
        assert!(!summary.passed());
    }

    #[test]
    fn zero_total_is_not_a_pass() {
        assert!(!ResultSummary::default().passed());
    }

    #[test]
    fn outcome_derives_pass_flag() {
        let summary = ResultSummary {
            total: 2,
            succeeded: 2,
            failed: 0,
            errored: 0,
        };
        let outcome = ModuleOutcome::from_summary("base", summary);
        assert!(outcome.passed);
        assert!(!ModuleOutcome::failed("base").passed);
    }
}
