//! Per-module device test driving.
//!
//! For each module the driver assembles and installs the debug and
//! androidTest artifacts through Gradle, then executes tests on the device
//! through the instrumentation runner. Before every execution the rolling
//! device log is cleared; afterwards a snapshot filtered by the module's
//! logcat tag is appended to the module's logcat file and the raw stdout of
//! the execution is appended to the module's result file.
//!
//! A failing individual invocation is captured and counted but never aborts
//! the remaining cases in the batch.

use crate::adb::Adb;
use crate::gradle::Gradle;
use crate::types::{DroidtestError, ModuleSpec, RunRecord};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Gradle tasks that build and install a module's test artifacts, in order.
const INSTALL_TASKS: &[&str] = &[
    "assembleDebug",
    "assembleDebugAndroidTest",
    "installDebug",
    "installDebugAndroidTest",
];

/// Gradle tasks that remove a module's artifacts from the device.
const UNINSTALL_TASKS: &[&str] = &["uninstallDebugAndroidTest", "uninstallDebug"];

/// Attempts made when pulling the on-device report file.
const PULL_ATTEMPTS: u32 = 3;

/// Drives one module's build-install-run-capture cycle.
pub struct DeviceTestDriver {
    gradle: Gradle,
    adb: Adb,
    project_root: PathBuf,
    log_dir: PathBuf,
    timestamp: String,
}

impl DeviceTestDriver {
    /// Creates a driver writing its result and logcat files under `log_dir`,
    /// suffixed with `timestamp` for unique, sortable names.
    pub fn new(
        gradle: Gradle,
        adb: Adb,
        project_root: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            gradle,
            adb,
            project_root: project_root.into(),
            log_dir: log_dir.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Builds and installs the module's test artifacts on the device.
    pub fn install(&self, module: &ModuleSpec) -> Result<(), DroidtestError> {
        println!("> building and installing test module {}", module.name);
        let project_dir = self.project_root.join(&module.project_dir);
        for task in INSTALL_TASKS {
            self.gradle.run_task(task, &project_dir)?;
        }
        println!("> done.");
        Ok(())
    }

    /// Removes the module's artifacts from the device.
    ///
    /// Best-effort cleanup between modules; the device state is shared, so
    /// leftovers from one module must not leak into the next.
    pub fn uninstall(&self, module: &ModuleSpec) -> Result<(), DroidtestError> {
        let project_dir = self.project_root.join(&module.project_dir);
        for task in UNINSTALL_TASKS {
            self.gradle.run_task(task, &project_dir)?;
        }
        Ok(())
    }

    /// Runs every listed case through one instrumentation invocation each.
    ///
    /// Returns the run record pointing at the captured files. A case whose
    /// invocation reports failure is captured like any other and the batch
    /// continues.
    pub fn drive_cases(
        &self,
        module: &ModuleSpec,
        cases: &[String],
    ) -> Result<RunRecord, DroidtestError> {
        let record = self.new_record(module, cases.len() as u32, None)?;

        for case in cases {
            println!(
                "> running {} on device{}",
                case,
                self.adb
                    .serial()
                    .map(|s| format!(" {}", s))
                    .unwrap_or_default()
            );

            self.adb.clear_logcat()?;
            let output = self
                .adb
                .instrument_case(&module.target_package, &module.runner, case)?;
            append_to(&record.result_file, &output.stdout)?;
            if !output.status_ok {
                println!("Warning: instrumentation invocation for {} exited nonzero", case);
            }

            let snapshot = self.adb.dump_logcat(&module.logcat_tag)?;
            append_to(&record.logcat_file, &snapshot)?;
        }

        Ok(record)
    }

    /// Runs the module's full suite in a single bulk invocation.
    ///
    /// When the module declares an on-device report path, the JUnit XML
    /// report is pulled next to the captured output; a failed pull is
    /// reported as a warning and leaves the analyzer to degrade to zero
    /// counts.
    pub fn drive_suite(&self, module: &ModuleSpec) -> Result<RunRecord, DroidtestError> {
        let report_file = module
            .report_path
            .as_ref()
            .map(|_| self.log_file(&module.name, "report", "xml"));
        let record = self.new_record(module, 0, report_file)?;

        println!("> running full suite for module {}", module.name);
        self.adb.clear_logcat()?;
        let output = self
            .adb
            .instrument_all(&module.target_package, &module.runner)?;
        append_to(&record.result_file, &output.stdout)?;
        if !output.status_ok {
            println!(
                "Warning: bulk instrumentation for {} exited nonzero",
                module.name
            );
        }

        let snapshot = self.adb.dump_logcat(&module.logcat_tag)?;
        append_to(&record.logcat_file, &snapshot)?;

        if let (Some(remote), Some(local)) = (&module.report_path, &record.report_file) {
            if let Err(e) = self.adb.pull_with_retries(remote, local, PULL_ATTEMPTS) {
                println!("Warning: could not pull report for {}: {}", module.name, e);
            }
        }

        Ok(record)
    }

    fn new_record(
        &self,
        module: &ModuleSpec,
        expected: u32,
        report_file: Option<PathBuf>,
    ) -> Result<RunRecord, DroidtestError> {
        fs::create_dir_all(&self.log_dir)?;
        Ok(RunRecord {
            module: module.name.clone(),
            result_file: self.log_file(&module.name, "test-result", "log"),
            logcat_file: self.log_file(&module.name, "logcat", "log"),
            report_file,
            expected,
        })
    }

    fn log_file(&self, module: &str, kind: &str, extension: &str) -> PathBuf {
        self.log_dir
            .join(format!("{}-{}-{}.{}", module, kind, self.timestamp, extension))
    }
}

fn append_to(path: &Path, text: &str) -> Result<(), DroidtestError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}
