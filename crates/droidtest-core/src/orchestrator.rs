//! Run sequencing and outcome aggregation.
//!
//! A run is strictly sequential: optional dependency rebuild, settings
//! patch, one build-install-run-analyze cycle per catalog entry, settings
//! restore, aggregate verdict. The device is a single shared resource, so
//! nothing overlaps.
//!
//! Outcomes are threaded through an explicit accumulator rather than any
//! process-wide state; the caller derives the process exit status from
//! [`RunReport::all_passed`].

use crate::adb::Adb;
use crate::analyzer;
use crate::catalog::CatalogEntry;
use crate::driver::DeviceTestDriver;
use crate::gradle::Gradle;
use crate::junit;
use crate::settings::SettingsGuard;
use crate::types::{DroidtestError, ModuleOutcome, ModuleSpec, ResultSummary, RunRecord};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Dependency rebuild configuration for the optional first step of a run.
#[derive(Debug, Clone)]
pub struct DepsRebuild {
    /// Packaging command invoked at the project root (program plus args).
    pub pack_command: Vec<String>,
    /// Directory the packaging step leaves the built libraries in,
    /// relative to the project root.
    pub dist_libs_dir: PathBuf,
    /// Directory the test modules resolve their dependencies from,
    /// relative to the project root. Replaced wholesale on rebuild.
    pub test_libs_dir: PathBuf,
    /// Files inside the copied tree to move up to its root, as some test
    /// projects expect flat jar paths.
    pub promote: Vec<String>,
}

/// Everything one orchestrated run needs, resolved up front.
#[derive(Debug)]
pub struct RunPlan {
    /// Root of the SDK checkout being tested.
    pub project_root: PathBuf,
    /// Catalog entries to drive, in order.
    pub entries: Vec<CatalogEntry>,
    /// Known module descriptions; entries referencing unknown modules are
    /// counted as failures.
    pub modules: Vec<ModuleSpec>,
    /// Directory receiving result and logcat files.
    pub log_dir: PathBuf,
    /// Target device serial; `None` means the only attached device.
    pub device: Option<String>,
    /// Timestamp suffix for log-file naming.
    pub timestamp: String,
    /// Bulk suite execution with structured report analysis.
    pub unit_mode: bool,
    /// Rebuild dependency artifacts before anything else.
    pub rebuild_deps: Option<DepsRebuild>,
    /// Project configuration file to patch, relative to the project root.
    pub settings_file: PathBuf,
    /// Include lines appended to the settings file for the run.
    pub extra_includes: String,
    /// Echo external tool invocations.
    pub verbose: bool,
}

/// Aggregated result of one orchestrated run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// RFC 3339 timestamp taken when the report was assembled.
    pub generated_at: String,
    /// Per-module outcomes in catalog order.
    pub outcomes: Vec<ModuleOutcome>,
}

impl RunReport {
    /// Wraps the accumulated outcomes with a generation timestamp.
    pub fn new(outcomes: Vec<ModuleOutcome>) -> Self {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            generated_at,
            outcomes,
        }
    }

    /// Overall verdict: the logical AND of all module outcomes.
    ///
    /// An empty catalog passes vacuously: nothing was requested, nothing
    /// failed.
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.passed)
    }

    /// Prints the per-module breakdown and overall verdict.
    pub fn print_summary(&self) {
        println!();
        for outcome in &self.outcomes {
            println!(
                "  {}: {}/{} passed ({} failed, {} errored) -> {}",
                outcome.module,
                outcome.summary.succeeded,
                outcome.summary.total,
                outcome.summary.failed,
                outcome.summary.errored,
                if outcome.passed { "OK" } else { "FAILED" }
            );
        }
        if self.outcomes.is_empty() {
            println!("  no modules were requested");
        }
        println!(
            "\nOverall: {}",
            if self.all_passed() { "PASSED" } else { "FAILED" }
        );
    }
}

/// Returns the current unix time as a log-file timestamp suffix.
pub fn default_timestamp() -> String {
    OffsetDateTime::now_utc().unix_timestamp().to_string()
}

/// Executes the whole plan and returns the aggregated report.
///
/// Dependency-rebuild failures abort before the settings file is touched.
/// Once patched, the settings file is restored on every exit path; the
/// explicit restore on the success path surfaces restore errors instead of
/// downgrading them to a drop-time warning.
pub fn run(plan: &RunPlan) -> Result<RunReport, DroidtestError> {
    if let Some(deps) = &plan.rebuild_deps {
        rebuild_dependencies(&plan.project_root, deps)?;
    }

    let settings_path = plan.project_root.join(&plan.settings_file);
    let mut guard = SettingsGuard::patch(&settings_path, &plan.extra_includes)?;

    let driver = DeviceTestDriver::new(
        Gradle::new(&plan.project_root).verbose(plan.verbose),
        Adb::new(plan.device.clone()).verbose(plan.verbose),
        &plan.project_root,
        &plan.log_dir,
        plan.timestamp.clone(),
    );

    let mut outcomes = Vec::with_capacity(plan.entries.len());
    for entry in &plan.entries {
        let Some(module) = find_module(&plan.modules, &entry.module) else {
            println!(
                "Warning: catalog references unknown module '{}', counting it as failed",
                entry.module
            );
            outcomes.push(ModuleOutcome::failed(entry.module.clone()));
            continue;
        };

        match run_module(&driver, module, entry, plan.unit_mode) {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                println!("Warning: module {} run failed: {}", entry.module, e);
                outcomes.push(ModuleOutcome::failed(entry.module.clone()));
            }
        }
    }

    guard.restore()?;

    Ok(RunReport::new(outcomes))
}

/// Looks up a module description by catalog name.
pub fn find_module<'a>(modules: &'a [ModuleSpec], name: &str) -> Option<&'a ModuleSpec> {
    modules.iter().find(|module| module.name == name)
}

fn run_module(
    driver: &DeviceTestDriver,
    module: &ModuleSpec,
    entry: &CatalogEntry,
    unit_mode: bool,
) -> Result<ModuleOutcome, DroidtestError> {
    driver.install(module)?;

    // The device is shared; installed artifacts are cleaned up even when
    // driving or analysis fails.
    let summary = drive_and_analyze(driver, module, entry, unit_mode);

    if let Err(e) = driver.uninstall(module) {
        println!("Warning: failed to uninstall {}: {}", module.name, e);
    }

    Ok(ModuleOutcome::from_summary(&module.name, summary?))
}

fn drive_and_analyze(
    driver: &DeviceTestDriver,
    module: &ModuleSpec,
    entry: &CatalogEntry,
    unit_mode: bool,
) -> Result<ResultSummary, DroidtestError> {
    let record = if unit_mode {
        driver.drive_suite(module)?
    } else {
        driver.drive_cases(module, &entry.cases)?
    };
    analyze_record(&record, unit_mode)
}

/// Derives a module's counts from its captured output.
///
/// Instrumentation records are reconciled against the requested case count;
/// bulk records are read from the pulled JUnit report when one was expected,
/// falling back to the legacy text summary otherwise.
pub fn analyze_record(
    record: &RunRecord,
    unit_mode: bool,
) -> Result<ResultSummary, DroidtestError> {
    if unit_mode {
        if let Some(report) = &record.report_file {
            return Ok(junit::analyze_report(report));
        }
        let text = read_captured(&record.result_file)?;
        return Ok(analyzer::analyze_unit_text(&text));
    }

    let text = read_captured(&record.result_file)?;
    Ok(analyzer::analyze_instrumentation(&text, record.expected))
}

/// Reads a captured output file, treating a never-created file (a run with
/// zero invocations) as empty output.
fn read_captured(path: &Path) -> Result<String, DroidtestError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

fn rebuild_dependencies(project_root: &Path, deps: &DepsRebuild) -> Result<(), DroidtestError> {
    let Some((program, args)) = deps.pack_command.split_first() else {
        return Err(DroidtestError::Build(
            "dependency rebuild requested but the pack command is empty".to_string(),
        ));
    };

    println!("> building sdk libraries...");
    let output = Command::new(program)
        .args(args)
        .current_dir(project_root)
        .output()
        .map_err(|e| DroidtestError::Build(format!("failed to run {}: {}", program, e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DroidtestError::Build(format!(
            "dependency build failed: {}",
            stderr.trim()
        )));
    }
    println!("> done.");

    println!("> copying libs to dependency dirs...");
    let src = project_root.join(&deps.dist_libs_dir);
    let dest = project_root.join(&deps.test_libs_dir);
    if dest.exists() {
        fs::remove_dir_all(&dest)?;
    }
    copy_dir_all(&src, &dest)?;
    promote_artifacts(&dest, &deps.promote)?;
    println!("> done.");

    Ok(())
}

fn copy_dir_all(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn promote_artifacts(root: &Path, promote: &[String]) -> io::Result<()> {
    for relative in promote {
        let from = root.join(relative);
        if !from.is_file() {
            continue;
        }
        if let Some(name) = from.file_name() {
            fs::rename(&from, root.join(name))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record_with_output(dir: &Path, output: &str, expected: u32) -> RunRecord {
        let result_file = dir.join("base-test-result-1700000000.log");
        fs::write(&result_file, output).unwrap();
        RunRecord {
            module: "base".to_string(),
            result_file,
            logcat_file: dir.join("base-logcat-1700000000.log"),
            report_file: None,
            expected,
        }
    }

    #[test]
    fn two_markers_for_two_cases_is_a_pass() {
        let temp_dir = TempDir::new().unwrap();
        let record = record_with_output(temp_dir.path(), "OK (1 test)\nOK (1 test)\n", 2);

        let summary = analyze_record(&record, false).unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.total, 2);

        let report = RunReport::new(vec![ModuleOutcome::from_summary("base", summary)]);
        assert!(report.all_passed());
    }

    #[test]
    fn one_missing_marker_fails_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let record = record_with_output(temp_dir.path(), "OK (1 test)\nnothing here\n", 2);

        let summary = analyze_record(&record, false).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.total, 2);

        let report = RunReport::new(vec![ModuleOutcome::from_summary("base", summary)]);
        assert!(!report.all_passed());
    }

    #[test]
    fn empty_catalog_passes_vacuously() {
        let report = RunReport::new(Vec::new());
        assert!(report.all_passed());
    }

    #[test]
    fn one_failing_module_fails_the_aggregate() {
        let passing = ResultSummary {
            total: 1,
            succeeded: 1,
            failed: 0,
            errored: 0,
        };
        let report = RunReport::new(vec![
            ModuleOutcome::from_summary("base", passing),
            ModuleOutcome::failed("p2p"),
        ]);
        assert!(!report.all_passed());
    }

    #[test]
    fn never_created_result_file_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let record = RunRecord {
            module: "base".to_string(),
            result_file: temp_dir.path().join("absent.log"),
            logcat_file: temp_dir.path().join("absent-logcat.log"),
            report_file: None,
            expected: 1,
        };

        let summary = analyze_record(&record, false).unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.succeeded, 0);
    }

    #[test]
    fn unit_record_prefers_the_pulled_report() {
        let temp_dir = TempDir::new().unwrap();
        let report_file = temp_dir.path().join("base-report-1700000000.xml");
        fs::write(&report_file, r#"<testsuite tests="10" failures="2" errors="1"/>"#).unwrap();
        let mut record = record_with_output(temp_dir.path(), "Tests run: 4, Failures: 4\n", 0);
        record.report_file = Some(report_file);

        let summary = analyze_record(&record, true).unwrap();
        assert_eq!(summary.succeeded, 7);
        assert_eq!(summary.total, 10);
    }

    #[test]
    fn unit_record_falls_back_to_text_summary() {
        let temp_dir = TempDir::new().unwrap();
        let record = record_with_output(temp_dir.path(), "Tests run: 4, Failures: 1\n", 0);

        let summary = analyze_record(&record, true).unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
    }

    #[test]
    fn finds_modules_by_name() {
        let modules = vec![ModuleSpec {
            name: "base".to_string(),
            project_dir: PathBuf::from("test/base"),
            target_package: "com.rtc.test.base".to_string(),
            logcat_tag: "com.rtc.test.base".to_string(),
            runner: "android.test.InstrumentationTestRunner".to_string(),
            source_dir: PathBuf::from("test/base/src"),
            report_path: None,
        }];
        assert!(find_module(&modules, "base").is_some());
        assert!(find_module(&modules, "p2p").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn uninstall_runs_even_when_driving_fails() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        // Gradle wrapper stub recording every task invocation.
        let gradle_log = root.join("gradle-invocations.log");
        fs::write(
            root.join("gradlew"),
            format!("#!/bin/sh\necho \"$@\" >> {}\n", gradle_log.display()),
        )
        .unwrap();
        fs::set_permissions(root.join("gradlew"), fs::Permissions::from_mode(0o755)).unwrap();

        // adb resolved from PATH always fails, so driving stops at the
        // first `logcat -c`.
        let bin = root.join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("adb"), "#!/bin/sh\nexit 1\n").unwrap();
        fs::set_permissions(bin.join("adb"), fs::Permissions::from_mode(0o755)).unwrap();

        let original_path = std::env::var_os("PATH").unwrap_or_default();
        let mut paths = vec![bin.clone()];
        paths.extend(std::env::split_paths(&original_path));
        let patched = std::env::join_paths(paths).unwrap();
        unsafe { std::env::set_var("PATH", &patched) };

        let driver = DeviceTestDriver::new(
            Gradle::new(root),
            Adb::new(None),
            root,
            root.join("logs"),
            "1700000000",
        );
        let module = ModuleSpec {
            name: "base".to_string(),
            project_dir: PathBuf::from("."),
            target_package: "com.rtc.test.base".to_string(),
            logcat_tag: "com.rtc.test.base".to_string(),
            runner: "android.test.InstrumentationTestRunner".to_string(),
            source_dir: PathBuf::from("src"),
            report_path: None,
        };
        let entry = CatalogEntry {
            module: "base".to_string(),
            cases: vec!["StreamTest#testCreate".to_string()],
        };

        let result = run_module(&driver, &module, &entry, false);
        unsafe { std::env::set_var("PATH", &original_path) };

        assert!(result.is_err());
        let invocations = fs::read_to_string(&gradle_log).unwrap();
        assert!(invocations.contains("uninstallDebugAndroidTest"));
        assert!(invocations.contains("uninstallDebug"));
    }

    #[test]
    fn copies_nested_dependency_trees() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("dist/libs");
        fs::create_dir_all(src.join("webrtc")).unwrap();
        fs::write(src.join("sdk.jar"), "jar").unwrap();
        fs::write(src.join("webrtc/libwebrtc.jar"), "jar").unwrap();
        let dest = temp_dir.path().join("test/libs");

        copy_dir_all(&src, &dest).unwrap();
        promote_artifacts(&dest, &["webrtc/libwebrtc.jar".to_string()]).unwrap();

        assert!(dest.join("sdk.jar").is_file());
        assert!(dest.join("libwebrtc.jar").is_file());
        assert!(!dest.join("webrtc/libwebrtc.jar").exists());
    }
}
