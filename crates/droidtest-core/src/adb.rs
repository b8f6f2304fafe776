//! Android debug bridge invocation.
//!
//! Thin wrapper over the `adb` binary. The device serial is optional: when
//! absent, adb resolves to the only attached device. Device selection is
//! always passed explicitly on the command line rather than through the
//! `ANDROID_SERIAL` environment variable, so no ambient state leaks into
//! other tool invocations.

use crate::types::DroidtestError;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Delay between artifact pull attempts.
const PULL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// The outcome of one instrumentation invocation.
///
/// A failing test is not an error: the raw output is captured either way and
/// classification happens later in the analyzer.
#[derive(Debug)]
pub struct InstrumentOutput {
    /// Verbatim stdout of the instrumentation run.
    pub stdout: String,
    /// Whether adb itself exited zero.
    pub status_ok: bool,
}

/// Invokes adb commands against one device.
#[derive(Debug, Clone)]
pub struct Adb {
    serial: Option<String>,
    verbose: bool,
}

impl Adb {
    /// Creates a bridge for the device with the given serial, or for the
    /// only attached device when `serial` is `None`.
    pub fn new(serial: Option<String>) -> Self {
        Self {
            serial,
            verbose: false,
        }
    }

    /// Enables echoing of each adb invocation.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Returns the serial this bridge targets, if any.
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("adb");
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output, DroidtestError> {
        if self.verbose {
            println!("  adb {}", args.join(" "));
        }
        self.command()
            .args(args)
            .output()
            .map_err(|e| DroidtestError::Device(format!("failed to run adb: {}", e)))
    }

    /// Clears the device's rolling log buffer.
    pub fn clear_logcat(&self) -> Result<(), DroidtestError> {
        let output = self.run(&["logcat", "-c"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DroidtestError::Device(format!(
                "logcat -c failed: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Dumps the current log buffer filtered to `tag` and returns it.
    pub fn dump_logcat(&self, tag: &str) -> Result<String, DroidtestError> {
        let output = self.run(&["logcat", "-d", "-s", tag])?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Runs a single named test case through the instrumentation runner.
    ///
    /// `case` is a `ClassName#methodName` identifier relative to
    /// `target_package`. The raw stdout is returned for capture even when
    /// the invocation reports failure.
    pub fn instrument_case(
        &self,
        target_package: &str,
        runner: &str,
        case: &str,
    ) -> Result<InstrumentOutput, DroidtestError> {
        let class = format!("{}.{}", target_package, case);
        let component = format!("{}.test/{}", target_package, runner);
        let output = self.run(&[
            "shell",
            "am",
            "instrument",
            "-w",
            "-r",
            "-e",
            "debug",
            "false",
            "-e",
            "class",
            class.as_str(),
            component.as_str(),
        ])?;
        Ok(InstrumentOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            status_ok: output.status.success(),
        })
    }

    /// Runs the module's whole suite in one instrumentation invocation.
    pub fn instrument_all(
        &self,
        target_package: &str,
        runner: &str,
    ) -> Result<InstrumentOutput, DroidtestError> {
        let component = format!("{}.test/{}", target_package, runner);
        let output = self.run(&[
            "shell",
            "am",
            "instrument",
            "-w",
            "-r",
            "-e",
            "debug",
            "false",
            component.as_str(),
        ])?;
        Ok(InstrumentOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            status_ok: output.status.success(),
        })
    }

    /// Pulls a file from the device, retrying a fixed number of times.
    ///
    /// The report file is written by the device-side runner and may not be
    /// flushed immediately after the instrumentation returns; a short
    /// retry loop absorbs that race.
    pub fn pull_with_retries(
        &self,
        remote: &str,
        local: &Path,
        attempts: u32,
    ) -> Result<(), DroidtestError> {
        let local_str = local.display().to_string();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let output = self.run(&["pull", remote, local_str.as_str()])?;
            if output.status.success() {
                return Ok(());
            }
            last_error = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if attempt < attempts {
                std::thread::sleep(PULL_RETRY_DELAY);
            }
        }

        Err(DroidtestError::Device(format!(
            "failed to pull {} after {} attempts: {}",
            remote, attempts, last_error
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_only_attached_device() {
        let adb = Adb::new(None);
        assert!(adb.serial().is_none());
        assert!(!adb.verbose);
    }

    #[test]
    fn carries_explicit_serial() {
        let adb = Adb::new(Some("emulator-5554".to_string()));
        assert_eq!(adb.serial(), Some("emulator-5554"));
    }
}
