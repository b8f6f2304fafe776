//! Gradle wrapper invocation.
//!
//! All builds go through the project's own `gradlew` script so the test run
//! uses the same Gradle version as a developer checkout. Tasks run quietly
//! by default; success or failure is judged solely by exit status.

use crate::types::DroidtestError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs Gradle tasks through the wrapper script at the project root.
pub struct Gradle {
    /// Absolute or root-relative path to the `gradlew` script.
    wrapper: PathBuf,
    /// Whether to echo each task invocation.
    verbose: bool,
}

impl Gradle {
    /// Creates a runner for the wrapper script inside `project_root`.
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            wrapper: project_root.as_ref().join("gradlew"),
            verbose: false,
        }
    }

    /// Enables echoing of task invocations.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Runs a single task with `dir` as the working directory.
    ///
    /// Blocks until Gradle exits. A nonzero exit status becomes a
    /// [`DroidtestError::Build`] carrying Gradle's stderr.
    pub fn run_task(&self, task: &str, dir: &Path) -> Result<(), DroidtestError> {
        if self.verbose {
            println!("  {} -q {} (in {})", self.wrapper.display(), task, dir.display());
        }

        let output = Command::new(&self.wrapper)
            .arg("-q")
            .arg(task)
            .current_dir(dir)
            .output()
            .map_err(|e| DroidtestError::Build(format!("failed to run gradle: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DroidtestError::Build(format!(
                "gradle task '{}' failed in {}: {}",
                task,
                dir.display(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}
