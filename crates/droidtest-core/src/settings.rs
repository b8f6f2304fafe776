//! Scoped patching of the project's `settings.gradle`.
//!
//! The test submodules are not part of the normal build, so the orchestrator
//! appends their `include` lines for the duration of a run. The original
//! file is checkpointed to `settings.gradle.bk` first and moved back over
//! the patched copy when the guard goes out of scope, so the file round-trips
//! byte-for-byte on every exit path, including failures.

use crate::types::DroidtestError;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Include lines for the standard test submodules.
pub const DEFAULT_TEST_INCLUDES: &str = "include ':test:util',\
':test:base',\
':test:p2p:util', ':test:p2p:apiTest',\
':test:conference:util', ':test:conference:apiTest'";

/// Holds a checkpoint of `settings.gradle` and restores it on drop.
///
/// The guard is the only writer of the shared configuration file; keeping
/// restoration in `Drop` gives the copy-mutate-restore sequence try/finally
/// semantics without an explicit unwind path at every call site.
#[derive(Debug)]
pub struct SettingsGuard {
    original: PathBuf,
    backup: PathBuf,
    restored: bool,
}

impl SettingsGuard {
    /// Checkpoints `settings` and appends `extra_includes` to it.
    pub fn patch(settings: &Path, extra_includes: &str) -> Result<Self, DroidtestError> {
        let backup = backup_path(settings);
        fs::copy(settings, &backup)?;

        let mut guard = Self {
            original: settings.to_path_buf(),
            backup,
            restored: false,
        };

        if let Err(e) = append_includes(settings, extra_includes) {
            // Patch failed half-way; put the checkpoint back before bailing.
            let _ = guard.restore();
            return Err(e.into());
        }

        Ok(guard)
    }

    /// Moves the checkpoint back over the patched file.
    ///
    /// Idempotent; the drop handler calls this as a backstop, but callers
    /// on the success path should invoke it directly so a restore failure
    /// surfaces as an error instead of a warning.
    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        fs::rename(&self.backup, &self.original)?;
        self.restored = true;
        Ok(())
    }
}

impl Drop for SettingsGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            println!(
                "Warning: failed to restore {} from {}: {}",
                self.original.display(),
                self.backup.display(),
                e
            );
        }
    }
}

fn backup_path(settings: &Path) -> PathBuf {
    let mut name = settings
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".bk");
    settings.with_file_name(name)
}

fn append_includes(settings: &Path, extra_includes: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(settings)?;
    writeln!(file)?;
    write!(file, "{}", extra_includes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ORIGINAL: &str = "rootProject.name = 'sdk'\ninclude ':base'\n";

    fn settings_fixture() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.gradle");
        fs::write(&path, ORIGINAL).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn patch_appends_includes_and_keeps_backup() {
        let (_guard, path) = settings_fixture();

        let mut settings_guard = SettingsGuard::patch(&path, "include ':test:base'").unwrap();

        let patched = fs::read_to_string(&path).unwrap();
        assert!(patched.starts_with(ORIGINAL));
        assert!(patched.contains("include ':test:base'"));

        let backup = path.with_file_name("settings.gradle.bk");
        assert_eq!(fs::read_to_string(&backup).unwrap(), ORIGINAL);

        settings_guard.restore().unwrap();
    }

    #[test]
    fn restore_round_trips_content_exactly() {
        let (_guard, path) = settings_fixture();

        let mut settings_guard =
            SettingsGuard::patch(&path, DEFAULT_TEST_INCLUDES).unwrap();
        settings_guard.restore().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), ORIGINAL);
        assert!(!path.with_file_name("settings.gradle.bk").exists());
    }

    #[test]
    fn drop_restores_on_early_exit() {
        let (_guard, path) = settings_fixture();

        {
            let _settings_guard =
                SettingsGuard::patch(&path, "include ':test:base'").unwrap();
            // Scope ends without an explicit restore, as it would when a
            // module run returns an error.
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), ORIGINAL);
    }

    #[test]
    fn restore_is_idempotent() {
        let (_guard, path) = settings_fixture();

        let mut settings_guard = SettingsGuard::patch(&path, "include ':x'").unwrap();
        settings_guard.restore().unwrap();
        settings_guard.restore().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), ORIGINAL);
    }

    #[test]
    fn missing_settings_file_fails_without_side_effects() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.gradle");

        assert!(SettingsGuard::patch(&path, "include ':x'").is_err());
        assert!(!path.with_file_name("settings.gradle.bk").exists());
    }
}
