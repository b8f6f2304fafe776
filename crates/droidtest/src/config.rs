//! Configuration file support for droidtest.
//!
//! This module provides support for `droidtest.toml` configuration files
//! that describe the SDK checkout under test: where the test modules live,
//! which Android packages their instrumentation targets, and how dependency
//! artifacts are rebuilt.
//!
//! ## Configuration File Location
//!
//! The configuration file is searched for in the following order:
//! 1. Current working directory (`./droidtest.toml`)
//! 2. Parent directories (up to the repository root or filesystem root)
//!
//! ## Example Configuration
//!
//! ```toml
//! [project]
//! root = "."
//! caselist = "test/case_list.json"
//! log_dir = "test"
//!
//! [[modules]]
//! name = "base"
//! project_dir = "test/base"
//! target_package = "com.rtc.test.base"
//! source_dir = "test/base/src/main/java/com/rtc/test/base"
//! ```
//!
//! CLI flags always take precedence over config file values.

use anyhow::{Context, Result};
use droidtest_core::orchestrator::DepsRebuild;
use droidtest_core::settings::DEFAULT_TEST_INCLUDES;
use droidtest_core::types::ModuleSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "droidtest.toml";

/// Instrumentation runner used when a module does not configure one.
pub const DEFAULT_RUNNER: &str = "android.test.InstrumentationTestRunner";

/// Root configuration structure for `droidtest.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DroidtestConfig {
    /// Project-level paths.
    pub project: ProjectConfig,

    /// Dependency rebuild settings for `--build-deps`.
    pub deps: DepsConfig,

    /// Unit-test (bulk) mode settings.
    pub unit: UnitConfig,

    /// Test module descriptions. Empty means the standard three modules.
    pub modules: Vec<ModuleConfig>,
}

/// Project-level paths, all relative to `root` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Root of the SDK checkout under test.
    pub root: PathBuf,

    /// Shared Gradle settings file patched for the duration of a run.
    pub settings_gradle: PathBuf,

    /// Default case catalog location.
    pub caselist: PathBuf,

    /// Default directory for result and logcat files.
    pub log_dir: PathBuf,

    /// Include lines appended to the settings file while tests run.
    pub extra_includes: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            settings_gradle: PathBuf::from("settings.gradle"),
            caselist: PathBuf::from("test/case_list.json"),
            log_dir: PathBuf::from("test"),
            extra_includes: DEFAULT_TEST_INCLUDES.to_string(),
        }
    }
}

/// Dependency rebuild settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepsConfig {
    /// Packaging command invoked at the project root.
    pub pack_command: Vec<String>,

    /// Where the packaging step leaves the built libraries.
    pub dist_libs_dir: PathBuf,

    /// Where the test modules resolve their dependencies from.
    pub test_libs_dir: PathBuf,

    /// Artifacts moved to the top of the test libs dir after copying.
    pub promote: Vec<String>,
}

impl Default for DepsConfig {
    fn default() -> Self {
        Self {
            pack_command: vec![
                "python".to_string(),
                "tools/pack.py".to_string(),
                "--skip_zip".to_string(),
            ],
            dist_libs_dir: PathBuf::from("dist/libs"),
            test_libs_dir: PathBuf::from("test/libs"),
            promote: vec!["webrtc/libwebrtc.jar".to_string()],
        }
    }
}

impl DepsConfig {
    /// Converts to the orchestrator's rebuild settings, with an optional
    /// override for the built-libraries source directory.
    pub fn to_rebuild(&self, dist_libs_override: Option<&Path>) -> DepsRebuild {
        DepsRebuild {
            pack_command: self.pack_command.clone(),
            dist_libs_dir: dist_libs_override
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.dist_libs_dir.clone()),
            test_libs_dir: self.test_libs_dir.clone(),
            promote: self.promote.clone(),
        }
    }
}

/// Unit-test (bulk) mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    /// Modules driven in bulk when `--unit` is passed.
    pub modules: Vec<String>,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            modules: vec!["base".to_string()],
        }
    }
}

/// One test module as written in the config file.
///
/// Optional fields fall back to derived values: the logcat tag defaults to
/// the target package and the runner to [`DEFAULT_RUNNER`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module name as referenced by the case catalog.
    pub name: String,

    /// Gradle project directory, relative to the project root.
    pub project_dir: PathBuf,

    /// Android package the instrumentation targets.
    pub target_package: String,

    /// Directory holding the module's test sources.
    pub source_dir: PathBuf,

    /// Logcat tag snapshotted after each case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logcat_tag: Option<String>,

    /// Instrumentation runner class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,

    /// On-device JUnit XML report path for bulk mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
}

impl ModuleConfig {
    /// Resolves the optional fields into a full module description.
    pub fn to_spec(&self) -> ModuleSpec {
        ModuleSpec {
            name: self.name.clone(),
            project_dir: self.project_dir.clone(),
            target_package: self.target_package.clone(),
            logcat_tag: self
                .logcat_tag
                .clone()
                .unwrap_or_else(|| self.target_package.clone()),
            runner: self
                .runner
                .clone()
                .unwrap_or_else(|| DEFAULT_RUNNER.to_string()),
            source_dir: self.source_dir.clone(),
            report_path: self.report_path.clone(),
        }
    }
}

/// The standard three SDK test modules, used when the config lists none.
fn default_modules() -> Vec<ModuleConfig> {
    let module = |name: &str, project_dir: &str, package: &str, source_dir: &str| ModuleConfig {
        name: name.to_string(),
        project_dir: PathBuf::from(project_dir),
        target_package: package.to_string(),
        source_dir: PathBuf::from(source_dir),
        logcat_tag: None,
        runner: None,
        report_path: None,
    };

    vec![
        module(
            "base",
            "test/base",
            "com.rtc.test.base",
            "test/base/src/main/java/com/rtc/test/base",
        ),
        module(
            "conference",
            "test/conference/apiTest",
            "com.rtc.test.conference.apitest",
            "test/conference/apiTest/src/main/java/com/rtc/test/conference/apitest",
        ),
        module(
            "p2p",
            "test/p2p/apiTest",
            "com.rtc.test.p2p.apitest",
            "test/p2p/apiTest/src/main/java/com/rtc/test/p2p/apitest",
        ),
    ]
}

impl DroidtestConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: DroidtestConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration from the current directory
    /// or any parent directory.
    pub fn discover() -> Result<Option<(Self, PathBuf)>> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&cwd)
    }

    /// Attempts to find and load configuration starting from `start_dir`,
    /// walking up until a config file is found or the repository root is
    /// reached.
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Resolves the configured modules, falling back to the standard three.
    pub fn module_specs(&self) -> Vec<ModuleSpec> {
        let modules = if self.modules.is_empty() {
            default_modules()
        } else {
            self.modules.clone()
        };
        modules.iter().map(ModuleConfig::to_spec).collect()
    }

    /// Generates a starter configuration file as a formatted TOML string,
    /// with comments explaining each option.
    pub fn generate_starter_toml() -> String {
        format!(
            r#"# droidtest configuration file
# Describes the SDK checkout under test. CLI flags override these settings.

[project]
# Root of the SDK checkout
root = "."

# Gradle settings file patched with the test submodules during a run
settings_gradle = "settings.gradle"

# Default case catalog location (see `droidtest gen-cases`)
caselist = "test/case_list.json"

# Directory for result and logcat files
log_dir = "test"

[deps]
# Command that rebuilds the SDK libraries (used with --build-deps)
pack_command = ["python", "tools/pack.py", "--skip_zip"]

# Where the rebuilt libraries land, and where the test modules expect them
dist_libs_dir = "dist/libs"
test_libs_dir = "test/libs"

# Artifacts moved to the top of the test libs dir after copying
promote = ["webrtc/libwebrtc.jar"]

[unit]
# Modules driven in bulk when --unit is passed
modules = ["base"]

[[modules]]
name = "base"
project_dir = "test/base"
target_package = "com.rtc.test.base"
source_dir = "test/base/src/main/java/com/rtc/test/base"
# logcat_tag defaults to target_package
# runner defaults to "{runner}"
# report_path = "/sdcard/test-report.xml"

[[modules]]
name = "conference"
project_dir = "test/conference/apiTest"
target_package = "com.rtc.test.conference.apitest"
source_dir = "test/conference/apiTest/src/main/java/com/rtc/test/conference/apitest"

[[modules]]
name = "p2p"
project_dir = "test/p2p/apiTest"
target_package = "com.rtc.test.p2p.apitest"
source_dir = "test/p2p/apiTest/src/main/java/com/rtc/test/p2p/apitest"
"#,
            runner = DEFAULT_RUNNER,
        )
    }
}
