//! # droidtest
//!
//! Command-line orchestrator for running an Android SDK's on-device tests.
//!
//! ## Overview
//!
//! `droidtest` drives the test modules of an SDK checkout against an
//! attached device. It handles:
//!
//! - **Catalog** - loads (or generates) the JSON list of modules and cases
//! - **Driving** - builds, installs, and executes instrumentation tests
//!   through Gradle and adb, capturing output and logcat snapshots
//! - **Analysis** - derives per-module pass/fail counts from the captured
//!   text or from pulled JUnit XML reports
//!
//! ## Quick Start
//!
//! ```bash
//! # Describe the checkout once
//! droidtest init
//!
//! # Generate the case catalog from the test sources
//! droidtest gen-cases --module base --module p2p
//!
//! # Run everything in the catalog against the only attached device
//! droidtest run
//!
//! # Rebuild the SDK libraries first, then run on a specific device
//! droidtest run --build-deps --device emulator-5554
//! ```
//!
//! ## Exit Status
//!
//! `0` when every requested module passed (an empty catalog passes
//! vacuously); `1` on a missing or malformed catalog, a dependency build
//! failure, or any module test failure.
//!
//! ## Modules
//!
//! - [`config`] - configuration file support for `droidtest.toml`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use droidtest_core::orchestrator::{self, RunPlan};
use droidtest_core::{CatalogEntry, catalog, caselist};
use std::path::{Path, PathBuf};

pub mod config;

use config::DroidtestConfig;

/// CLI orchestrator for running Android instrumentation and unit tests.
#[derive(Parser, Debug)]
#[command(
    name = "droidtest",
    author,
    version,
    about = "Android SDK on-device test orchestrator",
    long_about = None
)]
struct Cli {
    /// Print what would be done without touching the device
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print verbose output including all external commands
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Path to the config file (default: discover droidtest.toml upward)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the cataloged tests on a device.
    Run {
        /// Rebuild the SDK dependency libraries before running
        #[arg(long)]
        build_deps: bool,

        /// Location of the case list JSON file
        #[arg(long)]
        caselist: Option<PathBuf>,

        /// Serial of the device to run on; defaults to the only attached
        /// device
        #[arg(long)]
        device: Option<String>,

        /// Directory where result and logcat files are written
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Directory holding the rebuilt dependency libraries
        #[arg(long)]
        deps_dir: Option<PathBuf>,

        /// Run unit-test modules in bulk instead of per-case
        /// instrumentation
        #[arg(long)]
        unit: bool,

        /// Timestamp suffix for log files (default: current unix time)
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Generate the case catalog by scanning test sources.
    GenCases {
        /// Modules to scan; repeatable, defaults to every configured module
        #[arg(long)]
        module: Vec<String>,

        /// Output file location (default: the configured caselist path)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a starter droidtest.toml.
    Init {
        #[arg(long, default_value = config::CONFIG_FILE_NAME)]
        output: PathBuf,
    },
}

/// Parses the command line and executes the selected command.
///
/// Returns whether the invocation counts as a success; test failures are a
/// `false`, not an error, so the caller can map them to exit status 1
/// without an error message.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            build_deps,
            caselist,
            device,
            log_dir,
            deps_dir,
            unit,
            timestamp,
        } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_run(
                &config,
                RunArgs {
                    build_deps,
                    caselist,
                    device,
                    log_dir,
                    deps_dir,
                    unit,
                    timestamp,
                    dry_run: cli.dry_run,
                    verbose: cli.verbose,
                },
            )
        }
        Command::GenCases { module, output } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_gen_cases(&config, &module, output.as_deref())?;
            Ok(true)
        }
        Command::Init { output } => {
            std::fs::write(&output, DroidtestConfig::generate_starter_toml())
                .with_context(|| format!("Failed to write config file: {:?}", output))?;
            println!("Wrote starter config to {:?}", output);
            Ok(true)
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<DroidtestConfig> {
    if let Some(path) = explicit {
        return DroidtestConfig::load_from_file(path);
    }
    match DroidtestConfig::discover()? {
        Some((config, path)) => {
            println!("Using config {}", path.display());
            Ok(config)
        }
        None => Ok(DroidtestConfig::default()),
    }
}

struct RunArgs {
    build_deps: bool,
    caselist: Option<PathBuf>,
    device: Option<String>,
    log_dir: Option<PathBuf>,
    deps_dir: Option<PathBuf>,
    unit: bool,
    timestamp: Option<String>,
    dry_run: bool,
    verbose: bool,
}

fn cmd_run(config: &DroidtestConfig, args: RunArgs) -> Result<bool> {
    let root = config.project.root.clone();
    let entries = if args.unit {
        unit_entries(config)
    } else {
        let caselist_path = root.join(
            args.caselist
                .as_deref()
                .unwrap_or(&config.project.caselist),
        );
        catalog::load(&caselist_path)?
    };

    let log_dir = root.join(args.log_dir.as_deref().unwrap_or(&config.project.log_dir));
    let timestamp = args
        .timestamp
        .unwrap_or_else(orchestrator::default_timestamp);

    if args.dry_run {
        println!("Would run {} module(s):", entries.len());
        for entry in &entries {
            if args.unit {
                println!("  {} (full suite)", entry.module);
            } else {
                println!("  {} ({} cases)", entry.module, entry.cases.len());
            }
        }
        println!("Logs would be written to {}", log_dir.display());
        return Ok(true);
    }

    let plan = RunPlan {
        project_root: root,
        entries,
        modules: config.module_specs(),
        log_dir,
        device: args.device,
        timestamp,
        unit_mode: args.unit,
        rebuild_deps: args
            .build_deps
            .then(|| config.deps.to_rebuild(args.deps_dir.as_deref())),
        settings_file: config.project.settings_gradle.clone(),
        extra_includes: config.project.extra_includes.clone(),
        verbose: args.verbose,
    };

    let report = orchestrator::run(&plan)?;
    report.print_summary();
    Ok(report.all_passed())
}

/// Synthesizes bulk-mode entries from the configured unit-test modules.
fn unit_entries(config: &DroidtestConfig) -> Vec<CatalogEntry> {
    config
        .unit
        .modules
        .iter()
        .map(|name| CatalogEntry {
            module: name.clone(),
            cases: Vec::new(),
        })
        .collect()
}

fn cmd_gen_cases(
    config: &DroidtestConfig,
    selected: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let root = &config.project.root;
    let specs = config.module_specs();

    let wanted: Vec<_> = if selected.is_empty() {
        specs.iter().collect()
    } else {
        let mut wanted = Vec::new();
        for name in selected {
            let spec = orchestrator::find_module(&specs, name)
                .with_context(|| format!("Unknown module '{}'", name))?;
            wanted.push(spec);
        }
        wanted
    };

    let mut entries = Vec::new();
    for spec in wanted {
        println!("> generating case list for module {}", spec.name);
        let entry = caselist::generate(&spec.name, &root.join(&spec.source_dir))?;
        println!("> done, {} cases in total.", entry.cases.len());
        entries.push(entry);
    }

    if entries.is_empty() {
        println!("No modules selected, nothing to generate.");
        return Ok(());
    }

    let output = root.join(output.unwrap_or(&config.project.caselist));
    caselist::write_catalog(&entries, &output)?;
    println!("Wrote case list to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_entries_come_from_config() {
        let config = DroidtestConfig::default();
        let entries = unit_entries(&config);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].module, "base");
        assert!(entries[0].cases.is_empty());
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "droidtest",
            "run",
            "--build-deps",
            "--device",
            "emulator-5554",
            "--timestamp",
            "1700000000",
        ])
        .unwrap();

        match cli.command {
            Command::Run {
                build_deps,
                device,
                timestamp,
                unit,
                ..
            } => {
                assert!(build_deps);
                assert!(!unit);
                assert_eq!(device.as_deref(), Some("emulator-5554"));
                assert_eq!(timestamp.as_deref(), Some("1700000000"));
            }
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn cli_parses_gen_cases_modules() {
        let cli = Cli::try_parse_from([
            "droidtest",
            "gen-cases",
            "--module",
            "base",
            "--module",
            "p2p",
        ])
        .unwrap();

        match cli.command {
            Command::GenCases { module, output } => {
                assert_eq!(module, vec!["base", "p2p"]);
                assert!(output.is_none());
            }
            _ => panic!("expected gen-cases subcommand"),
        }
    }
}
