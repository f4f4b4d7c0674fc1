//! `install-dynamic-plugins` - dynamic plugin installer.
//!
//! Reads the plugin manifest (`dynamic-plugins.yaml` by default), installs
//! every enabled plugin under the given root directory and writes the merged
//! `app-config.dynamic-plugins.yaml` there. Exits non-zero with a single
//! diagnostic line on the first error.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use dynplug_config::InstallerConfig;
use dynplug_installer::{DEFAULT_MANIFEST_FILE, InstallReport, Installer, NpmPacker, PluginOutcome};

mod config_bridge;
mod theme;

use theme::Theme;

/// Install dynamic plugins and generate their app configuration
#[derive(Debug, Parser)]
#[command(name = "install-dynamic-plugins")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Installation root directory (created if missing)
    root_dir: PathBuf,

    /// Root plugin manifest
    #[arg(short, long, default_value = DEFAULT_MANIFEST_FILE)]
    manifest: PathBuf,

    /// Largest size in bytes a single archive entry may declare
    /// (overrides MAX_ENTRY_SIZE)
    #[arg(long)]
    max_entry_size: Option<u64>,

    /// Skip integrity verification for every package
    /// (same as SKIP_INTEGRITY_CHECK=true)
    #[arg(long)]
    skip_integrity_check: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log format: pretty, compact (default), json or full
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    /// Layer command-line flags over the environment-derived configuration.
    fn apply_overrides(&self, config: &mut InstallerConfig) {
        if let Some(size) = self.max_entry_size {
            config.max_entry_size = size;
        }
        if self.skip_integrity_check {
            config.skip_integrity_check = true;
        }
        if self.verbose {
            "debug".clone_into(&mut config.logging.level);
        }
        if let Some(format) = &self.log_format {
            format.clone_into(&mut config.logging.format);
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::FAILURE
        },
    }
}

fn run(cli: &Cli) -> Result<InstallReport> {
    let config = InstallerConfig::from_env_with(|config| cli.apply_overrides(config))
        .context("invalid installer configuration")?;

    let ansi = colored::control::SHOULD_COLORIZE.should_colorize();
    dynplug_telemetry::setup_logging(&config_bridge::to_log_config(&config, ansi))
        .context("failed to initialize logging")?;

    if config.skip_integrity_check {
        eprintln!(
            "{}",
            Theme::warning("integrity checking is disabled for all packages")
        );
    }

    let options = config_bridge::to_install_options(&config, &cli.root_dir, &cli.manifest);
    tracing::debug!(?options, "starting installation");
    let report = Installer::new(options, NpmPacker::new()).run()?;
    Ok(report)
}

fn print_summary(report: &InstallReport) {
    if report.outcomes.is_empty() {
        println!("{}", Theme::info("No plugins to install"));
    } else {
        println!("{}", Theme::header("Dynamic plugins"));
        for (package, outcome) in &report.outcomes {
            match outcome {
                PluginOutcome::Installed { directory } => {
                    println!(
                        "  {} {}",
                        package,
                        Theme::dimmed(&directory.display().to_string())
                    );
                },
                PluginOutcome::Skipped => {
                    println!("  {}", Theme::dimmed(&format!("{package} (disabled)")));
                },
            }
        }
        println!(
            "{}",
            Theme::success(&format!(
                "Installed {} plugin(s), skipped {}",
                report.installed(),
                report.skipped()
            ))
        );
    }
    println!(
        "{}",
        Theme::info(&format!("Wrote {}", report.output_path.display()))
    );
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_leave_config_alone() {
        let cli = Cli::try_parse_from(["install-dynamic-plugins", "/plugins"]).unwrap();
        assert_eq!(cli.manifest, PathBuf::from("dynamic-plugins.yaml"));

        let mut config = InstallerConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, InstallerConfig::default());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "install-dynamic-plugins",
            "/plugins",
            "--manifest",
            "other.yaml",
            "--max-entry-size",
            "1000",
            "--skip-integrity-check",
            "--verbose",
            "--log-format",
            "json",
        ])
        .unwrap();

        let mut config = InstallerConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.max_entry_size, 1000);
        assert!(config.skip_integrity_check);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(cli.manifest, PathBuf::from("other.yaml"));
    }

    #[test]
    fn root_dir_is_required() {
        assert!(Cli::try_parse_from(["install-dynamic-plugins"]).is_err());
    }

    #[test]
    fn max_entry_size_must_be_numeric() {
        assert!(
            Cli::try_parse_from([
                "install-dynamic-plugins",
                "/plugins",
                "--max-entry-size",
                "lots"
            ])
            .is_err()
        );
    }
}
