//! The install pipeline.
//!
//! Plugins are processed one at a time in resolution order:
//!
//! ```text
//! Resolved -> Skipped                      (disabled)
//! Resolved -> Fetching -> Verifying -> Extracting -> ConfigMerging -> Installed
//! ```
//!
//! Verification is skipped for local packages and when integrity checking
//! is turned off. The first error aborts the whole run. Plugins installed
//! before the failure stay on disk and the output file is not written.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{info, warn};

use crate::error::{InstallError, InstallResult};
use crate::extract::extract_archive;
use crate::integrity::IntegrityPolicy;
use crate::manifest::{DEFAULT_MANIFEST_FILE, resolve_manifest};
use crate::merge::GlobalConfig;
use crate::packer::PackagePacker;
use crate::plugin::{LOCAL_PACKAGE_PREFIX, PluginDefinition};

/// Name of the generated configuration file inside the installation root.
pub const OUTPUT_FILE_NAME: &str = "app-config.dynamic-plugins.yaml";

/// Suffix every packed archive must carry.
const ARCHIVE_SUFFIX: &str = ".tgz";

/// Settings for one installer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Installation root. Archives are packed and extracted here.
    pub root_dir: PathBuf,
    /// Root manifest to resolve.
    pub manifest_path: PathBuf,
    /// Largest size any single archive entry may declare.
    pub max_entry_size: u64,
    /// Skip integrity verification for every package.
    pub skip_integrity_check: bool,
}

impl InstallOptions {
    /// Options reading `dynamic-plugins.yaml` from the working directory.
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>, max_entry_size: u64) -> Self {
        Self {
            root_dir: root_dir.into(),
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_FILE),
            max_entry_size,
            skip_integrity_check: false,
        }
    }

    /// Read a different root manifest.
    #[must_use]
    pub fn with_manifest(mut self, manifest_path: impl Into<PathBuf>) -> Self {
        self.manifest_path = manifest_path.into();
        self
    }

    /// Turn integrity verification on or off.
    #[must_use]
    pub fn with_skip_integrity_check(mut self, skip: bool) -> Self {
        self.skip_integrity_check = skip;
        self
    }

    /// Where the generated configuration is written.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.root_dir.join(OUTPUT_FILE_NAME)
    }
}

/// What happened to one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOutcome {
    /// Extracted into `directory`.
    Installed {
        /// Extraction directory.
        directory: PathBuf,
    },
    /// Disabled in the manifest; nothing was done.
    Skipped,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Per-package outcomes in processing order.
    pub outcomes: Vec<(String, PluginOutcome)>,
    /// The configuration file that was written.
    pub output_path: PathBuf,
}

impl InstallReport {
    /// Number of installed plugins.
    #[must_use]
    pub fn installed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, PluginOutcome::Installed { .. }))
            .count()
    }

    /// Number of disabled plugins.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == PluginOutcome::Skipped)
            .count()
    }
}

/// Runs the install pipeline against a [`PackagePacker`].
#[derive(Debug)]
pub struct Installer<P> {
    options: InstallOptions,
    policy: IntegrityPolicy,
    packer: P,
}

impl<P: PackagePacker> Installer<P> {
    /// Create an installer.
    pub fn new(options: InstallOptions, packer: P) -> Self {
        let policy = IntegrityPolicy::new(options.skip_integrity_check);
        Self {
            options,
            policy,
            packer,
        }
    }

    /// The options this installer runs with.
    #[must_use]
    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Resolve the manifest, install every enabled plugin and write the
    /// merged configuration.
    ///
    /// When the manifest is missing or empty an empty output file is written
    /// and the run succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first [`InstallError`] hit by any stage. Nothing is
    /// rolled back and the output file is left unwritten.
    pub fn run(&self) -> InstallResult<InstallReport> {
        let root = &self.options.root_dir;
        std::fs::create_dir_all(root).map_err(|e| InstallError::io(root, e))?;
        let output_path = self.options.output_path();

        let Some(plugins) = resolve_manifest(&self.options.manifest_path)? else {
            write_output(&output_path, "")?;
            return Ok(InstallReport {
                outcomes: Vec::new(),
                output_path,
            });
        };

        let mut config = GlobalConfig::new(root);
        let mut outcomes = Vec::with_capacity(plugins.len());
        for plugin in &plugins {
            let outcome = self.install_plugin(plugin, &mut config)?;
            outcomes.push((plugin.package.clone(), outcome));
        }

        write_output(&output_path, &config.to_yaml()?)?;
        info!(path = %output_path.display(), "wrote dynamic plugins configuration");

        Ok(InstallReport {
            outcomes,
            output_path,
        })
    }

    fn install_plugin(
        &self,
        plugin: &PluginDefinition,
        config: &mut GlobalConfig,
    ) -> InstallResult<PluginOutcome> {
        let package = plugin.package.as_str();
        if plugin.is_disabled() {
            info!(package, "plugin disabled, skipping");
            return Ok(PluginOutcome::Skipped);
        }

        let descriptor = self.policy.descriptor_for(plugin)?;

        info!(package, "installing plugin");
        let reference = packer_reference(plugin)?;
        let archive = self.packer.pack(&reference, &self.options.root_dir)?;
        let directory = extraction_dir(&archive, package)?;

        let data = std::fs::read(&archive).map_err(|e| InstallError::io(&archive, e))?;
        if let Some(descriptor) = descriptor {
            descriptor.verify(&data, package)?;
        }

        let summary = extract_archive(&data, &directory, self.options.max_entry_size)?;
        std::fs::remove_file(&archive).map_err(|e| InstallError::io(&archive, e))?;
        info!(
            package,
            directory = %summary.root.display(),
            files = summary.files,
            "plugin extracted"
        );

        match &plugin.plugin_config {
            Some(Value::Mapping(fragment)) => config.merge(package, fragment)?,
            Some(_) => warn!(package, "pluginConfig is not a mapping, ignoring it"),
            None => {},
        }

        Ok(PluginOutcome::Installed {
            directory: summary.root,
        })
    }
}

/// Local references are anchored at the working directory; registry
/// references pass through unchanged.
fn packer_reference(plugin: &PluginDefinition) -> InstallResult<String> {
    if !plugin.is_local() {
        return Ok(plugin.package.clone());
    }
    let cwd = std::env::current_dir().map_err(|e| InstallError::io(".", e))?;
    let relative = plugin
        .package
        .strip_prefix(LOCAL_PACKAGE_PREFIX)
        .unwrap_or(&plugin.package);
    Ok(cwd.join(relative).display().to_string())
}

/// `<dir>/acme-foo-1.0.0.tgz` extracts into `<dir>/acme-foo-1.0.0`.
fn extraction_dir(archive: &Path, package: &str) -> InstallResult<PathBuf> {
    let stem = archive
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(ARCHIVE_SUFFIX))
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| InstallError::Fetch {
            package: package.to_string(),
            message: format!(
                "packer produced '{}', expected a {ARCHIVE_SUFFIX} archive",
                archive.display()
            ),
        })?;
    Ok(archive.with_file_name(stem))
}

fn write_output(path: &Path, contents: &str) -> InstallResult<()> {
    std::fs::write(path, contents).map_err(|e| InstallError::io(path, e))
}
