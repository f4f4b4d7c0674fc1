//! Dynamic plugin installation.
//!
//! Reads a declarative plugin manifest, fetches each enabled plugin as an npm
//! tarball, verifies it, extracts it safely and merges the plugin's
//! configuration fragment into one generated app config:
//!
//! - [`resolve_manifest`]: root manifest plus includes into [`ResolvedPlugins`]
//! - [`IntegrityPolicy`] / [`IntegrityDescriptor`]: SRI verification
//! - [`extract_archive`]: `package/`-prefixed, size-capped tarball extraction
//! - [`GlobalConfig`] / [`merge_config`]: conflict-detecting deep merge
//! - [`PackagePacker`]: seam over `npm pack` ([`NpmPacker`])
//! - [`Installer`]: the sequential pipeline tying the above together
//!
//! # Failure model
//!
//! Every error is fatal. The first failing plugin aborts the run; plugins
//! already extracted stay on disk and the output file is not written.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod extract;
pub mod install;
pub mod integrity;
pub mod manifest;
pub mod merge;
pub mod packer;
pub mod plugin;

pub use error::{ErrorKind, InstallError, InstallResult};
pub use extract::{ExtractSummary, PACKAGE_PREFIX, extract_archive};
pub use install::{InstallOptions, InstallReport, Installer, OUTPUT_FILE_NAME, PluginOutcome};
pub use integrity::{IntegrityAlgorithm, IntegrityDescriptor, IntegrityPolicy, verify_integrity};
pub use manifest::{DEFAULT_MANIFEST_FILE, ResolvedPlugins, resolve_manifest};
pub use merge::{GlobalConfig, merge_config};
pub use packer::{NpmPacker, PackagePacker};
pub use plugin::{LOCAL_PACKAGE_PREFIX, PluginDefinition};
