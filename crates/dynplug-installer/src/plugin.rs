//! Plugin definitions as they appear in manifests.

use serde::{Deserialize, Serialize};

/// Prefix marking a package reference as a local filesystem path.
pub const LOCAL_PACKAGE_PREFIX: &str = "./";

/// One plugin entry from a manifest.
///
/// Fields other than `package` are kept as "present or absent" so a root
/// manifest entry can override only the fields it actually spells out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDefinition {
    /// Registry reference (`@scope/name@1.2.3`) or local path (`./dist/foo`).
    pub package: String,
    /// Skip this plugin entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    /// SRI-style descriptor, e.g. `sha512-<base64>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    /// Configuration fragment merged into the global app config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_config: Option<serde_yaml::Value>,
}

impl PluginDefinition {
    /// Create a definition with only the package reference set.
    #[must_use]
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            disabled: None,
            integrity: None,
            plugin_config: None,
        }
    }

    /// Whether the plugin is switched off. Absent means enabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }

    /// Whether the package is referenced by local path rather than registry.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.package.starts_with(LOCAL_PACKAGE_PREFIX)
    }

    /// Replace every field present in `other`, leaving absent ones alone.
    pub(crate) fn apply_override(&mut self, other: Self) {
        if other.disabled.is_some() {
            self.disabled = other.disabled;
        }
        if other.integrity.is_some() {
            self.integrity = other.integrity;
        }
        if other.plugin_config.is_some() {
            self.plugin_config = other.plugin_config;
        }
    }
}
