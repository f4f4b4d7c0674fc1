//! Root manifest loading and plugin resolution.
//!
//! A root manifest looks like:
//!
//! ```yaml
//! includes:
//!   - dynamic-plugins.default.yaml
//! plugins:
//!   - package: ./dynamic-plugins/dist/backstage-plugin-foo
//!     disabled: false
//! ```
//!
//! Resolution happens in two layers. Included manifests are read first, in
//! list order; a package appearing twice is replaced wholesale by the later
//! entry. The root manifest's own `plugins` list then either adds new
//! packages or overrides individual fields of an included one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::error::{InstallError, InstallResult};
use crate::plugin::PluginDefinition;

/// Conventional root manifest file name.
pub const DEFAULT_MANIFEST_FILE: &str = "dynamic-plugins.yaml";

/// Insertion-ordered map of `package -> PluginDefinition`.
///
/// Iteration order is first-seen order, which makes processing order and
/// therefore error order deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPlugins {
    entries: Vec<PluginDefinition>,
    index: HashMap<String, usize>,
}

impl ResolvedPlugins {
    /// Number of distinct packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no package was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a package by its reference.
    #[must_use]
    pub fn get(&self, package: &str) -> Option<&PluginDefinition> {
        self.index.get(package).and_then(|&i| self.entries.get(i))
    }

    /// Iterate definitions in resolution order.
    pub fn iter(&self) -> std::slice::Iter<'_, PluginDefinition> {
        self.entries.iter()
    }

    /// Insert a definition, replacing any previous one for the same package
    /// wholesale. The package keeps its original position.
    pub fn replace(&mut self, definition: PluginDefinition) {
        if let Some(slot) = self
            .index
            .get(&definition.package)
            .and_then(|&i| self.entries.get_mut(i))
        {
            *slot = definition;
        } else {
            self.push(definition);
        }
    }

    /// Insert a new definition or override the fields `definition` spells
    /// out on an existing one.
    pub fn merge_override(&mut self, definition: PluginDefinition) {
        if let Some(slot) = self
            .index
            .get(&definition.package)
            .and_then(|&i| self.entries.get_mut(i))
        {
            slot.apply_override(definition);
        } else {
            self.push(definition);
        }
    }

    fn push(&mut self, definition: PluginDefinition) {
        self.index
            .insert(definition.package.clone(), self.entries.len());
        self.entries.push(definition);
    }
}

impl<'a> IntoIterator for &'a ResolvedPlugins {
    type Item = &'a PluginDefinition;
    type IntoIter = std::slice::Iter<'a, PluginDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<PluginDefinition> for ResolvedPlugins {
    fn from_iter<T: IntoIterator<Item = PluginDefinition>>(iter: T) -> Self {
        let mut resolved = Self::default();
        for definition in iter {
            resolved.replace(definition);
        }
        resolved
    }
}

/// Resolve the root manifest at `path` and everything it includes.
///
/// Returns `Ok(None)` when there is nothing to install: the file does not
/// exist, is blank, or holds only comments.
///
/// # Errors
///
/// Returns [`InstallError::Manifest`] for unreadable or wrongly shaped
/// documents and [`InstallError::MissingInclude`] for dangling includes.
pub fn resolve_manifest(path: &Path) -> InstallResult<Option<ResolvedPlugins>> {
    if !path.exists() {
        info!(path = %path.display(), "no manifest found, nothing to install");
        return Ok(None);
    }
    let Some(root) = read_document(path)? else {
        info!(path = %path.display(), "manifest is empty, nothing to install");
        return Ok(None);
    };

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut resolved = ResolvedPlugins::default();

    for include in include_paths(&root, path)? {
        let include_path = base_dir.join(&include);
        if !include_path.is_file() {
            return Err(InstallError::MissingInclude { path: include_path });
        }
        let document = read_document(&include_path)?
            .ok_or_else(|| InstallError::manifest(&include_path, "missing 'plugins' list"))?;
        let plugins = plugin_list(&document, &include_path, true)?;
        debug!(
            include = %include_path.display(),
            count = plugins.len(),
            "loaded included manifest"
        );
        for definition in plugins {
            resolved.replace(definition);
        }
    }

    for definition in plugin_list(&root, path, false)? {
        resolved.merge_override(definition);
    }

    info!(count = resolved.len(), "resolved plugin definitions");
    Ok(Some(resolved))
}

/// Read and parse a YAML document. Blank and null documents yield `None`.
fn read_document(path: &Path) -> InstallResult<Option<Mapping>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| InstallError::manifest(path, format!("failed to read: {e}")))?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_yaml::from_str(&content)
        .map_err(|e| InstallError::manifest(path, format!("invalid YAML: {e}")))?;
    match value {
        Value::Null => Ok(None),
        Value::Mapping(mapping) => Ok(Some(mapping)),
        _ => Err(InstallError::manifest(
            path,
            "expected a mapping at the top level",
        )),
    }
}

fn include_paths(root: &Mapping, path: &Path) -> InstallResult<Vec<PathBuf>> {
    let includes = match root.get("includes") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(seq)) => seq,
        Some(_) => {
            return Err(InstallError::manifest(
                path,
                "'includes' must be a list of file paths",
            ));
        },
    };

    includes
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(PathBuf::from(s)),
            _ => Err(InstallError::manifest(
                path,
                format!("includes[{i}] must be a string"),
            )),
        })
        .collect()
}

/// Extract and deserialize the `plugins` list of a document.
///
/// `required` distinguishes included manifests, which exist only to carry a
/// `plugins` list, from the root manifest, where the list is optional.
fn plugin_list(
    document: &Mapping,
    path: &Path,
    required: bool,
) -> InstallResult<Vec<PluginDefinition>> {
    let items = match document.get("plugins") {
        Some(Value::Sequence(seq)) => seq,
        None | Some(Value::Null) if !required => return Ok(Vec::new()),
        None => return Err(InstallError::manifest(path, "missing 'plugins' list")),
        Some(_) => return Err(InstallError::manifest(path, "'plugins' must be a list")),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_mapping() {
                return Err(InstallError::manifest(
                    path,
                    format!("plugins[{i}] must be a mapping"),
                ));
            }
            serde_yaml::from_value(item.clone())
                .map_err(|e| InstallError::manifest(path, format!("plugins[{i}]: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn packages(resolved: &ResolvedPlugins) -> Vec<&str> {
        resolved.iter().map(|d| d.package.as_str()).collect()
    }

    #[test]
    fn missing_manifest_is_nothing_to_install() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve_manifest(&tmp.path().join(DEFAULT_MANIFEST_FILE)).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn blank_manifest_is_nothing_to_install() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "   \n\n");
        assert!(resolve_manifest(&path).unwrap().is_none());
    }

    #[test]
    fn comment_only_manifest_is_nothing_to_install() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "# nothing here yet\n");
        assert!(resolve_manifest(&path).unwrap().is_none());
    }

    #[test]
    fn scalar_root_document_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "just a string\n");
        let err = resolve_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("mapping at the top level"));
    }

    #[test]
    fn root_only_plugins_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "root.yaml",
            "plugins:\n  - package: b\n  - package: a\n  - package: c\n",
        );
        let resolved = resolve_manifest(&path).unwrap().unwrap();
        assert_eq!(packages(&resolved), ["b", "a", "c"]);
    }

    #[test]
    fn root_override_is_field_level() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "defaults.yaml",
            "plugins:\n  - package: foo\n    disabled: false\n    pluginConfig:\n      a: 1\n",
        );
        let path = write(
            tmp.path(),
            "root.yaml",
            "includes:\n  - defaults.yaml\nplugins:\n  - package: foo\n    integrity: sha256-X\n",
        );

        let resolved = resolve_manifest(&path).unwrap().unwrap();
        let foo = resolved.get("foo").unwrap();
        assert_eq!(foo.disabled, Some(false));
        assert_eq!(foo.integrity.as_deref(), Some("sha256-X"));
        assert_eq!(
            foo.plugin_config,
            Some(serde_yaml::from_str::<Value>("a: 1").unwrap())
        );
    }

    #[test]
    fn later_include_replaces_wholesale() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "one.yaml",
            "plugins:\n  - package: foo\n    integrity: sha256-A\n  - package: bar\n",
        );
        write(
            tmp.path(),
            "two.yaml",
            "plugins:\n  - package: foo\n    disabled: true\n",
        );
        let path = write(
            tmp.path(),
            "root.yaml",
            "includes:\n  - one.yaml\n  - two.yaml\n",
        );

        let resolved = resolve_manifest(&path).unwrap().unwrap();
        assert_eq!(packages(&resolved), ["foo", "bar"]);
        let foo = resolved.get("foo").unwrap();
        assert!(foo.is_disabled());
        assert!(foo.integrity.is_none(), "include layer must not merge fields");
    }

    #[test]
    fn include_order_then_root_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "one.yaml", "plugins:\n  - package: a\n");
        write(tmp.path(), "two.yaml", "plugins:\n  - package: b\n");
        let path = write(
            tmp.path(),
            "root.yaml",
            "includes: [one.yaml, two.yaml]\nplugins:\n  - package: c\n  - package: a\n    disabled: true\n",
        );

        let resolved = resolve_manifest(&path).unwrap().unwrap();
        assert_eq!(packages(&resolved), ["a", "b", "c"]);
        assert!(resolved.get("a").unwrap().is_disabled());
    }

    #[test]
    fn missing_include_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "includes:\n  - nope.yaml\n");
        let err = resolve_manifest(&path).unwrap_err();
        assert!(matches!(err, InstallError::MissingInclude { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Manifest);
    }

    #[test]
    fn includes_must_be_a_list() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "includes: one.yaml\n");
        let err = resolve_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("'includes' must be a list"));
    }

    #[test]
    fn include_entries_must_be_strings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "includes:\n  - {file: x}\n");
        let err = resolve_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("includes[0] must be a string"));
    }

    #[test]
    fn include_without_plugins_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "one.yaml", "other: 1\n");
        let path = write(tmp.path(), "root.yaml", "includes: [one.yaml]\n");
        let err = resolve_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("missing 'plugins' list"));
    }

    #[test]
    fn plugins_must_be_a_list() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "plugins:\n  package: foo\n");
        let err = resolve_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("'plugins' must be a list"));
    }

    #[test]
    fn plugin_without_package_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "root.yaml",
            "plugins:\n  - package: ok\n  - disabled: true\n",
        );
        let err = resolve_manifest(&path).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("plugins[1]"), "got: {message}");
        assert!(message.contains("package"), "got: {message}");
    }

    #[test]
    fn plugin_with_non_string_package_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "plugins:\n  - package: {a: 1}\n");
        let err = resolve_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("plugins[0]"));
    }

    #[test]
    fn scalar_plugin_entry_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "plugins:\n  - just-a-name\n");
        let err = resolve_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("plugins[0] must be a mapping"));
    }

    #[test]
    fn invalid_yaml_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "plugins: [\n");
        let err = resolve_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("invalid YAML"));
    }

    #[test]
    fn empty_plugins_list_resolves_to_empty_set() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "root.yaml", "plugins: []\n");
        let resolved = resolve_manifest(&path).unwrap().unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn from_iter_keeps_first_position() {
        let resolved: ResolvedPlugins = [
            PluginDefinition::new("a"),
            PluginDefinition::new("b"),
            PluginDefinition {
                disabled: Some(true),
                ..PluginDefinition::new("a")
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(packages(&resolved), ["a", "b"]);
        assert!(resolved.get("a").unwrap().is_disabled());
    }
}
