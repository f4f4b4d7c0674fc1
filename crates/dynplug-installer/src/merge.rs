//! Conflict-detecting deep merge of plugin configuration fragments.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{InstallError, InstallResult};

/// Deep-merge `fragment` into `dest`.
///
/// - Mappings merge recursively per key; a missing subtree is created.
/// - Any other value (scalar, sequence, null) is set when the key is absent,
///   kept when equal, and a conflict when different.
/// - A mapping meeting a non-mapping at the same path is a conflict.
///
/// `prefix` is the dotted path of `dest` within the whole tree and is only
/// used to name keys in errors. `dest` may be partially updated on error;
/// use [`GlobalConfig::merge`] for all-or-nothing semantics.
///
/// # Errors
///
/// Returns [`InstallError::ConfigConflict`] naming the first conflicting key
/// path and both values.
pub fn merge_config(fragment: &Mapping, dest: &mut Mapping, prefix: &str) -> InstallResult<()> {
    for (key, incoming) in fragment {
        let path = join_path(prefix, key);

        let Some(existing) = dest.get_mut(key) else {
            dest.insert(key.clone(), incoming.clone());
            continue;
        };

        match (existing, incoming) {
            (Value::Mapping(existing_map), Value::Mapping(incoming_map)) => {
                merge_config(incoming_map, existing_map, &path)?;
            },
            (existing, incoming) if existing == incoming => {},
            (existing, incoming) => {
                return Err(InstallError::ConfigConflict {
                    key: path,
                    existing: render(existing),
                    incoming: render(incoming),
                });
            },
        }
    }
    Ok(())
}

/// The accumulated application configuration written at the end of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalConfig {
    tree: Mapping,
}

impl GlobalConfig {
    /// Start a configuration seeded with `dynamicPlugins.rootDirectory`.
    #[must_use]
    pub fn new(root_directory: &Path) -> Self {
        let mut dynamic_plugins = Mapping::new();
        dynamic_plugins.insert(
            Value::from("rootDirectory"),
            Value::from(root_directory.display().to_string()),
        );
        let mut tree = Mapping::new();
        tree.insert(
            Value::from("dynamicPlugins"),
            Value::Mapping(dynamic_plugins),
        );
        Self { tree }
    }

    /// Merge a plugin's configuration fragment.
    ///
    /// The merge runs on a copy that replaces the current tree only on
    /// success, so a conflict leaves the configuration untouched.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::ConfigConflict`] if the fragment disagrees
    /// with a value already present.
    pub fn merge(&mut self, package: &str, fragment: &Mapping) -> InstallResult<()> {
        let mut candidate = self.tree.clone();
        merge_config(fragment, &mut candidate, "")?;
        self.tree = candidate;
        debug!(package, keys = fragment.len(), "merged plugin configuration");
        Ok(())
    }

    /// The merged tree.
    #[must_use]
    pub fn as_mapping(&self) -> &Mapping {
        &self.tree
    }

    /// Serialize the tree as a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Serialization`] for values YAML cannot
    /// represent.
    pub fn to_yaml(&self) -> InstallResult<String> {
        serde_yaml::to_string(&self.tree).map_err(|e| InstallError::Serialization {
            message: e.to_string(),
        })
    }
}

fn join_path(prefix: &str, key: &Value) -> String {
    let key = match key {
        Value::String(s) => s.clone(),
        other => render(other),
    };
    if prefix.is_empty() {
        key
    } else {
        format!("{prefix}.{key}")
    }
}

/// Single-line-ish rendering of a value for diagnostics.
fn render(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| format!("{value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn merge_disjoint_keys() {
        let mut dest = mapping("a: 1");
        merge_config(&mapping("b: 2"), &mut dest, "").unwrap();
        assert_eq!(dest, mapping("a: 1\nb: 2"));
    }

    #[test]
    fn merge_nested_creates_subtree() {
        let mut dest = mapping("x: {a: 1}");
        merge_config(&mapping("x: {b: {c: true}}"), &mut dest, "").unwrap();
        assert_eq!(dest, mapping("x: {a: 1, b: {c: true}}"));
    }

    #[test]
    fn merge_twice_is_idempotent() {
        let fragment = mapping("x: {y: 1}");
        let mut dest = Mapping::new();
        merge_config(&fragment, &mut dest, "").unwrap();
        merge_config(&fragment, &mut dest, "").unwrap();
        assert_eq!(dest, mapping("x: {y: 1}"));
    }

    #[test]
    fn conflicting_scalar_names_path_and_values() {
        let mut dest = mapping("x: {y: 1}");
        let err = merge_config(&mapping("x: {y: 2}"), &mut dest, "").unwrap_err();

        match &err {
            InstallError::ConfigConflict {
                key,
                existing,
                incoming,
            } => {
                assert_eq!(key, "x.y");
                assert_eq!(existing, "1");
                assert_eq!(incoming, "2");
            },
            other => panic!("expected ConfigConflict, got: {other}"),
        }
        assert!(err.to_string().contains("x.y"));
    }

    #[test]
    fn equal_sequences_merge_and_different_ones_conflict() {
        let mut dest = mapping("list: [1, 2]");
        merge_config(&mapping("list: [1, 2]"), &mut dest, "").unwrap();

        let err = merge_config(&mapping("list: [1, 2, 3]"), &mut dest, "").unwrap_err();
        assert!(matches!(err, InstallError::ConfigConflict { ref key, .. } if key == "list"));
    }

    #[test]
    fn mapping_against_scalar_conflicts() {
        let mut dest = mapping("x: 1");
        let err = merge_config(&mapping("x: {y: 1}"), &mut dest, "").unwrap_err();
        assert!(matches!(err, InstallError::ConfigConflict { ref key, .. } if key == "x"));

        let mut dest = mapping("x: {y: 1}");
        let err = merge_config(&mapping("x: 1"), &mut dest, "").unwrap_err();
        assert!(matches!(err, InstallError::ConfigConflict { ref key, .. } if key == "x"));
    }

    #[test]
    fn prefix_appears_in_conflict_key() {
        let mut dest = mapping("a: 1");
        let err = merge_config(&mapping("a: 2"), &mut dest, "outer").unwrap_err();
        assert!(matches!(err, InstallError::ConfigConflict { ref key, .. } if key == "outer.a"));
    }

    #[test]
    fn global_config_seeds_root_directory() {
        let config = GlobalConfig::new(Path::new("/opt/plugins"));
        assert_eq!(
            config.as_mapping(),
            &mapping("dynamicPlugins: {rootDirectory: /opt/plugins}")
        );
    }

    #[test]
    fn global_config_merge_extends_dynamic_plugins() {
        let mut config = GlobalConfig::new(Path::new("root"));
        config
            .merge(
                "pkg",
                &mapping("dynamicPlugins: {frontend: {acme.foo: {mountPoints: []}}}"),
            )
            .unwrap();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("rootDirectory: root"));
        assert!(yaml.contains("acme.foo"));
    }

    #[test]
    fn global_config_conflict_leaves_tree_untouched() {
        let mut config = GlobalConfig::new(Path::new("root"));
        config.merge("first", &mapping("a: 1\nb: 1")).unwrap();
        let before = config.clone();

        // `c` would be added before the conflict on `b` is found.
        let err = config
            .merge("second", &mapping("c: 3\nb: 2"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConfigConflict);
        assert_eq!(config, before);
    }

    #[test]
    fn rendered_yaml_parses_back() {
        let mut config = GlobalConfig::new(Path::new("dynamic-plugins-root"));
        config.merge("pkg", &mapping("app: {title: Hello}")).unwrap();
        let round: Mapping = serde_yaml::from_str(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(&round, config.as_mapping());
    }
}
