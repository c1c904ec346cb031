//! Plugin identities.
//!
//! The sequencer never runs plugins. It only needs to know which plugin a part
//! uses, that plugin's version, and which plugin-specific properties affect
//! pulling and building. A [`PluginRegistry`] is handed to the lifecycle at
//! construction and is read-only afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::step::Step;

/// Errors from plugin resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
  #[error("plugin '{plugin}' is not registered (used by part '{part}')")]
  UnknownPlugin { plugin: String, part: String },
}

/// What the sequencer knows about a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginIdentity {
  pub name: String,
  pub version: String,
  /// Plugin properties that change the pulled sources.
  #[serde(default)]
  pub pull_properties: Vec<String>,
  /// Plugin properties that change the build.
  #[serde(default)]
  pub build_properties: Vec<String>,
}

impl PluginIdentity {
  pub fn new(name: &str, version: &str) -> Self {
    Self {
      name: name.to_string(),
      version: version.to_string(),
      pull_properties: Vec::new(),
      build_properties: Vec::new(),
    }
  }

  pub fn with_pull_properties(mut self, keys: &[&str]) -> Self {
    self.pull_properties = keys.iter().map(|k| k.to_string()).collect();
    self
  }

  pub fn with_build_properties(mut self, keys: &[&str]) -> Self {
    self.build_properties = keys.iter().map(|k| k.to_string()).collect();
    self
  }

  /// The step a plugin-specific property belongs to.
  ///
  /// Declared pull properties count for `pull`. Declared build properties,
  /// and any undeclared key carrying the `<plugin>-` prefix, count for
  /// `build`. Keys unrelated to the plugin return `None`.
  pub fn step_for_property(&self, key: &str) -> Option<Step> {
    if self.pull_properties.iter().any(|k| k == key) {
      return Some(Step::Pull);
    }
    if self.build_properties.iter().any(|k| k == key) {
      return Some(Step::Build);
    }
    let prefix = format!("{}-", self.name);
    if key.starts_with(&prefix) {
      return Some(Step::Build);
    }
    None
  }
}

/// Lookup table from plugin name to [`PluginIdentity`].
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
  plugins: BTreeMap<String, PluginIdentity>,
}

impl PluginRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with the plugins shipped with this crate.
  pub fn builtin() -> Self {
    let mut registry = Self::new();
    registry.register(PluginIdentity::new("nil", "1.0"));
    registry.register(PluginIdentity::new("dump", "1.0"));
    registry.register(PluginIdentity::new("make", "1.0").with_build_properties(&["make-parameters"]));
    registry.register(
      PluginIdentity::new("autotools", "1.0")
        .with_build_properties(&["autotools-configure-parameters", "autotools-bootstrap-parameters"]),
    );
    registry.register(
      PluginIdentity::new("cmake", "1.0").with_build_properties(&["cmake-parameters", "cmake-generator"]),
    );
    registry.register(PluginIdentity::new("meson", "1.0").with_build_properties(&["meson-parameters"]));
    registry.register(PluginIdentity::new("python", "1.0").with_build_properties(&[
      "python-requirements",
      "python-constraints",
      "python-packages",
    ]));
    registry.register(
      PluginIdentity::new("go", "1.0")
        .with_pull_properties(&["go-generate"])
        .with_build_properties(&["go-buildtags"]),
    );
    registry.register(
      PluginIdentity::new("rust", "1.0")
        .with_pull_properties(&["rust-channel"])
        .with_build_properties(&["rust-features", "rust-path", "rust-no-default-features"]),
    );
    registry.register(
      PluginIdentity::new("npm", "1.0")
        .with_pull_properties(&["npm-node-version"])
        .with_build_properties(&["npm-include-node"]),
    );
    registry
  }

  /// Register a plugin, replacing any previous entry with the same name.
  pub fn register(&mut self, identity: PluginIdentity) {
    self.plugins.insert(identity.name.clone(), identity);
  }

  /// Look up a plugin by name.
  pub fn get(&self, name: &str) -> Option<&PluginIdentity> {
    self.plugins.get(name)
  }

  /// Resolve the plugin used by `part`.
  pub fn resolve(&self, plugin: &str, part: &str) -> Result<&PluginIdentity, PluginError> {
    self.get(plugin).ok_or_else(|| PluginError::UnknownPlugin {
      plugin: plugin.to_string(),
      part: part.to_string(),
    })
  }
}
