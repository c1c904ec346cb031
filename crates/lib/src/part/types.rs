use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::plugin::PluginIdentity;
use crate::step::Step;

/// Property key listing the parts this part runs after.
pub const AFTER_KEY: &str = "after";

/// Property key naming the part's plugin.
pub const PLUGIN_KEY: &str = "plugin";

/// Errors from building a [`Part`] out of its properties.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartError {
  #[error("invalid part name '{0}': names must be non-empty and must not contain path separators")]
  InvalidName(String),

  #[error("part '{part}' has an invalid '{key}' property: {reason}")]
  InvalidProperty { part: String, key: String, reason: String },
}

/// A named unit of the build.
///
/// Properties are kept verbatim; the sequencer only looks at the keys that
/// matter for each step. Dependencies come from the `after` property and keep
/// their declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
  pub name: String,
  pub properties: BTreeMap<String, Value>,
  pub dependencies: Vec<String>,
}

impl Part {
  /// Create a part from its raw properties.
  pub fn new(name: &str, properties: BTreeMap<String, Value>) -> Result<Self, PartError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
      return Err(PartError::InvalidName(name.to_string()));
    }

    let dependencies = match properties.get(AFTER_KEY) {
      None | Some(Value::Null) => Vec::new(),
      Some(Value::Array(items)) => {
        let mut deps: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
          let Some(dep) = item.as_str() else {
            return Err(PartError::InvalidProperty {
              part: name.to_string(),
              key: AFTER_KEY.to_string(),
              reason: format!("expected part names, found {}", item),
            });
          };
          if !deps.iter().any(|d| d == dep) {
            deps.push(dep.to_string());
          }
        }
        deps
      }
      Some(other) => {
        return Err(PartError::InvalidProperty {
          part: name.to_string(),
          key: AFTER_KEY.to_string(),
          reason: format!("expected a list, found {}", other),
        });
      }
    };

    if let Some(plugin) = properties.get(PLUGIN_KEY)
      && !plugin.is_string()
    {
      return Err(PartError::InvalidProperty {
        part: name.to_string(),
        key: PLUGIN_KEY.to_string(),
        reason: format!("expected a plugin name, found {}", plugin),
      });
    }

    Ok(Self {
      name: name.to_string(),
      properties,
      dependencies,
    })
  }

  /// A part with no properties besides its dependencies.
  pub fn with_after(name: &str, after: &[&str]) -> Result<Self, PartError> {
    let mut properties = BTreeMap::new();
    if !after.is_empty() {
      properties.insert(
        AFTER_KEY.to_string(),
        Value::Array(after.iter().map(|d| Value::String(d.to_string())).collect()),
      );
    }
    Self::new(name, properties)
  }

  /// Name of the plugin building this part. Defaults to the part name.
  pub fn plugin_name(&self) -> &str {
    self
      .properties
      .get(PLUGIN_KEY)
      .and_then(Value::as_str)
      .unwrap_or(&self.name)
  }

  /// The subset of properties that determine `step`.
  pub fn step_properties(&self, step: Step, plugin: &PluginIdentity) -> BTreeMap<String, Value> {
    let common = step.property_keys();
    self
      .properties
      .iter()
      .filter(|(key, _)| common.contains(&key.as_str()) || plugin.step_for_property(key) == Some(step))
      .map(|(key, value)| (key.clone(), value.clone()))
      .collect()
  }
}
