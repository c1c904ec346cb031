//! Loading the parts file.
//!
//! ```yaml
//! build-packages: [gcc]
//! parts:
//!   liba:
//!     plugin: make
//!     source: https://example.com/liba.tar.gz
//!   app:
//!     plugin: nil
//!     after: [liba]
//! ```
//!
//! Parts keep the order they are declared in, which breaks ties in the
//! planned order.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;

use partplan_lib::part::Part;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawProjectFile {
  #[serde(default)]
  parts: serde_yaml::Mapping,
  #[serde(default)]
  build_packages: Vec<String>,
}

/// Contents of a parts file.
#[derive(Debug)]
pub struct ProjectFile {
  pub parts: Vec<Part>,
  pub build_packages: Vec<String>,
}

pub fn load_project_file(path: &Path) -> Result<ProjectFile> {
  let content = fs::read_to_string(path).with_context(|| format!("Failed to read parts file: {}", path.display()))?;
  parse_project_file(&content).with_context(|| format!("Invalid parts file: {}", path.display()))
}

pub fn parse_project_file(content: &str) -> Result<ProjectFile> {
  let raw: RawProjectFile = serde_yaml::from_str(content).context("Failed to parse YAML")?;

  let mut parts = Vec::with_capacity(raw.parts.len());
  for (key, value) in &raw.parts {
    let Some(name) = key.as_str() else {
      bail!("part names must be strings, got {:?}", key);
    };

    let properties: BTreeMap<String, Value> = if value.is_null() {
      BTreeMap::new()
    } else {
      let json = serde_json::to_value(value).with_context(|| format!("Part '{}' has unsupported values", name))?;
      serde_json::from_value(json).with_context(|| format!("Part '{}' must be a mapping of properties", name))?
    };

    parts.push(Part::new(name, properties)?);
  }

  Ok(ProjectFile {
    parts,
    build_packages: raw.build_packages,
  })
}
