//! Project-wide configuration.
//!
//! [`LifecycleConfig`] lists every option the lifecycle accepts. It is
//! validated once into a [`ProjectInfo`], which is immutable and shared by
//! reference for the rest of the lifecycle.

pub mod arch;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::consts::{DATA_DIR_NAME, DEFAULT_PLUGIN_VERSION, STATE_DIR_NAME, SUPPORTED_PLUGIN_VERSIONS};
use crate::step::Step;
use arch::Arch;

/// Errors from validating a [`LifecycleConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("invalid application name '{0}': use ASCII letters, digits, '-' and '_', starting with a letter or digit")]
  InvalidApplicationName(String),

  #[error("unsupported architecture '{0}'")]
  UnsupportedArch(String),

  #[error("unable to detect the host architecture '{0}'; set one explicitly")]
  UnknownHostArch(String),

  #[error("unsupported plugin API version '{0}'")]
  UnsupportedPluginVersion(String),

  #[error("parallel build count must be at least 1")]
  InvalidParallelBuildCount,
}

/// Options accepted when creating a lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
  /// Namespaces persisted state so independent applications never collide.
  pub application_name: String,
  /// Extra build packages shared by every part.
  pub build_packages: Vec<String>,
  /// Top-level directory for the tool's data.
  pub work_dir: PathBuf,
  /// Target architecture. `None` means the host architecture.
  pub arch: Option<String>,
  /// Maximum number of concurrent jobs an executor may use.
  pub parallel_build_count: usize,
  /// Plugin API version.
  pub plugin_version: String,
  /// Forwarded to plugins and executors, not interpreted by the core.
  pub custom_args: BTreeMap<String, Value>,
}

impl LifecycleConfig {
  pub fn new(application_name: &str) -> Self {
    Self {
      application_name: application_name.to_string(),
      build_packages: Vec::new(),
      work_dir: PathBuf::from("."),
      arch: None,
      parallel_build_count: 1,
      plugin_version: DEFAULT_PLUGIN_VERSION.to_string(),
      custom_args: BTreeMap::new(),
    }
  }

  pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
    self.work_dir = work_dir.into();
    self
  }

  pub fn with_arch(mut self, arch: &str) -> Self {
    self.arch = Some(arch.to_string());
    self
  }

  pub fn with_build_packages<I, S>(mut self, packages: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.build_packages = packages.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_parallel_build_count(mut self, count: usize) -> Self {
    self.parallel_build_count = count;
    self
  }

  pub fn with_plugin_version(mut self, version: &str) -> Self {
    self.plugin_version = version.to_string();
    self
  }

  pub fn with_custom_arg(mut self, key: &str, value: Value) -> Self {
    self.custom_args.insert(key.to_string(), value);
    self
  }
}

/// Directory layout rooted at the work directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDirs {
  work_dir: PathBuf,
}

impl ProjectDirs {
  pub fn new(work_dir: impl Into<PathBuf>) -> Self {
    Self {
      work_dir: work_dir.into(),
    }
  }

  pub fn work_dir(&self) -> &Path {
    &self.work_dir
  }

  /// Per-application data directory, e.g. `<work_dir>/.partplan/<app>`.
  pub fn data_dir(&self, application_name: &str) -> PathBuf {
    self.work_dir.join(DATA_DIR_NAME).join(application_name)
  }

  /// Per-application step state directory.
  pub fn state_dir(&self, application_name: &str) -> PathBuf {
    self.data_dir(application_name).join(STATE_DIR_NAME)
  }
}

/// Validated, immutable project configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInfo {
  application_name: String,
  target_arch: Arch,
  parallel_build_count: usize,
  plugin_version: String,
  build_packages: Vec<String>,
  #[serde(skip)]
  dirs: ProjectDirs,
  custom_args: BTreeMap<String, Value>,
}

impl ProjectInfo {
  pub fn new(config: &LifecycleConfig) -> Result<Self, ConfigError> {
    validate_application_name(&config.application_name)?;

    let target_arch = match config.arch.as_deref().map(str::trim) {
      Some(name) if !name.is_empty() => name.parse::<Arch>().map_err(ConfigError::UnsupportedArch)?,
      _ => Arch::host().ok_or_else(|| ConfigError::UnknownHostArch(std::env::consts::ARCH.to_string()))?,
    };

    if !SUPPORTED_PLUGIN_VERSIONS.contains(&config.plugin_version.as_str()) {
      return Err(ConfigError::UnsupportedPluginVersion(config.plugin_version.clone()));
    }

    if config.parallel_build_count == 0 {
      return Err(ConfigError::InvalidParallelBuildCount);
    }

    let mut build_packages = config.build_packages.clone();
    build_packages.sort();
    build_packages.dedup();

    Ok(Self {
      application_name: config.application_name.clone(),
      target_arch,
      parallel_build_count: config.parallel_build_count,
      plugin_version: config.plugin_version.clone(),
      build_packages,
      dirs: ProjectDirs::new(config.work_dir.clone()),
      custom_args: config.custom_args.clone(),
    })
  }

  pub fn application_name(&self) -> &str {
    &self.application_name
  }

  pub fn target_arch(&self) -> Arch {
    self.target_arch
  }

  pub fn parallel_build_count(&self) -> usize {
    self.parallel_build_count
  }

  pub fn plugin_version(&self) -> &str {
    &self.plugin_version
  }

  /// Extra build packages, sorted and deduplicated.
  pub fn build_packages(&self) -> &[String] {
    &self.build_packages
  }

  pub fn dirs(&self) -> &ProjectDirs {
    &self.dirs
  }

  pub fn state_dir(&self) -> PathBuf {
    self.dirs.state_dir(&self.application_name)
  }

  pub fn custom_args(&self) -> &BTreeMap<String, Value> {
    &self.custom_args
  }

  pub fn custom_arg(&self, key: &str) -> Option<&Value> {
    self.custom_args.get(key)
  }

  /// Project-wide inputs that determine `step` for every part.
  pub fn step_inputs(&self, step: Step) -> BTreeMap<String, Value> {
    let mut inputs = BTreeMap::new();
    match step {
      Step::Pull => {
        inputs.insert("target-arch".to_string(), Value::from(self.target_arch.as_str()));
        inputs.insert("plugin-version".to_string(), Value::from(self.plugin_version.as_str()));
      }
      Step::Build => {
        inputs.insert(
          "build-packages".to_string(),
          Value::from(self.build_packages.clone()),
        );
      }
      Step::Overlay | Step::Stage | Step::Prime => {}
    }
    inputs
  }
}

fn validate_application_name(name: &str) -> Result<(), ConfigError> {
  let mut chars = name.chars();
  let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
  let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
  if valid_start && valid_rest {
    Ok(())
  } else {
    Err(ConfigError::InvalidApplicationName(name.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_validate() {
    let info = ProjectInfo::new(&LifecycleConfig::new("myapp").with_arch("amd64")).unwrap();
    assert_eq!(info.application_name(), "myapp");
    assert_eq!(info.target_arch(), Arch::Amd64);
    assert_eq!(info.parallel_build_count(), 1);
    assert_eq!(info.plugin_version(), "v2");
    assert_eq!(info.state_dir(), PathBuf::from("./.partplan/myapp/state"));
  }

  #[test]
  fn host_arch_is_default() {
    if let Some(host) = Arch::host() {
      let info = ProjectInfo::new(&LifecycleConfig::new("app")).unwrap();
      assert_eq!(info.target_arch(), host);
    }
  }

  #[test]
  fn rejects_bad_application_names() {
    for name in ["", "-app", "my app", "app/x", "ünï"] {
      let err = ProjectInfo::new(&LifecycleConfig::new(name).with_arch("amd64")).unwrap_err();
      assert_eq!(err, ConfigError::InvalidApplicationName(name.to_string()));
    }
    assert!(ProjectInfo::new(&LifecycleConfig::new("snap_craft-2").with_arch("amd64")).is_ok());
  }

  #[test]
  fn rejects_unsupported_options() {
    let base = LifecycleConfig::new("app").with_arch("amd64");
    assert_eq!(
      ProjectInfo::new(&base.clone().with_arch("sparc")).unwrap_err(),
      ConfigError::UnsupportedArch("sparc".to_string())
    );
    assert_eq!(
      ProjectInfo::new(&base.clone().with_plugin_version("v1")).unwrap_err(),
      ConfigError::UnsupportedPluginVersion("v1".to_string())
    );
    assert_eq!(
      ProjectInfo::new(&base.with_parallel_build_count(0)).unwrap_err(),
      ConfigError::InvalidParallelBuildCount
    );
  }

  #[test]
  fn build_packages_are_normalized() {
    let config = LifecycleConfig::new("app")
      .with_arch("arm64")
      .with_build_packages(["make", "gcc", "make"]);
    let info = ProjectInfo::new(&config).unwrap();
    assert_eq!(info.build_packages(), &["gcc".to_string(), "make".to_string()]);

    let inputs = info.step_inputs(Step::Build);
    assert_eq!(inputs["build-packages"], serde_json::json!(["gcc", "make"]));
    assert!(info.step_inputs(Step::Stage).is_empty());
    assert_eq!(info.step_inputs(Step::Pull)["target-arch"], "arm64");
  }

  #[test]
  fn custom_args_are_forwarded_verbatim() {
    let config = LifecycleConfig::new("app")
      .with_arch("amd64")
      .with_custom_arg("base", serde_json::json!("core22"));
    let info = ProjectInfo::new(&config).unwrap();
    assert_eq!(info.custom_arg("base"), Some(&serde_json::json!("core22")));
    assert!(info.custom_arg("missing").is_none());
  }
}
