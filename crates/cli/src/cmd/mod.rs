mod clean;
mod plan;
mod record;
mod status;
mod waves;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use partplan_lib::lifecycle::LifecycleManager;
use partplan_lib::plugin::PluginRegistry;
use partplan_lib::project::LifecycleConfig;

use crate::config::load_project_file;

pub use clean::cmd_clean;
pub use plan::cmd_plan;
pub use record::cmd_record;
pub use status::cmd_status;
pub use waves::cmd_waves;

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
  pub file: PathBuf,
  pub work_dir: PathBuf,
  pub app_name: String,
  pub arch: Option<String>,
  pub jobs: usize,
}

impl Context {
  /// Load the parts file and set up the lifecycle over it.
  pub fn lifecycle(&self) -> Result<LifecycleManager> {
    let project = load_project_file(&self.file)?;

    let mut config = LifecycleConfig::new(&self.app_name)
      .with_work_dir(&self.work_dir)
      .with_build_packages(project.build_packages)
      .with_parallel_build_count(self.jobs);
    if let Some(arch) = &self.arch {
      config = config.with_arch(arch);
    }

    LifecycleManager::new(project.parts, &config, PluginRegistry::builtin())
      .with_context(|| format!("Failed to load parts from {}", self.file.display()))
  }
}

/// Borrow owned CLI arguments as part names.
fn part_names(parts: &[String]) -> Vec<&str> {
  parts.iter().map(String::as_str).collect()
}
