//! Step state stored as JSON files.
//!
//! # Storage Layout
//!
//! ```text
//! <work_dir>/.partplan/<application>/state/
//! └── <part>/
//!     ├── pull.json
//!     ├── overlay.json
//!     ├── build.json
//!     ├── stage.json
//!     └── prime.json
//! ```
//!
//! Files are written atomically (write to temp, then rename) so an
//! interrupted executor never leaves a half-written record behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::project::ProjectInfo;
use crate::step::Step;

use super::store::StateStore;
use super::types::{StateError, StepState};

/// [`StateStore`] backed by one JSON file per (part, step).
#[derive(Debug, Clone)]
pub struct FileStateStore {
  base_path: PathBuf,
}

impl FileStateStore {
  /// Create a store rooted at `base_path`.
  pub fn new(base_path: PathBuf) -> Self {
    Self { base_path }
  }

  /// Create the store for a project's application-scoped state directory.
  pub fn for_project(info: &ProjectInfo) -> Self {
    Self::new(info.state_dir())
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn part_dir(&self, part: &str) -> PathBuf {
    self.base_path.join(part)
  }

  fn state_path(&self, part: &str, step: Step) -> PathBuf {
    self.part_dir(part).join(format!("{}.json", step))
  }

  fn corrupt(part: &str, step: Step, reason: impl Into<String>) -> StateError {
    StateError::Corrupt {
      part: part.to_string(),
      step,
      reason: reason.into(),
    }
  }
}

impl StateStore for FileStateStore {
  fn get(&self, part: &str, step: Step) -> Result<Option<StepState>, StateError> {
    let path = self.state_path(part, step);

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(StateError::Read(e)),
    };

    let state: StepState =
      serde_json::from_str(&content).map_err(|e| Self::corrupt(part, step, format!("unparseable: {}", e)))?;
    state
      .validate(part, step)
      .map_err(|reason| Self::corrupt(part, step, reason))?;

    debug!(part, step = %step, fingerprint = %state.fingerprint.short(), "loaded step state");
    Ok(Some(state))
  }

  fn put(&mut self, state: &StepState) -> Result<(), StateError> {
    let dir = self.part_dir(&state.part);
    fs::create_dir_all(&dir).map_err(StateError::CreateDir)?;

    let path = self.state_path(&state.part, state.step);
    let temp_path = dir.join(format!("{}.json.tmp", state.step));

    let content = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;
    fs::write(&temp_path, &content).map_err(StateError::Write)?;
    fs::rename(&temp_path, &path).map_err(StateError::Write)?;

    debug!(
      part = %state.part,
      step = %state.step,
      path = %path.display(),
      "step state saved"
    );
    Ok(())
  }

  fn remove(&mut self, part: &str, step: Step) -> Result<(), StateError> {
    match fs::remove_file(self.state_path(part, step)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(StateError::Remove(e)),
    }
  }

  fn remove_part(&mut self, part: &str) -> Result<(), StateError> {
    match fs::remove_dir_all(self.part_dir(part)) {
      Ok(()) => {
        debug!(part, "part state removed");
        Ok(())
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(StateError::Remove(e)),
    }
  }

  fn list(&self) -> Result<Vec<StepState>, StateError> {
    let entries = match fs::read_dir(&self.base_path) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(StateError::Read(e)),
    };

    let mut parts = Vec::new();
    for entry in entries {
      let entry = entry.map_err(StateError::Read)?;
      if entry.file_type().map_err(StateError::Read)?.is_dir()
        && let Some(name) = entry.file_name().to_str()
      {
        parts.push(name.to_string());
      }
    }
    parts.sort();

    let mut states = Vec::new();
    for part in &parts {
      for step in Step::ALL {
        match self.get(part, step) {
          Ok(Some(state)) => states.push(state),
          Ok(None) => {}
          Err(e) => warn!(part = %part, step = %step, error = %e, "skipping unreadable step state"),
        }
      }
    }
    Ok(states)
  }
}
