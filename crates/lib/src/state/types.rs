use std::collections::BTreeMap;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::consts::{MAX_COMPLETED_AT, STATE_FORMAT_VERSION};
use crate::step::Step;
use crate::util::hash::{Fingerprint, HashError, Hashable};

/// Plugin name and version as recorded in step inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
  pub name: String,
  pub version: String,
}

/// Everything that determines the outcome of one (part, step).
///
/// The fingerprint of a step is the hash of this struct. The individual
/// fields are kept alongside the fingerprint so that a changed input can be
/// named when explaining why a step must run again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInputs {
  pub part: String,
  pub step: Step,
  /// Part properties relevant to this step.
  pub properties: BTreeMap<String, Value>,
  /// Project-wide options relevant to this step.
  pub project: BTreeMap<String, Value>,
  /// Set for steps whose outcome depends on the plugin.
  pub plugin: Option<PluginRef>,
  /// Fingerprint of the same part's previous step.
  pub previous: Option<Fingerprint>,
  /// Fingerprints of the dependency steps this step consumes, by part name.
  pub dependencies: BTreeMap<String, Fingerprint>,
}

impl Hashable for StepInputs {}

/// Persisted record of a completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState {
  pub version: u32,
  pub part: String,
  pub step: Step,
  pub fingerprint: Fingerprint,
  pub inputs: StepInputs,
  /// Completion time, seconds since the Unix epoch.
  pub completed_at: u64,
}

impl StepState {
  /// Record `inputs` as completed now.
  pub fn completed(inputs: StepInputs) -> Result<Self, HashError> {
    let completed_at = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_secs())
      .unwrap_or(0);
    Self::completed_at(inputs, completed_at)
  }

  /// Record `inputs` as completed at a given time.
  pub fn completed_at(inputs: StepInputs, completed_at: u64) -> Result<Self, HashError> {
    let fingerprint = inputs.compute_hash()?;
    Ok(Self {
      version: STATE_FORMAT_VERSION,
      part: inputs.part.clone(),
      step: inputs.step,
      fingerprint,
      inputs,
      completed_at,
    })
  }

  /// Check that the record agrees with itself and with the key it was stored
  /// under. Returns a description of the first problem found.
  pub fn validate(&self, part: &str, step: Step) -> Result<(), String> {
    if self.version != STATE_FORMAT_VERSION {
      return Err(format!("unsupported state version {}", self.version));
    }
    if self.part != part || self.inputs.part != part {
      return Err(format!("state belongs to part '{}'", self.part));
    }
    if self.step != step || self.inputs.step != step {
      return Err(format!("state belongs to step '{}'", self.step));
    }
    if self.completed_at > MAX_COMPLETED_AT {
      return Err(format!("completion time {} is out of range", self.completed_at));
    }
    let expected = self.inputs.compute_hash().map_err(|e| e.to_string())?;
    if expected != self.fingerprint {
      return Err("fingerprint does not match recorded inputs".to_string());
    }
    Ok(())
  }
}

/// Errors from reading or writing step state.
#[derive(Debug, Error)]
pub enum StateError {
  #[error("failed to read step state: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write step state: {0}")]
  Write(#[source] io::Error),

  #[error("failed to create state directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to remove step state: {0}")]
  Remove(#[source] io::Error),

  #[error("failed to serialize step state: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("corrupt state for part '{part}' step '{step}': {reason}")]
  Corrupt { part: String, step: Step, reason: String },
}
