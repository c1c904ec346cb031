use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::part::GraphError;
use crate::state::{StepInputs, StepState};
use crate::step::Step;
use crate::util::hash::{Fingerprint, HashError};

/// What the executor should do with a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
  /// The step never completed.
  Run,
  /// The step completed before but its result is stale.
  Rerun,
  /// The step is up to date.
  Skip,
}

impl fmt::Display for ActionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ActionKind::Run => "run",
      ActionKind::Rerun => "rerun",
      ActionKind::Skip => "skip",
    };
    write!(f, "{}", s)
  }
}

/// Why an action was planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "kebab-case")]
pub enum ActionReason {
  NeverRun,
  /// The persisted state could not be trusted and was ignored.
  StateUnreadable { message: String },
  UpToDate,
  /// A consumed dependency step was scheduled or changed.
  DependencyChanged { parts: Vec<String> },
  /// An earlier step of the same part is scheduled in this plan.
  EarlierStepScheduled { step: Step },
  /// An earlier step of the same part completed with different inputs.
  EarlierStepChanged { step: Step },
  PropertiesChanged { keys: Vec<String> },
  ProjectChanged { keys: Vec<String> },
  PluginChanged { plugin: String },
}

fn quoted(names: &[String]) -> String {
  names.iter().map(|n| format!("'{}'", n)).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for ActionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ActionReason::NeverRun => write!(f, "never executed"),
      ActionReason::StateUnreadable { message } => write!(f, "never executed (state unreadable: {})", message),
      ActionReason::UpToDate => write!(f, "up to date"),
      ActionReason::DependencyChanged { parts } if parts.len() == 1 => {
        write!(f, "stale: dependency {} changed", quoted(parts))
      }
      ActionReason::DependencyChanged { parts } => write!(f, "stale: dependencies {} changed", quoted(parts)),
      ActionReason::EarlierStepScheduled { step } => write!(f, "stale: earlier step '{}' is scheduled", step),
      ActionReason::EarlierStepChanged { step } => write!(f, "stale: earlier step '{}' changed", step),
      ActionReason::PropertiesChanged { keys } if keys.len() == 1 => {
        write!(f, "stale: {} property changed", quoted(keys))
      }
      ActionReason::PropertiesChanged { keys } => write!(f, "stale: {} properties changed", quoted(keys)),
      ActionReason::ProjectChanged { keys } if keys.len() == 1 => {
        write!(f, "stale: project option {} changed", quoted(keys))
      }
      ActionReason::ProjectChanged { keys } => write!(f, "stale: project options {} changed", quoted(keys)),
      ActionReason::PluginChanged { plugin } => write!(f, "stale: plugin '{}' changed", plugin),
    }
  }
}

/// One planned step for one part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
  pub part: String,
  pub step: Step,
  pub kind: ActionKind,
  pub reason: ActionReason,
  /// Fingerprint of `inputs`.
  pub fingerprint: Fingerprint,
  /// The inputs the step will run with.
  pub inputs: StepInputs,
}

impl Action {
  /// The state an executor records once this action has succeeded.
  pub fn completed_state(&self) -> Result<StepState, HashError> {
    StepState::completed(self.inputs.clone())
  }

  pub fn is_skip(&self) -> bool {
    self.kind == ActionKind::Skip
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}:{} ({})", self.kind, self.part, self.step, self.reason)
  }
}

/// Errors that abort planning. Planning never returns a partial plan.
#[derive(Debug, Error)]
pub enum PlanError {
  #[error("part '{0}' is not defined")]
  UnknownPart(String),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("failed to fingerprint step inputs: {0}")]
  Fingerprint(#[from] HashError),

  /// Planner bookkeeping disagrees with the part graph.
  #[error("inconsistent plan: {0}")]
  Inconsistent(String),
}
