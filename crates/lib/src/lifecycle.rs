//! The lifecycle façade.
//!
//! [`LifecycleManager`] validates parts and configuration once, then answers
//! planning requests against its state store. It never executes steps: an
//! executor runs the returned actions and reports each success back through
//! [`record`](LifecycleManager::record).

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, info};

use crate::part::{GraphError, Part, PartError, PartGraph};
use crate::plugin::{PluginError, PluginRegistry};
use crate::project::{ConfigError, LifecycleConfig, ProjectInfo};
use crate::schedule::ExecutionWaves;
use crate::sequencer::{Action, PlanError, Sequencer};
use crate::state::{FileStateStore, StateError, StateStore, StepState};
use crate::step::{Step, StepError};
use crate::util::hash::HashError;

/// Everything that can go wrong while driving the lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Part(#[from] PartError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Plugin(#[from] PluginError),

  #[error(transparent)]
  Step(#[from] StepError),

  #[error(transparent)]
  Plan(#[from] PlanError),

  #[error("state store error: {0}")]
  State(#[from] StateError),

  #[error("failed to fingerprint step inputs: {0}")]
  Hash(#[from] HashError),
}

/// Parts plus project configuration, planned against a state store.
#[derive(Debug)]
pub struct LifecycleManager<S: StateStore = FileStateStore> {
  graph: PartGraph,
  project: ProjectInfo,
  registry: PluginRegistry,
  store: S,
}

impl LifecycleManager<FileStateStore> {
  /// Create a manager persisting state under the configured work directory.
  pub fn new(parts: Vec<Part>, config: &LifecycleConfig, registry: PluginRegistry) -> Result<Self, LifecycleError> {
    let project = ProjectInfo::new(config)?;
    let store = FileStateStore::for_project(&project);
    Self::assemble(parts, project, registry, store)
  }
}

impl<S: StateStore> LifecycleManager<S> {
  /// Create a manager over an explicit state store.
  pub fn with_store(
    parts: Vec<Part>,
    config: &LifecycleConfig,
    registry: PluginRegistry,
    store: S,
  ) -> Result<Self, LifecycleError> {
    let project = ProjectInfo::new(config)?;
    Self::assemble(parts, project, registry, store)
  }

  fn assemble(parts: Vec<Part>, project: ProjectInfo, registry: PluginRegistry, store: S) -> Result<Self, LifecycleError> {
    let graph = PartGraph::new(parts)?;
    // Fail on unknown plugins now rather than at the first plan.
    Sequencer::new(&graph, &project, &registry)?;

    info!(
      application = project.application_name(),
      parts = graph.len(),
      arch = %project.target_arch(),
      "lifecycle ready"
    );
    Ok(Self {
      graph,
      project,
      registry,
      store,
    })
  }

  pub fn project_info(&self) -> &ProjectInfo {
    &self.project
  }

  pub fn graph(&self) -> &PartGraph {
    &self.graph
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn store_mut(&mut self) -> &mut S {
    &mut self.store
  }

  fn sequencer(&self) -> Result<Sequencer<'_>, LifecycleError> {
    Ok(Sequencer::new(&self.graph, &self.project, &self.registry)?)
  }

  /// Actions needed to bring `part_names` (all parts when empty) to `target`.
  pub fn plan(&self, target: Step, part_names: &[&str]) -> Result<Vec<Action>, LifecycleError> {
    Ok(self.sequencer()?.plan(target, part_names, &self.store)?)
  }

  /// Every visited step, including the ones that would be skipped.
  pub fn trace(&self, target: Step, part_names: &[&str]) -> Result<Vec<Action>, LifecycleError> {
    Ok(self.sequencer()?.trace(target, part_names, &self.store)?)
  }

  /// The plan for `target`, grouped into concurrent waves of at most the
  /// project's parallel build count.
  pub fn waves(&self, target: Step, part_names: &[&str]) -> Result<ExecutionWaves, LifecycleError> {
    let actions = self.plan(target, part_names)?;
    Ok(ExecutionWaves::from_actions(
      &actions,
      &self.graph,
      self.project.parallel_build_count(),
    )?)
  }

  /// Persist the state of a step the executor has completed.
  pub fn record(&mut self, action: &Action) -> Result<StepState, LifecycleError> {
    let state = action.completed_state()?;
    self.store.put(&state)?;
    debug!(part = %action.part, step = %action.step, fingerprint = %state.fingerprint.short(), "step recorded");
    Ok(state)
  }

  /// Persisted state of every step, ordered by part then step.
  pub fn status(&self) -> Result<Vec<StepState>, LifecycleError> {
    Ok(self.store.list()?)
  }

  /// Forget the state of `part_names`, or of every part when empty.
  ///
  /// Parts that are no longer defined but still have recorded state may be
  /// named too. Returns the parts that were cleaned.
  pub fn clean(&mut self, part_names: &[&str]) -> Result<Vec<String>, LifecycleError> {
    let mut known: BTreeSet<String> = self.graph.names().map(str::to_string).collect();
    known.extend(self.store.list()?.into_iter().map(|state| state.part));

    let targets: Vec<String> = if part_names.is_empty() {
      known.into_iter().collect()
    } else {
      let mut targets = Vec::new();
      for name in part_names {
        if !known.contains(*name) {
          return Err(PlanError::UnknownPart(name.to_string()).into());
        }
        targets.push(name.to_string());
      }
      targets
    };

    for part in &targets {
      self.store.remove_part(part)?;
      if self.graph.contains(part) {
        let dependents = self.graph.dependents(part)?;
        if !dependents.is_empty() {
          info!(part = %part, dependents = ?dependents, "cleaned part has dependents that will rebuild");
        }
      }
    }
    info!(parts = ?targets, "state cleaned");
    Ok(targets)
  }
}
