//! The sequencer: plans which steps must run to reach a target.
//!
//! Planning is a pure function of the part graph, the project configuration,
//! the plugin identities and a snapshot of persisted step state. It never
//! writes state; the executor records each step once it has actually run.
//!
//! # Algorithm
//!
//! 1. Close the selection over dependencies and sort it topologically.
//! 2. Give every part a target step: selected parts reach the requested
//!    step, dependencies reach whatever their dependents consume.
//! 3. Compute the wanted inputs and fingerprint of every step.
//! 4. Walk parts in order and steps in lattice order, comparing wanted
//!    fingerprints with persisted ones. Anything scheduled earlier in the
//!    same part, or in a consumed dependency step, forces a rerun.

mod inputs;
mod types;

pub use inputs::PlannedStep;
pub use types::*;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, info, trace, warn};

use crate::part::PartGraph;
use crate::plugin::{PluginError, PluginIdentity, PluginRegistry};
use crate::project::ProjectInfo;
use crate::state::{StateStore, StepState};
use crate::step::Step;

/// Plans actions over a borrowed part graph and project.
#[derive(Debug, Clone)]
pub struct Sequencer<'a> {
  graph: &'a PartGraph,
  project: &'a ProjectInfo,
  /// Plugin identity per part name.
  plugins: BTreeMap<String, PluginIdentity>,
}

impl<'a> Sequencer<'a> {
  /// Resolve every part's plugin and create the sequencer.
  pub fn new(graph: &'a PartGraph, project: &'a ProjectInfo, registry: &PluginRegistry) -> Result<Self, PluginError> {
    let mut plugins = BTreeMap::new();
    for part in graph.parts() {
      let identity = registry.resolve(part.plugin_name(), &part.name)?;
      plugins.insert(part.name.clone(), identity.clone());
    }
    Ok(Self { graph, project, plugins })
  }

  pub fn graph(&self) -> &PartGraph {
    self.graph
  }

  pub fn project(&self) -> &ProjectInfo {
    self.project
  }

  /// Actions needed to bring `part_names` (all parts when empty) to `target`.
  ///
  /// Up-to-date steps are left out, so an empty list means there is nothing
  /// to do.
  pub fn plan(&self, target: Step, part_names: &[&str], store: &dyn StateStore) -> Result<Vec<Action>, PlanError> {
    self.sequence(target, part_names, store, false)
  }

  /// Like [`plan`](Self::plan), but also reports skipped steps.
  pub fn trace(&self, target: Step, part_names: &[&str], store: &dyn StateStore) -> Result<Vec<Action>, PlanError> {
    self.sequence(target, part_names, store, true)
  }

  fn sequence(
    &self,
    target: Step,
    part_names: &[&str],
    store: &dyn StateStore,
    include_skipped: bool,
  ) -> Result<Vec<Action>, PlanError> {
    for name in part_names {
      if !self.graph.contains(name) {
        return Err(PlanError::UnknownPart(name.to_string()));
      }
    }

    let selection: Vec<&str> = if part_names.is_empty() {
      self.graph.names().collect()
    } else {
      part_names.to_vec()
    };
    debug!(target_step = %target, selection = ?selection, "planning");

    let order = self.graph.closure(&selection)?;
    let targets = self.part_targets(target, &selection, &order)?;
    let planned = inputs::compute(self.graph, &order, self.project, &self.plugins)?;

    let mut scheduled: HashSet<(&str, Step)> = HashSet::new();
    let mut actions = Vec::new();

    for &part in &order {
      let Some(&part_target) = targets.get(part) else {
        trace!(part, "no step of this part is needed");
        continue;
      };

      let mut earlier_scheduled: Option<Step> = None;
      for step in part_target.up_to() {
        let Some(wanted) = planned.get(&(part, step)) else {
          return Err(PlanError::Inconsistent(format!("no inputs computed for {}:{}", part, step)));
        };

        let (kind, reason) = match store.get(part, step) {
          Ok(None) => (ActionKind::Run, ActionReason::NeverRun),
          Ok(Some(state)) => self.compare(&state, wanted, earlier_scheduled, &scheduled),
          Err(e) => {
            warn!(part, step = %step, error = %e, "ignoring unreadable step state");
            (
              ActionKind::Run,
              ActionReason::StateUnreadable { message: e.to_string() },
            )
          }
        };

        trace!(part, step = %step, kind = %kind, reason = %reason, "step decided");

        if kind != ActionKind::Skip {
          scheduled.insert((part, step));
          if earlier_scheduled.is_none() {
            earlier_scheduled = Some(step);
          }
        }

        if kind != ActionKind::Skip || include_skipped {
          actions.push(Action {
            part: part.to_string(),
            step,
            kind,
            reason,
            fingerprint: wanted.fingerprint.clone(),
            inputs: wanted.inputs.clone(),
          });
        }
      }
    }

    info!(
      target_step = %target,
      parts = order.len(),
      scheduled = scheduled.len(),
      "plan computed"
    );
    Ok(actions)
  }

  /// Work out how far each part must go.
  ///
  /// Selected parts reach at least `target`. Walking dependents before dependencies,
  /// every dependency is raised to the step its dependents consume. Parts
  /// that end up with no step are left out of the map.
  fn part_targets(&self, target: Step, selection: &[&str], order: &[&'a str]) -> Result<HashMap<&'a str, Step>, PlanError> {
    let selected: HashSet<&str> = selection.iter().copied().collect();
    let mut targets: HashMap<&'a str, Step> = HashMap::new();

    for &part in order.iter().rev() {
      // Dependents may already have raised a selected part past `target`.
      if selected.contains(part) {
        raise(&mut targets, part, target);
      }
      let Some(&part_target) = targets.get(part) else {
        continue;
      };
      let Some(required) = part_target.up_to().filter_map(Step::dependency_prerequisite).max() else {
        continue;
      };
      for dep in self.graph.dependencies(part)? {
        raise(&mut targets, dep, required);
      }
    }

    Ok(targets)
  }

  /// Decide what to do with a step that has persisted state.
  fn compare(
    &self,
    state: &StepState,
    wanted: &PlannedStep,
    earlier_scheduled: Option<Step>,
    scheduled: &HashSet<(&str, Step)>,
  ) -> (ActionKind, ActionReason) {
    let step = wanted.inputs.step;

    let mut changed_deps: BTreeSet<String> = BTreeSet::new();
    if let Some(prerequisite) = step.dependency_prerequisite() {
      for (dep, fingerprint) in &wanted.inputs.dependencies {
        let rerun = prerequisite.up_to().any(|s| scheduled.contains(&(dep.as_str(), s)));
        if rerun || state.inputs.dependencies.get(dep) != Some(fingerprint) {
          changed_deps.insert(dep.clone());
        }
      }
    }
    for dep in state.inputs.dependencies.keys() {
      if !wanted.inputs.dependencies.contains_key(dep) {
        changed_deps.insert(dep.clone());
      }
    }
    if !changed_deps.is_empty() {
      return (
        ActionKind::Rerun,
        ActionReason::DependencyChanged {
          parts: changed_deps.into_iter().collect(),
        },
      );
    }

    if let Some(earlier) = earlier_scheduled {
      return (ActionKind::Rerun, ActionReason::EarlierStepScheduled { step: earlier });
    }

    if state.fingerprint == wanted.fingerprint {
      return (ActionKind::Skip, ActionReason::UpToDate);
    }

    let keys = changed_keys(&state.inputs.properties, &wanted.inputs.properties);
    if !keys.is_empty() {
      return (ActionKind::Rerun, ActionReason::PropertiesChanged { keys });
    }

    if state.inputs.plugin != wanted.inputs.plugin {
      let plugin = wanted
        .inputs
        .plugin
        .as_ref()
        .or(state.inputs.plugin.as_ref())
        .map(|p| p.name.clone())
        .unwrap_or_default();
      return (ActionKind::Rerun, ActionReason::PluginChanged { plugin });
    }

    let keys = changed_keys(&state.inputs.project, &wanted.inputs.project);
    if !keys.is_empty() {
      return (ActionKind::Rerun, ActionReason::ProjectChanged { keys });
    }

    // Only the chained fingerprint of the previous step can differ now.
    let previous = step.previous().unwrap_or(step);
    (ActionKind::Rerun, ActionReason::EarlierStepChanged { step: previous })
  }
}

/// Lift the target of `part` to at least `step`.
fn raise<'g>(targets: &mut HashMap<&'g str, Step>, part: &'g str, step: Step) {
  let entry = targets.entry(part).or_insert(step);
  if *entry < step {
    *entry = step;
  }
}

/// Keys whose values differ between two property maps, sorted.
fn changed_keys<V: PartialEq>(old: &BTreeMap<String, V>, new: &BTreeMap<String, V>) -> Vec<String> {
  let all: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
  all
    .into_iter()
    .filter(|key| old.get(*key) != new.get(*key))
    .cloned()
    .collect()
}
