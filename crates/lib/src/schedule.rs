//! Grouping planned actions into waves an executor may run concurrently.
//!
//! An action lands in the first wave after every earlier action of the same
//! part and after every action on the dependency steps it consumes. Actions
//! in one wave are independent of each other; each wave is further cut into
//! batches no larger than the project's parallel build count.
//!
//! For example, with `b` after `a` and a plan of `a:pull..a:stage` and
//! `b:pull..b:build`, the waves are:
//! - Wave 0: [a:pull, b:pull]
//! - Wave 1: [a:overlay, b:overlay]
//! - Wave 2: [a:build]
//! - Wave 3: [a:stage]
//! - Wave 4: [b:build]

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::part::PartGraph;
use crate::sequencer::{Action, PlanError};
use crate::step::Step;

/// Planned actions grouped by level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionWaves {
  waves: Vec<Vec<Action>>,
  parallel: usize,
}

impl ExecutionWaves {
  /// Group `actions`, which must be in plan order. Skipped actions are
  /// dropped. `parallel` below one is treated as one.
  pub fn from_actions(actions: &[Action], graph: &PartGraph, parallel: usize) -> Result<Self, PlanError> {
    let mut levels: HashMap<(&str, Step), usize> = HashMap::new();
    let mut waves: Vec<Vec<Action>> = Vec::new();

    for action in actions.iter().filter(|a| !a.is_skip()) {
      let part = action.part.as_str();
      if !graph.contains(part) {
        return Err(PlanError::UnknownPart(action.part.clone()));
      }

      // Skipped steps leave gaps; order after any earlier scheduled step.
      let mut level = 0;
      for step in action.step.up_to().filter(|s| *s < action.step) {
        if let Some(&l) = levels.get(&(part, step)) {
          level = level.max(l + 1);
        }
      }
      if let Some(prerequisite) = action.step.dependency_prerequisite() {
        for dep in graph.dependencies(part)? {
          for step in prerequisite.up_to() {
            if let Some(&l) = levels.get(&(dep, step)) {
              level = level.max(l + 1);
            }
          }
        }
      }

      levels.insert((part, action.step), level);
      if waves.len() <= level {
        waves.resize_with(level + 1, Vec::new);
      }
      waves[level].push(action.clone());
    }

    waves.retain(|w| !w.is_empty());
    debug!(waves = waves.len(), actions = levels.len(), "execution waves computed");

    Ok(Self {
      waves,
      parallel: parallel.max(1),
    })
  }

  pub fn len(&self) -> usize {
    self.waves.len()
  }

  pub fn is_empty(&self) -> bool {
    self.waves.is_empty()
  }

  pub fn waves(&self) -> &[Vec<Action>] {
    &self.waves
  }

  /// Maximum number of actions per batch.
  pub fn parallel(&self) -> usize {
    self.parallel
  }

  /// Batches of one wave, each at most [`parallel`](Self::parallel) long.
  pub fn batches(&self, wave: usize) -> impl Iterator<Item = &[Action]> {
    self
      .waves
      .get(wave)
      .map(Vec::as_slice)
      .unwrap_or_default()
      .chunks(self.parallel)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::part::Part;
  use crate::plugin::{PluginIdentity, PluginRegistry};
  use crate::project::{LifecycleConfig, ProjectInfo};
  use crate::sequencer::Sequencer;
  use crate::state::{MemoryStateStore, StateStore};

  fn graph(parts: &[(&str, &[&str])]) -> PartGraph {
    PartGraph::new(
      parts
        .iter()
        .map(|(name, after)| Part::with_after(name, after).unwrap())
        .collect(),
    )
    .unwrap()
  }

  fn plan(graph: &PartGraph, target: Step, names: &[&str], store: &dyn StateStore) -> Vec<Action> {
    let info = ProjectInfo::new(&LifecycleConfig::new("test").with_arch("amd64")).unwrap();
    let mut registry = PluginRegistry::builtin();
    for part in graph.parts() {
      registry.register(PluginIdentity::new(&part.name, "1"));
    }
    Sequencer::new(graph, &info, &registry)
      .unwrap()
      .plan(target, names, store)
      .unwrap()
  }

  fn labels(wave: &[Action]) -> Vec<String> {
    wave.iter().map(|a| format!("{}:{}", a.part, a.step)).collect()
  }

  #[test]
  fn dependent_waits_for_staged_dependency() {
    let g = graph(&[("a", &[]), ("b", &["a"])]);
    let actions = plan(&g, Step::Build, &["b"], &MemoryStateStore::new());
    let waves = ExecutionWaves::from_actions(&actions, &g, 4).unwrap();

    let got: Vec<Vec<String>> = waves.waves().iter().map(|w| labels(w)).collect();
    assert_eq!(
      got,
      vec![
        vec!["a:pull", "b:pull"],
        vec!["a:overlay", "b:overlay"],
        vec!["a:build"],
        vec!["a:stage"],
        vec!["b:build"],
      ]
    );
  }

  #[test]
  fn whole_project_build_stages_dependency_first() {
    let g = graph(&[("a", &[]), ("b", &["a"])]);
    let actions = plan(&g, Step::Build, &[], &MemoryStateStore::new());
    let waves = ExecutionWaves::from_actions(&actions, &g, 4).unwrap();

    let got: Vec<Vec<String>> = waves.waves().iter().map(|w| labels(w)).collect();
    assert_eq!(
      got,
      vec![
        vec!["a:pull", "b:pull"],
        vec!["a:overlay", "b:overlay"],
        vec!["a:build"],
        vec!["a:stage"],
        vec!["b:build"],
      ]
    );
  }

  #[test]
  fn independent_parts_share_waves() {
    let g = graph(&[("a", &[]), ("b", &[]), ("c", &[])]);
    let actions = plan(&g, Step::Pull, &[], &MemoryStateStore::new());
    let waves = ExecutionWaves::from_actions(&actions, &g, 2).unwrap();

    assert_eq!(waves.len(), 1);
    let batches: Vec<Vec<String>> = waves.batches(0).map(labels).collect();
    assert_eq!(batches, vec![vec!["a:pull", "b:pull"], vec!["c:pull"]]);
    assert_eq!(waves.batches(7).count(), 0);
  }

  #[test]
  fn skipped_steps_are_not_scheduled() {
    let g = graph(&[("a", &[])]);
    let mut store = MemoryStateStore::new();
    for action in plan(&g, Step::Build, &[], &store) {
      store.put(&action.completed_state().unwrap()).unwrap();
    }

    let actions = plan(&g, Step::Prime, &[], &store);
    let waves = ExecutionWaves::from_actions(&actions, &g, 1).unwrap();
    let got: Vec<Vec<String>> = waves.waves().iter().map(|w| labels(w)).collect();
    assert_eq!(got, vec![vec!["a:stage"], vec!["a:prime"]]);
  }

  #[test]
  fn zero_parallelism_means_one() {
    let g = graph(&[("a", &[])]);
    let waves = ExecutionWaves::from_actions(&[], &g, 0).unwrap();
    assert!(waves.is_empty());
    assert_eq!(waves.parallel(), 1);
  }
}
