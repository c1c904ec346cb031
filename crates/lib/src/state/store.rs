use std::collections::BTreeMap;

use crate::step::Step;

use super::types::{StateError, StepState};

/// Durable mapping from (part, step) to the last completed [`StepState`].
///
/// The sequencer only ever calls [`get`](StateStore::get). Writes come from
/// whoever executes the planned actions.
pub trait StateStore {
  /// Load the state of one step. `Ok(None)` means the step never completed.
  fn get(&self, part: &str, step: Step) -> Result<Option<StepState>, StateError>;

  /// Record a completed step, replacing any previous record.
  fn put(&mut self, state: &StepState) -> Result<(), StateError>;

  /// Forget one step. Missing records are not an error.
  fn remove(&mut self, part: &str, step: Step) -> Result<(), StateError>;

  /// Forget every step of a part.
  fn remove_part(&mut self, part: &str) -> Result<(), StateError> {
    for step in Step::ALL {
      self.remove(part, step)?;
    }
    Ok(())
  }

  /// All readable records, ordered by part name then step.
  fn list(&self) -> Result<Vec<StepState>, StateError>;
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
  states: BTreeMap<(String, Step), StepState>,
}

impl MemoryStateStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.states.len()
  }

  pub fn is_empty(&self) -> bool {
    self.states.is_empty()
  }
}

impl StateStore for MemoryStateStore {
  fn get(&self, part: &str, step: Step) -> Result<Option<StepState>, StateError> {
    Ok(self.states.get(&(part.to_string(), step)).cloned())
  }

  fn put(&mut self, state: &StepState) -> Result<(), StateError> {
    self.states.insert((state.part.clone(), state.step), state.clone());
    Ok(())
  }

  fn remove(&mut self, part: &str, step: Step) -> Result<(), StateError> {
    self.states.remove(&(part.to_string(), step));
    Ok(())
  }

  fn list(&self) -> Result<Vec<StepState>, StateError> {
    Ok(self.states.values().cloned().collect())
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::state::types::StepInputs;

  fn state(part: &str, step: Step) -> StepState {
    StepState::completed_at(
      StepInputs {
        part: part.to_string(),
        step,
        properties: BTreeMap::new(),
        project: BTreeMap::new(),
        plugin: None,
        previous: None,
        dependencies: BTreeMap::new(),
      },
      42,
    )
    .unwrap()
  }

  #[test]
  fn put_get_remove() {
    let mut store = MemoryStateStore::new();
    assert!(store.get("a", Step::Pull).unwrap().is_none());

    store.put(&state("a", Step::Pull)).unwrap();
    assert_eq!(store.get("a", Step::Pull).unwrap(), Some(state("a", Step::Pull)));
    assert!(store.get("a", Step::Build).unwrap().is_none());

    store.remove("a", Step::Pull).unwrap();
    assert!(store.is_empty());
    store.remove("a", Step::Pull).unwrap();
  }

  #[test]
  fn remove_part_clears_all_steps() {
    let mut store = MemoryStateStore::new();
    for step in Step::ALL {
      store.put(&state("a", step)).unwrap();
    }
    store.put(&state("b", Step::Pull)).unwrap();

    store.remove_part("a").unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.get("b", Step::Pull).unwrap().is_some());
  }

  #[test]
  fn list_is_ordered_by_part_then_step() {
    let mut store = MemoryStateStore::new();
    store.put(&state("b", Step::Pull)).unwrap();
    store.put(&state("a", Step::Stage)).unwrap();
    store.put(&state("a", Step::Pull)).unwrap();

    let keys: Vec<(String, Step)> = store.list().unwrap().into_iter().map(|s| (s.part, s.step)).collect();
    assert_eq!(
      keys,
      vec![
        ("a".to_string(), Step::Pull),
        ("a".to_string(), Step::Stage),
        ("b".to_string(), Step::Pull)
      ]
    );
  }
}
