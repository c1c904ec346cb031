//! Wanted inputs for every step of every part in a plan.
//!
//! Fingerprints chain: a step includes the fingerprint of the same part's
//! previous step and of the dependency steps it consumes. Parts are visited
//! in topological order, so those fingerprints are always known by the time
//! they are needed, and they are the values this plan wants, not the values
//! last persisted.

use std::collections::{BTreeMap, HashMap};

use crate::part::PartGraph;
use crate::plugin::PluginIdentity;
use crate::project::ProjectInfo;
use crate::state::{PluginRef, StepInputs};
use crate::step::Step;
use crate::util::hash::{Fingerprint, Hashable};

use super::types::PlanError;

/// Wanted inputs of one (part, step) and their fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
  pub inputs: StepInputs,
  pub fingerprint: Fingerprint,
}

/// Compute wanted inputs for all steps of `order`, which must be
/// topologically sorted and closed under dependencies.
pub fn compute<'g>(
  graph: &'g PartGraph,
  order: &[&'g str],
  project: &ProjectInfo,
  plugins: &BTreeMap<String, PluginIdentity>,
) -> Result<HashMap<(&'g str, Step), PlannedStep>, PlanError> {
  let mut planned: HashMap<(&'g str, Step), PlannedStep> = HashMap::with_capacity(order.len() * Step::ALL.len());

  for &name in order {
    let part = graph
      .get(name)
      .ok_or_else(|| PlanError::Inconsistent(format!("part '{}' is not in the graph", name)))?;
    let plugin = plugins
      .get(name)
      .ok_or_else(|| PlanError::Inconsistent(format!("no plugin resolved for part '{}'", name)))?;
    let dependencies = graph.dependencies(name)?;

    for step in Step::ALL {
      let previous = step
        .previous()
        .and_then(|prev| planned.get(&(name, prev)))
        .map(|p| p.fingerprint.clone());

      let mut consumed = BTreeMap::new();
      if let Some(prerequisite) = step.dependency_prerequisite() {
        for &dep in &dependencies {
          // Dependencies precede `name` in `order`, so they are already planned.
          let Some(dep_step) = planned.get(&(dep, prerequisite)) else {
            return Err(PlanError::Inconsistent(format!(
              "dependency '{}' of part '{}' was not planned first",
              dep, name
            )));
          };
          consumed.insert(dep.to_string(), dep_step.fingerprint.clone());
        }
      }

      let plugin_ref = matches!(step, Step::Pull | Step::Build).then(|| PluginRef {
        name: plugin.name.clone(),
        version: plugin.version.clone(),
      });

      let inputs = StepInputs {
        part: name.to_string(),
        step,
        properties: part.step_properties(step, plugin),
        project: project.step_inputs(step),
        plugin: plugin_ref,
        previous,
        dependencies: consumed,
      };
      let fingerprint = inputs.compute_hash()?;
      planned.insert((name, step), PlannedStep { inputs, fingerprint });
    }
  }

  Ok(planned)
}
