//! The part dependency graph.
//!
//! Edges point from a dependency to its dependent, so a topological order
//! lists every part after the parts it runs after. Construction fails on
//! duplicate names, undeclared dependencies and cycles, which means every
//! [`PartGraph`] value is a valid DAG.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use thiserror::Error;
use tracing::{debug, trace};

use super::types::Part;

/// Errors from building or querying a [`PartGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("part '{0}' is defined more than once")]
  DuplicatePart(String),

  #[error("part '{part}' runs after '{dependency}', which is not defined")]
  MissingDependency { part: String, dependency: String },

  #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
  CyclicDependency { cycle: Vec<String> },

  #[error("part '{0}' is not defined")]
  UnknownPart(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  InProgress,
  Done,
}

/// Parts plus their "runs after" edges.
#[derive(Debug, Clone)]
pub struct PartGraph {
  /// Node weights are indices into `parts`; node `i` is the `i`-th declared part.
  graph: DiGraph<usize, ()>,

  /// Parts in declaration order.
  parts: Vec<Part>,

  /// Dependency indices per part, in declared order.
  dependencies: Vec<Vec<usize>>,

  /// Map from part name to declaration index.
  indices: HashMap<String, usize>,
}

impl PartGraph {
  /// Build the graph from parts in declaration order.
  pub fn new(parts: Vec<Part>) -> Result<Self, GraphError> {
    let mut graph = DiGraph::with_capacity(parts.len(), 0);
    let mut indices = HashMap::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
      if indices.insert(part.name.clone(), i).is_some() {
        return Err(GraphError::DuplicatePart(part.name.clone()));
      }
      graph.add_node(i);
    }

    let mut dependencies = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
      let mut deps = Vec::with_capacity(part.dependencies.len());
      for dep in &part.dependencies {
        let Some(&dep_idx) = indices.get(dep) else {
          return Err(GraphError::MissingDependency {
            part: part.name.clone(),
            dependency: dep.clone(),
          });
        };
        // Edge from dependency to dependent
        graph.add_edge(NodeIndex::new(dep_idx), NodeIndex::new(i), ());
        deps.push(dep_idx);
      }
      dependencies.push(deps);
    }

    let part_graph = Self {
      graph,
      parts,
      dependencies,
      indices,
    };

    if let Some(cycle) = part_graph.find_cycle() {
      return Err(GraphError::CyclicDependency { cycle });
    }

    debug!(
      parts = part_graph.parts.len(),
      edges = part_graph.graph.edge_count(),
      "part graph built"
    );
    Ok(part_graph)
  }

  /// Look for a cycle with an iterative depth-first search.
  ///
  /// Returns the part names along the cycle, starting and ending with the
  /// same part, following "runs after" edges.
  fn find_cycle(&self) -> Option<Vec<String>> {
    let mut marks = vec![Mark::Unvisited; self.parts.len()];

    for root in 0..self.parts.len() {
      if marks[root] != Mark::Unvisited {
        continue;
      }

      // Each frame is (part index, position of the next dependency to visit).
      let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
      marks[root] = Mark::InProgress;

      while let Some(frame) = stack.last_mut() {
        let node = frame.0;
        let deps = &self.dependencies[node];

        if frame.1 >= deps.len() {
          marks[node] = Mark::Done;
          stack.pop();
          continue;
        }

        let dep = deps[frame.1];
        frame.1 += 1;

        match marks[dep] {
          Mark::Unvisited => {
            marks[dep] = Mark::InProgress;
            stack.push((dep, 0));
          }
          Mark::InProgress => {
            let start = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
            let mut cycle: Vec<String> = stack[start..]
              .iter()
              .map(|(n, _)| self.parts[*n].name.clone())
              .collect();
            cycle.push(self.parts[dep].name.clone());
            return Some(cycle);
          }
          Mark::Done => {}
        }
      }
    }

    None
  }

  fn index_of(&self, name: &str) -> Result<usize, GraphError> {
    self
      .indices
      .get(name)
      .copied()
      .ok_or_else(|| GraphError::UnknownPart(name.to_string()))
  }

  /// Number of parts.
  pub fn len(&self) -> usize {
    self.parts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.parts.is_empty()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.indices.contains_key(name)
  }

  pub fn get(&self, name: &str) -> Option<&Part> {
    self.indices.get(name).map(|&i| &self.parts[i])
  }

  /// Parts in declaration order.
  pub fn parts(&self) -> &[Part] {
    &self.parts
  }

  /// Part names in declaration order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.parts.iter().map(|p| p.name.as_str())
  }

  /// Direct dependencies of a part, in declared order.
  pub fn dependencies(&self, name: &str) -> Result<Vec<&str>, GraphError> {
    let idx = self.index_of(name)?;
    Ok(
      self.dependencies[idx]
        .iter()
        .map(|&d| self.parts[d].name.as_str())
        .collect(),
    )
  }

  /// Parts that run directly after `name`, in declaration order.
  pub fn dependents(&self, name: &str) -> Result<Vec<&str>, GraphError> {
    let idx = self.index_of(name)?;
    let mut dependents: Vec<usize> = self
      .graph
      .neighbors_directed(NodeIndex::new(idx), Direction::Outgoing)
      .map(|n| self.graph[n])
      .collect();
    dependents.sort_unstable();
    dependents.dedup();
    Ok(dependents.into_iter().map(|d| self.parts[d].name.as_str()).collect())
  }

  /// Order `subset` so that each part comes after its dependencies.
  ///
  /// Only edges between members of `subset` are considered. Parts with no
  /// relative ordering keep their declaration order.
  pub fn topological_order(&self, subset: &[&str]) -> Result<Vec<&str>, GraphError> {
    let mut members = BTreeSet::new();
    for name in subset {
      members.insert(self.index_of(name)?);
    }

    let mut in_degree: HashMap<usize, usize> = members
      .iter()
      .map(|&i| {
        let count = self.dependencies[i].iter().filter(|d| members.contains(d)).count();
        (i, count)
      })
      .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
      .iter()
      .filter(|(_, deg)| **deg == 0)
      .map(|(&i, _)| Reverse(i))
      .collect();

    let mut order = Vec::with_capacity(members.len());
    while let Some(Reverse(idx)) = ready.pop() {
      order.push(self.parts[idx].name.as_str());

      for dependent in self.graph.neighbors_directed(NodeIndex::new(idx), Direction::Outgoing) {
        let dependent = self.graph[dependent];
        if let Some(deg) = in_degree.get_mut(&dependent) {
          *deg = deg.saturating_sub(1);
          if *deg == 0 {
            ready.push(Reverse(dependent));
          }
        }
      }
    }

    if order.len() != members.len() {
      // Unreachable for a graph that passed construction.
      let cycle = self.find_cycle().unwrap_or_default();
      return Err(GraphError::CyclicDependency { cycle });
    }

    trace!(order = ?order, "topological order computed");
    Ok(order)
  }

  /// The named parts plus everything they transitively run after, in
  /// topological order.
  pub fn closure(&self, names: &[&str]) -> Result<Vec<&str>, GraphError> {
    let reversed = Reversed(&self.graph);
    let mut seen: HashSet<usize> = HashSet::new();

    for name in names {
      let start = NodeIndex::new(self.index_of(name)?);
      if seen.contains(&start.index()) {
        continue;
      }
      let mut dfs = Dfs::new(reversed, start);
      while let Some(node) = dfs.next(reversed) {
        seen.insert(self.graph[node]);
      }
    }

    let members: Vec<&str> = self
      .parts
      .iter()
      .enumerate()
      .filter(|(i, _)| seen.contains(i))
      .map(|(_, p)| p.name.as_str())
      .collect();
    self.topological_order(&members)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn part(name: &str, after: &[&str]) -> Part {
    Part::with_after(name, after).unwrap()
  }

  fn graph(parts: &[(&str, &[&str])]) -> Result<PartGraph, GraphError> {
    PartGraph::new(parts.iter().map(|(n, a)| part(n, a)).collect())
  }

  #[test]
  fn empty_graph() {
    let g = graph(&[]).unwrap();
    assert!(g.is_empty());
    assert!(g.topological_order(&[]).unwrap().is_empty());
    assert!(g.closure(&[]).unwrap().is_empty());
  }

  #[test]
  fn missing_dependency() {
    let err = graph(&[("a", &["ghost"])]).unwrap_err();
    assert_eq!(
      err,
      GraphError::MissingDependency {
        part: "a".to_string(),
        dependency: "ghost".to_string()
      }
    );
  }

  #[test]
  fn duplicate_part() {
    let err = graph(&[("a", &[]), ("a", &[])]).unwrap_err();
    assert_eq!(err, GraphError::DuplicatePart("a".to_string()));
  }

  #[test]
  fn self_cycle() {
    let err = graph(&[("a", &["a"])]).unwrap_err();
    assert_eq!(
      err,
      GraphError::CyclicDependency {
        cycle: vec!["a".to_string(), "a".to_string()]
      }
    );
  }

  #[test]
  fn long_cycle_reports_path() {
    // x is fine; a -> b -> c -> a loops
    let err = graph(&[("x", &[]), ("a", &["b", "x"]), ("b", &["c"]), ("c", &["a"])]).unwrap_err();
    let GraphError::CyclicDependency { cycle } = err else {
      panic!("expected a cycle");
    };
    assert_eq!(cycle, vec!["a", "b", "c", "a"]);
    assert_eq!(
      GraphError::CyclicDependency { cycle }.to_string(),
      "dependency cycle detected: a -> b -> c -> a"
    );
  }

  #[test]
  fn cycle_deep_in_graph() {
    let err = graph(&[
      ("base", &[]),
      ("mid", &["base", "tail"]),
      ("top", &["mid"]),
      ("tail", &["top"]),
    ])
    .unwrap_err();
    assert!(matches!(err, GraphError::CyclicDependency { .. }));
  }

  #[test]
  fn topological_order_respects_dependencies() {
    // declared out of order: c runs after b runs after a
    let g = graph(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]).unwrap();
    let all: Vec<&str> = g.names().collect();
    assert_eq!(g.topological_order(&all).unwrap(), vec!["a", "b", "c"]);
  }

  #[test]
  fn ties_broken_by_declaration_order() {
    let g = graph(&[("z", &[]), ("m", &[]), ("a", &[]), ("after-z", &["z"])]).unwrap();
    let all: Vec<&str> = g.names().collect();
    assert_eq!(g.topological_order(&all).unwrap(), vec!["z", "m", "a", "after-z"]);
  }

  #[test]
  fn diamond_order() {
    //     a
    //    / \
    //   b   c
    //    \ /
    //     d
    let g = graph(&[("d", &["c", "b"]), ("c", &["a"]), ("b", &["a"]), ("a", &[])]).unwrap();
    let all: Vec<&str> = g.names().collect();
    assert_eq!(g.topological_order(&all).unwrap(), vec!["a", "c", "b", "d"]);
  }

  #[test]
  fn topological_order_of_subset_ignores_outside_edges() {
    let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]).unwrap();
    assert_eq!(g.topological_order(&["c", "a"]).unwrap(), vec!["a", "c"]);
    assert_eq!(
      g.topological_order(&["nope"]).unwrap_err(),
      GraphError::UnknownPart("nope".to_string())
    );
  }

  #[test]
  fn closure_pulls_in_transitive_dependencies() {
    let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("other", &[])]).unwrap();
    assert_eq!(g.closure(&["c"]).unwrap(), vec!["a", "b", "c"]);
    assert_eq!(g.closure(&["a"]).unwrap(), vec!["a"]);
    assert_eq!(g.closure(&["other", "b"]).unwrap(), vec!["a", "b", "other"]);
  }

  #[test]
  fn dependencies_and_dependents() {
    let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["a", "b"])]).unwrap();
    assert_eq!(g.dependencies("c").unwrap(), vec!["a", "b"]);
    assert_eq!(g.dependents("a").unwrap(), vec!["b", "c"]);
    assert!(g.dependents("c").unwrap().is_empty());
    assert!(g.dependencies("zzz").is_err());
  }
}
