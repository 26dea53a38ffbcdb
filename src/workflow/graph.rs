//! Dependency Graph
//!
//! Validates a workflow's dependency relation and linearizes it with Kahn's
//! algorithm. Missing references and cycles are reported as errors instead of
//! being skipped.
//!
//! Ready tasks are taken from a min-heap keyed on insertion position, so the
//! order is deterministic and independent tasks keep the order in which they
//! were added.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::debug;

use super::error::GraphError;
use super::model::Workflow;

/// Index-based view of a workflow's dependency relation.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    /// Deduplicated dependencies per task, in declared order
    dependencies: Vec<Vec<usize>>,
    /// Dependents per task, in insertion order
    dependents: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Builds and validates the graph for a workflow.
    pub fn build(workflow: &Workflow) -> Result<Self, GraphError> {
        let ids: Vec<String> = workflow.tasks().iter().map(|t| t.id.clone()).collect();
        let index: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut dependencies = vec![Vec::new(); ids.len()];
        let mut dependents = vec![Vec::new(); ids.len()];

        for (i, id) in ids.iter().enumerate() {
            let declared = workflow.dependencies_of(id).unwrap_or(&[]);
            let mut seen = HashSet::new();

            for dep_id in declared {
                let &dep = index.get(dep_id).ok_or_else(|| GraphError::MissingDependency {
                    task_id: id.clone(),
                    missing_id: dep_id.clone(),
                })?;

                if seen.insert(dep) {
                    dependencies[i].push(dep);
                    dependents[dep].push(i);
                }
            }
        }

        let order = kahn_order(&dependencies, &dependents);
        let graph = Self {
            ids,
            index,
            dependencies,
            dependents,
            order,
        };

        if let Err(members) = graph.check_complete() {
            return Err(GraphError::CyclicDependency { members });
        }

        debug!("Execution order: {:?}", graph.order_ids());
        Ok(graph)
    }

    /// Returns task indices in execution order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Returns task ids in execution order.
    pub fn order_ids(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.ids[i].as_str()).collect()
    }

    /// Returns the id of the task at an insertion index.
    pub fn id(&self, index: usize) -> &str {
        &self.ids[index]
    }

    /// Returns the insertion index of a task.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Returns the indices a task depends on.
    pub fn dependencies(&self, index: usize) -> &[usize] {
        &self.dependencies[index]
    }

    /// Returns the indices that depend on a task.
    pub fn dependents(&self, index: usize) -> &[usize] {
        &self.dependents[index]
    }

    /// Returns the number of distinct dependencies of a task.
    pub fn in_degree(&self, index: usize) -> usize {
        self.dependencies[index].len()
    }

    /// Returns every task a task transitively depends on.
    pub fn ancestors(&self, index: usize) -> HashSet<usize> {
        let mut found = HashSet::new();
        let mut stack: Vec<usize> = self.dependencies[index].clone();

        while let Some(current) = stack.pop() {
            if found.insert(current) {
                stack.extend(self.dependencies[current].iter().copied());
            }
        }

        found
    }

    /// Returns the number of tasks.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the graph has no tasks.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn check_complete(&self) -> Result<(), Vec<String>> {
        if self.order.len() == self.ids.len() {
            Ok(())
        } else {
            Err(cycle_members(&self.ids, &self.order, &self.dependents))
        }
    }
}

/// Kahn's algorithm with an insertion-ordered ready set.
///
/// Returns the (possibly partial) order; tasks blocked by a cycle are left out.
fn kahn_order(dependencies: &[Vec<usize>], dependents: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(dependencies.len());

    while let Some(Reverse(current)) = ready.pop() {
        order.push(current);

        for &dependent in &dependents[current] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    order
}

/// Narrows the unordered remainder down to the tasks that sit on a cycle.
///
/// Tasks that are merely downstream of a cycle are peeled off by repeatedly
/// removing remaining tasks that no other remaining task depends on.
fn cycle_members(ids: &[String], order: &[usize], dependents: &[Vec<usize>]) -> Vec<String> {
    let ordered: HashSet<usize> = order.iter().copied().collect();
    let mut remaining: HashSet<usize> = (0..ids.len()).filter(|i| !ordered.contains(i)).collect();

    loop {
        let sinks: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| !dependents[i].iter().any(|d| remaining.contains(d)))
            .collect();

        if sinks.is_empty() {
            break;
        }
        for sink in sinks {
            remaining.remove(&sink);
        }
    }

    let mut members: Vec<usize> = remaining.into_iter().collect();
    members.sort_unstable();
    members.into_iter().map(|i| ids[i].clone()).collect()
}
