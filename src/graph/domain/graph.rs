//! Arena dependency graph with cycle detection.
//!
//! Tasks are identified by [`TaskId`] only; adjacency lists are rebuilt from
//! the edge set whenever a traversal needs them.

use super::{CircularDependencyError, TaskDependency};
use crate::task::domain::TaskId;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// DFS node marking: unvisited, on the current path, or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Adjacency from a task to the tasks it depends on, sorted by id.
type Adjacency = BTreeMap<TaskId, Vec<TaskId>>;

/// In-memory dependency graph.
///
/// The graph never owns task data. Nodes are task identifiers and edges are
/// [`TaskDependency`] values keyed by `(task, predecessor)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeSet<TaskId>,
    edges: BTreeMap<(TaskId, TaskId), TaskDependency>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from stored edges without checking acyclicity.
    ///
    /// Use [`DependencyGraph::detect_cycles`] to diagnose edge sets that did
    /// not pass through [`DependencyGraph::add_edge`].
    #[must_use]
    pub fn from_edges(edges: impl IntoIterator<Item = TaskDependency>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.nodes.insert(edge.task_id());
            graph.nodes.insert(edge.depends_on_id());
            graph.edges.insert(edge.key(), edge);
        }
        graph
    }

    /// Registers a task without edges.
    pub fn add_task(&mut self, task_id: TaskId) {
        self.nodes.insert(task_id);
    }

    /// Removes a task and every edge touching it.
    pub fn remove_task(&mut self, task_id: TaskId) {
        self.nodes.remove(&task_id);
        self.edges
            .retain(|&(task, predecessor), _| task != task_id && predecessor != task_id);
    }

    /// Returns the number of tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns whether the graph contains `task_id`.
    #[must_use]
    pub fn contains_task(&self, task_id: TaskId) -> bool {
        self.nodes.contains(&task_id)
    }

    /// Returns the edge `task_id -> depends_on_id`, if present.
    #[must_use]
    pub fn edge(&self, task_id: TaskId, depends_on_id: TaskId) -> Option<&TaskDependency> {
        self.edges.get(&(task_id, depends_on_id))
    }

    /// Returns every edge ordered by `(task, predecessor)`.
    pub fn edges(&self) -> impl Iterator<Item = &TaskDependency> {
        self.edges.values()
    }

    /// Returns every task ordered by id.
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes.iter().copied()
    }

    /// Returns the edges from `task_id` to the tasks it depends on.
    pub fn predecessors(&self, task_id: TaskId) -> impl Iterator<Item = &TaskDependency> {
        self.edges
            .values()
            .filter(move |edge| edge.task_id() == task_id)
    }

    /// Returns the edges from tasks that depend on `task_id`.
    pub fn successors(&self, task_id: TaskId) -> impl Iterator<Item = &TaskDependency> {
        self.edges
            .values()
            .filter(move |edge| edge.depends_on_id() == task_id)
    }

    /// Adds an edge, rejecting it when it would close a cycle.
    ///
    /// The check runs before anything is committed: a three-color DFS starts
    /// at the predecessor and follows dependency edges, with the candidate
    /// edge visible. The candidate closes a cycle when the search follows it
    /// back to the gray predecessor; the cycle is reconstructed from the
    /// active path. Cycles already present in the graph that do not pass
    /// through the candidate are not its concern. A rejected edge leaves the
    /// graph unchanged. Re-adding an existing `(task, predecessor)` pair
    /// replaces its type and lag.
    ///
    /// # Errors
    ///
    /// Returns [`CircularDependencyError`] when the edge would create a
    /// cycle.
    pub fn add_edge(&mut self, edge: TaskDependency) -> Result<(), CircularDependencyError> {
        let mut adjacency = self.adjacency();
        let targets = adjacency.entry(edge.task_id()).or_default();
        if !targets.contains(&edge.depends_on_id()) {
            targets.push(edge.depends_on_id());
            targets.sort_unstable();
        }

        let closes_candidate = |cycle: &[TaskId]| {
            cycle.last() == Some(&edge.depends_on_id())
                && cycle.iter().rev().nth(1) == Some(&edge.task_id())
        };
        let mut colors = HashMap::new();
        let cycles = dfs_from(&adjacency, edge.depends_on_id(), &mut colors, &closes_candidate);
        if let Some(cycle) = cycles
            .into_iter()
            .find(|cycle| closes_candidate(cycle.as_slice()))
        {
            return Err(CircularDependencyError {
                cycle: rotate_to(cycle, edge.task_id()),
            });
        }

        self.nodes.insert(edge.task_id());
        self.nodes.insert(edge.depends_on_id());
        self.edges.insert(edge.key(), edge);
        Ok(())
    }

    /// Removes the edge `task_id -> depends_on_id`, returning it if present.
    pub fn remove_edge(&mut self, task_id: TaskId, depends_on_id: TaskId) -> Option<TaskDependency> {
        self.edges.remove(&(task_id, depends_on_id))
    }

    /// Finds every distinct cycle reachable by a full three-color DFS.
    ///
    /// Each back edge met during the traversal yields one cycle. Cycles are
    /// closed paths rotated to start at their smallest task id, and
    /// rotations of the same cycle are reported once.
    #[must_use]
    pub fn detect_cycles(&self) -> Vec<Vec<TaskId>> {
        let adjacency = self.adjacency();
        let mut colors = HashMap::new();
        let mut found = BTreeSet::new();
        for &root in &self.nodes {
            if colors.get(&root).copied().unwrap_or(Color::White) != Color::White {
                continue;
            }
            for cycle in dfs_from(&adjacency, root, &mut colors, |_| false) {
                found.insert(canonical(cycle));
            }
        }
        found.into_iter().collect()
    }

    /// Returns whether the graph has no cycle.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.detect_cycles().is_empty()
    }

    /// Orders tasks so that every predecessor precedes its dependents.
    ///
    /// Among tasks whose predecessors are all placed, the smallest id goes
    /// first, making the order deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`CircularDependencyError`] carrying one of the cycles when
    /// the graph is cyclic.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, CircularDependencyError> {
        let mut pending: BTreeMap<TaskId, usize> =
            self.nodes.iter().map(|&task| (task, 0)).collect();
        let mut dependents: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();
        for edge in self.edges.values() {
            if let Some(count) = pending.get_mut(&edge.task_id()) {
                *count += 1;
            }
            dependents
                .entry(edge.depends_on_id())
                .or_default()
                .push(edge.task_id());
        }

        let mut ready: BTreeSet<TaskId> = pending
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&task, _)| task)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(task) = ready.pop_first() {
            order.push(task);
            for dependent in dependents.get(&task).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order)
        } else {
            let cycle = self.detect_cycles().into_iter().next().unwrap_or_default();
            Err(CircularDependencyError { cycle })
        }
    }

    /// Returns the subgraph induced by `tasks`.
    #[must_use]
    pub fn restricted_to(&self, tasks: &BTreeSet<TaskId>) -> Self {
        Self {
            nodes: self.nodes.intersection(tasks).copied().collect(),
            edges: self
                .edges
                .iter()
                .filter(|((task, predecessor), _)| tasks.contains(task) && tasks.contains(predecessor))
                .map(|(key, edge)| (*key, *edge))
                .collect(),
        }
    }

    fn adjacency(&self) -> Adjacency {
        let mut adjacency: Adjacency = self.nodes.iter().map(|&task| (task, Vec::new())).collect();
        for (task, predecessor) in self.edges.keys() {
            adjacency.entry(*task).or_default().push(*predecessor);
        }
        adjacency
    }
}

/// Iterative three-color DFS from `root`.
///
/// Returns the cycles closed by back edges, each as a closed path taken from
/// the active stack. The search stops at the first cycle `stop_at` accepts.
fn dfs_from(
    adjacency: &Adjacency,
    root: TaskId,
    colors: &mut HashMap<TaskId, Color>,
    stop_at: impl Fn(&[TaskId]) -> bool,
) -> Vec<Vec<TaskId>> {
    let mut cycles = Vec::new();
    let mut stack: Vec<(TaskId, usize)> = vec![(root, 0)];
    colors.insert(root, Color::Gray);

    while let Some(frame) = stack.last_mut() {
        let (node, next) = *frame;
        let Some(child) = adjacency
            .get(&node)
            .and_then(|targets| targets.get(next))
            .copied()
        else {
            colors.insert(node, Color::Black);
            stack.pop();
            continue;
        };
        frame.1 = next + 1;

        match colors.get(&child).copied().unwrap_or(Color::White) {
            Color::White => {
                colors.insert(child, Color::Gray);
                stack.push((child, 0));
            }
            Color::Gray => {
                let start = stack
                    .iter()
                    .position(|&(task, _)| task == child)
                    .unwrap_or_default();
                let mut cycle: Vec<TaskId> =
                    stack.iter().skip(start).map(|&(task, _)| task).collect();
                cycle.push(child);
                let stop = stop_at(cycle.as_slice());
                cycles.push(cycle);
                if stop {
                    return cycles;
                }
            }
            Color::Black => {}
        }
    }
    cycles
}

/// Rotates a closed cycle so that it starts and ends at `start`.
fn rotate_to(cycle: Vec<TaskId>, start: TaskId) -> Vec<TaskId> {
    let mut open: Vec<TaskId> = cycle;
    open.pop();
    let Some(offset) = open.iter().position(|&task| task == start) else {
        if let Some(first) = open.first().copied() {
            open.push(first);
        }
        return open;
    };
    open.rotate_left(offset);
    open.push(start);
    open
}

/// Rotates a closed cycle to start at its smallest task id.
fn canonical(cycle: Vec<TaskId>) -> Vec<TaskId> {
    let smallest = cycle.iter().min().copied();
    match smallest {
        Some(start) => rotate_to(cycle, start),
        None => cycle,
    }
}
