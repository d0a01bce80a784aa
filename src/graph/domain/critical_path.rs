//! Critical Path Method over the dependency graph.

use super::{CircularDependencyError, DependencyGraph, DependencyType, TaskDependency};
use crate::task::domain::{Minutes, TaskId};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Earliest and latest start/finish offsets of one task, in minutes from
/// project start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSchedule {
    /// Task duration.
    pub duration: Minutes,
    /// Earliest start.
    pub earliest_start: Minutes,
    /// Earliest finish.
    pub earliest_finish: Minutes,
    /// Latest start that does not delay the project.
    pub latest_start: Minutes,
    /// Latest finish that does not delay the project.
    pub latest_finish: Minutes,
}

impl TaskSchedule {
    /// Returns `latest_start - earliest_start`.
    #[must_use]
    pub fn slack(&self) -> Minutes {
        self.latest_start - self.earliest_start
    }

    /// Returns whether the task has zero slack.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.slack() == Minutes::ZERO
    }
}

/// Result of a critical-path computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalPath {
    /// Zero-slack chain from project start to project end.
    pub path: Vec<TaskId>,
    /// Slack of every scheduled task.
    pub slack: HashMap<TaskId, Minutes>,
    /// Full schedule of every task.
    pub schedule: BTreeMap<TaskId, TaskSchedule>,
    /// Latest earliest-finish over all tasks.
    pub project_duration: Minutes,
}

impl CriticalPath {
    /// Returns whether `task_id` lies on the reported critical path.
    #[must_use]
    pub fn contains(&self, task_id: TaskId) -> bool {
        self.path.contains(&task_id)
    }

    /// Returns the summed duration of the reported path.
    #[must_use]
    pub fn path_duration(&self) -> Minutes {
        self.path
            .iter()
            .filter_map(|task| self.schedule.get(task))
            .map(|schedule| schedule.duration)
            .sum()
    }
}

/// Computes the critical path over `durations` and the edges among them.
///
/// Edges touching tasks absent from `durations` are ignored. Earliest starts
/// are floored at zero. When several zero-slack chains exist, the chain with
/// the larger total duration wins, then the lexicographically smallest id
/// sequence.
///
/// # Errors
///
/// Returns [`CircularDependencyError`] when the edges among the tasks form a
/// cycle.
pub fn compute_critical_path(
    durations: &BTreeMap<TaskId, Minutes>,
    edges: impl IntoIterator<Item = TaskDependency>,
) -> Result<CriticalPath, CircularDependencyError> {
    let scope: BTreeSet<TaskId> = durations.keys().copied().collect();
    let mut graph = DependencyGraph::from_edges(edges).restricted_to(&scope);
    for &task in &scope {
        graph.add_task(task);
    }
    let order = graph.topological_order()?;

    let duration_of = |task: TaskId| durations.get(&task).copied().unwrap_or_default();
    let mut schedule: BTreeMap<TaskId, TaskSchedule> = BTreeMap::new();

    for &task in &order {
        let duration = duration_of(task);
        let earliest_start = graph
            .predecessors(task)
            .map(|edge| forward_bound(edge, &schedule, duration))
            .fold(Minutes::ZERO, Ord::max);
        schedule.insert(
            task,
            TaskSchedule {
                duration,
                earliest_start,
                earliest_finish: earliest_start + duration,
                ..TaskSchedule::default()
            },
        );
    }

    let project_duration = schedule
        .values()
        .map(|entry| entry.earliest_finish)
        .fold(Minutes::ZERO, Ord::max);

    for &task in order.iter().rev() {
        let duration = duration_of(task);
        let latest_finish = graph
            .successors(task)
            .map(|edge| backward_bound(edge, &schedule, duration))
            .fold(project_duration, Ord::min);
        if let Some(entry) = schedule.get_mut(&task) {
            entry.latest_finish = latest_finish;
            entry.latest_start = latest_finish - duration;
        }
    }

    let path = critical_chain(&graph, &order, &schedule, project_duration);
    let slack = schedule
        .iter()
        .map(|(&task, entry)| (task, entry.slack()))
        .collect();

    Ok(CriticalPath {
        path,
        slack,
        schedule,
        project_duration,
    })
}

/// Earliest start of `edge.task_id()` implied by its predecessor.
fn forward_bound(
    edge: &TaskDependency,
    schedule: &BTreeMap<TaskId, TaskSchedule>,
    duration: Minutes,
) -> Minutes {
    let predecessor = schedule
        .get(&edge.depends_on_id())
        .copied()
        .unwrap_or_default();
    let lag = edge.lag();
    match edge.dependency_type() {
        DependencyType::FinishToStart => predecessor.earliest_finish + lag,
        DependencyType::StartToStart => predecessor.earliest_start + lag,
        DependencyType::FinishToFinish => predecessor.earliest_finish + lag - duration,
        DependencyType::StartToFinish => predecessor.earliest_start + lag - duration,
    }
}

/// Latest finish of `edge.depends_on_id()` implied by its dependent.
fn backward_bound(
    edge: &TaskDependency,
    schedule: &BTreeMap<TaskId, TaskSchedule>,
    duration: Minutes,
) -> Minutes {
    let dependent = schedule.get(&edge.task_id()).copied().unwrap_or_default();
    let lag = edge.lag();
    match edge.dependency_type() {
        DependencyType::FinishToStart => dependent.latest_start - lag,
        DependencyType::StartToStart => dependent.latest_start - lag + duration,
        DependencyType::FinishToFinish => dependent.latest_finish - lag,
        DependencyType::StartToFinish => dependent.latest_finish - lag + duration,
    }
}

/// Whether `edge` determines its dependent's earliest start.
fn is_driving(edge: &TaskDependency, schedule: &BTreeMap<TaskId, TaskSchedule>) -> bool {
    schedule.get(&edge.task_id()).is_some_and(|dependent| {
        forward_bound(edge, schedule, dependent.duration) == dependent.earliest_start
    })
}

/// Candidate chain: total duration and task sequence.
type Chain = (Minutes, Vec<TaskId>);

fn prefer(candidate: &Chain, incumbent: &Chain) -> bool {
    match candidate.0.cmp(&incumbent.0) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => candidate.1 < incumbent.1,
    }
}

fn keep_best(best: &mut Option<Chain>, candidate: Chain) {
    let replace = best
        .as_ref()
        .is_none_or(|incumbent| prefer(&candidate, incumbent));
    if replace {
        *best = Some(candidate);
    }
}

/// Selects the preferred zero-slack chain ending at the project finish.
///
/// Dynamic programming in reverse topological order: the best chain from a
/// task is the task itself followed by the best chain of a driving, critical
/// successor. Ties on duration fall back to lexicographic order, which this
/// suffix choice preserves because every candidate shares the same head.
fn critical_chain(
    graph: &DependencyGraph,
    order: &[TaskId],
    schedule: &BTreeMap<TaskId, TaskSchedule>,
    project_duration: Minutes,
) -> Vec<TaskId> {
    let is_critical =
        |task: TaskId| schedule.get(&task).is_some_and(TaskSchedule::is_critical);
    let mut best_from: HashMap<TaskId, Chain> = HashMap::new();

    for &task in order.iter().rev() {
        let Some(entry) = schedule.get(&task).filter(|entry| entry.is_critical()) else {
            continue;
        };
        let mut best: Option<Chain> = None;
        if entry.earliest_finish == project_duration {
            keep_best(&mut best, (entry.duration, vec![task]));
        }
        for edge in graph.successors(task) {
            if !is_critical(edge.task_id()) || !is_driving(edge, schedule) {
                continue;
            }
            if let Some((total, tail)) = best_from.get(&edge.task_id()) {
                let mut chain = Vec::with_capacity(tail.len() + 1);
                chain.push(task);
                chain.extend_from_slice(tail);
                keep_best(&mut best, (entry.duration + *total, chain));
            }
        }
        if let Some(chain) = best {
            best_from.insert(task, chain);
        }
    }

    let mut best: Option<Chain> = None;
    for &task in order {
        let has_driving_critical_predecessor = graph
            .predecessors(task)
            .any(|edge| is_critical(edge.depends_on_id()) && is_driving(edge, schedule));
        if has_driving_critical_predecessor {
            continue;
        }
        if let Some(chain) = best_from.get(&task) {
            keep_best(&mut best, chain.clone());
        }
    }
    best.map(|(_, path)| path).unwrap_or_default()
}
