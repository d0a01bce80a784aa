//! Pure folds over one task's ordered transition log.
//!
//! The log is the authoritative status history: every function here reads
//! it in append order and never consults the task row.

use crate::workflow::domain::{StateCategory, StateId, StateTransition, Workflow};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;

/// Returns the status reached by the last record.
#[must_use]
pub fn current_status(log: &[StateTransition]) -> Option<&StateId> {
    log.last().map(StateTransition::to_status)
}

/// Returns when `state` was most recently entered.
#[must_use]
pub fn last_entered(log: &[StateTransition], state: &StateId) -> Option<DateTime<Utc>> {
    log.iter()
        .rev()
        .find(|record| record.to_status() == state)
        .map(StateTransition::transitioned_at)
}

/// Returns when a state of `category` was first entered.
#[must_use]
pub fn first_entered_category(
    log: &[StateTransition],
    workflow: &Workflow,
    category: StateCategory,
) -> Option<DateTime<Utc>> {
    log.iter()
        .find(|record| workflow.is_in_category(record.to_status(), category))
        .map(StateTransition::transitioned_at)
}

/// Returns every stay in a state as `(state, entered, left)`.
///
/// Each record opens a stay in its target state that the next record closes;
/// the final stay is closed at `as_of`.
fn stays(
    log: &[StateTransition],
    as_of: DateTime<Utc>,
) -> impl Iterator<Item = (&StateId, DateTime<Utc>, DateTime<Utc>)> {
    let ends = log
        .iter()
        .skip(1)
        .map(StateTransition::transitioned_at)
        .chain(std::iter::once(as_of));
    log.iter()
        .zip(ends)
        .map(|(record, end)| (record.to_status(), record.transitioned_at(), end))
}

/// Returns the length of every stay. Negative lengths, which only clock
/// skew can produce, count as zero.
fn intervals(
    log: &[StateTransition],
    as_of: DateTime<Utc>,
) -> impl Iterator<Item = (&StateId, TimeDelta)> {
    stays(log, as_of)
        .map(|(status, entered, left)| (status, (left - entered).max(TimeDelta::zero())))
}

/// Sums every disjoint interval spent in `state` up to `as_of`.
#[must_use]
pub fn time_in_state(log: &[StateTransition], state: &StateId, as_of: DateTime<Utc>) -> TimeDelta {
    intervals(log, as_of)
        .filter(|(status, _)| *status == state)
        .fold(TimeDelta::zero(), |total, (_, length)| total + length)
}

/// Per-state totals of [`time_in_state`].
#[must_use]
pub fn time_in_states(
    log: &[StateTransition],
    as_of: DateTime<Utc>,
) -> BTreeMap<StateId, TimeDelta> {
    let mut totals: BTreeMap<StateId, TimeDelta> = BTreeMap::new();
    for (status, length) in intervals(log, as_of) {
        let total = totals.entry(status.clone()).or_insert_with(TimeDelta::zero);
        *total += length;
    }
    totals
}

/// Per-state time spent inside the window `[start, end]`.
///
/// Stays are clipped to the window and states not occupied during it are
/// left out.
#[must_use]
pub fn time_in_states_between(
    log: &[StateTransition],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> BTreeMap<StateId, TimeDelta> {
    let mut totals: BTreeMap<StateId, TimeDelta> = BTreeMap::new();
    for (status, entered, left) in stays(log, end) {
        if entered > end || left < start {
            continue;
        }
        let length = (left.min(end) - entered.max(start)).max(TimeDelta::zero());
        let total = totals.entry(status.clone()).or_insert_with(TimeDelta::zero);
        *total += length;
    }
    totals
}

/// Returns when the task first entered a done-category state.
#[must_use]
pub fn completed_at(log: &[StateTransition], workflow: &Workflow) -> Option<DateTime<Utc>> {
    first_entered_category(log, workflow, StateCategory::Done)
}

/// Time from the first todo-category entry to completion.
///
/// Returns `None` while the task is not done and zero when it never entered
/// a todo-category state.
#[must_use]
pub fn cycle_time(log: &[StateTransition], workflow: &Workflow) -> Option<TimeDelta> {
    let done = completed_at(log, workflow)?;
    Some(
        first_entered_category(log, workflow, StateCategory::Todo)
            .filter(|&started| started <= done)
            .map_or_else(TimeDelta::zero, |started| done - started),
    )
}

/// Time from creation to completion, or `None` while the task is not done.
#[must_use]
pub fn lead_time(
    log: &[StateTransition],
    created_at: DateTime<Utc>,
    workflow: &Workflow,
) -> Option<TimeDelta> {
    completed_at(log, workflow).map(|done| done - created_at)
}
