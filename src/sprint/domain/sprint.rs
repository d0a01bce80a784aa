//! Sprint aggregate: commitment, scope change, capacity and burndown.

use crate::task::domain::{SprintId, ValidationCode, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Sprint lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    /// Accepting commitments; not yet started.
    Planned,
    /// Running; commitment is locked and new work counts as scope change.
    Active,
    /// Closed.
    Completed,
}

impl SprintStatus {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optimistic concurrency counter carried by every stored sprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SprintVersion(u64);

impl SprintVersion {
    /// Version assigned to a freshly created sprint.
    pub const INITIAL: Self = Self(1);

    /// Creates a version from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the version following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for SprintVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One burndown sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BurndownPoint {
    /// Sample day.
    pub day: NaiveDate,
    /// Points still open on `day`.
    pub remaining: u32,
    /// Points the ideal linear burndown leaves open on `day`.
    pub ideal_remaining: f64,
}

impl BurndownPoint {
    /// Relative distance above the ideal line, as a share of `committed`.
    ///
    /// Positive values mean the sprint is behind; zero commitment yields zero.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "deviation is a floating point ratio"
    )]
    pub fn deviation(&self, committed: u32) -> f64 {
        if committed == 0 {
            return 0.0;
        }
        (f64::from(self.remaining) - self.ideal_remaining) / f64::from(committed)
    }
}

/// Adding work would exceed the sprint's capacity.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("sprint capacity exceeded: {current} points committed, {required} would be required")]
pub struct CapacityExceededError {
    /// Points committed so far.
    pub current: u32,
    /// Points the sprint would hold after the addition.
    pub required: u32,
}

/// The operation is not valid in the sprint's current status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot {operation} sprint {sprint_id} while {status}")]
pub struct SprintStateError {
    /// Sprint the operation targeted.
    pub sprint_id: SprintId,
    /// Status at the time.
    pub status: SprintStatus,
    /// Rejected operation.
    pub operation: &'static str,
}

/// Input for [`Sprint::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSprintData {
    /// Display name.
    pub name: String,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
    /// Capacity in story points.
    pub capacity: u32,
}

/// A time-boxed iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprint {
    id: SprintId,
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    capacity: u32,
    status: SprintStatus,
    committed_points: u32,
    added_points: u32,
    completed_points: u32,
    carryover_points: u32,
    burndown: Vec<BurndownPoint>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    version: SprintVersion,
}

impl Sprint {
    /// Creates a planned sprint.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the name is empty or the end date
    /// precedes the start date.
    pub fn new(data: NewSprintData, clock: &impl Clock) -> Result<Self, ValidationError> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("name", ValidationCode::Empty));
        }
        if data.end_date < data.start_date {
            return Err(ValidationError::new("end_date", ValidationCode::OutOfRange));
        }
        Ok(Self {
            id: SprintId::new(),
            name: name.to_owned(),
            start_date: data.start_date,
            end_date: data.end_date,
            capacity: data.capacity,
            status: SprintStatus::Planned,
            committed_points: 0,
            added_points: 0,
            completed_points: 0,
            carryover_points: 0,
            burndown: Vec::new(),
            created_at: clock.utc(),
            started_at: None,
            closed_at: None,
            version: SprintVersion::INITIAL,
        })
    }

    /// Returns the sprint identifier.
    #[must_use]
    pub const fn id(&self) -> SprintId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the first day.
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Returns the last day.
    #[must_use]
    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Returns the capacity in story points.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SprintStatus {
        self.status
    }

    /// Points committed before the sprint started.
    #[must_use]
    pub const fn committed_points(&self) -> u32 {
        self.committed_points
    }

    /// Points added after the sprint started.
    #[must_use]
    pub const fn added_points(&self) -> u32 {
        self.added_points
    }

    /// Points delivered, set when progress is recorded.
    #[must_use]
    pub const fn completed_points(&self) -> u32 {
        self.completed_points
    }

    /// Points left undelivered at close.
    #[must_use]
    pub const fn carryover_points(&self) -> u32 {
        self.carryover_points
    }

    /// Returns the recorded burndown samples in day order.
    #[must_use]
    pub fn burndown(&self) -> &[BurndownPoint] {
        &self.burndown
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the sprint was started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the sprint was closed.
    #[must_use]
    pub const fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Returns the optimistic concurrency version.
    #[must_use]
    pub const fn version(&self) -> SprintVersion {
        self.version
    }

    pub(crate) const fn set_version(&mut self, version: SprintVersion) {
        self.version = version;
    }

    /// Returns the start of the first day as a UTC instant.
    #[must_use]
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.start_date.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Checks that `proposed` more points fit the capacity.
    ///
    /// The limit is `capacity × overcommit_factor`.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExceededError`] when `committed + proposed` exceeds
    /// the limit. Scope added after the start does not count against it.
    #[expect(
        clippy::float_arithmetic,
        reason = "the overcommit factor scales capacity fractionally"
    )]
    pub fn check_capacity(
        &self,
        proposed: u32,
        overcommit_factor: f64,
    ) -> Result<(), CapacityExceededError> {
        let current = self.committed_points;
        let required = current.saturating_add(proposed);
        let limit = f64::from(self.capacity) * overcommit_factor;
        if f64::from(required) > limit {
            return Err(CapacityExceededError { current, required });
        }
        Ok(())
    }

    /// Counts `points` against the sprint.
    ///
    /// Before the start they join the commitment; afterwards they are scope
    /// change.
    ///
    /// # Errors
    ///
    /// Returns [`SprintStateError`] once the sprint is completed.
    pub fn add_points(&mut self, points: u32) -> Result<(), SprintStateError> {
        match self.status {
            SprintStatus::Planned => {
                self.committed_points = self.committed_points.saturating_add(points);
            }
            SprintStatus::Active => {
                self.added_points = self.added_points.saturating_add(points);
            }
            SprintStatus::Completed => return Err(self.state_error("add work to")),
        }
        Ok(())
    }

    /// Takes back `points` that [`Sprint::add_points`] counted while the
    /// sprint was `counted_while`.
    ///
    /// # Errors
    ///
    /// Returns [`SprintStateError`] once the sprint is completed.
    pub fn release_points(
        &mut self,
        points: u32,
        counted_while: SprintStatus,
    ) -> Result<(), SprintStateError> {
        if self.status == SprintStatus::Completed {
            return Err(self.state_error("release work from"));
        }
        if counted_while == SprintStatus::Planned {
            self.committed_points = self.committed_points.saturating_sub(points);
        } else {
            self.added_points = self.added_points.saturating_sub(points);
        }
        Ok(())
    }

    /// Locks the commitment and starts the sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintStateError`] unless the sprint is planned.
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<(), SprintStateError> {
        if self.status != SprintStatus::Planned {
            return Err(self.state_error("start"));
        }
        self.status = SprintStatus::Active;
        self.started_at = Some(at);
        Ok(())
    }

    /// Records the delivered points.
    pub const fn record_completion(&mut self, completed_points: u32) {
        self.completed_points = completed_points;
    }

    /// Builds the burndown sample for `day` with `remaining` open points.
    ///
    /// The ideal line decays linearly from the commitment on the first day to
    /// zero on the last day and is clamped outside the sprint.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "the ideal burndown line is fractional"
    )]
    pub fn burndown_point(&self, day: NaiveDate, remaining: u32) -> BurndownPoint {
        let total_days = (self.end_date - self.start_date).num_days();
        let elapsed = (day - self.start_date).num_days().clamp(0, total_days.max(0));
        let committed = f64::from(self.committed_points);
        let ideal_remaining = if total_days <= 0 {
            if day > self.start_date { 0.0 } else { committed }
        } else {
            let elapsed_days = f64::from(i32::try_from(elapsed).unwrap_or(i32::MAX));
            let sprint_days = f64::from(i32::try_from(total_days).unwrap_or(i32::MAX));
            committed * (1.0 - elapsed_days / sprint_days)
        };
        BurndownPoint {
            day,
            remaining,
            ideal_remaining: ideal_remaining.max(0.0),
        }
    }

    /// Stores a burndown sample, replacing any sample for the same day.
    ///
    /// # Errors
    ///
    /// Returns [`SprintStateError`] unless the sprint is active.
    pub fn record_burndown(&mut self, point: BurndownPoint) -> Result<(), SprintStateError> {
        if self.status != SprintStatus::Active {
            return Err(self.state_error("record burndown for"));
        }
        self.burndown.retain(|existing| existing.day != point.day);
        let position = self
            .burndown
            .iter()
            .position(|existing| existing.day > point.day)
            .unwrap_or(self.burndown.len());
        self.burndown.insert(position, point);
        Ok(())
    }

    /// Closes the sprint with its final delivered and undelivered points.
    ///
    /// # Errors
    ///
    /// Returns [`SprintStateError`] unless the sprint is active.
    pub fn close(
        &mut self,
        completed_points: u32,
        carryover_points: u32,
        at: DateTime<Utc>,
    ) -> Result<(), SprintStateError> {
        if self.status != SprintStatus::Active {
            return Err(self.state_error("close"));
        }
        self.completed_points = completed_points;
        self.carryover_points = carryover_points;
        self.status = SprintStatus::Completed;
        self.closed_at = Some(at);
        Ok(())
    }

    /// Returns `added / committed`, or zero without a commitment.
    #[must_use]
    pub fn scope_change_rate(&self) -> f64 {
        ratio(self.added_points, self.committed_points)
    }

    /// Returns `completed / committed`, or zero without a commitment.
    #[must_use]
    pub fn completion_rate(&self) -> f64 {
        ratio(self.completed_points, self.committed_points)
    }

    /// Returns the most recent burndown sample.
    #[must_use]
    pub fn latest_burndown(&self) -> Option<&BurndownPoint> {
        self.burndown.last()
    }

    const fn state_error(&self, operation: &'static str) -> SprintStateError {
        SprintStateError {
            sprint_id: self.id,
            status: self.status,
            operation,
        }
    }
}

#[expect(clippy::float_arithmetic, reason = "sprint rates are ratios")]
fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    f64::from(numerator) / f64::from(denominator)
}

/// Sums optional estimates, treating missing ones as zero.
#[must_use]
pub fn sum_points(estimates: impl IntoIterator<Item = Option<u32>>) -> u32 {
    estimates
        .into_iter()
        .map(Option::unwrap_or_default)
        .fold(0, u32::saturating_add)
}
