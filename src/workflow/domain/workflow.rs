//! Configurable workflow state machine.

use super::{
    ConditionInput, ConditionViolation, PostAction, StateCategory, StateId, TransitionCondition,
    WorkflowDefinitionError, WorkflowState, WorkflowValidationError,
};
use crate::task::domain::ActorId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Allowed move between two workflow states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTransition {
    /// Source state.
    pub from: StateId,
    /// Target state.
    pub to: StateId,
    /// Guards that must all hold.
    #[serde(default)]
    pub conditions: Vec<TransitionCondition>,
    /// Approvals the request must carry.
    #[serde(default)]
    pub required_approvals: u32,
    /// Actions dispatched after commit.
    #[serde(default)]
    pub post_actions: Vec<PostAction>,
    /// Roles permitted to perform the transition. Empty means any.
    #[serde(default)]
    pub allowed_roles: Vec<String>,
    /// Users permitted to perform the transition. Empty means any.
    #[serde(default)]
    pub allowed_users: Vec<ActorId>,
}

impl WorkflowTransition {
    /// Creates an unrestricted transition.
    #[must_use]
    pub const fn new(from: StateId, to: StateId) -> Self {
        Self {
            from,
            to,
            conditions: Vec::new(),
            required_approvals: 0,
            post_actions: Vec::new(),
            allowed_roles: Vec::new(),
            allowed_users: Vec::new(),
        }
    }

    /// Adds a guard condition.
    #[must_use]
    pub fn with_condition(mut self, condition: TransitionCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Sets the number of required approvals.
    #[must_use]
    pub const fn with_required_approvals(mut self, approvals: u32) -> Self {
        self.required_approvals = approvals;
        self
    }

    /// Adds a post-transition action.
    #[must_use]
    pub fn with_post_action(mut self, action: PostAction) -> Self {
        self.post_actions.push(action);
        self
    }

    /// Restricts the transition to the given roles.
    #[must_use]
    pub fn allowed_for_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Restricts the transition to the given users.
    #[must_use]
    pub fn allowed_for_users(mut self, users: impl IntoIterator<Item = ActorId>) -> Self {
        self.allowed_users.extend(users);
        self
    }

    /// Returns whether `actor` may perform the transition.
    #[must_use]
    pub fn permits(&self, actor: &super::Actor) -> bool {
        if self.allowed_roles.is_empty() && self.allowed_users.is_empty() {
            return true;
        }
        self.allowed_users.contains(actor.id())
            || self.allowed_roles.iter().any(|role| actor.has_role(role))
    }
}

/// Serializable workflow description, validated by [`Workflow::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow name.
    pub name: String,
    /// Status assigned to new tasks.
    pub initial_state: StateId,
    /// Terminal status used for soft deletion.
    #[serde(default)]
    pub cancel_state: Option<StateId>,
    /// Declared states.
    pub states: Vec<WorkflowState>,
    /// Transition table.
    #[serde(default)]
    pub transitions: Vec<WorkflowTransition>,
}

/// Validated workflow: the complete transition table for a task's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    definition: WorkflowDefinition,
    states: BTreeMap<StateId, WorkflowState>,
    transitions: HashMap<(StateId, StateId), WorkflowTransition>,
}

impl Workflow {
    /// Validates a definition and builds its lookup tables.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDefinitionError`] when the name is empty, states are
    /// duplicated, references are unknown, a terminal state has outgoing
    /// transitions, the initial state is terminal, or the cancel state is
    /// not terminal.
    pub fn new(definition: WorkflowDefinition) -> Result<Self, WorkflowDefinitionError> {
        if definition.name.trim().is_empty() {
            return Err(WorkflowDefinitionError::EmptyName);
        }

        let mut states = BTreeMap::new();
        for state in &definition.states {
            if states.insert(state.id.clone(), state.clone()).is_some() {
                return Err(WorkflowDefinitionError::DuplicateState(state.id.clone()));
            }
        }

        let initial = states
            .get(&definition.initial_state)
            .ok_or_else(|| WorkflowDefinitionError::UnknownState(definition.initial_state.clone()))?;
        if initial.is_terminal() {
            return Err(WorkflowDefinitionError::TerminalInitialState(
                definition.initial_state.clone(),
            ));
        }

        if let Some(cancel_state) = &definition.cancel_state {
            let cancel = states
                .get(cancel_state)
                .ok_or_else(|| WorkflowDefinitionError::UnknownState(cancel_state.clone()))?;
            if !cancel.is_terminal() {
                return Err(WorkflowDefinitionError::NonTerminalCancelState(
                    cancel_state.clone(),
                ));
            }
        }

        let mut transitions = HashMap::new();
        for transition in &definition.transitions {
            let from = states
                .get(&transition.from)
                .ok_or_else(|| WorkflowDefinitionError::UnknownState(transition.from.clone()))?;
            if !states.contains_key(&transition.to) {
                return Err(WorkflowDefinitionError::UnknownState(transition.to.clone()));
            }
            if from.is_terminal() {
                return Err(WorkflowDefinitionError::TransitionFromTerminal(
                    transition.from.clone(),
                ));
            }
            let key = (transition.from.clone(), transition.to.clone());
            if transitions.insert(key, transition.clone()).is_some() {
                return Err(WorkflowDefinitionError::DuplicateTransition {
                    from: transition.from.clone(),
                    to: transition.to.clone(),
                });
            }
        }

        Ok(Self {
            definition,
            states,
            transitions,
        })
    }

    /// Returns the default software-delivery workflow.
    ///
    /// States: `backlog`, `todo`, `in_progress`, `blocked`, `in_review`,
    /// `done` and `cancelled`.
    #[must_use]
    pub fn standard() -> Self {
        let backlog = StateId::from_static("backlog");
        let todo = StateId::from_static("todo");
        let in_progress = StateId::from_static("in_progress");
        let blocked = StateId::from_static("blocked");
        let in_review = StateId::from_static("in_review");
        let done = StateId::from_static("done");
        let cancelled = StateId::from_static("cancelled");

        let states = vec![
            WorkflowState::new(backlog.clone(), "Backlog", StateCategory::Todo),
            WorkflowState::new(todo.clone(), "To Do", StateCategory::Todo),
            WorkflowState::new(in_progress.clone(), "In Progress", StateCategory::InProgress),
            WorkflowState::new(blocked.clone(), "Blocked", StateCategory::InProgress).blocking(),
            WorkflowState::new(in_review.clone(), "In Review", StateCategory::InProgress),
            WorkflowState::new(done.clone(), "Done", StateCategory::Done),
            WorkflowState::new(cancelled.clone(), "Cancelled", StateCategory::Done),
        ];

        let edges = [
            (&backlog, &todo),
            (&backlog, &cancelled),
            (&todo, &backlog),
            (&todo, &in_progress),
            (&todo, &cancelled),
            (&in_progress, &todo),
            (&in_progress, &blocked),
            (&in_progress, &in_review),
            (&in_progress, &done),
            (&in_progress, &cancelled),
            (&blocked, &in_progress),
            (&blocked, &cancelled),
            (&in_review, &in_progress),
            (&in_review, &done),
            (&in_review, &cancelled),
        ];
        let transitions: Vec<WorkflowTransition> = edges
            .into_iter()
            .map(|(from, to)| WorkflowTransition::new(from.clone(), to.clone()))
            .collect();

        let definition = WorkflowDefinition {
            name: "standard".to_owned(),
            initial_state: backlog,
            cancel_state: Some(cancelled),
            states,
            transitions,
        };
        Self::from_trusted(definition)
    }

    fn from_trusted(definition: WorkflowDefinition) -> Self {
        let states = definition
            .states
            .iter()
            .map(|state| (state.id.clone(), state.clone()))
            .collect();
        let transitions = definition
            .transitions
            .iter()
            .map(|transition| {
                (
                    (transition.from.clone(), transition.to.clone()),
                    transition.clone(),
                )
            })
            .collect();
        Self {
            definition,
            states,
            transitions,
        }
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the definition the workflow was built from.
    #[must_use]
    pub const fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    /// Returns the status assigned to new tasks.
    #[must_use]
    pub const fn initial_state(&self) -> &StateId {
        &self.definition.initial_state
    }

    /// Returns the terminal status used for soft deletion, if configured.
    #[must_use]
    pub const fn cancel_state(&self) -> Option<&StateId> {
        self.definition.cancel_state.as_ref()
    }

    /// Returns the state with the given identifier.
    #[must_use]
    pub fn state(&self, id: &StateId) -> Option<&WorkflowState> {
        self.states.get(id)
    }

    /// Returns all states ordered by identifier.
    pub fn states(&self) -> impl Iterator<Item = &WorkflowState> {
        self.states.values()
    }

    /// Returns whether `id` is a state of this workflow.
    #[must_use]
    pub fn contains_state(&self, id: &StateId) -> bool {
        self.states.contains_key(id)
    }

    /// Returns the category of state `id`.
    #[must_use]
    pub fn category_of(&self, id: &StateId) -> Option<StateCategory> {
        self.states.get(id).map(|state| state.category)
    }

    /// Returns whether `id` is a state in `category`.
    #[must_use]
    pub fn is_in_category(&self, id: &StateId, category: StateCategory) -> bool {
        self.category_of(id) == Some(category)
    }

    /// Returns whether state `id` is terminal.
    #[must_use]
    pub fn is_terminal(&self, id: &StateId) -> bool {
        self.states.get(id).is_some_and(WorkflowState::is_terminal)
    }

    /// Returns whether state `id` is flagged as blocked.
    #[must_use]
    pub fn is_blocked(&self, id: &StateId) -> bool {
        self.states.get(id).is_some_and(|state| state.blocked)
    }

    /// Returns the transition between two states, if declared.
    #[must_use]
    pub fn transition(&self, from: &StateId, to: &StateId) -> Option<&WorkflowTransition> {
        self.transitions.get(&(from.clone(), to.clone()))
    }

    /// Returns the transitions leaving `from`.
    pub fn transitions_from<'a>(
        &'a self,
        from: &'a StateId,
    ) -> impl Iterator<Item = &'a WorkflowTransition> + 'a {
        self.definition
            .transitions
            .iter()
            .filter(move |transition| &transition.from == from)
    }

    /// Validates moving the task in `input` to `to`.
    ///
    /// Terminal states are rejected before the transition table is
    /// consulted. Once a transition is found, every role, approval and
    /// condition check is evaluated so the caller sees all violations.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowValidationError`] listing every violated rule.
    pub fn validate_transition(
        &self,
        input: &ConditionInput<'_>,
        to: &StateId,
    ) -> Result<&WorkflowTransition, WorkflowValidationError> {
        let from = input.task.status();
        let reject = |violated_conditions| WorkflowValidationError {
            task_id: input.task.id(),
            from: from.clone(),
            to: to.clone(),
            violated_conditions,
        };

        let Some(current) = self.state(from) else {
            return Err(reject(vec![ConditionViolation::UnknownCurrentState(
                from.clone(),
            )]));
        };
        if current.is_terminal() {
            return Err(reject(vec![ConditionViolation::TerminalState(from.clone())]));
        }
        if !self.contains_state(to) {
            return Err(reject(vec![ConditionViolation::UnknownTargetState(
                to.clone(),
            )]));
        }
        let Some(transition) = self.transition(from, to) else {
            return Err(reject(vec![ConditionViolation::NoSuchTransition {
                from: from.clone(),
                to: to.clone(),
            }]));
        };

        let mut violations = Vec::new();
        if !transition.permits(input.actor) {
            violations.push(ConditionViolation::ActorNotAllowed(input.actor.id().clone()));
        }
        if input.approvals < transition.required_approvals {
            violations.push(ConditionViolation::InsufficientApprovals {
                required: transition.required_approvals,
                actual: input.approvals,
            });
        }
        violations.extend(
            transition
                .conditions
                .iter()
                .filter(|condition| !condition.holds(input))
                .cloned()
                .map(ConditionViolation::ConditionFailed),
        );

        if violations.is_empty() {
            Ok(transition)
        } else {
            Err(reject(violations))
        }
    }
}
