//! Domain model for configurable task workflows.
//!
//! A [`Workflow`] owns the complete transition table for a task's status.
//! Conditions and post-transition actions are closed tagged sets, so every
//! kind the validator may meet is known at compile time.

mod action;
mod condition;
mod error;
mod state;
mod transition;
mod workflow;

pub use action::{ActionContext, PostAction};
pub use condition::{ConditionInput, TransitionCondition};
pub use error::{ConditionViolation, WorkflowDefinitionError, WorkflowValidationError};
pub use state::{StateCategory, StateId, WorkflowState};
pub use transition::{Actor, StateTransition, TransitionTrigger};
pub use workflow::{Workflow, WorkflowDefinition, WorkflowTransition};
