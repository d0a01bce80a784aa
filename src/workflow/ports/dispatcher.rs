//! Dispatch port for post-transition actions.

use crate::workflow::domain::{ActionContext, PostAction};
use async_trait::async_trait;
use thiserror::Error;

/// Executes post-transition actions.
///
/// Dispatch runs after the transition has committed. Failures are reported
/// back to the caller as warnings and never undo the transition.
#[async_trait]
pub trait AutomationDispatcher: Send + Sync {
    /// Executes one action for a committed transition.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the action could not be carried out.
    async fn dispatch(
        &self,
        action: &PostAction,
        context: &ActionContext,
    ) -> Result<(), DispatchError>;
}

/// A post-transition action failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} action failed: {reason}")]
pub struct DispatchError {
    /// Kind of the failed action.
    pub kind: &'static str,
    /// Failure description.
    pub reason: String,
}

impl DispatchError {
    /// Creates an error for `action`.
    #[must_use]
    pub fn new(action: &PostAction, reason: impl Into<String>) -> Self {
        Self {
            kind: action.kind(),
            reason: reason.into(),
        }
    }
}
