//! Recording dispatcher for tests and embedded use.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use crate::workflow::{
    domain::{ActionContext, PostAction},
    ports::{AutomationDispatcher, DispatchError},
};

/// Dispatcher that records every action it receives.
///
/// Actions whose kind was registered with [`RecordingDispatcher::failing`]
/// are recorded and then reported as failed.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    dispatched: Arc<RwLock<Vec<(PostAction, ActionContext)>>>,
    failing_kinds: BTreeSet<&'static str>,
}

impl RecordingDispatcher {
    /// Creates a dispatcher that accepts every action.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes actions of `kind` fail after being recorded.
    #[must_use]
    pub fn failing(mut self, kind: &'static str) -> Self {
        self.failing_kinds.insert(kind);
        self
    }

    /// Returns the dispatched actions in order.
    #[must_use]
    pub fn dispatched(&self) -> Vec<(PostAction, ActionContext)> {
        self.dispatched
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AutomationDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        action: &PostAction,
        context: &ActionContext,
    ) -> Result<(), DispatchError> {
        self.dispatched
            .write()
            .map_err(|err| DispatchError::new(action, err.to_string()))?
            .push((action.clone(), context.clone()));
        if self.failing_kinds.contains(action.kind()) {
            return Err(DispatchError::new(action, "rejected by recording dispatcher"));
        }
        Ok(())
    }
}
