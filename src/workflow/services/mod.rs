//! Application services for workflow enforcement.

mod engine;

pub use engine::{
    TransitionOutcome, TransitionRequest, WorkflowEngine, WorkflowEngineError,
    WorkflowEngineResult,
};
