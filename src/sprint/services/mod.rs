//! Sprint orchestration services.

mod planner;

pub use planner::{
    CreateSprintRequest, SprintPlanner, SprintReport, SprintServiceError, SprintServiceResult,
};
