//! Domain model for sprints.

mod risk;
mod sprint;

pub use risk::{RiskFactor, RiskInputs, RiskLevel, SprintRisk, assess_risk};
pub use sprint::{
    BurndownPoint, CapacityExceededError, NewSprintData, Sprint, SprintStateError, SprintStatus,
    SprintVersion, sum_points,
};
