//! Port contracts for workflow automation.

mod dispatcher;

pub use dispatcher::{AutomationDispatcher, DispatchError};
