//! Unit tests for the task context.

pub(crate) mod support;
