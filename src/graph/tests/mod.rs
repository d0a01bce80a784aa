//! Unit tests for the dependency graph context.
