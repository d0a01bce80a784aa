//! Unit tests for the metrics context.
