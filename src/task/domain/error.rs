//! Error types for task domain validation and parsing.

use std::fmt;
use thiserror::Error;

/// Reason a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    /// The value is empty after trimming.
    Empty,
    /// The value exceeds its maximum length.
    TooLong {
        /// Maximum accepted length in characters.
        max: usize,
    },
    /// The value is not a state of the active workflow.
    UnknownState,
    /// The state is terminal and cannot be entered this way.
    TerminalState,
    /// The referenced entity does not exist.
    NotFound,
    /// The value refers back to the entity itself.
    SelfReference,
    /// Re-parenting would make a task its own ancestor.
    ParentCycle,
    /// The parent chain would exceed the configured depth.
    DepthExceeded {
        /// Maximum accepted depth.
        max: usize,
    },
    /// The value is outside its accepted range.
    OutOfRange,
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "must not be empty"),
            Self::TooLong { max } => write!(f, "exceeds {max} characters"),
            Self::UnknownState => write!(f, "is not a state of the active workflow"),
            Self::TerminalState => write!(f, "must not be a terminal state"),
            Self::NotFound => write!(f, "references a missing entity"),
            Self::SelfReference => write!(f, "must not reference itself"),
            Self::ParentCycle => write!(f, "would create a parent cycle"),
            Self::DepthExceeded { max } => write!(f, "exceeds maximum depth {max}"),
            Self::OutOfRange => write!(f, "is out of range"),
        }
    }
}

/// A field-level validation failure detected before any write.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {field}: {code}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Why the field was rejected.
    pub code: ValidationCode,
}

impl ValidationError {
    /// Creates a validation error for `field`.
    #[must_use]
    pub const fn new(field: &'static str, code: ValidationCode) -> Self {
        Self { field, code }
    }
}

/// Error returned while parsing task enumerations from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseTaskFieldError {
    /// Enumeration being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}
