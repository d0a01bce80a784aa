//! Application services for dependency management.

mod dependency;

pub use dependency::{
    AddDependencyRequest, DependencyService, GraphServiceError, GraphServiceResult,
};
