//! In-memory sprint adapters.

mod repository;

pub use repository::InMemorySprintRepository;
