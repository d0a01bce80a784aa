//! In-memory adapters for the task context.

mod store;

pub use store::InMemoryTaskStore;
