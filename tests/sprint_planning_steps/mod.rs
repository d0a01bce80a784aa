//! Step definitions for sprint planning scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
