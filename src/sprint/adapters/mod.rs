//! Adapter implementations of sprint ports.

pub mod memory;
