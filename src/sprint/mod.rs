//! Sprint planning.
//!
//! A sprint commits story points up to its capacity, tracks work added after
//! the start as scope change and records a daily burndown. Risk assessment
//! combines blocked work, burndown deviation and late critical-path tasks.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
