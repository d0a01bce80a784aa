//! Time-in-state, cycle and lead time, team aggregates and DORA metrics.
//!
//! Everything in [`domain`] is a pure function of its inputs; [`services`]
//! only loads data and delegates.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
