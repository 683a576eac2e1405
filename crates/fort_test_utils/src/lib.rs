//! # Fort Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixture builders for common structures
//! - Invariant checks and a naive collapse oracle
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod invariants;

/// Re-export proptest for convenience.
pub use proptest;
