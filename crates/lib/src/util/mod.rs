//! Shared utilities.
//!
//! Context digests and test helpers.

pub mod hash;

#[cfg(test)]
pub mod testutil;
