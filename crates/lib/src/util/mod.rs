//! Shared utilities.

pub mod fs;
pub mod ruby;

#[cfg(test)]
pub mod testutil;
