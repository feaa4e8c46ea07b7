//! Shared utilities.

pub mod fs;
pub mod secret;

#[cfg(test)]
pub mod testutil;
