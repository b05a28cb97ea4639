//! Subcommand implementations.

pub mod compose;
pub mod fetch;
