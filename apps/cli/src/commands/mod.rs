//! Command implementations for the Babel CLI.

pub mod batch;
pub mod stats;
pub mod sweep;
pub mod translate;
