//! CLI command implementations.

pub mod maintenance;
