//! Fanout - CI fan-out planning for recipe repositories
//!
//! Given a monorepo of interdependent build recipes and a set of changed
//! recipe directories, fanout decides which packages must be rebuilt,
//! retested or merely confirmed installable, and in what order.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Graph construction, propagation and planning
//! - [`infra`] - Infrastructure layer (filesystem, git, channel indexes)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
