//! Core business logic module
//!
//! This module contains the planning logic for fanout. Recipe discovery,
//! git access and channel indexes are reached through traits whose
//! implementations live in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`version`] - Version constraints on requirements
//! - [`recipe`] - Recipe metadata and the locator/renderer seams
//! - [`graph`] - Package dependency graph with per-node flags
//! - [`builder`] - Graph construction from a recipe root
//! - [`resolver`] - Installability and local buildability queries
//! - [`propagate`] - Upstream closure and downstream fan-out of dirty flags
//! - [`planner`] - Dependency-respecting build order
//! - [`changes`] - Changed recipe detection for a revision range
//! - [`matrix`] - Platforms and build matrix expansion
//! - [`pipeline`] - The per-platform planning pipeline
//! - [`settings`] - Layered configuration
//! - [`tree`] - Graph visualization

pub mod builder;
pub mod changes;
pub mod graph;
pub mod matrix;
pub mod pipeline;
pub mod planner;
pub mod propagate;
pub mod recipe;
pub mod resolver;
pub mod settings;
pub mod tree;
pub mod version;
