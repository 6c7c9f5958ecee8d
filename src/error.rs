//! Error types for fanout
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Recipe discovery and rendering errors
#[derive(Error, Debug)]
pub enum RecipeError {
    /// Directory does not contain a recipe
    #[error("Not a recipe directory: {path}")]
    NotARecipe { path: PathBuf },

    /// Recipe exists but could not be rendered
    #[error("Failed to render recipe '{path}': {error}")]
    Render { path: PathBuf, error: String },

    /// IO error while reading a recipe
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Version constraint errors
#[derive(Error, Debug, PartialEq)]
pub enum VersionError {
    /// Constraint could not be parsed as a conda version spec
    #[error("Invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    /// Version string could not be parsed
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },
}

/// Graph construction errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Recipe root directory missing
    #[error("Recipe root not found: {path}")]
    RecipeRootNotFound { path: PathBuf },

    /// Two active recipes produce the same package
    #[error("Package '{name}' is produced by two recipes: '{first}' and '{second}'")]
    DuplicateRecipe {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Explicitly requested recipe failed
    #[error(transparent)]
    Recipe(#[from] RecipeError),
}

/// Resolver oracle errors
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Channel index could not be loaded
    #[error("Failed to load channel index '{path}': {error}")]
    Index { path: PathBuf, error: String },

    /// Local recipe could not be inspected
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    /// Constraint or version could not be evaluated
    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Dirty-set propagation errors
#[derive(Error, Debug)]
pub enum PropagationError {
    /// Dependency is neither installable nor buildable from a local recipe
    #[error("Dependency '{package}' ({constraint}) required by '{required_by}' is not installable, and no local recipe can produce it")]
    UnsatisfiableDependency {
        package: String,
        constraint: String,
        required_by: String,
    },

    /// Resolver oracle failed
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),
}

/// Build planning errors
#[derive(Error, Debug)]
pub enum PlanError {
    /// Requested subgraph contains a cycle
    #[error("Cycle detected in build graph: {}", cycle.join(" -> "))]
    GraphCycle {
        cycle: Vec<String>,
        edges: Vec<(String, String)>,
    },

    /// Requested package is not in the graph
    #[error("Package '{name}' is not in the build graph")]
    UnknownPackage { name: String },
}

/// Change detection errors
#[derive(Error, Debug)]
pub enum ChangeError {
    /// Repository could not be opened
    #[error("Invalid repository at '{path}': {error}")]
    InvalidRepository { path: PathBuf, error: String },

    /// Revision could not be resolved
    #[error("Failed to resolve revision '{revision}': {error}")]
    ResolveFailed { revision: String, error: String },

    /// Tree could not be read
    #[error("Failed to read tree for '{revision}': {error}")]
    TreeFailed { revision: String, error: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Invalid value
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Build matrix errors
#[derive(Error, Debug)]
pub enum MatrixError {
    /// Failed to read a matrix or platform file
    #[error("Failed to read '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Failed to parse a matrix or platform file
    #[error("Failed to parse '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Recipe rendering failed
    #[error(transparent)]
    Recipe(#[from] RecipeError),
}

/// Top-level fanout error type
#[derive(Error, Debug)]
pub enum FanoutError {
    /// Recipe error
    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    /// Graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Propagation error
    #[error("Propagation error: {0}")]
    Propagation(#[from] PropagationError),

    /// Plan error
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Change detection error
    #[error("Change detection error: {0}")]
    Change(#[from] ChangeError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Matrix error
    #[error("Matrix error: {0}")]
    Matrix(#[from] MatrixError),
}
