//! Recipe metadata and the collaborators that produce it
//!
//! Locating a recipe inside a directory and rendering it into metadata are
//! delegated to implementations of [`RecipeLocator`] and [`RecipeRenderer`].
//! The defaults live in [`crate::infra::recipe`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::version::VersionConstraint;
use crate::error::{ConfigError, RecipeError};

/// Which requirement set drives graph edges and initial dirty marking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepsType {
    /// Build requirements
    #[default]
    Build,
    /// Run and test requirements
    #[serde(alias = "run")]
    Test,
}

impl fmt::Display for DepsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Test => write!(f, "test"),
        }
    }
}

impl FromStr for DepsType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(Self::Build),
            "test" | "run" => Ok(Self::Test),
            other => Err(ConfigError::InvalidValue {
                key: "deps_type".to_string(),
                value: other.to_string(),
                reason: "expected 'build' or 'test'".to_string(),
            }),
        }
    }
}

/// Platform-specific settings passed into every render call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Target platform (e.g. "linux", "osx", "win")
    pub platform: String,
    /// Target bitness (32 or 64)
    pub bits: u8,
    /// Build matrix variables visible to the recipe
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl RenderConfig {
    /// Create a render config without matrix variables
    pub fn new(platform: impl Into<String>, bits: u8) -> Self {
        Self {
            platform: platform.into(),
            bits,
            variables: BTreeMap::new(),
        }
    }

    /// Add matrix variables
    #[must_use]
    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Platform selector in `platform-bits` form (e.g. "linux-64")
    pub fn subdir(&self) -> String {
        format!("{}-{}", self.platform, self.bits)
    }
}

/// A located recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeHandle {
    /// Recipe directory (the top-level directory in the recipe root)
    pub dir: PathBuf,
    /// Recipe file inside the directory
    pub file: PathBuf,
}

/// Rendered recipe metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeMetadata {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Build number
    #[serde(default)]
    pub build_number: u64,
    /// Recipe does not apply to the rendered platform
    #[serde(default)]
    pub skip: bool,
    /// Build requirements
    #[serde(default)]
    pub build_deps: BTreeMap<String, VersionConstraint>,
    /// Run requirements
    #[serde(default)]
    pub run_deps: BTreeMap<String, VersionConstraint>,
    /// Test requirements
    #[serde(default)]
    pub test_deps: BTreeMap<String, VersionConstraint>,
}

impl RecipeMetadata {
    /// Run and test requirements combined; test entries win on conflict
    pub fn run_test_deps(&self) -> BTreeMap<String, VersionConstraint> {
        let mut deps = self.run_deps.clone();
        deps.extend(self.test_deps.clone());
        deps
    }

    /// Requirement set selected by `deps_type`
    pub fn deps_for(&self, deps_type: DepsType) -> BTreeMap<String, VersionConstraint> {
        match deps_type {
            DepsType::Build => self.build_deps.clone(),
            DepsType::Test => self.run_test_deps(),
        }
    }
}

/// Decides whether a directory holds a recipe
pub trait RecipeLocator {
    /// Locate the recipe in `path`, or fail with [`RecipeError::NotARecipe`]
    fn locate(&self, path: &Path) -> Result<RecipeHandle, RecipeError>;
}

/// Renders a recipe into metadata for one platform
pub trait RecipeRenderer {
    /// Render `recipe` with the given configuration
    fn render(
        &self,
        recipe: &RecipeHandle,
        config: &RenderConfig,
    ) -> Result<RecipeMetadata, RecipeError>;
}
