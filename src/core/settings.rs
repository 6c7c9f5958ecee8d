//! Layered configuration
//!
//! Settings come from, lowest precedence first: built-in defaults, the
//! global `config.toml` in the user config directory, and `fanout.toml` at
//! the recipe root. Command-line flags are applied on top by the CLI.
//!
//! ```toml
//! [graph]
//! deps_type = "build"
//!
//! [propagation]
//! target = "test"
//! steps = "until-stable"
//! max_downstream = 10
//!
//! [index]
//! repodata = ["channel/linux-64/repodata.json"]
//!
//! [matrix]
//! versions = "versions.toml"
//! platforms_dir = "platforms"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::defaults::PROJECT_CONFIG_FILE;
use crate::core::propagate::{DownstreamCap, PropagationOptions, StepLimit, TargetFlag};
use crate::core::recipe::DepsType;
use crate::error::ConfigError;
use crate::infra::dirs::FanoutDirs;

/// One configuration file; unset values fall through to lower layers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Graph construction settings
    #[serde(default)]
    pub graph: GraphSection,

    /// Propagation settings
    #[serde(default)]
    pub propagation: PropagationSection,

    /// Channel index settings
    #[serde(default)]
    pub index: IndexSection,

    /// Build matrix settings
    #[serde(default)]
    pub matrix: MatrixSection,
}

/// `[graph]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphSection {
    /// Requirement set used for edges
    pub deps_type: Option<DepsType>,
}

/// `[propagation]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropagationSection {
    /// Flag given to dependents
    pub target: Option<TargetFlag>,
    /// Downstream layers
    pub steps: Option<StepLimit>,
    /// Cap on newly marked dependents
    pub max_downstream: Option<DownstreamCap>,
}

/// `[index]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexSection {
    /// `repodata.json` files
    pub repodata: Option<Vec<PathBuf>>,
}

/// `[matrix]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatrixSection {
    /// `versions.toml` file
    pub versions: Option<PathBuf>,
    /// Directory of platform files
    pub platforms_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Load a config file; a missing file yields an empty layer
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Overlay `upper` on top of `self`
    #[must_use]
    pub fn merge(self, upper: Self) -> Self {
        Self {
            graph: GraphSection {
                deps_type: upper.graph.deps_type.or(self.graph.deps_type),
            },
            propagation: PropagationSection {
                target: upper.propagation.target.or(self.propagation.target),
                steps: upper.propagation.steps.or(self.propagation.steps),
                max_downstream: upper
                    .propagation
                    .max_downstream
                    .or(self.propagation.max_downstream),
            },
            index: IndexSection {
                repodata: upper.index.repodata.or(self.index.repodata),
            },
            matrix: MatrixSection {
                versions: upper.matrix.versions.or(self.matrix.versions),
                platforms_dir: upper.matrix.platforms_dir.or(self.matrix.platforms_dir),
            },
        }
    }

    /// Resolve relative paths against `base`
    #[must_use]
    fn relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| base.join(p);
        self.index.repodata = self
            .index
            .repodata
            .map(|paths| paths.into_iter().map(resolve).collect());
        self.matrix.versions = self.matrix.versions.map(resolve);
        self.matrix.platforms_dir = self.matrix.platforms_dir.map(resolve);
        self
    }
}

/// Effective settings for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Requirement set used for edges
    pub deps_type: DepsType,
    /// Downstream fan-out options
    pub propagation: PropagationOptions,
    /// Channel index files
    pub repodata: Vec<PathBuf>,
    /// Build matrix file
    pub versions: Option<PathBuf>,
    /// Directory of platform files
    pub platforms_dir: Option<PathBuf>,
}

impl Settings {
    /// Load global and project configuration for `recipe_root`
    pub fn load(dirs: &FanoutDirs, recipe_root: &Path) -> Result<Self, ConfigError> {
        let global_path = dirs.global_config_path();
        let project_path = recipe_root.join(PROJECT_CONFIG_FILE);
        tracing::debug!(
            "Loading configuration from {} and {}",
            global_path.display(),
            project_path.display()
        );

        let global = ConfigFile::load_from_path(&global_path)?.relative_to(&dirs.config_dir());
        let project = ConfigFile::load_from_path(&project_path)?.relative_to(recipe_root);
        Ok(Self::from_file(global.merge(project)))
    }

    /// Apply defaults to a merged config file
    pub fn from_file(file: ConfigFile) -> Self {
        let defaults = PropagationOptions::default();
        Self {
            deps_type: file.graph.deps_type.unwrap_or_default(),
            propagation: PropagationOptions {
                target: file.propagation.target.unwrap_or(defaults.target),
                steps: file.propagation.steps.unwrap_or(defaults.steps),
                max_downstream: file
                    .propagation
                    .max_downstream
                    .unwrap_or(defaults.max_downstream),
            },
            repodata: file.index.repodata.unwrap_or_default(),
            versions: file.matrix.versions,
            platforms_dir: file.matrix.platforms_dir,
        }
    }
}
