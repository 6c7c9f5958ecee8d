//! Channel index and the default resolver
//!
//! Reads conda `repodata.json` files and answers installability from them.
//! Local buildability is decided by rendering the recipe and matching its
//! version and build number.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::recipe::{RecipeLocator, RecipeRenderer, RenderConfig};
use crate::core::resolver::Resolver;
use crate::core::version::VersionConstraint;
use crate::error::ResolverError;
use crate::infra::filesystem;

#[derive(Debug, Deserialize)]
struct RepoData {
    #[serde(default)]
    packages: BTreeMap<String, RepoRecord>,
    #[serde(default, rename = "packages.conda")]
    conda_packages: BTreeMap<String, RepoRecord>,
}

#[derive(Debug, Deserialize)]
struct RepoRecord {
    name: String,
    version: String,
    #[serde(default)]
    build_number: u64,
}

/// A published package build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Version string
    pub version: String,
    /// Build number
    pub build_number: u64,
}

/// Packages available from the configured channels
#[derive(Debug, Clone, Default)]
pub struct ChannelIndex {
    packages: BTreeMap<String, Vec<IndexEntry>>,
}

impl ChannelIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and merge several `repodata.json` files
    pub fn load(paths: &[PathBuf]) -> Result<Self, ResolverError> {
        let mut index = Self::new();
        for path in paths {
            index.load_file(path)?;
        }
        tracing::info!(
            "Loaded {} package names from {} channel index file(s)",
            index.packages.len(),
            paths.len()
        );
        Ok(index)
    }

    /// Merge one `repodata.json` file into the index
    pub fn load_file(&mut self, path: &Path) -> Result<(), ResolverError> {
        let content = filesystem::read_file(path).map_err(|e| ResolverError::Index {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let repodata: RepoData =
            serde_json::from_str(&content).map_err(|e| ResolverError::Index {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;

        let count = repodata.packages.len() + repodata.conda_packages.len();
        for record in repodata
            .packages
            .into_values()
            .chain(repodata.conda_packages.into_values())
        {
            self.insert(&record.name, &record.version, record.build_number);
        }
        tracing::debug!("Indexed {count} records from {}", path.display());
        Ok(())
    }

    /// Add a single package build
    pub fn insert(&mut self, name: &str, version: &str, build_number: u64) {
        let entry = IndexEntry {
            version: version.to_string(),
            build_number,
        };
        let entries = self.packages.entry(name.to_string()).or_default();
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    /// Published builds of `name`
    pub fn entries(&self, name: &str) -> &[IndexEntry] {
        self.packages.get(name).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct package names
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the index has no packages
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Whether any build of `name` satisfies `constraint`
    pub fn has_match(
        &self,
        name: &str,
        constraint: &VersionConstraint,
    ) -> Result<bool, ResolverError> {
        for entry in self.entries(name) {
            if constraint.matches(&entry.version, entry.build_number)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Resolver combining a channel index with local recipes
pub struct IndexResolver<'a, L, R> {
    index: &'a ChannelIndex,
    locator: &'a L,
    renderer: &'a R,
    render_config: RenderConfig,
}

impl<'a, L: RecipeLocator, R: RecipeRenderer> IndexResolver<'a, L, R> {
    /// Create a resolver rendering local recipes with `render_config`
    pub fn new(
        index: &'a ChannelIndex,
        locator: &'a L,
        renderer: &'a R,
        render_config: RenderConfig,
    ) -> Self {
        Self {
            index,
            locator,
            renderer,
            render_config,
        }
    }
}

impl<L: RecipeLocator, R: RecipeRenderer> Resolver for IndexResolver<'_, L, R> {
    fn is_installable(
        &self,
        name: &str,
        constraint: &VersionConstraint,
    ) -> Result<bool, ResolverError> {
        self.index.has_match(name, constraint)
    }

    fn is_buildable_locally(
        &self,
        recipe_dir: &Path,
        constraint: &VersionConstraint,
    ) -> Result<bool, ResolverError> {
        let handle = self.locator.locate(recipe_dir)?;
        let metadata = self.renderer.render(&handle, &self.render_config)?;
        if metadata.skip {
            return Ok(false);
        }
        Ok(constraint.matches(&metadata.version, metadata.build_number)?)
    }
}
