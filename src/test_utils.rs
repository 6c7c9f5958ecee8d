//! Test utilities
//!
//! Proptest generators, an in-memory resolver and recipe repository fixtures.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::core::resolver::Resolver;
use crate::core::version::VersionConstraint;
use crate::error::ResolverError;

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid package name (lowercase alphanumeric with hyphens)
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,30}[a-z0-9]?".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Generate a conda-style version string
    pub fn conda_version() -> impl Strategy<Value = String> {
        (0u32..30, 0u32..30, proptest::option::of(0u32..30)).prop_map(|(major, minor, patch)| {
            match patch {
                Some(patch) => format!("{major}.{minor}.{patch}"),
                None => format!("{major}.{minor}"),
            }
        })
    }

    /// Generate a DAG of up to `max_nodes` packages
    ///
    /// Each entry is a package and its dependencies. Dependencies always
    /// appear earlier in the list; names are shuffled so that list order and
    /// name order differ.
    pub fn dag(max_nodes: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
        (1..=max_nodes)
            .prop_flat_map(|n| {
                let names: Vec<String> = (0..n).map(|i| format!("pkg-{i:02}")).collect();
                (
                    Just(names).prop_shuffle(),
                    proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n),
                )
            })
            .prop_map(|(names, adjacency)| {
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let deps = (0..i)
                            .filter(|&j| adjacency[i][j])
                            .map(|j| names[j].clone())
                            .collect();
                        (name.clone(), deps)
                    })
                    .collect()
            })
    }
}

/// Resolver backed by in-memory package and recipe lists
#[derive(Debug, Default)]
pub struct MemoryResolver {
    packages: BTreeMap<String, Vec<String>>,
    buildable: BTreeSet<PathBuf>,
    failing: bool,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` at `version` installable
    #[must_use]
    pub fn with_package(mut self, name: &str, version: &str) -> Self {
        self.packages
            .entry(name.to_string())
            .or_default()
            .push(version.to_string());
        self
    }

    /// Make the recipe in `recipe_dir` locally buildable
    #[must_use]
    pub fn with_buildable(mut self, recipe_dir: impl Into<PathBuf>) -> Self {
        self.buildable.insert(recipe_dir.into());
        self
    }

    /// Fail every query
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check_failing(&self) -> Result<(), ResolverError> {
        if self.failing {
            return Err(ResolverError::Index {
                path: PathBuf::from("memory"),
                error: "index unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl Resolver for MemoryResolver {
    fn is_installable(
        &self,
        name: &str,
        constraint: &VersionConstraint,
    ) -> Result<bool, ResolverError> {
        self.check_failing()?;
        for version in self.packages.get(name).into_iter().flatten() {
            if constraint.matches(version, 0)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_buildable_locally(
        &self,
        recipe_dir: &Path,
        _constraint: &VersionConstraint,
    ) -> Result<bool, ResolverError> {
        self.check_failing()?;
        Ok(self.buildable.contains(recipe_dir))
    }
}

#[cfg(test)]
pub mod fixtures {
    use std::path::Path;
    use tempfile::TempDir;

    /// Temporary recipe repository
    pub struct RecipeRepo {
        dir: TempDir,
    }

    impl RecipeRepo {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().expect("Failed to create temp directory"),
            }
        }

        pub fn path(&self) -> &Path {
            self.dir.path()
        }

        /// Write `dir/recipe.toml` for a package
        pub fn add_recipe(
            &self,
            dir: &str,
            name: &str,
            version: &str,
            build_deps: &[&str],
            run_deps: &[&str],
        ) {
            let content = format!(
                "[package]\nname = \"{name}\"\nversion = \"{version}\"\n\n\
                 [requirements]\nbuild = {build_deps:?}\nrun = {run_deps:?}\n"
            );
            self.create_file(&format!("{dir}/recipe.toml"), &content);
        }

        pub fn create_file(&self, name: &str, content: &str) {
            let path = self.dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("Failed to create parent directories");
            }
            std::fs::write(path, content).expect("Failed to write file");
        }

        pub fn create_dir(&self, name: &str) {
            std::fs::create_dir_all(self.dir.path().join(name))
                .expect("Failed to create directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_memory_resolver_matches_constraints() {
        let resolver = MemoryResolver::new().with_package("numpy", "1.11.3");
        assert!(resolver
            .is_installable("numpy", &VersionConstraint::new(">=1.11"))
            .unwrap());
        assert!(!resolver
            .is_installable("numpy", &VersionConstraint::new(">=1.12"))
            .unwrap());
        assert!(!resolver
            .is_installable("scipy", &VersionConstraint::any())
            .unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn test_conda_version_generator(version in conda_version()) {
            prop_assert!(crate::core::version::parse_version(&version).is_ok());
        }

        #[test]
        fn test_dag_dependencies_come_first(edges in dag(10)) {
            for (i, (_, deps)) in edges.iter().enumerate() {
                for dep in deps {
                    let position = edges.iter().position(|(n, _)| n == dep).unwrap();
                    prop_assert!(position < i);
                }
            }
        }
    }
}
