//! Dependency graph construction
//!
//! Walks the immediate subdirectories of a recipe root, renders every recipe
//! for one platform and records packages and their declared dependencies.

use std::collections::BTreeSet;
use std::path::Path;

use crate::core::graph::{BuildGraph, NodeFlags};
use crate::core::recipe::{DepsType, RecipeLocator, RecipeRenderer, RenderConfig};
use crate::error::{GraphError, RecipeError};
use crate::infra::filesystem;

/// Builds a [`BuildGraph`] from a directory of recipes
pub struct DependencyGraphBuilder<'a, L, R> {
    locator: &'a L,
    renderer: &'a R,
    render_config: RenderConfig,
    deps_type: DepsType,
    changed: BTreeSet<String>,
}

impl<'a, L: RecipeLocator, R: RecipeRenderer> DependencyGraphBuilder<'a, L, R> {
    /// Create a builder rendering recipes with `render_config`
    pub fn new(locator: &'a L, renderer: &'a R, render_config: RenderConfig) -> Self {
        Self {
            locator,
            renderer,
            render_config,
            deps_type: DepsType::default(),
            changed: BTreeSet::new(),
        }
    }

    /// Select the requirement set used for edges and initial marking
    #[must_use]
    pub fn with_deps_type(mut self, deps_type: DepsType) -> Self {
        self.deps_type = deps_type;
        self
    }

    /// Set the changed recipe directory names (relative to the recipe root)
    #[must_use]
    pub fn with_changed<I, S>(mut self, changed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changed = changed.into_iter().map(Into::into).collect();
        self
    }

    /// Build the graph for every recipe under `recipe_root`
    ///
    /// Directories without a recipe and recipes that fail to render are
    /// skipped.
    pub fn build(&self, recipe_root: &Path) -> Result<BuildGraph, GraphError> {
        if !recipe_root.is_dir() {
            return Err(GraphError::RecipeRootNotFound {
                path: recipe_root.to_path_buf(),
            });
        }

        let mut graph = BuildGraph::new(self.deps_type);
        let dirs = filesystem::list_subdirectories(recipe_root)?;
        tracing::info!(
            "Scanning {} directories in {} for {}",
            dirs.len(),
            recipe_root.display(),
            self.render_config.subdir()
        );

        for dir in &dirs {
            match self.add_recipe(&mut graph, recipe_root, dir) {
                Ok(()) => {}
                Err(GraphError::Recipe(RecipeError::NotARecipe { path })) => {
                    tracing::debug!("Skipping {}: not a recipe", path.display());
                }
                Err(GraphError::Recipe(e)) => {
                    tracing::warn!("Skipping recipe '{dir}': {e}");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Graph has {} packages and {} dependency edges",
            graph.len(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Add the recipe in `recipe_root/dir_name` to `graph`
    ///
    /// Unlike [`Self::build`], locate and render failures are returned.
    pub fn add_recipe(
        &self,
        graph: &mut BuildGraph,
        recipe_root: &Path,
        dir_name: &str,
    ) -> Result<(), GraphError> {
        let recipe_dir = recipe_root.join(dir_name);
        let handle = self.locator.locate(&recipe_dir)?;
        let metadata = self.renderer.render(&handle, &self.render_config)?;

        let changed = self.changed.contains(dir_name);
        let flags = if metadata.skip {
            tracing::debug!(
                "Recipe '{dir_name}' is skipped for {}",
                self.render_config.subdir()
            );
            NodeFlags::default()
        } else {
            NodeFlags {
                needs_build: changed && self.deps_type == DepsType::Build,
                needs_test: changed && self.deps_type == DepsType::Test,
                needs_install_check: false,
            }
        };

        let name = metadata.name.clone();
        let deps = metadata.deps_for(self.deps_type);
        graph.insert_recipe(recipe_dir, metadata, flags)?;
        for (dep, constraint) in deps {
            graph.add_dependency(&name, &dep, constraint);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::VersionConstraint;
    use crate::test_utils::fixtures::RecipeRepo;
    use crate::infra::recipe::{FsRecipeLocator, TomlRecipeRenderer};

    fn build(repo: &RecipeRepo, deps_type: DepsType, changed: &[&str]) -> BuildGraph {
        let locator = FsRecipeLocator::default();
        let renderer = TomlRecipeRenderer::new();
        DependencyGraphBuilder::new(&locator, &renderer, RenderConfig::new("linux", 64))
            .with_deps_type(deps_type)
            .with_changed(changed.iter().copied())
            .build(repo.path())
            .unwrap()
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let locator = FsRecipeLocator::default();
        let renderer = TomlRecipeRenderer::new();
        let result = DependencyGraphBuilder::new(&locator, &renderer, RenderConfig::new("linux", 64))
            .build(Path::new("/definitely/not/a/recipe/root"));
        assert!(matches!(result, Err(GraphError::RecipeRootNotFound { .. })));
    }

    #[test]
    fn test_non_recipe_and_broken_dirs_skipped() {
        let repo = RecipeRepo::new();
        repo.add_recipe("a", "a", "1.0", &[], &[]);
        repo.create_dir("docs");
        repo.create_file("broken/recipe.toml", "this is = = not toml");

        let graph = build(&repo, DepsType::Build, &[]);
        assert_eq!(graph.len(), 1);
        assert!(graph.contains("a"));
    }

    #[test]
    fn test_changed_recipe_flags_follow_deps_type() {
        let repo = RecipeRepo::new();
        repo.add_recipe("a", "a", "1.0", &["b >=2.0"], &["c"]);

        let graph = build(&repo, DepsType::Build, &["a"]);
        let a = graph.node("a").unwrap();
        assert!(a.flags().needs_build);
        assert!(!a.flags().needs_test);
        assert!(!a.flags().needs_install_check);
        assert_eq!(
            a.dependencies().get("b"),
            Some(&VersionConstraint::new(">=2.0"))
        );
        assert!(!graph.contains("c"));

        let graph = build(&repo, DepsType::Test, &["a"]);
        let a = graph.node("a").unwrap();
        assert!(!a.flags().needs_build);
        assert!(a.flags().needs_test);
        assert!(graph.contains("c"));
        assert!(!graph.contains("b"));
    }

    #[test]
    fn test_placeholder_then_recipe_merges() {
        let repo = RecipeRepo::new();
        // "a-recipe" sorts before "z-lib", so "lib" is first seen as a dependency
        repo.add_recipe("a-recipe", "app", "1.0", &["lib >=1.0"], &[]);
        repo.add_recipe("z-lib", "lib", "1.2", &[], &[]);

        let graph = build(&repo, DepsType::Build, &["z-lib"]);
        let lib = graph.node("lib").unwrap();
        assert!(lib.flags().needs_install_check);
        assert!(lib.flags().needs_build);
        assert_eq!(lib.version(), "1.2");
        assert!(lib.recipe_dir().unwrap().ends_with("z-lib"));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_skipped_recipe_registered_without_intent() {
        let repo = RecipeRepo::new();
        repo.create_file(
            "winonly/recipe.toml",
            r#"
[package]
name = "winonly"
version = "1.0"

[build]
skip = ["linux"]

[requirements]
build = ["msvc"]
"#,
        );

        let graph = build(&repo, DepsType::Build, &["winonly"]);
        let node = graph.node("winonly").unwrap();
        assert!(node.recipe().unwrap().metadata.skip);
        assert!(!node.flags().is_dirty());
        assert!(graph.contains("msvc"));
    }

    #[test]
    fn test_add_recipe_propagates_errors() {
        let repo = RecipeRepo::new();
        repo.create_dir("docs");
        repo.create_file("broken/recipe.toml", "[package]\nname = 3\n");

        let locator = FsRecipeLocator::default();
        let renderer = TomlRecipeRenderer::new();
        let builder =
            DependencyGraphBuilder::new(&locator, &renderer, RenderConfig::new("linux", 64));
        let mut graph = BuildGraph::new(DepsType::Build);

        let err = builder.add_recipe(&mut graph, repo.path(), "docs").unwrap_err();
        assert!(matches!(err, GraphError::Recipe(RecipeError::NotARecipe { .. })));

        let err = builder.add_recipe(&mut graph, repo.path(), "broken").unwrap_err();
        assert!(matches!(err, GraphError::Recipe(RecipeError::Render { .. })));
    }

    #[test]
    fn test_duplicate_package_aborts_build() {
        let repo = RecipeRepo::new();
        repo.add_recipe("one", "same", "1.0", &[], &[]);
        repo.add_recipe("two", "same", "1.1", &[], &[]);

        let locator = FsRecipeLocator::default();
        let renderer = TomlRecipeRenderer::new();
        let result = DependencyGraphBuilder::new(&locator, &renderer, RenderConfig::new("linux", 64))
            .build(repo.path());
        assert!(matches!(result, Err(GraphError::DuplicateRecipe { .. })));
    }
}
