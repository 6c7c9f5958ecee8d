//! Recipe discovery and rendering on disk
//!
//! Recipes are `recipe.toml` files. String values may reference render
//! variables with `${VAR}`; the values come from the [`RenderConfig`] passed
//! to each render call, never from the process environment.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::config::defaults::{RECIPE_FILE_NAME, RECIPE_SEARCH_DEPTH};
use crate::core::recipe::{RecipeHandle, RecipeLocator, RecipeMetadata, RecipeRenderer, RenderConfig};
use crate::core::version::{parse_requirement, VersionConstraint};
use crate::error::RecipeError;
use crate::infra::filesystem;

/// Finds `recipe.toml` files inside recipe directories
#[derive(Debug, Clone)]
pub struct FsRecipeLocator {
    file_name: String,
    max_depth: usize,
}

impl FsRecipeLocator {
    /// Locator for a custom recipe file name and search depth
    pub fn new(file_name: impl Into<String>, max_depth: usize) -> Self {
        Self {
            file_name: file_name.into(),
            max_depth,
        }
    }
}

impl Default for FsRecipeLocator {
    fn default() -> Self {
        Self::new(RECIPE_FILE_NAME, RECIPE_SEARCH_DEPTH)
    }
}

impl RecipeLocator for FsRecipeLocator {
    fn locate(&self, path: &Path) -> Result<RecipeHandle, RecipeError> {
        let not_a_recipe = || RecipeError::NotARecipe {
            path: path.to_path_buf(),
        };

        if !path.is_dir() {
            return Err(not_a_recipe());
        }

        let direct = path.join(&self.file_name);
        if direct.is_file() {
            return Ok(RecipeHandle {
                dir: path.to_path_buf(),
                file: direct,
            });
        }

        WalkDir::new(path)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .find(|entry| entry.file_type().is_file() && entry.file_name() == self.file_name.as_str())
            .map(|entry| RecipeHandle {
                dir: path.to_path_buf(),
                file: entry.into_path(),
            })
            .ok_or_else(not_a_recipe)
    }
}

/// On-disk recipe layout
#[derive(Debug, Deserialize)]
struct RecipeFile {
    package: PackageSection,
    #[serde(default)]
    build: BuildSection,
    #[serde(default)]
    requirements: RequirementsSection,
    #[serde(default)]
    test: TestSection,
}

#[derive(Debug, Deserialize)]
struct PackageSection {
    name: String,
    version: String,
}

#[derive(Debug, Default, Deserialize)]
struct BuildSection {
    #[serde(default)]
    number: u64,
    #[serde(default)]
    skip: SkipRule,
}

/// `skip = true` or a list of platform selectors
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SkipRule {
    Always(bool),
    Platforms(Vec<String>),
}

impl Default for SkipRule {
    fn default() -> Self {
        Self::Always(false)
    }
}

impl SkipRule {
    fn applies(&self, config: &RenderConfig) -> bool {
        match self {
            Self::Always(skip) => *skip,
            Self::Platforms(selectors) => {
                let subdir = config.subdir();
                selectors
                    .iter()
                    .any(|s| *s == config.platform || *s == subdir)
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RequirementsSection {
    #[serde(default)]
    build: Vec<String>,
    #[serde(default)]
    run: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TestSection {
    #[serde(default)]
    requires: Vec<String>,
}

/// Renders `recipe.toml` files
#[derive(Debug, Clone, Default)]
pub struct TomlRecipeRenderer;

impl TomlRecipeRenderer {
    /// Create a renderer
    pub fn new() -> Self {
        Self
    }
}

impl RecipeRenderer for TomlRecipeRenderer {
    fn render(
        &self,
        recipe: &RecipeHandle,
        config: &RenderConfig,
    ) -> Result<RecipeMetadata, RecipeError> {
        let render_error = |error: String| RecipeError::Render {
            path: recipe.dir.clone(),
            error,
        };

        let content = filesystem::read_file(&recipe.file)?;
        let mut value: toml::Value =
            toml::from_str(&content).map_err(|e| render_error(e.to_string()))?;

        let variables = render_variables(config);
        substitute_in_value(&mut value, &variables).map_err(render_error)?;

        let file = value
            .try_into::<RecipeFile>()
            .map_err(|e| render_error(e.to_string()))?;

        Ok(RecipeMetadata {
            name: file.package.name,
            version: file.package.version,
            build_number: file.build.number,
            skip: file.build.skip.applies(config),
            build_deps: requirement_map(&file.requirements.build),
            run_deps: requirement_map(&file.requirements.run),
            test_deps: requirement_map(&file.test.requires),
        })
    }
}

fn requirement_map(requirements: &[String]) -> BTreeMap<String, VersionConstraint> {
    requirements
        .iter()
        .filter_map(|r| parse_requirement(r))
        .collect()
}

/// Variables visible to a recipe: platform builtins, then matrix variables
fn render_variables(config: &RenderConfig) -> BTreeMap<String, String> {
    let mut variables = BTreeMap::from([
        ("PLATFORM".to_string(), config.platform.clone()),
        ("BITS".to_string(), config.bits.to_string()),
        ("SUBDIR".to_string(), config.subdir()),
    ]);
    variables.extend(config.variables.clone());
    variables
}

/// Replace `${VAR}` references; unknown variables become empty strings
pub fn substitute_variables(
    input: &str,
    variables: &BTreeMap<String, String>,
) -> Result<String, String> {
    let re =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| format!("Invalid regex: {e}"))?;

    let output = re.replace_all(input, |caps: &regex::Captures<'_>| {
        variables.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(output.into_owned())
}

/// Recursively substitute variables in a TOML value
fn substitute_in_value(
    value: &mut toml::Value,
    variables: &BTreeMap<String, String>,
) -> Result<(), String> {
    match value {
        toml::Value::String(s) => {
            *s = substitute_variables(s, variables)?;
        }
        toml::Value::Array(arr) => {
            for item in arr.iter_mut() {
                substitute_in_value(item, variables)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, v) in table.iter_mut() {
                substitute_in_value(v, variables)?;
            }
        }
        _ => {}
    }
    Ok(())
}
