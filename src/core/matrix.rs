//! Build matrix expansion
//!
//! A `versions.toml` file lists values for matrix variables:
//!
//! ```toml
//! CONDA_PY = ["27", "36"]
//! CONDA_NPY = ["111", "114"]
//! ```
//!
//! Language variables only apply to recipes that actually depend on the
//! language at run time without pinning a version. Every combination of the
//! remaining variables becomes one CI job configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::core::recipe::{RecipeLocator, RecipeMetadata, RecipeRenderer, RenderConfig};
use crate::error::MatrixError;

/// Run requirements controlling a matrix variable
const LANGUAGE_VARIABLES: [(&str, &str); 5] = [
    ("python", "CONDA_PY"),
    ("numpy", "CONDA_NPY"),
    ("perl", "CONDA_PERL"),
    ("lua", "CONDA_LUA"),
    ("r-base", "CONDA_R"),
];

/// Variable carrying the platform label in each configuration
pub const TARGET_PLATFORM_VAR: &str = "TARGET_PLATFORM";

/// Variable carrying the recipe directory in each configuration
pub const BUILD_RECIPE_VAR: &str = "BUILD_RECIPE";

/// A target platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// CI label (e.g. "linux-64-docker")
    pub label: String,
    /// Platform name used when rendering recipes
    pub platform: String,
    /// Bitness
    pub bits: u8,
}

impl Platform {
    /// Render configuration for this platform
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig::new(&self.platform, self.bits)
    }
}

/// Load every `*.toml` platform file in `dir`, sorted by file name
pub fn load_platforms(dir: &Path) -> Result<Vec<Platform>, MatrixError> {
    let read_error = |e: std::io::Error| MatrixError::ReadError {
        path: dir.to_path_buf(),
        error: e.to_string(),
    };

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(read_error)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();

    files
        .iter()
        .map(|path| {
            let content = fs::read_to_string(path).map_err(|e| MatrixError::ReadError {
                path: path.clone(),
                error: e.to_string(),
            })?;
            toml::from_str(&content).map_err(|e| MatrixError::ParseError {
                path: path.clone(),
                error: e.to_string(),
            })
        })
        .collect()
}

/// One CI job: the variables it runs with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobConfiguration {
    /// Environment variables for the job
    pub variables: BTreeMap<String, String>,
}

/// Values for each matrix variable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMatrix {
    variables: BTreeMap<String, Vec<String>>,
}

impl VersionMatrix {
    /// Create a matrix from explicit values
    pub fn new(variables: BTreeMap<String, Vec<String>>) -> Self {
        Self { variables }
    }

    /// Load a `versions.toml` file
    ///
    /// Values may be a single scalar or a list of scalars; numbers are kept
    /// in their textual form.
    pub fn load(path: &Path) -> Result<Self, MatrixError> {
        let content = fs::read_to_string(path).map_err(|e| MatrixError::ReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let parse_error = |error: String| MatrixError::ParseError {
            path: path.to_path_buf(),
            error,
        };

        let table: BTreeMap<String, toml::Value> =
            toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?;

        let variables = table
            .into_iter()
            .map(|(key, value)| {
                let values = match value {
                    toml::Value::Array(items) => items
                        .into_iter()
                        .map(|item| scalar_to_string(&key, item))
                        .collect::<Result<Vec<_>, _>>(),
                    scalar => scalar_to_string(&key, scalar).map(|v| vec![v]),
                }
                .map_err(parse_error)?;
                Ok((key, values))
            })
            .collect::<Result<_, MatrixError>>()?;

        Ok(Self { variables })
    }

    /// Variable values
    pub fn variables(&self) -> &BTreeMap<String, Vec<String>> {
        &self.variables
    }

    /// First value of every variable
    pub fn first_values(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .filter_map(|(key, values)| values.first().map(|v| (key.clone(), v.clone())))
            .collect()
    }

    /// Drop language variables the recipe does not vary over
    #[must_use]
    pub fn filter_for_recipe(&self, metadata: &RecipeMetadata) -> Self {
        let mut variables = self.variables.clone();
        for (language, variable) in LANGUAGE_VARIABLES {
            if !varies_over(metadata, language) && variables.remove(variable).is_some() {
                tracing::debug!("'{}' does not vary over {variable}", metadata.name);
            }
        }
        Self { variables }
    }

    /// Every combination of variable values
    pub fn combinations(&self) -> Vec<BTreeMap<String, String>> {
        if self.variables.is_empty() {
            return vec![BTreeMap::new()];
        }

        self.variables
            .values()
            .map(|values| values.iter())
            .multi_cartesian_product()
            .map(|combination| {
                self.variables
                    .keys()
                    .cloned()
                    .zip(combination.into_iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// Whether a recipe's run requirements put `language` in the matrix
///
/// numpy only counts when pinned with `x.x`; other languages count when
/// required without a version.
fn varies_over(metadata: &RecipeMetadata, language: &str) -> bool {
    metadata
        .run_deps
        .get(language)
        .is_some_and(|constraint| {
            if language == "numpy" {
                constraint.is_matrix_pin()
            } else {
                constraint.is_any()
            }
        })
}

fn scalar_to_string(key: &str, value: toml::Value) -> Result<String, String> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        other => Err(format!(
            "Value for '{key}' must be a string or number, got {}",
            other.type_str()
        )),
    }
}

/// Expand one recipe into job configurations for a platform
///
/// The recipe is rendered with the first value of every matrix variable to
/// read its run requirements.
pub fn expand_build_matrix<L: RecipeLocator, R: RecipeRenderer>(
    locator: &L,
    renderer: &R,
    recipe_dir: &Path,
    matrix: &VersionMatrix,
    platform: &Platform,
) -> Result<Vec<JobConfiguration>, MatrixError> {
    let handle = locator.locate(recipe_dir)?;
    let config = platform.render_config().with_variables(matrix.first_values());
    let metadata = renderer.render(&handle, &config)?;

    let filtered = matrix.filter_for_recipe(&metadata);
    let recipe = recipe_dir.display().to_string();

    Ok(filtered
        .combinations()
        .into_iter()
        .map(|mut variables| {
            variables.insert(TARGET_PLATFORM_VAR.to_string(), platform.label.clone());
            variables.insert(BUILD_RECIPE_VAR.to_string(), recipe.clone());
            JobConfiguration { variables }
        })
        .collect())
}
