//! CLI command for expanding the build matrix of one recipe
//!
//! Implements the `fanout matrix` command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::{load_settings, resolve_platforms, PlatformArgs};
use crate::cli::output::{self, OutputConfig};
use crate::config::defaults::DEFAULT_VERSIONS_FILE;
use crate::core::matrix::{expand_build_matrix, Platform, VersionMatrix};
use crate::infra::recipe::{FsRecipeLocator, TomlRecipeRenderer};

/// Execute the matrix command
pub async fn execute(
    root: &Path,
    recipe: &Path,
    label: Option<&str>,
    platforms: &PlatformArgs,
    versions: Option<PathBuf>,
) -> Result<()> {
    let settings = load_settings(root)?;
    let platform = select_platform(label, resolve_platforms(platforms, &settings)?)?;

    let versions = versions
        .or_else(|| settings.versions.clone())
        .unwrap_or_else(|| root.join(DEFAULT_VERSIONS_FILE));
    let matrix = if versions.is_file() {
        VersionMatrix::load(&versions)
            .with_context(|| format!("Failed to load build matrix {}", versions.display()))?
    } else {
        tracing::info!("No build matrix at {}, using a single job", versions.display());
        VersionMatrix::default()
    };

    let recipe_dir = root.join(recipe);
    let jobs = expand_build_matrix(
        &FsRecipeLocator::default(),
        &TomlRecipeRenderer::new(),
        &recipe_dir,
        &matrix,
        &platform,
    )
    .with_context(|| format!("Failed to expand build matrix for {}", recipe_dir.display()))?;

    if OutputConfig::global().json {
        return output::print_json(&jobs);
    }

    let mut text = format!("{} job(s) for {} on {}:\n", jobs.len(), recipe.display(), platform.label);
    for job in &jobs {
        let vars: Vec<String> = job
            .variables
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        text.push_str(&format!("  {}\n", vars.join(" ")));
    }
    output::print_text(&text);
    Ok(())
}

/// Pick the platform with `label`, or relabel a single ad-hoc platform
fn select_platform(label: Option<&str>, platforms: Vec<Platform>) -> Result<Platform> {
    let Some(label) = label else {
        return platforms
            .into_iter()
            .next()
            .context("No platform configured");
    };

    if let Some(platform) = platforms.iter().find(|p| p.label == label) {
        return Ok(platform.clone());
    }
    match platforms.as_slice() {
        [only] => Ok(Platform {
            label: label.to_string(),
            ..only.clone()
        }),
        _ => bail!("No platform labelled '{label}'"),
    }
}
