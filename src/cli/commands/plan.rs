//! CLI command for computing build plans
//!
//! Implements the `fanout plan` command. Each platform is planned on its own
//! blocking task with a private graph.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use futures::future::try_join_all;

use super::changed::{detect_changes, revision_range};
use super::{load_settings, resolve_platforms, PlatformArgs, PropagationArgs, RevisionArgs};
use crate::cli::output::{self, OutputConfig};
use crate::config::defaults::DEFAULT_VERSIONS_FILE;
use crate::core::matrix::VersionMatrix;
use crate::core::pipeline::{plan_platform, PlanRequest, PlatformPlan};
use crate::core::planner::PlanSelection;
use crate::core::recipe::DepsType;
use crate::infra::index::{ChannelIndex, IndexResolver};
use crate::infra::recipe::{FsRecipeLocator, TomlRecipeRenderer};

/// Arguments of `fanout plan`
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Recipe repository root
    pub root: PathBuf,

    #[command(flatten)]
    pub platforms: PlatformArgs,

    /// Changed recipe directory (repeatable); skips git change detection
    #[arg(long = "changed", value_name = "DIR", conflicts_with = "rev")]
    pub changed: Vec<String>,

    #[command(flatten)]
    pub revisions: RevisionArgs,

    /// Requirement set used for edges
    #[arg(long, value_name = "build|test")]
    pub deps_type: Option<DepsType>,

    #[command(flatten)]
    pub propagation: PropagationArgs,

    /// Plan exactly these packages instead of the dirty set (repeatable)
    #[arg(long = "package", value_name = "NAME")]
    pub packages: Vec<String>,

    /// Channel index file (repeatable)
    #[arg(long, value_name = "FILE")]
    pub repodata: Vec<PathBuf>,

    /// Build matrix file
    #[arg(long, value_name = "FILE")]
    pub versions: Option<PathBuf>,
}

/// Execute the plan command
pub async fn execute(args: PlanArgs) -> Result<()> {
    let root = args.root.clone();
    let mut settings = load_settings(&root)?;

    if let Some(deps_type) = args.deps_type {
        settings.deps_type = deps_type;
    }
    if let Some(target) = args.propagation.target {
        settings.propagation.target = target;
    }
    if let Some(steps) = args.propagation.steps {
        settings.propagation.steps = steps;
    }
    if let Some(cap) = args.propagation.max_downstream {
        settings.propagation.max_downstream = cap;
    }
    if !args.repodata.is_empty() {
        settings.repodata.clone_from(&args.repodata);
    }
    if args.versions.is_some() {
        settings.versions.clone_from(&args.versions);
    }
    tracing::debug!("Effective settings: {settings:?}");

    let changed = changed_recipes(&root, &args)?;
    tracing::info!("{} changed recipe(s)", changed.len());

    let index = Arc::new(
        ChannelIndex::load(&settings.repodata).context("Failed to load channel index")?,
    );
    let matrix = load_matrix(&root, settings.versions.as_deref())?;
    let platforms = resolve_platforms(&args.platforms, &settings)?;

    let selection = if args.packages.is_empty() {
        PlanSelection::Dirty
    } else {
        PlanSelection::Packages(args.packages.clone())
    };
    let request = Arc::new(PlanRequest {
        recipe_root: root,
        changed,
        deps_type: settings.deps_type,
        propagation: settings.propagation,
        selection,
        matrix,
    });

    let tasks = platforms.into_iter().map(|platform| {
        let index = Arc::clone(&index);
        let request = Arc::clone(&request);
        tokio::task::spawn_blocking(move || {
            let locator = FsRecipeLocator::default();
            let renderer = TomlRecipeRenderer::new();
            let resolver =
                IndexResolver::new(&index, &locator, &renderer, platform.render_config());
            plan_platform(&locator, &renderer, resolver, &request, &platform)
                .with_context(|| format!("Failed to plan {}", platform.label))
        })
    });

    let plans = try_join_all(tasks)
        .await
        .context("Planning task failed")?
        .into_iter()
        .collect::<Result<Vec<PlatformPlan>>>()?;

    if OutputConfig::global().json {
        output::print_json(&plans)
    } else {
        output::print_text(&output::format_plans(&plans));
        Ok(())
    }
}

/// Changed recipes from `--changed`, or from git
///
/// Explicit `--package` selections without `--rev` need no repository and
/// start from an empty change set.
fn changed_recipes(root: &Path, args: &PlanArgs) -> Result<BTreeSet<String>> {
    if args.changed.is_empty() {
        if !args.packages.is_empty() && args.revisions.rev.is_none() {
            tracing::debug!("Explicit packages requested, skipping change detection");
            return Ok(BTreeSet::new());
        }
        return detect_changes(root, &revision_range(&args.revisions));
    }

    let mut changed = BTreeSet::new();
    for dir in &args.changed {
        let name = dir.trim_end_matches('/');
        if root.join(name).is_dir() {
            changed.insert(name.to_string());
        } else {
            tracing::warn!("Ignoring --changed '{dir}': not a directory under {}", root.display());
        }
    }
    Ok(changed)
}

/// Build matrix from the configured file, or `versions.toml` at the root
fn load_matrix(root: &Path, versions: Option<&Path>) -> Result<Option<VersionMatrix>> {
    let path = match versions {
        Some(path) => path.to_path_buf(),
        None => {
            let default = root.join(DEFAULT_VERSIONS_FILE);
            if !default.is_file() {
                return Ok(None);
            }
            default
        }
    };

    VersionMatrix::load(&path)
        .map(Some)
        .with_context(|| format!("Failed to load build matrix {}", path.display()))
}
