//! Planning pipeline for one platform
//!
//! Graph construction, propagation, ordering and matrix expansion, run in
//! sequence on a graph owned by this call.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::core::builder::DependencyGraphBuilder;
use crate::core::matrix::{expand_build_matrix, JobConfiguration, Platform, VersionMatrix};
use crate::core::planner::{BuildOrderPlanner, BuildPlan, PlanAction, PlanSelection};
use crate::core::propagate::{DirtySetPropagator, PropagationOptions};
use crate::core::recipe::{DepsType, RecipeLocator, RecipeRenderer};
use crate::core::resolver::Resolver;
use crate::error::FanoutError;

/// Platform-independent planning inputs
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    /// Recipe root directory
    pub recipe_root: PathBuf,
    /// Changed recipe directory names
    pub changed: BTreeSet<String>,
    /// Requirement set used for edges
    pub deps_type: DepsType,
    /// Downstream fan-out options
    pub propagation: PropagationOptions,
    /// Packages to plan
    pub selection: PlanSelection,
    /// Build matrix; no job configurations are produced without one
    pub matrix: Option<VersionMatrix>,
}

/// Plan for one platform
#[derive(Debug, Clone, Serialize)]
pub struct PlatformPlan {
    /// Target platform
    pub platform: Platform,
    /// Packages dirty after the upstream pass
    pub baseline_dirty: usize,
    /// Packages added by downstream fan-out
    pub downstream_marked: usize,
    /// Ordered packages
    pub plan: BuildPlan,
    /// Job configurations per planned recipe
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub jobs: BTreeMap<String, Vec<JobConfiguration>>,
}

/// Run the whole pipeline for `platform`
pub fn plan_platform<L, R, V>(
    locator: &L,
    renderer: &R,
    resolver: V,
    request: &PlanRequest,
    platform: &Platform,
) -> Result<PlatformPlan, FanoutError>
where
    L: RecipeLocator,
    R: RecipeRenderer,
    V: Resolver,
{
    tracing::info!("Planning {} ({})", platform.label, platform.render_config().subdir());

    let graph = DependencyGraphBuilder::new(locator, renderer, platform.render_config())
        .with_deps_type(request.deps_type)
        .with_changed(request.changed.iter().cloned())
        .build(&request.recipe_root)?;

    let propagated = DirtySetPropagator::new(resolver)
        .with_options(request.propagation)
        .propagate(graph)?;

    let plan = BuildOrderPlanner::new(&propagated).plan(&request.selection)?;

    let mut jobs = BTreeMap::new();
    if let Some(matrix) = &request.matrix {
        for package in &plan.packages {
            let Some(recipe_dir) = &package.recipe_dir else {
                continue;
            };
            if package.action == PlanAction::InstallCheck {
                continue;
            }
            let configurations =
                expand_build_matrix(locator, renderer, recipe_dir, matrix, platform)?;
            jobs.insert(package.name.clone(), configurations);
        }
    }

    Ok(PlatformPlan {
        platform: platform.clone(),
        baseline_dirty: propagated.baseline_dirty(),
        downstream_marked: propagated.downstream_marked(),
        plan,
        jobs,
    })
}
