//! CLI command for displaying the dependency graph
//!
//! Implements the `fanout graph` command.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use super::{load_settings, resolve_platforms, PlatformArgs};
use crate::cli::output::{self, OutputConfig};
use crate::core::builder::DependencyGraphBuilder;
use crate::core::graph::PackageNode;
use crate::core::matrix::Platform;
use crate::core::recipe::DepsType;
use crate::core::tree;
use crate::infra::recipe::{FsRecipeLocator, TomlRecipeRenderer};

#[derive(Serialize)]
struct GraphOutput<'a> {
    platform: &'a Platform,
    deps_type: String,
    nodes: Vec<PackageNode>,
}

/// Execute the graph command
pub async fn execute(
    root: &Path,
    platforms: &PlatformArgs,
    deps_type: Option<DepsType>,
    dot: bool,
    package: Option<&str>,
) -> Result<()> {
    let settings = load_settings(root)?;
    let deps_type = deps_type.unwrap_or(settings.deps_type);
    let platforms = resolve_platforms(platforms, &settings)?;

    let locator = FsRecipeLocator::default();
    let renderer = TomlRecipeRenderer::new();
    let json = OutputConfig::global().json;
    let mut outputs = Vec::new();

    for platform in &platforms {
        let graph = DependencyGraphBuilder::new(&locator, &renderer, platform.render_config())
            .with_deps_type(deps_type)
            .build(root)
            .with_context(|| format!("Failed to build graph for {}", platform.label))?;

        if let Some(name) = package {
            if !graph.contains(name) {
                bail!("Package '{name}' is not in the build graph for {}", platform.label);
            }
        }

        if json {
            outputs.push(GraphOutput {
                platform,
                deps_type: deps_type.to_string(),
                nodes: graph.nodes().cloned().collect(),
            });
        } else if dot {
            println!("{}", tree::format_dot(&graph, package));
        } else {
            if platforms.len() > 1 {
                output::print_text(&format!("# {}", platform.label));
            }
            output::print_text(&tree::format_tree(&graph, package));
        }
    }

    if json {
        output::print_json(&outputs)?;
    }
    Ok(())
}
