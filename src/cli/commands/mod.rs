//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod changed;
pub mod graph;
pub mod matrix;
pub mod plan;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::config::defaults::{DEFAULT_BITS, DEFAULT_PLATFORM};
use crate::core::matrix::{load_platforms, Platform};
use crate::core::propagate::{DownstreamCap, StepLimit, TargetFlag};
use crate::core::recipe::DepsType;
use crate::core::settings::Settings;
use crate::infra::dirs::FanoutDirs;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List recipe directories changed in a revision range
    Changed {
        /// Recipe repository root
        root: PathBuf,

        #[command(flatten)]
        revisions: RevisionArgs,
    },

    /// Display the dependency graph
    Graph {
        /// Recipe repository root
        root: PathBuf,

        #[command(flatten)]
        platforms: PlatformArgs,

        /// Requirement set used for edges
        #[arg(long, value_name = "build|test")]
        deps_type: Option<DepsType>,

        /// Output in DOT graph format
        #[arg(long)]
        dot: bool,

        /// Show dependencies for specific package
        #[arg(long)]
        package: Option<String>,
    },

    /// Compute the ordered build plan
    Plan(plan::PlanArgs),

    /// Expand a recipe into build matrix job configurations
    Matrix {
        /// Recipe repository root
        root: PathBuf,

        /// Recipe directory, relative to the root
        recipe: PathBuf,

        /// Platform label (selects from the platforms directory if one is configured)
        #[arg(long)]
        label: Option<String>,

        #[command(flatten)]
        platforms: PlatformArgs,

        /// Build matrix file
        #[arg(long)]
        versions: Option<PathBuf>,
    },
}

/// Revision range selection
#[derive(Args, Debug, Clone, Default)]
pub struct RevisionArgs {
    /// Revision whose changes are inspected (start of range with --stop-rev)
    #[arg(long)]
    pub rev: Option<String>,

    /// End of the revision range (inclusive)
    #[arg(long, requires = "rev")]
    pub stop_rev: Option<String>,
}

/// Target platform selection
#[derive(Args, Debug, Clone, Default)]
pub struct PlatformArgs {
    /// Platform to render recipes for
    #[arg(long, conflicts_with = "platforms_dir")]
    pub platform: Option<String>,

    /// Bitness to render recipes for
    #[arg(long, conflicts_with = "platforms_dir")]
    pub bits: Option<u8>,

    /// Directory of platform files; plans every platform in it
    #[arg(long)]
    pub platforms_dir: Option<PathBuf>,
}

/// Propagation overrides
#[derive(Args, Debug, Clone, Default)]
pub struct PropagationArgs {
    /// Flag given to dependents of dirty packages
    #[arg(long, value_name = "build|test")]
    pub target: Option<TargetFlag>,

    /// Downstream layers to expand
    #[arg(long, value_name = "N|until-stable")]
    pub steps: Option<StepLimit>,

    /// Cap on packages newly marked downstream
    #[arg(long, value_name = "N|unbounded")]
    pub max_downstream: Option<DownstreamCap>,
}

impl Commands {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        match self {
            Self::Changed { root, revisions } => changed::execute(&root, &revisions).await,
            Self::Graph {
                root,
                platforms,
                deps_type,
                dot,
                package,
            } => graph::execute(&root, &platforms, deps_type, dot, package.as_deref()).await,
            Self::Plan(args) => plan::execute(args).await,
            Self::Matrix {
                root,
                recipe,
                label,
                platforms,
                versions,
            } => matrix::execute(&root, &recipe, label.as_deref(), &platforms, versions).await,
        }
    }
}

/// Load layered settings for a recipe root
pub(crate) fn load_settings(root: &Path) -> Result<Settings> {
    Settings::load(&FanoutDirs::new(), root)
        .with_context(|| format!("Failed to load configuration for {}", root.display()))
}

/// Platforms selected by flags, falling back to configuration
pub(crate) fn resolve_platforms(args: &PlatformArgs, settings: &Settings) -> Result<Vec<Platform>> {
    let explicit = args.platform.is_some() || args.bits.is_some();
    let dir = args
        .platforms_dir
        .clone()
        .or_else(|| settings.platforms_dir.clone().filter(|_| !explicit));

    if let Some(dir) = dir {
        let platforms = load_platforms(&dir)
            .with_context(|| format!("Failed to load platforms from {}", dir.display()))?;
        if platforms.is_empty() {
            bail!("No platform files found in {}", dir.display());
        }
        return Ok(platforms);
    }

    let platform = args
        .platform
        .clone()
        .unwrap_or_else(|| DEFAULT_PLATFORM.to_string());
    let bits = args.bits.unwrap_or(DEFAULT_BITS);
    Ok(vec![Platform {
        label: format!("{platform}-{bits}"),
        platform,
        bits,
    }])
}
