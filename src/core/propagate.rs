//! Dirty-set propagation
//!
//! Two passes over a [`BuildGraph`]:
//!
//! 1. Upstream closure. Every dependency of a flagged package must either be
//!    installable or be built from a local recipe in this run.
//! 2. Downstream fan-out. Packages depending on dirty packages are marked for
//!    build or test, limited by a layer count and a cap on newly marked
//!    packages.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::config::defaults::{DEFAULT_MAX_DOWNSTREAM, DEFAULT_STEPS};
use crate::core::graph::{BuildGraph, NodeFlags, PropagatedGraph};
use crate::core::resolver::Resolver;
use crate::error::{ConfigError, PropagationError};

/// Flag set on packages reached by downstream fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFlag {
    /// Rebuild dependents
    Build,
    /// Retest dependents
    #[default]
    Test,
}

impl TargetFlag {
    fn flags(self) -> NodeFlags {
        NodeFlags {
            needs_build: self == Self::Build,
            needs_test: self == Self::Test,
            needs_install_check: false,
        }
    }
}

impl fmt::Display for TargetFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Test => write!(f, "test"),
        }
    }
}

impl FromStr for TargetFlag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(Self::Build),
            "test" => Ok(Self::Test),
            other => Err(invalid("target", other, "expected 'build' or 'test'")),
        }
    }
}

/// Number of downstream layers to expand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CountOrKeyword")]
pub enum StepLimit {
    /// Expand exactly this many layers
    FixedSteps(usize),
    /// Expand until a layer changes nothing
    UntilStable,
}

impl Default for StepLimit {
    fn default() -> Self {
        Self::FixedSteps(DEFAULT_STEPS)
    }
}

impl fmt::Display for StepLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedSteps(n) => write!(f, "{n}"),
            Self::UntilStable => write!(f, "until-stable"),
        }
    }
}

impl FromStr for StepLimit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "until-stable" => Ok(Self::UntilStable),
            n => n.parse().map(Self::FixedSteps).map_err(|_| {
                invalid(
                    "steps",
                    s,
                    "expected a non-negative integer or 'until-stable'",
                )
            }),
        }
    }
}

impl TryFrom<CountOrKeyword> for StepLimit {
    type Error = ConfigError;

    fn try_from(value: CountOrKeyword) -> Result<Self, Self::Error> {
        match value {
            CountOrKeyword::Count(n) => Ok(Self::FixedSteps(n)),
            CountOrKeyword::Keyword(k) => k.parse(),
        }
    }
}

/// Cap on packages newly marked by downstream fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CountOrKeyword")]
pub enum DownstreamCap {
    /// Mark at most this many packages
    Bounded(usize),
    /// No cap
    Unbounded,
}

impl DownstreamCap {
    fn allows(self, marked: usize) -> bool {
        match self {
            Self::Bounded(cap) => marked < cap,
            Self::Unbounded => true,
        }
    }
}

impl Default for DownstreamCap {
    fn default() -> Self {
        Self::Bounded(DEFAULT_MAX_DOWNSTREAM)
    }
}

impl fmt::Display for DownstreamCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl FromStr for DownstreamCap {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "unbounded" => Ok(Self::Unbounded),
            n => n.parse().map(Self::Bounded).map_err(|_| {
                invalid(
                    "max_downstream",
                    s,
                    "expected a non-negative integer or 'unbounded'",
                )
            }),
        }
    }
}

impl TryFrom<CountOrKeyword> for DownstreamCap {
    type Error = ConfigError;

    fn try_from(value: CountOrKeyword) -> Result<Self, Self::Error> {
        match value {
            CountOrKeyword::Count(n) => Ok(Self::Bounded(n)),
            CountOrKeyword::Keyword(k) => k.parse(),
        }
    }
}

/// Config representation shared by [`StepLimit`] and [`DownstreamCap`]
#[derive(Deserialize)]
#[serde(untagged)]
enum CountOrKeyword {
    Count(usize),
    Keyword(String),
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Downstream fan-out settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationOptions {
    /// Flag given to dependents
    pub target: TargetFlag,
    /// Layers to expand
    pub steps: StepLimit,
    /// Cap on newly marked packages
    pub max_downstream: DownstreamCap,
}

/// Computes which packages need build or test
pub struct DirtySetPropagator<R> {
    resolver: R,
    options: PropagationOptions,
}

impl<R: Resolver> DirtySetPropagator<R> {
    /// Create a propagator with default options
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            options: PropagationOptions::default(),
        }
    }

    /// Override the downstream options
    #[must_use]
    pub fn with_options(mut self, options: PropagationOptions) -> Self {
        self.options = options;
        self
    }

    /// Run both passes and freeze the result
    pub fn propagate(&self, mut graph: BuildGraph) -> Result<PropagatedGraph, PropagationError> {
        self.upstream_closure(&mut graph)?;
        let baseline = graph.dirty().len();
        tracing::info!("{baseline} packages dirty after upstream closure");

        let marked = self.downstream_fan_out(&mut graph);
        tracing::info!(
            "Downstream fan-out marked {marked} packages ({} dirty in total)",
            graph.dirty().len()
        );

        Ok(PropagatedGraph::new(graph, baseline, marked))
    }

    /// Mark every dependency that must be built locally
    ///
    /// Fails when a dependency is neither installable nor buildable from a
    /// local recipe.
    pub fn upstream_closure(&self, graph: &mut BuildGraph) -> Result<(), PropagationError> {
        let mut queue: VecDeque<String> = graph
            .nodes()
            .filter(|n| n.flags().any())
            .map(|n| n.name().to_string())
            .collect();
        let mut processed = BTreeSet::new();

        while let Some(name) = queue.pop_front() {
            if !processed.insert(name.clone()) {
                continue;
            }
            let Some(node) = graph.node(&name) else {
                continue;
            };
            let dependencies = node.dependencies().clone();

            for (dep, constraint) in dependencies {
                let (already_building, recipe_dir) = match graph.node(&dep) {
                    Some(n) => (
                        n.flags().needs_build,
                        n.recipe()
                            .filter(|r| !r.metadata.skip)
                            .map(|r| r.recipe_dir.clone()),
                    ),
                    None => (false, None),
                };

                if already_building {
                    continue;
                }
                if self.resolver.is_installable(&dep, &constraint)? {
                    tracing::debug!("'{dep}' ({constraint}) is installable");
                    continue;
                }

                let buildable = match &recipe_dir {
                    Some(dir) => self.resolver.is_buildable_locally(dir, &constraint)?,
                    None => false,
                };
                if !buildable {
                    return Err(PropagationError::UnsatisfiableDependency {
                        package: dep,
                        constraint: constraint.to_string(),
                        required_by: name,
                    });
                }

                tracing::debug!("'{dep}' must be built for '{name}'");
                graph.mark(
                    &dep,
                    NodeFlags {
                        needs_build: true,
                        ..NodeFlags::default()
                    },
                );
                queue.push_back(dep);
            }
        }

        Ok(())
    }

    /// Mark dependents of dirty packages; returns the number newly made dirty
    pub fn downstream_fan_out(&self, graph: &mut BuildGraph) -> usize {
        let target = self.options.target.flags();
        let cap = self.options.max_downstream;
        let mut marked = 0;
        let mut layer = 0;

        loop {
            if let StepLimit::FixedSteps(steps) = self.options.steps {
                if layer >= steps {
                    break;
                }
            }
            layer += 1;

            let dirty: Vec<String> = graph.dirty().iter().map(|n| n.name().to_string()).collect();
            let mut changed = false;

            for name in &dirty {
                let dependents: Vec<String> =
                    graph.dependents(name).map(ToString::to_string).collect();

                for dependent in dependents {
                    let Some(flags) = graph.node(&dependent).map(|n| n.flags()) else {
                        continue;
                    };

                    if !flags.is_dirty() {
                        if !cap.allows(marked) {
                            continue;
                        }
                        marked += 1;
                        tracing::debug!(
                            "Layer {layer}: '{dependent}' depends on '{name}', marking for {}",
                            self.options.target
                        );
                    }

                    let mut merged = flags;
                    merged.merge(target);
                    if merged != flags {
                        graph.mark(&dependent, target);
                        changed = true;
                    }
                }
            }

            if !changed {
                break;
            }
        }

        marked
    }
}
