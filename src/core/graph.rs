//! Package dependency graph
//!
//! Nodes are keyed by package name. Edges point from a package to the
//! packages it depends on and carry the version constraint the dependent
//! declared. A reverse index of dependents is kept in sync so downstream
//! traversal does not need to scan the whole graph.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::recipe::{DepsType, RecipeMetadata};
use crate::core::version::VersionConstraint;
use crate::error::GraphError;

/// Build/test/install intent of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeFlags {
    /// Package must be built (and tested)
    pub needs_build: bool,
    /// Package must be tested
    pub needs_test: bool,
    /// Package must be installable
    pub needs_install_check: bool,
}

impl NodeFlags {
    /// Combine with logical OR; flags are never cleared
    pub fn merge(&mut self, other: Self) {
        self.needs_build |= other.needs_build;
        self.needs_test |= other.needs_test;
        self.needs_install_check |= other.needs_install_check;
    }

    /// Dirty means scheduled for build or test
    pub fn is_dirty(self) -> bool {
        self.needs_build || self.needs_test
    }

    /// Any flag set
    pub fn any(self) -> bool {
        self.is_dirty() || self.needs_install_check
    }
}

/// A rendered recipe attached to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeInfo {
    /// Rendered metadata
    pub metadata: RecipeMetadata,
    /// Directory of the recipe
    pub recipe_dir: PathBuf,
}

/// What is known about a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeKind {
    /// Package has a local recipe
    FullRecipe(RecipeInfo),
    /// Package is only known as somebody's dependency
    DependencyOnly { version_hint: VersionConstraint },
}

/// A package in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageNode {
    name: String,
    kind: NodeKind,
    flags: NodeFlags,
    dependencies: BTreeMap<String, VersionConstraint>,
}

impl PackageNode {
    fn placeholder(name: &str, version_hint: VersionConstraint) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::DependencyOnly { version_hint },
            flags: NodeFlags {
                needs_install_check: true,
                ..NodeFlags::default()
            },
            dependencies: BTreeMap::new(),
        }
    }

    /// Package name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node kind
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Current flags
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Rendered recipe, if the package is locally buildable
    pub fn recipe(&self) -> Option<&RecipeInfo> {
        match &self.kind {
            NodeKind::FullRecipe(info) => Some(info),
            NodeKind::DependencyOnly { .. } => None,
        }
    }

    /// Recipe directory, if the package is locally buildable
    pub fn recipe_dir(&self) -> Option<&Path> {
        self.recipe().map(|info| info.recipe_dir.as_path())
    }

    /// Version, or the constraint it was first required with for placeholders
    pub fn version(&self) -> &str {
        match &self.kind {
            NodeKind::FullRecipe(info) => &info.metadata.version,
            NodeKind::DependencyOnly { version_hint } => version_hint.as_str(),
        }
    }

    /// Build number (0 for placeholders)
    pub fn build_number(&self) -> u64 {
        self.recipe().map_or(0, |info| info.metadata.build_number)
    }

    /// Declared build requirements
    pub fn build_dependencies(&self) -> BTreeMap<String, VersionConstraint> {
        self.recipe()
            .map(|info| info.metadata.build_deps.clone())
            .unwrap_or_default()
    }

    /// Declared run and test requirements
    pub fn run_test_dependencies(&self) -> BTreeMap<String, VersionConstraint> {
        self.recipe()
            .map(|info| info.metadata.run_test_deps())
            .unwrap_or_default()
    }

    /// Outgoing edges in the graph: dependency name to constraint
    pub fn dependencies(&self) -> &BTreeMap<String, VersionConstraint> {
        &self.dependencies
    }

    fn is_active_recipe(&self) -> bool {
        self.recipe().is_some_and(|info| !info.metadata.skip)
    }
}

/// Dependency graph of packages
#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
    deps_type: DepsType,
    nodes: BTreeMap<String, PackageNode>,
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl BuildGraph {
    /// Create an empty graph whose edges follow `deps_type`
    pub fn new(deps_type: DepsType) -> Self {
        Self {
            deps_type,
            ..Self::default()
        }
    }

    /// Requirement set the edges were built from
    pub fn deps_type(&self) -> DepsType {
        self.deps_type
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&PackageNode> {
        self.nodes.get(name)
    }

    /// Whether a node exists
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All nodes in name order
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.nodes.values()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.dependencies.len()).sum()
    }

    /// Packages that depend on `name`
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &str> {
        self.dependents
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Dirty nodes (needs build or test), in name order
    pub fn dirty(&self) -> Vec<&PackageNode> {
        self.nodes.values().filter(|n| n.flags.is_dirty()).collect()
    }

    /// Register a rendered recipe
    ///
    /// A placeholder of the same name is upgraded in place and keeps its
    /// flags. An active recipe replaces a skipped one; a second active
    /// recipe for the same package is an error.
    pub fn insert_recipe(
        &mut self,
        recipe_dir: PathBuf,
        metadata: RecipeMetadata,
        flags: NodeFlags,
    ) -> Result<(), GraphError> {
        let name = metadata.name.clone();
        let incoming_active = !metadata.skip;
        let info = RecipeInfo {
            metadata,
            recipe_dir,
        };

        let Some(node) = self.nodes.get_mut(&name) else {
            self.nodes.insert(
                name.clone(),
                PackageNode {
                    name,
                    kind: NodeKind::FullRecipe(info),
                    flags,
                    dependencies: BTreeMap::new(),
                },
            );
            return Ok(());
        };

        let existing_active = node.is_active_recipe();
        match node.recipe().map(|existing| existing.recipe_dir.clone()) {
            None => {
                tracing::debug!("Merging recipe for '{name}' into dependency placeholder");
                node.kind = NodeKind::FullRecipe(info);
            }
            Some(first) if existing_active && incoming_active => {
                return Err(GraphError::DuplicateRecipe {
                    name,
                    first,
                    second: info.recipe_dir,
                });
            }
            Some(first) if incoming_active => {
                tracing::debug!(
                    "Recipe '{}' replaces skipped recipe '{}' for '{name}'",
                    info.recipe_dir.display(),
                    first.display()
                );
                node.kind = NodeKind::FullRecipe(info);
            }
            Some(_) => {
                tracing::debug!(
                    "Ignoring skipped recipe '{}' for '{name}'",
                    info.recipe_dir.display()
                );
            }
        }
        node.flags.merge(flags);
        Ok(())
    }

    /// Record that `from` depends on `dependency`
    ///
    /// Creates an install-checked placeholder for unknown dependencies and
    /// marks known ones as needing an install check. A missing `from` node
    /// is created as a placeholder without the install check.
    pub fn add_dependency(&mut self, from: &str, dependency: &str, constraint: VersionConstraint) {
        if !self.nodes.contains_key(from) {
            let mut node = PackageNode::placeholder(from, VersionConstraint::any());
            node.flags.needs_install_check = false;
            self.nodes.insert(from.to_string(), node);
        }

        match self.nodes.get_mut(dependency) {
            Some(node) => node.flags.needs_install_check = true,
            None => {
                self.nodes.insert(
                    dependency.to_string(),
                    PackageNode::placeholder(dependency, constraint.clone()),
                );
            }
        }

        if let Some(node) = self.nodes.get_mut(from) {
            node.dependencies.insert(dependency.to_string(), constraint);
        }
        self.dependents
            .entry(dependency.to_string())
            .or_default()
            .insert(from.to_string());
    }

    /// Merge flags into an existing node; returns false for unknown names
    pub fn mark(&mut self, name: &str, flags: NodeFlags) -> bool {
        match self.nodes.get_mut(name) {
            Some(node) => {
                node.flags.merge(flags);
                true
            }
            None => false,
        }
    }
}

/// Graph after propagation
///
/// Only shared access to the underlying [`BuildGraph`] is exposed, so the
/// flags computed during propagation cannot change while a plan is derived.
#[derive(Debug, Clone)]
pub struct PropagatedGraph {
    graph: BuildGraph,
    baseline_dirty: usize,
    downstream_marked: usize,
}

impl PropagatedGraph {
    pub(crate) fn new(graph: BuildGraph, baseline_dirty: usize, downstream_marked: usize) -> Self {
        Self {
            graph,
            baseline_dirty,
            downstream_marked,
        }
    }

    /// Dirty-set size after the upstream pass
    pub fn baseline_dirty(&self) -> usize {
        self.baseline_dirty
    }

    /// Nodes newly made dirty by the downstream pass
    pub fn downstream_marked(&self) -> usize {
        self.downstream_marked
    }

    /// Give the graph back for another round of propagation
    pub fn into_graph(self) -> BuildGraph {
        self.graph
    }
}

impl Deref for PropagatedGraph {
    type Target = BuildGraph;

    fn deref(&self) -> &Self::Target {
        &self.graph
    }
}
