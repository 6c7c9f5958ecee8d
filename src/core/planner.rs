//! Build order planning
//!
//! Restricts the graph to the packages being built and sorts them so every
//! dependency comes before the packages that need it.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::core::graph::{BuildGraph, PackageNode};
use crate::error::PlanError;

/// Which packages to plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PlanSelection {
    /// Every dirty package
    #[default]
    Dirty,
    /// Exactly these packages, dirty or not
    Packages(Vec<String>),
}

/// What the executor should do with a planned package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanAction {
    /// Build and test from the local recipe
    Build,
    /// Test the existing package
    Test,
    /// Only confirm the package installs
    InstallCheck,
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Test => write!(f, "test"),
            Self::InstallCheck => write!(f, "install-check"),
        }
    }
}

/// One step of a build plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPackage {
    /// Package name
    pub name: String,
    /// Version (or version constraint for packages without a recipe)
    pub version: String,
    /// Build number
    pub build_number: u64,
    /// Recipe directory, if built locally
    pub recipe_dir: Option<PathBuf>,
    /// Action to take
    pub action: PlanAction,
}

impl PlannedPackage {
    fn from_node(node: &PackageNode) -> Self {
        let flags = node.flags();
        let action = if flags.needs_build {
            PlanAction::Build
        } else if flags.needs_test {
            PlanAction::Test
        } else if node.recipe().is_some() {
            PlanAction::Build
        } else {
            PlanAction::InstallCheck
        };

        Self {
            name: node.name().to_string(),
            version: node.version().to_string(),
            build_number: node.build_number(),
            recipe_dir: node.recipe_dir().map(std::path::Path::to_path_buf),
            action,
        }
    }
}

/// Dependency-first sequence of packages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    /// Packages in build order
    pub packages: Vec<PlannedPackage>,
}

impl BuildPlan {
    /// Package names in build order
    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }

    /// Number of planned packages
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether nothing needs to happen
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Computes build order over an induced subgraph
#[derive(Debug)]
pub struct BuildOrderPlanner<'g> {
    graph: &'g BuildGraph,
}

impl<'g> BuildOrderPlanner<'g> {
    /// Create a planner over `graph`
    pub fn new(graph: &'g BuildGraph) -> Self {
        Self { graph }
    }

    /// Plan the selected packages
    pub fn plan(&self, selection: &PlanSelection) -> Result<BuildPlan, PlanError> {
        let order = self.topological_order(selection)?;
        let packages = order
            .iter()
            .filter_map(|name| self.graph.node(name))
            .map(PlannedPackage::from_node)
            .collect();
        Ok(BuildPlan { packages })
    }

    /// Names of the selected packages with dependencies first
    pub fn topological_order(&self, selection: &PlanSelection) -> Result<Vec<String>, PlanError> {
        let subgraph = self.induced_subgraph(selection)?;

        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();
        let mut result = Vec::with_capacity(subgraph.len());
        let mut path = Vec::new();

        for node in subgraph.keys() {
            if !visited.contains(node.as_str()) {
                visit(
                    &subgraph,
                    node,
                    &mut visited,
                    &mut temp_visited,
                    &mut result,
                    &mut path,
                )?;
            }
        }

        Ok(result)
    }

    /// Selected nodes and the edges between them
    fn induced_subgraph(
        &self,
        selection: &PlanSelection,
    ) -> Result<BTreeMap<String, BTreeSet<String>>, PlanError> {
        let included: BTreeSet<String> = match selection {
            PlanSelection::Dirty => self
                .graph
                .dirty()
                .into_iter()
                .map(|n| n.name().to_string())
                .collect(),
            PlanSelection::Packages(names) => {
                if let Some(unknown) = names.iter().find(|n| !self.graph.contains(n)) {
                    return Err(PlanError::UnknownPackage {
                        name: unknown.clone(),
                    });
                }
                names.iter().cloned().collect()
            }
        };

        Ok(included
            .iter()
            .filter_map(|name| self.graph.node(name))
            .map(|node| {
                let deps = node
                    .dependencies()
                    .keys()
                    .filter(|dep| included.contains(*dep))
                    .cloned()
                    .collect();
                (node.name().to_string(), deps)
            })
            .collect())
    }
}

fn visit(
    subgraph: &BTreeMap<String, BTreeSet<String>>,
    node: &str,
    visited: &mut HashSet<String>,
    temp_visited: &mut HashSet<String>,
    result: &mut Vec<String>,
    path: &mut Vec<String>,
) -> Result<(), PlanError> {
    if temp_visited.contains(node) {
        return Err(cycle_error(path, node));
    }

    if visited.contains(node) {
        return Ok(());
    }

    temp_visited.insert(node.to_string());
    path.push(node.to_string());

    if let Some(deps) = subgraph.get(node) {
        for dep in deps {
            visit(subgraph, dep, visited, temp_visited, result, path)?;
        }
    }

    path.pop();
    temp_visited.remove(node);
    visited.insert(node.to_string());
    result.push(node.to_string());

    Ok(())
}

/// Cycle closed by revisiting `node` on the current DFS path
fn cycle_error(path: &[String], node: &str) -> PlanError {
    let start = path.iter().position(|n| n == node).unwrap_or(0);
    let mut cycle: Vec<String> = path[start..].to_vec();
    cycle.push(node.to_string());

    let edges = cycle
        .windows(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();

    PlanError::GraphCycle { cycle, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::NodeFlags;
    use crate::core::recipe::{DepsType, RecipeMetadata};
    use crate::core::version::VersionConstraint;
    use crate::test_utils::generators::dag;
    use proptest::prelude::*;

    fn recipe(graph: &mut BuildGraph, name: &str, deps: &[&str], flags: NodeFlags) {
        let metadata = RecipeMetadata {
            name: name.to_string(),
            version: "1.0".to_string(),
            ..RecipeMetadata::default()
        };
        graph.insert_recipe(name.into(), metadata, flags).unwrap();
        for dep in deps {
            graph.add_dependency(name, dep, VersionConstraint::any());
        }
    }

    fn build_flag() -> NodeFlags {
        NodeFlags {
            needs_build: true,
            ..NodeFlags::default()
        }
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|x| x == name).unwrap()
    }

    #[test]
    fn test_simple_dependency_order() {
        let mut graph = BuildGraph::new(DepsType::Build);
        recipe(&mut graph, "app", &["lib"], build_flag());
        recipe(&mut graph, "lib", &[], build_flag());

        let order = BuildOrderPlanner::new(&graph)
            .topological_order(&PlanSelection::Dirty)
            .unwrap();
        assert!(position(&order, "lib") < position(&order, "app"));
    }

    #[test]
    fn test_dirty_selection_excludes_clean_nodes() {
        let mut graph = BuildGraph::new(DepsType::Build);
        recipe(&mut graph, "app", &["lib"], build_flag());
        recipe(&mut graph, "lib", &["base"], NodeFlags::default());
        recipe(&mut graph, "base", &[], build_flag());

        let plan = BuildOrderPlanner::new(&graph)
            .plan(&PlanSelection::Dirty)
            .unwrap();
        // "lib" is excluded, so the induced subgraph has no edge between the two
        assert_eq!(plan.names(), vec!["app", "base"]);
    }

    #[test]
    fn test_explicit_selection_forces_packages() {
        let mut graph = BuildGraph::new(DepsType::Build);
        recipe(&mut graph, "app", &["lib", "zlib"], NodeFlags::default());
        recipe(&mut graph, "lib", &[], NodeFlags::default());

        let plan = BuildOrderPlanner::new(&graph)
            .plan(&PlanSelection::Packages(vec![
                "app".to_string(),
                "lib".to_string(),
                "zlib".to_string(),
            ]))
            .unwrap();

        assert_eq!(plan.len(), 3);
        let app = plan.names().iter().position(|n| *n == "app").unwrap();
        let lib = plan.names().iter().position(|n| *n == "lib").unwrap();
        let zlib = plan.names().iter().position(|n| *n == "zlib").unwrap();
        assert!(lib < app && zlib < app);

        let zlib = plan.packages.iter().find(|p| p.name == "zlib").unwrap();
        assert_eq!(zlib.action, PlanAction::InstallCheck);
        assert!(zlib.recipe_dir.is_none());
        let lib = plan.packages.iter().find(|p| p.name == "lib").unwrap();
        assert_eq!(lib.action, PlanAction::Build);
    }

    #[test]
    fn test_unknown_package() {
        let graph = BuildGraph::new(DepsType::Build);
        let err = BuildOrderPlanner::new(&graph)
            .plan(&PlanSelection::Packages(vec!["ghost".to_string()]))
            .unwrap_err();
        assert!(matches!(err, PlanError::UnknownPackage { ref name } if name == "ghost"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = BuildGraph::new(DepsType::Test);
        recipe(&mut graph, "a", &["b"], build_flag());
        recipe(&mut graph, "b", &["a"], build_flag());

        let err = BuildOrderPlanner::new(&graph)
            .plan(&PlanSelection::Dirty)
            .unwrap_err();
        match err {
            PlanError::GraphCycle { cycle, edges } => {
                assert_eq!(cycle, vec!["a", "b", "a"]);
                assert_eq!(
                    edges,
                    vec![
                        ("a".to_string(), "b".to_string()),
                        ("b".to_string(), "a".to_string())
                    ]
                );
            }
            e => panic!("Expected GraphCycle, got: {e:?}"),
        }
    }

    #[test]
    fn test_cycle_outside_selection_ignored() {
        let mut graph = BuildGraph::new(DepsType::Test);
        recipe(&mut graph, "a", &["b"], build_flag());
        recipe(&mut graph, "b", &["a"], NodeFlags::default());

        let order = BuildOrderPlanner::new(&graph)
            .topological_order(&PlanSelection::Dirty)
            .unwrap();
        assert_eq!(order, vec!["a"]);
    }

    #[test]
    fn test_empty_selection() {
        let graph = BuildGraph::new(DepsType::Build);
        let plan = BuildOrderPlanner::new(&graph)
            .plan(&PlanSelection::Dirty)
            .unwrap();
        assert!(plan.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every edge's dependency precedes its dependent
        #[test]
        fn prop_dependencies_precede_dependents(edges in dag(12)) {
            let mut graph = BuildGraph::new(DepsType::Build);
            for (name, deps) in &edges {
                let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
                recipe(&mut graph, name, &deps, build_flag());
            }

            let order = BuildOrderPlanner::new(&graph)
                .topological_order(&PlanSelection::Dirty)
                .unwrap();
            prop_assert_eq!(order.len(), graph.len());

            for (name, deps) in &edges {
                for dep in deps {
                    prop_assert!(position(&order, dep) < position(&order, name));
                }
            }
        }
    }
}
