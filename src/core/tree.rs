//! Dependency graph visualization
//!
//! Renders a [`BuildGraph`] as an indented tree or as a DOT graph.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::core::graph::{BuildGraph, PackageNode};

/// Flag markers shown next to a package
fn markers(node: &PackageNode) -> String {
    let flags = node.flags();
    let mut markers = Vec::new();
    if flags.needs_build {
        markers.push("[build]");
    }
    if flags.needs_test {
        markers.push("[test]");
    }
    if flags.needs_install_check {
        markers.push("[install-check]");
    }
    if node.recipe().is_none() {
        markers.push("(no recipe)");
    }
    markers.join(" ")
}

/// Packages nothing depends on, or every package if there are none
fn roots(graph: &BuildGraph) -> Vec<&str> {
    let roots: Vec<&str> = graph
        .nodes()
        .map(PackageNode::name)
        .filter(|name| graph.dependents(name).next().is_none())
        .collect();
    if roots.is_empty() {
        graph.nodes().map(PackageNode::name).collect()
    } else {
        roots
    }
}

/// Format the graph as a tree, optionally rooted at one package
pub fn format_tree(graph: &BuildGraph, package: Option<&str>) -> String {
    if graph.is_empty() {
        return "No packages in graph".to_string();
    }

    let roots = match package {
        Some(name) if !graph.contains(name) => {
            return format!("Package '{name}' not found in graph");
        }
        Some(name) => vec![name],
        None => roots(graph),
    };

    let mut output = format!("Dependency Tree ({} edges):\n", graph.deps_type());
    for (i, root) in roots.iter().enumerate() {
        let is_last = i == roots.len() - 1;
        format_node(graph, &mut output, root, "", "", is_last, &mut BTreeSet::new());
    }
    output
}

fn format_node(
    graph: &BuildGraph,
    output: &mut String,
    name: &str,
    constraint: &str,
    prefix: &str,
    is_last: bool,
    path: &mut BTreeSet<String>,
) {
    let connector = if is_last { "└── " } else { "├── " };
    let Some(node) = graph.node(name) else {
        return;
    };

    let mut line = format!("{prefix}{connector}{name}");
    if !constraint.is_empty() {
        let _ = write!(line, " {constraint}");
    }
    let markers = markers(node);
    if !markers.is_empty() {
        let _ = write!(line, " {markers}");
    }

    if !path.insert(name.to_string()) {
        let _ = writeln!(output, "{line} (cycle)");
        return;
    }
    let _ = writeln!(output, "{line}");

    let child_prefix = if is_last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}│   ")
    };
    let deps = node.dependencies();
    for (i, (dep, constraint)) in deps.iter().enumerate() {
        let is_last_dep = i == deps.len() - 1;
        format_node(
            graph,
            output,
            dep,
            constraint.as_str(),
            &child_prefix,
            is_last_dep,
            path,
        );
    }

    path.remove(name);
}

/// Format the graph in DOT, optionally limited to what one package reaches
pub fn format_dot(graph: &BuildGraph, package: Option<&str>) -> String {
    let included: BTreeSet<&str> = match package {
        Some(name) if !graph.contains(name) => {
            return format!("// Package '{name}' not found in graph\n");
        }
        Some(name) => reachable(graph, name),
        None => graph.nodes().map(PackageNode::name).collect(),
    };

    let mut output = String::new();
    output.push_str("digraph dependencies {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box];\n");
    output.push('\n');

    for name in &included {
        let Some(node) = graph.node(name) else {
            continue;
        };
        let mut attrs = Vec::new();
        if node.recipe().is_none() {
            attrs.push("shape=ellipse");
        }
        if node.flags().needs_build {
            attrs.push("style=filled, fillcolor=salmon");
        } else if node.flags().needs_test {
            attrs.push("style=filled, fillcolor=khaki");
        }
        if attrs.is_empty() {
            let _ = writeln!(output, "    \"{name}\";");
        } else {
            let _ = writeln!(output, "    \"{name}\" [{}];", attrs.join(", "));
        }
    }
    output.push('\n');

    for name in &included {
        let Some(node) = graph.node(name) else {
            continue;
        };
        for (dep, constraint) in node.dependencies() {
            if constraint.is_any() {
                let _ = writeln!(output, "    \"{name}\" -> \"{dep}\";");
            } else {
                let _ = writeln!(
                    output,
                    "    \"{name}\" -> \"{dep}\" [label=\"{constraint}\"];"
                );
            }
        }
    }

    output.push_str("}\n");
    output
}

/// `package` and everything it depends on, transitively
fn reachable<'g>(graph: &'g BuildGraph, package: &str) -> BTreeSet<&'g str> {
    let mut reachable = BTreeSet::new();
    let mut stack: Vec<&'g str> = graph.node(package).map(PackageNode::name).into_iter().collect();

    while let Some(name) = stack.pop() {
        if !reachable.insert(name) {
            continue;
        }
        if let Some(node) = graph.node(name) {
            stack.extend(node.dependencies().keys().map(String::as_str));
        }
    }
    reachable
}
