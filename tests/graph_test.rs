//! Integration tests for `fanout graph`
//!
//! - Tree rendering with constraints
//! - DOT output
//! - JSON node dump
//! - Edge selection by requirement set

mod common;

use common::abc_repo;

#[test]
fn test_graph_tree() {
    let repo = abc_repo();

    let output = repo.run(&["graph", "."]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Dependency Tree (build edges):"), "stdout: {stdout}");
    assert!(stdout.contains("└── c\n"));
    assert!(stdout.contains("└── b >=2.0"));
}

#[test]
fn test_graph_tree_for_package() {
    let repo = abc_repo();

    let output = repo.run(&["graph", ".", "--package", "a"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("└── a [install-check]\n"), "stdout: {stdout}");
    assert!(stdout.contains("└── b >=2.0 [install-check]"));
    assert!(!stdout.contains("└── c"));
}

#[test]
fn test_graph_unknown_package_fails() {
    let repo = abc_repo();

    for args in [
        &["graph", ".", "--package", "ghost"][..],
        &["graph", ".", "--dot", "--package", "ghost"][..],
    ] {
        let output = repo.run(args);
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("Package 'ghost' is not in the build graph"),
            "stderr: {stderr}"
        );
    }
}

#[test]
fn test_graph_dot() {
    let repo = abc_repo();

    let output = repo.run(&["graph", ".", "--dot"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("digraph dependencies {"));
    assert!(stdout.contains("\"c\" -> \"a\";"));
    assert!(stdout.contains("\"a\" -> \"b\" [label=\">=2.0\"];"));
}

#[test]
fn test_graph_json() {
    let repo = abc_repo();

    let graphs = repo.run_json(&["--json", "graph", "."]);
    let graph = &graphs[0];
    assert_eq!(graph["deps_type"], "build");
    assert_eq!(graph["platform"]["label"], "linux-64");

    let nodes = graph["nodes"].as_array().expect("nodes array");
    let names: Vec<&str> = nodes.iter().map(|n| n["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(nodes[0]["dependencies"]["b"], ">=2.0");
    assert_eq!(nodes[0]["kind"]["kind"], "full-recipe");
}

#[test]
fn test_graph_test_edges() {
    let repo = abc_repo();

    let graphs = repo.run_json(&["--json", "graph", ".", "--deps-type", "test"]);
    let nodes = graphs[0]["nodes"].as_array().expect("nodes array");
    let python = nodes
        .iter()
        .find(|n| n["name"] == "python")
        .expect("python placeholder");
    assert_eq!(python["kind"]["kind"], "dependency-only");
    assert_eq!(python["flags"]["needs_install_check"], true);
}
