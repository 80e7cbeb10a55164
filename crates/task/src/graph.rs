use monorun_config::EdgeOptions;
use monorun_core::{DependencyKind, PackageRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Package dependency graph restricted to the selected packages.
///
/// Edges point from a dependency to its dependents: `d → p` means `p`
/// depends on `d` and must not start before `d` finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    pub nodes: BTreeSet<String>,
    pub edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build the graph from the selected packages.
    ///
    /// Dependencies on packages outside the selection are assumed to be
    /// satisfied already and produce no edge, as do self-dependencies.
    pub fn build(selected: &[PackageRecord], options: EdgeOptions) -> Self {
        let nodes: BTreeSet<String> = selected.iter().map(|p| p.name.clone()).collect();
        let kinds = edge_kinds(options);
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for package in selected {
            for dep in package.dependencies.names(kinds.iter().copied()) {
                if dep == package.name || !nodes.contains(dep) {
                    continue;
                }
                edges
                    .entry(dep.to_string())
                    .or_default()
                    .insert(package.name.clone());
            }
        }

        let graph = Self { nodes, edges };
        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edge_count(),
            "Built dependency graph"
        );
        graph
    }

    /// Packages that depend on `name`
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Selected packages `name` depends on
    pub fn dependencies_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |(_, dependents)| dependents.contains(name))
            .map(|(dep, _)| dep.as_str())
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.get(from).is_some_and(|set| set.contains(to))
    }
}

/// Dependency categories that produce edges under `options`
pub fn edge_kinds(options: EdgeOptions) -> Vec<DependencyKind> {
    let mut kinds = vec![
        DependencyKind::Dependencies,
        DependencyKind::OptionalDependencies,
    ];
    if options.include_dev {
        kinds.push(DependencyKind::DevDependencies);
    }
    if options.include_peer {
        kinds.push(DependencyKind::PeerDependencies);
    }
    kinds
}
