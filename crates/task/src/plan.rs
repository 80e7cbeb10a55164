use crate::graph::DependencyGraph;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Tiered execution plan.
///
/// Every selected package appears in exactly one tier. Packages in the same
/// tier have no ordering constraints between them; names are sorted only so
/// output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub tiers: Vec<Vec<String>>,
    /// Members of the final tier when a dependency cycle prevented ordering
    pub cycle: Option<Vec<String>>,
}

impl ExecutionPlan {
    /// Compute execution tiers with a level-by-level Kahn's algorithm.
    ///
    /// When no remaining package is free of unfinished dependencies, all of
    /// them go into one last tier and the cycle is recorded.
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let mut in_degree: BTreeMap<&str, usize> =
            graph.nodes.iter().map(|n| (n.as_str(), 0)).collect();
        for dependents in graph.edges.values() {
            for dependent in dependents {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree += 1;
                }
            }
        }

        let mut remaining: BTreeSet<&str> = graph.nodes.iter().map(String::as_str).collect();
        let mut tiers = Vec::new();
        let mut cycle = None;

        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|n| in_degree.get(n).copied().unwrap_or(0) == 0)
                .collect();

            if ready.is_empty() {
                let members: Vec<String> = remaining.iter().map(|n| n.to_string()).collect();
                tracing::warn!(
                    packages = ?members,
                    "Dependency cycle detected; running remaining packages in one final tier"
                );
                tiers.push(members.clone());
                cycle = Some(members);
                break;
            }

            for node in &ready {
                remaining.remove(node);
                for dependent in graph.dependents(node) {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }

            tiers.push(ready.into_iter().map(str::to_string).collect());
        }

        let plan = Self { tiers, cycle };
        tracing::debug!(
            tiers = plan.tiers.len(),
            packages = plan.len(),
            "Computed execution plan"
        );
        plan
    }

    /// All packages, tier after tier
    pub fn sequential_order(&self) -> Vec<&str> {
        self.tiers.iter().flatten().map(String::as_str).collect()
    }

    /// Index of the tier holding `name`
    pub fn tier_of(&self, name: &str) -> Option<usize> {
        self.tiers.iter().position(|tier| tier.iter().any(|n| n == name))
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn has_cycle(&self) -> bool {
        self.cycle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monorun_config::EdgeOptions;
    use monorun_core::{DependencyKind::Dependencies, PackageRecord};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log lines
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl LogCapture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn warnings_while<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, logs.contents())
    }

    fn pkg(name: &str, deps: &[&str]) -> PackageRecord {
        deps.iter().fold(PackageRecord::new(name, format!("/ws/{name}")), |p, d| {
            p.with_dependency(Dependencies, *d)
        })
    }

    fn plan_for(packages: &[PackageRecord]) -> (DependencyGraph, ExecutionPlan) {
        let graph = DependencyGraph::build(packages, EdgeOptions::default());
        let plan = ExecutionPlan::from_graph(&graph);
        (graph, plan)
    }

    fn assert_partition(graph: &DependencyGraph, plan: &ExecutionPlan) {
        let flattened = plan.sequential_order();
        let unique: BTreeSet<&str> = flattened.iter().copied().collect();
        assert_eq!(unique.len(), flattened.len(), "duplicate package in plan");
        let nodes: BTreeSet<&str> = graph.nodes.iter().map(String::as_str).collect();
        assert_eq!(unique, nodes);
    }

    #[test]
    fn test_fan_in_fan_out() {
        let (graph, plan) = plan_for(&[
            pkg("A", &[]),
            pkg("D", &[]),
            pkg("B", &["A"]),
            pkg("C", &["A", "B"]),
        ]);

        assert_eq!(
            plan.tiers,
            vec![
                vec!["A".to_string(), "D".to_string()],
                vec!["B".to_string()],
                vec!["C".to_string()],
            ]
        );
        assert!(!plan.has_cycle());
        assert_partition(&graph, &plan);

        let order = plan.sequential_order();
        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        assert!(pos("A") < pos("B") && pos("D") < pos("B"));
        assert!(pos("B") < pos("C"));
    }

    #[test]
    fn test_every_edge_crosses_forward() {
        let (graph, plan) = plan_for(&[
            pkg("ui", &["tokens", "utils"]),
            pkg("tokens", &[]),
            pkg("utils", &[]),
            pkg("web", &["ui", "api-client"]),
            pkg("api-client", &["utils"]),
            pkg("docs", &["web"]),
            pkg("standalone", &[]),
        ]);
        assert_partition(&graph, &plan);

        for (from, dependents) in &graph.edges {
            for to in dependents {
                assert!(
                    plan.tier_of(from).unwrap() < plan.tier_of(to).unwrap(),
                    "{from} must be planned before {to}"
                );
            }
        }
        assert_eq!(plan.tier_of("docs"), Some(3));
    }

    #[test]
    fn test_mutual_dependency_shares_final_tier() {
        let (graph, plan) = plan_for(&[pkg("A", &["B"]), pkg("B", &["A"]), pkg("base", &[])]);

        assert_partition(&graph, &plan);
        assert_eq!(plan.tiers.len(), 2);
        assert_eq!(plan.tiers[0], vec!["base".to_string()]);
        assert_eq!(plan.tier_of("A"), plan.tier_of("B"));
        assert_eq!(plan.cycle, Some(vec!["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn test_cycle_is_reported_as_warning() {
        let ((_, plan), logs) =
            warnings_while(|| plan_for(&[pkg("A", &["B"]), pkg("B", &["A"]), pkg("base", &[])]));
        assert!(plan.has_cycle());
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("Dependency cycle detected"), "{logs}");
        assert!(logs.contains(r#"["A", "B"]"#), "{logs}");

        let ((_, plan), logs) = warnings_while(|| plan_for(&[pkg("A", &[]), pkg("B", &["A"])]));
        assert!(!plan.has_cycle());
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn test_cycle_fallback_also_takes_downstream_packages() {
        // "app" depends on a cycle member, so it can never become ready either
        let (graph, plan) = plan_for(&[
            pkg("x", &["y"]),
            pkg("y", &["x"]),
            pkg("app", &["x"]),
        ]);
        assert_partition(&graph, &plan);
        assert_eq!(plan.tiers.len(), 1);
        assert_eq!(plan.cycle.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_single_and_empty_graphs() {
        let (_, plan) = plan_for(&[pkg("solo", &[])]);
        assert_eq!(plan.tiers, vec![vec!["solo".to_string()]]);

        let plan = ExecutionPlan::from_graph(&DependencyGraph::default());
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }
}
