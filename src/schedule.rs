//! Topological scheduling.
//!
//! Stable Kahn's algorithm over the dependency graph: a node is ready once
//! every node it depends on has been placed in the plan, and among ready
//! nodes the smallest-by-name one is always picked. The same input graph
//! therefore always yields the same order, independent of input enumeration
//! order, which keeps downstream code generation reproducible and cacheable.
//!
//! Must only be invoked on an acyclic graph; cycle detection is the graph
//! builder's job and a cyclic graph never reaches this point.

use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

use crate::graph::DependencyGraph;
use crate::report::EmissionPlan;

/// Produce the deterministic emission order for an acyclic graph.
pub fn schedule(graph: &DependencyGraph) -> EmissionPlan {
    let g = &graph.graph;

    // Remaining unemitted dependencies per node.
    let mut remaining: Vec<usize> = g
        .node_indices()
        .map(|n| g.neighbors_directed(n, Direction::Outgoing).count())
        .collect();

    let mut ready = BinaryHeap::new();
    for node in g.node_indices() {
        if remaining[node.index()] == 0 {
            ready.push(Reverse((g[node].clone(), node)));
        }
    }

    let mut order = Vec::with_capacity(g.node_count());
    while let Some(Reverse((name, node))) = ready.pop() {
        order.push(name);
        for dependent in g.neighbors_directed(node, Direction::Incoming) {
            remaining[dependent.index()] -= 1;
            if remaining[dependent.index()] == 0 {
                ready.push(Reverse((g[dependent].clone(), dependent)));
            }
        }
    }

    debug_assert_eq!(order.len(), g.node_count(), "graph must be acyclic");
    debug!(nodes = order.len(), "emission plan computed");

    EmissionPlan { order }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Granularity;
    use crate::parser::parse_document;
    use crate::report::Diagnostics;
    use crate::resolver::{resolve_references, SymbolTable};

    fn plan_for(sources: &[(&str, &str)], granularity: Granularity) -> EmissionPlan {
        let docs: Vec<_> = sources
            .iter()
            .map(|(id, text)| parse_document(id, text).unwrap())
            .collect();
        let mut diags = Diagnostics::new();
        let table = SymbolTable::build(&docs, &mut diags);
        assert!(!diags.has_errors());
        let universe = resolve_references(&docs, &table, &mut diags);
        assert!(!diags.has_errors());
        let graph = DependencyGraph::build(&universe, granularity);
        schedule(&graph)
    }

    #[test]
    fn dependencies_precede_dependents() {
        let plan = plan_for(
            &[
                (
                    "use.avsc",
                    r#"{"type": "record", "name": "ns.Use", "fields": [
                        {"name": "b", "type": "ns.Bar"}
                    ]}"#,
                ),
                (
                    "bar.avsc",
                    r#"{"type": "enum", "name": "ns.Bar", "symbols": ["X"]}"#,
                ),
            ],
            Granularity::Document,
        );
        assert_eq!(plan.order, vec!["bar.avsc", "use.avsc"]);
    }

    #[test]
    fn independent_nodes_come_out_alphabetically() {
        let plan = plan_for(
            &[
                ("c.avsc", r#"{"type": "record", "name": "ns.C", "fields": []}"#),
                ("a.avsc", r#"{"type": "record", "name": "ns.A", "fields": []}"#),
                ("b.avsc", r#"{"type": "record", "name": "ns.B", "fields": []}"#),
            ],
            Granularity::Document,
        );
        assert_eq!(plan.order, vec!["a.avsc", "b.avsc", "c.avsc"]);
    }

    #[test]
    fn order_is_independent_of_input_enumeration_order() {
        let bar = (
            "bar.avsc",
            r#"{"type": "enum", "name": "ns.Bar", "symbols": ["X"]}"#,
        );
        let using = (
            "use.avsc",
            r#"{"type": "record", "name": "ns.Use", "fields": [
                {"name": "b", "type": "ns.Bar"}
            ]}"#,
        );
        let forward = plan_for(&[bar, using], Granularity::Document);
        let reversed = plan_for(&[using, bar], Granularity::Document);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn chain_emits_leaves_first() {
        let plan = plan_for(
            &[
                (
                    "a.avsc",
                    r#"{"type": "record", "name": "ns.A", "fields": [
                        {"name": "b", "type": "ns.B"}
                    ]}"#,
                ),
                (
                    "b.avsc",
                    r#"{"type": "record", "name": "ns.B", "fields": [
                        {"name": "c", "type": "ns.C"}
                    ]}"#,
                ),
                ("c.avsc", r#"{"type": "record", "name": "ns.C", "fields": []}"#),
            ],
            Granularity::Document,
        );
        assert_eq!(plan.order, vec!["c.avsc", "b.avsc", "a.avsc"]);
    }
}
