//! Cycle detection.
//!
//! Strongly connected components narrow the search, then a depth-first
//! enumeration rooted at each component member lists every simple cycle
//! exactly once: a cycle is only discovered from its lowest-index member,
//! and the walk never revisits a node already on the current path. Cycles
//! are reported rotated so the lexicographically-smallest member comes
//! first.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::NodeIndex;

use super::DependencyGraph;

/// A dependency cycle: the members in path order, from the
/// lexicographically-smallest member back around to itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cycle {
    pub members: Vec<String>,
}

impl Cycle {
    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }
}

/// Enumerate all distinct simple cycles in the graph.
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let g = &graph.graph;

    // Component id per node. Only components with more than one member can
    // hold a cycle; self-edges never make it into the graph.
    let mut component = vec![usize::MAX; g.node_count()];
    for (id, members) in kosaraju_scc(g).into_iter().enumerate() {
        if members.len() < 2 {
            continue;
        }
        for node in members {
            component[node.index()] = id;
        }
    }

    fn search(
        g: &petgraph::graph::DiGraph<String, ()>,
        component: &[usize],
        start: NodeIndex,
        node: NodeIndex,
        path: &mut Vec<NodeIndex>,
        on_path: &mut [bool],
        out: &mut Vec<Vec<NodeIndex>>,
    ) {
        on_path[node.index()] = true;
        path.push(node);

        for next in g.neighbors_directed(node, petgraph::Direction::Outgoing) {
            if next == start {
                out.push(path.clone());
            } else if next.index() > start.index()
                && component[next.index()] == component[start.index()]
                && !on_path[next.index()]
            {
                search(g, component, start, next, path, on_path, out);
            }
        }

        path.pop();
        on_path[node.index()] = false;
    }

    let mut raw_cycles: Vec<Vec<NodeIndex>> = Vec::new();
    let mut path: Vec<NodeIndex> = Vec::new();
    let mut on_path = vec![false; g.node_count()];

    // Restricting the walk to higher-indexed nodes roots every cycle at its
    // lowest-index member, so each one is found once and only once.
    for start in g.node_indices() {
        if component[start.index()] != usize::MAX {
            search(
                g,
                &component,
                start,
                start,
                &mut path,
                &mut on_path,
                &mut raw_cycles,
            );
        }
    }

    let mut cycles: Vec<Cycle> = raw_cycles
        .into_iter()
        .map(|raw| {
            let names = raw.iter().map(|&n| g[n].clone()).collect();
            Cycle {
                members: rotate_to_smallest(names),
            }
        })
        .collect();

    // Deterministic report order regardless of traversal entry points.
    cycles.sort_by(|a, b| a.members.cmp(&b.members));
    cycles
}

/// Rotate the path so the lexicographically-smallest member comes first,
/// preserving the cyclic order.
fn rotate_to_smallest(mut members: Vec<String>) -> Vec<String> {
    if members.is_empty() {
        return members;
    }
    let smallest = members
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);
    members.rotate_left(smallest);
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Granularity;
    use crate::parser::parse_document;
    use crate::report::Diagnostics;
    use crate::resolver::{resolve_references, SymbolTable};

    fn cycles_of(sources: &[(&str, &str)]) -> Vec<Cycle> {
        let docs: Vec<_> = sources
            .iter()
            .map(|(id, text)| parse_document(id, text).unwrap())
            .collect();
        let mut diags = Diagnostics::new();
        let table = SymbolTable::build(&docs, &mut diags);
        let universe = resolve_references(&docs, &table, &mut diags);
        let graph = DependencyGraph::build(&universe, Granularity::Document);
        find_cycles(&graph)
    }

    fn record(name: &str, dep: &str) -> String {
        format!(
            r#"{{"type": "record", "name": "{}", "fields": [{{"name": "d", "type": "{}"}}]}}"#,
            name, dep
        )
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let a = record("ns.A", "ns.B");
        let b = r#"{"type": "record", "name": "ns.B", "fields": []}"#;
        assert!(cycles_of(&[("a.avsc", &a), ("b.avsc", b)]).is_empty());
    }

    #[test]
    fn mutual_reference_is_one_cycle() {
        let a = record("ns.A", "ns.B");
        let b = record("ns.B", "ns.A");
        let cycles = cycles_of(&[("a.avsc", &a), ("b.avsc", &b)]);
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].contains("a.avsc"));
        assert!(cycles[0].contains("b.avsc"));
    }

    #[test]
    fn disjoint_cycles_are_all_found_in_one_run() {
        let a = record("ns.A", "ns.B");
        let b = record("ns.B", "ns.A");
        let c = record("ns.C", "ns.D");
        let d = record("ns.D", "ns.C");
        let cycles = cycles_of(&[
            ("a.avsc", &a),
            ("b.avsc", &b),
            ("c.avsc", &c),
            ("d.avsc", &d),
        ]);
        assert_eq!(cycles.len(), 2);
    }

    #[test]
    fn overlapping_cycles_are_distinct() {
        // Two cycles through the same node: A->B->A and A->C->A.
        let a = String::from(
            r#"{"type": "record", "name": "ns.A", "fields": [
                {"name": "b", "type": "ns.B"},
                {"name": "c", "type": "ns.C"}
            ]}"#,
        );
        let b = record("ns.B", "ns.A");
        let c = record("ns.C", "ns.A");
        let cycles = cycles_of(&[("a.avsc", &a), ("b.avsc", &b), ("c.avsc", &c)]);
        assert_eq!(cycles.len(), 2);
    }

    #[test]
    fn cycles_through_a_finished_node_are_not_lost() {
        // A->B->C->A and A->D->C->A share node C; whichever path finishes
        // first must not hide the other.
        let a = String::from(
            r#"{"type": "record", "name": "ns.A", "fields": [
                {"name": "b", "type": "ns.B"},
                {"name": "d", "type": "ns.D"}
            ]}"#,
        );
        let b = record("ns.B", "ns.C");
        let c = record("ns.C", "ns.A");
        let d = record("ns.D", "ns.C");
        let cycles = cycles_of(&[
            ("a.avsc", &a),
            ("b.avsc", &b),
            ("c.avsc", &c),
            ("d.avsc", &d),
        ]);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].members, vec!["a.avsc", "b.avsc", "c.avsc"]);
        assert_eq!(cycles[1].members, vec!["a.avsc", "d.avsc", "c.avsc"]);
    }

    #[test]
    fn nested_cycles_within_one_component_are_all_found() {
        // A->B->A and A->B->C->A: same component, different lengths.
        let a = record("ns.A", "ns.B");
        let b = String::from(
            r#"{"type": "record", "name": "ns.B", "fields": [
                {"name": "a", "type": "ns.A"},
                {"name": "c", "type": "ns.C"}
            ]}"#,
        );
        let c = record("ns.C", "ns.A");
        let cycles = cycles_of(&[("a.avsc", &a), ("b.avsc", &b), ("c.avsc", &c)]);
        assert_eq!(cycles.len(), 2);
    }

    #[test]
    fn cycle_path_starts_at_smallest_member() {
        let a = record("ns.A", "ns.B");
        let b = record("ns.B", "ns.A");
        let cycles = cycles_of(&[("b.avsc", &b), ("a.avsc", &a)]);
        assert_eq!(cycles[0].members[0], "a.avsc");
    }
}
