//! Dependency graph over the resolved universe.
//!
//! Nodes are documents (the default) or individual named types, per the
//! configured granularity. Edges point from a dependent to the thing it
//! depends on; self-references are excluded and duplicate edges collapsed.
//! Every edge target exists in the node set: unresolvable references were
//! already recorded by the resolver and never reach this point.

pub mod cycles;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::resolver::ResolvedUniverse;

pub use cycles::{find_cycles, Cycle};

/// Node granularity of the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One node per source document. Sufficient for file-scoped code
    /// generation and the default.
    #[default]
    Document,
    /// One node per named type.
    Type,
}

/// Directed "depends-on" graph.
pub struct DependencyGraph {
    pub(crate) graph: DiGraph<String, ()>,
    pub(crate) indices: HashMap<String, NodeIndex>,
    granularity: Granularity,
}

impl DependencyGraph {
    pub fn build(universe: &ResolvedUniverse<'_>, granularity: Granularity) -> Self {
        let mut graph = DiGraph::new();
        let mut indices = HashMap::new();

        match granularity {
            Granularity::Document => {
                let node_of: Vec<NodeIndex> = universe
                    .documents
                    .iter()
                    .map(|document| {
                        let idx = graph.add_node(document.source_id.clone());
                        indices.insert(document.source_id.clone(), idx);
                        idx
                    })
                    .collect();

                let mut seen = HashSet::new();
                for (doc_idx, doc_targets) in universe.targets.iter().enumerate() {
                    for (decl_idx, decl_targets) in doc_targets.iter().enumerate() {
                        // Shadowed duplicates contribute no edges.
                        if !universe.canonical[doc_idx][decl_idx] {
                            continue;
                        }
                        for target in decl_targets {
                            if target.doc == doc_idx {
                                continue;
                            }
                            let edge = (node_of[doc_idx], node_of[target.doc]);
                            if seen.insert(edge) {
                                graph.add_edge(edge.0, edge.1, ());
                            }
                        }
                    }
                }

                // Document-level references (a bare-union document naming
                // types declared elsewhere) are edges too.
                for (doc_idx, doc_level) in universe.document_targets.iter().enumerate() {
                    for target in doc_level {
                        if target.doc == doc_idx {
                            continue;
                        }
                        let edge = (node_of[doc_idx], node_of[target.doc]);
                        if seen.insert(edge) {
                            graph.add_edge(edge.0, edge.1, ());
                        }
                    }
                }
            }
            Granularity::Type => {
                let mut node_of: HashMap<(usize, usize), NodeIndex> = HashMap::new();
                for (doc_idx, document) in universe.documents.iter().enumerate() {
                    for (decl_idx, declaration) in document.declarations.iter().enumerate() {
                        if !universe.canonical[doc_idx][decl_idx] {
                            continue;
                        }
                        let idx = graph.add_node(declaration.full_name.clone());
                        indices.insert(declaration.full_name.clone(), idx);
                        node_of.insert((doc_idx, decl_idx), idx);
                    }
                }

                let mut seen = HashSet::new();
                for (doc_idx, doc_targets) in universe.targets.iter().enumerate() {
                    for (decl_idx, decl_targets) in doc_targets.iter().enumerate() {
                        let Some(&from) = node_of.get(&(doc_idx, decl_idx)) else {
                            continue;
                        };
                        for target in decl_targets {
                            // Targets are canonical by construction.
                            let to = node_of[&(target.doc, target.decl)];
                            if from == to {
                                continue;
                            }
                            if seen.insert((from, to)) {
                                graph.add_edge(from, to, ());
                            }
                        }
                    }
                }
                // Document-level references have no owning type node and
                // contribute nothing at this granularity.
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            ?granularity,
            "dependency graph built"
        );

        Self {
            graph,
            indices,
            granularity,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node names in insertion order (documents in input order, types in
    /// document order).
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|i| self.graph[i].as_str())
    }

    /// Direct dependencies of a node, by name.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.indices.get(name) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    /// Export the graph to GraphViz DOT format.
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph schema_dependencies {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=rounded, fontname=\"Helvetica\", fontsize=10];\n\n");

        for idx in self.graph.node_indices() {
            let name = &self.graph[idx];
            output.push_str(&format!("  \"{}\";\n", name));
        }
        output.push('\n');

        for edge in self.graph.raw_edges() {
            output.push_str(&format!(
                "  \"{}\" -> \"{}\";\n",
                self.graph[edge.source()],
                self.graph[edge.target()]
            ));
        }

        output.push_str("}\n");
        output
    }
}
