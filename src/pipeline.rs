//! The resolution pipeline.
//!
//! One complete pass over a fixed input set:
//!
//! ```text
//! raw files -> Parser -> documents -> Resolver -> symbol table
//!           -> Graph Builder -> graph -> Scheduler -> emission plan
//! ```
//!
//! Parsing is embarrassingly parallel and runs on a fixed-size worker pool;
//! everything after the parse barrier is a single-threaded pass over the
//! immutable document set. The pass is atomic from the caller's perspective:
//! it either returns a complete report or nothing.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ResolveOptions;
use crate::document::{SchemaDocument, SourcePos};
use crate::graph::{cycles, DependencyGraph};
use crate::parser::{self, ParseFailure};
use crate::report::{Diagnostic, DiagnosticKind, Diagnostics, ResolutionReport, SourceRef};
use crate::resolver::{self, SymbolTable};
use crate::schedule;

/// One raw input: a logical identifier (usually a relative path) and the
/// document text. Supplied by an external file-discovery layer; the core
/// never performs filesystem traversal itself.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    pub id: String,
    pub text: String,
}

impl SchemaSource {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Run one complete resolution pass over the input set.
///
/// Always returns a report; an emission plan is present only when no
/// error-severity diagnostic was recorded.
pub fn resolve_schemas(sources: &[SchemaSource], options: &ResolveOptions) -> ResolutionReport {
    resolve_schemas_detailed(sources, options).0
}

/// As [`resolve_schemas`], additionally handing back the dependency graph
/// for inspection (DOT export and the like).
pub fn resolve_schemas_detailed(
    sources: &[SchemaSource],
    options: &ResolveOptions,
) -> (ResolutionReport, DependencyGraph) {
    info!(documents = sources.len(), "starting resolution pass");
    let content_hash = hash_inputs(sources);
    let mut diagnostics = Diagnostics::new();

    let documents = parse_all(sources, options.workers, &mut diagnostics);

    let table = SymbolTable::build(&documents, &mut diagnostics);
    let universe = resolver::resolve_references(&documents, &table, &mut diagnostics);
    let graph = DependencyGraph::build(&universe, options.granularity);

    for cycle in cycles::find_cycles(&graph) {
        let path = cycle.members.join(" -> ");
        let mut diagnostic = Diagnostic::error(
            DiagnosticKind::CyclicDependency,
            format!("dependency cycle: {} -> {}", path, cycle.members[0]),
        );
        for member in &cycle.members {
            diagnostic = diagnostic.with_source(locate_node(&documents, member));
        }
        diagnostics.push(diagnostic);
    }

    let plan = if diagnostics.has_errors() {
        warn!(
            errors = diagnostics.errors().count(),
            "resolution finished with errors; no emission plan"
        );
        None
    } else {
        Some(schedule::schedule(&graph))
    };

    (
        ResolutionReport {
            diagnostics,
            plan,
            content_hash,
        },
        graph,
    )
}

/// Parse every source on a fixed-size worker pool, recording failures as
/// parse diagnostics. Surviving documents come back in input order.
fn parse_all(
    sources: &[SchemaSource],
    workers: usize,
    diagnostics: &mut Diagnostics,
) -> Vec<SchemaDocument> {
    let workers = workers.clamp(1, sources.len().max(1));
    let next = AtomicUsize::new(0);
    let results: Mutex<Vec<(usize, Result<SchemaDocument, ParseFailure>)>> =
        Mutex::new(Vec::with_capacity(sources.len()));

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(source) = sources.get(index) else {
                    break;
                };
                let outcome = parser::parse_document(&source.id, &source.text);
                results
                    .lock()
                    .expect("a parser worker panicked")
                    .push((index, outcome));
            });
        }
    });
    // The scope end is the synchronization barrier: resolution needs global
    // knowledge of every declared name.

    let mut results = results.into_inner().expect("a parser worker panicked");
    results.sort_by_key(|(index, _)| *index);

    let mut documents = Vec::with_capacity(results.len());
    for (index, outcome) in results {
        match outcome {
            Ok(document) => {
                debug!(
                    source = %document.source_id,
                    declarations = document.declarations.len(),
                    "parsed"
                );
                documents.push(document);
            }
            Err(failure) => {
                diagnostics.push(
                    Diagnostic::error(DiagnosticKind::Parse, failure.message)
                        .with_source(SourceRef::new(&sources[index].id, failure.pos)),
                );
            }
        }
    }
    documents
}

/// Best source location for a graph node name: the document itself at
/// document granularity, the declaration at type granularity.
fn locate_node(documents: &[SchemaDocument], name: &str) -> SourceRef {
    if let Some(document) = documents.iter().find(|d| d.source_id == name) {
        let pos = document
            .declarations
            .first()
            .map(|d| d.pos)
            .unwrap_or(SourcePos::START);
        return SourceRef::new(&document.source_id, pos);
    }
    for document in documents {
        if let Some(declaration) = document.declarations.iter().find(|d| d.full_name == name) {
            return SourceRef::new(&document.source_id, declaration.pos);
        }
    }
    SourceRef::new(name, SourcePos::START)
}

/// SHA-256 over the input set, independent of enumeration order. External
/// incremental-build layers key their caches on this.
fn hash_inputs(sources: &[SchemaSource]) -> String {
    let mut ordered: Vec<&SchemaSource> = sources.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    for source in ordered {
        hasher.update(source.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(source.text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
