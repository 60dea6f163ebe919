//! Schema Loom
//!
//! Resolves a set of interdependent Avro-style schema definition files
//! (`.avsc` named types, `.avpr` protocols) into a single fully-linked
//! universe, then emits the documents in a deterministic
//! dependency-respecting order for downstream code generation.
//!
//! ## Pipeline
//!
//! ```text
//! (source id, raw text) pairs
//!         │
//!         ▼
//!     Parser          per-document, pure, parallel
//!         │
//!         ▼
//!     Resolver        symbol table + reference resolution
//!         │
//!         ▼
//!     Graph Builder   depends-on graph, cycle enumeration
//!         │
//!         ▼
//!     Scheduler       stable topological emission order
//!         │
//!         ▼
//!     ResolutionReport (diagnostics + optional EmissionPlan)
//! ```
//!
//! Per-item failures (a malformed document, a duplicate name, a dangling
//! reference) never abort the pass: they are recovered at the smallest
//! scope and recorded as diagnostics, so one run surfaces every actionable
//! problem. Any error-severity diagnostic suppresses the emission plan.
//!
//! ## Example
//!
//! ```
//! use schema_loom::{resolve_schemas, ResolveOptions, SchemaSource};
//!
//! let sources = vec![
//!     SchemaSource::new(
//!         "foo.avsc",
//!         r#"{"type": "record", "name": "ns.Foo", "fields": [
//!             {"name": "bar", "type": "ns.Bar"}
//!         ]}"#,
//!     ),
//!     SchemaSource::new(
//!         "bar.avsc",
//!         r#"{"type": "enum", "name": "ns.Bar", "symbols": ["A", "B"]}"#,
//!     ),
//! ];
//!
//! let report = resolve_schemas(&sources, &ResolveOptions::default());
//! let plan = report.plan.expect("clean input set");
//! assert_eq!(plan.order, vec!["bar.avsc", "foo.avsc"]);
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod graph;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod schedule;

pub use config::ResolveOptions;
pub use document::{SchemaDocument, SourcePos, TypeDeclaration, TypeKind, TypeRef};
pub use error::{LoomError, Result};
pub use graph::{Cycle, DependencyGraph, Granularity};
pub use parser::{parse_document, ParseFailure};
pub use pipeline::{resolve_schemas, resolve_schemas_detailed, SchemaSource};
pub use report::{
    Diagnostic, DiagnosticKind, Diagnostics, EmissionPlan, ResolutionReport, Severity, SourceRef,
};
pub use resolver::SymbolTable;
pub use schedule::schedule;
