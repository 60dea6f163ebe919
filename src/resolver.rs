//! Reference resolution.
//!
//! Runs strictly after all parsing has completed: forward references (a
//! document referencing a name declared later in the batch) make resolution
//! a distinct phase, not something interleaved with parsing.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::document::SchemaDocument;
use crate::report::{Diagnostic, DiagnosticKind, Diagnostics, SourceRef};

/// Handle to a declaration within the parsed universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId {
    /// Index into the document set.
    pub doc: usize,
    /// Index into that document's declaration list.
    pub decl: usize,
}

/// Mapping from fully-qualified name to its defining declaration.
///
/// Built once from all documents; read-only afterwards. On a name collision
/// the first definition wins and the later one is ignored for graph
/// purposes, recorded as a duplicate-definition diagnostic carrying both
/// source locations.
pub struct SymbolTable {
    entries: HashMap<String, DeclId>,
}

impl SymbolTable {
    pub fn build(documents: &[SchemaDocument], diagnostics: &mut Diagnostics) -> Self {
        let mut entries: HashMap<String, DeclId> = HashMap::new();

        for (doc_idx, document) in documents.iter().enumerate() {
            for (decl_idx, declaration) in document.declarations.iter().enumerate() {
                let id = DeclId {
                    doc: doc_idx,
                    decl: decl_idx,
                };
                match entries.get(&declaration.full_name) {
                    None => {
                        entries.insert(declaration.full_name.clone(), id);
                    }
                    Some(first) => {
                        let original = &documents[first.doc];
                        let original_decl = &original.declarations[first.decl];
                        diagnostics.push(
                            Diagnostic::error(
                                DiagnosticKind::DuplicateDefinition,
                                format!(
                                    "\"{}\" is defined more than once; keeping the definition in \"{}\"",
                                    declaration.full_name, original.source_id
                                ),
                            )
                            .with_source(SourceRef::new(&original.source_id, original_decl.pos))
                            .with_source(SourceRef::new(&document.source_id, declaration.pos)),
                        );
                    }
                }
            }
        }

        debug!(symbols = entries.len(), "symbol table built");
        Self { entries }
    }

    pub fn lookup(&self, full_name: &str) -> Option<DeclId> {
        self.entries.get(full_name).copied()
    }

    /// Whether the given declaration is the one its name resolves to (false
    /// for shadowed duplicates).
    pub fn is_canonical(&self, documents: &[SchemaDocument], id: DeclId) -> bool {
        let name = &documents[id.doc].declarations[id.decl].full_name;
        self.lookup(name) == Some(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The fully-linked universe: every declaration paired with the declarations
/// its references resolve to.
pub struct ResolvedUniverse<'a> {
    pub documents: &'a [SchemaDocument],
    /// Outer index: document. Inner index: declaration. The target list is
    /// empty when nothing resolved, never absent.
    pub targets: Vec<Vec<Vec<DeclId>>>,
    /// Aligned with `targets`: whether the declaration owns its name in the
    /// symbol table. Shadowed duplicates keep resolving (for diagnostics)
    /// but contribute no graph edges.
    pub canonical: Vec<Vec<bool>>,
    /// Per document, the resolved targets of its document-level references
    /// (those made outside any declaration).
    pub document_targets: Vec<Vec<DeclId>>,
}

/// Resolve every reference in every declaration against the symbol table.
///
/// Unresolved references are recorded per distinct (document, target name)
/// pair and never abort the rest of the batch.
pub fn resolve_references<'a>(
    documents: &'a [SchemaDocument],
    table: &SymbolTable,
    diagnostics: &mut Diagnostics,
) -> ResolvedUniverse<'a> {
    let mut targets = Vec::with_capacity(documents.len());
    let mut canonical = Vec::with_capacity(documents.len());
    let mut document_targets = Vec::with_capacity(documents.len());
    let mut reported: HashSet<(usize, String)> = HashSet::new();

    for (doc_idx, document) in documents.iter().enumerate() {
        let mut doc_targets = Vec::with_capacity(document.declarations.len());
        let mut doc_canonical = Vec::with_capacity(document.declarations.len());

        for (decl_idx, declaration) in document.declarations.iter().enumerate() {
            let id = DeclId {
                doc: doc_idx,
                decl: decl_idx,
            };
            doc_canonical.push(table.is_canonical(documents, id));

            let mut resolved = Vec::with_capacity(declaration.references.len());
            for reference in &declaration.references {
                match reference
                    .candidates()
                    .iter()
                    .find_map(|candidate| table.lookup(candidate))
                {
                    Some(target) => resolved.push(target),
                    None => {
                        if reported.insert((doc_idx, reference.name.clone())) {
                            diagnostics.push(
                                Diagnostic::error(
                                    DiagnosticKind::UnresolvedReference,
                                    format!(
                                        "undefined name \"{}\" referenced by \"{}\"",
                                        reference.name, declaration.full_name
                                    ),
                                )
                                .with_source(SourceRef::new(&document.source_id, reference.pos)),
                            );
                        }
                    }
                }
            }
            doc_targets.push(resolved);
        }

        let mut doc_level = Vec::with_capacity(document.references.len());
        for reference in &document.references {
            match reference
                .candidates()
                .iter()
                .find_map(|candidate| table.lookup(candidate))
            {
                Some(target) => doc_level.push(target),
                None => {
                    if reported.insert((doc_idx, reference.name.clone())) {
                        diagnostics.push(
                            Diagnostic::error(
                                DiagnosticKind::UnresolvedReference,
                                format!(
                                    "undefined name \"{}\" referenced by \"{}\"",
                                    reference.name, document.source_id
                                ),
                            )
                            .with_source(SourceRef::new(&document.source_id, reference.pos)),
                        );
                    }
                }
            }
        }

        targets.push(doc_targets);
        canonical.push(doc_canonical);
        document_targets.push(doc_level);
    }

    ResolvedUniverse {
        documents,
        targets,
        canonical,
        document_targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn parse_all(sources: &[(&str, &str)]) -> Vec<SchemaDocument> {
        sources
            .iter()
            .map(|(id, text)| parse_document(id, text).unwrap())
            .collect()
    }

    #[test]
    fn bare_reference_prefers_local_namespace() {
        let docs = parse_all(&[
            (
                "use.avsc",
                r#"{"type": "record", "name": "io.example.Use", "fields": [
                    {"name": "b", "type": "Bar"}
                ]}"#,
            ),
            (
                "bar_local.avsc",
                r#"{"type": "enum", "name": "io.example.Bar", "symbols": ["X"]}"#,
            ),
            (
                "bar_global.avsc",
                r#"{"type": "enum", "name": "Bar", "symbols": ["Y"]}"#,
            ),
        ]);

        let mut diags = Diagnostics::new();
        let table = SymbolTable::build(&docs, &mut diags);
        let universe = resolve_references(&docs, &table, &mut diags);

        assert!(diags.is_empty());
        // io.example.Bar lives in document index 1.
        assert_eq!(universe.targets[0][0], vec![DeclId { doc: 1, decl: 0 }]);
    }

    #[test]
    fn bare_reference_falls_back_to_null_namespace() {
        let docs = parse_all(&[
            (
                "use.avsc",
                r#"{"type": "record", "name": "io.example.Use", "fields": [
                    {"name": "b", "type": "Bar"}
                ]}"#,
            ),
            (
                "bar.avsc",
                r#"{"type": "enum", "name": "Bar", "symbols": ["Y"]}"#,
            ),
        ]);

        let mut diags = Diagnostics::new();
        let table = SymbolTable::build(&docs, &mut diags);
        let universe = resolve_references(&docs, &table, &mut diags);

        assert!(diags.is_empty());
        assert_eq!(universe.targets[0][0], vec![DeclId { doc: 1, decl: 0 }]);
    }

    #[test]
    fn duplicate_definition_keeps_first_and_reports_both_locations() {
        let docs = parse_all(&[
            (
                "a.avsc",
                r#"{"type": "record", "name": "ns.Foo", "fields": []}"#,
            ),
            (
                "b.avsc",
                r#"{"type": "record", "name": "ns.Foo", "fields": []}"#,
            ),
        ]);

        let mut diags = Diagnostics::new();
        let table = SymbolTable::build(&docs, &mut diags);

        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.kind, DiagnosticKind::DuplicateDefinition);
        assert_eq!(diag.sources.len(), 2);
        assert_eq!(diag.sources[0].document, "a.avsc");
        assert_eq!(diag.sources[1].document, "b.avsc");
        assert_eq!(table.lookup("ns.Foo"), Some(DeclId { doc: 0, decl: 0 }));
    }

    #[test]
    fn unresolved_reference_is_reported_once_per_document_and_name() {
        let docs = parse_all(&[(
            "use.avsc",
            r#"{"type": "record", "name": "io.example.Use", "fields": [
                {"name": "a", "type": "Missing"},
                {"name": "b", "type": "Missing"}
            ]}"#,
        )]);

        let mut diags = Diagnostics::new();
        let table = SymbolTable::build(&docs, &mut diags);
        let universe = resolve_references(&docs, &table, &mut diags);

        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.iter().next().unwrap().kind,
            DiagnosticKind::UnresolvedReference
        );
        // Resolution failure leaves an empty target list, never a missing one.
        assert!(universe.targets[0][0].is_empty());
    }

    #[test]
    fn dangling_name_in_bare_union_document_is_reported() {
        let docs = parse_all(&[
            ("union.avsc", r#"["ns.Present", "ns.Missing"]"#),
            (
                "present.avsc",
                r#"{"type": "record", "name": "ns.Present", "fields": []}"#,
            ),
        ]);

        let mut diags = Diagnostics::new();
        let table = SymbolTable::build(&docs, &mut diags);
        let universe = resolve_references(&docs, &table, &mut diags);

        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.kind, DiagnosticKind::UnresolvedReference);
        assert!(diag.message.contains("ns.Missing"));
        assert_eq!(diag.sources[0].document, "union.avsc");
        // The present name still resolved at document level.
        assert_eq!(universe.document_targets[0], vec![DeclId { doc: 1, decl: 0 }]);
    }
}
