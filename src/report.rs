//! Resolution report.
//!
//! Pure aggregation structure built incrementally by the pipeline passes.
//! Diagnostics are appended in discovery order (parse errors first, then
//! duplicate definitions, then unresolved references, then cycles) and the
//! report is always returned to the caller, never thrown: a single run
//! surfaces the maximum number of actionable diagnostics.

use serde::Serialize;
use std::fmt;

use crate::document::SourcePos;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The failure class a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Malformed document; fatal to that document only.
    Parse,
    /// Two declarations claim the same fully-qualified name.
    DuplicateDefinition,
    /// A symbolic reference matches no declaration in the universe.
    UnresolvedReference,
    /// A dependency cycle; fatal to scheduling.
    CyclicDependency,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::DuplicateDefinition => "duplicate-definition",
            Self::UnresolvedReference => "unresolved-reference",
            Self::CyclicDependency => "cyclic-dependency",
        }
    }

    pub fn severity(&self) -> Severity {
        // Every current kind suppresses the emission plan. Warnings exist in
        // the model for future lint-style findings.
        Severity::Error
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A source location: document identifier plus line/column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub document: String,
    pub pos: SourcePos,
}

impl SourceRef {
    pub fn new(document: impl Into<String>, pos: SourcePos) -> Self {
        Self {
            document: document.into(),
            pos,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.document, self.pos)
    }
}

/// A single diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Offending location(s); cycles carry one per member.
    pub sources: Vec<SourceRef>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.sources.push(source);
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.severity(), self.message)?;
        if !self.sources.is_empty() {
            let locations: Vec<String> = self.sources.iter().map(|s| s.to_string()).collect();
            write!(f, " ({})", locations.join(", "))?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Diagnostic) {
        self.items.push(item);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(|i| i.severity() == Severity::Error)
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Dependency-respecting emission order: for every edge A→B, B precedes A.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmissionPlan {
    /// Node names in emission order: document source ids at document
    /// granularity, fully-qualified type names at type granularity.
    pub order: Vec<String>,
}

impl EmissionPlan {
    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The terminal output of one resolution pass.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub diagnostics: Diagnostics,
    /// Present only when no error-severity diagnostic exists.
    pub plan: Option<EmissionPlan>,
    /// SHA-256 over the input set; the external incremental-build cache key.
    pub content_hash: String,
}

impl ResolutionReport {
    /// A clean report carries a plan; anything else means "do not generate".
    pub fn is_clean(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_is_error_severity() {
        for kind in [
            DiagnosticKind::Parse,
            DiagnosticKind::DuplicateDefinition,
            DiagnosticKind::UnresolvedReference,
            DiagnosticKind::CyclicDependency,
        ] {
            assert_eq!(kind.severity(), Severity::Error);
        }
    }

    #[test]
    fn display_includes_kind_and_locations() {
        let diag = Diagnostic::error(DiagnosticKind::UnresolvedReference, "undefined name \"X\"")
            .with_source(SourceRef::new("a.avsc", SourcePos::new(3, 14)));
        assert_eq!(
            diag.to_string(),
            "[unresolved-reference] error: undefined name \"X\" (a.avsc:3:14)"
        );
    }

    #[test]
    fn diagnostics_preserve_insertion_order() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error(DiagnosticKind::Parse, "first"));
        diags.push(Diagnostic::error(DiagnosticKind::CyclicDependency, "second"));
        let kinds: Vec<_> = diags.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::Parse, DiagnosticKind::CyclicDependency]
        );
    }
}
