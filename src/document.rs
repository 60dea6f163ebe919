//! Parsed schema document model.
//!
//! Everything here is produced by the parser and immutable afterwards. The
//! resolver, graph builder, and scheduler only ever read these structures.

use serde::Serialize;
use std::fmt;

/// Line/column position within a source document (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    /// Position of the first byte of a document.
    pub const START: SourcePos = SourcePos { line: 1, column: 1 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Kind of a named declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Record,
    /// Record variant used for protocol error responses.
    Error,
    Enum,
    Fixed,
    Protocol,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Error => "error",
            Self::Enum => "enum",
            Self::Fixed => "fixed",
            Self::Protocol => "protocol",
        }
    }

    /// Maps an Avro complex-type tag to a declaration kind, if it names one.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "record" => Some(Self::Record),
            "error" => Some(Self::Error),
            "enum" => Some(Self::Enum),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A symbolic reference to a named type, as written in the source.
///
/// Inline definitions never become `TypeRef`s; they are flattened into the
/// declaration list of the containing document instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRef {
    /// The name exactly as written (bare or dot-qualified).
    pub name: String,
    /// Namespace context of the declaration making the reference. Bare names
    /// are resolved against this before falling back to the null namespace.
    pub namespace: Option<String>,
    /// Where the reference appears.
    pub pos: SourcePos,
}

impl TypeRef {
    /// Fully-qualified candidate names, in resolution order.
    pub fn candidates(&self) -> Vec<String> {
        if self.name.contains('.') {
            return vec![self.name.clone()];
        }
        match &self.namespace {
            Some(ns) => vec![format!("{}.{}", ns, self.name), self.name.clone()],
            None => vec![self.name.clone()],
        }
    }
}

/// A named type declared in a document.
///
/// Inline nested definitions are real declarations: they appear here in
/// encounter order, right after their enclosing declaration.
#[derive(Debug, Clone, Serialize)]
pub struct TypeDeclaration {
    /// Namespace-qualified name, unique across the whole input set.
    pub full_name: String,
    pub kind: TypeKind,
    /// Symbolic references made by this declaration, in field order.
    pub references: Vec<TypeRef>,
    /// Where the declaration's name appears.
    pub pos: SourcePos,
}

impl TypeDeclaration {
    pub fn namespace(&self) -> Option<&str> {
        self.full_name.rsplit_once('.').map(|(ns, _)| ns)
    }

    pub fn local_name(&self) -> &str {
        self.full_name
            .rsplit_once('.')
            .map(|(_, local)| local)
            .unwrap_or(&self.full_name)
    }
}

/// One parsed source unit. Owned by the parser output set; never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDocument {
    /// Path or logical name identifying the source.
    pub source_id: String,
    /// Document-level namespace, if any.
    pub namespace: Option<String>,
    /// Declarations in document order, inline definitions included.
    pub declarations: Vec<TypeDeclaration>,
    /// References made outside any declaration: a document that is just a
    /// name, or a union of names, declares nothing but still depends on what
    /// it names. References satisfied by the document's own declarations are
    /// dropped at parse time.
    pub references: Vec<TypeRef>,
}

impl SchemaDocument {
    /// All fully-qualified names declared by this document, in order.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().map(|d| d.full_name.as_str())
    }
}
