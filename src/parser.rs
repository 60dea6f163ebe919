//! Schema document parsing.
//!
//! Turns the raw text of one Avro-style definition file (`.avsc` named type
//! or `.avpr` protocol) into a [`SchemaDocument`]: the ordered list of named
//! declarations it makes, each with the symbolic references it carries.
//!
//! Parsing is per-document and pure. References to names declared elsewhere
//! (or later) are kept symbolic; resolution happens in a separate pass once
//! every document has been parsed. Inline nested definitions are flattened
//! into the declaration list in encounter order, so a field whose type is a
//! freshly-declared record registers that record for the whole universe.
//! A document that declares nothing, such as a top-level union of bare
//! names, carries its references on the document itself.

use serde_json::Value;

use crate::document::{SchemaDocument, SourcePos, TypeDeclaration, TypeKind, TypeRef};

/// A failed parse of a single document. Fatal to that document only; the
/// batch continues with the remaining documents.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub pos: SourcePos,
    pub message: String,
}

impl ParseFailure {
    fn new(pos: SourcePos, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }
}

/// Avro primitive type names. These never produce references.
const PRIMITIVES: &[&str] = &[
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

fn is_primitive(name: &str) -> bool {
    PRIMITIVES.contains(&name)
}

/// Parse one document in isolation.
pub fn parse_document(source_id: &str, text: &str) -> Result<SchemaDocument, ParseFailure> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        ParseFailure::new(
            SourcePos::new(e.line().max(1) as u32, e.column().max(1) as u32),
            format!("malformed JSON: {}", e),
        )
    })?;

    let mut walker = Walker::new(text);

    let namespace = value
        .as_object()
        .and_then(|o| o.get("namespace"))
        .and_then(|v| v.as_str())
        .map(str::to_owned);

    let mut document_refs = Vec::new();
    if value.as_object().map(|o| o.contains_key("protocol")) == Some(true) {
        walker.walk_protocol(&value)?;
    } else {
        walker.walk_type(&value, namespace.as_deref(), &mut document_refs)?;
    }

    // A reference satisfied by the document's own declarations carries no
    // information; what stays is the document's own dependencies on the
    // outside world.
    document_refs.retain(|r| !walker.declarations.iter().any(|d| d.full_name == r.name));

    Ok(SchemaDocument {
        source_id: source_id.to_owned(),
        namespace,
        declarations: walker.declarations,
        references: document_refs,
    })
}

/// Recursive JSON walk with position tracking.
///
/// Positions come from scanning the raw text for the quoted token in source
/// order; the cursor only moves forward, so repeated names land on their own
/// occurrences.
struct Walker<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
    cursor: usize,
    declarations: Vec<TypeDeclaration>,
}

impl<'a> Walker<'a> {
    fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            text,
            line_starts,
            cursor: 0,
            declarations: Vec::new(),
        }
    }

    fn locate(&self, offset: usize) -> SourcePos {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(l) => l,
            Err(l) => l - 1,
        };
        SourcePos::new(
            (line + 1) as u32,
            (offset - self.line_starts[line] + 1) as u32,
        )
    }

    /// Position of the next occurrence of `token` as a quoted JSON string,
    /// advancing the scan cursor past it.
    fn position_of(&mut self, token: &str) -> SourcePos {
        let needle = format!("\"{}\"", token);
        match self.text[self.cursor..].find(&needle) {
            Some(off) => {
                let abs = self.cursor + off;
                self.cursor = abs + needle.len();
                self.locate(abs + 1)
            }
            None => self.locate(self.cursor.min(self.text.len())),
        }
    }

    fn here(&self) -> SourcePos {
        self.locate(self.cursor.min(self.text.len()))
    }

    /// Walk a value appearing in type position, collecting symbolic
    /// references into `refs`. `ns` is the namespace context of the
    /// declaration making the reference.
    fn walk_type(
        &mut self,
        value: &Value,
        ns: Option<&str>,
        refs: &mut Vec<TypeRef>,
    ) -> Result<(), ParseFailure> {
        match value {
            Value::String(name) => {
                if !is_primitive(name) {
                    let pos = self.position_of(name);
                    refs.push(TypeRef {
                        name: name.clone(),
                        namespace: ns.map(str::to_owned),
                        pos,
                    });
                }
                Ok(())
            }
            // Union: every branch is a type in its own right.
            Value::Array(branches) => {
                for branch in branches {
                    self.walk_type(branch, ns, refs)?;
                }
                Ok(())
            }
            Value::Object(obj) => {
                let Some(tag) = obj.get("type") else {
                    return Err(ParseFailure::new(
                        self.here(),
                        "expected a type, found an object without a \"type\" attribute",
                    ));
                };
                match tag {
                    Value::String(tag) => {
                        if let Some(kind) = TypeKind::from_tag(tag) {
                            // Inline definition: declare it, then record the
                            // containing declaration's dependency on it.
                            let (full_name, pos) = self.walk_declaration(obj, kind, ns)?;
                            refs.push(TypeRef {
                                name: full_name,
                                namespace: None,
                                pos,
                            });
                            Ok(())
                        } else if tag == "array" {
                            match obj.get("items") {
                                Some(items) => self.walk_type(items, ns, refs),
                                None => Err(ParseFailure::new(
                                    self.here(),
                                    "array type is missing \"items\"",
                                )),
                            }
                        } else if tag == "map" {
                            match obj.get("values") {
                                Some(values) => self.walk_type(values, ns, refs),
                                None => Err(ParseFailure::new(
                                    self.here(),
                                    "map type is missing \"values\"",
                                )),
                            }
                        } else {
                            // Primitive (possibly annotated with a logical
                            // type) or a named reference written in object
                            // form.
                            self.walk_type(&Value::String(tag.clone()), ns, refs)
                        }
                    }
                    // A field's type may itself be any schema.
                    nested @ (Value::Object(_) | Value::Array(_)) => {
                        self.walk_type(nested, ns, refs)
                    }
                    other => Err(ParseFailure::new(
                        self.here(),
                        format!("expected a type, found {}", json_kind(other)),
                    )),
                }
            }
            other => Err(ParseFailure::new(
                self.here(),
                format!("expected a type, found {}", json_kind(other)),
            )),
        }
    }

    /// Walk a named definition (record, error, enum, fixed), registering it
    /// as a declaration. Returns its fully-qualified name and position.
    fn walk_declaration(
        &mut self,
        obj: &serde_json::Map<String, Value>,
        kind: TypeKind,
        inherited_ns: Option<&str>,
    ) -> Result<(String, SourcePos), ParseFailure> {
        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ParseFailure::new(
                    self.here(),
                    format!("{} definition is missing a \"name\"", kind),
                )
            })?
            .to_owned();

        let pos = self.position_of(&name);

        // A dotted name is already fully qualified and overrides any
        // namespace attribute; a bare name takes the explicit attribute
        // first, then the enclosing context.
        let full_name = if name.contains('.') {
            name
        } else {
            let ns = obj
                .get("namespace")
                .and_then(|v| v.as_str())
                .or(inherited_ns);
            match ns {
                Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
                _ => name,
            }
        };
        let child_ns = full_name
            .rsplit_once('.')
            .map(|(ns, _)| ns.to_owned());

        // Reserve the slot first so the enclosing declaration precedes any
        // inline definitions found inside its fields.
        let index = self.declarations.len();
        self.declarations.push(TypeDeclaration {
            full_name: full_name.clone(),
            kind,
            references: Vec::new(),
            pos,
        });

        let mut refs = Vec::new();
        match kind {
            TypeKind::Record | TypeKind::Error => {
                let fields = obj.get("fields").and_then(|v| v.as_array()).ok_or_else(|| {
                    ParseFailure::new(
                        pos,
                        format!("{} \"{}\" is missing a \"fields\" array", kind, full_name),
                    )
                })?;
                for field in fields {
                    let field_type = field.get("type").ok_or_else(|| {
                        ParseFailure::new(
                            pos,
                            format!("field of \"{}\" is missing a \"type\"", full_name),
                        )
                    })?;
                    self.walk_type(field_type, child_ns.as_deref(), &mut refs)?;
                }
            }
            // Enums and fixeds carry no type references; their remaining
            // attributes are irrelevant to dependency extraction.
            TypeKind::Enum | TypeKind::Fixed => {}
            TypeKind::Protocol => unreachable!("protocols are walked separately"),
        }

        self.declarations[index].references = refs;
        Ok((full_name, pos))
    }

    /// Walk a protocol document: its `types` are declarations, its messages
    /// contribute references.
    fn walk_protocol(&mut self, value: &Value) -> Result<(), ParseFailure> {
        let obj = value.as_object().expect("checked by caller");
        let name = obj
            .get("protocol")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseFailure::new(self.here(), "\"protocol\" must be a string"))?
            .to_owned();

        let pos = self.position_of(&name);
        let ns = obj.get("namespace").and_then(|v| v.as_str());
        let full_name = match (name.contains('.'), ns) {
            (true, _) => name,
            (false, Some(ns)) if !ns.is_empty() => format!("{}.{}", ns, name),
            _ => name,
        };
        let child_ns = full_name.rsplit_once('.').map(|(ns, _)| ns.to_owned());

        let index = self.declarations.len();
        self.declarations.push(TypeDeclaration {
            full_name: full_name.clone(),
            kind: TypeKind::Protocol,
            references: Vec::new(),
            pos,
        });

        let mut refs = Vec::new();

        if let Some(types) = obj.get("types") {
            let types = types.as_array().ok_or_else(|| {
                ParseFailure::new(pos, format!("\"types\" of protocol \"{}\" must be an array", full_name))
            })?;
            for ty in types {
                // Each entry is an inline named definition.
                self.walk_type(ty, child_ns.as_deref(), &mut refs)?;
            }
        }

        if let Some(messages) = obj.get("messages").and_then(|v| v.as_object()) {
            for message in messages.values() {
                if let Some(request) = message.get("request").and_then(|v| v.as_array()) {
                    for param in request {
                        if let Some(param_type) = param.get("type") {
                            self.walk_type(param_type, child_ns.as_deref(), &mut refs)?;
                        }
                    }
                }
                if let Some(response) = message.get("response") {
                    self.walk_type(response, child_ns.as_deref(), &mut refs)?;
                }
                if let Some(errors) = message.get("errors").and_then(|v| v.as_array()) {
                    for error in errors {
                        self.walk_type(error, child_ns.as_deref(), &mut refs)?;
                    }
                }
            }
        }

        self.declarations[index].references = refs;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
