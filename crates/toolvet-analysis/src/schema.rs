//! JSON Schema fragments as a sum type.
//!
//! Servers write schemas in wildly different styles: inline `$ref`s,
//! `oneOf` unions, nullable unions, typed arrays. Parsing into one AST up
//! front means the normalizer is a single match instead of a pile of
//! `Value` probing.
//!
//! `$ref` resolution is internal-only (JSON Pointer into the root
//! fragment) and soft: a pointer that does not resolve, or a chain deeper
//! than [`MAX_REF_DEPTH`], leaves the original node in place.

use serde_json::Value;

/// Reference chains deeper than this are treated as unresolvable.
pub const MAX_REF_DEPTH: usize = 32;

/// Metadata every schema node may carry, regardless of kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMeta {
    /// Normalized type: a primitive, `any`, or a `|`-joined union with
    /// `null` stripped. Empty when the node carried no explicit type.
    pub type_name: Option<String>,
    pub description: Option<String>,
    pub enum_values: Option<Vec<String>>,
    pub pattern: Option<String>,
    pub format: Option<String>,
    pub example: Option<Value>,
    /// True iff `nullable: true` or `"null"` appeared in a union of types.
    /// A sole `"null"` type means must-be-null and sets `type_name` instead.
    pub nullable: bool,
}

impl SchemaMeta {
    /// The normalized type, with the missing-type sentinel applied.
    pub fn type_or_any(&self) -> String {
        self.type_name.clone().unwrap_or_else(|| "any".to_string())
    }
}

/// Structural kind of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// `type: object` (or untyped with `properties`)
    Object {
        /// Property name -> schema, in `serde_json` map order
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
    },
    /// `type: array`; one entry per `items` schema (single or list)
    Array { items: Vec<SchemaNode> },
    /// Non-empty `oneOf`/`anyOf`/`allOf`, branches in declaration order
    Union { branches: Vec<SchemaNode> },
    /// Anything else: a primitive, an untyped node, an unresolved `$ref`
    Leaf,
}

/// One parsed schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub meta: SchemaMeta,
    pub kind: SchemaKind,
}

impl SchemaNode {
    /// Parse a schema fragment. `root` is the document `$ref` pointers
    /// resolve against; for a standalone fragment pass the fragment itself.
    pub fn parse(value: &Value, root: &Value) -> Self {
        parse_node(value, root, 0)
    }
}

fn parse_node(value: &Value, root: &Value, depth: usize) -> SchemaNode {
    let Some(obj) = value.as_object() else {
        // booleans and other non-object nodes carry no contract information
        return SchemaNode {
            meta: SchemaMeta::default(),
            kind: SchemaKind::Leaf,
        };
    };

    // Dereference before walking; failure keeps the original node.
    if let Some(Value::String(pointer)) = obj.get("$ref") {
        if depth < MAX_REF_DEPTH {
            if let Some(target) = resolve_pointer(root, pointer) {
                return parse_node(target, root, depth + 1);
            }
        }
    }

    let meta = parse_meta(obj);

    let mut branches = Vec::new();
    for key in ["oneOf", "anyOf", "allOf"] {
        if let Some(Value::Array(items)) = obj.get(key) {
            for item in items {
                branches.push(parse_node(item, root, depth + 1));
            }
        }
    }
    if !branches.is_empty() {
        return SchemaNode {
            meta,
            kind: SchemaKind::Union { branches },
        };
    }

    let is_object = meta.type_name.as_deref() == Some("object")
        || (meta.type_name.is_none() && obj.contains_key("properties"));
    if is_object {
        let mut properties = Vec::new();
        if let Some(Value::Object(props)) = obj.get("properties") {
            for (name, child) in props {
                properties.push((name.clone(), parse_node(child, root, depth + 1)));
            }
        }
        let required = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|r| {
                r.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let mut meta = meta;
        meta.type_name = Some("object".to_string());
        return SchemaNode {
            meta,
            kind: SchemaKind::Object {
                properties,
                required,
            },
        };
    }

    if meta.type_name.as_deref() == Some("array") {
        let items = match obj.get("items") {
            Some(Value::Array(list)) => list
                .iter()
                .map(|item| parse_node(item, root, depth + 1))
                .collect(),
            Some(single) => vec![parse_node(single, root, depth + 1)],
            None => Vec::new(),
        };
        return SchemaNode {
            meta,
            kind: SchemaKind::Array { items },
        };
    }

    SchemaNode {
        meta,
        kind: SchemaKind::Leaf,
    }
}

fn parse_meta(obj: &serde_json::Map<String, Value>) -> SchemaMeta {
    let mut nullable = obj.get("nullable").and_then(Value::as_bool).unwrap_or(false);

    let type_name = match obj.get("type") {
        Some(Value::String(t)) => Some(t.clone()),
        Some(Value::Array(types)) => {
            let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
            let non_null: Vec<&str> = names.iter().copied().filter(|t| *t != "null").collect();
            if names.len() > non_null.len() && !non_null.is_empty() {
                nullable = true;
            }
            if names.is_empty() {
                Some("any".to_string())
            } else if non_null.is_empty() {
                // sole "null": must be null, not nullable
                Some("null".to_string())
            } else {
                Some(non_null.join("|"))
            }
        }
        _ => None,
    };

    let enum_values = obj.get("enum").and_then(Value::as_array).map(|values| {
        values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    });

    let example = obj
        .get("examples")
        .and_then(Value::as_array)
        .and_then(|e| e.first())
        .or_else(|| obj.get("example"))
        .cloned();

    SchemaMeta {
        type_name,
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        enum_values,
        pattern: obj
            .get("pattern")
            .and_then(Value::as_str)
            .map(str::to_string),
        format: obj
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_string),
        example,
        nullable,
    }
}

/// Resolve an internal `#/a/b` JSON Pointer. External references and
/// malformed pointers return `None`.
fn resolve_pointer<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(root);
    }
    root.pointer(pointer)
}
