//! Schema normalization: raw JSON Schema fragments to flat field lists.
//!
//! Idempotent regardless of schema style: union branches are merged,
//! `$ref`s resolved where possible, nested objects and array items carried
//! as nested properties. Missing schemas yield empty field lists, not
//! errors.

use rayon::prelude::*;
use serde_json::{json, Map, Value};
use tracing::debug;

use toolvet_core::{FieldSpec, RawTool, ToolSpec};
use toolvet_embed::embed;

use crate::schema::{SchemaKind, SchemaNode};

/// Which side of the contract a schema describes. Decides the pseudo-field
/// name for non-object roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn pseudo_field_name(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// Knobs for one normalization pass.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Precompute the description embedding and per-field-name embeddings
    pub embeddings: bool,
    /// Normalize tools on the rayon pool instead of sequentially
    pub parallel: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            embeddings: true,
            parallel: true,
        }
    }
}

/// Normalize a whole batch, preserving input order.
pub fn normalize_tools(raw: &[RawTool], options: &NormalizeOptions) -> Vec<ToolSpec> {
    let specs: Vec<ToolSpec> = if options.parallel {
        raw.par_iter().map(|t| normalize_tool(t, options)).collect()
    } else {
        raw.iter().map(|t| normalize_tool(t, options)).collect()
    };
    debug!(tools = specs.len(), "normalized tool batch");
    specs
}

/// Normalize one tool.
pub fn normalize_tool(raw: &RawTool, options: &NormalizeOptions) -> ToolSpec {
    let mut spec = ToolSpec::new(
        raw.name.clone(),
        raw.description.clone().unwrap_or_default(),
    );
    spec.inputs = flatten_fields(&raw.name, raw.input_schema.as_ref(), Direction::Input);
    spec.outputs = flatten_fields(&raw.name, raw.output_schema.as_ref(), Direction::Output);

    if options.embeddings {
        spec.description_embedding = Some(embed(&spec.description));
        spec.input_embeddings = Some(
            spec.inputs
                .iter()
                .map(|f| (f.name.clone(), embed(&f.name)))
                .collect(),
        );
        spec.output_embeddings = Some(
            spec.outputs
                .iter()
                .map(|f| (f.name.clone(), embed(&f.name)))
                .collect(),
        );
    }
    spec
}

/// Flatten a schema fragment into top-level fields.
pub fn flatten_fields(tool: &str, schema: Option<&Value>, direction: Direction) -> Vec<FieldSpec> {
    let Some(value) = schema else {
        return Vec::new();
    };
    let node = SchemaNode::parse(value, value);
    flatten_node(tool, &node, direction)
}

fn flatten_node(tool: &str, node: &SchemaNode, direction: Direction) -> Vec<FieldSpec> {
    match &node.kind {
        SchemaKind::Union { branches } => branches
            .iter()
            .flat_map(|b| flatten_node(tool, b, direction))
            .collect(),
        SchemaKind::Object {
            properties,
            required,
        } => properties
            .iter()
            .map(|(name, child)| field_from(tool, name, child, required.contains(name)))
            .collect(),
        SchemaKind::Array { .. } | SchemaKind::Leaf => {
            // a typed non-object root still names one value the tool
            // accepts or produces; an untyped bare node names nothing
            if node.meta.type_name.is_none() && node.meta.enum_values.is_none() {
                return Vec::new();
            }
            vec![field_from(
                tool,
                direction.pseudo_field_name(),
                node,
                false,
            )]
        }
    }
}

fn field_from(tool: &str, name: &str, node: &SchemaNode, required: bool) -> FieldSpec {
    let mut field = FieldSpec::new(tool, name, node.meta.type_or_any());
    field.required = required;
    field.description = node.meta.description.clone();
    field.enum_values = node.meta.enum_values.clone();
    field.pattern = node.meta.pattern.clone();
    field.format = node.meta.format.clone();
    field.example = node.meta.example.clone();
    field.nullable = node.meta.nullable;

    match &node.kind {
        SchemaKind::Object {
            properties,
            required,
        } => {
            if !properties.is_empty() {
                field.properties = Some(
                    properties
                        .iter()
                        .map(|(child_name, child)| {
                            field_from(tool, child_name, child, required.contains(child_name))
                        })
                        .collect(),
                );
            }
        }
        SchemaKind::Array { items } => {
            let nested: Vec<FieldSpec> = items
                .iter()
                .flat_map(|item| match &item.kind {
                    SchemaKind::Object {
                        properties,
                        required,
                    } => properties
                        .iter()
                        .map(|(child_name, child)| {
                            field_from(tool, child_name, child, required.contains(child_name))
                        })
                        .collect::<Vec<_>>(),
                    _ => Vec::new(),
                })
                .collect();
            if !nested.is_empty() {
                field.properties = Some(nested);
            }
        }
        _ => {}
    }
    field
}

/// Rebuild a minimal JSON Schema from a field list.
///
/// `normalize(minimal_schema(fields)) == fields` is the idempotence law
/// the normalizer is tested against; the reconstruction is also what the
/// drift probes of the behavioral surface diff against.
pub fn minimal_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        if field.required {
            required.push(Value::String(field.name.clone()));
        }
        properties.insert(field.name.clone(), field_schema(field));
    }
    let mut out = Map::new();
    out.insert("type".to_string(), json!("object"));
    out.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        out.insert("required".to_string(), Value::Array(required));
    }
    Value::Object(out)
}

fn field_schema(field: &FieldSpec) -> Value {
    let mut out = Map::new();

    let parts: Vec<&str> = field.field_type.split('|').collect();
    let type_value = if field.nullable {
        let mut names: Vec<Value> = parts.iter().map(|p| json!(p)).collect();
        names.push(json!("null"));
        Value::Array(names)
    } else if parts.len() > 1 {
        Value::Array(parts.iter().map(|p| json!(p)).collect())
    } else {
        json!(field.field_type)
    };
    out.insert("type".to_string(), type_value);

    if let Some(description) = &field.description {
        out.insert("description".to_string(), json!(description));
    }
    if let Some(enum_values) = &field.enum_values {
        out.insert("enum".to_string(), json!(enum_values));
    }
    if let Some(pattern) = &field.pattern {
        out.insert("pattern".to_string(), json!(pattern));
    }
    if let Some(format) = &field.format {
        out.insert("format".to_string(), json!(format));
    }
    if let Some(example) = &field.example {
        out.insert("example".to_string(), example.clone());
    }

    if let Some(children) = &field.properties {
        if field.field_type == "array" {
            out.insert("items".to_string(), minimal_schema(children));
        } else {
            let nested = minimal_schema(children);
            if let Value::Object(nested) = nested {
                for (k, v) in nested {
                    out.insert(k, v);
                }
            }
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_embed() -> NormalizeOptions {
        NormalizeOptions {
            embeddings: false,
            parallel: false,
        }
    }

    fn tool_with_input(schema: Value) -> RawTool {
        RawTool::new("demo", "A demo tool").with_input_schema(schema)
    }

    #[test]
    fn missing_schemas_yield_empty_lists() {
        let spec = normalize_tool(&RawTool::new("bare", "no schemas"), &no_embed());
        assert!(spec.inputs.is_empty());
        assert!(spec.outputs.is_empty());
    }

    #[test]
    fn flat_object_schema() {
        let raw = tool_with_input(json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search text"},
                "limit": {"type": "integer", "example": 10}
            },
            "required": ["query"]
        }));
        let spec = normalize_tool(&raw, &no_embed());
        assert_eq!(spec.inputs.len(), 2);

        let query = spec.input("query").unwrap();
        assert!(query.required);
        assert_eq!(query.field_type, "string");
        assert_eq!(query.description.as_deref(), Some("Search text"));

        let limit = spec.input("limit").unwrap();
        assert!(!limit.required);
        assert_eq!(limit.example, Some(json!(10)));
    }

    #[test]
    fn union_branches_are_merged() {
        let raw = tool_with_input(json!({
            "anyOf": [
                {"type": "object", "properties": {"a": {"type": "string"}}},
                {"type": "object", "properties": {"b": {"type": "number"}}}
            ]
        }));
        let spec = normalize_tool(&raw, &no_embed());
        let names: Vec<&str> = spec.inputs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn nullable_union_type() {
        let raw = tool_with_input(json!({
            "type": "object",
            "properties": {"note": {"type": ["string", "null"]}}
        }));
        let spec = normalize_tool(&raw, &no_embed());
        let note = spec.input("note").unwrap();
        assert_eq!(note.field_type, "string");
        assert!(note.nullable);
    }

    #[test]
    fn sole_null_type_is_must_be_null() {
        let raw = tool_with_input(json!({
            "type": "object",
            "properties": {"tombstone": {"type": ["null"]}}
        }));
        let spec = normalize_tool(&raw, &no_embed());
        let field = spec.input("tombstone").unwrap();
        assert_eq!(field.field_type, "null");
        assert!(!field.nullable);
    }

    #[test]
    fn nested_object_recurses() {
        let raw = tool_with_input(json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "email": {"type": "string", "format": "email"}
                    },
                    "required": ["id"]
                }
            }
        }));
        let spec = normalize_tool(&raw, &no_embed());
        let user = spec.input("user").unwrap();
        let nested = user.properties.as_ref().unwrap();
        assert_eq!(nested.len(), 2);
        assert!(nested.iter().any(|f| f.name == "id" && f.required));
        assert!(nested
            .iter()
            .any(|f| f.name == "email" && f.format.as_deref() == Some("email")));
    }

    #[test]
    fn array_items_attach_as_properties() {
        let raw = tool_with_input(json!({
            "type": "object",
            "properties": {
                "tags": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"label": {"type": "string"}}
                    }
                }
            }
        }));
        let spec = normalize_tool(&raw, &no_embed());
        let tags = spec.input("tags").unwrap();
        assert_eq!(tags.field_type, "array");
        let nested = tags.properties.as_ref().unwrap();
        assert_eq!(nested[0].name, "label");
    }

    #[test]
    fn non_object_root_becomes_pseudo_field() {
        let raw = RawTool::new("echo", "Echo a value")
            .with_output_schema(json!({"type": "string"}));
        let spec = normalize_tool(&raw, &no_embed());
        assert_eq!(spec.outputs.len(), 1);
        assert_eq!(spec.outputs[0].name, "output");
        assert_eq!(spec.outputs[0].field_type, "string");
    }

    #[test]
    fn bare_empty_schema_names_nothing() {
        let raw = tool_with_input(json!({}));
        let spec = normalize_tool(&raw, &no_embed());
        assert!(spec.inputs.is_empty());
    }

    #[test]
    fn ref_failure_is_soft() {
        let raw = tool_with_input(json!({
            "type": "object",
            "properties": {"x": {"$ref": "#/definitions/Gone"}}
        }));
        let spec = normalize_tool(&raw, &no_embed());
        let x = spec.input("x").unwrap();
        assert_eq!(x.field_type, "any");
    }

    #[test]
    fn embeddings_precomputed_when_asked() {
        let raw = tool_with_input(json!({
            "type": "object",
            "properties": {"query": {"type": "string"}}
        }));
        let spec = normalize_tool(
            &raw,
            &NormalizeOptions {
                embeddings: true,
                parallel: false,
            },
        );
        let inputs = spec.input_embeddings.as_ref().unwrap();
        assert!(inputs.contains_key("query"));
        assert!(!inputs["query"].is_empty());
        assert!(spec.description_embedding.is_some());
    }

    #[test]
    fn normalization_is_idempotent_on_round_trip() {
        let raw = tool_with_input(json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search text", "pattern": "^[a-z]+$"},
                "mode": {"type": "string", "enum": ["fast", "full"]},
                "note": {"type": ["string", "null"]},
                "filters": {
                    "type": "object",
                    "properties": {"after": {"type": "string", "format": "date-time"}}
                }
            },
            "required": ["query"]
        }));
        let first = normalize_tool(&raw, &no_embed());
        let rebuilt = minimal_schema(&first.inputs);
        let second = flatten_fields("demo", Some(&rebuilt), Direction::Input);
        assert_eq!(first.inputs, second);
    }

    #[test]
    fn parallel_preserves_order() {
        let raws: Vec<RawTool> = (0..16)
            .map(|i| RawTool::new(format!("tool_{i}"), "One of many"))
            .collect();
        let specs = normalize_tools(
            &raws,
            &NormalizeOptions {
                embeddings: false,
                parallel: true,
            },
        );
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names[0], "tool_0");
        assert_eq!(names[15], "tool_15");
    }
}
