//! Tool metadata as declared by a server, and its normalized form.
//!
//! [`RawTool`] is what the loader hands over: a name and up to three opaque
//! JSON fragments. [`ToolSpec`] is what the rest of the pipeline consumes:
//! flattened [`FieldSpec`] lists per direction, description tokens, and
//! optional precomputed embeddings.
//!
//! Nothing here is mutated after construction; one analysis run builds its
//! tool set once and discards it at the end.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::AnalyzerError;
use crate::text;

/// A fixed-dimension, L2-normalized embedding vector.
///
/// Produced by `toolvet-embed`; an empty vector means "no embedding" and
/// every similarity against it is zero.
pub type Embedding = Vec<f32>;

/// A tool exactly as the MCP server declared it.
///
/// The loader produces one `RawTool` per entry of `tools/list`, preserving
/// order. Schemas stay opaque at this layer; the normalizer owns their
/// interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTool {
    /// Tool name; must be non-empty. Duplicates are retained and flagged
    /// by a rule, not rejected here.
    pub name: String,
    /// Human-readable description, if the server sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema fragment for the tool's arguments
    #[serde(
        default,
        rename = "inputSchema",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<Value>,
    /// JSON Schema fragment for the tool's result
    #[serde(
        default,
        rename = "outputSchema",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_schema: Option<Value>,
}

impl RawTool {
    /// Create a raw tool with just a name and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema: None,
            output_schema: None,
        }
    }

    /// Attach an input schema fragment.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// Attach an output schema fragment.
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

/// Reject the whole batch if any tool arrived without a usable name.
///
/// The error names the 0-based index of the offending entry so the operator
/// can find it in the server's `tools/list` response. Duplicate names pass —
/// they are a contract defect, not a loader defect.
pub fn validate_batch(tools: &[RawTool]) -> Result<(), AnalyzerError> {
    for (index, tool) in tools.iter().enumerate() {
        if tool.name.trim().is_empty() {
            return Err(AnalyzerError::configuration(format!(
                "tool at index {index} has no name"
            )));
        }
    }
    Ok(())
}

/// One flattened field of a tool contract.
///
/// The normalizer produces these from arbitrary JSON Schema fragments;
/// nested objects and array element schemas recurse into `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Name of the tool this field belongs to
    pub tool: String,
    /// Field name (property key, or `input`/`output` for non-object roots)
    pub name: String,
    /// Normalized type: a JSON Schema primitive, `any`, or a `|`-joined
    /// union with `null` stripped
    pub field_type: String,
    /// Whether the parent schema lists this field as required.
    /// Meaningful for inputs; outputs carry the declared flag so relational
    /// rules can see optional upstream values.
    pub required: bool,
    /// Field-level description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Enum members, stringified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Regex pattern constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Format tag such as `email`, `uri`, `date-time`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// First example value (`examples[0]`, else `example`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// True iff the schema declared `nullable: true` or listed `"null"`
    /// among a union of types. A sole `"null"` type means must-be-null
    /// and is not nullable.
    #[serde(default)]
    pub nullable: bool,
    /// Nested fields for object and array element schemas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<FieldSpec>>,
}

impl FieldSpec {
    /// Minimal field with just tool, name and type; everything else defaulted.
    pub fn new(
        tool: impl Into<String>,
        name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            name: name.into(),
            field_type: field_type.into(),
            required: false,
            description: None,
            enum_values: None,
            pattern: None,
            format: None,
            example: None,
            nullable: false,
            properties: None,
        }
    }

    /// Mark the field required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Whether the type is broad enough that an agent cannot guess the
    /// expected shape without further constraints.
    pub fn is_broad(&self) -> bool {
        matches!(self.field_type.as_str(), "string" | "any" | "object")
    }

    /// Whether the field carries any constraint an agent could use:
    /// description, enum, pattern, or example.
    pub fn has_any_constraint(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.trim().is_empty())
            || self.enum_values.is_some()
            || self.pattern.is_some()
            || self.example.is_some()
    }

    /// Maximum nesting depth below this field; a leaf is depth 1.
    pub fn depth(&self) -> usize {
        match &self.properties {
            Some(children) => 1 + children.iter().map(FieldSpec::depth).max().unwrap_or(0),
            None => 1,
        }
    }

    /// Count of this field plus all nested fields.
    pub fn field_count(&self) -> usize {
        1 + self
            .properties
            .iter()
            .flatten()
            .map(FieldSpec::field_count)
            .sum::<usize>()
    }
}

/// A normalized tool: the unit the indexes, the dependency inferencer, and
/// every rule operate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, as declared (original case preserved)
    pub name: String,
    /// Description; empty string when the server sent none
    pub description: String,
    /// Flattened input fields
    pub inputs: Vec<FieldSpec>,
    /// Flattened output fields
    pub outputs: Vec<FieldSpec>,
    /// Lowercase alphanumeric tokens of length >= 3 from name + description
    pub description_tokens: Vec<String>,
    /// Embedding of the description text, when precomputed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_embedding: Option<Embedding>,
    /// Input field name -> embedding, when precomputed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_embeddings: Option<BTreeMap<String, Embedding>>,
    /// Output field name -> embedding, when precomputed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_embeddings: Option<BTreeMap<String, Embedding>>,
}

impl ToolSpec {
    /// Build a spec with tokens derived from name + description.
    /// Embeddings start absent; the normalizer fills them in when asked.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let description = description.into();
        let description_tokens = text::tokens(&format!("{name} {description}"));
        Self {
            name,
            description,
            inputs: Vec::new(),
            outputs: Vec::new(),
            description_tokens,
            description_embedding: None,
            input_embeddings: None,
            output_embeddings: None,
        }
    }

    /// Look up a top-level output field by name.
    pub fn output(&self, name: &str) -> Option<&FieldSpec> {
        self.outputs.iter().find(|f| f.name == name)
    }

    /// Look up a top-level input field by name.
    pub fn input(&self, name: &str) -> Option<&FieldSpec> {
        self.inputs.iter().find(|f| f.name == name)
    }

    /// Required top-level inputs, in declaration order.
    pub fn required_inputs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.inputs.iter().filter(|f| f.required)
    }
}
