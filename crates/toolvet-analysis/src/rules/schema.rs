//! Structural rules: defects visible in a single tool's declared schema.

use serde_json::json;

use toolvet_core::{Diagnostic, FieldSpec, Severity};
use toolvet_embed::{is_concept_match, Concept};

use crate::context::AnalysisContext;
use crate::engine::Rule;

use super::identifier_mentioned;

/// E100: a tool that plainly produces data declares no output schema.
/// Purely side-effecting tools need not return data, so the rule only
/// fires when the description reads like a data fetch or the tool takes
/// inputs at all.
pub struct MissingOutputSchema;

impl Rule for MissingOutputSchema {
    fn code(&self) -> &'static str {
        "E100"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Missing Output Schema"
    }
    fn description(&self) -> &'static str {
        "Tools that return data must declare an output schema so downstream \
         consumers know what to expect"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            if !tool.outputs.is_empty() {
                continue;
            }
            let returns_data = tool
                .description_embedding
                .as_deref()
                .map(|v| is_concept_match(v, Concept::ReturnsData, 0.45))
                .unwrap_or(false);
            if returns_data || !tool.inputs.is_empty() {
                out.push(
                    Diagnostic::error(
                        self.code(),
                        format!("Tool '{}' declares no output schema", tool.name),
                    )
                    .with_tool(&tool.name)
                    .with_suggestion(
                        "Declare an output schema, or document that the tool is purely \
                         side-effecting",
                    ),
                );
            }
        }
        out
    }
}

/// E101: empty or whitespace-only description.
pub struct MissingToolDescription;

impl Rule for MissingToolDescription {
    fn code(&self) -> &'static str {
        "E101"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Missing Tool Description"
    }
    fn description(&self) -> &'static str {
        "An agent cannot choose between tools it has no description for"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        ctx.tools
            .iter()
            .filter(|t| t.description.trim().is_empty())
            .map(|t| {
                Diagnostic::error(self.code(), format!("Tool '{}' has no description", t.name))
                    .with_tool(&t.name)
            })
            .collect()
    }
}

/// E102: a broad-typed input (`string`, `any`, `object`) with no
/// description, enum, pattern, or example. Required inputs get the error;
/// optional ones the same code at warning severity.
pub struct UnderspecifiedRequiredInput;

impl Rule for UnderspecifiedRequiredInput {
    fn code(&self) -> &'static str {
        "E102"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Underspecified Required Input"
    }
    fn description(&self) -> &'static str {
        "A broad-typed input with no constraints leaves the agent guessing \
         what to send"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in &tool.inputs {
                if !field.is_broad() || field.has_any_constraint() {
                    continue;
                }
                let diagnostic = if field.required {
                    Diagnostic::error(
                        self.code(),
                        format!(
                            "Required input '{}' of tool '{}' is a bare {} with no \
                             description, enum, pattern, or example",
                            field.name, tool.name, field.field_type
                        ),
                    )
                } else {
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Optional input '{}' of tool '{}' is a bare {} with no \
                             description, enum, pattern, or example",
                            field.name, tool.name, field.field_type
                        ),
                    )
                };
                out.push(
                    diagnostic
                        .with_tool(&tool.name)
                        .with_field(&field.name)
                        .with_suggestion("Add a description, an enum, a pattern, or an example"),
                );
            }
        }
        out
    }
}

/// E109: output types that cannot cross a JSON wire.
pub struct NonSerializableOutput;

const NON_SERIALIZABLE: &[&str] = &["function", "undefined", "symbol", "bigint"];

impl Rule for NonSerializableOutput {
    fn code(&self) -> &'static str {
        "E109"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Non-Serializable Output"
    }
    fn description(&self) -> &'static str {
        "Declared output types must survive JSON serialization"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in &tool.outputs {
                if NON_SERIALIZABLE.contains(&field.field_type.as_str()) {
                    out.push(
                        Diagnostic::error(
                            self.code(),
                            format!(
                                "Output '{}' of tool '{}' has non-serializable type '{}'",
                                field.name, tool.name, field.field_type
                            ),
                        )
                        .with_tool(&tool.name)
                        .with_field(&field.name),
                    );
                }
            }
        }
        out
    }
}

/// E113: case-insensitive tool name collisions. One diagnostic per
/// collision group, naming every variant in declaration order.
pub struct DuplicateToolNames;

impl Rule for DuplicateToolNames {
    fn code(&self) -> &'static str {
        "E113"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Duplicate Tool Names"
    }
    fn description(&self) -> &'static str {
        "Colliding names make tool selection ambiguous for the agent"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut groups: Vec<(String, Vec<&str>)> = Vec::new();
        for tool in &ctx.tools {
            let key = tool.name.to_lowercase();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(&tool.name),
                None => groups.push((key, vec![&tool.name])),
            }
        }
        groups
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(_, members)| {
                Diagnostic::error(
                    self.code(),
                    format!("Duplicate tool names: {}", members.join(", ")),
                )
                .with_context(json!({ "variants": members }))
            })
            .collect()
    }
}

/// W101: a string output with no enum, pattern, or description gives the
/// next tool in a chain nothing to validate against.
pub struct FreeTextOutput;

impl Rule for FreeTextOutput {
    fn code(&self) -> &'static str {
        "W101"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Free-Text Output Without Normalization"
    }
    fn description(&self) -> &'static str {
        "String outputs should carry an enum, a pattern, or at least a \
         description"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in &tool.outputs {
                let unconstrained = field.field_type == "string"
                    && field.enum_values.is_none()
                    && field.pattern.is_none()
                    && field
                        .description
                        .as_deref()
                        .map_or(true, |d| d.trim().is_empty());
                if unconstrained {
                    out.push(
                        Diagnostic::warning(
                            self.code(),
                            format!(
                                "Output '{}' of tool '{}' is free text with no \
                                 normalization hint",
                                field.name, tool.name
                            ),
                        )
                        .with_tool(&tool.name)
                        .with_field(&field.name),
                    );
                }
            }
        }
        out
    }
}

/// W106: outputs so broad they carry no shape at all.
pub struct BroadOutputSchema;

impl Rule for BroadOutputSchema {
    fn code(&self) -> &'static str {
        "W106"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Broad Output Schema"
    }
    fn description(&self) -> &'static str {
        "An output typed `any`, or an object with no properties, tells the \
         consumer nothing"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in &tool.outputs {
                let broad = field.field_type == "any"
                    || (field.field_type == "object"
                        && field.properties.as_ref().map_or(true, Vec::is_empty));
                if broad {
                    out.push(
                        Diagnostic::warning(
                            self.code(),
                            format!(
                                "Output '{}' of tool '{}' has no usable shape ({})",
                                field.name, tool.name, field.field_type
                            ),
                        )
                        .with_tool(&tool.name)
                        .with_field(&field.name),
                    );
                }
            }
        }
        out
    }
}

/// W111: description length outside [20, 500]. Empty descriptions are
/// E101's finding, not this one's.
pub struct DescriptionQuality;

impl Rule for DescriptionQuality {
    fn code(&self) -> &'static str {
        "W111"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Description Quality"
    }
    fn description(&self) -> &'static str {
        "Very short descriptions underspecify; very long ones burn context \
         window"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            let len = tool.description.trim().chars().count();
            if len == 0 {
                continue;
            }
            if len < 20 {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Description of tool '{}' is only {len} characters",
                            tool.name
                        ),
                    )
                    .with_tool(&tool.name),
                );
            } else if len > 500 {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Description of tool '{}' is {len} characters; trim it \
                             below 500",
                            tool.name
                        ),
                    )
                    .with_tool(&tool.name),
                );
            }
        }
        out
    }
}

/// W112: more than 20 tools on one server dilutes tool selection.
pub struct ToolCount;

impl Rule for ToolCount {
    fn code(&self) -> &'static str {
        "W112"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Tool Count"
    }
    fn description(&self) -> &'static str {
        "Agents pick tools less reliably from very large menus"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        if ctx.tools.len() > 20 {
            vec![Diagnostic::warning(
                self.code(),
                format!(
                    "Server exposes {} tools; consider splitting or grouping",
                    ctx.tools.len()
                ),
            )]
        } else {
            Vec::new()
        }
    }
}

/// W113: optional inputs with neither example nor enum tend to be left
/// out or guessed wrong.
pub struct OptionalParameterMissingExample;

impl Rule for OptionalParameterMissingExample {
    fn code(&self) -> &'static str {
        "W113"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Optional Parameter Missing Example"
    }
    fn description(&self) -> &'static str {
        "Optional inputs need an example or an enum to be used correctly"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in &tool.inputs {
                if !field.required && field.example.is_none() && field.enum_values.is_none() {
                    out.push(
                        Diagnostic::warning(
                            self.code(),
                            format!(
                                "Optional input '{}' of tool '{}' has no example or enum",
                                field.name, tool.name
                            ),
                        )
                        .with_tool(&tool.name)
                        .with_field(&field.name),
                    );
                }
            }
        }
        out
    }
}

/// W114: nesting deeper than 3 levels.
pub struct SchemaDepth;

const MAX_DEPTH: usize = 3;

impl Rule for SchemaDepth {
    fn code(&self) -> &'static str {
        "W114"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Schema Depth"
    }
    fn description(&self) -> &'static str {
        "Deeply nested schemas are hard for agents to fill correctly"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in tool.inputs.iter().chain(&tool.outputs) {
                let depth = field.depth();
                if depth > MAX_DEPTH {
                    out.push(
                        Diagnostic::warning(
                            self.code(),
                            format!(
                                "Field '{}' of tool '{}' nests {depth} levels deep",
                                field.name, tool.name
                            ),
                        )
                        .with_tool(&tool.name)
                        .with_field(&field.name),
                    );
                }
            }
        }
        out
    }
}

/// W115: estimated context cost of the contract, chars/4 plus 20 per
/// field (nested fields included).
pub struct TokenCost;

const TOKEN_BUDGET: usize = 1000;

impl Rule for TokenCost {
    fn code(&self) -> &'static str {
        "W115"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Token Cost"
    }
    fn description(&self) -> &'static str {
        "Oversized contracts crowd the agent's context window"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            let fields: usize = tool
                .inputs
                .iter()
                .chain(&tool.outputs)
                .map(FieldSpec::field_count)
                .sum();
            let estimate = tool.description.chars().count() / 4 + 20 * fields;
            if estimate > TOKEN_BUDGET {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Contract of tool '{}' costs roughly {estimate} tokens",
                            tool.name
                        ),
                    )
                    .with_tool(&tool.name)
                    .with_context(json!({ "estimatedTokens": estimate, "fields": fields })),
                );
            }
        }
        out
    }
}

/// W116: the description never mentions at least half of the schema's
/// field names (names longer than 3 characters considered).
pub struct SchemaDescriptionDrift;

impl Rule for SchemaDescriptionDrift {
    fn code(&self) -> &'static str {
        "W116"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Schema-Description Drift"
    }
    fn description(&self) -> &'static str {
        "When the description ignores most of the schema, one of them is \
         stale"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            let candidates: Vec<&FieldSpec> = tool
                .inputs
                .iter()
                .chain(&tool.outputs)
                .filter(|f| f.name.len() > 3)
                .collect();
            if candidates.is_empty() {
                continue;
            }
            let unmentioned: Vec<&str> = candidates
                .iter()
                .filter(|f| !identifier_mentioned(&f.name, &tool.description))
                .map(|f| f.name.as_str())
                .collect();
            if unmentioned.len() * 2 >= candidates.len() {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Description of tool '{}' never mentions {} of its {} fields",
                            tool.name,
                            unmentioned.len(),
                            candidates.len()
                        ),
                    )
                    .with_tool(&tool.name)
                    .with_context(json!({ "unmentioned": unmentioned })),
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolvet_core::RawTool;

    use crate::context::AnalysisContext;
    use crate::normalize::{normalize_tools, NormalizeOptions};

    fn ctx_for(raw: Vec<RawTool>) -> AnalysisContext {
        toolvet_embed::init_concept_anchors();
        let tools = normalize_tools(&raw, &NormalizeOptions::default());
        AnalysisContext::from_parts(tools, Vec::new())
    }

    #[test]
    fn e100_fires_for_fetcher_without_outputs() {
        let ctx = ctx_for(vec![RawTool::new("fetch_user", "Retrieve user").with_input_schema(
            json!({
                "type": "object",
                "properties": {"userId": {"type": "integer"}},
                "required": ["userId"]
            }),
        )]);
        let diags = MissingOutputSchema.check(&ctx);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].tool.as_deref(), Some("fetch_user"));
    }

    #[test]
    fn e100_spares_pure_side_effect_tools() {
        // no inputs, and the description does not read like a fetch
        let ctx = ctx_for(vec![RawTool::new(
            "ping",
            "Emit a heartbeat signal to the monitoring channel",
        )]);
        assert!(MissingOutputSchema.check(&ctx).is_empty());
    }

    #[test]
    fn e101_fires_on_whitespace() {
        let ctx = ctx_for(vec![RawTool::new("quiet", "   ")]);
        assert_eq!(MissingToolDescription.check(&ctx).len(), 1);
    }

    #[test]
    fn e102_splits_severity_by_requiredness() {
        let ctx = ctx_for(vec![RawTool::new("demo", "Run a demo of the system").with_input_schema(
            json!({
                "type": "object",
                "properties": {
                    "payload": {"type": "string"},
                    "extra": {"type": "string"}
                },
                "required": ["payload"]
            }),
        )]);
        let diags = UnderspecifiedRequiredInput.check(&ctx);
        assert_eq!(diags.len(), 2);
        let payload = diags.iter().find(|d| d.field.as_deref() == Some("payload")).unwrap();
        let extra = diags.iter().find(|d| d.field.as_deref() == Some("extra")).unwrap();
        assert_eq!(payload.severity, Severity::Error);
        assert_eq!(extra.severity, Severity::Warning);
    }

    #[test]
    fn e102_ignores_narrow_types() {
        let ctx = ctx_for(vec![RawTool::new("demo", "Run a demo of the system").with_input_schema(
            json!({
                "type": "object",
                "properties": {"count": {"type": "integer"}},
                "required": ["count"]
            }),
        )]);
        assert!(UnderspecifiedRequiredInput.check(&ctx).is_empty());
    }

    #[test]
    fn e113_one_diagnostic_per_group() {
        let ctx = ctx_for(vec![
            RawTool::new("GetUser", "Fetch a user"),
            RawTool::new("getuser", "Fetch a user again"),
            RawTool::new("GETUSER", "Fetch a user a third time"),
            RawTool::new("unrelated", "Something else entirely"),
        ]);
        let diags = DuplicateToolNames.check(&ctx);
        assert_eq!(diags.len(), 1);
        let message = &diags[0].message;
        for variant in ["GetUser", "getuser", "GETUSER"] {
            assert!(message.contains(variant), "missing {variant} in {message}");
        }
    }

    #[test]
    fn w106_flags_any_and_empty_objects() {
        let ctx = ctx_for(vec![RawTool::new("opaque", "Return something opaque")
            .with_output_schema(json!({
                "type": "object",
                "properties": {
                    "blob": {},
                    "bag": {"type": "object"},
                    "name": {"type": "string", "description": "A name"}
                }
            }))]);
        let diags = BroadOutputSchema.check(&ctx);
        let fields: Vec<_> = diags.iter().filter_map(|d| d.field.as_deref()).collect();
        assert_eq!(fields, vec!["bag", "blob"]);
    }

    #[test]
    fn w111_skips_empty_descriptions() {
        let ctx = ctx_for(vec![
            RawTool::new("silent", ""),
            RawTool::new("terse", "Too short"),
        ]);
        let diags = DescriptionQuality.check(&ctx);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].tool.as_deref(), Some("terse"));
    }

    #[test]
    fn w114_measures_nesting() {
        let ctx = ctx_for(vec![RawTool::new("deep", "Accept a deeply nested request body")
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "a": {"type": "object", "properties": {
                        "b": {"type": "object", "properties": {
                            "c": {"type": "object", "properties": {
                                "d": {"type": "string"}
                            }}
                        }}
                    }}
                }
            }))]);
        let diags = SchemaDepth.check(&ctx);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].field.as_deref(), Some("a"));
    }

    #[test]
    fn w116_counts_unmentioned_fields() {
        let ctx = ctx_for(vec![RawTool::new(
            "update_profile",
            "Update the avatar of an account",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "avatar": {"type": "string"},
                "nickname": {"type": "string"},
                "timezone": {"type": "string"}
            }
        }))]);
        let diags = SchemaDescriptionDrift.check(&ctx);
        assert_eq!(diags.len(), 1);
        // avatar is mentioned; nickname and timezone are not
        let context = diags[0].context.as_ref().unwrap();
        assert_eq!(context["unmentioned"], json!(["nickname", "timezone"]));
    }
}
