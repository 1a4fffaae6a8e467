//! Relational rules: defects in how tools chain through the inferred
//! dependency graph.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use toolvet_core::{Diagnostic, Severity};

use crate::context::AnalysisContext;
use crate::engine::Rule;
use crate::infer::is_type_compatible;

use super::{identifier_mentioned, resolve_endpoints};

/// Confidence gate for the unsafe-chaining rules.
const HIGH_CONFIDENCE: f64 = 0.8;
/// Confidence gate for cycle detection.
const CYCLE_CONFIDENCE: f64 = 0.65;

/// E103: a high-confidence edge whose output type cannot feed the input
/// type it lands on.
pub struct ChainTypeMismatch;

impl Rule for ChainTypeMismatch {
    fn code(&self) -> &'static str {
        "E103"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Unsafe Tool Chaining: Type Mismatch"
    }
    fn description(&self) -> &'static str {
        "Chained tools must agree on the type of the value that flows \
         between them"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for dep in ctx.dependencies_at_least(HIGH_CONFIDENCE) {
            let Some((source, target)) = resolve_endpoints(
                ctx,
                &dep.from_tool,
                &dep.from_field,
                &dep.to_tool,
                &dep.to_field,
            ) else {
                continue;
            };
            if !is_type_compatible(&source.field_type, &target.field_type) {
                out.push(
                    Diagnostic::error(
                        self.code(),
                        format!(
                            "Output '{}.{}' ({}) likely feeds input '{}.{}' ({}) but the \
                             types are incompatible",
                            dep.from_tool,
                            dep.from_field,
                            source.field_type,
                            dep.to_tool,
                            dep.to_field,
                            target.field_type
                        ),
                    )
                    .with_tool(&dep.to_tool)
                    .with_field(&dep.to_field)
                    .with_context(json!({
                        "fromTool": dep.from_tool,
                        "fromField": dep.from_field,
                        "fromType": source.field_type,
                        "toTool": dep.to_tool,
                        "toField": dep.to_field,
                        "toType": target.field_type,
                        "confidence": dep.confidence,
                    })),
                );
            }
        }
        out
    }
}

/// E105: a high-confidence edge carrying a string with neither enum nor
/// pattern. A description on the output is not a constraint.
pub struct FreeTextPropagation;

impl Rule for FreeTextPropagation {
    fn code(&self) -> &'static str {
        "E105"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Unsafe Tool Chaining: Free-Text Propagation"
    }
    fn description(&self) -> &'static str {
        "Unconstrained strings flowing between tools propagate garbage \
         silently"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for dep in ctx.dependencies_at_least(HIGH_CONFIDENCE) {
            let Some((source, _)) = resolve_endpoints(
                ctx,
                &dep.from_tool,
                &dep.from_field,
                &dep.to_tool,
                &dep.to_field,
            ) else {
                continue;
            };
            if source.field_type == "string"
                && source.enum_values.is_none()
                && source.pattern.is_none()
            {
                out.push(
                    Diagnostic::error(
                        self.code(),
                        format!(
                            "Free-text output '{}.{}' flows into '{}.{}' with no enum or \
                             pattern constraining it",
                            dep.from_tool, dep.from_field, dep.to_tool, dep.to_field
                        ),
                    )
                    .with_tool(&dep.from_tool)
                    .with_field(&dep.from_field)
                    .with_suggestion(
                        "Constrain the output with an enum or a pattern so downstream \
                         tools can validate it",
                    ),
                );
            }
        }
        out
    }
}

/// E106: an optional or nullable output feeding a required, non-nullable
/// input. The chain breaks exactly when the upstream tool omits the value.
pub struct OutputNotGuaranteed;

impl Rule for OutputNotGuaranteed {
    fn code(&self) -> &'static str {
        "E106"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Output Not Guaranteed"
    }
    fn description(&self) -> &'static str {
        "A required input fed by an optional output fails whenever the \
         value is absent"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for dep in ctx.dependencies_at_least(HIGH_CONFIDENCE) {
            let Some((source, target)) = resolve_endpoints(
                ctx,
                &dep.from_tool,
                &dep.from_field,
                &dep.to_tool,
                &dep.to_field,
            ) else {
                continue;
            };
            let source_unreliable = !source.required || source.nullable;
            if source_unreliable && target.required && !target.nullable {
                out.push(
                    Diagnostic::error(
                        self.code(),
                        format!(
                            "Output '{}.{}' is not guaranteed but input '{}.{}' requires it",
                            dep.from_tool, dep.from_field, dep.to_tool, dep.to_field
                        ),
                    )
                    .with_tool(&dep.to_tool)
                    .with_field(&dep.to_field),
                );
            }
        }
        out
    }
}

/// E107: cycles in the dependency graph over edges >= 0.65. Each cycle is
/// canonicalized by its sorted node set and reported once; a self-edge is
/// a length-1 cycle.
pub struct CircularDependency;

impl Rule for CircularDependency {
    fn code(&self) -> &'static str {
        "E107"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Circular Tool Dependency"
    }
    fn description(&self) -> &'static str {
        "A dependency cycle means no tool in it can run first"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        // adjacency over tool names; the edge list itself stays flat
        let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for dep in ctx.dependencies_at_least(CYCLE_CONFIDENCE) {
            adjacency
                .entry(dep.from_tool.as_str())
                .or_default()
                .insert(dep.to_tool.as_str());
        }

        let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
        let mut out = Vec::new();
        for start in adjacency.keys().copied().collect::<Vec<_>>() {
            let mut path = Vec::new();
            dfs(start, &adjacency, &mut path, &mut seen, &mut out, self.code());
        }
        out
    }
}

fn dfs(
    node: &str,
    adjacency: &BTreeMap<&str, BTreeSet<&str>>,
    path: &mut Vec<String>,
    seen: &mut BTreeSet<Vec<String>>,
    out: &mut Vec<Diagnostic>,
    code: &str,
) {
    if let Some(position) = path.iter().position(|n| n.as_str() == node) {
        let cycle: Vec<String> = path[position..].to_vec();
        let mut canonical = cycle.clone();
        canonical.sort();
        if seen.insert(canonical.clone()) {
            let mut display = cycle.clone();
            display.push(node.to_string());
            out.push(
                Diagnostic::error(
                    code,
                    format!("Circular tool dependency: {}", display.join(" -> ")),
                )
                .with_context(json!({ "members": canonical })),
            );
        }
        return;
    }
    let Some(next) = adjacency.get(node) else {
        return;
    };
    path.push(node.to_string());
    for neighbor in next {
        dfs(neighbor, adjacency, path, seen, out, code);
    }
    path.pop();
}

/// W100: a mid-confidence edge the downstream description never admits
/// to. The agent cannot know it should call the upstream tool first.
pub struct ImplicitDependency;

impl Rule for ImplicitDependency {
    fn code(&self) -> &'static str {
        "W100"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Implicit Dependency"
    }
    fn description(&self) -> &'static str {
        "Likely data flows should be spelled out in the consuming tool's \
         description"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for dep in &ctx.dependencies {
            if dep.confidence < 0.6 || dep.confidence >= HIGH_CONFIDENCE {
                continue;
            }
            let Some(target) = ctx.tool(&dep.to_tool) else {
                continue;
            };
            if !identifier_mentioned(&dep.from_tool, &target.description) {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Tool '{}' probably consumes '{}.{}' but its description never \
                             mentions '{}'",
                            dep.to_tool, dep.from_tool, dep.from_field, dep.from_tool
                        ),
                    )
                    .with_tool(&dep.to_tool)
                    .with_field(&dep.to_field)
                    .with_context(json!({
                        "fromTool": dep.from_tool,
                        "confidence": dep.confidence,
                    })),
                );
            }
        }
        out
    }
}

/// W105: like E106 but without the nullability escape hatch; fires on any
/// optional-into-required wiring at high confidence.
pub struct OptionalUsedAsRequired;

impl Rule for OptionalUsedAsRequired {
    fn code(&self) -> &'static str {
        "W105"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Optional Used As Required Downstream"
    }
    fn description(&self) -> &'static str {
        "Downstream tools should not rely on values upstream may omit"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for dep in ctx.dependencies_at_least(HIGH_CONFIDENCE) {
            let Some((source, target)) = resolve_endpoints(
                ctx,
                &dep.from_tool,
                &dep.from_field,
                &dep.to_tool,
                &dep.to_field,
            ) else {
                continue;
            };
            if (!source.required || source.nullable) && target.required {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Optional output '{}.{}' is used as required input '{}.{}'",
                            dep.from_tool, dep.from_field, dep.to_tool, dep.to_field
                        ),
                    )
                    .with_tool(&dep.to_tool)
                    .with_field(&dep.to_field),
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
    use toolvet_core::{Dependency, RawTool};

    use crate::normalize::{normalize_tools, NormalizeOptions};

    fn no_embed() -> NormalizeOptions {
        NormalizeOptions {
            embeddings: false,
            parallel: false,
        }
    }

    fn producer_consumer(out_type: &str, in_type: &str, constrained: bool) -> AnalysisContext {
        let out_schema = if constrained {
            json!({
                "type": "object",
                "properties": {"value": {"type": out_type, "enum": ["a", "b"]}},
                "required": ["value"]
            })
        } else {
            json!({
                "type": "object",
                "properties": {"value": {"type": out_type}},
                "required": ["value"]
            })
        };
        let tools = normalize_tools(
            &[
                RawTool::new("produce", "Produce the value").with_output_schema(out_schema),
                RawTool::new("consume", "Consume the value").with_input_schema(json!({
                    "type": "object",
                    "properties": {"value": {"type": in_type}},
                    "required": ["value"]
                })),
            ],
            &no_embed(),
        );
        let deps = vec![Dependency::new("produce", "value", "consume", "value", 0.9)];
        AnalysisContext::from_parts(tools, deps)
    }

    #[test]
    fn e103_fires_on_incompatible_types() {
        let ctx = producer_consumer("string", "number", false);
        let diags = ChainTypeMismatch.check(&ctx);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("produce.value"));
        assert!(diags[0].message.contains("consume.value"));
    }

    #[test]
    fn e103_quiet_on_widening() {
        let ctx = producer_consumer("integer", "string", false);
        assert!(ChainTypeMismatch.check(&ctx).is_empty());
    }

    #[test]
    fn e105_fires_on_unconstrained_string() {
        let ctx = producer_consumer("string", "string", false);
        assert_eq!(FreeTextPropagation.check(&ctx).len(), 1);
    }

    #[test]
    fn e105_quiet_with_enum() {
        let ctx = producer_consumer("string", "string", true);
        assert!(FreeTextPropagation.check(&ctx).is_empty());
    }

    #[test]
    fn e106_fires_when_source_optional() {
        let tools = normalize_tools(
            &[
                RawTool::new("produce", "Produce the value").with_output_schema(json!({
                    "type": "object",
                    "properties": {"value": {"type": "string"}}
                })),
                RawTool::new("consume", "Consume the value").with_input_schema(json!({
                    "type": "object",
                    "properties": {"value": {"type": "string"}},
                    "required": ["value"]
                })),
            ],
            &no_embed(),
        );
        let deps = vec![Dependency::new("produce", "value", "consume", "value", 0.9)];
        let ctx = AnalysisContext::from_parts(tools, deps);
        assert_eq!(OutputNotGuaranteed.check(&ctx).len(), 1);
        assert_eq!(OptionalUsedAsRequired.check(&ctx).len(), 1);
    }

    #[test]
    fn e106_quiet_when_target_nullable() {
        let tools = normalize_tools(
            &[
                RawTool::new("produce", "Produce the value").with_output_schema(json!({
                    "type": "object",
                    "properties": {"value": {"type": "string"}}
                })),
                RawTool::new("consume", "Consume the value").with_input_schema(json!({
                    "type": "object",
                    "properties": {"value": {"type": ["string", "null"]}},
                    "required": ["value"]
                })),
            ],
            &no_embed(),
        );
        let deps = vec![Dependency::new("produce", "value", "consume", "value", 0.9)];
        let ctx = AnalysisContext::from_parts(tools, deps);
        assert!(OutputNotGuaranteed.check(&ctx).is_empty());
        // W105 still cares
        assert_eq!(OptionalUsedAsRequired.check(&ctx).len(), 1);
    }

    #[test]
    fn e107_reports_two_tool_cycle_once() {
        let tools = vec![
            toolvet_core::ToolSpec::new("alpha", "First of a pair"),
            toolvet_core::ToolSpec::new("beta", "Second of a pair"),
        ];
        let deps = vec![
            Dependency::new("alpha", "x", "beta", "x", 0.7),
            Dependency::new("beta", "y", "alpha", "y", 0.7),
        ];
        let ctx = AnalysisContext::from_parts(tools, deps);
        let diags = CircularDependency.check(&ctx);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("alpha"));
        assert!(diags[0].message.contains("beta"));
    }

    #[test]
    fn e107_self_edge_is_length_one_cycle() {
        let tools = vec![toolvet_core::ToolSpec::new("loopy", "Feeds itself")];
        let deps = vec![Dependency::new("loopy", "x", "loopy", "x", 0.9)];
        let ctx = AnalysisContext::from_parts(tools, deps);
        let diags = CircularDependency.check(&ctx);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].context.as_ref().unwrap()["members"],
            json!(["loopy"])
        );
    }

    #[test]
    fn e107_three_disjoint_cycles() {
        let tools: Vec<_> = ["a1", "a2", "b1", "b2", "c1", "c2"]
            .iter()
            .map(|n| toolvet_core::ToolSpec::new(*n, "Cycle member"))
            .collect();
        let deps = vec![
            Dependency::new("a1", "x", "a2", "x", 0.7),
            Dependency::new("a2", "x", "a1", "x", 0.7),
            Dependency::new("b1", "x", "b2", "x", 0.7),
            Dependency::new("b2", "x", "b1", "x", 0.7),
            Dependency::new("c1", "x", "c2", "x", 0.7),
            Dependency::new("c2", "x", "c1", "x", 0.7),
        ];
        let ctx = AnalysisContext::from_parts(tools, deps);
        assert_eq!(CircularDependency.check(&ctx).len(), 3);
    }

    #[test]
    fn e107_ignores_low_confidence_edges() {
        let tools = vec![
            toolvet_core::ToolSpec::new("alpha", "First"),
            toolvet_core::ToolSpec::new("beta", "Second"),
        ];
        let deps = vec![
            Dependency::new("alpha", "x", "beta", "x", 0.6),
            Dependency::new("beta", "y", "alpha", "y", 0.6),
        ];
        let ctx = AnalysisContext::from_parts(tools, deps);
        assert!(CircularDependency.check(&ctx).is_empty());
    }

    #[test]
    fn w100_fires_on_unmentioned_upstream() {
        let tools = normalize_tools(
            &[
                RawTool::new("lookup_account", "Find an account by mail address")
                    .with_output_schema(json!({
                        "type": "object",
                        "properties": {"accountRef": {"type": "string"}}
                    })),
                RawTool::new("close_account", "Close the account").with_input_schema(json!({
                    "type": "object",
                    "properties": {"reference": {"type": "string"}},
                    "required": ["reference"]
                })),
            ],
            &no_embed(),
        );
        let deps = vec![Dependency::new(
            "lookup_account",
            "accountRef",
            "close_account",
            "reference",
            0.7,
        )];
        let ctx = AnalysisContext::from_parts(tools, deps);
        let diags = ImplicitDependency.check(&ctx);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("lookup_account"));
    }

    #[test]
    fn w100_quiet_when_description_mentions_upstream() {
        let tools = normalize_tools(
            &[
                RawTool::new("lookup_account", "Find an account by mail address")
                    .with_output_schema(json!({
                        "type": "object",
                        "properties": {"accountRef": {"type": "string"}}
                    })),
                RawTool::new(
                    "close_account",
                    "Close an account found via lookup_account",
                )
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {"reference": {"type": "string"}},
                    "required": ["reference"]
                })),
            ],
            &no_embed(),
        );
        let deps = vec![Dependency::new(
            "lookup_account",
            "accountRef",
            "close_account",
            "reference",
            0.7,
        )];
        let ctx = AnalysisContext::from_parts(tools, deps);
        assert!(ImplicitDependency.check(&ctx).is_empty());
    }
}
