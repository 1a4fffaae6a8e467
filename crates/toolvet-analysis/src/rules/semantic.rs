//! Semantic rules: defects found through embeddings, concept anchors,
//! and vocabulary heuristics rather than schema structure alone.

use serde_json::json;

use toolvet_core::{text, Diagnostic, FieldSpec, Severity, ToolSpec};
use toolvet_embed::{cosine, find_best_matching_field, is_concept_match, Concept};

use crate::context::AnalysisContext;
use crate::engine::Rule;
use crate::infer::name_similarity;

use super::any_token_mentioned;

/// E104: a required input the description never talks about. Token probe
/// first; when embeddings are available a field-vs-description cosine of
/// 0.5 or better also counts as mentioned.
pub struct RequiredInputNotMentioned;

impl Rule for RequiredInputNotMentioned {
    fn code(&self) -> &'static str {
        "E104"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Required Input Not Mentioned in Description"
    }
    fn description(&self) -> &'static str {
        "Every required input should be discoverable from the description \
         alone"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in tool.required_inputs() {
                if any_token_mentioned(&field.name, &tool.description) {
                    continue;
                }
                let semantically_close = match (
                    tool.input_embeddings.as_ref().and_then(|m| m.get(&field.name)),
                    tool.description_embedding.as_deref(),
                ) {
                    (Some(field_vector), Some(description_vector)) => {
                        cosine(field_vector, description_vector) >= 0.5
                    }
                    _ => false,
                };
                if !semantically_close {
                    out.push(
                        Diagnostic::error(
                            self.code(),
                            format!(
                                "Required input '{}' of tool '{}' is never mentioned in \
                                 its description",
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

/// E108: a required input that looks like user data, with no producing
/// output anywhere above 0.6 and no inferred edge targeting it. The agent
/// will have to invent the value.
pub struct ImplicitUserInput;

const USER_DATA_FALLBACK: &[&str] = &[
    "query", "message", "text", "input", "prompt", "question", "name", "email", "phone",
    "address", "search", "user",
];

impl Rule for ImplicitUserInput {
    fn code(&self) -> &'static str {
        "E108"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Implicit User Input"
    }
    fn description(&self) -> &'static str {
        "Inputs only a human can supply must be marked as such, or the \
         agent will fabricate them"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in tool.required_inputs() {
                let field_vector = tool
                    .input_embeddings
                    .as_ref()
                    .and_then(|m| m.get(&field.name))
                    .filter(|v| !v.is_empty());

                if has_producer(ctx, tool, field, field_vector.map(Vec::as_slice)) {
                    continue;
                }
                let looks_like_user_data = match field_vector {
                    Some(v) => is_concept_match(v, Concept::UserData, 0.35),
                    None => {
                        let tokens = text::identifier_tokens(&field.name);
                        tokens.iter().any(|t| USER_DATA_FALLBACK.contains(&t.as_str()))
                    }
                };
                if !looks_like_user_data {
                    continue;
                }
                let targeted = ctx
                    .dependencies_at_least(0.6)
                    .any(|d| d.to_tool == tool.name && d.to_field == field.name);
                if !targeted {
                    out.push(
                        Diagnostic::error(
                            self.code(),
                            format!(
                                "Required input '{}' of tool '{}' looks like user data no \
                                 other tool can produce",
                                field.name, tool.name
                            ),
                        )
                        .with_tool(&tool.name)
                        .with_field(&field.name)
                        .with_suggestion(
                            "Say in the description that the value comes from the user",
                        ),
                    );
                }
            }
        }
        out
    }
}

fn has_producer(
    ctx: &AnalysisContext,
    consumer: &ToolSpec,
    field: &FieldSpec,
    field_vector: Option<&[f32]>,
) -> bool {
    // exact-name producers come straight off the field index
    if ctx
        .indexes
        .output_occurrences(&field.name)
        .iter()
        .any(|occurrence| occurrence.tool != consumer.name)
    {
        return true;
    }
    for other in &ctx.tools {
        if other.name == consumer.name {
            continue;
        }
        match (field_vector, other.output_embeddings.as_ref()) {
            (Some(v), Some(map)) => {
                if find_best_matching_field(v, map, 0.6).is_some() {
                    return true;
                }
            }
            _ => {
                if other
                    .outputs
                    .iter()
                    .any(|output| name_similarity(&output.name, &field.name) >= 0.6)
                {
                    return true;
                }
            }
        }
    }
    false
}

/// E110: two tools an agent cannot tell apart — descriptions overlap
/// above 0.6 and schemas above 0.5.
pub struct HardToolAmbiguity;

impl Rule for HardToolAmbiguity {
    fn code(&self) -> &'static str {
        "E110"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Hard Tool Ambiguity"
    }
    fn description(&self) -> &'static str {
        "Near-identical tools make the agent's choice a coin flip"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (i, a) in ctx.tools.iter().enumerate() {
            for b in ctx.tools.iter().skip(i + 1) {
                let description_overlap =
                    text::jaccard(&a.description_tokens, &b.description_tokens);
                if description_overlap <= 0.6 {
                    continue;
                }
                let schema_overlap = (name_set_overlap(&a.inputs, &b.inputs)
                    + name_set_overlap(&a.outputs, &b.outputs))
                    / 2.0;
                if schema_overlap > 0.5 {
                    out.push(
                        Diagnostic::error(
                            self.code(),
                            format!(
                                "Tools '{}' and '{}' are hard to tell apart (description \
                                 overlap {:.2}, schema overlap {:.2})",
                                a.name, b.name, description_overlap, schema_overlap
                            ),
                        )
                        .with_tool(&a.name)
                        .with_context(json!({ "tools": [a.name, b.name] })),
                    );
                }
            }
        }
        out
    }
}

/// Jaccard over lowercased field names. Two empty sides are identical
/// contracts, which is maximal overlap, not minimal.
fn name_set_overlap(a: &[FieldSpec], b: &[FieldSpec]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let na: Vec<String> = a.iter().map(|f| f.name.to_lowercase()).collect();
    let nb: Vec<String> = b.iter().map(|f| f.name.to_lowercase()).collect();
    text::jaccard(&na, &nb)
}

/// E112: inputs that smell like credentials. Embedding probe against the
/// `SENSITIVE` concept; keyword fallback when embeddings are off.
pub struct SensitiveParameter;

const SENSITIVE_FALLBACK: &[&str] = &[
    "password", "passwd", "secret", "token", "api_key", "apikey", "access_key",
    "private_key", "auth", "credential", "credentials", "passphrase",
];

impl Rule for SensitiveParameter {
    fn code(&self) -> &'static str {
        "E112"
    }
    fn severity(&self) -> Severity {
        Severity::Error
    }
    fn name(&self) -> &'static str {
        "Sensitive Parameter Detection"
    }
    fn description(&self) -> &'static str {
        "Credentials do not belong in tool parameters an agent fills in"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in &tool.inputs {
                let vector = tool
                    .input_embeddings
                    .as_ref()
                    .and_then(|m| m.get(&field.name))
                    .filter(|v| !v.is_empty());
                let sensitive = match vector {
                    Some(v) => is_concept_match(v, Concept::Sensitive, 0.45),
                    None => {
                        let lowered = field.name.to_lowercase();
                        SENSITIVE_FALLBACK.iter().any(|kw| lowered.contains(kw))
                    }
                };
                if sensitive {
                    out.push(
                        Diagnostic::error(
                            self.code(),
                            format!(
                                "Input '{}' of tool '{}' appears to take a credential",
                                field.name, tool.name
                            ),
                        )
                        .with_tool(&tool.name)
                        .with_field(&field.name)
                        .with_suggestion(
                            "Move the credential to server-side configuration",
                        ),
                    );
                }
            }
        }
        out
    }
}

/// W102: user-facing inputs (by vocabulary) without an example.
pub struct MissingExamples;

const USER_FACING_TOKENS: &[&str] = &[
    "query", "message", "text", "input", "prompt", "question", "search", "name",
    "title", "comment", "body", "content",
];

impl Rule for MissingExamples {
    fn code(&self) -> &'static str {
        "W102"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Missing Examples"
    }
    fn description(&self) -> &'static str {
        "User-facing inputs are filled far more reliably with an example \
         to copy"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            for field in &tool.inputs {
                if field.example.is_some() {
                    continue;
                }
                let haystack = format!(
                    "{} {}",
                    field.name,
                    field.description.as_deref().unwrap_or_default()
                );
                let tokens = text::identifier_tokens(&haystack);
                if tokens.iter().any(|t| USER_FACING_TOKENS.contains(&t.as_str())) {
                    out.push(
                        Diagnostic::warning(
                            self.code(),
                            format!(
                                "User-facing input '{}' of tool '{}' has no example",
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

/// W103: descriptions that promise too many things at once.
pub struct OverloadedResponsibility;

const ACTION_VERBS: &[&str] = &[
    "create", "creates", "update", "updates", "delete", "deletes", "remove", "removes",
    "get", "gets", "fetch", "fetches", "list", "lists", "search", "searches", "send",
    "sends", "convert", "converts", "validate", "validates", "upload", "uploads",
    "download", "downloads", "build", "builds", "run", "runs", "sync", "syncs",
    "export", "exports", "import", "imports",
];

impl Rule for OverloadedResponsibility {
    fn code(&self) -> &'static str {
        "W103"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Overloaded Responsibility"
    }
    fn description(&self) -> &'static str {
        "A tool that does many things is invoked wrongly for each of them"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            let verb_count = tool
                .description_tokens
                .iter()
                .filter(|t| ACTION_VERBS.contains(&t.as_str()))
                .count();
            let lowered = tool.description.to_lowercase();
            let intent_splits = lowered.matches(" and ").count()
                + lowered.matches(" or ").count()
                + lowered.matches(',').count();
            if verb_count > 3 || intent_splits > 2 {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Tool '{}' reads like several tools in one ({verb_count} \
                             action verbs, {intent_splits} intent splits)",
                            tool.name
                        ),
                    )
                    .with_tool(&tool.name)
                    .with_suggestion("Split the tool by intent"),
                );
            }
        }
        out
    }
}

/// W104: a vague verb with no concrete noun anywhere near it. The noun
/// list is caller-configurable.
pub struct GenericDescription {
    concrete_nouns: Vec<String>,
}

const VAGUE_VERBS: &[&str] = &[
    "handle", "handles", "process", "processes", "manage", "manages", "perform",
    "performs", "execute", "executes", "operate", "operates", "work", "works", "deal",
    "deals",
];

impl GenericDescription {
    pub fn new(concrete_nouns: &[String]) -> Self {
        Self {
            concrete_nouns: concrete_nouns.iter().map(|n| n.to_lowercase()).collect(),
        }
    }
}

impl Rule for GenericDescription {
    fn code(&self) -> &'static str {
        "W104"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Generic Description"
    }
    fn description(&self) -> &'static str {
        "Vague verbs with no concrete object describe nothing"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            let has_vague = tool
                .description_tokens
                .iter()
                .any(|t| VAGUE_VERBS.contains(&t.as_str()));
            let has_concrete = tool
                .description_tokens
                .iter()
                .any(|t| self.concrete_nouns.contains(t));
            if has_vague && !has_concrete {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Description of tool '{}' is generic; say what it operates on",
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

/// W107: several tools all starting from the same kind of value (a
/// location, a user, an email, ...) usually means overlapping entry
/// points.
pub struct MultipleEntryPoints;

const ENTRY_CONCEPTS: &[(&str, &[&str])] = &[
    (
        "location",
        &["location", "address", "city", "country", "lat", "latitude", "lng", "longitude", "place", "region"],
    ),
    ("user", &["user", "username", "account", "member", "customer", "profile"]),
    ("email", &["email", "mail"]),
    ("phone", &["phone", "mobile", "telephone"]),
    ("name", &["name", "firstname", "lastname", "fullname"]),
    ("id", &["id", "uuid", "guid", "identifier"]),
];

impl Rule for MultipleEntryPoints {
    fn code(&self) -> &'static str {
        "W107"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Multiple Entry Points"
    }
    fn description(&self) -> &'static str {
        "Several tools keyed on the same concept compete for every request"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (concept, keywords) in ENTRY_CONCEPTS {
            let mut owners: Vec<&str> = Vec::new();
            for tool in &ctx.tools {
                let keyed = tool.required_inputs().any(|f| {
                    text::identifier_tokens(&f.name)
                        .iter()
                        .any(|t| keywords.contains(&t.as_str()))
                });
                if keyed && !owners.contains(&tool.name.as_str()) {
                    owners.push(&tool.name);
                }
            }
            if owners.len() > 1 {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "{} tools all start from a {concept}: {}",
                            owners.len(),
                            owners.join(", ")
                        ),
                    )
                    .with_context(json!({ "concept": concept, "tools": owners })),
                );
            }
        }
        out
    }
}

/// W108: mutation wording with outputs that never acknowledge the
/// mutation happened.
pub struct HiddenSideEffects;

const MUTATION_VERBS: &[&str] = &[
    "create", "creates", "update", "updates", "delete", "deletes", "remove", "removes",
    "set", "sets", "write", "writes", "add", "adds", "insert", "inserts", "modify",
    "modifies", "patch", "post", "cancel", "archive", "save", "saves",
];

const STATE_MARKERS: &[&str] = &[
    "success", "id", "status", "result", "created", "updated", "deleted", "count",
    "ok", "error", "affected",
];

impl Rule for HiddenSideEffects {
    fn code(&self) -> &'static str {
        "W108"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Hidden Side Effects"
    }
    fn description(&self) -> &'static str {
        "Mutating tools should return evidence of the state change"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            if tool.outputs.is_empty() {
                continue;
            }
            let wording = format!("{} {}", tool.name, tool.description);
            let mutating = text::identifier_tokens(&wording)
                .iter()
                .any(|t| MUTATION_VERBS.contains(&t.as_str()));
            if !mutating {
                continue;
            }
            let acknowledged = tool.outputs.iter().any(|f| {
                text::identifier_tokens(&f.name)
                    .iter()
                    .any(|t| STATE_MARKERS.contains(&t.as_str()))
            });
            if !acknowledged {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Tool '{}' sounds mutating but its outputs never confirm the \
                             state change",
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

/// W109: every output is display-oriented prose no downstream tool can
/// consume.
pub struct OutputNotReusable;

const DISPLAY_TOKENS: &[&str] = &[
    "display", "formatted", "pretty", "human", "readable", "text", "label", "summary",
    "rendered", "message", "html", "markdown",
];

impl Rule for OutputNotReusable {
    fn code(&self) -> &'static str {
        "W109"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Output Not Reusable"
    }
    fn description(&self) -> &'static str {
        "Display-only outputs dead-end every chain that reaches them"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            if tool.outputs.is_empty() {
                continue;
            }
            let all_display = tool.outputs.iter().all(|f| {
                if f.field_type != "string" {
                    return false;
                }
                let haystack = format!(
                    "{} {}",
                    f.name,
                    f.description.as_deref().unwrap_or_default()
                );
                text::identifier_tokens(&haystack)
                    .iter()
                    .any(|t| DISPLAY_TOKENS.contains(&t.as_str()))
            });
            if all_display {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Every output of tool '{}' is display-only text",
                            tool.name
                        ),
                    )
                    .with_tool(&tool.name)
                    .with_suggestion("Return structured fields alongside the rendered text"),
                );
            }
        }
        out
    }
}

/// W117: mutation phrasing with no idempotency signal anywhere. Retry
/// layers need to know whether re-calling is safe.
pub struct IdempotencySignalMissing;

impl Rule for IdempotencySignalMissing {
    fn code(&self) -> &'static str {
        "W117"
    }
    fn severity(&self) -> Severity {
        Severity::Warning
    }
    fn name(&self) -> &'static str {
        "Idempotency Signal Missing"
    }
    fn description(&self) -> &'static str {
        "Mutating tools should state whether repeating the call is safe"
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for tool in &ctx.tools {
            let Some(vector) = tool.description_embedding.as_deref() else {
                continue;
            };
            if is_concept_match(vector, Concept::Mutation, 0.4)
                && !is_concept_match(vector, Concept::Idempotent, 0.4)
            {
                out.push(
                    Diagnostic::warning(
                        self.code(),
                        format!(
                            "Tool '{}' mutates state but never says whether retrying is \
                             safe",
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
