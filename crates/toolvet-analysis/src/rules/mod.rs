//! The diagnostic rule set.
//!
//! Static rules read the analysis context; behavioral rules are
//! registered as no-ops here and fed through the typed context acceptors
//! in [`behavioral`] by an external test orchestrator. Registration order
//! is code order, which fixes diagnostic order for a given input.

pub mod behavioral;
pub mod chaining;
pub mod schema;
pub mod semantic;

use std::sync::Arc;

use toolvet_core::{FieldSpec, Severity};

use crate::context::AnalysisContext;
use crate::engine::Rule;

use behavioral::BehavioralRule;

/// Default concrete-noun list for the generic-description rule (W104).
/// Callers may substitute their own domain vocabulary.
pub fn default_concrete_nouns() -> Vec<String> {
    [
        "file", "files", "user", "users", "email", "record", "records", "document",
        "documents", "payment", "order", "orders", "message", "messages", "database",
        "table", "image", "report", "invoice", "product", "customer", "account",
        "ticket", "event", "task", "project", "repository", "branch", "commit", "issue",
        "weather", "calendar", "contact", "note", "page",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Every rule in code order. `concrete_nouns` parameterizes W104.
pub fn standard_rules(concrete_nouns: &[String]) -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(BehavioralRule::new(
            "E000",
            Severity::Error,
            "Tool Not Found",
            "A declared tool script could not be located by the execution sandbox",
        )),
        Arc::new(schema::MissingOutputSchema),
        Arc::new(schema::MissingToolDescription),
        Arc::new(schema::UnderspecifiedRequiredInput),
        Arc::new(chaining::ChainTypeMismatch),
        Arc::new(semantic::RequiredInputNotMentioned),
        Arc::new(chaining::FreeTextPropagation),
        Arc::new(chaining::OutputNotGuaranteed),
        Arc::new(chaining::CircularDependency),
        Arc::new(semantic::ImplicitUserInput),
        Arc::new(schema::NonSerializableOutput),
        Arc::new(semantic::HardToolAmbiguity),
        Arc::new(semantic::SensitiveParameter),
        Arc::new(schema::DuplicateToolNames),
        Arc::new(BehavioralRule::new(
            "E200",
            Severity::Error,
            "Input Validation Failed",
            "A probe input the schema allows was rejected at execution time",
        )),
        Arc::new(BehavioralRule::new(
            "E300",
            Severity::Error,
            "Output Validation Failed",
            "An observed output did not validate against the declared output schema",
        )),
        Arc::new(BehavioralRule::new(
            "E301",
            Severity::Error,
            "Output Explosion",
            "An observed output exceeded the configured size limit",
        )),
        Arc::new(BehavioralRule::new(
            "E400",
            Severity::Error,
            "Tool Execution Failed",
            "The tool errored on an input its contract accepts",
        )),
        Arc::new(BehavioralRule::new(
            "E403",
            Severity::Error,
            "Unbounded Execution",
            "The tool ran past its declared or configured time budget",
        )),
        Arc::new(BehavioralRule::new(
            "E500",
            Severity::Error,
            "Side Effect Detected",
            "Execution touched files or state the contract does not declare",
        )),
        Arc::new(BehavioralRule::new(
            "E501",
            Severity::Error,
            "Hidden Dependency",
            "Execution invoked tools the contract does not declare as dependencies",
        )),
        Arc::new(BehavioralRule::new(
            "E600",
            Severity::Error,
            "Unexpected Test Result",
            "A scripted scenario produced an outcome other than the declared one",
        )),
        Arc::new(chaining::ImplicitDependency),
        Arc::new(schema::FreeTextOutput),
        Arc::new(semantic::MissingExamples),
        Arc::new(semantic::OverloadedResponsibility),
        Arc::new(semantic::GenericDescription::new(concrete_nouns)),
        Arc::new(chaining::OptionalUsedAsRequired),
        Arc::new(schema::BroadOutputSchema),
        Arc::new(semantic::MultipleEntryPoints),
        Arc::new(semantic::HiddenSideEffects),
        Arc::new(semantic::OutputNotReusable),
        Arc::new(BehavioralRule::new(
            "W110",
            Severity::Warning,
            "Weak Schema",
            "The declared schema and the observed payload shape disagree",
        )),
        Arc::new(schema::DescriptionQuality),
        Arc::new(schema::ToolCount),
        Arc::new(schema::OptionalParameterMissingExample),
        Arc::new(schema::SchemaDepth),
        Arc::new(schema::TokenCost),
        Arc::new(schema::SchemaDescriptionDrift),
        Arc::new(semantic::IdempotencySignalMissing),
        Arc::new(BehavioralRule::new(
            "W300",
            Severity::Warning,
            "High Entropy Output",
            "Repeated runs produced outputs with no stable structure",
        )),
        Arc::new(BehavioralRule::new(
            "W301",
            Severity::Warning,
            "Unstable Defaults",
            "Omitting optional inputs changed behavior between runs",
        )),
    ]
}

/// Look up both endpoints of a dependency edge. Edges come from the
/// inferencer, so a miss means the context was assembled by hand; the
/// rules treat that edge as unresolvable and skip it.
pub(crate) fn resolve_endpoints<'a>(
    ctx: &'a AnalysisContext,
    from_tool: &str,
    from_field: &str,
    to_tool: &str,
    to_field: &str,
) -> Option<(&'a FieldSpec, &'a FieldSpec)> {
    let source = ctx.tool(from_tool)?.output(from_field)?;
    let target = ctx.tool(to_tool)?.input(to_field)?;
    Some((source, target))
}

/// Whether any token of the identifier appears in the description, or the
/// identifier's tokens occur as a contiguous token run. Used by the
/// mention heuristics (E104, W100, W116).
pub(crate) fn identifier_mentioned(identifier: &str, description: &str) -> bool {
    let tokens = toolvet_core::text::identifier_tokens(identifier);
    if tokens.is_empty() {
        return false;
    }
    let description = description.to_lowercase();
    if description.contains(&identifier.to_lowercase()) {
        return true;
    }
    let description_tokens = toolvet_core::text::identifier_tokens(&description);
    tokens.iter().all(|t| description_tokens.contains(t))
        || toolvet_core::text::is_subsequence(&tokens, &description_tokens)
}

/// Whether any single token of the identifier shows up in the description.
/// Weaker than [`identifier_mentioned`]; E104 uses this as its token-level
/// probe before falling back to embeddings.
pub(crate) fn any_token_mentioned(identifier: &str, description: &str) -> bool {
    let description = description.to_lowercase();
    toolvet_core::text::identifier_tokens(identifier)
        .iter()
        .any(|t| t.len() >= 3 && description.contains(t.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_by_raw_name() {
        assert!(identifier_mentioned(
            "lookup_account",
            "Close an account found via lookup_account"
        ));
    }

    #[test]
    fn mention_by_all_tokens() {
        assert!(identifier_mentioned(
            "getUserId",
            "Get the id of a user from the directory"
        ));
        assert!(!identifier_mentioned("getUserId", "List every order"));
    }

    #[test]
    fn mention_by_token_run() {
        // "user query" appears as a contiguous run even though "the" breaks
        // the all-tokens set on nothing else
        assert!(identifier_mentioned("userQuery", "Echo the user query back"));
    }

    #[test]
    fn any_token_needs_length_three() {
        assert!(any_token_mentioned("userId", "every user of the system"));
        // "id" alone is too short to count as a mention
        assert!(!any_token_mentioned("id", "the id is mentioned here"));
    }

    #[test]
    fn standard_rules_are_code_ordered() {
        let rules = standard_rules(&default_concrete_nouns());
        let codes: Vec<&str> = rules.iter().map(|r| r.code()).collect();
        let mut errors_then_warnings = codes.clone();
        errors_then_warnings.sort();
        assert_eq!(codes, errors_then_warnings, "registration must follow code order");
        assert_eq!(codes.len(), 42);
    }
}
