//! The behavioral boundary.
//!
//! These codes have no static signal; an external test orchestrator runs
//! tools in a sandbox and feeds its observations through the typed
//! acceptors below. The codes are still registered in the static engine
//! (as no-ops) so the reporting layer and the tests know the full
//! taxonomy.

use serde_json::{json, Value};

use toolvet_core::{Diagnostic, Severity};

use crate::context::AnalysisContext;
use crate::engine::Rule;

/// A rule whose static check is a no-op. Severity and metadata still
/// matter: they describe what the behavioral acceptor will emit.
pub struct BehavioralRule {
    code: &'static str,
    severity: Severity,
    name: &'static str,
    description: &'static str,
}

impl BehavioralRule {
    pub fn new(
        code: &'static str,
        severity: Severity,
        name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            code,
            severity,
            name,
            description,
        }
    }
}

impl Rule for BehavioralRule {
    fn code(&self) -> &'static str {
        self.code
    }
    fn severity(&self) -> Severity {
        self.severity
    }
    fn name(&self) -> &'static str {
        self.name
    }
    fn description(&self) -> &'static str {
        self.description
    }
    fn check(&self, _ctx: &AnalysisContext) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// E000: a declared tool's backing script was not found.
#[derive(Debug, Clone)]
pub struct ToolNotFoundContext {
    pub tool_name: String,
    pub script_name: String,
}

pub fn tool_not_found(ctx: &ToolNotFoundContext) -> Vec<Diagnostic> {
    vec![Diagnostic::error(
        "E000",
        format!(
            "Tool '{}' declares script '{}' which does not exist",
            ctx.tool_name, ctx.script_name
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({ "script": ctx.script_name }))]
}

/// E200: an input the schema accepts was rejected at execution time.
#[derive(Debug, Clone, Default)]
pub struct InputValidationContext {
    pub tool_name: String,
    pub test_name: Option<String>,
    pub test_input: Option<Value>,
    pub error: String,
    pub parsed_error: Option<String>,
}

pub fn input_validation_failed(ctx: &InputValidationContext) -> Vec<Diagnostic> {
    let mut diagnostic = Diagnostic::error(
        "E200",
        format!(
            "Tool '{}' rejected schema-valid input: {}",
            ctx.tool_name, ctx.error
        ),
    )
    .with_tool(&ctx.tool_name);
    diagnostic = diagnostic.with_context(json!({
        "testName": ctx.test_name,
        "testInput": ctx.test_input,
        "parsedError": ctx.parsed_error,
    }));
    vec![diagnostic]
}

/// E300: an observed output failed validation against the declared
/// output schema.
#[derive(Debug, Clone, Default)]
pub struct OutputValidationContext {
    pub tool_name: String,
    pub test_name: Option<String>,
    pub test_input: Option<Value>,
    pub expected_output_schema: Option<Value>,
    pub error: String,
    pub details: Option<Value>,
}

pub fn output_validation_failed(ctx: &OutputValidationContext) -> Vec<Diagnostic> {
    vec![Diagnostic::error(
        "E300",
        format!(
            "Output of tool '{}' does not match its declared schema: {}",
            ctx.tool_name, ctx.error
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({
        "testName": ctx.test_name,
        "testInput": ctx.test_input,
        "expectedOutputSchema": ctx.expected_output_schema,
        "details": ctx.details,
    }))]
}

/// E301: an output larger than the configured ceiling.
#[derive(Debug, Clone)]
pub struct OutputExplosionContext {
    pub tool_name: String,
    pub actual_size: usize,
    pub max_size: usize,
    pub limit_string: String,
}

pub fn output_explosion(ctx: &OutputExplosionContext) -> Vec<Diagnostic> {
    if ctx.actual_size <= ctx.max_size {
        return Vec::new();
    }
    vec![Diagnostic::error(
        "E301",
        format!(
            "Output of tool '{}' is {} bytes, over the {} limit",
            ctx.tool_name, ctx.actual_size, ctx.limit_string
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({
        "actualSize": ctx.actual_size,
        "maxSize": ctx.max_size,
    }))]
}

/// E400: execution failed outright on contract-valid input.
#[derive(Debug, Clone, Default)]
pub struct ExecutionFailureContext {
    pub tool_name: String,
    pub errors: Vec<String>,
}

pub fn tool_execution_failed(ctx: &ExecutionFailureContext) -> Vec<Diagnostic> {
    if ctx.errors.is_empty() {
        return Vec::new();
    }
    vec![Diagnostic::error(
        "E400",
        format!(
            "Tool '{}' failed on valid input: {}",
            ctx.tool_name,
            ctx.errors.join("; ")
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({ "errors": ctx.errors }))]
}

/// E403: execution outran its declared or configured time budget.
#[derive(Debug, Clone, Default)]
pub struct UnboundedExecutionContext {
    pub tool_name: String,
    pub timed_out: bool,
    pub declared_timeout: Option<u64>,
    pub actual_timeout_ms: Option<u64>,
    pub errors: Vec<String>,
}

pub fn unbounded_execution(ctx: &UnboundedExecutionContext) -> Vec<Diagnostic> {
    if !ctx.timed_out {
        return Vec::new();
    }
    vec![Diagnostic::error(
        "E403",
        format!(
            "Tool '{}' ran past its time budget{}",
            ctx.tool_name,
            ctx.actual_timeout_ms
                .map(|ms| format!(" ({ms}ms)"))
                .unwrap_or_default()
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({
        "declaredTimeout": ctx.declared_timeout,
        "actualTimeoutMs": ctx.actual_timeout_ms,
        "errors": ctx.errors,
    }))]
}

/// One observed side-effecting operation.
#[derive(Debug, Clone)]
pub struct SideEffect {
    pub operation: String,
    pub path: String,
}

/// E500: execution touched state the contract never declared.
#[derive(Debug, Clone, Default)]
pub struct SideEffectContext {
    pub tool_name: String,
    pub side_effects: Vec<SideEffect>,
}

pub fn side_effect_detected(ctx: &SideEffectContext) -> Vec<Diagnostic> {
    if ctx.side_effects.is_empty() {
        return Vec::new();
    }
    let effects: Vec<Value> = ctx
        .side_effects
        .iter()
        .map(|e| json!({ "operation": e.operation, "path": e.path }))
        .collect();
    vec![Diagnostic::error(
        "E500",
        format!(
            "Tool '{}' performed {} undeclared side effect(s)",
            ctx.tool_name,
            ctx.side_effects.len()
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({ "sideEffects": effects }))]
}

/// A tool invocation observed during another tool's execution.
#[derive(Debug, Clone)]
pub struct HiddenInvocation {
    pub tool_name: String,
    pub timestamp: u64,
}

/// E501: execution called tools the contract does not declare.
#[derive(Debug, Clone, Default)]
pub struct HiddenDependencyContext {
    pub tool_name: String,
    pub hidden_dependencies: Vec<HiddenInvocation>,
    pub missing_dependencies: Option<Vec<String>>,
    pub declared_dependencies: Vec<String>,
}

pub fn hidden_dependency(ctx: &HiddenDependencyContext) -> Vec<Diagnostic> {
    if ctx.hidden_dependencies.is_empty() {
        return Vec::new();
    }
    let hidden: Vec<&str> = ctx
        .hidden_dependencies
        .iter()
        .map(|h| h.tool_name.as_str())
        .collect();
    vec![Diagnostic::error(
        "E501",
        format!(
            "Tool '{}' invoked undeclared tools: {}",
            ctx.tool_name,
            hidden.join(", ")
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({
        "hidden": hidden,
        "missing": ctx.missing_dependencies,
        "declared": ctx.declared_dependencies,
    }))]
}

/// E600: a scripted scenario ended differently than it declared.
#[derive(Debug, Clone, Default)]
pub struct TestResultContext {
    pub tool_name: String,
    pub test_name: String,
    pub expected_outcome: String,
    pub actual_outcome: String,
    pub expected_error_type: Option<String>,
    pub actual_error_type: Option<String>,
    pub expected_error_code: Option<String>,
    pub actual_error_code: Option<String>,
}

pub fn unexpected_test_result(ctx: &TestResultContext) -> Vec<Diagnostic> {
    let outcome_matches = ctx.expected_outcome == ctx.actual_outcome
        && ctx.expected_error_type == ctx.actual_error_type
        && ctx.expected_error_code == ctx.actual_error_code;
    if outcome_matches {
        return Vec::new();
    }
    vec![Diagnostic::error(
        "E600",
        format!(
            "Scenario '{}' of tool '{}' expected {} but got {}",
            ctx.test_name, ctx.tool_name, ctx.expected_outcome, ctx.actual_outcome
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({
        "testName": ctx.test_name,
        "expectedErrorType": ctx.expected_error_type,
        "actualErrorType": ctx.actual_error_type,
        "expectedErrorCode": ctx.expected_error_code,
        "actualErrorCode": ctx.actual_error_code,
    }))]
}

/// W110: declared and observed schema shapes disagree.
#[derive(Debug, Clone, Default)]
pub struct WeakSchemaContext {
    pub tool_name: String,
    pub schemas_match: bool,
    pub mismatch_details: Option<Value>,
}

pub fn weak_schema(ctx: &WeakSchemaContext) -> Vec<Diagnostic> {
    if ctx.schemas_match {
        return Vec::new();
    }
    vec![Diagnostic::warning(
        "W110",
        format!(
            "Declared schema of tool '{}' does not match observed payloads",
            ctx.tool_name
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({ "details": ctx.mismatch_details }))]
}

/// Default threshold for the entropy probe.
pub const DEFAULT_ENTROPY_THRESHOLD: f64 = 0.7;

/// W300: repeated runs produced structurally unstable output.
#[derive(Debug, Clone)]
pub struct EntropyContext {
    pub tool_name: String,
    /// Structural instability in [0, 1]; clamped on use
    pub entropy_score: f64,
    pub reason: Option<String>,
    pub entropy_threshold: Option<f64>,
}

pub fn high_entropy_output(ctx: &EntropyContext) -> Vec<Diagnostic> {
    let score = ctx.entropy_score.clamp(0.0, 1.0);
    let threshold = ctx.entropy_threshold.unwrap_or(DEFAULT_ENTROPY_THRESHOLD);
    if score < threshold {
        return Vec::new();
    }
    vec![Diagnostic::warning(
        "W300",
        format!(
            "Output of tool '{}' is unstable across runs (entropy {score:.2}{})",
            ctx.tool_name,
            ctx.reason
                .as_deref()
                .map(|r| format!(": {r}"))
                .unwrap_or_default()
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({ "entropyScore": score, "threshold": threshold }))]
}

/// One optional field whose omission changed behavior.
#[derive(Debug, Clone)]
pub struct UnstableField {
    pub field_name: String,
    pub reason: String,
}

/// W301: omitting optional inputs changed behavior between runs.
#[derive(Debug, Clone, Default)]
pub struct UnstableDefaultsContext {
    pub tool_name: String,
    pub unstable_fields: Vec<UnstableField>,
}

pub fn unstable_defaults(ctx: &UnstableDefaultsContext) -> Vec<Diagnostic> {
    if ctx.unstable_fields.is_empty() {
        return Vec::new();
    }
    let fields: Vec<Value> = ctx
        .unstable_fields
        .iter()
        .map(|f| json!({ "field": f.field_name, "reason": f.reason }))
        .collect();
    vec![Diagnostic::warning(
        "W301",
        format!(
            "Defaults of tool '{}' are unstable for: {}",
            ctx.tool_name,
            ctx.unstable_fields
                .iter()
                .map(|f| f.field_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    )
    .with_tool(&ctx.tool_name)
    .with_context(json!({ "fields": fields }))]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_rule_is_static_noop() {
        let rule = BehavioralRule::new("E000", Severity::Error, "Tool Not Found", "test");
        let ctx = AnalysisContext::from_parts(Vec::new(), Vec::new());
        assert!(rule.check(&ctx).is_empty());
        assert_eq!(rule.code(), "E000");
    }

    #[test]
    fn entropy_respects_threshold_and_clamp() {
        let quiet = EntropyContext {
            tool_name: "gen".into(),
            entropy_score: 0.5,
            reason: None,
            entropy_threshold: None,
        };
        assert!(high_entropy_output(&quiet).is_empty());

        let loud = EntropyContext {
            tool_name: "gen".into(),
            entropy_score: 3.2,
            reason: Some("keys differ per run".into()),
            entropy_threshold: None,
        };
        let diags = high_entropy_output(&loud);
        assert_eq!(diags.len(), 1);
        // clamped into [0, 1]
        assert_eq!(diags[0].context.as_ref().unwrap()["entropyScore"], 1.0);
    }

    #[test]
    fn explosion_only_over_limit() {
        let under = OutputExplosionContext {
            tool_name: "dump".into(),
            actual_size: 10,
            max_size: 100,
            limit_string: "100B".into(),
        };
        assert!(output_explosion(&under).is_empty());

        let over = OutputExplosionContext {
            actual_size: 1000,
            ..under
        };
        assert_eq!(output_explosion(&over).len(), 1);
    }

    #[test]
    fn test_result_mismatch_fires() {
        let ctx = TestResultContext {
            tool_name: "t".into(),
            test_name: "happy_path".into(),
            expected_outcome: "success".into(),
            actual_outcome: "error".into(),
            ..Default::default()
        };
        assert_eq!(unexpected_test_result(&ctx).len(), 1);

        let matching = TestResultContext {
            actual_outcome: "success".into(),
            ..ctx
        };
        assert!(unexpected_test_result(&matching).is_empty());
    }

    #[test]
    fn weak_schema_quiet_on_match() {
        let ctx = WeakSchemaContext {
            tool_name: "t".into(),
            schemas_match: true,
            mismatch_details: None,
        };
        assert!(weak_schema(&ctx).is_empty());
    }

    #[test]
    fn side_effects_and_hidden_deps() {
        let effects = SideEffectContext {
            tool_name: "writer".into(),
            side_effects: vec![SideEffect {
                operation: "write".into(),
                path: "/tmp/x".into(),
            }],
        };
        assert_eq!(side_effect_detected(&effects).len(), 1);

        let hidden = HiddenDependencyContext {
            tool_name: "composite".into(),
            hidden_dependencies: vec![HiddenInvocation {
                tool_name: "helper".into(),
                timestamp: 42,
            }],
            missing_dependencies: None,
            declared_dependencies: vec![],
        };
        let diags = hidden_dependency(&hidden);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("helper"));
    }
}
