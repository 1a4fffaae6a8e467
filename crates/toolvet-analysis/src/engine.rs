//! The rule engine: an ordered, compiled-in registry and a sequential
//! executor with per-rule fault isolation.
//!
//! Rules run in registration order so diagnostic output is deterministic.
//! A panicking rule is caught, logged with its code, and skipped; the
//! remaining rules still run. The engine also clamps severities: a
//! warning-severity rule can never emit an error, strict mode or not
//! (strict-mode promotion happens later, at verdict synthesis).

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use toolvet_core::{Diagnostic, Severity};

use crate::context::AnalysisContext;
use crate::rules;

/// One diagnostic rule: a stable code, a fixed severity ceiling, and a
/// pure check over the analysis context. Rules hold no engine state.
pub trait Rule: Send + Sync {
    /// Stable code from the closed taxonomy, e.g. `E103`
    fn code(&self) -> &'static str;
    /// Severity ceiling for everything this rule emits
    fn severity(&self) -> Severity;
    /// Short human name
    fn name(&self) -> &'static str;
    /// What the rule looks for
    fn description(&self) -> &'static str;
    /// Run the rule. Must not mutate anything; may panic, the engine
    /// isolates it.
    fn check(&self, ctx: &AnalysisContext) -> Vec<Diagnostic>;
}

/// Allow/deny selector list over rule codes.
///
/// Plain codes form an allow-list; `-`-prefixed codes a deny-list. When
/// any allow entries are present the allow-list wins and the deny entries
/// are ignored.
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    allow: BTreeSet<String>,
    deny: BTreeSet<String>,
}

impl RuleFilter {
    pub fn parse<S: AsRef<str>>(selectors: &[S]) -> Self {
        let mut filter = RuleFilter::default();
        for selector in selectors {
            let selector = selector.as_ref().trim();
            if selector.is_empty() {
                continue;
            }
            match selector.strip_prefix('-') {
                Some(code) => {
                    filter.deny.insert(code.to_uppercase());
                }
                None => {
                    filter.allow.insert(selector.to_uppercase());
                }
            }
        }
        filter
    }

    pub fn is_enabled(&self, code: &str) -> bool {
        if !self.allow.is_empty() {
            return self.allow.contains(code);
        }
        !self.deny.contains(code)
    }
}

/// The ordered rule registry. Compiled in; no dynamic loading.
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Every rule, static and behavioral, in code order, with the default
    /// W104 noun list.
    pub fn standard() -> Self {
        Self {
            rules: rules::standard_rules(&rules::default_concrete_nouns()),
        }
    }

    /// Standard registry with a caller-supplied concrete-noun list for
    /// the generic-description rule.
    pub fn with_concrete_nouns(nouns: &[String]) -> Self {
        Self {
            rules: rules::standard_rules(nouns),
        }
    }

    /// Apply an allow/deny selector list, keeping registration order.
    pub fn filtered(mut self, filter: &RuleFilter) -> Self {
        self.rules.retain(|r| filter.is_enabled(r.code()));
        self
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// Registered codes, in registration order.
    pub fn codes(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.code()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.codes())
            .finish()
    }
}

/// Run every registered rule over the context, collecting diagnostics in
/// registration order.
pub fn run_rules(registry: &RuleRegistry, ctx: &AnalysisContext) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for rule in registry.rules() {
        match catch_unwind(AssertUnwindSafe(|| rule.check(ctx))) {
            Ok(found) => {
                if !found.is_empty() {
                    debug!(code = rule.code(), count = found.len(), "rule fired");
                }
                for mut diagnostic in found {
                    // warning-only rules never emit errors
                    if rule.severity() == Severity::Warning
                        && diagnostic.severity == Severity::Error
                    {
                        diagnostic.severity = Severity::Warning;
                    }
                    diagnostics.push(diagnostic);
                }
            }
            Err(_) => {
                error!(
                    code = rule.code(),
                    name = rule.name(),
                    "rule panicked; continuing without its diagnostics"
                );
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingRule;

    impl Rule for PanickingRule {
        fn code(&self) -> &'static str {
            "W999"
        }
        fn severity(&self) -> Severity {
            Severity::Warning
        }
        fn name(&self) -> &'static str {
            "Always Panics"
        }
        fn description(&self) -> &'static str {
            "Test rule that panics"
        }
        fn check(&self, _ctx: &AnalysisContext) -> Vec<Diagnostic> {
            panic!("intentional");
        }
    }

    struct NoisyRule;

    impl Rule for NoisyRule {
        fn code(&self) -> &'static str {
            "W998"
        }
        fn severity(&self) -> Severity {
            Severity::Warning
        }
        fn name(&self) -> &'static str {
            "Noisy"
        }
        fn description(&self) -> &'static str {
            "Emits one mislabelled error"
        }
        fn check(&self, _ctx: &AnalysisContext) -> Vec<Diagnostic> {
            vec![Diagnostic::error("W998", "should become a warning")]
        }
    }

    fn empty_ctx() -> AnalysisContext {
        AnalysisContext::from_parts(Vec::new(), Vec::new())
    }

    #[test]
    fn panicking_rule_is_isolated() {
        let registry = RuleRegistry {
            rules: vec![Arc::new(PanickingRule), Arc::new(NoisyRule)],
        };
        let diagnostics = run_rules(&registry, &empty_ctx());
        // the panic is swallowed, the next rule still ran
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "W998");
    }

    #[test]
    fn warning_rules_cannot_emit_errors() {
        let registry = RuleRegistry {
            rules: vec![Arc::new(NoisyRule)],
        };
        let diagnostics = run_rules(&registry, &empty_ctx());
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn filter_allow_list_wins() {
        let filter = RuleFilter::parse(&["E103", "-E103", "-W101"]);
        assert!(filter.is_enabled("E103"));
        assert!(!filter.is_enabled("W101"));
        assert!(!filter.is_enabled("E100"));
    }

    #[test]
    fn filter_deny_list_without_allows() {
        let filter = RuleFilter::parse(&["-W101", "-w111"]);
        assert!(filter.is_enabled("E103"));
        assert!(!filter.is_enabled("W101"));
        assert!(!filter.is_enabled("W111"));
    }

    #[test]
    fn standard_registry_knows_behavioral_codes() {
        let registry = RuleRegistry::standard();
        let codes = registry.codes();
        // behavioral codes are registered even though their static check
        // is a no-op
        for code in ["E000", "E200", "E301", "E500", "W110", "W300"] {
            assert!(codes.contains(&code), "missing {code}");
        }
        // registration order is code order
        let e100 = codes.iter().position(|c| *c == "E100").unwrap();
        let w117 = codes.iter().position(|c| *c == "W117").unwrap();
        assert!(e100 < w117);
    }

    #[test]
    fn filtered_registry_drops_rules() {
        let registry =
            RuleRegistry::standard().filtered(&RuleFilter::parse(&["E101", "E113"]));
        assert_eq!(registry.codes(), vec!["E101", "E113"]);
    }
}
