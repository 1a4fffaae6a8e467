//! Diagnostics: the machine-readable findings every rule emits.
//!
//! Codes come from a closed taxonomy: `Exxx` for errors, `Wxxx` for
//! warnings. E0xx setup, E1xx static schema/contract, E2xx input
//! validation, E3xx output validation, E4xx execution, E5xx behavioral
//! side effects, E6xx test framework, W1xx static quality, W3xx
//! behavioral quality.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a diagnostic. Strict mode promotes warnings to errors at
/// verdict time; the engine never lets a warning-only rule emit an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single finding about a tool or a relationship between tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable code from the closed taxonomy, e.g. `E103` or `W104`
    pub code: String,
    pub severity: Severity,
    /// Human-readable message; never includes raw schema contents
    pub message: String,
    /// Tool the finding is about, when it concerns a single tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Field the finding is about, when it concerns a single field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Actionable remediation hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Structured payload for the reporting layer (e.g. cycle members,
    /// dependency endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity: Severity::Error,
            message: message.into(),
            tool: None,
            field: None,
            suggestion: None,
            context: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    /// Attach the owning tool name.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Attach the field name.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach a structured context payload.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Return a copy with warnings promoted to errors. Used by strict mode.
    pub fn promoted(&self) -> Self {
        let mut out = self.clone();
        out.severity = Severity::Error;
        out
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders() {
        let d = Diagnostic::warning("W101", "Free-text output")
            .with_tool("get_query")
            .with_field("query")
            .with_suggestion("Add an enum or a pattern");
        assert_eq!(d.code, "W101");
        assert!(d.is_warning());
        assert_eq!(d.tool.as_deref(), Some("get_query"));
        assert_eq!(d.field.as_deref(), Some("query"));
    }

    #[test]
    fn test_promotion_keeps_code() {
        let d = Diagnostic::warning("W105", "Optional used as required");
        let p = d.promoted();
        assert!(p.is_error());
        assert_eq!(p.code, "W105");
        assert_eq!(p.message, d.message);
    }

    #[test]
    fn test_serde_shape() {
        let d = Diagnostic::error("E103", "Type mismatch")
            .with_context(json!({"fromTool": "a", "toTool": "b"}));
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["severity"], "error");
        assert_eq!(v["context"]["fromTool"], "a");
        // unset optionals are omitted, not null
        assert!(v.get("field").is_none());
    }
}
