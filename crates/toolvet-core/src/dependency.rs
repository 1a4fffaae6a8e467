//! Inferred data-flow edges between tools.

use serde::{Deserialize, Serialize};

/// A directed probable data flow: an output field of one tool feeding an
/// input field of another.
///
/// Invariants, upheld by the inferencer: `from_tool != to_tool`,
/// `from_field` exists among the source tool's outputs, `to_field` among
/// the target tool's inputs, and `confidence` is clamped to [0, 1]. The
/// same tool pair may carry several edges binding different fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub from_tool: String,
    pub from_field: String,
    pub to_tool: String,
    pub to_field: String,
    /// Fused similarity score in [0, 1]; the inferencer only emits >= 0.6
    pub confidence: f64,
}

impl Dependency {
    pub fn new(
        from_tool: impl Into<String>,
        from_field: impl Into<String>,
        to_tool: impl Into<String>,
        to_field: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            from_tool: from_tool.into(),
            from_field: from_field.into(),
            to_tool: to_tool.into(),
            to_field: to_field.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// High-confidence edges gate the unsafe-chaining rules.
    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= 0.8
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{} ({:.2})",
            self.from_tool, self.from_field, self.to_tool, self.to_field, self.confidence
        )
    }
}
