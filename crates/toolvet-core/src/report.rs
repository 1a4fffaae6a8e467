//! Verdict synthesis: reducing a diagnostic stream to one word.

use serde::{Deserialize, Serialize};

use crate::dependency::Dependency;
use crate::diagnostic::{Diagnostic, Severity};

/// The single-word summary of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "pass-with-warnings")]
    PassWithWarnings,
    #[serde(rename = "fail")]
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::PassWithWarnings => write!(f, "pass-with-warnings"),
            Verdict::Fail => write!(f, "fail"),
        }
    }
}

/// Everything one analysis run produced. Structured and serializable;
/// console formatting belongs to the reporting collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub verdict: Verdict,
    /// Every diagnostic, in rule-registration order
    pub diagnostics: Vec<Diagnostic>,
    /// The error subset, same relative order
    pub errors: Vec<Diagnostic>,
    /// The warning subset, same relative order
    pub warnings: Vec<Diagnostic>,
    /// Inferred dependency edges with confidences
    pub dependencies: Vec<Dependency>,
    pub tool_count: usize,
}

impl AnalysisResult {
    /// Reduce diagnostics to a verdict.
    ///
    /// Strict mode first promotes every warning to an error, so enabling it
    /// can only grow the error count. Reduction: any error => `fail`, any
    /// warning => `pass-with-warnings`, else `pass`.
    pub fn synthesize(
        diagnostics: Vec<Diagnostic>,
        dependencies: Vec<Dependency>,
        tool_count: usize,
        strict: bool,
    ) -> Self {
        let diagnostics: Vec<Diagnostic> = if strict {
            diagnostics
                .into_iter()
                .map(|d| match d.severity {
                    Severity::Warning => d.promoted(),
                    Severity::Error => d,
                })
                .collect()
        } else {
            diagnostics
        };

        let errors: Vec<Diagnostic> = diagnostics.iter().filter(|d| d.is_error()).cloned().collect();
        let warnings: Vec<Diagnostic> = diagnostics
            .iter()
            .filter(|d| d.is_warning())
            .cloned()
            .collect();

        let verdict = if !errors.is_empty() {
            Verdict::Fail
        } else if !warnings.is_empty() {
            Verdict::PassWithWarnings
        } else {
            Verdict::Pass
        };

        Self {
            verdict,
            diagnostics,
            errors,
            warnings,
            dependencies,
            tool_count,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// (errors, warnings) counts.
    pub fn counts(&self) -> (usize, usize) {
        (self.errors.len(), self.warnings.len())
    }

    /// Diagnostics carrying the given code, in emission order.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning() -> Diagnostic {
        Diagnostic::warning("W111", "short description")
    }

    fn error() -> Diagnostic {
        Diagnostic::error("E101", "missing description")
    }

    #[test]
    fn test_empty_passes() {
        let r = AnalysisResult::synthesize(Vec::new(), Vec::new(), 0, false);
        assert_eq!(r.verdict, Verdict::Pass);
        assert_eq!(r.counts(), (0, 0));
    }

    #[test]
    fn test_warning_only() {
        let r = AnalysisResult::synthesize(vec![warning()], Vec::new(), 1, false);
        assert_eq!(r.verdict, Verdict::PassWithWarnings);
        assert_eq!(r.counts(), (0, 1));
    }

    #[test]
    fn test_any_error_fails() {
        let r = AnalysisResult::synthesize(vec![warning(), error()], Vec::new(), 1, false);
        assert_eq!(r.verdict, Verdict::Fail);
        assert_eq!(r.counts(), (1, 1));
    }

    #[test]
    fn test_strict_promotes_warnings() {
        let r = AnalysisResult::synthesize(vec![warning()], Vec::new(), 1, true);
        assert_eq!(r.verdict, Verdict::Fail);
        assert_eq!(r.counts(), (1, 0));
        // code survives promotion
        assert_eq!(r.errors[0].code, "W111");
    }

    #[test]
    fn test_strict_monotonicity() {
        let diags = vec![warning(), error(), warning()];
        let lax = AnalysisResult::synthesize(diags.clone(), Vec::new(), 2, false);
        let strict = AnalysisResult::synthesize(diags, Vec::new(), 2, true);
        assert!(strict.errors.len() >= lax.errors.len());
        assert_eq!(lax.verdict, Verdict::Fail);
        assert_eq!(strict.verdict, Verdict::Fail);
    }

    #[test]
    fn test_verdict_strings() {
        assert_eq!(Verdict::Pass.to_string(), "pass");
        assert_eq!(Verdict::PassWithWarnings.to_string(), "pass-with-warnings");
        assert_eq!(Verdict::Fail.to_string(), "fail");
        let json = serde_json::to_string(&Verdict::PassWithWarnings).unwrap();
        assert_eq!(json, "\"pass-with-warnings\"");
    }
}
