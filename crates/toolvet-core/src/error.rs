//! The closed error kind set of the analyzer.
//!
//! Only three kinds propagate to the caller: configuration (bad incoming
//! raw data, fails the whole batch), transport (surfaced by the loader
//! collaborator, wrapped and re-raised before analysis starts), and
//! timeout (the orchestrator deadline, naming the step). Everything else
//! is either a diagnostic or a swallowed soft failure; the core never
//! retries.

use thiserror::Error;

/// Errors that cross the analyzer boundary.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Incoming raw data is unusable (e.g. a tool without a name)
    #[error("invalid tool batch: {reason}")]
    Configuration {
        /// What was wrong with the batch
        reason: String,
    },

    /// The loader collaborator failed before analysis could start
    #[error("tool source failed: {message}")]
    Transport {
        /// Context from the loader, sanitized
        message: String,
    },

    /// The overall deadline elapsed mid-pipeline
    #[error("analysis deadline exceeded during {step} after {elapsed_ms}ms")]
    Timeout {
        /// Pipeline step that was running when the deadline hit
        step: &'static str,
        /// Time since the run started
        elapsed_ms: u64,
    },
}

impl AnalyzerError {
    /// Create a Configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Wrap a loader failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a Timeout error for the named step.
    pub fn timeout(step: &'static str, elapsed_ms: u64) -> Self {
        Self::Timeout { step, elapsed_ms }
    }

    /// Timeouts leave the server in an unknown-but-consistent state; a
    /// caller may reasonably run the analysis again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_step() {
        let err = AnalyzerError::timeout("normalize", 1503);
        assert!(err.to_string().contains("normalize"));
        assert!(err.to_string().contains("1503"));
    }

    #[test]
    fn test_retryable() {
        assert!(AnalyzerError::timeout("load", 10).is_retryable());
        assert!(AnalyzerError::transport("connection reset").is_retryable());
        assert!(!AnalyzerError::configuration("tool at index 0 has no name").is_retryable());
    }
}
