//! The orchestrator: one `analyze` call, one deadline, no partial
//! results.
//!
//! Steps run in order — load (concurrent with concept-anchor
//! initialization), normalize, index, infer, rules, verdict. The two
//! blocking stages are raced against the remaining deadline; the CPU
//! stages are bounded and checked between steps. A deadline miss
//! surfaces as a timeout error naming the step.

use std::time::{Duration, Instant};

use tokio::task;
use tokio::time::timeout;
use tracing::{debug, info};

use toolvet_core::{
    validate_batch, AnalysisResult, AnalyzerError, RawTool, StaticToolSource, ToolSource,
};
use toolvet_embed::init_concept_anchors;

use crate::context::AnalysisContext;
use crate::engine::{run_rules, RuleFilter, RuleRegistry};
use crate::index::ToolIndexes;
use crate::infer::infer_dependencies;
use crate::normalize::{normalize_tools, NormalizeOptions};
use crate::rules::default_concrete_nouns;

/// Configuration for one analyzer instance.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Promote every warning to an error before verdict synthesis
    pub strict: bool,
    /// Rule selectors: plain codes allow, `-`-prefixed codes deny
    pub rules: Vec<String>,
    /// Overall deadline for one `analyze` call
    pub timeout: Duration,
    /// Precompute embeddings (semantic rules degrade to token heuristics
    /// without them)
    pub embeddings: bool,
    /// Normalize tools on the rayon pool
    pub parallel: bool,
    /// Concrete-noun vocabulary for the generic-description rule
    pub concrete_nouns: Vec<String>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            rules: Vec::new(),
            timeout: Duration::from_secs(30),
            embeddings: true,
            parallel: true,
            concrete_nouns: default_concrete_nouns(),
        }
    }
}

impl AnalyzeOptions {
    /// Enable strict mode.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Replace the overall deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set rule selectors.
    pub fn with_rules<S: Into<String>>(mut self, selectors: impl IntoIterator<Item = S>) -> Self {
        self.rules = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Skip embedding precompute; semantic probes fall back to tokens.
    pub fn without_embeddings(mut self) -> Self {
        self.embeddings = false;
        self
    }
}

/// The analysis pipeline, configured once and reusable across servers.
pub struct Analyzer {
    options: AnalyzeOptions,
    registry: RuleRegistry,
}

impl Analyzer {
    pub fn new(options: AnalyzeOptions) -> Self {
        let registry = RuleRegistry::with_concrete_nouns(&options.concrete_nouns)
            .filtered(&RuleFilter::parse(&options.rules));
        Self { options, registry }
    }

    /// The registry this analyzer will run, in order.
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Run the full pipeline against a tool source.
    ///
    /// Only configuration, transport, and timeout errors come back as
    /// `Err`; everything else is a diagnostic inside the result.
    pub async fn analyze(&self, source: &dyn ToolSource) -> Result<AnalysisResult, AnalyzerError> {
        let started = Instant::now();

        // anchors are shared process state; warming them while the loader
        // blocks on I/O costs nothing
        let anchors = task::spawn_blocking(init_concept_anchors);
        let raw = match timeout(self.remaining(started, "load")?, source.load_tools()).await {
            Ok(result) => result?,
            Err(_) => return Err(self.deadline_error(started, "load")),
        };
        let _ = anchors.await;
        debug!(tools = raw.len(), elapsed_ms = started.elapsed().as_millis() as u64, "loaded");

        validate_batch(&raw)?;

        let normalize_options = NormalizeOptions {
            embeddings: self.options.embeddings,
            parallel: self.options.parallel,
        };
        let budget = self.remaining(started, "normalize")?;
        let tools = match timeout(
            budget,
            task::spawn_blocking(move || normalize_tools(&raw, &normalize_options)),
        )
        .await
        {
            Ok(Ok(tools)) => tools,
            Ok(Err(join_error)) => {
                return Err(AnalyzerError::configuration(format!(
                    "normalization task failed: {join_error}"
                )))
            }
            Err(_) => return Err(self.deadline_error(started, "normalize")),
        };

        self.check_deadline(started, "index")?;
        let indexes = ToolIndexes::build(&tools);

        self.check_deadline(started, "infer")?;
        let dependencies = infer_dependencies(&tools);

        self.check_deadline(started, "rules")?;
        let tool_count = tools.len();
        let ctx = AnalysisContext::new(tools, dependencies, indexes);
        let diagnostics = run_rules(&self.registry, &ctx);

        self.check_deadline(started, "verdict")?;
        let result = AnalysisResult::synthesize(
            diagnostics,
            ctx.dependencies,
            tool_count,
            self.options.strict,
        );

        info!(
            verdict = %result.verdict,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            dependencies = result.dependencies.len(),
            tools = tool_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis complete"
        );
        Ok(result)
    }

    /// Analyze an in-memory batch. Convenience over [`StaticToolSource`].
    pub async fn analyze_tools(&self, tools: Vec<RawTool>) -> Result<AnalysisResult, AnalyzerError> {
        self.analyze(&StaticToolSource::new(tools)).await
    }

    fn remaining(&self, started: Instant, step: &'static str) -> Result<Duration, AnalyzerError> {
        self.options
            .timeout
            .checked_sub(started.elapsed())
            .ok_or_else(|| self.deadline_error(started, step))
    }

    fn check_deadline(&self, started: Instant, step: &'static str) -> Result<(), AnalyzerError> {
        self.remaining(started, step).map(|_| ())
    }

    fn deadline_error(&self, started: Instant, step: &'static str) -> AnalyzerError {
        AnalyzerError::timeout(step, started.elapsed().as_millis() as u64)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzeOptions::default())
    }
}
