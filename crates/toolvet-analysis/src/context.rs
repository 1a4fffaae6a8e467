//! The immutable record every rule checks against.

use toolvet_core::{Dependency, ToolSpec};

use crate::index::ToolIndexes;

/// Everything a rule may look at: the normalized tools, the inferred
/// dependency edges, and the lookup indexes. Built once per run, never
/// mutated.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub tools: Vec<ToolSpec>,
    pub dependencies: Vec<Dependency>,
    pub indexes: ToolIndexes,
}

impl AnalysisContext {
    pub fn new(tools: Vec<ToolSpec>, dependencies: Vec<Dependency>, indexes: ToolIndexes) -> Self {
        Self {
            tools,
            dependencies,
            indexes,
        }
    }

    /// Build a context from tools and edges, deriving the indexes. The
    /// seam behavioral orchestrators and tests use.
    pub fn from_parts(tools: Vec<ToolSpec>, dependencies: Vec<Dependency>) -> Self {
        let indexes = ToolIndexes::build(&tools);
        Self::new(tools, dependencies, indexes)
    }

    /// Look up a tool by (case-insensitive) name.
    pub fn tool(&self, name: &str) -> Option<&ToolSpec> {
        self.indexes.position(name).and_then(|p| self.tools.get(p))
    }

    /// Dependencies at or above a confidence threshold, in inference order.
    pub fn dependencies_at_least(&self, confidence: f64) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(move |d| d.confidence >= confidence)
    }
}
