//! # Toolvet Analysis
//!
//! The analysis pipeline: everything between a batch of raw MCP tool
//! declarations and a verdict.
//!
//! ## Pipeline
//!
//! ```text
//! load -> normalize -> index -> infer dependencies -> run rules -> verdict
//! ```
//!
//! Data flows one way; every stage is a pure function of its predecessors.
//! The orchestrator ([`Analyzer`]) runs the whole thing under one overall
//! deadline.
//!
//! ## Quick Start
//!
//! ```rust
//! use toolvet_analysis::{Analyzer, AnalyzeOptions};
//! use toolvet_core::{RawTool, StaticToolSource};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = StaticToolSource::new(vec![RawTool::new(
//!         "get_weather",
//!         "Return the current weather for a city",
//!     )
//!     .with_input_schema(json!({
//!         "type": "object",
//!         "properties": {"city": {"type": "string", "description": "City name"}},
//!         "required": ["city"]
//!     }))]);
//!
//!     let analyzer = Analyzer::new(AnalyzeOptions::default());
//!     let result = analyzer.analyze(&source).await.unwrap();
//!     assert_eq!(result.tool_count, 1);
//! }
//! ```
//!
//! ## Rule registry
//!
//! The registry is compiled in. Static rules cover the schema/contract
//! (E1xx) and quality (W1xx) codes; behavioral codes (E0xx, E2xx-E6xx,
//! W110, W3xx) are registered as no-ops so reporting layers know they
//! exist, and their typed context acceptors live in [`rules::behavioral`].

pub mod context;
pub mod engine;
pub mod index;
pub mod infer;
pub mod normalize;
pub mod pipeline;
pub mod rules;
pub mod schema;

pub use context::AnalysisContext;
pub use engine::{run_rules, Rule, RuleFilter, RuleRegistry};
pub use index::ToolIndexes;
pub use infer::{infer_dependencies, name_similarity, type_compatibility};
pub use normalize::{minimal_schema, normalize_tool, normalize_tools, Direction, NormalizeOptions};
pub use pipeline::{Analyzer, AnalyzeOptions};
