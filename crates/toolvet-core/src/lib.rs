//! # Toolvet Core
//!
//! Core types for toolvet — the contract analyzer for MCP tool servers.
//!
//! ## Key Types
//!
//! - [`RawTool`] — a tool as declared by an MCP server (name, description, schemas)
//! - [`ToolSpec`] — a normalized tool with flattened [`FieldSpec`] lists
//! - [`Dependency`] — an inferred probable data flow between two tools
//! - [`Diagnostic`] — a single machine-readable finding about a contract
//! - [`AnalysisResult`] — the verdict plus every diagnostic of one run
//!
//! ## Quick Start
//!
//! ```rust
//! use toolvet_core::{AnalysisResult, Diagnostic, Verdict};
//!
//! let diag = Diagnostic::warning("W111", "Description is too short")
//!     .with_tool("get_user");
//!
//! let result = AnalysisResult::synthesize(vec![diag], Vec::new(), 1, false);
//! assert_eq!(result.verdict, Verdict::PassWithWarnings);
//! ```
//!
//! The analysis pipeline itself lives in `toolvet-analysis`; the embedding
//! service in `toolvet-embed`. This crate is dependency-light on purpose so
//! collaborators (loaders, reporters, behavioral probes) can speak the data
//! model without pulling in the pipeline.

pub mod dependency;
pub mod diagnostic;
pub mod error;
pub mod report;
pub mod source;
pub mod text;
pub mod tool;

pub use dependency::Dependency;
pub use diagnostic::{Diagnostic, Severity};
pub use error::AnalyzerError;
pub use report::{AnalysisResult, Verdict};
pub use source::{StaticToolSource, ToolSource};
pub use tool::{validate_batch, Embedding, FieldSpec, RawTool, ToolSpec};
