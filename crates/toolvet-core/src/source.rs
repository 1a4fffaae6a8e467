//! The loader boundary.
//!
//! The core consumes a finite batch of [`RawTool`]s and requires exactly
//! three things from whoever produces it: at most one response, non-empty
//! names, preserved order. Transport (stdio framing, process spawning,
//! sockets) belongs to the collaborator behind this trait.

use async_trait::async_trait;

use crate::error::AnalyzerError;
use crate::tool::RawTool;

/// Something that can enumerate the tools of one server.
///
/// Implementations wrap their own failures into
/// [`AnalyzerError::Transport`]; analysis does not start when loading
/// fails.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Fetch the declared tools, in server order.
    async fn load_tools(&self) -> Result<Vec<RawTool>, AnalyzerError>;
}

/// An in-memory source: a fixed batch handed over as-is.
///
/// This is the seam tests and embedding programs use; a real MCP client
/// implements [`ToolSource`] over its `tools/list` call.
#[derive(Debug, Clone, Default)]
pub struct StaticToolSource {
    tools: Vec<RawTool>,
}

impl StaticToolSource {
    pub fn new(tools: Vec<RawTool>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl ToolSource for StaticToolSource {
    async fn load_tools(&self) -> Result<Vec<RawTool>, AnalyzerError> {
        Ok(self.tools.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_preserves_order() {
        let source = StaticToolSource::new(vec![
            RawTool::new("b_tool", "second alphabetically, first declared"),
            RawTool::new("a_tool", "first alphabetically, second declared"),
        ]);
        let tools = source.load_tools().await.unwrap();
        assert_eq!(tools[0].name, "b_tool");
        assert_eq!(tools[1].name, "a_tool");
    }

    #[tokio::test]
    async fn test_empty_source() {
        let source = StaticToolSource::default();
        assert!(source.load_tools().await.unwrap().is_empty());
    }
}
