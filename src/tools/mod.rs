//! Tool layer
//!
//! Every external capability the assistant can reach is a [`Tool`]: a thin
//! `run` wrapper over a model artifact, a database client, or an HTTP API.
//! The [`ToolRegistry`] holds whichever tools the current configuration can
//! actually serve; the router and the ReAct loop only ever see [`ToolKind`]s.

pub mod knowledge_base;
pub mod knowledge_graph;
pub mod pest_classifier;
pub mod weather;
pub mod web_search;
pub mod yield_model;

pub use knowledge_base::KnowledgeBaseTool;
pub use knowledge_graph::KnowledgeGraph;
pub use pest_classifier::PestClassifier;
pub use weather::WeatherTool;
pub use web_search::WebSearchTool;
pub use yield_model::YieldModel;

use crate::types::AppResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    YieldModel,
    PestClassifier,
    KnowledgeBase,
    KnowledgeGraph,
    WebSearch,
    Weather,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::YieldModel => "yield_model",
            ToolKind::PestClassifier => "pest_classifier",
            ToolKind::KnowledgeBase => "knowledge_base",
            ToolKind::KnowledgeGraph => "knowledge_graph",
            ToolKind::WebSearch => "web_search",
            ToolKind::Weather => "weather",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yield_model" => Some(ToolKind::YieldModel),
            "pest_classifier" => Some(ToolKind::PestClassifier),
            "knowledge_base" => Some(ToolKind::KnowledgeBase),
            "knowledge_graph" => Some(ToolKind::KnowledgeGraph),
            "web_search" => Some(ToolKind::WebSearch),
            "weather" => Some(ToolKind::Weather),
            _ => None,
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input handed to a tool by the orchestration loop.
#[derive(Debug, Clone, Default)]
pub struct ToolInput {
    pub query: String,
    pub image_base64: Option<String>,
}

impl ToolInput {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            image_base64: None,
        }
    }
}

/// Output of a tool run: human-readable content for the LLM context,
/// plus the structured payload when the tool has one.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool: ToolKind,
    pub content: String,
    pub data: Option<serde_json::Value>,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// One-line capability description, shown to the LLM routing fallback.
    fn description(&self) -> &'static str;

    async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ToolKind) -> bool {
        self.tools.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// (kind, description) pairs for prompt assembly, in stable order.
    pub fn catalog(&self) -> Vec<(ToolKind, &'static str)> {
        let mut entries: Vec<_> = self
            .tools
            .values()
            .map(|t| (t.kind(), t.description()))
            .collect();
        entries.sort_by_key(|(kind, _)| kind.as_str());
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_kind_round_trip() {
        for kind in [
            ToolKind::YieldModel,
            ToolKind::PestClassifier,
            ToolKind::KnowledgeBase,
            ToolKind::KnowledgeGraph,
            ToolKind::WebSearch,
            ToolKind::Weather,
        ] {
            assert_eq!(ToolKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ToolKind::parse("sprinkler"), None);
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn kind(&self) -> ToolKind {
            ToolKind::WebSearch
        }

        fn description(&self) -> &'static str {
            "echo"
        }

        async fn run(&self, input: &ToolInput) -> AppResult<ToolOutput> {
            Ok(ToolOutput {
                tool: self.kind(),
                content: input.query.clone(),
                data: None,
            })
        }
    }

    #[tokio::test]
    async fn test_registry_lookup_and_run() {
        let mut registry = ToolRegistry::new();
        registry.insert(Arc::new(EchoTool));

        assert!(registry.contains(ToolKind::WebSearch));
        assert!(!registry.contains(ToolKind::Weather));

        let tool = registry.get(ToolKind::WebSearch).unwrap();
        let out = tool.run(&ToolInput::text("maize prices")).await.unwrap();
        assert_eq!(out.content, "maize prices");
    }
}
