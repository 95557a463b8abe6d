//! Tool trait and registry
//!
//! Every capability has the same contract: text query in, text out.
//! The registry is built once at startup and only read afterwards.

use crate::config::AppConfig;
use crate::llm::{GeminiClient, LanguageModel};
use crate::models::{ToolDescriptor, ToolKind};
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod data_analysis;
pub mod marketing;
pub mod policy_fund;
pub mod web_search;

pub use data_analysis::DataAnalysisTool;
pub use marketing::MarketingIdeaTool;
pub use policy_fund::PolicyFundTool;
pub use web_search::WebSearchTool;

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn description(&self) -> &'static str {
        self.kind().description()
    }

    async fn invoke(&self, query: &str) -> Result<String>;
}

/// Tool registry for looking up tools by their `[Tool: <name>]` name
pub struct ToolRegistry {
    tools: BTreeMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    /// `None` for names that are not a known kind or not registered.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let kind: ToolKind = name.parse().ok()?;
        self.tools.get(&kind).cloned()
    }

    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.kind().name().to_string(),
                description: tool.description().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the production registry with all four consulting tools.
pub fn create_default_registry(config: &AppConfig, model: Arc<dyn LanguageModel>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // Idea generation runs hotter than planning and synthesis.
    let creative_model: Arc<dyn LanguageModel> = Arc::new(
        GeminiClient::new(config.gemini_api_key.clone())
            .with_model(config.gemini_model.clone())
            .with_temperature(0.7),
    );

    registry.register(Arc::new(DataAnalysisTool::new(
        config.data_dir.clone(),
        model,
    )));
    registry.register(Arc::new(WebSearchTool::new(config.tavily_api_key.clone())));
    registry.register(Arc::new(PolicyFundTool));
    registry.register(Arc::new(MarketingIdeaTool::new(creative_model)));

    registry
}
