//! Keyword-routing planner
//!
//! Deterministic single-step routing for when no planning model is wanted.
//! The whole request becomes the sub-query of the chosen tool.

use crate::models::{StepLine, ToolDescriptor, ToolKind};
use crate::planner::Planner;
use crate::Result;
use async_trait::async_trait;
use tracing::debug;

/// Static keyword lists, checked in priority order.
const ROUTES: &[(ToolKind, &[&str])] = &[
    (
        ToolKind::ApiCaller,
        &["정책자금", "대출", "지원금", "보증", "금리", "loan", "fund"],
    ),
    (
        ToolKind::MarketingIdeaGenerator,
        &["마케팅", "홍보", "프로모션", "이벤트 아이디어", "marketing", "promotion"],
    ),
    (
        ToolKind::DataAnalyzer,
        &["데이터", "분석", "csv", "엑셀", "파일", "매출", "상권", "data", "analy"],
    ),
    (
        ToolKind::WebSearcher,
        &["트렌드", "뉴스", "최신", "검색", "trend", "news"],
    ),
];

const FALLBACK: ToolKind = ToolKind::WebSearcher;

pub struct KeywordPlanner;

impl KeywordPlanner {
    /// Pick a tool among those actually offered in `catalog`.
    pub fn route(request: &str, catalog: &[ToolDescriptor]) -> Option<ToolKind> {
        let lowered = request.to_lowercase();
        let offered = |kind: ToolKind| catalog.iter().any(|t| t.name == kind.name());

        ROUTES
            .iter()
            .filter(|(kind, _)| offered(*kind))
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(kind, _)| *kind)
            .or_else(|| offered(FALLBACK).then_some(FALLBACK))
    }
}

#[async_trait]
impl Planner for KeywordPlanner {
    async fn plan(&self, request: &str, catalog: &[ToolDescriptor]) -> Result<Vec<StepLine>> {
        let request = request.trim();
        if request.is_empty() {
            return Ok(Vec::new());
        }

        let steps: Vec<StepLine> = Self::route(request, catalog)
            .map(|kind| StepLine::new(format!("[Tool: {}] {}", kind.name(), request)))
            .into_iter()
            .collect();

        debug!(step_count = steps.len(), "Keyword route selected");
        Ok(steps)
    }
}
