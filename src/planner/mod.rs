//! Planner trait and implementations
//!
//! A planner turns the user's request into an ordered list of
//! `[Tool: <name>] <query>` lines. Execution parses them later.

use crate::models::{StepLine, ToolDescriptor, TOOL_MARKER};
use crate::Result;
use async_trait::async_trait;
use tracing::debug;

pub mod keyword;
pub mod llm;
pub use keyword::KeywordPlanner;
pub use llm::LlmPlanner;

/// Trait for plan generation
#[async_trait]
pub trait Planner: Send + Sync {
    /// An empty plan is a valid outcome: nothing to execute.
    async fn plan(&self, request: &str, catalog: &[ToolDescriptor]) -> Result<Vec<StepLine>>;
}

/// Keep only lines carrying the `[Tool:` marker, trimmed, in order.
/// Preambles, commentary and blank lines are dropped.
pub fn parse_plan_output(raw: &str) -> Vec<StepLine> {
    let mut dropped = 0usize;

    let steps: Vec<StepLine> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            if line.contains(TOOL_MARKER) {
                Some(StepLine::new(line))
            } else {
                dropped += 1;
                None
            }
        })
        .collect();

    if dropped > 0 {
        debug!(kept = steps.len(), dropped, "Dropped non-step planner lines");
    }

    steps
}

/// Fixed plan, for development & testing
pub struct StaticPlanner {
    steps: Vec<StepLine>,
}

impl StaticPlanner {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: steps.into_iter().map(|s| StepLine::new(s)).collect(),
        }
    }
}

#[async_trait]
impl Planner for StaticPlanner {
    async fn plan(&self, _request: &str, _catalog: &[ToolDescriptor]) -> Result<Vec<StepLine>> {
        Ok(self.steps.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_keeps_order_and_drops_commentary() {
        let raw = "다음은 계획입니다:\n\n1. [Tool: data_analyzer] 상권별 개수 상위 5개\n   \n설명: 분석 후 검색합니다.\n2. [Tool: web_searcher] 카페 트렌드\n3. [Tool: api_caller] 청년 정책자금\n감사합니다.";

        let steps = parse_plan_output(raw);
        let texts: Vec<&str> = steps.iter().map(|s| s.as_str()).collect();

        assert_eq!(
            texts,
            vec![
                "1. [Tool: data_analyzer] 상권별 개수 상위 5개",
                "2. [Tool: web_searcher] 카페 트렌드",
                "3. [Tool: api_caller] 청년 정책자금",
            ]
        );
    }

    #[test]
    fn test_no_markers_yields_empty_plan() {
        assert!(parse_plan_output("죄송하지만 도구가 필요 없습니다.\n바로 답변드릴게요.").is_empty());
        assert!(parse_plan_output("").is_empty());
    }

    #[test]
    fn test_marker_without_space_survives_filter() {
        // Malformed for execution, but the filter only checks the marker.
        let steps = parse_plan_output("[Tool:api_caller] x");
        assert_eq!(steps.len(), 1);
    }

    #[tokio::test]
    async fn test_static_planner() {
        let planner = StaticPlanner::new(["[Tool: api_caller] 청년 정책자금 조건"]);
        let steps = planner.plan("청년 정책자금 알려줘", &[]).await.unwrap();
        assert_eq!(steps, vec![StepLine::new("[Tool: api_caller] 청년 정책자금 조건")]);
    }
}
