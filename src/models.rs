//! Core data models for the consulting agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OrchestrationError;

/// Opening delimiter of a tool tag inside a plan line.
pub const TOOL_TAG_OPEN: &str = "[Tool: ";
/// Marker a planner line must contain to be kept at all.
pub const TOOL_MARKER: &str = "[Tool:";

//
// ================= Tools =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    DataAnalyzer,
    WebSearcher,
    ApiCaller,
    MarketingIdeaGenerator,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::DataAnalyzer,
        ToolKind::WebSearcher,
        ToolKind::ApiCaller,
        ToolKind::MarketingIdeaGenerator,
    ];

    /// Name used in `[Tool: <name>]` tags.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::DataAnalyzer => "data_analyzer",
            ToolKind::WebSearcher => "web_searcher",
            ToolKind::ApiCaller => "api_caller",
            ToolKind::MarketingIdeaGenerator => "marketing_idea_generator",
        }
    }

    /// One-line description shown to the planner.
    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::DataAnalyzer => "CSV, Excel 파일의 내용을 분석합니다.",
            ToolKind::WebSearcher => "최신 트렌드, 뉴스 등을 웹에서 검색합니다.",
            ToolKind::ApiCaller => "'정책자금', '대출' 등 금융 상품 정보를 조회합니다.",
            ToolKind::MarketingIdeaGenerator => {
                "분석 결과나 트렌드를 바탕으로 매장 마케팅 아이디어를 제안합니다."
            }
        }
    }
}

impl FromStr for ToolKind {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| OrchestrationError::ToolNotFound(s.to_string()))
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Catalog entry handed to planners.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

//
// ================= Plan =================
//

/// Raw text of one planned step, exactly as the planner emitted it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct StepLine(String);

impl StepLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse `... [Tool: <name>] <query>` into a typed [`Step`].
    pub fn parse(&self) -> Result<Step, StepFailure> {
        let text = self.0.as_str();

        let start = text
            .find(TOOL_TAG_OPEN)
            .ok_or(StepFailure::MalformedStep)?
            + TOOL_TAG_OPEN.len();
        let rest = &text[start..];
        let close = rest.find(']').ok_or(StepFailure::MalformedStep)?;

        let tool_name = rest[..close].trim();
        if tool_name.is_empty() {
            return Err(StepFailure::MalformedStep);
        }

        Ok(Step {
            tool_name: tool_name.to_string(),
            sub_query: rest[close + 1..].trim().to_string(),
        })
    }
}

impl fmt::Display for StepLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepLine {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A parsed step: which tool to call and with what query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub tool_name: String,
    pub sub_query: String,
}

//
// ================= Execution =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepFailure {
    MalformedStep,
    UnknownTool,
    ToolExecution,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepFailure::MalformedStep => "계획 형식 오류",
            StepFailure::UnknownTool => "알 수 없는 도구",
            StepFailure::ToolExecution => "도구 실행 오류",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Success { output: String },
    Failure { failure: StepFailure, reason: String },
}

impl StepResult {
    pub fn failure(failure: StepFailure, reason: impl Into<String>) -> Self {
        StepResult::Failure {
            failure,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepResult::Success { .. })
    }

    /// Success and failure both become plain evidence text.
    pub fn evidence_text(&self) -> String {
        match self {
            StepResult::Success { output } => output.clone(),
            StepResult::Failure { failure, reason } => format!("오류({}): {}", failure, reason),
        }
    }
}

/// Who produced a history entry's text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "source", content = "tool", rename_all = "snake_case")]
pub enum EvidenceOrigin {
    Tool(ToolKind),
    Executor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step: StepLine,
    pub result: StepResult,
    pub origin: EvidenceOrigin,
    pub recorded_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl HistoryEntry {
    pub fn new(step: StepLine, result: StepResult, origin: EvidenceOrigin, elapsed_ms: u64) -> Self {
        Self {
            step,
            result,
            origin,
            recorded_at: Utc::now(),
            elapsed_ms,
        }
    }
}
