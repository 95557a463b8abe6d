//! Answer synthesis
//!
//! Turns the evidence trail into the final answer. The model is told to
//! use only the supplied evidence and to cite it; its text is returned
//! verbatim, citations are not checked.

use crate::llm::LanguageModel;
use crate::models::HistoryEntry;
use crate::Result;
use std::sync::Arc;
use tracing::info;

const NO_EVIDENCE: &str = "(수집된 근거 자료가 없습니다.)";

pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn synthesize(&self, request: &str, history: &[HistoryEntry]) -> Result<String> {
        let evidence = format_evidence(history);
        let prompt = build_prompt(request, &evidence);

        info!(evidence_blocks = history.len(), "Synthesizing final answer");

        self.model.complete(&prompt).await
    }
}

/// One labeled block per history entry, in insertion order.
pub fn format_evidence(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return NO_EVIDENCE.to_string();
    }

    history
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "[근거 {}]\n**실행 계획:** {}\n**수집된 근거:**\n{}",
                i + 1,
                entry.step,
                entry.result.evidence_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(request: &str, evidence: &str) -> String {
    format!(
        r#"당신은 수집된 근거 자료만을 사용하여 사용자의 초기 질문에 대한 최종 답변을 생성하는 전문 분석가입니다.
절대로 당신의 기존 지식을 사용해서는 안 됩니다. 답변은 반드시 한국어로 작성해야 합니다.
근거 자료에 오류가 기록되어 있다면, 해당 정보를 확인하지 못했다는 사실을 그대로 알려주세요.

**[사용자의 초기 질문]**
{request}

**[수집된 근거 자료]**
{evidence}

**[최종 답변]**
위 근거 자료를 바탕으로, 각 내용이 어떤 근거에서 나왔는지(예: [근거 1], [근거 2])를 명시하여 최종 답변을 생성해주세요.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use crate::models::{EvidenceOrigin, StepFailure, StepLine, StepResult, ToolKind};

    fn history() -> Vec<HistoryEntry> {
        vec![
            HistoryEntry::new(
                StepLine::new("1. [Tool: api_caller] 청년 정책자금 조건"),
                StepResult::Success {
                    output: "{\"product_name\":\"청년 소상공인 특별자금\"}".into(),
                },
                EvidenceOrigin::Tool(ToolKind::ApiCaller),
                3,
            ),
            HistoryEntry::new(
                StepLine::new("2. [Tool: ghost_tool] x"),
                StepResult::failure(StepFailure::UnknownTool, "'ghost_tool'은(는) 등록되지 않은 도구입니다."),
                EvidenceOrigin::Executor,
                0,
            ),
        ]
    }

    #[test]
    fn test_evidence_blocks_in_history_order() {
        let evidence = format_evidence(&history());

        let first = evidence.find("[근거 1]").unwrap();
        let second = evidence.find("[근거 2]").unwrap();
        assert!(first < second);
        assert!(evidence.contains("**실행 계획:** 1. [Tool: api_caller] 청년 정책자금 조건"));
        assert!(evidence.contains("오류(알 수 없는 도구)"));
    }

    #[test]
    fn test_empty_history_has_marker() {
        assert_eq!(format_evidence(&[]), NO_EVIDENCE);
    }

    #[tokio::test]
    async fn test_returns_model_text_verbatim() {
        let model = Arc::new(ScriptedModel::texts(["  청년 특별자금은 2.5%입니다 [근거 1]\n"]));
        let synthesizer = Synthesizer::new(model.clone());

        let answer = synthesizer
            .synthesize("청년 정책자금 알려줘", &history())
            .await
            .unwrap();

        assert_eq!(answer, "  청년 특별자금은 2.5%입니다 [근거 1]\n");
        let prompt = &model.prompts()[0];
        assert!(prompt.contains("청년 정책자금 알려줘"));
        assert!(prompt.contains("[근거 2]"));
        assert!(prompt.contains("기존 지식을 사용해서는 안 됩니다"));
    }
}
