//! LLM-powered planner
//!
//! Asks the model for the shortest plan that answers the request, then
//! filters its output down to step lines.

use crate::llm::LanguageModel;
use crate::models::{StepLine, ToolDescriptor};
use crate::planner::{parse_plan_output, Planner};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct LlmPlanner {
    model: Arc<dyn LanguageModel>,
}

impl LlmPlanner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Build structured planning prompt
    pub fn build_prompt(request: &str, catalog: &[ToolDescriptor]) -> String {
        let tool_lines = catalog
            .iter()
            .map(|t| format!("- **{}**: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"당신은 사용자의 질문을 해결하기 위한 '가장 효율적인' 실행 계획을 수립하는 전문 플래너입니다.
당신의 최우선 목표는 각 도구(tool)가 단 한 번의 호출로 작업을 완료할 수 있도록, **가능한 가장 짧고 간결한 계획**을 세우는 것입니다.

**[매우 중요한 규칙]**
- 사용자의 질문이 하나의 도구로 해결될 수 있다면, 계획은 **반드시 단 하나의 단계**여야 합니다.
- 절대 하나의 작업을 여러 개의 자잘한 단계로 나누지 마세요.
- 출력은 번호가 매겨진 목록**만** 작성하세요. 각 줄은 반드시 `[Tool: <도구 이름>] <도구에 전달할 질문>` 형식이어야 합니다.
- 목록 외의 설명, 인사말, 요약은 절대 쓰지 마세요.

**[예시]**
- **나쁜 계획 (절대 이렇게 하지 마세요):**
  1. [Tool: data_analyzer] 파일을 읽어줘.
  2. [Tool: data_analyzer] '상권_코드_명' 컬럼을 찾아줘.
  3. [Tool: data_analyzer] 그룹별로 개수를 세줘.
- **좋은 계획 (반드시 이렇게 하세요):**
  1. [Tool: data_analyzer] 'big_data_set1_f.csv' 파일에서 '상권_코드_명' 별로 데이터 개수를 계산해서 상위 5개만 알려줘.

**사용 가능한 도구:**
{tool_lines}

**사용자 질문:** "{request}"

**가장 효율적인 실행 계획 (위 규칙과 예시를 반드시 참고):**
"#
        )
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, request: &str, catalog: &[ToolDescriptor]) -> Result<Vec<StepLine>> {
        let prompt = Self::build_prompt(request, catalog);
        let response = self.model.complete(&prompt).await?;

        let steps = parse_plan_output(&response);

        info!(
            step_count = steps.len(),
            plan = ?steps.iter().map(StepLine::as_str).collect::<Vec<_>>(),
            "Plan created"
        );

        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrchestrationError;
    use crate::llm::{Reply, ScriptedModel};
    use crate::models::ToolKind;

    fn catalog() -> Vec<ToolDescriptor> {
        ToolKind::ALL
            .iter()
            .map(|k| ToolDescriptor {
                name: k.name().to_string(),
                description: k.description().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_prompt_lists_tools_rules_and_examples() {
        let prompt = LlmPlanner::build_prompt("청년 정책자금 알려줘", &catalog());

        assert!(prompt.contains("- **api_caller**: '정책자금'"));
        assert!(prompt.contains("- **marketing_idea_generator**"));
        assert!(prompt.contains("[Tool: <도구 이름>]"));
        assert!(prompt.contains("나쁜 계획"));
        assert!(prompt.contains("좋은 계획"));
        assert!(prompt.contains("\"청년 정책자금 알려줘\""));
    }

    #[tokio::test]
    async fn test_plan_filters_model_output() {
        let model = Arc::new(ScriptedModel::texts([
            "물론입니다! 계획은 다음과 같습니다.\n1. [Tool: api_caller] 청년 정책자금 조건\n\n이상입니다.",
        ]));
        let planner = LlmPlanner::new(model.clone());

        let steps = planner.plan("청년 정책자금 알려줘", &catalog()).await.unwrap();

        assert_eq!(steps, vec![StepLine::new("1. [Tool: api_caller] 청년 정책자금 조건")]);
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let planner = LlmPlanner::new(Arc::new(ScriptedModel::new(vec![Reply::Fail(
            "timeout".into(),
        )])));

        let err = planner.plan("질문", &catalog()).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::ModelInvocationError(_)));
    }
}
