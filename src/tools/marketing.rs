//! Marketing idea generation (`marketing_idea_generator`)

use crate::error::OrchestrationError;
use crate::llm::LanguageModel;
use crate::models::ToolKind;
use crate::tools::Tool;
use crate::Result;
use std::sync::Arc;

pub struct MarketingIdeaTool {
    model: Arc<dyn LanguageModel>,
}

impl MarketingIdeaTool {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

fn build_prompt(topic: &str) -> String {
    format!(
        r#"당신은 데이터 기반 마케팅 아이디어 전문가입니다.
아래에 제공된 '분석 결과 및 트렌드'를 바탕으로, 소상공인 매장을 위한 **구체적이고 실행 가능한 마케팅 아이디어 3가지**를 각각의 근거와 함께 제안해주세요.

**[분석 결과 및 트렌드]**
{topic}

**[마케팅 아이디어 제안 (구체적인 실행 방안과 근거 포함)]**
1. **아이디어**: ...
   - **근거**: ...
2. ...
"#
    )
}

#[async_trait::async_trait]
impl Tool for MarketingIdeaTool {
    fn kind(&self) -> ToolKind {
        ToolKind::MarketingIdeaGenerator
    }

    async fn invoke(&self, query: &str) -> Result<String> {
        if query.trim().is_empty() {
            return Err(OrchestrationError::InvalidToolInput(
                "marketing topic is empty".to_string(),
            ));
        }
        self.model.complete(&build_prompt(query)).await
    }
}
