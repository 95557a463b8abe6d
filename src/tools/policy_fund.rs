//! Policy-fund lookup (`api_caller`)
//!
//! Stand-in for the small-business financing API: returns a fixed product
//! record chosen by topic.

use crate::models::ToolKind;
use crate::tools::Tool;
use crate::Result;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct PolicyFund {
    pub product_name: &'static str,
    pub interest_rate: &'static str,
    pub limit: &'static str,
    pub conditions: &'static str,
}

const YOUTH_FUND: PolicyFund = PolicyFund {
    product_name: "청년 소상공인 특별자금",
    interest_rate: "2.5%",
    limit: "1억원 이내",
    conditions: "만 39세 이하 청년 창업가",
};

const GROWTH_FUND: PolicyFund = PolicyFund {
    product_name: "일반 소상공인 성장자금",
    interest_rate: "3.0%~",
    limit: "5억원 이내",
    conditions: "업력 1년 이상 소상공인",
};

pub fn lookup_policy_fund(topic: &str) -> &'static PolicyFund {
    if topic.contains("청년") {
        &YOUTH_FUND
    } else {
        &GROWTH_FUND
    }
}

pub struct PolicyFundTool;

#[async_trait::async_trait]
impl Tool for PolicyFundTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ApiCaller
    }

    async fn invoke(&self, query: &str) -> Result<String> {
        info!(topic = %query, "Policy fund lookup");
        Ok(serde_json::to_string(lookup_policy_fund(query))?)
    }
}
