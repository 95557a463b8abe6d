//! Error types for the consulting agent
//!
//! Only turn-level failures live here. Per-step problems (malformed steps,
//! unknown tools, failing tools) are absorbed into evidence as
//! [`crate::models::StepResult::Failure`] and never surface as errors.

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Model invocation error: {0}")]
    ModelInvocationError(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("Invalid run state: {0}")]
    InvalidState(String),

    #[error("Max iterations exceeded: {0}")]
    MaxIterationsExceeded(usize),

    #[error("Checkpoint error: {0}")]
    CheckpointError(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    /// Human-readable message safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            OrchestrationError::ModelInvocationError(_) => {
                "AI 모델 호출에 실패했습니다. 잠시 후 다시 시도해 주세요.".to_string()
            }
            OrchestrationError::MaxIterationsExceeded(limit) => format!(
                "작업 계획이 너무 길어 {}단계에서 중단했습니다. 질문을 나누어 다시 시도해 주세요.",
                limit
            ),
            OrchestrationError::SessionNotFound(_) | OrchestrationError::CheckpointError(_) => {
                "이전 대화 상태를 찾을 수 없습니다. 새로 질문해 주세요.".to_string()
            }
            OrchestrationError::ConfigError(_) => {
                "서버 설정에 문제가 있습니다. 관리자에게 문의해 주세요.".to_string()
            }
            _ => "요청을 처리하는 중 문제가 발생했습니다. 다시 시도해 주세요.".to_string(),
        }
    }

    /// Whether the caller can reasonably retry the same turn.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestrationError::ModelInvocationError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_failure_asks_to_retry() {
        let err = OrchestrationError::ModelInvocationError("quota exceeded".into());
        assert!(err.is_retryable());
        assert!(err.user_message().contains("다시 시도"));
        assert!(!err.user_message().contains("quota"));
    }

    #[test]
    fn test_io_error_converts_and_hides_details() {
        let err: OrchestrationError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "/secret/path").into();
        assert!(matches!(err, OrchestrationError::IoError(_)));
        assert!(!err.is_retryable());
        assert!(!err.user_message().contains("/secret/path"));
    }

    #[test]
    fn test_state_errors_are_not_retryable() {
        let err = OrchestrationError::InvalidState("plan is empty".into());
        assert!(!err.is_retryable());
    }
}
