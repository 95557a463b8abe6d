//! Execution engine
//!
//! Runs exactly one plan step per call. Whatever happens to that step
//! (bad format, unknown tool, tool failure) ends up as one history entry;
//! the run itself is never aborted from here.

use crate::error::OrchestrationError;
use crate::models::{EvidenceOrigin, HistoryEntry, StepFailure, StepLine, StepResult};
use crate::state::RunState;
use crate::tools::ToolRegistry;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct Executor {
    tool_registry: Arc<ToolRegistry>,
}

impl Executor {
    pub fn new(tool_registry: ToolRegistry) -> Self {
        Self {
            tool_registry: Arc::new(tool_registry),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    /// Consume the first planned step and append its outcome to history.
    ///
    /// Fails only when there is nothing left to execute; `state` is then
    /// left untouched.
    pub async fn step(&self, state: &mut RunState) -> Result<()> {
        let step_line = state.pop_step().ok_or_else(|| {
            OrchestrationError::InvalidState("executor called with an empty plan".to_string())
        })?;

        let entry = self.execute_line(step_line).await;
        state.record(entry);

        Ok(())
    }

    async fn execute_line(&self, step_line: StepLine) -> HistoryEntry {
        let step = match step_line.parse() {
            Ok(step) => step,
            Err(failure) => {
                warn!(step = %step_line, "Malformed plan step");
                return HistoryEntry::new(
                    step_line,
                    StepResult::failure(failure, "계획 형식이 잘못되었습니다."),
                    EvidenceOrigin::Executor,
                    0,
                );
            }
        };

        let Some(tool) = self.tool_registry.resolve(&step.tool_name) else {
            warn!(tool_name = %step.tool_name, "Tool not registered");
            return HistoryEntry::new(
                step_line,
                StepResult::failure(
                    StepFailure::UnknownTool,
                    format!("'{}'은(는) 등록되지 않은 도구입니다.", step.tool_name),
                ),
                EvidenceOrigin::Executor,
                0,
            );
        };

        debug!(
            tool_name = %step.tool_name,
            query = %step.sub_query,
            "Executing step"
        );

        let start = Instant::now();
        let result = match tool.invoke(&step.sub_query).await {
            Ok(output) => StepResult::Success { output },
            Err(e) => {
                warn!(tool_name = %step.tool_name, error = %e, "Tool execution failed");
                StepResult::failure(
                    StepFailure::ToolExecution,
                    format!("도구 실행 중 오류 발생: {}", e),
                )
            }
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        HistoryEntry::new(step_line, result, EvidenceOrigin::Tool(tool.kind()), elapsed_ms)
    }
}
