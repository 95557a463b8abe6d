//! Main orchestrator - implements the turn loop
//!
//! PLANNING → EXECUTING ⟲ → SYNTHESIZING → DONE
//!
//! Every transition is decided by [`next_phase`] from the shape of the
//! [`RunState`] alone, and the state is checkpointed after each one.

use crate::config::{AppConfig, PlannerStrategy};
use crate::error::OrchestrationError;
use crate::execution::Executor;
use crate::llm::{GeminiClient, LanguageModel};
use crate::memory::{ConversationMessage, MessageRole, SessionState};
use crate::models::{HistoryEntry, StepLine};
use crate::planner::{KeywordPlanner, LlmPlanner, Planner};
use crate::state::{Checkpoint, CheckpointStore, InMemoryCheckpointStore, Phase, RunState};
use crate::synthesis::Synthesizer;
use crate::tools::create_default_registry;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Pure transition function of the turn state machine.
pub fn next_phase(phase: Phase, run: &RunState) -> Phase {
    match phase {
        Phase::Planning | Phase::Executing if run.is_ready_for_synthesis() => Phase::Synthesizing,
        Phase::Planning | Phase::Executing => Phase::Executing,
        Phase::Synthesizing | Phase::Done => Phase::Done,
    }
}

/// Progress notifications for live display.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    Planned {
        plan: Vec<StepLine>,
    },
    StepExecuted {
        entry: HistoryEntry,
        remaining: Vec<StepLine>,
    },
    Answered {
        answer: String,
    },
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub final_answer: String,
    pub session: SessionState,
    pub run: RunState,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Ceiling on executed steps per turn; a turn that reaches it with
    /// steps left fails with `MaxIterationsExceeded`.
    pub max_iterations: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: crate::config::DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Coordinates planner, executor and synthesizer for one turn at a time
pub struct Orchestrator {
    planner: Box<dyn Planner>,
    executor: Executor,
    synthesizer: Synthesizer,
    checkpoints: Box<dyn CheckpointStore>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        planner: Box<dyn Planner>,
        executor: Executor,
        synthesizer: Synthesizer,
        checkpoints: Box<dyn CheckpointStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            planner,
            executor,
            synthesizer,
            checkpoints,
            config,
        }
    }

    /// Wire the production components from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let model: Arc<dyn LanguageModel> = Arc::new(
            GeminiClient::new(config.gemini_api_key.clone()).with_model(config.gemini_model.clone()),
        );

        let planner: Box<dyn Planner> = match config.planner {
            PlannerStrategy::Llm => Box::new(LlmPlanner::new(model.clone())),
            PlannerStrategy::Keyword => Box::new(KeywordPlanner),
        };

        let registry = create_default_registry(config, model.clone());

        info!(
            planner = ?config.planner,
            tools = ?registry.catalog().iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            max_iterations = config.max_iterations,
            "Orchestrator wired"
        );

        Self::new(
            planner,
            Executor::new(registry),
            Synthesizer::new(model),
            Box::new(InMemoryCheckpointStore::new()),
            OrchestratorConfig {
                max_iterations: config.max_iterations,
            },
        )
    }

    /// Run one phase action, then transition.
    pub async fn advance(&self, phase: Phase, run: &mut RunState) -> Result<Phase> {
        match phase {
            Phase::Planning => {
                let catalog = self.executor.registry().catalog();
                let plan = self.planner.plan(run.request(), &catalog).await?;

                if plan.len() > self.config.max_iterations {
                    warn!(
                        planned = plan.len(),
                        limit = self.config.max_iterations,
                        "Plan exceeds iteration ceiling"
                    );
                }

                run.begin(plan);
            }
            Phase::Executing => self.executor.step(run).await?,
            Phase::Synthesizing => {
                let answer = self.synthesizer.synthesize(run.request(), run.history()).await?;
                run.set_final_answer(answer)?;
            }
            Phase::Done => {}
        }

        Ok(next_phase(phase, run))
    }

    pub async fn run_turn(&self, request: &str, prior: Option<SessionState>) -> Result<TurnOutcome> {
        self.start(request, prior, None).await
    }

    /// Like [`run_turn`](Self::run_turn), streaming progress to `events`.
    pub async fn run_turn_with_events(
        &self,
        request: &str,
        prior: Option<SessionState>,
        events: UnboundedSender<TurnEvent>,
    ) -> Result<TurnOutcome> {
        self.start(request, prior, Some(&events)).await
    }

    /// Continue a paused or aborted turn from its last checkpoint.
    pub async fn resume(&self, session: SessionState) -> Result<TurnOutcome> {
        let checkpoint = self
            .checkpoints
            .load(&session.session_id)
            .await?
            .ok_or_else(|| OrchestrationError::SessionNotFound(session.session_id.clone()))?;
        checkpoint.verify()?;

        info!(
            session_id = %session.session_id,
            phase = ?checkpoint.phase,
            remaining_steps = checkpoint.run.remaining_steps(),
            "Resuming turn"
        );

        if checkpoint.phase == Phase::Done {
            let final_answer = finished_answer(&checkpoint.run)?;
            return Ok(TurnOutcome {
                final_answer,
                session,
                run: checkpoint.run,
            });
        }

        self.drive(session, checkpoint.phase, checkpoint.run, None, true).await
    }

    pub async fn checkpoint(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        self.checkpoints.load(session_id).await
    }

    /// Drop the checkpoint of a session.
    pub async fn discard(&self, session_id: &str) -> Result<()> {
        self.checkpoints.remove(session_id).await
    }

    async fn start(
        &self,
        request: &str,
        prior: Option<SessionState>,
        events: Option<&UnboundedSender<TurnEvent>>,
    ) -> Result<TurnOutcome> {
        let session = prior.unwrap_or_default();

        info!(
            session_id = %session.session_id,
            request = %request,
            "Orchestrator: starting turn"
        );

        let run = RunState::new(request);
        self.checkpoints
            .save(Checkpoint::new(&session.session_id, Phase::Planning, run.clone())?)
            .await?;

        self.drive(session, Phase::Planning, run, events, false).await
    }

    async fn drive(
        &self,
        mut session: SessionState,
        mut phase: Phase,
        mut run: RunState,
        events: Option<&UnboundedSender<TurnEvent>>,
        resumed: bool,
    ) -> Result<TurnOutcome> {
        let start_time = Instant::now();

        while phase != Phase::Done {
            // Every executed step leaves one history entry, so the ceiling
            // also holds across resumes.
            if phase == Phase::Executing && run.history().len() >= self.config.max_iterations {
                error!(
                    session_id = %session.session_id,
                    limit = self.config.max_iterations,
                    remaining_steps = run.remaining_steps(),
                    "Executor iteration ceiling reached"
                );
                return Err(OrchestrationError::MaxIterationsExceeded(
                    self.config.max_iterations,
                ));
            }

            let next = self.advance(phase, &mut run).await.map_err(|e| {
                error!(
                    session_id = %session.session_id,
                    phase = ?phase,
                    error = %e,
                    "Turn aborted"
                );
                e
            })?;

            debug!(from = ?phase, to = ?next, "Phase transition");

            if let Some(tx) = events {
                if let Some(event) = event_for(phase, &run) {
                    // A closed receiver only means nobody is watching.
                    let _ = tx.send(event);
                }
            }

            phase = next;
            self.checkpoints
                .save(Checkpoint::new(&session.session_id, phase, run.clone())?)
                .await?;
        }

        let final_answer = finished_answer(&run)?;

        session
            .transcript
            .add_message(ConversationMessage::new(MessageRole::User, run.request()));
        if resumed {
            session.transcript.add_message(ConversationMessage::new(
                MessageRole::System,
                "중단된 답변을 이어서 생성했습니다.",
            ));
        }
        session
            .transcript
            .add_message(ConversationMessage::new(MessageRole::Assistant, final_answer.clone()));

        info!(
            session_id = %session.session_id,
            evidence = run.history().len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Turn complete"
        );

        Ok(TurnOutcome {
            final_answer,
            session,
            run,
        })
    }
}

fn finished_answer(run: &RunState) -> Result<String> {
    run.final_answer()
        .map(str::to_string)
        .ok_or_else(|| OrchestrationError::InvalidState("turn finished without an answer".to_string()))
}

/// Event describing what the phase that just ran produced.
fn event_for(phase: Phase, run: &RunState) -> Option<TurnEvent> {
    match phase {
        Phase::Planning => Some(TurnEvent::Planned {
            plan: run.plan().cloned().collect(),
        }),
        Phase::Executing => run.history().last().map(|entry| TurnEvent::StepExecuted {
            entry: entry.clone(),
            remaining: run.plan().cloned().collect(),
        }),
        Phase::Synthesizing => run.final_answer().map(|answer| TurnEvent::Answered {
            answer: answer.to_string(),
        }),
        Phase::Done => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Reply, ScriptedModel};
    use crate::models::{StepFailure, StepResult};
    use crate::planner::StaticPlanner;
    use crate::tools::{PolicyFundTool, ToolRegistry};

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(PolicyFundTool));
        registry
    }

    fn llm_orchestrator(model: Arc<ScriptedModel>) -> Orchestrator {
        Orchestrator::new(
            Box::new(LlmPlanner::new(model.clone())),
            Executor::new(registry()),
            Synthesizer::new(model),
            Box::new(InMemoryCheckpointStore::new()),
            OrchestratorConfig::default(),
        )
    }

    fn static_orchestrator(steps: &[&str], model: Arc<ScriptedModel>, max_iterations: usize) -> Orchestrator {
        Orchestrator::new(
            Box::new(StaticPlanner::new(steps.iter().copied())),
            Executor::new(registry()),
            Synthesizer::new(model),
            Box::new(InMemoryCheckpointStore::new()),
            OrchestratorConfig { max_iterations },
        )
    }

    #[test]
    fn test_next_phase_depends_only_on_plan_shape() {
        let empty = RunState::new("q");
        let mut pending = RunState::new("q");
        pending.begin(vec![StepLine::new("[Tool: api_caller] x")]);

        assert_eq!(next_phase(Phase::Planning, &pending), Phase::Executing);
        assert_eq!(next_phase(Phase::Planning, &empty), Phase::Synthesizing);
        assert_eq!(next_phase(Phase::Executing, &pending), Phase::Executing);
        assert_eq!(next_phase(Phase::Executing, &empty), Phase::Synthesizing);
        assert_eq!(next_phase(Phase::Synthesizing, &empty), Phase::Done);
        assert_eq!(next_phase(Phase::Done, &empty), Phase::Done);
    }

    #[tokio::test]
    async fn test_youth_fund_turn() {
        let model = Arc::new(ScriptedModel::new(vec![
            Reply::Text("1. [Tool: api_caller] 청년 정책자금 조건".into()),
            Reply::Echo,
        ]));
        let orchestrator = llm_orchestrator(model.clone());

        let outcome = orchestrator.run_turn("청년 정책자금 알려줘", None).await.unwrap();

        assert_eq!(outcome.run.history().len(), 1);
        assert_eq!(outcome.run.remaining_steps(), 0);
        assert!(outcome.final_answer.contains("청년 소상공인 특별자금"));
        assert!(outcome.final_answer.contains("청년 정책자금 알려줘"));
        assert_eq!(outcome.session.transcript.message_count(), 2);
        assert_eq!(model.prompts().len(), 2);

        let checkpoint = orchestrator
            .checkpoint(&outcome.session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.phase, Phase::Done);
        checkpoint.verify().unwrap();
    }

    #[tokio::test]
    async fn test_empty_plan_goes_straight_to_synthesis() {
        let model = Arc::new(ScriptedModel::new(vec![
            Reply::Text("이 질문은 도구 없이 답할 수 있습니다.".into()),
            Reply::Echo,
        ]));
        let orchestrator = llm_orchestrator(model);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let outcome = orchestrator
            .run_turn_with_events("안녕하세요", None, tx)
            .await
            .unwrap();

        assert!(outcome.run.history().is_empty());
        assert!(outcome.final_answer.contains("수집된 근거 자료가 없습니다"));

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], TurnEvent::Planned { plan } if plan.is_empty()));
        assert!(matches!(&events[1], TurnEvent::Answered { .. }));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_not_fatal() {
        let model = Arc::new(ScriptedModel::default());
        let orchestrator = static_orchestrator(
            &["[Tool: ghost_tool] x", "[Tool: api_caller] 운영자금"],
            model,
            20,
        );

        let outcome = orchestrator.run_turn("자금 알려줘", None).await.unwrap();

        assert_eq!(outcome.run.history().len(), 2);
        assert!(matches!(
            outcome.run.history()[0].result,
            StepResult::Failure {
                failure: StepFailure::UnknownTool,
                ..
            }
        ));
        assert!(outcome.final_answer.contains("오류(알 수 없는 도구)"));
        assert!(outcome.final_answer.contains("일반 소상공인 성장자금"));
    }

    #[tokio::test]
    async fn test_history_matches_dequeued_steps_and_events() {
        let orchestrator = static_orchestrator(
            &["[Tool: api_caller] a", "not a step", "[Tool: api_caller] 청년"],
            Arc::new(ScriptedModel::default()),
            20,
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let outcome = orchestrator.run_turn_with_events("q", None, tx).await.unwrap();
        assert_eq!(outcome.run.history().len(), 3);

        let mut remaining = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let TurnEvent::StepExecuted { remaining: r, .. } = event {
                remaining.push(r.len());
            }
        }
        assert_eq!(remaining, vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn test_plan_over_ceiling_aborts_turn() {
        let steps = ["[Tool: api_caller] a", "[Tool: api_caller] b", "[Tool: api_caller] c"];
        let model = Arc::new(ScriptedModel::default());
        let orchestrator = static_orchestrator(&steps, model.clone(), 2);
        let session = SessionState::with_id("long");

        let err = orchestrator
            .run_turn("q", Some(session.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::MaxIterationsExceeded(2)));
        assert!(err.user_message().contains("2단계"));
        // No answer was synthesized from partial evidence.
        assert!(model.prompts().is_empty());

        let paused = orchestrator.checkpoint("long").await.unwrap().unwrap();
        assert_eq!(paused.phase, Phase::Executing);
        assert_eq!(paused.run.history().len(), 2);
        assert_eq!(paused.run.plan().next().map(StepLine::as_str), Some("[Tool: api_caller] c"));

        // The ceiling holds on resume as well.
        let err = orchestrator.resume(session).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::MaxIterationsExceeded(2)));
    }

    #[tokio::test]
    async fn test_plan_at_ceiling_completes() {
        let steps = ["[Tool: api_caller] a", "[Tool: api_caller] b"];
        let orchestrator = static_orchestrator(&steps, Arc::new(ScriptedModel::default()), 2);

        let outcome = orchestrator.run_turn("q", None).await.unwrap();
        assert_eq!(outcome.run.history().len(), 2);
    }

    #[tokio::test]
    async fn test_planner_failure_aborts_turn() {
        let model = Arc::new(ScriptedModel::new(vec![Reply::Fail("quota".into())]));
        let orchestrator = llm_orchestrator(model);

        let err = orchestrator.run_turn("질문", None).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::ModelInvocationError(_)));
        assert!(err.user_message().contains("다시 시도"));
    }

    #[tokio::test]
    async fn test_resume_after_synthesis_failure_skips_tools() {
        let model = Arc::new(ScriptedModel::new(vec![
            Reply::Text("1. [Tool: api_caller] 청년 정책자금 조건".into()),
            Reply::Fail("timeout".into()),
            Reply::Text("청년 특별자금 금리는 2.5%입니다 [근거 1]".into()),
        ]));
        let orchestrator = llm_orchestrator(model.clone());
        let session = SessionState::with_id("s-1");

        let err = orchestrator
            .run_turn("청년 정책자금 알려줘", Some(session.clone()))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let paused = orchestrator.checkpoint("s-1").await.unwrap().unwrap();
        assert_eq!(paused.phase, Phase::Synthesizing);
        assert_eq!(paused.run.history().len(), 1);

        let outcome = orchestrator.resume(session).await.unwrap();
        assert_eq!(outcome.final_answer, "청년 특별자금 금리는 2.5%입니다 [근거 1]");
        assert_eq!(outcome.run.history().len(), 1);
        assert_eq!(model.prompts().len(), 3);
        let roles: Vec<MessageRole> = outcome.session.transcript.messages().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::System, MessageRole::Assistant]
        );
        assert_eq!(outcome.session.transcript.visible_messages().count(), 2);

        // Resuming a finished turn returns the same answer without new calls.
        let again = orchestrator.resume(outcome.session.clone()).await.unwrap();
        assert_eq!(again.final_answer, outcome.final_answer);
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_resume_unknown_session() {
        let orchestrator = llm_orchestrator(Arc::new(ScriptedModel::default()));
        let err = orchestrator
            .resume(SessionState::with_id("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_prior_session_is_continued() {
        let orchestrator = static_orchestrator(
            &["[Tool: api_caller] 청년"],
            Arc::new(ScriptedModel::default()),
            20,
        );

        let first = orchestrator.run_turn("첫 질문", None).await.unwrap();
        let session_id = first.session.session_id.clone();
        let second = orchestrator
            .run_turn("두 번째 질문", Some(first.session))
            .await
            .unwrap();

        assert_eq!(second.session.session_id, session_id);
        let roles: Vec<MessageRole> = second.session.transcript.messages().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant
            ]
        );
    }

    #[tokio::test]
    async fn test_advance_on_done_is_noop() {
        let orchestrator = llm_orchestrator(Arc::new(ScriptedModel::default()));
        let mut run = RunState::new("q");
        assert_eq!(orchestrator.advance(Phase::Done, &mut run).await.unwrap(), Phase::Done);
        assert!(run.final_answer().is_none());
    }
}
