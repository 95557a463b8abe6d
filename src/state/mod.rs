//! Run state and checkpoint persistence
//!
//! A [`RunState`] is the whole unit of work for one user turn. The
//! orchestrator snapshots it into a [`Checkpoint`] after every phase
//! transition so a turn can be paused and resumed.
//! Currently uses in-memory storage; durability is not provided.

use crate::error::OrchestrationError;
use crate::models::{HistoryEntry, StepLine};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    request: String,
    plan: VecDeque<StepLine>,
    history: Vec<HistoryEntry>,
    final_answer: Option<String>,
}

impl RunState {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            plan: VecDeque::new(),
            history: Vec::new(),
            final_answer: None,
        }
    }

    /// Install a fresh plan with empty history.
    pub fn begin(&mut self, plan: Vec<StepLine>) {
        self.plan = plan.into();
        self.history.clear();
        self.final_answer = None;
    }

    pub fn pop_step(&mut self) -> Option<StepLine> {
        self.plan.pop_front()
    }

    /// Append-only; entries are never touched again.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    pub fn set_final_answer(&mut self, answer: String) -> Result<()> {
        if !self.plan.is_empty() {
            return Err(OrchestrationError::InvalidState(format!(
                "cannot finish with {} planned step(s) left",
                self.plan.len()
            )));
        }
        if self.final_answer.is_some() {
            return Err(OrchestrationError::InvalidState(
                "final answer already set".to_string(),
            ));
        }
        self.final_answer = Some(answer);
        Ok(())
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn plan(&self) -> impl ExactSizeIterator<Item = &StepLine> {
        self.plan.iter()
    }

    pub fn remaining_steps(&self) -> usize {
        self.plan.len()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    pub fn is_ready_for_synthesis(&self) -> bool {
        self.plan.is_empty()
    }
}

/// Orchestration phases. `Done` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Planning,
    Executing,
    Synthesizing,
    Done,
}

/// Serializable pause point of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    pub phase: Phase,
    pub run: RunState,
    pub fingerprint: String,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(session_id: impl Into<String>, phase: Phase, run: RunState) -> Result<Self> {
        let fingerprint = compute_fingerprint(phase, &run)?;
        Ok(Self {
            session_id: session_id.into(),
            phase,
            run,
            fingerprint,
            updated_at: Utc::now(),
        })
    }

    /// Check that phase and run state still match the stored fingerprint.
    pub fn verify(&self) -> Result<()> {
        let current = compute_fingerprint(self.phase, &self.run)?;
        if current == self.fingerprint {
            Ok(())
        } else {
            Err(OrchestrationError::CheckpointError(format!(
                "fingerprint mismatch for session {}",
                self.session_id
            )))
        }
    }
}

/// SHA-256 over the JSON form of `(phase, run)`, hex encoded.
pub fn compute_fingerprint(phase: Phase, run: &RunState) -> Result<String> {
    let bytes = serde_json::to_vec(&(phase, run))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Trait for checkpoint persistence
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()>;
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>>;
    async fn remove(&self, session_id: &str) -> Result<()>;
}

/// In-memory checkpoint store
pub struct InMemoryCheckpointStore {
    checkpoints: Arc<RwLock<HashMap<String, Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            checkpoints: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.insert(checkpoint.session_id.clone(), checkpoint);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.get(session_id).cloned())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        let mut checkpoints = self.checkpoints.write().await;
        checkpoints.remove(session_id);
        Ok(())
    }
}
