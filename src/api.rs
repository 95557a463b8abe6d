//! REST API server for the consulting chatbot
//!
//! Exposes the orchestrator via HTTP endpoints.
//! Session transcripts live in process memory next to the checkpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::{Orchestrator, TurnOutcome};
use crate::error::OrchestrationError;
use crate::memory::{ConversationMessage, SessionState};
use crate::models::{EvidenceOrigin, HistoryEntry};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvidenceView {
    pub step: String,
    pub tool: Option<String>,
    pub success: bool,
    pub content: String,
    pub elapsed_ms: u64,
}

impl From<&HistoryEntry> for EvidenceView {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            step: entry.step.to_string(),
            tool: match entry.origin {
                EvidenceOrigin::Tool(kind) => Some(kind.name().to_string()),
                EvidenceOrigin::Executor => None,
            },
            success: entry.result.is_success(),
            content: entry.result.evidence_text(),
            elapsed_ms: entry.elapsed_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TurnView {
    pub session_id: String,
    pub answer: String,
    pub evidence: Vec<EvidenceView>,
}

impl From<&TurnOutcome> for TurnView {
    fn from(outcome: &TurnOutcome) -> Self {
        Self {
            session_id: outcome.session.session_id.clone(),
            answer: outcome.final_answer.clone(),
            evidence: outcome.run.history().iter().map(EvidenceView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView<'a> {
    pub session_id: &'a str,
    pub phase: Option<crate::state::Phase>,
    pub messages: Vec<&'a ConversationMessage>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<RwLock<HashMap<String, SessionState>>>,
    turn_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            turn_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Held from reading a session until its result is stored, so turns on
    /// one session run one after another.
    async fn lock_session(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .turn_locks
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn load_session(&self, session_id: &str) -> SessionState {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| SessionState::with_id(session_id))
    }

    async fn store_session(&self, session: SessionState) {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session);
    }
}

type Reply = (StatusCode, Json<ApiResponse>);

fn error_reply(err: &OrchestrationError) -> Reply {
    let status = match err {
        OrchestrationError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        OrchestrationError::InvalidToolInput(_) => StatusCode::BAD_REQUEST,
        OrchestrationError::ModelInvocationError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(err.user_message())))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> Reply {
    let message = req.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("질문을 입력해주세요.".into())),
        );
    }

    // Unknown ids start a fresh session under the caller's id.
    let session_id = match req.session_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => SessionState::new().session_id,
    };

    let _turn = state.lock_session(&session_id).await;
    let prior = state.load_session(&session_id).await;

    info!(session_id = %session_id, "chat request received");

    match state.orchestrator.run_turn(message, Some(prior)).await {
        Ok(outcome) => {
            let view = TurnView::from(&outcome);
            state.store_session(outcome.session).await;
            (StatusCode::OK, Json(ApiResponse::success(view)))
        }
        Err(e) => {
            warn!(error = %e, "chat turn failed");
            error_reply(&e)
        }
    }
}

/// =============================
/// Session Endpoints
/// =============================

async fn resume_handler(State(state): State<ApiState>, Path(session_id): Path<String>) -> Reply {
    let _turn = state.lock_session(&session_id).await;
    let session = state.load_session(&session_id).await;

    match state.orchestrator.resume(session).await {
        Ok(outcome) => {
            let view = TurnView::from(&outcome);
            state.store_session(outcome.session).await;
            (StatusCode::OK, Json(ApiResponse::success(view)))
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "resume failed");
            error_reply(&e)
        }
    }
}

async fn session_handler(State(state): State<ApiState>, Path(session_id): Path<String>) -> Reply {
    let phase = match state.orchestrator.checkpoint(&session_id).await {
        Ok(checkpoint) => checkpoint.map(|c| c.phase),
        Err(e) => return error_reply(&e),
    };

    let sessions = state.sessions.read().await;
    match (sessions.get(&session_id), phase) {
        (None, None) => error_reply(&OrchestrationError::SessionNotFound(session_id)),
        (session, phase) => {
            let view = SessionView {
                session_id: &session_id,
                phase,
                messages: session
                    .map(|s| s.transcript.visible_messages().collect())
                    .unwrap_or_default(),
            };
            (StatusCode::OK, Json(ApiResponse::success(view)))
        }
    }
}

async fn delete_session_handler(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Reply {
    let _turn = state.lock_session(&session_id).await;
    let removed = state.sessions.write().await.remove(&session_id).is_some();
    if let Err(e) = state.orchestrator.discard(&session_id).await {
        return error_reply(&e);
    }

    info!(session_id = %session_id, removed, "session discarded");
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "session_id": session_id }))),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState::new(orchestrator);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route(
            "/api/sessions/:session_id",
            get(session_handler).delete(delete_session_handler),
        )
        .route("/api/sessions/:session_id/resume", post(resume_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
