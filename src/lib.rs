//! Small-Business Consulting Agent
//!
//! A Korean-language consulting chatbot for small-business owners that:
//! - Plans a multi-step tool sequence for each question
//! - Executes one step at a time against a closed tool set
//! - Records every step outcome, failures included, as evidence
//! - Synthesizes a cited answer from that evidence only
//! - Checkpoints each turn so it can be paused and resumed
//!
//! TURN LOOP:
//! INPUT → PLAN → EXECUTE ⟲ → SYNTHESIZE → DONE

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod models;
pub mod planner;
pub mod state;
pub mod synthesis;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::{Orchestrator, OrchestratorConfig, TurnEvent, TurnOutcome};
pub use config::AppConfig;
pub use memory::SessionState;
pub use models::*;
pub use state::{Phase, RunState};
