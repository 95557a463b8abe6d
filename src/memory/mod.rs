//! Conversation memory
//!
//! Per-session transcript carried between turns. Every message has an
//! explicit role; nothing is inferred from message names.

pub mod store;

pub use store::{ConversationHistory, ConversationMessage, MessageRole, SessionState};
