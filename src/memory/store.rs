//! Conversation history storage
//!
//! Stores conversation messages with timestamps and roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A single message in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content: content.into(),
        }
    }

    /// User and assistant messages are shown; system notes are not.
    pub fn is_visible(&self) -> bool {
        matches!(self.role, MessageRole::User | MessageRole::Assistant)
    }
}

/// Conversation history for one chat session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<ConversationMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter()
    }

    pub fn visible_messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter().filter(|m| m.is_visible())
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Opaque caller-side state threaded through `run_turn`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub transcript: ConversationHistory,
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            transcript: ConversationHistory::new(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_messages_filter_by_role() {
        let mut history = ConversationHistory::new();
        history.add_message(ConversationMessage::new(MessageRole::System, "중단된 답변을 이어서 생성했습니다."));
        history.add_message(ConversationMessage::new(MessageRole::User, "청년 정책자금 알려줘"));
        history.add_message(ConversationMessage::new(MessageRole::Assistant, "특별자금이 있습니다."));

        let visible: Vec<MessageRole> = history.visible_messages().map(|m| m.role).collect();
        assert_eq!(visible, vec![MessageRole::User, MessageRole::Assistant]);
        assert_eq!(history.message_count(), 3);
    }

    #[test]
    fn test_new_sessions_get_distinct_ids() {
        assert_ne!(SessionState::new().session_id, SessionState::new().session_id);
        assert_eq!(SessionState::with_id("abc").session_id, "abc");
    }
}
