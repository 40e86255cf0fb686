//! Message and Conversation types exchanged with the language model.
//!
//! A chat request arrives as [`ChatTurn`]s; the agent turns them into
//! [`Message`]s, adds the system prompt, and appends assistant tool calls and
//! tool results as the loop runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ChatRole, ChatTurn};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The student
    User,
    /// The counsellor model
    Assistant,
    /// System instructions (role, profile context, rules)
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,

    pub role: Role,

    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

impl From<&ChatTurn> for Message {
    fn from(turn: &ChatTurn) -> Self {
        match turn.role {
            ChatRole::User => Message::user(&turn.content),
            ChatRole::Assistant => Message::assistant(&turn.content),
        }
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string, exactly as the model produced them
    pub arguments: String,
}

/// The working context of one agent turn.
///
/// Lives only for the duration of a request; nothing here is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a conversation with the system prompt followed by prior turns.
    pub fn seeded(system_prompt: impl Into<String>, turns: &[ChatTurn]) -> Self {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(Message::system(system_prompt));
        messages.extend(turns.iter().map(Message::from));
        Self {
            messages,
            created_at: Utc::now(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_conversation_puts_system_first() {
        let turns = vec![
            ChatTurn::user("Hi"),
            ChatTurn::assistant("Hello! How can I help?"),
            ChatTurn::user("Find me universities in Canada"),
        ];
        let conv = Conversation::seeded("You are a counsellor", &turns);
        assert_eq!(conv.messages.len(), 4);
        assert_eq!(conv.messages[0].role, Role::System);
        assert_eq!(conv.messages[0].content, "You are a counsellor");
        assert_eq!(conv.messages[2].role, Role::Assistant);
        assert_eq!(conv.messages[3].content, "Find me universities in Canada");
    }

    #[test]
    fn tool_result_links_call_id() {
        let msg = Message::tool_result("call_7", "No universities found.");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_7"));
    }
}
