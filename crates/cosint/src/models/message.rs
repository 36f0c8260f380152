use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A single entry in a chat transcript
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default = "now")]
    pub created: i64,
}

fn now() -> i64 {
    Utc::now().timestamp()
}

impl ChatMessage {
    /// Create a new human message with the current timestamp
    pub fn human<S: Into<String>>(content: S) -> Self {
        ChatMessage {
            role: Role::Human,
            content: content.into(),
            created: now(),
        }
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
            created: now(),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}
