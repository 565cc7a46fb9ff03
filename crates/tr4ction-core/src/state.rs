//! UI-agnostic chat state types
//!
//! Shared between the chat session, the wire format and whatever renders the
//! conversation. Nothing here depends on a UI framework.

use serde::{Deserialize, Serialize};

/// A single message in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Who sent a turn. Serialized lowercase to match the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Transient request state. Drives the typing indicator and the error banner,
/// never stored in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Sending,
    Errored(String),
}

impl SessionState {
    pub fn is_sending(&self) -> bool {
        matches!(self, SessionState::Sending)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SessionState::Errored(message) => Some(message),
            _ => None,
        }
    }
}
