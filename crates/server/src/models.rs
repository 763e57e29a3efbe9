//! Core data types for the Q&A board.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of question and reply text, in characters.
pub const MAX_TEXT_LEN: usize = 2000;
/// Maximum length of author labels and member display names, in characters.
pub const MAX_NAME_LEN: usize = 50;
/// Author label applied when a post carries none.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";
/// Reserved author label for machine-generated replies.
pub const BOT_AUTHOR: &str = "@AnswerBot";
/// Display name shown for a member that has not picked one yet.
pub const GUEST_NAME: &str = "Guest";

/// Truncate a string to `max` characters on a char boundary.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// A posted question with its replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<Reply>,
}

/// A reply nested under a question. Dies with its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Uuid,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral identity for a live connection. Never persisted.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: Uuid,
    pub name: Option<String>,
}

impl Member {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(GUEST_NAME)
    }
}

/// Current maintenance state as sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSnapshot {
    pub status: bool,
    pub message: String,
    pub logo_url: Option<String>,
    pub until: Option<DateTime<Utc>>,
}

/// Input for creating a question or a reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    pub text: String,
    pub author: Option<String>,
    #[serde(default)]
    pub use_ai: bool,
}
