//! Wire events for the real-time channel.
//!
//! Frames are JSON text in both directions with a `{type, payload}`
//! envelope for server events and a flat `{type, ...}` shape for the two
//! client messages.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MaintenanceSnapshot, Question, Reply};

/// Events fanned out to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Greeting sent to a single connection right after connect.
    Connected { message: String },
    /// Full maintenance snapshot, sent on connect and on every transition.
    Maintenance(MaintenanceSnapshot),
    NewQuestion(Question),
    NewReply { question_id: Uuid, reply: Reply },
    DeleteQuestion { id: Uuid },
    DeleteReply { question_id: Uuid, reply_id: Uuid },
    ClearAll,
    UserJoined { id: Uuid, username: String },
    UserLeft { id: Uuid, username: String },
    Typing { question_id: Option<Uuid>, username: String },
}

impl ServerEvent {
    /// Wire name of the event, for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::Maintenance(_) => "maintenance",
            ServerEvent::NewQuestion(_) => "new-question",
            ServerEvent::NewReply { .. } => "new-reply",
            ServerEvent::DeleteQuestion { .. } => "delete-question",
            ServerEvent::DeleteReply { .. } => "delete-reply",
            ServerEvent::ClearAll => "clear-all",
            ServerEvent::UserJoined { .. } => "user-joined",
            ServerEvent::UserLeft { .. } => "user-left",
            ServerEvent::Typing { .. } => "typing",
        }
    }
}

/// Messages a client may send over the socket. Unknown frames are ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    SetUsername {
        username: String,
    },
    Typing {
        #[serde(default)]
        question_id: Option<Uuid>,
    },
}
