use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{FeedbackVerdict, Session, SourceRef};

/// The author of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Authored by the end user.
    User,
    /// Authored by the assistant.
    Assistant,
    /// Injected by the backend (notices, context markers).
    System,
}

/// One turn in a session, as stored by the backend.
///
/// This is the server shape. The ephemeral display fields (revealed prefix,
/// placeholder/streaming flags) live on the chat controller's entries, not
/// here, and are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Server-assigned message id.
    pub id: i64,

    /// The session this message belongs to.
    pub session_id: i64,

    /// Who authored the message.
    pub role: MessageRole,

    /// The full message text.
    pub content: String,

    /// Citations grounding the answer, ordered by relevance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,

    /// The user's recorded verdict, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackVerdict>,

    /// When the message was created.
    #[serde(with = "crate::utils::time")]
    pub created_at: OffsetDateTime,
}

impl Message {
    /// Creates a new message with the current timestamp and no sources or
    /// feedback.
    pub fn new(id: i64, session_id: i64, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id,
            session_id,
            role,
            content: content.into(),
            sources: Vec::new(),
            feedback: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Attaches citation sources.
    pub fn with_sources(mut self, sources: Vec<SourceRef>) -> Self {
        self.sources = sources;
        self
    }

    /// Returns true if this message carries citations.
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// Request body for sending a message to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageSendParams {
    /// The message text.
    pub content: String,

    /// Restrict retrieval to these documents; omitted means the session's
    /// own scoping (or none) applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<i64>>,
}

impl MessageSendParams {
    /// Creates a request body with no per-message scoping.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            document_ids: None,
        }
    }

    /// Restricts retrieval to the given documents.
    pub fn with_document_ids(mut self, document_ids: Vec<i64>) -> Self {
        self.document_ids = Some(document_ids);
        self
    }
}

/// Response to sending a message: the assistant's answer, the updated
/// session (title and counters may have changed), and suggested follow-up
/// questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageSendResponse {
    /// The assistant's reply.
    pub message: Message,

    /// The session after the exchange.
    pub session: Session,

    /// Follow-up questions the user might ask next.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_questions: Vec<String>,
}
