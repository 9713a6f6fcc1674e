use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Message;

/// A server-tracked conversation thread, optionally scoped to documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Server-assigned session id.
    pub id: i64,

    /// Conversation title; the backend may fill this in after the first
    /// exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Documents the conversation is scoped to; empty means no scoping.
    #[serde(default)]
    pub document_ids: Vec<i64>,

    /// Number of messages in the session.
    #[serde(default)]
    pub message_count: u32,

    /// Whether the user pinned this session.
    #[serde(default)]
    pub is_pinned: bool,

    /// When the session was created.
    #[serde(with = "crate::utils::time")]
    pub created_at: OffsetDateTime,

    /// When the session was last mutated.
    #[serde(with = "crate::utils::time")]
    pub updated_at: OffsetDateTime,

    /// When the last message was sent, if any.
    #[serde(
        default,
        with = "crate::utils::time::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_message_at: Option<OffsetDateTime>,
}

impl Session {
    /// Returns the title, or a placeholder for untitled sessions.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    /// Returns true if the session is scoped to specific documents.
    pub fn is_scoped(&self) -> bool {
        !self.document_ids.is_empty()
    }
}

/// Request body for creating a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCreateParams {
    /// Initial title; usually omitted and filled in by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Documents to scope the session to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<i64>>,
}

impl SessionCreateParams {
    /// Creates an empty (unscoped, untitled) request body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Scopes the session to the given documents.
    pub fn with_document_ids(mut self, document_ids: Vec<i64>) -> Self {
        self.document_ids = Some(document_ids);
        self
    }
}

/// PATCH body for updating a session; only present fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUpdateParams {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// New pinned state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,

    /// New document scoping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<i64>>,
}

impl SessionUpdateParams {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the pinned state.
    pub fn with_pinned(mut self, is_pinned: bool) -> Self {
        self.is_pinned = Some(is_pinned);
        self
    }

    /// Replaces the document scoping.
    pub fn with_document_ids(mut self, document_ids: Vec<i64>) -> Self {
        self.document_ids = Some(document_ids);
        self
    }

    /// Returns true if the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.is_pinned.is_none() && self.document_ids.is_none()
    }
}

/// One page of the session listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionPage {
    /// Sessions on this page.
    pub items: Vec<Session>,

    /// Total sessions across all pages.
    pub total: u64,

    /// 1-based page number.
    pub page: u32,

    /// Page size.
    pub size: u32,
}

/// A session together with its full message history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionWithMessages {
    /// The session record.
    #[serde(flatten)]
    pub session: Session,

    /// Full message history, oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> Session {
        Session {
            id: 3,
            title: Some("Refund questions".to_string()),
            document_ids: vec![7],
            message_count: 4,
            is_pinned: false,
            created_at: datetime!(2024-05-01 12:00:00 UTC),
            updated_at: datetime!(2024-05-01 12:30:00 UTC),
            last_message_at: Some(datetime!(2024-05-01 12:30:00 UTC)),
        }
    }

    #[test]
    fn serialization() {
        let json = serde_json::to_string(&sample()).unwrap();
        let expected = r#"{"id":3,"title":"Refund questions","document_ids":[7],"message_count":4,"is_pinned":false,"created_at":"2024-05-01T12:00:00Z","updated_at":"2024-05-01T12:30:00Z","last_message_at":"2024-05-01T12:30:00Z"}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn deserialization_defaults() {
        let json = r#"{"id":9,"created_at":"2024-05-01T12:00:00Z","updated_at":"2024-05-01T12:00:00Z"}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.display_title(), "(untitled)");
        assert!(session.document_ids.is_empty());
        assert!(!session.is_scoped());
        assert!(session.last_message_at.is_none());
        assert!(!session.is_pinned);
    }

    #[test]
    fn create_params_bodies() {
        assert_eq!(
            serde_json::to_string(&SessionCreateParams::new()).unwrap(),
            "{}"
        );
        let params = SessionCreateParams::new().with_document_ids(vec![1, 2]);
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"document_ids":[1,2]}"#
        );
    }

    #[test]
    fn update_params_partial() {
        let params = SessionUpdateParams::new().with_pinned(true);
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"is_pinned":true}"#
        );
        assert!(!params.is_empty());
        assert!(SessionUpdateParams::new().is_empty());
    }

    #[test]
    fn session_with_messages_flattened() {
        let json = r#"{
            "id": 3,
            "created_at": "2024-05-01T12:00:00Z",
            "updated_at": "2024-05-01T12:00:00Z",
            "messages": [
                {"id":1,"session_id":3,"role":"user","content":"hi","created_at":"2024-05-01T12:00:00Z"}
            ]
        }"#;
        let loaded: SessionWithMessages = serde_json::from_str(json).unwrap();
        assert_eq!(loaded.session.id, 3);
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "hi");
    }

    #[test]
    fn page_round_trip() {
        let page = SessionPage {
            items: vec![sample()],
            total: 1,
            page: 1,
            size: 20,
        };
        let json = serde_json::to_string(&page).unwrap();
        let back: SessionPage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, page);
    }
}
