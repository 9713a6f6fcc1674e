//! Chat message-lifecycle controller.
//!
//! The controller owns the ordered list of visible messages for one
//! conversation and sequences each turn:
//!
//! 1. On submit it appends the user's message and a loading placeholder
//!    before any network call (optimistic display).
//! 2. It lazily creates the backend session on the first send, adopting the
//!    server-assigned id for the rest of the conversation.
//! 3. On success it swaps the placeholder for the assistant's answer and
//!    starts the reveal; on failure it removes only the placeholder and
//!    returns the error for the caller to surface.
//!
//! Invariants: at most one placeholder exists at any instant, and every
//! entry's `displayed_content` is a prefix of its `content` that converges
//! to equality once the entry stops streaming.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::chat::reveal::{REVEAL_TICK, Reveal, RevealTick};
use crate::chat::scroll::{ScrollAction, ScrollTracker};
use crate::client::Citeline;
use crate::error::Result;
use crate::observability::{
    CHAT_SEND_FAILURES, CHAT_SUBMITS, CHAT_SUBMITS_DROPPED, FEEDBACK_FAILURES, REVEAL_TICKS,
};
use crate::render::Renderer;
use crate::types::{
    FeedbackVerdict, Message, MessageRole, MessageSendParams, MessageSendResponse, Session,
    SessionCreateParams, SessionWithMessages,
};

/// The chat operations the controller needs from the backend.
///
/// [`Citeline`] is the production implementation; tests script their own.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Create a session, optionally scoped to documents.
    async fn create_session(&self, params: SessionCreateParams) -> Result<Session>;

    /// Send a message and receive the assistant's answer.
    async fn send_message(
        &self,
        session_id: i64,
        params: MessageSendParams,
    ) -> Result<MessageSendResponse>;

    /// Fetch a session with its full history.
    async fn get_session(&self, id: i64) -> Result<SessionWithMessages>;

    /// Record a feedback verdict on a message.
    async fn submit_feedback(&self, message_id: i64, verdict: FeedbackVerdict) -> Result<Message>;
}

#[async_trait]
impl ChatBackend for Citeline {
    async fn create_session(&self, params: SessionCreateParams) -> Result<Session> {
        Citeline::create_session(self, params).await
    }

    async fn send_message(
        &self,
        session_id: i64,
        params: MessageSendParams,
    ) -> Result<MessageSendResponse> {
        Citeline::send_message(self, session_id, params).await
    }

    async fn get_session(&self, id: i64) -> Result<SessionWithMessages> {
        Citeline::get_session(self, id).await
    }

    async fn submit_feedback(&self, message_id: i64, verdict: FeedbackVerdict) -> Result<Message> {
        Citeline::submit_feedback(self, message_id, verdict).await
    }
}

/// A message as displayed: the server record plus ephemeral presentation
/// state that is never persisted.
#[derive(Debug, Clone)]
pub struct ChatEntry {
    /// The underlying message.
    pub message: Message,
    /// The prefix of `message.content` currently revealed.
    pub displayed_content: String,
    /// True only for the transient placeholder awaiting the server.
    pub is_loading: bool,
    /// True while the reveal animation is running for this entry.
    pub is_streaming: bool,
}

impl ChatEntry {
    /// An entry displayed in full, with no animation.
    fn settled(message: Message) -> Self {
        let displayed_content = message.content.clone();
        Self {
            message,
            displayed_content,
            is_loading: false,
            is_streaming: false,
        }
    }

    /// The "assistant is thinking" placeholder.
    fn placeholder(id: i64, session_id: i64) -> Self {
        Self {
            message: Message::new(id, session_id, MessageRole::Assistant, ""),
            displayed_content: String::new(),
            is_loading: true,
            is_streaming: false,
        }
    }

    /// A freshly arrived answer about to start revealing.
    fn revealing(message: Message) -> Self {
        Self {
            message,
            displayed_content: String::new(),
            is_loading: false,
            is_streaming: true,
        }
    }
}

/// Outcome of a `submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The turn completed and the answer is revealing.
    Sent,
    /// The input was blank or another turn was in flight; nothing happened.
    Ignored,
}

/// Snapshot of the controller for status display.
#[derive(Debug, Clone)]
pub struct ChatStats {
    /// The backend session id, once one exists.
    pub session_id: Option<i64>,
    /// The session title, if the backend has assigned one.
    pub title: Option<String>,
    /// Whether the session is pinned.
    pub is_pinned: bool,
    /// Number of visible entries.
    pub entry_count: usize,
    /// Documents the conversation is scoped to.
    pub scoped_documents: Vec<i64>,
    /// Number of pending follow-up suggestions.
    pub suggestion_count: usize,
}

/// Controller for one conversation.
pub struct ChatController<B: ChatBackend> {
    backend: B,
    session: Option<Session>,
    scoped_documents: Vec<i64>,
    entries: Vec<ChatEntry>,
    suggestions: Vec<String>,
    suggestion_cursor: usize,
    reveal: Reveal,
    reveal_target: Option<i64>,
    scroll: ScrollTracker,
    pending_scroll: ScrollAction,
    in_flight: Option<u64>,
    next_turn: u64,
    next_local_id: i64,
}

impl<B: ChatBackend> ChatController<B> {
    /// Creates a controller for a new conversation.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session: None,
            scoped_documents: Vec::new(),
            entries: Vec::new(),
            suggestions: Vec::new(),
            suggestion_cursor: 0,
            reveal: Reveal::new(),
            reveal_target: None,
            scroll: ScrollTracker::new(),
            pending_scroll: ScrollAction::None,
            in_flight: None,
            next_turn: 1,
            next_local_id: -1,
        }
    }

    /// The visible message list, oldest first.
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// The backend session, once one exists.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Replaces the cached session record (e.g. after a title/pin update
    /// performed directly against the client).
    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Documents future sends will be scoped to.
    pub fn scoped_documents(&self) -> &[i64] {
        &self.scoped_documents
    }

    /// Scopes future sends (and lazy session creation) to these documents.
    pub fn set_scoped_documents(&mut self, document_ids: Vec<i64>) {
        self.scoped_documents = document_ids;
    }

    /// True while a send is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Sends a user message through one full turn.
    ///
    /// Blank input or an in-flight turn is dropped, not queued. The user
    /// entry and a placeholder appear before any network call; the user
    /// entry is never rolled back, even on failure.
    pub async fn submit(&mut self, text: &str) -> Result<SubmitOutcome> {
        let text = text.trim();
        if text.is_empty() || self.in_flight.is_some() {
            CHAT_SUBMITS_DROPPED.click();
            return Ok(SubmitOutcome::Ignored);
        }
        CHAT_SUBMITS.click();
        let turn = self.next_turn;
        self.next_turn += 1;
        self.in_flight = Some(turn);

        let session_hint = self.session.as_ref().map(|s| s.id).unwrap_or(0);
        let user_id = self.take_local_id();
        self.entries.push(ChatEntry::settled(Message::new(
            user_id,
            session_hint,
            MessageRole::User,
            text,
        )));
        let placeholder_id = self.take_local_id();
        self.entries
            .push(ChatEntry::placeholder(placeholder_id, session_hint));
        self.note_content_change();

        let result = self.run_turn(turn, text).await;

        // Completions for a superseded turn must not touch the list.
        if self.in_flight != Some(turn) {
            return Ok(SubmitOutcome::Ignored);
        }
        self.in_flight = None;
        self.remove_placeholder();

        match result {
            Ok(response) => {
                self.session = Some(response.session);
                self.suggestions = response.suggested_questions;
                self.suggestion_cursor = 0;
                let message = response.message;
                self.reveal_target = Some(message.id);
                self.reveal.start(message.content.clone());
                self.entries.push(ChatEntry::revealing(message));
                self.note_content_change();
                Ok(SubmitOutcome::Sent)
            }
            Err(err) => {
                CHAT_SEND_FAILURES.click();
                self.note_content_change();
                Err(err)
            }
        }
    }

    async fn run_turn(&mut self, turn: u64, text: &str) -> Result<MessageSendResponse> {
        let session_id = match &self.session {
            Some(session) => session.id,
            None => {
                let mut params = SessionCreateParams::new();
                if !self.scoped_documents.is_empty() {
                    params = params.with_document_ids(self.scoped_documents.clone());
                }
                let session = self.backend.create_session(params).await?;
                let id = session.id;
                if self.in_flight == Some(turn) {
                    self.session = Some(session);
                }
                id
            }
        };

        let mut params = MessageSendParams::new(text);
        if !self.scoped_documents.is_empty() {
            params = params.with_document_ids(self.scoped_documents.clone());
        }
        self.backend.send_message(session_id, params).await
    }

    /// Opens an existing session, replacing the entire visible list with its
    /// history. Loaded messages display in full immediately; history never
    /// replays the reveal animation.
    pub async fn load_existing(&mut self, session_id: i64) -> Result<()> {
        match self.backend.get_session(session_id).await {
            Ok(loaded) => {
                self.session = Some(loaded.session);
                self.entries = loaded.messages.into_iter().map(ChatEntry::settled).collect();
                self.reveal.reset();
                self.reveal_target = None;
                self.suggestions.clear();
                self.suggestion_cursor = 0;
                self.in_flight = None;
                self.pending_scroll = self.scroll.jump_to_latest();
                Ok(())
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    /// Returns to a fresh, sessionless conversation.
    pub fn reset(&mut self) {
        self.session = None;
        self.entries.clear();
        self.reveal.reset();
        self.reveal_target = None;
        self.suggestions.clear();
        self.suggestion_cursor = 0;
        self.in_flight = None;
        self.pending_scroll = self.scroll.jump_to_latest();
    }

    /// Records a feedback verdict on a message.
    ///
    /// A low-stakes secondary action: failures are counted and swallowed,
    /// never surfaced. The local update targets the message by id, so late
    /// completions land on the right entry no matter what was appended in
    /// the meantime.
    pub async fn feedback(&mut self, message_id: i64, verdict: FeedbackVerdict) {
        match self.backend.submit_feedback(message_id, verdict).await {
            Ok(_) => {
                if let Some(entry) = self
                    .entries
                    .iter_mut()
                    .find(|entry| entry.message.id == message_id)
                {
                    entry.message.feedback = Some(verdict);
                }
            }
            Err(_) => {
                FEEDBACK_FAILURES.click();
            }
        }
    }

    /// Advances the reveal by one granule, applying the new prefix to the
    /// revealing entry. Returns `None` once nothing is revealing.
    pub fn tick_reveal(&mut self) -> Option<RevealTick> {
        let target = self.reveal_target?;
        let tick = self.reveal.tick()?;
        REVEAL_TICKS.click();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.message.id == target)
        {
            entry.displayed_content = tick.displayed.clone();
            if tick.settled {
                entry.is_streaming = false;
            }
        }
        if tick.settled {
            self.reveal_target = None;
        }
        self.note_content_change();
        Some(tick)
    }

    /// Completes the reveal immediately (e.g. on interrupt).
    pub fn skip_reveal(&mut self) -> Option<RevealTick> {
        let target = self.reveal_target.take()?;
        let tick = self.reveal.skip_to_end()?;
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.message.id == target)
        {
            entry.displayed_content = tick.displayed.clone();
            entry.is_streaming = false;
        }
        self.note_content_change();
        Some(tick)
    }

    /// Drives the reveal to completion on a real timer, printing each delta
    /// through the renderer. `interrupted` skips the rest of the animation
    /// (the full text still lands; only the pacing is abandoned).
    pub async fn play_reveal(
        &mut self,
        renderer: &mut dyn Renderer,
        interrupted: Arc<AtomicBool>,
    ) {
        if self.reveal_target.is_none() {
            return;
        }
        let mut interval = tokio::time::interval(REVEAL_TICK);
        loop {
            interval.tick().await;
            if interrupted.load(Ordering::Relaxed) {
                if let Some(tick) = self.skip_reveal() {
                    renderer.print_reveal_chunk(&tick.delta);
                }
                break;
            }
            match self.tick_reveal() {
                Some(tick) => {
                    renderer.print_reveal_chunk(&tick.delta);
                    if tick.settled {
                        break;
                    }
                }
                None => break,
            }
        }
    }

    /// The current follow-up suggestions.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Cycles through the current suggestions, round-robin.
    pub fn next_suggestion(&mut self) -> Option<&str> {
        if self.suggestions.is_empty() {
            return None;
        }
        let index = self.suggestion_cursor % self.suggestions.len();
        self.suggestion_cursor = self.suggestion_cursor.wrapping_add(1);
        Some(&self.suggestions[index])
    }

    /// Records the viewport's distance from the bottom of the list.
    pub fn observe_scroll(&mut self, distance_from_bottom: f32) {
        self.scroll.observe(distance_from_bottom);
    }

    /// Whether the "jump to latest" affordance should be visible.
    pub fn jump_affordance_visible(&self) -> bool {
        self.scroll.jump_affordance_visible()
    }

    /// Explicit "jump to latest".
    pub fn jump_to_latest(&mut self) {
        self.pending_scroll = self.scroll.jump_to_latest();
    }

    /// Consumes the pending scroll action produced by the last mutation.
    pub fn take_scroll_action(&mut self) -> ScrollAction {
        std::mem::take(&mut self.pending_scroll)
    }

    /// Status snapshot for display.
    pub fn stats(&self) -> ChatStats {
        ChatStats {
            session_id: self.session.as_ref().map(|s| s.id),
            title: self.session.as_ref().and_then(|s| s.title.clone()),
            is_pinned: self.session.as_ref().map(|s| s.is_pinned).unwrap_or(false),
            entry_count: self.entries.len(),
            scoped_documents: self.scoped_documents.clone(),
            suggestion_count: self.suggestions.len(),
        }
    }

    fn remove_placeholder(&mut self) {
        self.entries.retain(|entry| !entry.is_loading);
    }

    fn note_content_change(&mut self) {
        if self.scroll.content_appended() == ScrollAction::ScrollToBottom {
            self.pending_scroll = ScrollAction::ScrollToBottom;
        }
    }

    /// Client-local ids for optimistic entries; negative so they can never
    /// collide with server-assigned ids.
    fn take_local_id(&mut self) -> i64 {
        let id = self.next_local_id;
        self.next_local_id -= 1;
        id
    }
}
