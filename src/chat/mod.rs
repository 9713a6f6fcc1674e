//! Chat surface for document-grounded conversations.
//!
//! This module implements the client-side conversation lifecycle on top of
//! the citeline client library:
//!
//! - Optimistic message display with a single loading placeholder per turn
//! - A simulated token-reveal animation for arrived answers
//! - Scroll tracking that never fights a user reading history
//! - Suggested follow-up questions and per-message feedback
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`controller`]: the message lifecycle (submit, load, feedback)
//! - [`reveal`]: the clock-free reveal state machine
//! - [`scroll`]: scroll-position tracking
//! - [`commands`]: slash command parsing for the REPL

mod commands;
mod config;
mod controller;
mod reveal;
mod scroll;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{Command, Input, help_text, parse_line};
pub use config::{ChatArgs, ChatArgsError, ChatConfig};
pub use controller::{ChatBackend, ChatController, ChatEntry, ChatStats, SubmitOutcome};
pub use reveal::{REVEAL_CHARS_PER_TICK, REVEAL_TICK, Reveal, RevealState, RevealTick};
pub use scroll::{NEARNESS_THRESHOLD, ScrollAction, ScrollTracker};
