//! Reveal state machine for simulated streaming.
//!
//! Answers arrive from the backend in full; the chat surface reveals them a
//! few characters at a time to read like live generation. The machine is
//! `Idle -> Revealing(cursor) -> Settled` and is clock-free: callers pull
//! `tick` at whatever cadence they like, which makes tests deterministic.

use std::time::Duration;

/// Characters revealed per tick. Fixed, not user-configurable.
pub const REVEAL_CHARS_PER_TICK: usize = 3;

/// Interval between reveal ticks. Fixed, not user-configurable.
pub const REVEAL_TICK: Duration = Duration::from_millis(30);

/// Where the reveal currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    /// Nothing to reveal.
    Idle,
    /// Revealing; `cursor` counts revealed characters (not bytes).
    Revealing {
        /// Number of characters revealed so far.
        cursor: usize,
    },
    /// The full content is displayed.
    Settled,
}

/// One step of the reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealTick {
    /// Everything revealed so far (a prefix of the content).
    pub displayed: String,
    /// The characters newly revealed by this tick.
    pub delta: String,
    /// True when this tick completed the reveal.
    pub settled: bool,
}

/// The reveal machine. At most one runs per chat controller; starting a new
/// reveal implicitly cancels the previous one.
#[derive(Debug, Clone)]
pub struct Reveal {
    content: String,
    state: RevealState,
}

impl Reveal {
    /// Creates an idle machine.
    pub fn new() -> Self {
        Self {
            content: String::new(),
            state: RevealState::Idle,
        }
    }

    /// Begins revealing `content` from the start, cancelling any reveal
    /// still in progress.
    pub fn start(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.state = RevealState::Revealing { cursor: 0 };
    }

    /// Returns to idle, discarding any content.
    pub fn reset(&mut self) {
        self.content.clear();
        self.state = RevealState::Idle;
    }

    /// Returns the current state.
    pub fn state(&self) -> RevealState {
        self.state
    }

    /// Returns true while a reveal is in progress.
    pub fn is_revealing(&self) -> bool {
        matches!(self.state, RevealState::Revealing { .. })
    }

    /// The currently revealed prefix.
    pub fn displayed(&self) -> &str {
        match self.state {
            RevealState::Idle => "",
            RevealState::Revealing { cursor } => &self.content[..self.byte_index(cursor)],
            RevealState::Settled => &self.content,
        }
    }

    /// Number of ticks a full reveal of the current content takes. Empty
    /// content still takes the one tick that settles it.
    pub fn ticks_to_settle(&self) -> usize {
        self.content
            .chars()
            .count()
            .div_ceil(REVEAL_CHARS_PER_TICK)
            .max(1)
    }

    /// Advances the cursor by one granule. Returns `None` unless a reveal is
    /// in progress.
    pub fn tick(&mut self) -> Option<RevealTick> {
        let RevealState::Revealing { cursor } = self.state else {
            return None;
        };
        let total = self.content.chars().count();
        let next = cursor + REVEAL_CHARS_PER_TICK;
        let from = self.byte_index(cursor);
        if next >= total {
            self.state = RevealState::Settled;
            Some(RevealTick {
                displayed: self.content.clone(),
                delta: self.content[from..].to_string(),
                settled: true,
            })
        } else {
            self.state = RevealState::Revealing { cursor: next };
            let to = self.byte_index(next);
            Some(RevealTick {
                displayed: self.content[..to].to_string(),
                delta: self.content[from..to].to_string(),
                settled: false,
            })
        }
    }

    /// Jumps straight to the end (e.g. on interrupt). Returns the final tick
    /// carrying the not-yet-revealed remainder, or `None` when no reveal is
    /// in progress.
    pub fn skip_to_end(&mut self) -> Option<RevealTick> {
        let RevealState::Revealing { cursor } = self.state else {
            return None;
        };
        let from = self.byte_index(cursor);
        self.state = RevealState::Settled;
        Some(RevealTick {
            displayed: self.content.clone(),
            delta: self.content[from..].to_string(),
            settled: true,
        })
    }

    /// Byte offset of the `chars`-th character boundary.
    fn byte_index(&self, chars: usize) -> usize {
        self.content
            .char_indices()
            .nth(chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.content.len())
    }
}

impl Default for Reveal {
    fn default() -> Self {
        Self::new()
    }
}
