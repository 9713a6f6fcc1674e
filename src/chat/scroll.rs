//! Scroll-position tracking for the message list.
//!
//! New content should pull the view to the bottom, but never yank the
//! viewport out from under a user who scrolled up to read history. The
//! tracker classifies every observed scroll position as at-bottom or
//! scrolled-up; append events translate to a scroll action only in the
//! former state.

/// Distance from the bottom (in the view's own units, e.g. pixels or rows)
/// within which the user still counts as "at bottom".
pub const NEARNESS_THRESHOLD: f32 = 80.0;

/// What the view should do after a content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollAction {
    /// Leave the viewport alone.
    #[default]
    None,
    /// Scroll to the latest message.
    ScrollToBottom,
}

/// Tracks whether the user is pinned to the bottom of the message list.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    at_bottom: bool,
}

impl ScrollTracker {
    /// A fresh view starts at the bottom.
    pub fn new() -> Self {
        Self { at_bottom: true }
    }

    /// Records the current distance from the bottom of the list.
    pub fn observe(&mut self, distance_from_bottom: f32) {
        self.at_bottom = distance_from_bottom <= NEARNESS_THRESHOLD;
    }

    /// Returns true while auto-scroll is enabled.
    pub fn is_at_bottom(&self) -> bool {
        self.at_bottom
    }

    /// Whether the "jump to latest" affordance should be visible.
    pub fn jump_affordance_visible(&self) -> bool {
        !self.at_bottom
    }

    /// Action to take when content is appended or grows.
    pub fn content_appended(&self) -> ScrollAction {
        if self.at_bottom {
            ScrollAction::ScrollToBottom
        } else {
            ScrollAction::None
        }
    }

    /// Explicit "jump to latest": scrolls unconditionally and re-enables
    /// auto-scroll.
    pub fn jump_to_latest(&mut self) -> ScrollAction {
        self.at_bottom = true;
        ScrollAction::ScrollToBottom
    }
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new()
    }
}
