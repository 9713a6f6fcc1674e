use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's verdict on an assistant message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackVerdict {
    /// The answer was helpful.
    ThumbsUp,
    /// The answer was not helpful.
    ThumbsDown,
    /// The answer was reported as problematic.
    Reported,
}

impl fmt::Display for FeedbackVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackVerdict::ThumbsUp => write!(f, "thumbs_up"),
            FeedbackVerdict::ThumbsDown => write!(f, "thumbs_down"),
            FeedbackVerdict::Reported => write!(f, "reported"),
        }
    }
}

/// Request body for recording feedback on a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackParams {
    /// The verdict to record.
    pub feedback: FeedbackVerdict,
}

impl FeedbackParams {
    /// Creates a new feedback request body.
    pub fn new(feedback: FeedbackVerdict) -> Self {
        Self { feedback }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_wire_format() {
        assert_eq!(
            serde_json::to_string(&FeedbackVerdict::ThumbsUp).unwrap(),
            r#""thumbs_up""#
        );
        assert_eq!(
            serde_json::to_string(&FeedbackVerdict::ThumbsDown).unwrap(),
            r#""thumbs_down""#
        );
        assert_eq!(
            serde_json::to_string(&FeedbackVerdict::Reported).unwrap(),
            r#""reported""#
        );
    }

    #[test]
    fn params_serialization() {
        let params = FeedbackParams::new(FeedbackVerdict::ThumbsUp);
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"feedback":"thumbs_up"}"#
        );
    }

    #[test]
    fn verdict_round_trip() {
        let verdict: FeedbackVerdict = serde_json::from_str(r#""reported""#).unwrap();
        assert_eq!(verdict, FeedbackVerdict::Reported);
    }
}
