//! Slash commands for the interactive chat binary.
//!
//! Lines beginning with `/` are commands; anything else is a message to
//! send. Parsing is separated from execution so it can be tested without a
//! terminal or a backend.

use crate::types::FeedbackVerdict;

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/sessions [page]`: list sessions.
    Sessions {
        /// 1-based page, defaulting to 1.
        page: u32,
    },
    /// `/open <id>`: open an existing session.
    Open {
        /// The session to open.
        session_id: i64,
    },
    /// `/new`: start a fresh conversation.
    New,
    /// `/title <text>`: rename the current session.
    Title {
        /// The new title.
        title: String,
    },
    /// `/pin on|off`: pin or unpin the current session.
    Pin {
        /// Desired pinned state.
        pinned: bool,
    },
    /// `/delete [permanent]`: delete the current session.
    Delete {
        /// True for a hard delete instead of an archive.
        permanent: bool,
    },
    /// `/docs list`: list available documents.
    DocsList,
    /// `/docs set <id> [id ...]`: scope the conversation to documents.
    DocsSet {
        /// The document ids to scope to.
        document_ids: Vec<i64>,
    },
    /// `/docs clear`: remove document scoping.
    DocsClear,
    /// `/suggest`: show the next suggested follow-up question.
    Suggest,
    /// `/up [n]`: thumbs-up the n-th most recent assistant answer.
    ThumbsUp {
        /// 1 is the most recent answer.
        nth: usize,
    },
    /// `/down [n]`: thumbs-down the n-th most recent assistant answer.
    ThumbsDown {
        /// 1 is the most recent answer.
        nth: usize,
    },
    /// `/report [n]`: report the n-th most recent assistant answer.
    Report {
        /// 1 is the most recent answer.
        nth: usize,
    },
    /// `/sources [n]`: show citations for the n-th most recent answer.
    Sources {
        /// 1 is the most recent answer.
        nth: usize,
    },
    /// `/stats`: show conversation status.
    Stats,
    /// `/help`: show command help.
    Help,
    /// `/quit`: exit the program.
    Quit,
}

impl Command {
    /// Maps a feedback command to its verdict, if it is one.
    pub fn verdict(&self) -> Option<(usize, FeedbackVerdict)> {
        match *self {
            Command::ThumbsUp { nth } => Some((nth, FeedbackVerdict::ThumbsUp)),
            Command::ThumbsDown { nth } => Some((nth, FeedbackVerdict::ThumbsDown)),
            Command::Report { nth } => Some((nth, FeedbackVerdict::Reported)),
            _ => None,
        }
    }
}

/// Result of classifying one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A message to send to the assistant.
    Message(String),
    /// A recognized slash command.
    Command(Command),
    /// A line starting with `/` that isn't a known command.
    Unrecognized(String),
    /// Whitespace only.
    Empty,
}

/// Classifies one line of user input.
pub fn parse_line(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if !trimmed.starts_with('/') {
        return Input::Message(trimmed.to_string());
    }
    match parse_command(trimmed) {
        Some(command) => Input::Command(command),
        None => Input::Unrecognized(trimmed.to_string()),
    }
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let rest: Vec<&str> = words.collect();
    match head {
        "/sessions" => {
            let page = match rest.first() {
                Some(word) => word.parse().ok()?,
                None => 1,
            };
            Some(Command::Sessions { page })
        }
        "/open" => {
            let session_id = rest.first()?.parse().ok()?;
            Some(Command::Open { session_id })
        }
        "/new" => rest.is_empty().then_some(Command::New),
        "/title" => {
            let title = line["/title".len()..].trim();
            if title.is_empty() {
                None
            } else {
                Some(Command::Title {
                    title: title.to_string(),
                })
            }
        }
        "/pin" => match rest.as_slice() {
            ["on"] => Some(Command::Pin { pinned: true }),
            ["off"] => Some(Command::Pin { pinned: false }),
            _ => None,
        },
        "/delete" => match rest.as_slice() {
            [] => Some(Command::Delete { permanent: false }),
            ["permanent"] => Some(Command::Delete { permanent: true }),
            _ => None,
        },
        "/docs" => match rest.as_slice() {
            ["list"] => Some(Command::DocsList),
            ["clear"] => Some(Command::DocsClear),
            ["set", ids @ ..] if !ids.is_empty() => {
                let document_ids: Option<Vec<i64>> =
                    ids.iter().map(|id| id.parse().ok()).collect();
                Some(Command::DocsSet {
                    document_ids: document_ids?,
                })
            }
            _ => None,
        },
        "/suggest" => rest.is_empty().then_some(Command::Suggest),
        "/up" => parse_nth(&rest).map(|nth| Command::ThumbsUp { nth }),
        "/down" => parse_nth(&rest).map(|nth| Command::ThumbsDown { nth }),
        "/report" => parse_nth(&rest).map(|nth| Command::Report { nth }),
        "/sources" => parse_nth(&rest).map(|nth| Command::Sources { nth }),
        "/stats" => rest.is_empty().then_some(Command::Stats),
        "/help" => rest.is_empty().then_some(Command::Help),
        "/quit" | "/exit" => rest.is_empty().then_some(Command::Quit),
        _ => None,
    }
}

fn parse_nth(rest: &[&str]) -> Option<usize> {
    match rest {
        [] => Some(1),
        [word] => match word.parse() {
            Ok(nth) if nth >= 1 => Some(nth),
            _ => None,
        },
        _ => None,
    }
}

/// The `/help` text.
pub fn help_text() -> &'static str {
    "commands:
  /sessions [page]      list sessions
  /open <id>            open a session
  /new                  start a fresh conversation
  /title <text>         rename the current session
  /pin on|off           pin or unpin the current session
  /delete [permanent]   delete the current session
  /docs list            list available documents
  /docs set <id> ...    scope the conversation to documents
  /docs clear           remove document scoping
  /suggest              show a suggested follow-up question
  /up [n]               thumbs-up the n-th most recent answer
  /down [n]             thumbs-down the n-th most recent answer
  /report [n]           report the n-th most recent answer
  /sources [n]          show citations for the n-th most recent answer
  /stats                show conversation status
  /help                 show this help
  /quit                 exit"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_line("what is the refund policy?"),
            Input::Message("what is the refund policy?".to_string())
        );
        assert_eq!(parse_line("   \t "), Input::Empty);
    }

    #[test]
    fn session_commands() {
        assert_eq!(
            parse_line("/sessions"),
            Input::Command(Command::Sessions { page: 1 })
        );
        assert_eq!(
            parse_line("/sessions 3"),
            Input::Command(Command::Sessions { page: 3 })
        );
        assert_eq!(
            parse_line("/open 42"),
            Input::Command(Command::Open { session_id: 42 })
        );
        assert_eq!(parse_line("/new"), Input::Command(Command::New));
        assert_eq!(
            parse_line("/title Q3 planning notes"),
            Input::Command(Command::Title {
                title: "Q3 planning notes".to_string()
            })
        );
        assert_eq!(
            parse_line("/pin on"),
            Input::Command(Command::Pin { pinned: true })
        );
        assert_eq!(
            parse_line("/delete permanent"),
            Input::Command(Command::Delete { permanent: true })
        );
        assert_eq!(
            parse_line("/delete"),
            Input::Command(Command::Delete { permanent: false })
        );
    }

    #[test]
    fn docs_commands() {
        assert_eq!(parse_line("/docs list"), Input::Command(Command::DocsList));
        assert_eq!(
            parse_line("/docs set 1 2 3"),
            Input::Command(Command::DocsSet {
                document_ids: vec![1, 2, 3]
            })
        );
        assert_eq!(
            parse_line("/docs clear"),
            Input::Command(Command::DocsClear)
        );
        assert_eq!(
            parse_line("/docs set"),
            Input::Unrecognized("/docs set".to_string())
        );
    }

    #[test]
    fn feedback_commands_default_to_most_recent() {
        assert_eq!(
            parse_line("/up"),
            Input::Command(Command::ThumbsUp { nth: 1 })
        );
        assert_eq!(
            parse_line("/down 2"),
            Input::Command(Command::ThumbsDown { nth: 2 })
        );
        assert_eq!(
            parse_line("/report"),
            Input::Command(Command::Report { nth: 1 })
        );
        assert_eq!(
            Command::ThumbsUp { nth: 1 }.verdict(),
            Some((1, FeedbackVerdict::ThumbsUp))
        );
        assert_eq!(
            parse_line("/up 0"),
            Input::Unrecognized("/up 0".to_string())
        );
    }

    #[test]
    fn unknown_and_malformed_commands() {
        assert_eq!(
            parse_line("/frobnicate"),
            Input::Unrecognized("/frobnicate".to_string())
        );
        assert_eq!(
            parse_line("/open abc"),
            Input::Unrecognized("/open abc".to_string())
        );
        assert_eq!(
            parse_line("/pin maybe"),
            Input::Unrecognized("/pin maybe".to_string())
        );
        assert_eq!(
            parse_line("/title"),
            Input::Unrecognized("/title".to_string())
        );
    }

    #[test]
    fn quit_aliases() {
        assert_eq!(parse_line("/quit"), Input::Command(Command::Quit));
        assert_eq!(parse_line("/exit"), Input::Command(Command::Quit));
    }
}
