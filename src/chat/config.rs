//! Configuration types for the chat binary.
//!
//! CLI argument parsing via `arrrg`, plus the resolved configuration the
//! REPL runs with.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_API_URL;

/// Command-line arguments for the citeline-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the backend API.
    #[arrrg(optional, "Base URL of the backend API", "URL")]
    pub api_url: Option<String>,

    /// Path of the credentials file to load and persist tokens to.
    #[arrrg(optional, "Path of the credentials file", "PATH")]
    pub credentials: Option<String>,

    /// Session to resume on startup.
    #[arrrg(optional, "Session id to resume on startup", "ID")]
    pub session: Option<i64>,

    /// Documents to scope the conversation to, comma-separated.
    #[arrrg(optional, "Comma-separated document ids to scope to", "IDS")]
    pub docs: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Error produced when command-line arguments don't parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatArgsError {
    message: String,
}

impl std::fmt::Display for ChatArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ChatArgsError {}

/// Resolved configuration for a chat run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Base URL of the backend API.
    pub base_url: String,

    /// Credentials file; `None` means tokens come from the environment and
    /// are not persisted.
    pub credentials_path: Option<PathBuf>,

    /// Session to resume on startup.
    pub session_id: Option<i64>,

    /// Documents to scope the conversation to.
    pub document_ids: Vec<i64>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a configuration with defaults: the default API URL,
    /// environment-only credentials, no resumed session, no document
    /// scoping, colors on.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            credentials_path: None,
            session_id: None,
            document_ids: Vec::new(),
            use_color: true,
        }
    }

    /// Sets the backend base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the credentials file path.
    pub fn with_credentials_path(mut self, path: Option<PathBuf>) -> Self {
        self.credentials_path = path;
        self
    }

    /// Resumes the given session on startup.
    pub fn with_session_id(mut self, session_id: Option<i64>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Scopes the conversation to the given documents.
    pub fn with_document_ids(mut self, document_ids: Vec<i64>) -> Self {
        self.document_ids = document_ids;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = ChatArgsError;

    fn try_from(args: ChatArgs) -> Result<Self, Self::Error> {
        let document_ids = match args.docs.as_deref() {
            Some(docs) => parse_doc_ids(docs).ok_or_else(|| ChatArgsError {
                message: format!("invalid --docs value: {docs:?}"),
            })?,
            None => Vec::new(),
        };
        Ok(ChatConfig {
            base_url: args
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            credentials_path: args.credentials.map(PathBuf::from),
            session_id: args.session,
            document_ids,
            use_color: !args.no_color,
        })
    }
}

fn parse_doc_ids(docs: &str) -> Option<Vec<i64>> {
    docs.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert!(config.credentials_path.is_none());
        assert!(config.session_id.is_none());
        assert!(config.document_ids.is_empty());
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            api_url: Some("https://rag.example.com/api/v1/".to_string()),
            credentials: Some("/tmp/citeline.json".to_string()),
            session: Some(42),
            docs: Some("1, 2,3".to_string()),
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.base_url, "https://rag.example.com/api/v1/");
        assert_eq!(
            config.credentials_path,
            Some(PathBuf::from("/tmp/citeline.json"))
        );
        assert_eq!(config.session_id, Some(42));
        assert_eq!(config.document_ids, vec![1, 2, 3]);
        assert!(!config.use_color);
    }

    #[test]
    fn malformed_docs_rejected() {
        let args = ChatArgs {
            docs: Some("1,two".to_string()),
            ..ChatArgs::default()
        };
        let err = ChatConfig::try_from(args).unwrap_err();
        assert!(err.to_string().contains("--docs"));
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_base_url("http://localhost:9000/api/v1/")
            .with_credentials_path(Some(PathBuf::from("creds.json")))
            .with_session_id(Some(7))
            .with_document_ids(vec![5])
            .without_color();
        assert_eq!(config.base_url, "http://localhost:9000/api/v1/");
        assert_eq!(config.credentials_path, Some(PathBuf::from("creds.json")));
        assert_eq!(config.session_id, Some(7));
        assert_eq!(config.document_ids, vec![5]);
        assert!(!config.use_color);
    }
}
