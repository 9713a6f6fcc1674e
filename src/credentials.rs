//! Credential storage for the citeline client.
//!
//! The client never owns tokens directly; it reads and writes them through
//! an injected [`CredentialStore`]. Tokens are written at login/refresh
//! success and cleared at logout or an irrecoverable refresh failure. The
//! store must behave atomically at whole-value granularity: `tokens` returns
//! a consistent pair or nothing.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::error::{Error, Result};

/// Environment variable holding an initial access token.
pub const ACCESS_TOKEN_ENV: &str = "CITELINE_ACCESS_TOKEN";

/// Environment variable holding an initial refresh token.
pub const REFRESH_TOKEN_ENV: &str = "CITELINE_REFRESH_TOKEN";

/// An access/refresh token pair as issued by the auth service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer token attached to every request.
    pub access_token: String,
    /// Long-lived token exchanged for a new pair on expiry.
    pub refresh_token: String,
}

impl TokenPair {
    /// Creates a new token pair.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// Storage for the client's token pair.
///
/// Read on every outgoing request, written rarely. Implementations must be
/// safe to share across tasks.
pub trait CredentialStore: Send + Sync {
    /// Returns the current token pair, if one is stored.
    fn tokens(&self) -> Option<TokenPair>;

    /// Replaces the stored token pair.
    fn store(&self, pair: TokenPair);

    /// Removes any stored tokens.
    fn clear(&self);
}

/// Callback invoked when a token refresh fails irrecoverably.
///
/// The store has already been cleared when the hook fires; the embedding
/// application decides how to react (prompt for login, exit, etc.).
pub type AuthFailureHook = Arc<dyn Fn() + Send + Sync>;

/// An in-process credential store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<Option<TokenPair>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given pair.
    pub fn with_tokens(pair: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(Some(pair)),
        }
    }

    /// Creates a store seeded from `CITELINE_ACCESS_TOKEN` and
    /// `CITELINE_REFRESH_TOKEN`, empty if either is unset.
    pub fn from_env() -> Self {
        let access = std::env::var(ACCESS_TOKEN_ENV).ok();
        let refresh = std::env::var(REFRESH_TOKEN_ENV).ok();
        match (access, refresh) {
            (Some(access), Some(refresh)) => Self::with_tokens(TokenPair::new(access, refresh)),
            _ => Self::new(),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn tokens(&self) -> Option<TokenPair> {
        self.tokens.read().expect("credential lock poisoned").clone()
    }

    fn store(&self, pair: TokenPair) {
        *self.tokens.write().expect("credential lock poisoned") = Some(pair);
    }

    fn clear(&self) {
        *self.tokens.write().expect("credential lock poisoned") = None;
    }
}

/// A credential store persisted as a JSON file.
///
/// Writes go through a sibling temp file and a rename so a crash mid-write
/// never leaves a truncated credentials file behind.
pub struct FileCredentialStore {
    path: PathBuf,
    cache: RwLock<Option<TokenPair>>,
}

#[derive(Serialize, Deserialize)]
struct CredentialsFile {
    version: u8,
    #[serde(flatten)]
    tokens: TokenPair,
}

impl FileCredentialStore {
    /// Opens a file-backed store, loading any existing tokens.
    ///
    /// A missing file is an empty store, not an error; a malformed file is
    /// treated the same way so a corrupt credentials file forces re-auth
    /// instead of wedging the client.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = match File::open(&path) {
            Ok(file) => {
                let reader = BufReader::new(file);
                from_reader::<_, CredentialsFile>(reader)
                    .ok()
                    .map(|f| f.tokens)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(Error::io("failed to open credentials file", err)),
        };
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    fn persist(&self, pair: &TokenPair) {
        let tmp = self.path.with_extension("tmp");
        let Ok(file) = File::create(&tmp) else {
            return;
        };
        let writer = BufWriter::new(file);
        let contents = CredentialsFile {
            version: 1,
            tokens: pair.clone(),
        };
        if to_writer_pretty(writer, &contents).is_ok() {
            let _ = fs::rename(&tmp, &self.path);
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn tokens(&self) -> Option<TokenPair> {
        self.cache.read().expect("credential lock poisoned").clone()
    }

    fn store(&self, pair: TokenPair) {
        self.persist(&pair);
        *self.cache.write().expect("credential lock poisoned") = Some(pair);
    }

    fn clear(&self) {
        let _ = fs::remove_file(&self.path);
        *self.cache.write().expect("credential lock poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_lifecycle() {
        let store = MemoryCredentialStore::new();
        assert!(store.tokens().is_none());

        store.store(TokenPair::new("access-1", "refresh-1"));
        assert_eq!(
            store.tokens(),
            Some(TokenPair::new("access-1", "refresh-1"))
        );

        store.store(TokenPair::new("access-2", "refresh-2"));
        assert_eq!(store.tokens().unwrap().access_token, "access-2");

        store.clear();
        assert!(store.tokens().is_none());
    }

    #[test]
    fn file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("citeline-cred-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("credentials.json");

        let store = FileCredentialStore::open(&path).unwrap();
        assert!(store.tokens().is_none());
        store.store(TokenPair::new("access", "refresh"));

        // A fresh store picks up the persisted pair.
        let reopened = FileCredentialStore::open(&path).unwrap();
        assert_eq!(
            reopened.tokens(),
            Some(TokenPair::new("access", "refresh"))
        );

        reopened.clear();
        assert!(reopened.tokens().is_none());
        let reopened = FileCredentialStore::open(&path).unwrap();
        assert!(reopened.tokens().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_tolerates_garbage() {
        let dir = std::env::temp_dir().join(format!("citeline-cred-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("credentials.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileCredentialStore::open(&path).unwrap();
        assert!(store.tokens().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn token_pair_serde() {
        let pair = TokenPair::new("a", "r");
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"{"access_token":"a","refresh_token":"r"}"#);
        let back: TokenPair = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pair);
    }
}
