// Public modules
pub mod chat;
pub mod client;
pub mod credentials;
pub mod error;
pub mod observability;
pub mod render;
pub mod types;
pub mod utils;

// Re-exports
pub use client::{Citeline, Transport};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenPair};
pub use error::{Error, Result};
pub use types::*;
