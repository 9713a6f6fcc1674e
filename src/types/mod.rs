// Public modules
pub mod document;
pub mod feedback;
pub mod message;
pub mod session;
pub mod source;

// Re-exports
pub use document::{DocumentPage, DocumentSummary};
pub use feedback::{FeedbackParams, FeedbackVerdict};
pub use message::{Message, MessageRole, MessageSendParams, MessageSendResponse};
pub use session::{
    Session, SessionCreateParams, SessionPage, SessionUpdateParams, SessionWithMessages,
};
pub use source::SourceRef;
