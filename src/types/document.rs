use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Summary of an ingested document, enough to drive scoping selection.
///
/// Upload and content viewing go through the ingestion service directly and
/// are not modeled here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    /// Server-assigned document id.
    pub id: i64,

    /// Original filename.
    pub filename: String,

    /// Ingestion status as reported by the backend ("processing",
    /// "completed", "failed").
    pub status: String,

    /// Page count, once ingestion has determined it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,

    /// When the document was uploaded.
    #[serde(with = "crate::utils::time")]
    pub created_at: OffsetDateTime,
}

impl DocumentSummary {
    /// Returns true once the document is available for retrieval.
    pub fn is_ready(&self) -> bool {
        self.status == "completed"
    }
}

/// One page of the document listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentPage {
    /// Documents on this page.
    pub items: Vec<DocumentSummary>,

    /// Total documents across all pages.
    pub total: u64,
}
