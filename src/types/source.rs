use serde::{Deserialize, Serialize};

/// A citation record: the document chunk the assistant used to ground part
/// of an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// The document the excerpt came from.
    pub document_id: i64,

    /// Display name of the document.
    pub document_name: String,

    /// The retrieved chunk within the document.
    pub chunk_id: i64,

    /// Excerpt of the chunk content.
    pub content: String,

    /// Retrieval relevance score, higher is better.
    pub relevance_score: f64,

    /// Page number within the document, when the source format has pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl SourceRef {
    /// Returns a one-line label suitable for display next to an answer.
    pub fn label(&self) -> String {
        match self.page {
            Some(page) => format!("{} (p. {})", self.document_name, page),
            None => self.document_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SourceRef {
        SourceRef {
            document_id: 7,
            document_name: "refund-policy.pdf".to_string(),
            chunk_id: 42,
            content: "Refunds are issued within 30 days.".to_string(),
            relevance_score: 0.91,
            page: Some(3),
        }
    }

    #[test]
    fn serialization() {
        let json = serde_json::to_string(&sample()).unwrap();
        let expected = r#"{"document_id":7,"document_name":"refund-policy.pdf","chunk_id":42,"content":"Refunds are issued within 30 days.","relevance_score":0.91,"page":3}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn page_omitted_when_absent() {
        let mut source = sample();
        source.page = None;
        let json = serde_json::to_string(&source).unwrap();
        assert!(!json.contains("page"));
        assert_eq!(source.label(), "refund-policy.pdf");
    }

    #[test]
    fn label_includes_page() {
        assert_eq!(sample().label(), "refund-policy.pdf (p. 3)");
    }
}
