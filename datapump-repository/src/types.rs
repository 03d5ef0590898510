//! Request and response types for bulk writes.

use serde_json::{json, Value};

/// A single write destined for a bulk request.
///
/// The document id doubles as the write key, so re-delivering the same
/// operation overwrites the same document instead of duplicating it.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    /// Target index.
    pub index: String,
    /// Legacy mapping type, only sent when set.
    pub doc_type: Option<String>,
    /// Document id within the index.
    pub id: String,
    /// The document body.
    pub source: Value,
    size_bytes: usize,
}

impl BulkOperation {
    /// Create an index (create-or-replace) operation.
    pub fn index(index: impl Into<String>, id: impl Into<String>, source: Value) -> Self {
        let mut operation = Self {
            index: index.into(),
            doc_type: None,
            id: id.into(),
            source,
            size_bytes: 0,
        };
        operation.size_bytes = operation.measure();
        operation
    }

    /// Attach a mapping type to the operation.
    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self.size_bytes = self.measure();
        self
    }

    /// The action/metadata line that precedes the source in the bulk body.
    pub fn action_line(&self) -> Value {
        let mut meta = serde_json::Map::new();
        meta.insert("_index".to_string(), json!(self.index));
        if let Some(ref doc_type) = self.doc_type {
            meta.insert("_type".to_string(), json!(doc_type));
        }
        meta.insert("_id".to_string(), json!(self.id));
        json!({ "index": meta })
    }

    /// Approximate size of this operation on the wire, in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    fn measure(&self) -> usize {
        // Two newline terminators, one per line.
        self.action_line().to_string().len() + self.source.to_string().len() + 2
    }
}

/// Outcome of one item inside a bulk response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemOutcome {
    /// The action the store executed (`index`, `create`, ...).
    pub action: String,
    /// Document id the outcome refers to.
    pub id: String,
    /// HTTP-like status of the item.
    pub status: u16,
    /// Store-reported result (`created`, `updated`, ...).
    pub result: Option<String>,
    /// Error reason for failed items.
    pub error: Option<String>,
}

impl BulkItemOutcome {
    /// Whether the store accepted the write.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    /// Whether this item was an index action.
    pub fn is_index(&self) -> bool {
        self.action == "index"
    }

    /// Whether the write created a new document.
    pub fn is_created(&self) -> bool {
        self.result.as_deref() == Some("created")
    }

    /// Whether the write replaced an existing document.
    pub fn is_updated(&self) -> bool {
        self.result.as_deref() == Some("updated")
    }
}

/// Parsed response of a bulk request with one outcome per submitted item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// Server-side processing time in milliseconds.
    pub took_ms: u64,
    /// Whether any item failed.
    pub errors: bool,
    /// Per-item outcomes, in request order.
    pub items: Vec<BulkItemOutcome>,
}

impl BulkResponse {
    /// Iterate over the items the store rejected.
    pub fn failed_items(&self) -> impl Iterator<Item = &BulkItemOutcome> {
        self.items.iter().filter(|item| !item.is_success())
    }
}
