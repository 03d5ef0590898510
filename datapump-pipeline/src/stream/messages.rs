//! Message types for the record stream.

use serde_json::Value;

/// One document to be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Unique id of the document within the target index. Used as the
    /// write key, so re-sending a document overwrites it.
    pub uid: String,
    /// The document body.
    pub payload: Value,
}

impl Document {
    /// Create a new document.
    pub fn new(uid: impl Into<String>, payload: Value) -> Self {
        Self {
            uid: uid.into(),
            payload,
        }
    }
}

/// Messages that flow through the record stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A document to write.
    Document(Document),
    /// No more records follow.
    EndOfStream,
}

impl Record {
    /// Whether this record terminates the stream.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

impl From<Document> for Record {
    fn from(document: Document) -> Self {
        Self::Document(document)
    }
}
