//! Newline-delimited JSON record source.

use datapump_pipeline::RecordSender;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::DatapumpError;

/// Counts of one pass over the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSummary {
    /// Documents sent to the pipeline.
    pub sent: u64,
    /// Lines skipped because they were not a JSON object.
    pub skipped: u64,
}

/// Reads one JSON document per line and feeds it to a pipeline.
pub struct NdjsonSource<R> {
    reader: R,
    id_field: String,
}

impl<R> NdjsonSource<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, id_field: impl Into<String>) -> Self {
        Self {
            reader,
            id_field: id_field.into(),
        }
    }

    /// Send every document, then the end-of-stream marker.
    ///
    /// Empty lines are ignored. Lines that are not UTF-8 or not a JSON object
    /// are logged and skipped.
    /// A read error stops the source without sending end-of-stream.
    pub async fn pump(self, sender: RecordSender) -> Result<SourceSummary, DatapumpError> {
        let mut summary = SourceSummary::default();
        let mut lines = self.reader.split(b'\n');
        let mut line_number: u64 = 0;

        while let Some(raw) = lines.next_segment().await? {
            line_number += 1;
            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    warn!(line = line_number, error = %e, "Skipping line that is not UTF-8");
                    summary.skipped += 1;
                    continue;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(line) {
                Ok(payload) if payload.is_object() => {
                    let uid = document_id(&payload, &self.id_field);
                    sender.send_document(uid, payload).await?;
                    summary.sent += 1;
                }
                Ok(_) => {
                    warn!(line = line_number, "Skipping line that is not a JSON object");
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(line = line_number, error = %e, "Skipping malformed line");
                    summary.skipped += 1;
                }
            }
        }

        sender.finish().await?;
        debug!(sent = summary.sent, skipped = summary.skipped, "Input exhausted");
        Ok(summary)
    }
}

/// The id at `field` if it is a non-empty string or a number, a fresh UUID
/// otherwise.
fn document_id(payload: &Value, field: &str) -> String {
    match payload.get(field) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}
