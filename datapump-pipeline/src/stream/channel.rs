//! Bounded channel carrying records from the producer to the pipeline.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::PipelineError;
use crate::stream::messages::{Document, Record};

/// Create a record stream with the given buffer capacity.
///
/// The producer blocks on `send` once `capacity` records are buffered; no
/// record is ever dropped or reordered.
pub fn record_stream(capacity: usize) -> (RecordSender, RecordReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        RecordSender { tx },
        RecordReceiver {
            rx,
            finished: false,
        },
    )
}

/// Producer half of a record stream.
///
/// The end-of-stream marker is sent by [`RecordSender::finish`], which
/// consumes the sender, so nothing can follow it.
#[derive(Debug)]
pub struct RecordSender {
    tx: mpsc::Sender<Record>,
}

impl RecordSender {
    /// Enqueue a document, waiting for buffer space if necessary.
    pub async fn send(&self, document: Document) -> Result<(), PipelineError> {
        self.tx
            .send(document.into())
            .await
            .map_err(|_| PipelineError::channel("record stream closed by the consumer"))
    }

    /// Enqueue a document built from its parts.
    pub async fn send_document(
        &self,
        uid: impl Into<String>,
        payload: Value,
    ) -> Result<(), PipelineError> {
        self.send(Document::new(uid, payload)).await
    }

    /// Send the end-of-stream marker and close the producer side.
    pub async fn finish(self) -> Result<(), PipelineError> {
        self.tx
            .send(Record::EndOfStream)
            .await
            .map_err(|_| PipelineError::channel("record stream closed by the consumer"))
    }
}

/// Consumer half of a record stream.
#[derive(Debug)]
pub struct RecordReceiver {
    rx: mpsc::Receiver<Record>,
    finished: bool,
}

impl RecordReceiver {
    /// Wait for the next record.
    ///
    /// Returns `None` once the end-of-stream marker has been delivered, or
    /// when the producer went away without sending one.
    pub async fn recv(&mut self) -> Option<Record> {
        if self.finished {
            return None;
        }

        let record = self.rx.recv().await;
        if matches!(record, Some(Record::EndOfStream)) {
            self.finished = true;
            self.rx.close();
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_arrive_in_order_then_end() {
        let (tx, mut rx) = record_stream(4);

        let producer = tokio::spawn(async move {
            for i in 0..100 {
                tx.send_document(i.to_string(), json!({ "n": i })).await.unwrap();
            }
            tx.finish().await.unwrap();
        });

        let mut seen = Vec::new();
        while let Some(record) = rx.recv().await {
            match record {
                Record::Document(doc) => seen.push(doc.uid),
                Record::EndOfStream => break,
            }
        }
        producer.await.unwrap();

        let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_nothing_after_end_of_stream() {
        let (tx, mut rx) = record_stream(2);
        tx.send_document("a", json!({})).await.unwrap();
        tx.finish().await.unwrap();

        assert!(matches!(rx.recv().await, Some(Record::Document(_))));
        assert_eq!(rx.recv().await, Some(Record::EndOfStream));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_producer_ends_stream() {
        let (tx, mut rx) = record_stream(2);
        tx.send_document("a", json!({})).await.unwrap();
        drop(tx);

        assert!(rx.recv().await.is_some());
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_send_fails_when_consumer_is_gone() {
        let (tx, rx) = record_stream(2);
        drop(rx);

        let result = tx.send_document("a", json!({})).await;

        assert!(matches!(result, Err(PipelineError::ChannelError(_))));
    }
}
