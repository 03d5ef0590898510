//! Record stream for the datapump pipeline.
//!
//! An ordered single-producer/single-consumer conduit of documents,
//! terminated by an explicit end-of-stream marker.

mod channel;
mod messages;

pub use channel::{record_stream, RecordReceiver, RecordSender};
pub use messages::{Document, Record};
