//! # Message Sink
//!
//! Destinations for normalized wok messages. The bridge hands every
//! [`GenericMessage`] to one [`MessageSink`]; concrete sinks live in
//! [`sinks`], test doubles in [`test_utils`].

pub mod error;
pub mod metadata;
pub mod sinks;
pub mod test_utils;

use async_trait::async_trait;
use codec::GenericMessage;
use std::fmt::Debug;

pub use error::{SendContext, SinkError};
pub use metadata::{ConnectionState, SendCounters, SinkMetadata};
pub use sinks::{ElasticsearchSink, StdoutSink};

/// A destination for normalized messages that abstracts away connection details
#[async_trait]
pub trait MessageSink: Send + Sync + Debug {
    /// Deliver a single message
    async fn send(&self, message: &GenericMessage) -> Result<(), SinkError>;

    /// Check if currently connected
    fn is_connected(&self) -> bool;

    /// Establish connection (may be no-op if already connected)
    async fn connect(&self) -> Result<(), SinkError>;

    /// Close connection (may be no-op if not connected)
    async fn disconnect(&self) -> Result<(), SinkError>;

    /// Get sink metadata for debugging/monitoring
    fn metadata(&self) -> SinkMetadata {
        SinkMetadata::default()
    }
}

/// Failure context for a message
pub(crate) fn send_context(message: &GenericMessage) -> SendContext {
    SendContext::new(message.document_id(), message.origin().to_string())
}
