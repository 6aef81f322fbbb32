//! # Kayak Bridge
//!
//! Concurrently consumes every partition of a topic, decodes each wok frame,
//! normalizes it and forwards it to a document index sink.
//!
//! ```text
//! LogStream ─→ PartitionConsumer ×N ─→ Coordinator ─→ decode → normalize → MessageSink
//! ```
//!
//! The Kafka source sits behind the `kafka` feature; [`MemoryLogStream`]
//! serves frames from memory.

pub mod cli;
pub mod consumer;
pub mod coordinator;
pub mod error;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod logging;
pub mod source;

pub use consumer::{ExitReason, PartitionConsumer, PartitionDone};
pub use coordinator::{Coordinator, CoordinatorReport, CoordinatorSettings};
pub use error::{BridgeError, SourceError};
#[cfg(feature = "kafka")]
pub use kafka::KafkaLogStream;
pub use source::{LogStream, MemoryLogStream, PartitionFeed, RawFrame};
