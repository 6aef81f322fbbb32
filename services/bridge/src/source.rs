//! # Upstream Log Stream
//!
//! A [`LogStream`] lists the partitions of a topic and opens one
//! [`PartitionFeed`] per partition: a record channel carrying
//! [`RawFrame`]s in partition order and a separate error channel.
//!
//! [`MemoryLogStream`] serves frames from memory. Its feeds either close once
//! drained (a finite stream) or stay open until a token is cancelled (a live
//! stream with nothing new to say).

use crate::error::SourceError;
use async_trait::async_trait;
use kayak_config::OffsetPolicy;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Buffered records per feed before the reader blocks
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// One raw record read from a partition, prior to decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// The receiving ends of one partition's record and error channels
#[derive(Debug)]
pub struct PartitionFeed {
    pub partition: i32,
    pub records: mpsc::Receiver<RawFrame>,
    pub errors: mpsc::Receiver<SourceError>,
}

impl PartitionFeed {
    /// Create a feed and the senders that fill it
    pub fn channel(
        partition: i32,
        capacity: usize,
    ) -> (mpsc::Sender<RawFrame>, mpsc::Sender<SourceError>, Self) {
        let (records_tx, records) = mpsc::channel(capacity);
        let (errors_tx, errors) = mpsc::channel(capacity);
        (
            records_tx,
            errors_tx,
            Self {
                partition,
                records,
                errors,
            },
        )
    }
}

/// A partitioned, ordered log of raw frames
#[async_trait]
pub trait LogStream: Send + Sync {
    /// Partition indices of `topic`, ascending
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>, SourceError>;

    /// Start reading one partition from the position chosen by `offset`
    async fn consume_partition(
        &self,
        topic: &str,
        partition: i32,
        offset: OffsetPolicy,
    ) -> Result<PartitionFeed, SourceError>;
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Frame(Vec<u8>),
    Error(String),
}

/// In-memory log stream
#[derive(Debug, Clone)]
pub struct MemoryLogStream {
    topics: HashMap<String, BTreeMap<i32, Vec<MemoryEntry>>>,
    hold_open: Option<CancellationToken>,
    feed_capacity: usize,
}

impl Default for MemoryLogStream {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLogStream {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
            hold_open: None,
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }

    /// Declare an empty partition
    pub fn with_partition(mut self, topic: &str, partition: i32) -> Self {
        self.entries(topic, partition);
        self
    }

    /// Append a frame; its offset is the number of frames before it
    pub fn with_frame(mut self, topic: &str, partition: i32, payload: impl Into<Vec<u8>>) -> Self {
        self.push_frame(topic, partition, payload);
        self
    }

    /// Append a read error between frames
    pub fn with_error(mut self, topic: &str, partition: i32, message: impl Into<String>) -> Self {
        self.entries(topic, partition)
            .push(MemoryEntry::Error(message.into()));
        self
    }

    /// Keep every feed open after it is drained until `token` is cancelled
    pub fn hold_open(mut self, token: CancellationToken) -> Self {
        self.hold_open = Some(token);
        self
    }

    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity.max(1);
        self
    }

    pub fn push_frame(&mut self, topic: &str, partition: i32, payload: impl Into<Vec<u8>>) {
        self.entries(topic, partition)
            .push(MemoryEntry::Frame(payload.into()));
    }

    /// Number of frames stored across all partitions of `topic`
    pub fn frame_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|partitions| {
                partitions
                    .values()
                    .flatten()
                    .filter(|entry| matches!(entry, MemoryEntry::Frame(_)))
                    .count()
            })
            .unwrap_or(0)
    }

    fn entries(&mut self, topic: &str, partition: i32) -> &mut Vec<MemoryEntry> {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .entry(partition)
            .or_default()
    }
}

#[async_trait]
impl LogStream for MemoryLogStream {
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>, SourceError> {
        self.topics
            .get(topic)
            .map(|partitions| partitions.keys().copied().collect())
            .ok_or_else(|| SourceError::PartitionListing {
                topic: topic.to_string(),
                reason: "unknown topic".to_string(),
            })
    }

    async fn consume_partition(
        &self,
        topic: &str,
        partition: i32,
        offset: OffsetPolicy,
    ) -> Result<PartitionFeed, SourceError> {
        let entries = self
            .topics
            .get(topic)
            .and_then(|partitions| partitions.get(&partition))
            .ok_or_else(|| SourceError::UnknownPartition {
                topic: topic.to_string(),
                partition,
            })?;

        // Newest starts after everything already stored
        let backlog = match offset {
            OffsetPolicy::Earliest => entries.clone(),
            OffsetPolicy::Newest => Vec::new(),
        };

        let (records_tx, errors_tx, feed) = PartitionFeed::channel(partition, self.feed_capacity);
        let hold_open = self.hold_open.clone();

        tokio::spawn(async move {
            let mut next_offset = 0i64;
            for entry in backlog {
                let delivered = match entry {
                    MemoryEntry::Frame(payload) => {
                        let frame = RawFrame {
                            partition,
                            offset: next_offset,
                            payload,
                        };
                        next_offset += 1;
                        records_tx.send(frame).await.is_ok()
                    }
                    MemoryEntry::Error(message) => errors_tx
                        .send(SourceError::partition(partition, message))
                        .await
                        .is_ok(),
                };
                if !delivered {
                    return;
                }
            }

            if let Some(token) = hold_open {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = records_tx.closed() => {}
                }
            }
            debug!(partition, "memory feed closed");
        });

        Ok(feed)
    }
}
