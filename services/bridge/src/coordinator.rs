//! # Coordinator
//!
//! Spawns one [`PartitionConsumer`] per partition of the topic and fans their
//! records into a single aggregation channel. Each record is decoded,
//! normalized and handed to the sink, in arrival order, on the coordinator's
//! own task.
//!
//! The coordinator alone owns the count of running consumers. It stops once
//! every consumer has sent its completion signal, after draining records that
//! were forwarded before the last signal arrived.
//!
//! ```text
//! feed 0 ─→ PartitionConsumer ─┐
//! feed 1 ─→ PartitionConsumer ─┼─→ aggregation channel ─→ decode → normalize → sink
//! feed N ─→ PartitionConsumer ─┘
//!                 └──────────── completion channel ─────→ running -= 1
//! ```

use crate::consumer::{PartitionConsumer, PartitionDone};
use crate::error::{BridgeError, Result};
use crate::source::{LogStream, RawFrame};
use codec::{decode_message, FrameOrigin, MessageNormalizer};
use kayak_config::{BridgeConfig, OffsetPolicy};
use message_sink::MessageSink;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What the coordinator needs to know about the topic and the pipeline
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub topic: String,
    pub offset: OffsetPolicy,
    /// Aggregation channel capacity; 1 makes forwarding a near-synchronous handoff
    pub channel_capacity: usize,
    pub max_decompressed_bytes: usize,
}

impl CoordinatorSettings {
    pub fn new(topic: impl Into<String>) -> Self {
        let defaults = BridgeConfig::default();
        Self {
            topic: topic.into(),
            offset: defaults.source.offset,
            channel_capacity: defaults.pipeline.channel_capacity,
            max_decompressed_bytes: defaults.pipeline.max_decompressed_bytes,
        }
    }

    pub fn with_offset(mut self, offset: OffsetPolicy) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

impl From<&BridgeConfig> for CoordinatorSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            topic: config.source.topic.clone(),
            offset: config.source.offset,
            channel_capacity: config.pipeline.channel_capacity,
            max_decompressed_bytes: config.pipeline.max_decompressed_bytes,
        }
    }
}

/// Counters for one coordinator run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorReport {
    /// Partitions consumed
    pub partitions: usize,
    /// Frames taken off the aggregation channel
    pub received: u64,
    /// Frames decoded, normalized and handed to the sink
    pub processed: u64,
    /// Sink accepted the message
    pub delivered: u64,
    pub decode_failures: u64,
    pub normalize_failures: u64,
    /// Forwarded with an empty body
    pub decompression_failures: u64,
    pub sink_failures: u64,
    /// Read errors reported by the partition feeds
    pub source_errors: u64,
}

impl fmt::Display for CoordinatorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} messages from {} partitions ({} received, {} delivered, \
             {} decode failures, {} normalize failures, {} decompression failures, \
             {} sink failures, {} source errors)",
            self.processed,
            self.partitions,
            self.received,
            self.delivered,
            self.decode_failures,
            self.normalize_failures,
            self.decompression_failures,
            self.sink_failures,
            self.source_errors,
        )
    }
}

pub struct Coordinator {
    source: Arc<dyn LogStream>,
    sink: Arc<dyn MessageSink>,
    normalizer: MessageNormalizer,
    settings: CoordinatorSettings,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("sink", &self.sink)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(
        source: Arc<dyn LogStream>,
        sink: Arc<dyn MessageSink>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            source,
            sink,
            normalizer: MessageNormalizer::new(settings.max_decompressed_bytes),
            settings,
        }
    }

    /// Consume every partition until all consumers have completed
    ///
    /// Listing partitions and opening the feeds happen before any consumer
    /// starts; a failure there aborts the run. After that nothing is fatal.
    pub async fn run(&self, cancel: CancellationToken) -> Result<CoordinatorReport> {
        let topic = &self.settings.topic;
        let partitions = self.source.partitions(topic).await?;
        if partitions.is_empty() {
            return Err(BridgeError::NoPartitions {
                topic: topic.clone(),
            });
        }
        info!(%topic, ?partitions, offset = %self.settings.offset, "found partitions");

        let mut feeds = Vec::with_capacity(partitions.len());
        for partition in &partitions {
            feeds.push(
                self.source
                    .consume_partition(topic, *partition, self.settings.offset)
                    .await?,
            );
        }

        let (record_tx, mut record_rx) = mpsc::channel(self.settings.channel_capacity.max(1));
        // One slot per consumer so a completion signal never blocks
        let (done_tx, mut done_rx) = mpsc::channel::<PartitionDone>(partitions.len());

        let handles: Vec<_> = feeds
            .into_iter()
            .map(|feed| {
                let consumer = PartitionConsumer::new(feed.partition);
                tokio::spawn(consumer.run(feed, cancel.clone(), record_tx.clone(), done_tx.clone()))
            })
            .collect();
        drop(record_tx);
        drop(done_tx);

        let mut report = CoordinatorReport {
            partitions: partitions.len(),
            ..Default::default()
        };
        let mut running = partitions.len();

        while running > 0 {
            tokio::select! {
                biased;

                Some(frame) = record_rx.recv() => self.process(frame, &mut report).await,

                done = done_rx.recv() => match done {
                    Some(done) => {
                        running -= 1;
                        report.source_errors += done.errors;
                        debug!(partition = done.partition, forwarded = done.forwarded, running, "partition completed");
                    }
                    None => {
                        error!(running, "consumers exited without a completion signal");
                        break;
                    }
                },
            }
        }

        // Records forwarded before the last completion signal
        while let Ok(frame) = record_rx.try_recv() {
            self.process(frame, &mut report).await;
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "partition consumer task failed");
            }
        }

        info!(
            processed = report.processed,
            delivered = report.delivered,
            "coordinator finished"
        );
        Ok(report)
    }

    async fn process(&self, frame: RawFrame, report: &mut CoordinatorReport) {
        report.received += 1;
        let origin = FrameOrigin::new(frame.partition, frame.offset);

        let decoded = match decode_message(&frame.payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                report.decode_failures += 1;
                warn!(%origin, kind = e.kind(), error = %e, "dropping undecodable frame");
                return;
            }
        };

        let normalized = match self.normalizer.normalize(decoded, origin) {
            Ok(normalized) => normalized,
            Err(e) => {
                report.normalize_failures += 1;
                warn!(%origin, error = %e, "dropping message that cannot be normalized");
                return;
            }
        };
        if normalized.decompression_error.is_some() {
            report.decompression_failures += 1;
        }

        report.processed += 1;
        let message = normalized.message;
        match self.sink.send(&message).await {
            Ok(()) => {
                report.delivered += 1;
                debug!(%origin, id = %message.id, "message delivered");
            }
            Err(e) => {
                report.sink_failures += 1;
                warn!(%origin, id = %message.document_id(), kind = e.kind(), error = %e, "sink write failed");
            }
        }
    }
}
