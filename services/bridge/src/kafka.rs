//! Kafka-backed [`LogStream`]
//!
//! One `StreamConsumer` per partition, each assigned its partition directly
//! with a start offset from the [`OffsetPolicy`]; no consumer-group
//! rebalancing and no offset commits.

use crate::error::SourceError;
use crate::source::{LogStream, PartitionFeed, RawFrame, DEFAULT_FEED_CAPACITY};
use async_trait::async_trait;
use kayak_config::{OffsetPolicy, SourceSettings};
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message, Offset, TopicPartitionList};
use std::time::Duration;
use tracing::{debug, info};

const METADATA_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct KafkaLogStream {
    brokers: String,
    config: ClientConfig,
}

impl KafkaLogStream {
    pub fn new(settings: &SourceSettings) -> Self {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &settings.brokers);
        config.set("group.id", &settings.group_id);
        config.set("session.timeout.ms", settings.session_timeout_ms.to_string());
        config.set("enable.auto.commit", "false");
        config.set("enable.partition.eof", "false");

        Self {
            brokers: settings.brokers.clone(),
            config,
        }
    }

    fn offset(policy: OffsetPolicy) -> Offset {
        match policy {
            OffsetPolicy::Earliest => Offset::Beginning,
            OffsetPolicy::Newest => Offset::End,
        }
    }
}

#[async_trait]
impl LogStream for KafkaLogStream {
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>, SourceError> {
        let probe: BaseConsumer = self
            .config
            .create()
            .map_err(|e| SourceError::connection(e.to_string()))?;

        let requested = topic.to_string();
        let metadata = tokio::task::spawn_blocking(move || {
            probe.fetch_metadata(Some(&requested), METADATA_TIMEOUT)
        })
        .await
        .map_err(|e| SourceError::connection(e.to_string()))?
        .map_err(|e| SourceError::PartitionListing {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;

        let topic_metadata = metadata
            .topics()
            .iter()
            .find(|t| t.name() == topic)
            .ok_or_else(|| SourceError::PartitionListing {
                topic: topic.to_string(),
                reason: "topic missing from metadata".to_string(),
            })?;
        if let Some(err) = topic_metadata.error() {
            return Err(SourceError::PartitionListing {
                topic: topic.to_string(),
                reason: format!("{:?}", err),
            });
        }

        let mut partitions: Vec<i32> = topic_metadata.partitions().iter().map(|p| p.id()).collect();
        partitions.sort_unstable();
        info!(%topic, brokers = %self.brokers, ?partitions, "found Kafka partitions");
        Ok(partitions)
    }

    async fn consume_partition(
        &self,
        topic: &str,
        partition: i32,
        offset: OffsetPolicy,
    ) -> Result<PartitionFeed, SourceError> {
        let consumer: StreamConsumer = self
            .config
            .create()
            .map_err(|e| SourceError::connection(e.to_string()))?;

        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(topic, partition, Self::offset(offset))
            .map_err(|e| SourceError::partition(partition, e.to_string()))?;
        consumer
            .assign(&assignment)
            .map_err(|e| SourceError::partition(partition, e.to_string()))?;

        let (records_tx, errors_tx, feed) = PartitionFeed::channel(partition, DEFAULT_FEED_CAPACITY);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = records_tx.closed() => break,
                    received = consumer.recv() => {
                        let received = received.map(|message| RawFrame {
                            partition: message.partition(),
                            offset: message.offset(),
                            payload: message.payload().unwrap_or_default().to_vec(),
                        });
                        let delivered = match received {
                            Ok(frame) => records_tx.send(frame).await.is_ok(),
                            Err(e) => errors_tx
                                .send(SourceError::partition(partition, e.to_string()))
                                .await
                                .is_ok(),
                        };
                        if !delivered {
                            break;
                        }
                    },
                }
            }
            debug!(partition, "kafka reader stopped");
        });

        Ok(feed)
    }
}
