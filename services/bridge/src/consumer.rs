//! # Partition Consumer
//!
//! One task per partition. It waits on three things at once: the next record,
//! the next read error, and the shared cancellation token. Records are
//! forwarded untouched onto the aggregation channel, read errors are logged,
//! and cancellation ends the task. Forwarding itself is raced against the
//! token so a consumer blocked on a full channel still shuts down.
//!
//! Every exit path reports a [`PartitionDone`] on the completion channel.

use crate::error::SourceError;
use crate::source::{PartitionFeed, RawFrame};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a consumer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The shared token was cancelled
    Cancelled,
    /// The partition's record feed ended
    FeedClosed,
    /// Nobody is reading the aggregation channel any more
    OutputClosed,
}

/// Completion signal sent by a consumer as its last act
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDone {
    pub partition: i32,
    /// Records handed to the aggregation channel
    pub forwarded: u64,
    /// Read errors observed on the error feed
    pub errors: u64,
    pub reason: ExitReason,
}

#[derive(Debug)]
pub struct PartitionConsumer {
    partition: i32,
    forwarded: u64,
    errors: u64,
}

impl PartitionConsumer {
    pub fn new(partition: i32) -> Self {
        Self {
            partition,
            forwarded: 0,
            errors: 0,
        }
    }

    /// Consume `feed` until cancelled or the feed ends, then signal `done`
    pub async fn run(
        mut self,
        mut feed: PartitionFeed,
        cancel: CancellationToken,
        output: mpsc::Sender<RawFrame>,
        done: mpsc::Sender<PartitionDone>,
    ) {
        debug!(partition = self.partition, "partition consumer started");
        let mut errors_open = true;

        let reason = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break ExitReason::Cancelled,

                record = feed.records.recv() => match record {
                    Some(frame) => {
                        if let Some(reason) = self.forward(frame, &cancel, &output).await {
                            break reason;
                        }
                    }
                    None => {
                        self.drain_errors(&mut feed);
                        break ExitReason::FeedClosed;
                    }
                },

                error = feed.errors.recv(), if errors_open => match error {
                    Some(error) => self.record_error(&error),
                    None => errors_open = false,
                },
            }
        };

        info!(
            partition = self.partition,
            forwarded = self.forwarded,
            errors = self.errors,
            ?reason,
            "partition consumer stopped"
        );

        let signal = PartitionDone {
            partition: self.partition,
            forwarded: self.forwarded,
            errors: self.errors,
            reason,
        };
        if done.send(signal).await.is_err() {
            debug!(partition = self.partition, "coordinator gone before completion signal");
        }
    }

    fn record_error(&mut self, error: &SourceError) {
        self.errors += 1;
        warn!(partition = self.partition, %error, "partition read error");
    }

    /// Errors still queued when the record feed ends
    fn drain_errors(&mut self, feed: &mut PartitionFeed) {
        while let Ok(error) = feed.errors.try_recv() {
            self.record_error(&error);
        }
    }

    async fn forward(
        &mut self,
        frame: RawFrame,
        cancel: &CancellationToken,
        output: &mpsc::Sender<RawFrame>,
    ) -> Option<ExitReason> {
        let offset = frame.offset;
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(partition = self.partition, offset, "cancelled while forwarding, frame not delivered");
                Some(ExitReason::Cancelled)
            }

            sent = output.send(frame) => match sent {
                Ok(()) => {
                    self.forwarded += 1;
                    None
                }
                Err(_) => Some(ExitReason::OutputClosed),
            },
        }
    }
}
