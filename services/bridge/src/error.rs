//! Error types for the bridge service

use thiserror::Error;

/// Failures reported by an upstream log stream
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Failed to list partitions of '{topic}': {reason}")]
    PartitionListing { topic: String, reason: String },

    #[error("Partition {partition} not found in '{topic}'")]
    UnknownPartition { topic: String, partition: i32 },

    #[error("Partition {partition} error: {message}")]
    Partition { partition: i32, message: String },
}

impl SourceError {
    pub fn connection(msg: impl Into<String>) -> Self {
        SourceError::Connection(msg.into())
    }

    pub fn partition(partition: i32, msg: impl Into<String>) -> Self {
        SourceError::Partition {
            partition,
            message: msg.into(),
        }
    }
}

/// Failures that stop the bridge before or during startup
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Topic '{topic}' has no partitions")]
    NoPartitions { topic: String },
}

pub type Result<T> = std::result::Result<T, BridgeError>;
