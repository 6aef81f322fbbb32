use crate::SinkError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Information about a sink for monitoring/debugging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkMetadata {
    /// Human-readable sink name
    pub name: String,

    /// Sink type (elasticsearch, stdout, collector, ...)
    pub sink_type: String,

    /// Connection endpoint if applicable
    pub endpoint: Option<String>,

    pub state: ConnectionState,

    pub messages_sent: u64,

    pub messages_failed: u64,

    pub last_error: Option<String>,
}

impl SinkMetadata {
    pub fn new(name: impl Into<String>, sink_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: sink_type.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_state(mut self, state: ConnectionState) -> Self {
        self.state = state;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn can_connect(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Failed
        )
    }
}

/// Delivery counters shared by the concrete sinks
#[derive(Debug, Default)]
pub struct SendCounters {
    sent: AtomicU64,
    failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SendCounters {
    pub fn record_success(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, error: &SinkError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(error.to_string());
        }
    }

    /// Copy the counters into `metadata`
    pub fn fill(&self, mut metadata: SinkMetadata) -> SinkMetadata {
        metadata.messages_sent = self.sent.load(Ordering::Relaxed);
        metadata.messages_failed = self.failed.load(Ordering::Relaxed);
        metadata.last_error = self.last_error.lock().ok().and_then(|last| last.clone());
        metadata
    }
}
