use crate::{send_context, ConnectionState, MessageSink, SendCounters, SinkError, SinkMetadata};
use async_trait::async_trait;
use chrono::Utc;
use codec::GenericMessage;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Build a plain message at stream position 0-0
pub fn sample_message(id: &str, body: &str) -> GenericMessage {
    sample_message_at(id, body, 0, 0)
}

/// Build a plain message at the given stream position
pub fn sample_message_at(id: &str, body: &str, partition: i32, offset: i64) -> GenericMessage {
    GenericMessage {
        version: 1,
        recipients: vec!["ops".to_string()],
        sender: "test".to_string(),
        id: id.to_string(),
        headers: BTreeMap::new(),
        header_checksum: 0,
        body_checksum: 0,
        body: body.as_bytes().to_vec(),
        timestamp: Utc::now(),
        partition,
        offset,
    }
}

/// A sink that collects messages in memory
#[derive(Debug)]
pub struct CollectorSink {
    messages: Mutex<Vec<GenericMessage>>,
    connected: AtomicBool,
    fail_on_send: AtomicBool,
    fail_ids: Mutex<HashSet<String>>,
    counters: SendCounters,
    name: String,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::with_name("test-collector")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            fail_on_send: AtomicBool::new(false),
            fail_ids: Mutex::new(HashSet::new()),
            counters: SendCounters::default(),
            name: name.into(),
        }
    }

    /// A collector that is already connected
    pub fn connected() -> Self {
        let sink = Self::new();
        sink.connected.store(true, Ordering::Relaxed);
        sink
    }

    /// All delivered messages in delivery order
    pub fn received_messages(&self) -> Vec<GenericMessage> {
        lock(&self.messages).clone()
    }

    pub fn message_count(&self) -> usize {
        lock(&self.messages).len()
    }

    /// Fail the next send, whatever the message
    pub fn fail_next_send(&self) {
        self.fail_on_send.store(true, Ordering::Relaxed);
    }

    /// Reject every message whose document id is in `ids`
    pub fn fail_document_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.fail_ids).extend(ids.into_iter().map(Into::into));
    }
}

impl Default for CollectorSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSink for CollectorSink {
    async fn send(&self, message: &GenericMessage) -> Result<(), SinkError> {
        if !self.is_connected() {
            let err = SinkError::NotConnected;
            self.counters.record_failure(&err);
            return Err(err);
        }

        let rejected = self.fail_on_send.swap(false, Ordering::Relaxed)
            || lock(&self.fail_ids).contains(&message.document_id());
        if rejected {
            let err = SinkError::send_failed("Simulated failure", send_context(message));
            self.counters.record_failure(&err);
            return Err(err);
        }

        lock(&self.messages).push(message.clone());
        self.counters.record_success();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn connect(&self) -> Result<(), SinkError> {
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SinkError> {
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn metadata(&self) -> SinkMetadata {
        let state = if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        self.counters.fill(
            SinkMetadata::new(self.name.clone(), "collector")
                .with_endpoint("memory://test")
                .with_state(state),
        )
    }
}

/// A sink that always fails for testing error conditions
#[derive(Debug)]
pub struct FailingSink {
    error_message: String,
}

impl FailingSink {
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
        }
    }
}

impl Default for FailingSink {
    fn default() -> Self {
        Self::new("Simulated failure")
    }
}

#[async_trait]
impl MessageSink for FailingSink {
    async fn send(&self, message: &GenericMessage) -> Result<(), SinkError> {
        Err(SinkError::send_failed(
            &self.error_message,
            send_context(message),
        ))
    }

    fn is_connected(&self) -> bool {
        false
    }

    async fn connect(&self) -> Result<(), SinkError> {
        Err(SinkError::connection_failed(&self.error_message))
    }

    async fn disconnect(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn metadata(&self) -> SinkMetadata {
        SinkMetadata {
            last_error: Some(self.error_message.clone()),
            ..SinkMetadata::new("failing-sink", "test-failing").with_state(ConnectionState::Failed)
        }
    }
}
