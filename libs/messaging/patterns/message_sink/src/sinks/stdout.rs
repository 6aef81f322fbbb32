//! Console sink
//!
//! Writes every message to standard output (or any injected writer), either
//! in the console layout of [`GenericMessage`]'s `Display` impl or as one
//! JSON object per line.

use crate::{ConnectionState, MessageSink, SendCounters, SinkError, SinkMetadata};
use async_trait::async_trait;
use codec::GenericMessage;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdoutFormat {
    /// Multi-line console layout
    #[default]
    Pretty,
    /// One JSON document per line
    Json,
}

impl FromStr for StdoutFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(StdoutFormat::Pretty),
            "json" => Ok(StdoutFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

pub struct StdoutSink {
    writer: Mutex<Box<dyn Write + Send>>,
    format: StdoutFormat,
    connected: AtomicBool,
    counters: SendCounters,
}

impl fmt::Debug for StdoutSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdoutSink")
            .field("format", &self.format)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl StdoutSink {
    pub fn new(format: StdoutFormat) -> Self {
        Self::with_writer(std::io::stdout(), format)
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W, format: StdoutFormat) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            format,
            connected: AtomicBool::new(false),
            counters: SendCounters::default(),
        }
    }

    fn render(&self, message: &GenericMessage) -> Result<String, SinkError> {
        match self.format {
            StdoutFormat::Pretty => Ok(message.to_string()),
            StdoutFormat::Json => serde_json::to_string(message)
                .map_err(|e| SinkError::send_failed(e.to_string(), crate::send_context(message))),
        }
    }

    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Io("stdout writer poisoned".to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl MessageSink for StdoutSink {
    async fn send(&self, message: &GenericMessage) -> Result<(), SinkError> {
        let result = self
            .render(message)
            .and_then(|line| self.write_line(&line));
        match &result {
            Ok(()) => self.counters.record_success(),
            Err(err) => self.counters.record_failure(err),
        }
        result
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
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Io("stdout writer poisoned".to_string()))?;
        writer.flush()?;
        Ok(())
    }

    fn metadata(&self) -> SinkMetadata {
        let state = if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        self.counters
            .fill(SinkMetadata::new("stdout", "stdout").with_state(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_message;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn test_pretty_output() {
        let buffer = SharedBuffer::default();
        let sink = StdoutSink::with_writer(buffer.clone(), StdoutFormat::Pretty);
        sink.connect().await.unwrap();

        sink.send(&sample_message("u-7", "hello")).await.unwrap();

        let out = buffer.contents();
        assert!(out.contains("UUID : u-7"));
        assert!(out.ends_with("Body : hello\n"));
        assert_eq!(sink.metadata().messages_sent, 1);
    }

    #[tokio::test]
    async fn test_json_lines_output() {
        let buffer = SharedBuffer::default();
        let sink = StdoutSink::with_writer(buffer.clone(), StdoutFormat::Json);

        sink.send(&sample_message("a", "one")).await.unwrap();
        sink.send(&sample_message("b", "two")).await.unwrap();

        let out = buffer.contents();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], "a");
        assert_eq!(lines[1]["body"], "two");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<StdoutFormat>().unwrap(), StdoutFormat::Json);
        assert!("yaml".parse::<StdoutFormat>().is_err());
    }
}
