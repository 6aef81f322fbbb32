/// Context information for a failed delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendContext {
    /// Document id the sink tried to write
    pub document_id: String,
    /// Stream position the message came from (`partition-offset`)
    pub origin: String,
}

impl SendContext {
    pub fn new(document_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            origin: origin.into(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Sink not connected")]
    NotConnected,

    #[error("Send failed: {error} (id: {id}, origin: {origin})",
            id = context.document_id,
            origin = context.origin)]
    SendFailed { error: String, context: SendContext },

    #[error("Rejected with status {status}: {message} (id: {id})", id = context.document_id)]
    Rejected {
        status: u16,
        message: String,
        context: SendContext,
    },

    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl SinkError {
    /// Check if retrying the same request could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            SinkError::Timeout(_) | SinkError::NotConnected => true,
            SinkError::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if this is a connection-related error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            SinkError::ConnectionFailed(_) | SinkError::NotConnected
        )
    }

    pub fn connection_failed(msg: impl Into<String>) -> Self {
        SinkError::ConnectionFailed(msg.into())
    }

    pub fn send_failed(msg: impl Into<String>, context: SendContext) -> Self {
        SinkError::SendFailed {
            error: msg.into(),
            context,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SinkError::InvalidConfig(msg.into())
    }

    /// Short label used in logs and counters
    pub fn kind(&self) -> &'static str {
        match self {
            SinkError::ConnectionFailed(_) => "connection_failed",
            SinkError::NotConnected => "not_connected",
            SinkError::SendFailed { .. } => "send_failed",
            SinkError::Rejected { .. } => "rejected",
            SinkError::Timeout(_) => "timeout",
            SinkError::InvalidConfig(_) => "invalid_config",
            SinkError::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err.to_string())
    }
}
