//! Service defaults
//!
//! Default values used when neither a config file, the environment nor the
//! command line sets a value.

/// Upstream log-stream defaults
pub mod source {
    /// Broker address list
    pub const BROKERS: &str = "localhost:9092";

    /// Topic carrying wok frames
    pub const TOPIC: &str = "bots_events";

    /// Consumer group id reported to the brokers
    pub const GROUP_ID: &str = "kayak";

    /// Broker session timeout (milliseconds)
    pub const SESSION_TIMEOUT_MS: u64 = 6_000;
}

/// Document index sink defaults
pub mod sink {
    /// Index service base URL
    pub const URL: &str = "http://localhost:9200";

    /// Index receiving normalized messages
    pub const INDEX: &str = "wok_messages";

    /// Per-request timeout (milliseconds)
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
}

/// Pipeline defaults
pub mod pipeline {
    /// Aggregation channel capacity; 1 is the closest to a synchronous handoff
    pub const CHANNEL_CAPACITY: usize = 1;

    /// Upper bound on an inflated message body (64MB)
    pub const MAX_DECOMPRESSED_BYTES: usize = 64 * 1024 * 1024;
}

/// Prefix for environment overrides (`KAYAK_SOURCE__TOPIC`, ...)
pub const ENV_PREFIX: &str = "KAYAK";
