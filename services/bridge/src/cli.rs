//! Command-line surface of the `kayak` binary
//!
//! Flags override whatever the config file and `KAYAK_*` environment
//! variables set.

use crate::logging::LogFormat;
use anyhow::{Context, Result};
use clap::Parser;
use kayak_config::{BridgeConfig, OffsetPolicy, SinkKind, SinkSettings};
use message_sink::sinks::StdoutFormat;
use message_sink::{ElasticsearchSink, MessageSink, StdoutSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "kayak", author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Broker address list [default: localhost:9092]
    #[arg(short, long)]
    pub brokers: Option<String>,

    /// Topic to consume [default: bots_events]
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Start position in every partition: earliest or newest
    #[arg(long)]
    pub offset: Option<OffsetPolicy>,

    /// Sink kind: elasticsearch or stdout
    #[arg(long)]
    pub sink: Option<SinkKind>,

    /// Elasticsearch base URL
    #[arg(long)]
    pub sink_url: Option<String>,

    /// Elasticsearch index name
    #[arg(long)]
    pub index: Option<String>,

    /// Layout of messages written by the stdout sink: pretty or json
    #[arg(long, default_value = "pretty")]
    pub output: StdoutFormat,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Apply flag overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(brokers) = &self.brokers {
            config.source.brokers = brokers.clone();
        }
        if let Some(topic) = &self.topic {
            config.source.topic = topic.clone();
        }
        if let Some(offset) = self.offset {
            config.source.offset = offset;
        }
        if let Some(kind) = self.sink {
            config.sink.kind = kind;
        }
        if let Some(url) = &self.sink_url {
            config.sink.url = url.clone();
        }
        if let Some(index) = &self.index {
            config.sink.index = index.clone();
        }
    }

    /// Load file and environment layers, then apply the flags
    pub fn resolve_config(&self) -> Result<BridgeConfig> {
        let mut config = BridgeConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        config
            .validate()
            .context("Invalid configuration after command-line overrides")?;
        Ok(config)
    }
}

/// Construct the configured sink (not yet connected)
pub fn build_sink(settings: &SinkSettings, output: StdoutFormat) -> Result<Arc<dyn MessageSink>> {
    let sink: Arc<dyn MessageSink> = match settings.kind {
        SinkKind::Elasticsearch => Arc::new(
            ElasticsearchSink::new(
                &settings.url,
                settings.index.clone(),
                Duration::from_millis(settings.request_timeout_ms),
            )
            .context("Failed to create Elasticsearch sink")?,
        ),
        SinkKind::Stdout => Arc::new(StdoutSink::new(output)),
    };
    Ok(sink)
}
