//! Bridge Configuration Module
//!
//! Layered loading for the bridge: built-in defaults, then an optional TOML
//! file, then `KAYAK_`-prefixed environment variables. Command-line overrides
//! are applied by the binary on top of the loaded value.

use crate::service;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Main bridge configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct BridgeConfig {
    /// Upstream log stream
    pub source: SourceSettings,

    /// Downstream document index
    pub sink: SinkSettings,

    /// Consumption engine tuning
    pub pipeline: PipelineSettings,
}

/// Where consumption starts in each partition
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OffsetPolicy {
    /// Oldest retained record
    #[default]
    Earliest,
    /// Only records produced after startup
    Newest,
}

impl FromStr for OffsetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "earliest" | "oldest" => Ok(OffsetPolicy::Earliest),
            "newest" | "latest" => Ok(OffsetPolicy::Newest),
            other => Err(format!("unknown offset policy '{}': expected earliest or newest", other)),
        }
    }
}

impl fmt::Display for OffsetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffsetPolicy::Earliest => f.write_str("earliest"),
            OffsetPolicy::Newest => f.write_str("newest"),
        }
    }
}

/// Sink implementation selector
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Elasticsearch,
    Stdout,
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "elasticsearch" | "es" => Ok(SinkKind::Elasticsearch),
            "stdout" => Ok(SinkKind::Stdout),
            other => Err(format!("unknown sink '{}': expected elasticsearch or stdout", other)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SourceSettings {
    pub brokers: String,
    pub topic: String,
    pub offset: OffsetPolicy,
    pub group_id: String,
    pub session_timeout_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            brokers: service::source::BROKERS.to_string(),
            topic: service::source::TOPIC.to_string(),
            offset: OffsetPolicy::default(),
            group_id: service::source::GROUP_ID.to_string(),
            session_timeout_ms: service::source::SESSION_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SinkSettings {
    pub kind: SinkKind,
    pub url: String,
    pub index: String,
    pub request_timeout_ms: u64,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            url: service::sink::URL.to_string(),
            index: service::sink::INDEX.to_string(),
            request_timeout_ms: service::sink::REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub channel_capacity: usize,
    pub max_decompressed_bytes: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            channel_capacity: service::pipeline::CHANNEL_CAPACITY,
            max_decompressed_bytes: service::pipeline::MAX_DECOMPRESSED_BYTES,
        }
    }
}

impl BridgeConfig {
    /// Load configuration with `KAYAK_` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, service::ENV_PREFIX)
    }

    /// Load configuration with a custom environment prefix
    ///
    /// Nested keys use a double underscore: `<PREFIX>_SOURCE__TOPIC`. The
    /// result is not validated; callers layer their own overrides first and
    /// then call [`BridgeConfig::validate`].
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let defaults =
            Config::try_from(&BridgeConfig::default()).context("Failed to encode defaults")?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            info!("Loading bridge config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: BridgeConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.expand_env_vars()?;
        debug!(?config, "bridge configuration loaded");
        Ok(config)
    }

    /// Expand `$VAR` / `${VAR}` references in endpoint strings
    pub fn expand_env_vars(&mut self) -> Result<()> {
        self.source.brokers = shellexpand::env(&self.source.brokers)
            .context("Failed to expand broker list")?
            .into_owned();
        self.sink.url = shellexpand::env(&self.sink.url)
            .context("Failed to expand sink URL")?
            .into_owned();
        Ok(())
    }

    /// Reject configurations the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.source.brokers.trim().is_empty() {
            bail!("source.brokers must not be empty");
        }
        if self.source.topic.trim().is_empty() {
            bail!("source.topic must not be empty");
        }
        if self.pipeline.channel_capacity == 0 {
            bail!("pipeline.channel_capacity must be at least 1");
        }
        if self.sink.kind == SinkKind::Elasticsearch {
            if self.sink.url.trim().is_empty() {
                bail!("sink.url is required for the elasticsearch sink");
            }
            if self.sink.index.trim().is_empty() {
                bail!("sink.index is required for the elasticsearch sink");
            }
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}
