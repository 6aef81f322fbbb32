//! # Kayak Configuration
//!
//! Defaults and layered loading for the kayak bridge.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kayak_config::BridgeConfig;
//!
//! let config = BridgeConfig::load(None).expect("configuration loads");
//! config.validate().expect("valid configuration");
//! println!("consuming {} from {}", config.source.topic, config.source.brokers);
//! ```

pub mod bridge_config;
pub mod service;

pub use bridge_config::{
    BridgeConfig, OffsetPolicy, PipelineSettings, SinkKind, SinkSettings, SourceSettings,
};
