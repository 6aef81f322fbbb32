//! Concrete MessageSink implementations
//!
//! - **ElasticsearchSink**: one indexed document per message over HTTP
//! - **StdoutSink**: human-readable or JSON lines on standard output

pub mod elasticsearch;
pub mod stdout;

pub use elasticsearch::ElasticsearchSink;
pub use stdout::{StdoutFormat, StdoutSink};
