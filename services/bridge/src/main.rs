//! Kayak bridge entry point

use anyhow::{Context, Result};
use bridge::cli::{build_sink, Args};
use bridge::logging::init_tracing;
use bridge::{Coordinator, CoordinatorSettings, LogStream};
use clap::Parser;
use kayak_config::SourceSettings;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[cfg(feature = "kafka")]
fn build_source(settings: &SourceSettings) -> Result<Arc<dyn LogStream>> {
    Ok(Arc::new(bridge::KafkaLogStream::new(settings)))
}

#[cfg(not(feature = "kafka"))]
fn build_source(_settings: &SourceSettings) -> Result<Arc<dyn LogStream>> {
    anyhow::bail!("kayak was built without the `kafka` feature; rebuild with --features kafka")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.resolve_config()?;
    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    info!("Starting kayak bridge");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        brokers = %config.source.brokers,
        topic = %config.source.topic,
        offset = %config.source.offset,
        sink = ?config.sink.kind,
        "configuration loaded"
    );

    let source = build_source(&config.source)?;
    let sink = build_sink(&config.sink, args.output)?;
    sink.connect().await.context("Failed to connect sink")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    cancel.cancel();
                }
                Err(e) => error!("Failed to listen for ctrl-c: {}", e),
            }
        }
    });

    let coordinator = Coordinator::new(source, Arc::clone(&sink), CoordinatorSettings::from(&config));
    let report = coordinator.run(cancel).await?;

    if let Err(e) = sink.disconnect().await {
        warn!("Sink disconnect failed: {}", e);
    }

    println!("{}", report);
    Ok(())
}
