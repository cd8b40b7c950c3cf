use std::sync::Arc;
use stream_processor::config::Config;
use stream_processor::{run, ProcessorMetrics};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!(bus = %config.bus_url, symbol = %config.symbol, "Starting stream processor");

    let bus = bus::connect(&config.bus_url, &config.bus_retry).await?;
    let metrics = Arc::new(ProcessorMetrics::default());

    tokio::select! {
        result = run(bus, &config.symbol, metrics) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
