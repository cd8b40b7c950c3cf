use feed_adapter::config::Config;
use feed_adapter::{watch_target, FeedAdapter, WsConnector};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        bus = %config.bus_url,
        feed = %config.feed_url,
        symbol = %config.symbol,
        "Starting feed adapter"
    );

    let bus = bus::connect(&config.bus_url, &config.bus_retry).await?;
    let (target_rx, control_task) = watch_target(bus.clone(), &config.symbol).await?;

    let adapter = FeedAdapter::new(WsConnector::new(config.feed_url), bus, config.adapter);

    tokio::select! {
        _ = adapter.run(target_rx) => {}
        joined = control_task => joined??,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
