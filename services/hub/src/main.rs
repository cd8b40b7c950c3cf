use hub::config::Config;
use hub::router::create_router;
use persistence::journal::JournalConfig;
use persistence::{JournalStore, TradeStore};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!(bus = %config.bus_url, instrument = %config.instrument, "Starting hub");

    let bus = bus::connect(&config.bus_url, &config.bus_retry).await?;

    let store: Option<Arc<dyn TradeStore>> = match &config.journal_dir {
        Some(dir) => match JournalStore::open(JournalConfig::new(dir)) {
            Ok(store) => {
                tracing::info!(dir = %dir.display(), "History journal opened");
                Some(Arc::new(store) as Arc<dyn TradeStore>)
            }
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "History storage unavailable");
                None
            }
        },
        None => {
            tracing::warn!("JOURNAL_DIR not set, history storage unavailable");
            None
        }
    };

    let (state, tasks) = hub::start(bus, store, &config.instrument.symbol, config.settings).await?;
    let app = create_router(state);

    let listener = TcpListener::bind(config.addr).await?;
    tracing::info!("Listening on {}", config.addr);

    tokio::select! {
        served = axum::serve(listener, app).into_future() => served?,
        joined = tasks.consumer => joined??,
        joined = tasks.query_responder => joined??,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
