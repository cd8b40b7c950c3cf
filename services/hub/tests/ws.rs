//! Live push surface over real sockets

use bus::{Bus, InMemoryBus};
use futures::StreamExt;
use hub::router::create_router;
use hub::state::{AppState, HubSettings};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use types::sample::ProcessedSample;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve_hub() -> (AppState, Arc<InMemoryBus>, SocketAddr) {
    let bus = Arc::new(InMemoryBus::with_defaults());
    let dyn_bus: Arc<dyn Bus> = bus.clone();
    let (state, _tasks) = hub::start(dyn_bus, None, "btcusdt", HubSettings::default())
        .await
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, bus, addr)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}

async fn next_update(client: &mut Client) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {other:?}"),
            }
        }
    })
    .await
    .expect("no price update")
}

fn sample(price: f64) -> ProcessedSample {
    ProcessedSample {
        symbol: "btcusdt".to_string(),
        price,
        moving_average: price,
        high: price,
        low: price,
        time: 1,
    }
}

#[tokio::test]
async fn test_price_updates_reach_every_open_socket() {
    let (state, bus, addr) = serve_hub().await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;
    wait_for(|| state.registry.len() == 2).await;

    bus::publish(bus.as_ref(), &sample(43250.5)).await.unwrap();

    assert_eq!(next_update(&mut first).await, json!({ "price": 43250.5 }));
    assert_eq!(next_update(&mut second).await, json!({ "price": 43250.5 }));
}

#[tokio::test]
async fn test_client_close_deregisters_only_that_client() {
    let (state, bus, addr) = serve_hub().await;
    let mut staying = connect(addr).await;
    let mut also_staying = connect(addr).await;
    let mut leaving = connect(addr).await;
    wait_for(|| state.registry.len() == 3).await;

    leaving.close(None).await.unwrap();
    wait_for(|| state.registry.len() == 2).await;
    assert_eq!(state.metrics.subscribers_disconnected.load(Ordering::Relaxed), 1);
    assert_eq!(state.metrics.subscribers_dropped.load(Ordering::Relaxed), 0);

    bus::publish(bus.as_ref(), &sample(101.0)).await.unwrap();
    assert_eq!(next_update(&mut staying).await, json!({ "price": 101.0 }));
    assert_eq!(next_update(&mut also_staying).await, json!({ "price": 101.0 }));
}

#[tokio::test]
async fn test_vanished_client_is_deregistered() {
    let (state, bus, addr) = serve_hub().await;
    let mut staying = connect(addr).await;
    let vanishing = connect(addr).await;
    wait_for(|| state.registry.len() == 2).await;

    // No close handshake, the connection just goes away.
    drop(vanishing);
    wait_for(|| state.registry.len() == 1).await;

    bus::publish(bus.as_ref(), &sample(99.5)).await.unwrap();
    assert_eq!(next_update(&mut staying).await, json!({ "price": 99.5 }));
}
