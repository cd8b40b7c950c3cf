use crate::metrics::HubMetrics;
use crate::registry::SubscriberId;
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use chrono::Utc;
use futures::SinkExt;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Why a subscriber's pump stopped.
#[derive(Debug, PartialEq, Eq)]
enum PumpEnd {
    /// The client closed the socket.
    ClientClosed,
    /// The registry already removed the subscriber (queue full).
    Evicted,
    /// Reading or writing the socket failed.
    Failed,
}

/// One push subscriber: forward its queue to the socket until either side
/// goes away. Inbound frames other than close are ignored.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, outbound) = state.registry.register();
    info!(subscriber_id = id, subscribers = state.registry.len(), "Subscriber connected");

    let end = pump(socket, outbound, id).await;
    let connected_secs = state
        .registry
        .joined_at(id)
        .map(|joined| (Utc::now() - joined).num_seconds());

    // Evicted subscribers were counted when the broadcast removed them.
    if state.registry.deregister(id) {
        let counter = match end {
            PumpEnd::ClientClosed => &state.metrics.subscribers_disconnected,
            PumpEnd::Evicted | PumpEnd::Failed => &state.metrics.subscribers_dropped,
        };
        HubMetrics::incr(counter);
    }
    info!(
        subscriber_id = id,
        reason = ?end,
        connected_secs,
        subscribers = state.registry.len(),
        "Subscriber disconnected"
    );
}

async fn pump(socket: WebSocket, mut outbound: mpsc::Receiver<String>, id: SubscriberId) -> PumpEnd {
    let (mut sink, mut inbound) = socket.split();

    loop {
        tokio::select! {
            queued = outbound.recv() => {
                let Some(payload) = queued else {
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpEnd::Evicted;
                };
                if let Err(err) = sink.send(Message::Text(payload.into())).await {
                    debug!(subscriber_id = id, error = %err, "Write failed");
                    return PumpEnd::Failed;
                }
            }

            frame = inbound.next() => match frame {
                None | Some(Ok(Message::Close(_))) => return PumpEnd::ClientClosed,
                Some(Err(err)) => {
                    debug!(subscriber_id = id, error = %err, "Read failed");
                    return PumpEnd::Failed;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}
