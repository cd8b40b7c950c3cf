//! In-process bus backed by one `tokio::sync::broadcast` channel per topic
//!
//! Ordering is per-channel FIFO, which gives per-producer ordering to every
//! subscriber. A subscriber that falls more than `capacity` messages behind
//! loses the overflow and keeps going.

use crate::{Bus, BusError, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use types::topic::Topic;

pub const DEFAULT_CAPACITY: usize = 10_000;

pub struct InMemoryBus {
    channels: DashMap<Topic, broadcast::Sender<Vec<u8>>>,
    capacity: usize,
}

impl InMemoryBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Number of open subscriptions on a topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.channels
            .get(&topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    fn sender(&self, topic: Topic) -> broadcast::Sender<Vec<u8>> {
        self.channels
            .entry(topic)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .value()
            .clone()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl Bus for InMemoryBus {
    async fn publish(&self, topic: Topic, payload: Vec<u8>) -> Result<(), BusError> {
        match self.sender(topic).send(payload) {
            Ok(receivers) => debug!(topic = %topic, receivers, "Published"),
            Err(_) => debug!(topic = %topic, "Published with no subscribers"),
        }
        Ok(())
    }

    async fn subscribe(&self, topic: Topic) -> Result<Subscription, BusError> {
        let rx = self.sender(topic).subscribe();
        Ok(receiver_stream(topic, rx))
    }
}

fn receiver_stream(topic: Topic, rx: broadcast::Receiver<Vec<u8>>) -> Subscription {
    futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(payload) => return Some((payload, rx)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic = %topic, skipped, "Subscriber lagged, messages lost");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}
