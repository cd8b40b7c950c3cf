//! Redis pub/sub transport
//!
//! Publishing shares one auto-reconnecting connection manager. Each
//! subscription owns a dedicated pub/sub connection, so one slow consumer
//! never holds up another.

use crate::{Bus, BusError, Subscription};
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};
use types::topic::Topic;

pub struct RedisBus {
    client: redis::Client,
    publisher: ConnectionManager,
}

impl RedisBus {
    /// Open the publishing connection. Fails if the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = redis::Client::open(url)?;
        let publisher = client.get_connection_manager().await?;
        info!(url, "Connected to redis bus");
        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, topic: Topic, payload: Vec<u8>) -> Result<(), BusError> {
        let mut conn = self.publisher.clone();
        let receivers: i64 = conn.publish(topic.as_str(), payload).await?;
        debug!(topic = %topic, receivers, "Published");
        Ok(())
    }

    async fn subscribe(&self, topic: Topic) -> Result<Subscription, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(topic.as_str()).await?;
        debug!(topic = %topic, "Subscribed");

        let stream = pubsub
            .into_on_message()
            .map(|msg| msg.get_payload_bytes().to_vec());
        Ok(stream.boxed())
    }
}
