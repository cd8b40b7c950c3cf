//! Typed publish/subscribe on top of the raw byte transport
//!
//! Payloads are JSON. Each record type is bound to one topic through
//! `TopicMessage`, so a subscriber always decodes into one concrete type.

use crate::{Bus, BusError};
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::debug;
use types::topic::TopicMessage;

/// Serialize `message` and publish it on its topic.
pub async fn publish<M: TopicMessage>(bus: &dyn Bus, message: &M) -> Result<(), BusError> {
    let payload = serde_json::to_vec(message)?;
    bus.publish(M::TOPIC, payload).await
}

/// Subscribe to `M`'s topic, yielding each payload's decode result.
pub async fn subscribe_decoded<M: TopicMessage>(
    bus: &dyn Bus,
) -> Result<BoxStream<'static, Result<M, serde_json::Error>>, BusError> {
    let raw = bus.subscribe(M::TOPIC).await?;
    Ok(raw
        .map(|payload| serde_json::from_slice::<M>(&payload))
        .boxed())
}

/// Subscribe to `M`'s topic. Undecodable payloads are dropped.
pub async fn subscribe<M: TopicMessage>(bus: &dyn Bus) -> Result<BoxStream<'static, M>, BusError> {
    let decoded = subscribe_decoded::<M>(bus).await?;
    Ok(decoded
        .filter_map(|result| async move {
            match result {
                Ok(message) => Some(message),
                Err(err) => {
                    debug!(topic = %M::TOPIC, error = %err, "Dropping undecodable payload");
                    None
                }
            }
        })
        .boxed())
}
