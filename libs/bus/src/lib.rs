//! Publish/subscribe contract for the pipeline
//!
//! Three processes talk over four topics:
//!
//! ```text
//! feed-adapter ──raw-trades──▶ stream-processor ──processed-trades──▶ hub
//! hub ──symbol-control──▶ feed-adapter, stream-processor
//! feed-adapter, stream-processor ──symbol-query──▶ hub
//! ```
//!
//! A process that starts after the hub asks on `symbol-query` and the hub
//! repeats its current `symbol-control` decision.
//!
//! The transport is abstracted behind [`Bus`]. Delivery is at-least-once at
//! best and ordered per producer; consumers must tolerate duplicates.
//! [`InMemoryBus`] serves single-process setups and tests, [`RedisBus`]
//! connects separate processes.

pub mod error;
pub mod memory;
pub mod redis_bus;
pub mod retry;
pub mod typed;

use async_trait::async_trait;
use futures::stream::BoxStream;
use types::topic::Topic;

pub use error::BusError;
pub use memory::InMemoryBus;
pub use redis_bus::RedisBus;
pub use retry::{connect, RetryPolicy};
pub use typed::{publish, subscribe};

/// Raw payload stream for one topic subscription.
pub type Subscription = BoxStream<'static, Vec<u8>>;

/// Topic based publish/subscribe transport.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publish one payload. Publishing to a topic nobody listens on succeeds.
    async fn publish(&self, topic: Topic, payload: Vec<u8>) -> Result<(), BusError>;

    /// Open a subscription that yields every payload published after it was
    /// opened, in per-producer order.
    async fn subscribe(&self, topic: Topic) -> Result<Subscription, BusError>;
}
