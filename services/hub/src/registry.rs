//! Live push subscribers
//!
//! Every subscriber owns a bounded outbound queue drained by its own
//! connection task. Broadcast only enqueues: it snapshots the handles, then
//! `try_send`s each one without holding any map lock. A subscriber whose
//! queue is full or closed is deregistered; nobody else is affected.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

pub type SubscriberId = u64;

#[derive(Debug, Clone)]
struct Subscriber {
    tx: mpsc::Sender<String>,
    joined_at: DateTime<Utc>,
}

/// Result of one broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: Vec<SubscriberId>,
}

#[derive(Debug)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Subscriber>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl SubscriberRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Add a subscriber; the receiver is its outbound queue.
    pub fn register(&self) -> (SubscriberId, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.subscribers.insert(
            id,
            Subscriber {
                tx,
                joined_at: Utc::now(),
            },
        );
        debug!(subscriber_id = id, "Subscriber registered");
        (id, rx)
    }

    pub fn deregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber_id = id, "Subscriber deregistered");
        }
        removed
    }

    pub fn joined_at(&self, id: SubscriberId) -> Option<DateTime<Utc>> {
        self.subscribers.get(&id).map(|s| s.joined_at)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn broadcast(&self, payload: &str) -> BroadcastReport {
        let targets: Vec<(SubscriberId, mpsc::Sender<String>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().tx.clone()))
            .collect();

        let mut report = BroadcastReport::default();
        for (id, tx) in targets {
            match tx.try_send(payload.to_owned()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber_id = id, "Subscriber lagging, disconnecting");
                    self.deregister(id);
                    report.dropped.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    self.deregister(id);
                    report.dropped.push(id);
                }
            }
        }
        report
    }
}
