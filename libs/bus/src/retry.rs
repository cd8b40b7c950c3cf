//! Startup connection with a fixed-delay retry budget
//!
//! Nothing in the pipeline can make progress without the bus, so callers
//! treat an exhausted budget as fatal.

use crate::{Bus, BusError, InMemoryBus, RedisBus};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(2),
        }
    }
}

/// Run `operation` until it succeeds or the attempt budget is spent.
pub async fn retry_fixed<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, BusError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BusError>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_error = err.to_string();
                if attempt < attempts {
                    warn!(
                        operation = operation_name,
                        attempt,
                        attempts,
                        error = %err,
                        "Connection failed, retrying in {:?}",
                        policy.delay
                    );
                    sleep(policy.delay).await;
                }
            }
        }
    }

    Err(BusError::Unreachable {
        attempts,
        last_error,
    })
}

/// Open the bus named by `url`.
///
/// - `memory://` gives an in-process bus (single-process deployments)
/// - `redis://` / `rediss://` connect to a redis server, retrying per `policy`
pub async fn connect(url: &str, policy: &RetryPolicy) -> Result<Arc<dyn Bus>, BusError> {
    if url.starts_with("memory://") {
        info!("Using in-process bus");
        return Ok(Arc::new(InMemoryBus::with_defaults()));
    }

    if url.starts_with("redis://") || url.starts_with("rediss://") {
        let bus = retry_fixed(policy, "bus connect", || RedisBus::connect(url)).await?;
        return Ok(Arc::new(bus));
    }

    Err(BusError::UnsupportedUrl(url.to_string()))
}
