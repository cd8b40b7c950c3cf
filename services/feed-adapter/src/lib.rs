//! Feed Adapter
//!
//! Bridges an unreliable venue trade feed onto the `raw-trades` topic and
//! follows `symbol-control` to know which instrument to stream.

pub mod adapter;
pub mod binance;
pub mod config;
pub mod connector;
pub mod error;

pub use adapter::{follow_control, watch_target, AdapterSettings, FeedAdapter, FeedMetrics};
pub use connector::{FeedConnector, FeedStream, WsConnector};
pub use error::FeedError;
