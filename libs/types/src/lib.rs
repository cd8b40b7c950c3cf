//! Types library for the trade statistics pipeline
//!
//! Every record that crosses a process boundary is defined here, so the feed
//! adapter, the stream processor and the hub agree on one schema per topic.
//!
//! # Modules
//! - `instrument`: static instrument registry
//! - `numeric`: decimal price parsing
//! - `trade`: normalized trade records (`raw-trades`)
//! - `sample`: enriched samples and statistics (`processed-trades`)
//! - `control`: instrument switch messages (`symbol-control`, `symbol-query`)
//! - `topic`: topic names and the topic/record binding
//! - `errors`: error taxonomy

pub mod control;
pub mod errors;
pub mod instrument;
pub mod numeric;
pub mod sample;
pub mod topic;
pub mod trade;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::control::*;
    pub use crate::errors::*;
    pub use crate::instrument::*;
    pub use crate::numeric::*;
    pub use crate::sample::*;
    pub use crate::topic::*;
    pub use crate::trade::*;
}
