//! Trade history storage
//!
//! The hub writes one record per processed sample and reads recent history
//! back for its query surface. Storage is a side path: when it is missing or
//! failing, the live pipeline keeps running and history queries report the
//! store as unavailable.
//!
//! # Layout
//! - `journal`: append-only writer with CRC32C framed entries and rotation
//! - `reader`: checksum-validating reader that skips corrupt regions
//! - `store`: the async `TradeStore` contract and its journal backed impl

pub mod journal;
pub mod reader;
pub mod store;

pub use store::{JournalStore, StoreError, TradeRecord, TradeStore, WindowStats};
