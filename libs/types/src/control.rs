//! Instrument switch control messages
//!
//! `symbol-control` carries the hub's decisions, `symbol-query` lets a
//! component that just started ask the hub to repeat the current one.

use serde::{Deserialize, Serialize};

/// Request for every downstream component to converge on `symbol`.
///
/// `epoch` numbers the hub's switches. A re-announcement of the current
/// instrument repeats the epoch of the switch it describes, which lets a
/// consumer tell it apart from a fresh switch to the same instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolControl {
    pub symbol: String,
    #[serde(default)]
    pub epoch: u64,
}

impl SymbolControl {
    pub fn new(symbol: impl Into<String>, epoch: u64) -> Self {
        Self {
            symbol: symbol.into(),
            epoch,
        }
    }
}

/// Ask the hub to re-announce the current instrument on `symbol-control`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolQuery {
    /// Component name, for logs only
    pub requester: String,
}

impl SymbolQuery {
    pub fn new(requester: impl Into<String>) -> Self {
        Self {
            requester: requester.into(),
        }
    }
}
