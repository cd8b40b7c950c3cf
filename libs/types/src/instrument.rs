//! Static instrument registry
//!
//! The set of selectable instruments is fixed at build time. Order matters:
//! the list endpoint returns entries in registry order.

use crate::errors::InstrumentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registry entry: venue symbol plus a human readable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentRegistryEntry {
    pub symbol: &'static str,
    pub display_name: &'static str,
}

/// Selectable instruments, in display order.
pub const INSTRUMENTS: &[InstrumentRegistryEntry] = &[
    InstrumentRegistryEntry { symbol: "btcusdt", display_name: "Bitcoin (BTC)" },
    InstrumentRegistryEntry { symbol: "ethusdt", display_name: "Ethereum (ETH)" },
    InstrumentRegistryEntry { symbol: "solusdt", display_name: "Solana (SOL)" },
    InstrumentRegistryEntry { symbol: "bnbusdt", display_name: "Binance Coin (BNB)" },
    InstrumentRegistryEntry { symbol: "xrpusdt", display_name: "Ripple (XRP)" },
    InstrumentRegistryEntry { symbol: "dogeusdt", display_name: "Dogecoin (DOGE)" },
];

/// Owned instrument value, as served to clients and held by the hub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
}

impl From<&InstrumentRegistryEntry> for Instrument {
    fn from(entry: &InstrumentRegistryEntry) -> Self {
        Self {
            symbol: entry.symbol.to_string(),
            name: entry.display_name.to_string(),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.symbol)
    }
}

/// Normalize a user supplied symbol to registry form (trimmed, lower-case).
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_lowercase()
}

/// Resolve a symbol against the registry.
///
/// Matching is case-insensitive; the returned instrument carries the
/// canonical lower-case symbol.
pub fn lookup(symbol: &str) -> Result<Instrument, InstrumentError> {
    let wanted = normalize_symbol(symbol);
    INSTRUMENTS
        .iter()
        .find(|entry| entry.symbol == wanted)
        .map(Instrument::from)
        .ok_or(InstrumentError::UnknownSymbol {
            symbol: symbol.to_string(),
        })
}

/// All selectable instruments in registry order.
pub fn list() -> Vec<Instrument> {
    INSTRUMENTS.iter().map(Instrument::from).collect()
}
