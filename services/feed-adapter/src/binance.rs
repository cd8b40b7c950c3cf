//! Binance trade stream events
//!
//! ```text
//! {"e":"trade","E":1708123456790,"s":"BTCUSDT","t":12345,"p":"43250.12000000",
//!  "q":"0.00100000","T":1708123456789,"m":true,"M":true}
//! ```
//!
//! Only `p` (decimal price string) and `T` (trade time, epoch millis) are
//! required. Other frames on the stream, such as subscription replies, fail
//! to decode and are dropped by the caller.

use crate::error::FeedError;
use serde::Deserialize;
use types::numeric::parse_decimal_price;
use types::trade::Trade;

#[derive(Debug, Deserialize)]
struct TradeEvent {
    #[serde(rename = "e")]
    event_type: Option<String>,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Decode one venue frame into a `Trade` for `symbol`.
///
/// The trade is tagged with the adapter's subscription target rather than
/// the venue's upper-case `s` field, so downstream comparisons see the same
/// form the hub publishes.
pub fn parse_trade(payload: &str, symbol: &str) -> Result<Trade, FeedError> {
    let event: TradeEvent =
        serde_json::from_str(payload).map_err(|e| FeedError::Malformed(e.to_string()))?;

    if let Some(kind) = event.event_type.as_deref() {
        if kind != "trade" {
            return Err(FeedError::Malformed(format!("unexpected event type {kind:?}")));
        }
    }

    let price = parse_decimal_price(&event.price)?;
    Ok(Trade::new(symbol, price, event.trade_time))
}
