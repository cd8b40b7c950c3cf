//! Bus topics and the record type bound to each
//!
//! Every topic carries exactly one schema. Consumers decode straight into
//! the concrete record type for the topic they subscribed to.

use crate::control::{SymbolControl, SymbolQuery};
use crate::sample::ProcessedSample;
use crate::trade::Trade;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// Normalized trades from the feed adapter
    RawTrades,
    /// Enriched samples from the stream processor
    ProcessedTrades,
    /// Instrument switch requests from the hub
    SymbolControl,
    /// Requests for the hub to repeat the current instrument
    SymbolQuery,
}

impl Topic {
    /// Topic name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::RawTrades => "raw-trades",
            Topic::ProcessedTrades => "processed-trades",
            Topic::SymbolControl => "symbol-control",
            Topic::SymbolQuery => "symbol-query",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binds a record type to the single topic that carries it.
pub trait TopicMessage: Serialize + DeserializeOwned + Send + 'static {
    const TOPIC: Topic;
}

impl TopicMessage for Trade {
    const TOPIC: Topic = Topic::RawTrades;
}

impl TopicMessage for ProcessedSample {
    const TOPIC: Topic = Topic::ProcessedTrades;
}

impl TopicMessage for SymbolControl {
    const TOPIC: Topic = Topic::SymbolControl;
}

impl TopicMessage for SymbolQuery {
    const TOPIC: Topic = Topic::SymbolQuery;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_names() {
        assert_eq!(Topic::RawTrades.as_str(), "raw-trades");
        assert_eq!(Topic::ProcessedTrades.as_str(), "processed-trades");
        assert_eq!(Topic::SymbolControl.as_str(), "symbol-control");
        assert_eq!(Topic::SymbolQuery.to_string(), "symbol-query");
    }

    #[test]
    fn test_record_topic_binding() {
        assert_eq!(<Trade as TopicMessage>::TOPIC, Topic::RawTrades);
        assert_eq!(<ProcessedSample as TopicMessage>::TOPIC, Topic::ProcessedTrades);
        assert_eq!(<SymbolControl as TopicMessage>::TOPIC, Topic::SymbolControl);
        assert_eq!(<SymbolQuery as TopicMessage>::TOPIC, Topic::SymbolQuery);
    }
}
