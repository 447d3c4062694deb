//! Ticker message parsing.
//!
//! Parses raw exchange stream frames into typed [`PriceUpdate`]s. Two frame
//! shapes are accepted:
//! 1. Raw stream format: the event object itself (`{"e": "24hrTicker", ...}`)
//! 2. Combined stream format: `{"stream": "...", "data": {event}}`
//!
//! Subscription acknowledgements (`{"result": null, "id": n}`) and frames
//! without an event tag yield `None`.

use bridge_core::{PriceUpdate, TickerEventType};
use serde::Deserialize;
use tracing::debug;

use crate::error::{FeedError, FeedResult};

/// Raw ticker event as sent by the exchange.
///
/// Both the full `24hrTicker` and the partial `24hrMiniTicker` carry the
/// fields we need; everything else in the payload is ignored.
#[derive(Debug, Deserialize)]
struct RawTickerEvent {
    /// Event type tag.
    #[serde(rename = "e")]
    event_type: String,
    /// Event time in milliseconds.
    #[serde(rename = "E")]
    event_time_ms: u64,
    /// Symbol.
    #[serde(rename = "s")]
    symbol: String,
    /// Current-day close price (decimal string).
    #[serde(rename = "c")]
    cur_day_close: String,
}

/// Combined stream envelope.
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[allow(dead_code)]
    stream: String,
    data: serde_json::Value,
}

/// Parse one inbound text frame into a price update.
///
/// Returns `Ok(None)` for frames that are not ticker events (subscription
/// acks, unrelated channels). Malformed ticker payloads are a `Parse` error;
/// the caller decides whether to skip or abort.
pub fn parse_ticker_message(text: &str) -> FeedResult<Option<PriceUpdate>> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    // Unwrap combined-stream envelopes first.
    let event = if value.get("stream").is_some() {
        let envelope: StreamEnvelope = serde_json::from_value(value)?;
        envelope.data
    } else {
        value
    };

    if event.get("e").is_none() {
        debug!("Ignoring non-event frame");
        return Ok(None);
    }

    let raw: RawTickerEvent = serde_json::from_value(event)
        .map_err(|e| FeedError::Parse(format!("malformed ticker event: {e}")))?;

    Ok(Some(PriceUpdate {
        symbol: raw.symbol,
        event_type: TickerEventType::from_tag(&raw.event_type),
        close_price: raw.cur_day_close,
        observed_at_ms: raw.event_time_ms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_ticker() {
        let text = r#"{
            "e": "24hrTicker",
            "E": 1672515782136,
            "s": "BTCUSDT",
            "p": "120.50",
            "c": "50000.1234",
            "o": "49879.62",
            "v": "12345.6"
        }"#;

        let update = parse_ticker_message(text).unwrap().unwrap();
        assert_eq!(update.symbol, "BTCUSDT");
        assert_eq!(update.event_type, TickerEventType::FullDay);
        assert_eq!(update.close_price, "50000.1234");
        assert_eq!(update.observed_at_ms, 1_672_515_782_136);
    }

    #[test]
    fn test_parse_mini_ticker() {
        let text = r#"{"e":"24hrMiniTicker","E":1672515782136,"s":"BTCUSDT","c":"50000.00","o":"49000","h":"51000","l":"48000","v":"1","q":"2"}"#;

        let update = parse_ticker_message(text).unwrap().unwrap();
        assert_eq!(update.event_type, TickerEventType::Mini);
        assert!(!update.event_type.is_qualifying());
    }

    #[test]
    fn test_parse_combined_stream_envelope() {
        let text = r#"{
            "stream": "btcusdt@ticker",
            "data": {"e":"24hrTicker","E":1672515782136,"s":"BTCUSDT","c":"42.1"}
        }"#;

        let update = parse_ticker_message(text).unwrap().unwrap();
        assert_eq!(update.close_price, "42.1");
    }

    #[test]
    fn test_subscription_ack_ignored() {
        let text = r#"{"result": null, "id": 1}"#;
        assert!(parse_ticker_message(text).unwrap().is_none());
    }

    #[test]
    fn test_unknown_event_tag_passes_through() {
        let text = r#"{"e":"kline","E":1,"s":"BTCUSDT","c":"1.0"}"#;
        let update = parse_ticker_message(text).unwrap().unwrap();
        assert_eq!(
            update.event_type,
            TickerEventType::Other("kline".to_string())
        );
    }

    #[test]
    fn test_malformed_ticker_is_parse_error() {
        // Has an event tag but is missing the close price.
        let text = r#"{"e":"24hrTicker","E":1,"s":"BTCUSDT"}"#;
        assert!(matches!(
            parse_ticker_message(text),
            Err(FeedError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(parse_ticker_message("not json").is_err());
    }
}
