//! Ticker update and report state types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event type tag carried by a ticker message.
///
/// Only the full 24-hour ticker qualifies for reporting; mini/partial ticks
/// are delivered but ignored by the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickerEventType {
    /// Full 24-hour rolling window ticker (`24hrTicker`).
    FullDay,
    /// Partial mini ticker (`24hrMiniTicker`).
    Mini,
    /// Any other event tag, preserved for diagnostics.
    Other(String),
}

impl TickerEventType {
    /// Wire tag for the full-day ticker event.
    pub const FULL_DAY_TAG: &'static str = "24hrTicker";
    /// Wire tag for the mini ticker event.
    pub const MINI_TAG: &'static str = "24hrMiniTicker";

    /// Map a raw event tag to its variant.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            Self::FULL_DAY_TAG => Self::FullDay,
            Self::MINI_TAG => Self::Mini,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this event type qualifies for reporting.
    #[must_use]
    pub fn is_qualifying(&self) -> bool {
        matches!(self, Self::FullDay)
    }
}

impl fmt::Display for TickerEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullDay => f.write_str(Self::FULL_DAY_TAG),
            Self::Mini => f.write_str(Self::MINI_TAG),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

/// A single price update produced by the exchange feed.
///
/// Immutable and transient: created per inbound message, consumed once by the
/// reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Trading pair symbol, e.g. "BTCUSDT".
    pub symbol: String,
    /// Event type tag of the originating message.
    pub event_type: TickerEventType,
    /// Current-day close price as the exchange sent it (decimal string).
    pub close_price: String,
    /// Exchange event time, milliseconds since Unix epoch.
    pub observed_at_ms: u64,
}

/// When the last report was submitted, if ever.
///
/// Owned exclusively by the reporter and mutated only after a successful
/// submission; `last_reported_at_ms` is monotonically non-decreasing once set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportState {
    /// Timestamp of the last successful report, ms since Unix epoch.
    pub last_reported_at_ms: Option<u64>,
}

impl ReportState {
    /// Fresh state with no prior report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful report at `now_ms`.
    ///
    /// Never moves the timestamp backwards.
    pub fn mark_reported(&mut self, now_ms: u64) {
        self.last_reported_at_ms = Some(match self.last_reported_at_ms {
            Some(prev) => prev.max(now_ms),
            None => now_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_from_tag() {
        assert_eq!(
            TickerEventType::from_tag("24hrTicker"),
            TickerEventType::FullDay
        );
        assert_eq!(
            TickerEventType::from_tag("24hrMiniTicker"),
            TickerEventType::Mini
        );
        assert_eq!(
            TickerEventType::from_tag("kline"),
            TickerEventType::Other("kline".to_string())
        );
    }

    #[test]
    fn test_only_full_day_qualifies() {
        assert!(TickerEventType::FullDay.is_qualifying());
        assert!(!TickerEventType::Mini.is_qualifying());
        assert!(!TickerEventType::Other("trade".into()).is_qualifying());
    }

    #[test]
    fn test_mark_reported_is_monotonic() {
        let mut state = ReportState::new();
        assert_eq!(state.last_reported_at_ms, None);

        state.mark_reported(1_000);
        assert_eq!(state.last_reported_at_ms, Some(1_000));

        // A stale timestamp never rewinds the state.
        state.mark_reported(500);
        assert_eq!(state.last_reported_at_ms, Some(1_000));

        state.mark_reported(2_000);
        assert_eq!(state.last_reported_at_ms, Some(2_000));
    }
}
