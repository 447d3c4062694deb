//! Minimum-interval report gate.

use crate::update::ReportState;
use std::time::Duration;

/// Decides whether enough time has elapsed since the last report.
///
/// Pure predicate over a [`ReportState`]: the caller is responsible for
/// calling `ReportState::mark_reported` after a successful submission.
#[derive(Debug, Clone, Copy)]
pub struct ReportThrottle {
    interval_ms: u64,
}

impl ReportThrottle {
    /// Default minimum interval between reports.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

    /// Create a throttle with the given minimum interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
        }
    }

    /// Minimum interval in milliseconds.
    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Whether a report at `now_ms` would be allowed.
    ///
    /// True if no report has been made yet, or strictly more than the
    /// interval has elapsed since the last one. Exactly-at-interval does not
    /// qualify.
    #[must_use]
    pub fn should_report(&self, now_ms: u64, state: &ReportState) -> bool {
        match state.last_reported_at_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.interval_ms,
        }
    }
}

impl Default for ReportThrottle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}
