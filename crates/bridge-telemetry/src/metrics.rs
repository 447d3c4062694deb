//! Prometheus metrics for the oracle bridge.
//!
//! Covers the exchange feed, price encoding, throttling, and chain
//! submission stages of a reporting run.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram, register_int_counter,
    CounterVec, GaugeVec, Histogram, IntCounter,
};

/// Total ticker events received by type.
/// Labels: event_type (full_day/mini/other), qualifying (true/false)
pub static TICKER_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bridge_ticker_events_total",
        "Total ticker events received from the exchange feed",
        &["event_type", "qualifying"]
    )
    .unwrap()
});

/// Last encoded price (scaled integer).
pub static LAST_ENCODED_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "bridge_last_encoded_price",
        "Last encoded price as scaled integer",
        &["symbol"]
    )
    .unwrap()
});

/// Total updates suppressed by the report throttle.
pub static THROTTLE_SUPPRESSED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "bridge_throttle_suppressed_total",
        "Total price updates suppressed by the report interval throttle"
    )
    .unwrap()
});

/// Total chain transactions by action and outcome.
/// Labels: action (requestPrice/reportPrice), outcome (included/submitted/rejected/error)
pub static CHAIN_TX_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "bridge_chain_tx_total",
        "Total chain transactions by action and outcome",
        &["action", "outcome"]
    )
    .unwrap()
});

/// Time from qualifying ticker receipt to report submission, in milliseconds.
pub static REPORT_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "bridge_report_latency_ms",
        "Latency from qualifying ticker to report submission in milliseconds",
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record ticker event received.
    pub fn ticker_event(event_type: &str, qualifying: bool) {
        TICKER_EVENTS_TOTAL
            .with_label_values(&[event_type, if qualifying { "true" } else { "false" }])
            .inc();
    }

    /// Update last encoded price.
    pub fn encoded_price(symbol: &str, value: f64) {
        LAST_ENCODED_PRICE.with_label_values(&[symbol]).set(value);
    }

    /// Record update suppressed by throttle.
    pub fn throttle_suppressed() {
        THROTTLE_SUPPRESSED_TOTAL.inc();
    }

    /// Record chain transaction outcome.
    pub fn chain_tx(action: &str, outcome: &str) {
        CHAIN_TX_TOTAL.with_label_values(&[action, outcome]).inc();
    }

    /// Record ticker-to-report latency.
    pub fn report_latency(latency_ms: f64) {
        REPORT_LATENCY_MS.observe(latency_ms);
    }
}
