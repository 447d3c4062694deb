//! Exchange ticker feed listener.
//!
//! Maintains a WebSocket subscription to a symbol's ticker stream, parses
//! inbound messages into [`bridge_core::PriceUpdate`] values, and forwards
//! them over an mpsc channel. The consumer sees a lazy, unbounded sequence of
//! updates; a closed channel means the feed has disconnected for good.

pub mod error;
pub mod listener;
pub mod parser;

pub use error::{FeedError, FeedResult};
pub use listener::{spawn_feed_listener, FeedConfig, FeedHandle};
pub use parser::parse_ticker_message;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
