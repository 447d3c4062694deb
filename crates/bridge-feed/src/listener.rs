//! Feed connection lifecycle.
//!
//! Owns the WebSocket connection to the exchange stream and forwards parsed
//! updates to the consumer. Handles reconnection with exponential backoff and
//! jitter; once the attempt budget is exhausted the update channel is closed
//! and the consumer observes end-of-stream.

use bridge_core::PriceUpdate;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::error::{FeedError, FeedResult};
use crate::parser::parse_ticker_message;

/// Feed connection configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Stream endpoint base URL, e.g. "wss://stream.binance.com:9443/ws".
    pub url: String,
    /// Trading pair symbol, e.g. "BTCUSDT".
    pub symbol: String,
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    pub reconnect_max_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            symbol: String::new(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60_000,
        }
    }
}

impl FeedConfig {
    /// Full stream URL for this symbol's ticker channel.
    fn stream_url(&self) -> String {
        format!(
            "{}/{}@ticker",
            self.url.trim_end_matches('/'),
            self.symbol.to_lowercase()
        )
    }
}

/// Handle to a running feed listener.
pub struct FeedHandle {
    /// Parsed updates, in transport order. `None` from `recv` means the feed
    /// has disconnected and will not recover.
    pub updates: mpsc::Receiver<PriceUpdate>,
    /// The background connection task.
    pub task: JoinHandle<()>,
}

/// Spawn the feed listener task for one symbol.
///
/// The returned handle's channel yields every parsed update on the stream;
/// event-type filtering is the consumer's concern.
pub fn spawn_feed_listener(config: FeedConfig) -> FeedHandle {
    let (update_tx, updates) = mpsc::channel(256);

    let task = tokio::spawn(async move {
        run_with_retry(config, update_tx).await;
    });

    FeedHandle { updates, task }
}

async fn run_with_retry(config: FeedConfig, update_tx: mpsc::Sender<PriceUpdate>) {
    let mut attempt = 0u32;

    loop {
        match run_connection(&config, &update_tx).await {
            Ok(()) => {
                // Consumer dropped the receiver; nothing left to do.
                info!(symbol = %config.symbol, "Feed consumer gone, stopping listener");
                return;
            }
            Err(e) => {
                error!(?e, symbol = %config.symbol, "Feed connection error");
            }
        }

        attempt += 1;
        if config.max_reconnect_attempts > 0 && attempt >= config.max_reconnect_attempts {
            error!(attempt, "Max feed reconnection attempts reached");
            // Dropping update_tx closes the channel; the consumer sees
            // end-of-stream and treats it as a feed disconnect.
            return;
        }

        let delay = backoff_delay(&config, attempt);
        warn!(attempt, delay_ms = delay.as_millis(), "Reconnecting feed");
        tokio::time::sleep(delay).await;
    }
}

/// Run one connection until it fails or the consumer goes away.
///
/// `Ok(())` means the consumer dropped the receiver; any transport failure is
/// an `Err` and triggers a reconnect.
async fn run_connection(
    config: &FeedConfig,
    update_tx: &mpsc::Sender<PriceUpdate>,
) -> FeedResult<()> {
    let url = config.stream_url();
    info!(url = %url, "Connecting to ticker stream");

    let (ws_stream, _response) = connect_async(&url).await?;
    let (mut write, mut read) = ws_stream.split();

    info!(symbol = %config.symbol, "Ticker stream connected");

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => match parse_ticker_message(&text) {
                Ok(Some(update)) => {
                    debug!(
                        symbol = %update.symbol,
                        event = %update.event_type,
                        close = %update.close_price,
                        "Ticker update"
                    );
                    if update_tx.send(update).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // A single malformed update is dropped, not fatal.
                    warn!(?e, "Skipping unparseable feed message");
                }
            },
            Ok(Message::Ping(data)) => {
                debug!("Received ping, sending pong");
                write.send(Message::Pong(data)).await?;
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(frame)) => {
                let (code, reason) = frame
                    .map(|f| (f.code.into(), f.reason.to_string()))
                    .unwrap_or((1000, "Normal close".to_string()));
                warn!(code, %reason, "Ticker stream closed by server");
                return Err(FeedError::StreamClosed { code, reason });
            }
            Ok(_) => {}
            Err(e) => {
                error!(?e, "Ticker stream read error");
                return Err(e.into());
            }
        }
    }

    warn!("Ticker stream ended");
    Err(FeedError::ConnectionFailed("stream ended".to_string()))
}

fn backoff_delay(config: &FeedConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let delay = config
        .reconnect_base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.reconnect_max_delay_ms);
    Duration::from_millis(delay + rand_jitter())
}

/// Generate random jitter (0-1000ms).
fn rand_jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url_lowercases_symbol() {
        let config = FeedConfig {
            url: "wss://stream.example.com:9443/ws".to_string(),
            symbol: "BTCUSDT".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.stream_url(),
            "wss://stream.example.com:9443/ws/btcusdt@ticker"
        );
    }

    #[test]
    fn test_stream_url_trims_trailing_slash() {
        let config = FeedConfig {
            url: "wss://stream.example.com:9443/ws/".to_string(),
            symbol: "ethusdt".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.stream_url(),
            "wss://stream.example.com:9443/ws/ethusdt@ticker"
        );
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        let config = FeedConfig {
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 8000,
            ..Default::default()
        };
        // attempt 10 would be 512s uncapped; must stay under cap + jitter.
        let delay = backoff_delay(&config, 10);
        assert!(delay <= Duration::from_millis(9000));
        assert!(delay >= Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_delay_grows() {
        let config = FeedConfig::default();
        let d1 = backoff_delay(&config, 1).as_millis() as u64;
        let d3 = backoff_delay(&config, 3).as_millis() as u64;
        // 1000 * 2^0 vs 1000 * 2^2, each with <1000ms jitter.
        assert!(d1 < 2000);
        assert!(d3 >= 4000);
    }
}
