//! JSON-RPC 2.0 chain client over WebSocket.
//!
//! A single driver task owns the socket. Callers hand it commands over a
//! channel and receive responses through oneshots, so request/response
//! correlation and subscription routing live in one place.
//!
//! There is no reconnection here: losing the chain connection mid-run is
//! fatal for the caller, which holds locally-sequenced nonces that a fresh
//! connection could invalidate.

use alloy::primitives::Address;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::action::TxStatusEvent;
use crate::error::{ChainError, ChainResult};
use crate::submitter::{BoxFuture, ChainTransport};
use crate::SignedTransaction;

const NONCE_METHOD: &str = "system_accountNonce";
const SUBMIT_METHOD: &str = "author_submitAndWatch";
const STATUS_NOTIFICATION: &str = "author_transactionStatus";

/// Buffered commands from callers to the driver task.
const COMMAND_BUFFER: usize = 16;
/// Buffered status events per watched transaction.
const STATUS_BUFFER: usize = 8;

enum Command {
    Call {
        method: &'static str,
        params: Value,
        resp: oneshot::Sender<ChainResult<Value>>,
    },
    SubmitWatch {
        params: Value,
        resp: oneshot::Sender<ChainResult<()>>,
        status_tx: mpsc::Sender<TxStatusEvent>,
    },
}

enum Pending {
    Call(oneshot::Sender<ChainResult<Value>>),
    Subscribe {
        resp: oneshot::Sender<ChainResult<()>>,
        status_tx: mpsc::Sender<TxStatusEvent>,
    },
}

/// Handle to the chain RPC connection. Cheap to clone.
///
/// Request ids are assigned by the driver task, the single writer to the
/// socket.
#[derive(Clone)]
pub struct RpcClient {
    cmd_tx: mpsc::Sender<Command>,
}

impl RpcClient {
    /// Connect to the chain node at `url` and spawn the socket driver.
    pub async fn connect(url: &str) -> ChainResult<Self> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|err| ChainError::Transport(format!("connect to {url}: {err}")))?;
        info!(%url, "Connected to chain node");

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(drive_connection(stream, cmd_rx));

        Ok(Self { cmd_tx })
    }

    async fn call(&self, method: &'static str, params: Value) -> ChainResult<Value> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Call {
                method,
                params,
                resp: resp_tx,
            })
            .await
            .map_err(|_| ChainError::Transport("connection closed".to_string()))?;
        resp_rx
            .await
            .map_err(|_| ChainError::Transport("connection closed".to_string()))?
    }
}

fn request_frame(id: u64, method: &str, params: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

impl ChainTransport for RpcClient {
    fn account_sequence(&self, account: Address) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move {
            let result = self
                .call(NONCE_METHOD, json!([format!("{account:#x}")]))
                .await
                .map_err(|err| ChainError::QueryFailed(err.to_string()))?;
            result
                .as_u64()
                .ok_or_else(|| ChainError::QueryFailed(format!("non-integer nonce: {result}")))
        })
    }

    fn submit_and_watch(
        &self,
        tx: SignedTransaction,
    ) -> BoxFuture<'_, ChainResult<mpsc::Receiver<TxStatusEvent>>> {
        Box::pin(async move {
            let payload = serde_json::to_value(&tx)?;
            let (status_tx, status_rx) = mpsc::channel(STATUS_BUFFER);
            let (resp_tx, resp_rx) = oneshot::channel();
            self.cmd_tx
                .send(Command::SubmitWatch {
                    params: json!([payload]),
                    resp: resp_tx,
                    status_tx,
                })
                .await
                .map_err(|_| ChainError::Transport("connection closed".to_string()))?;
            resp_rx
                .await
                .map_err(|_| ChainError::Transport("connection closed".to_string()))??;
            Ok(status_rx)
        })
    }
}

async fn drive_connection<S>(stream: S, mut cmd_rx: mpsc::Receiver<Command>)
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut ws_tx, mut ws_rx) = stream.split();
    let mut pending: HashMap<u64, Pending> = HashMap::new();
    let mut subscriptions: HashMap<String, mpsc::Sender<TxStatusEvent>> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("All client handles dropped, closing chain connection");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return;
                };
                let id = next_id;
                next_id += 1;
                let frame = match &cmd {
                    Command::Call { method, params, .. } => request_frame(id, method, params),
                    Command::SubmitWatch { params, .. } => {
                        request_frame(id, SUBMIT_METHOD, params)
                    }
                };
                match cmd {
                    Command::Call { resp, .. } => {
                        pending.insert(id, Pending::Call(resp));
                    }
                    Command::SubmitWatch { resp, status_tx, .. } => {
                        pending.insert(id, Pending::Subscribe { resp, status_tx });
                    }
                }
                if let Err(err) = ws_tx.send(Message::Text(frame.to_string())).await {
                    error!(%err, "Chain socket write failed");
                    fail_pending(pending, &err.to_string());
                    return;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(&text, &mut pending, &mut subscriptions).await;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws_tx.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        warn!(?frame, "Chain node closed the connection");
                        fail_pending(pending, "connection closed by node");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        error!(%err, "Chain socket read failed");
                        fail_pending(pending, &err.to_string());
                        return;
                    }
                    None => {
                        warn!("Chain socket stream ended");
                        fail_pending(pending, "connection closed");
                        return;
                    }
                }
            }
        }
    }
}

fn fail_pending(pending: HashMap<u64, Pending>, reason: &str) {
    for (_, entry) in pending {
        match entry {
            Pending::Call(resp) => {
                let _ = resp.send(Err(ChainError::Transport(reason.to_string())));
            }
            Pending::Subscribe { resp, .. } => {
                let _ = resp.send(Err(ChainError::Transport(reason.to_string())));
            }
        }
    }
}

async fn handle_frame(
    text: &str,
    pending: &mut HashMap<u64, Pending>,
    subscriptions: &mut HashMap<String, mpsc::Sender<TxStatusEvent>>,
) {
    let frame: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, "Discarding unparseable chain frame");
            return;
        }
    };

    // Response to one of our requests.
    if let Some(id) = frame.get("id").and_then(Value::as_u64) {
        let Some(entry) = pending.remove(&id) else {
            warn!(id, "Response for unknown request id");
            return;
        };
        let result = if let Some(error) = frame.get("error") {
            Err(ChainError::Transport(error.to_string()))
        } else {
            Ok(frame.get("result").cloned().unwrap_or(Value::Null))
        };
        match entry {
            Pending::Call(resp) => {
                let _ = resp.send(result);
            }
            Pending::Subscribe { resp, status_tx } => match result {
                Ok(value) => match value.as_str() {
                    Some(subscription_id) => {
                        debug!(subscription = subscription_id, "Watching transaction");
                        subscriptions.insert(subscription_id.to_string(), status_tx);
                        let _ = resp.send(Ok(()));
                    }
                    None => {
                        let _ = resp.send(Err(ChainError::Transport(format!(
                            "non-string subscription id: {value}"
                        ))));
                    }
                },
                Err(err) => {
                    let _ = resp.send(Err(err));
                }
            },
        }
        return;
    }

    // Subscription notification.
    if frame.get("method").and_then(Value::as_str) == Some(STATUS_NOTIFICATION) {
        let params = &frame["params"];
        let Some(subscription_id) = params.get("subscription").and_then(Value::as_str) else {
            warn!("Status notification without subscription id");
            return;
        };
        let Some(event) = params.get("result").and_then(parse_status_event) else {
            warn!(subscription = subscription_id, "Unrecognized status payload");
            return;
        };
        let terminal = matches!(
            event,
            TxStatusEvent::InBlock(_)
                | TxStatusEvent::Finalized(_)
                | TxStatusEvent::Invalid(_)
                | TxStatusEvent::Dropped
        );
        if let Some(status_tx) = subscriptions.get(subscription_id) {
            let _ = status_tx.send(event).await;
        }
        if terminal {
            // Dropping the sender closes the watcher's channel.
            subscriptions.remove(subscription_id);
        }
    }
}

/// Map a transaction status payload to an event.
///
/// Pre-inclusion statuses other than broadcast (validated, queued) fold into
/// `Broadcast` since callers only distinguish pending from terminal.
fn parse_status_event(value: &Value) -> Option<TxStatusEvent> {
    if let Some(tag) = value.as_str() {
        return match tag {
            "ready" | "broadcast" => Some(TxStatusEvent::Broadcast),
            "dropped" => Some(TxStatusEvent::Dropped),
            _ => None,
        };
    }
    let object = value.as_object()?;
    if let Some(block) = object.get("inBlock").and_then(Value::as_str) {
        return Some(TxStatusEvent::InBlock(block.to_string()));
    }
    if let Some(block) = object.get("finalized").and_then(Value::as_str) {
        return Some(TxStatusEvent::Finalized(block.to_string()));
    }
    if let Some(reason) = object.get("invalid") {
        let reason = reason
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| reason.to_string());
        return Some(TxStatusEvent::Invalid(reason));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pending_statuses() {
        assert!(matches!(
            parse_status_event(&json!("ready")),
            Some(TxStatusEvent::Broadcast)
        ));
        assert!(matches!(
            parse_status_event(&json!("broadcast")),
            Some(TxStatusEvent::Broadcast)
        ));
    }

    #[test]
    fn test_parse_inclusion_statuses() {
        assert!(matches!(
            parse_status_event(&json!({"inBlock": "0xabc"})),
            Some(TxStatusEvent::InBlock(block)) if block == "0xabc"
        ));
        assert!(matches!(
            parse_status_event(&json!({"finalized": "0xdef"})),
            Some(TxStatusEvent::Finalized(block)) if block == "0xdef"
        ));
    }

    #[test]
    fn test_parse_failure_statuses() {
        assert!(matches!(
            parse_status_event(&json!({"invalid": "stale nonce"})),
            Some(TxStatusEvent::Invalid(reason)) if reason == "stale nonce"
        ));
        assert!(matches!(
            parse_status_event(&json!("dropped")),
            Some(TxStatusEvent::Dropped)
        ));
        assert!(parse_status_event(&json!("future")).is_none());
    }

    #[test]
    fn test_request_frame_shape() {
        let frame = request_frame(42, NONCE_METHOD, &json!(["0xabc"]));
        assert_eq!(frame["jsonrpc"], "2.0");
        assert_eq!(frame["id"], 42);
        assert_eq!(frame["method"], NONCE_METHOD);
        assert_eq!(frame["params"], json!(["0xabc"]));
    }

    #[tokio::test]
    async fn test_response_routed_to_pending_call_by_id() {
        let mut pending = HashMap::new();
        let mut subscriptions = HashMap::new();

        let (resp_tx, resp_rx) = oneshot::channel();
        pending.insert(7, Pending::Call(resp_tx));

        let frame = json!({"jsonrpc": "2.0", "id": 7, "result": 42}).to_string();
        handle_frame(&frame, &mut pending, &mut subscriptions).await;

        assert_eq!(resp_rx.await.unwrap().unwrap(), json!(42));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_error_response_surfaces_as_transport_error() {
        let mut pending = HashMap::new();
        let mut subscriptions = HashMap::new();

        let (resp_tx, resp_rx) = oneshot::channel();
        pending.insert(3, Pending::Call(resp_tx));

        let frame = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32601, "message": "method not found"}
        })
        .to_string();
        handle_frame(&frame, &mut pending, &mut subscriptions).await;

        assert!(matches!(
            resp_rx.await.unwrap(),
            Err(ChainError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_subscription_registered_then_events_routed() {
        let mut pending = HashMap::new();
        let mut subscriptions = HashMap::new();

        let (resp_tx, resp_rx) = oneshot::channel();
        let (status_tx, mut status_rx) = mpsc::channel(4);
        pending.insert(
            1,
            Pending::Subscribe {
                resp: resp_tx,
                status_tx,
            },
        );

        // Subscription id response registers the channel.
        let response = json!({"jsonrpc": "2.0", "id": 1, "result": "sub-1"}).to_string();
        handle_frame(&response, &mut pending, &mut subscriptions).await;
        resp_rx.await.unwrap().unwrap();
        assert!(subscriptions.contains_key("sub-1"));

        // Pending status is forwarded; terminal status closes the channel.
        let broadcast = json!({
            "jsonrpc": "2.0",
            "method": STATUS_NOTIFICATION,
            "params": {"subscription": "sub-1", "result": "broadcast"}
        })
        .to_string();
        handle_frame(&broadcast, &mut pending, &mut subscriptions).await;
        assert_eq!(status_rx.recv().await, Some(TxStatusEvent::Broadcast));

        let in_block = json!({
            "jsonrpc": "2.0",
            "method": STATUS_NOTIFICATION,
            "params": {"subscription": "sub-1", "result": {"inBlock": "0xabc"}}
        })
        .to_string();
        handle_frame(&in_block, &mut pending, &mut subscriptions).await;
        assert_eq!(
            status_rx.recv().await,
            Some(TxStatusEvent::InBlock("0xabc".to_string()))
        );
        assert!(subscriptions.is_empty());
        assert_eq!(status_rx.recv().await, None);
    }
}
