//! Transaction submission over an abstract chain transport.
//!
//! The trait-based transport allows dependency injection for testing and
//! keeps signing separate from the wire protocol.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::action::{TransactionOutcome, TransactionRequest, TxStatusEvent};
use crate::error::{ChainError, ChainResult};
use crate::signer::sign_transaction;
use crate::SignedTransaction;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Transport to the chain: state queries and watched submission.
pub trait ChainTransport: Send + Sync {
    /// Query the current account sequence count for `account`.
    fn account_sequence(&self, account: Address) -> BoxFuture<'_, ChainResult<u64>>;

    /// Submit a signed transaction; the returned channel yields its status
    /// transitions until a terminal one, then closes.
    fn submit_and_watch(
        &self,
        tx: SignedTransaction,
    ) -> BoxFuture<'_, ChainResult<mpsc::Receiver<TxStatusEvent>>>;
}

/// Signs and submits chain actions, resolving when the chain acknowledges
/// inclusion or fails.
///
/// Does not retry on rejection: a nonce-too-low or balance failure surfaces
/// as `ChainError::Rejected` for the caller to handle.
pub struct TransactionSubmitter {
    transport: Arc<dyn ChainTransport>,
}

impl TransactionSubmitter {
    pub fn new(transport: Arc<dyn ChainTransport>) -> Self {
        Self { transport }
    }

    /// Sign `request` with `key` and submit it.
    ///
    /// The caller must obtain the request's nonce immediately before calling
    /// and must not start a second submission for the same account until this
    /// call returns.
    ///
    /// # Errors
    /// `ChainError::Rejected` if the chain refuses the transaction;
    /// `ChainError::Transport`/`Signing` on lower-level failures.
    pub async fn submit(
        &self,
        request: TransactionRequest,
        key: &PrivateKeySigner,
    ) -> ChainResult<TransactionOutcome> {
        let kind = request.action.kind();
        let sequence = request.nonce.sequence;

        let signed = sign_transaction(&request, key).await?;
        debug!(action = kind, sequence, "Submitting transaction");

        let mut status_rx = self.transport.submit_and_watch(signed).await?;

        while let Some(event) = status_rx.recv().await {
            match event {
                TxStatusEvent::Broadcast => {
                    debug!(action = kind, sequence, "Transaction broadcast");
                }
                TxStatusEvent::InBlock(block) | TxStatusEvent::Finalized(block) => {
                    info!(action = kind, sequence, block = %block, "Transaction included");
                    return Ok(TransactionOutcome::included(block));
                }
                TxStatusEvent::Invalid(reason) => {
                    warn!(action = kind, sequence, %reason, "Transaction rejected");
                    return Err(ChainError::Rejected(reason));
                }
                TxStatusEvent::Dropped => {
                    warn!(action = kind, sequence, "Transaction dropped from pool");
                    return Err(ChainError::Rejected("dropped from pool".to_string()));
                }
            }
        }

        // Watch ended without a terminal status: the chain accepted the
        // transaction but inclusion was not observed before the stream closed.
        debug!(action = kind, sequence, "Status stream ended after broadcast");
        Ok(TransactionOutcome::submitted())
    }
}

/// Mock chain transport for testing.
pub struct MockChainTransport {
    /// Sequence count to answer queries with, or an error message.
    sequence_result: Mutex<Result<u64, String>>,
    /// Number of sequence queries served.
    query_count: AtomicU32,
    /// Status events emitted for each submission.
    status_script: Mutex<Vec<TxStatusEvent>>,
    /// Recorded submissions for verification.
    submissions: Mutex<Vec<SignedTransaction>>,
}

impl Default for MockChainTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChainTransport {
    /// Create a mock answering sequence queries with 0 and including every
    /// submission in a fixed block.
    pub fn new() -> Self {
        Self {
            sequence_result: Mutex::new(Ok(0)),
            query_count: AtomicU32::new(0),
            status_script: Mutex::new(vec![
                TxStatusEvent::Broadcast,
                TxStatusEvent::InBlock("0xblock".to_string()),
            ]),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Answer sequence queries with `sequence`.
    pub fn set_sequence(&self, sequence: u64) {
        *self.sequence_result.lock() = Ok(sequence);
    }

    /// Fail sequence queries with the given message.
    pub fn fail_queries(&self, reason: &str) {
        *self.sequence_result.lock() = Err(reason.to_string());
    }

    /// Set the status events emitted for subsequent submissions.
    pub fn set_status_script(&self, events: Vec<TxStatusEvent>) {
        *self.status_script.lock() = events;
    }

    /// Recorded submissions.
    pub fn submissions(&self) -> Vec<SignedTransaction> {
        self.submissions.lock().clone()
    }

    /// Number of sequence queries served.
    pub fn query_count(&self) -> u32 {
        self.query_count.load(Ordering::SeqCst)
    }
}

impl ChainTransport for MockChainTransport {
    fn account_sequence(&self, _account: Address) -> BoxFuture<'_, ChainResult<u64>> {
        Box::pin(async move {
            self.query_count.fetch_add(1, Ordering::SeqCst);
            self.sequence_result
                .lock()
                .clone()
                .map_err(ChainError::QueryFailed)
        })
    }

    fn submit_and_watch(
        &self,
        tx: SignedTransaction,
    ) -> BoxFuture<'_, ChainResult<mpsc::Receiver<TxStatusEvent>>> {
        Box::pin(async move {
            self.submissions.lock().push(tx);
            let events = self.status_script.lock().clone();
            let (status_tx, status_rx) = mpsc::channel(events.len().max(1));
            for event in events {
                let _ = status_tx.send(event).await;
            }
            Ok(status_rx)
        })
    }
}
