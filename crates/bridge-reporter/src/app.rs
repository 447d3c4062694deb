//! Main application orchestration.
//!
//! Single-shot reporting cycle: issue the initial oracle price request,
//! subscribe to the exchange feed, report the first qualifying price that
//! clears the throttle, then finish. Two identities take part: the requester
//! signs the price request and the reporter (the oracle account) signs the
//! report; each owns its own nonce sequencer so nonce acquisition and
//! submission stay strictly sequential per account.

use crate::error::{AppError, AppResult};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use bridge_chain::{
    ChainTransport, NonceSequencer, OracleAction, ReferenceHash, TransactionOutcome,
    TransactionRequest, TransactionSubmitter, TxStatus,
};
use bridge_core::{
    encode_price, Clock, EncodedPrice, PriceUpdate, ReportState, ReportThrottle, TickerEventType,
};
use bridge_telemetry::Metrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Result of a completed reporting cycle.
#[derive(Debug)]
pub struct ReportSummary {
    /// Price that was reported, as the scaled integer sent on-chain.
    pub price: EncodedPrice,
    /// Chain outcome of the report transaction.
    pub outcome: TransactionOutcome,
}

/// One signing identity with its own nonce sequence.
struct Account {
    address: Address,
    key: PrivateKeySigner,
    sequencer: NonceSequencer,
}

impl Account {
    fn new(transport: Arc<dyn ChainTransport>, key: PrivateKeySigner) -> Self {
        let address = key.address();
        Self {
            address,
            key,
            sequencer: NonceSequencer::new(transport, address),
        }
    }
}

/// Main application.
pub struct Application {
    oracle: Address,
    reference_hash: ReferenceHash,
    requester: Account,
    reporter: Account,
    throttle: ReportThrottle,
    clock: Arc<dyn Clock>,
    submitter: TransactionSubmitter,
    state: ReportState,
}

impl Application {
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        requester_key: PrivateKeySigner,
        reporter_key: PrivateKeySigner,
        oracle: Address,
        reference_hash: ReferenceHash,
        throttle: ReportThrottle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            oracle,
            reference_hash,
            requester: Account::new(transport.clone(), requester_key),
            reporter: Account::new(transport.clone(), reporter_key),
            throttle,
            clock,
            submitter: TransactionSubmitter::new(transport),
            state: ReportState::new(),
        }
    }

    #[cfg(test)]
    fn with_last_report(mut self, at_ms: u64) -> Self {
        self.state.mark_reported(at_ms);
        self
    }

    /// Run one reporting cycle to completion.
    ///
    /// Startup order is part of the contract: the reporter's account
    /// sequence is fetched first (a failure aborts the run before anything
    /// is submitted), then the price request goes out, and only then is
    /// `subscribe` invoked to establish the feed. Updates are consumed until
    /// one qualifying price clears the throttle and its report resolves.
    ///
    /// # Errors
    /// `AppError::Chain` if the reporter nonce query fails or the chain
    /// rejects the report; `AppError::FeedDisconnected` if the feed ends
    /// first.
    pub async fn run<F>(mut self, subscribe: F) -> AppResult<ReportSummary>
    where
        F: FnOnce() -> mpsc::Receiver<PriceUpdate>,
    {
        // The report path must not discover a dead chain mid-cycle.
        self.reporter.sequencer.prime().await?;

        self.request_price().await?;

        let mut updates = subscribe();
        info!(oracle = %self.oracle, "Listening for ticker updates");
        while let Some(update) = updates.recv().await {
            if let Some(summary) = self.handle_update(update).await? {
                return Ok(summary);
            }
        }

        warn!("Feed channel closed without a report");
        Err(AppError::FeedDisconnected)
    }

    /// Submit the initial `RequestPrice` for the oracle account, signed by
    /// the requester.
    ///
    /// The outcome is logged but does not gate listening; neither the
    /// requester's nonce query nor the submission is fatal here.
    async fn request_price(&mut self) -> AppResult<()> {
        let nonce = match self.requester.sequencer.next().await {
            Ok(nonce) => nonce,
            Err(err) => {
                Metrics::chain_tx("requestPrice", "error");
                warn!(%err, "Requester nonce unavailable, skipping price request");
                return Ok(());
            }
        };
        let request = TransactionRequest {
            action: OracleAction::RequestPrice {
                oracle: self.oracle,
            },
            signer: self.requester.address,
            nonce,
        };
        match self.submitter.submit(request, &self.requester.key).await {
            Ok(outcome) => {
                Metrics::chain_tx("requestPrice", outcome_label(&outcome));
                info!(?outcome.status, "Price request submitted");
            }
            Err(err) => {
                Metrics::chain_tx("requestPrice", "error");
                warn!(%err, "Price request failed, listening anyway");
            }
        }
        Ok(())
    }

    /// Process one feed update; `Some` means the cycle finished.
    async fn handle_update(&mut self, update: PriceUpdate) -> AppResult<Option<ReportSummary>> {
        let label = event_label(&update.event_type);
        let qualifying = update.event_type.is_qualifying();
        Metrics::ticker_event(label, qualifying);
        if !qualifying {
            debug!(event_type = label, symbol = %update.symbol, "Ignoring non-qualifying event");
            return Ok(None);
        }

        let now_ms = self.clock.now_ms();
        if !self.throttle.should_report(now_ms, &self.state) {
            Metrics::throttle_suppressed();
            debug!(symbol = %update.symbol, "Update suppressed by report interval");
            return Ok(None);
        }

        let encoded = match encode_price(&update.close_price) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(%err, close_price = %update.close_price, "Ignoring malformed price");
                return Ok(None);
            }
        };
        Metrics::encoded_price(&update.symbol, encoded.value as f64);

        let nonce = self.reporter.sequencer.next().await?;
        let request = TransactionRequest {
            action: OracleAction::ReportPrice {
                price: encoded.value,
                reference_hash: self.reference_hash,
            },
            signer: self.reporter.address,
            nonce,
        };
        let outcome = match self.submitter.submit(request, &self.reporter.key).await {
            Ok(outcome) => outcome,
            Err(err) => {
                Metrics::chain_tx("reportPrice", "error");
                return Err(err.into());
            }
        };
        Metrics::chain_tx("reportPrice", outcome_label(&outcome));
        Metrics::report_latency(self.clock.now_ms().saturating_sub(update.observed_at_ms) as f64);

        self.state.mark_reported(now_ms);
        info!(
            symbol = %update.symbol,
            price = %encoded.value,
            ?outcome.status,
            "Price reported"
        );
        Ok(Some(ReportSummary {
            price: encoded,
            outcome,
        }))
    }
}

fn event_label(event_type: &TickerEventType) -> &'static str {
    match event_type {
        TickerEventType::FullDay => "full_day",
        TickerEventType::Mini => "mini",
        TickerEventType::Other(_) => "other",
    }
}

fn outcome_label(outcome: &TransactionOutcome) -> &'static str {
    match outcome.status {
        TxStatus::Included => "included",
        TxStatus::Submitted => "submitted",
        TxStatus::Failed => "failed",
    }
}
