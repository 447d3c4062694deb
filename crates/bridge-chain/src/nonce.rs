//! Local nonce sequencing for a single submitting account.
//!
//! The chain is consulted exactly once, on the first allocation. Every
//! subsequent allocation increments locally, which is only sound while this
//! sequencer is the sole submitter for the account.

use alloy::primitives::Address;
use std::sync::Arc;
use tracing::debug;

use crate::action::Nonce;
use crate::error::ChainResult;
use crate::submitter::ChainTransport;

pub struct NonceSequencer {
    transport: Arc<dyn ChainTransport>,
    account: Address,
    next_sequence: Option<u64>,
}

impl NonceSequencer {
    pub fn new(transport: Arc<dyn ChainTransport>, account: Address) -> Self {
        Self {
            transport,
            account,
            next_sequence: None,
        }
    }

    /// Fetch the account sequence from the chain if not already known.
    ///
    /// Lets the caller front-load the one chain query (and its failure) at
    /// startup instead of at the first allocation.
    pub async fn prime(&mut self) -> ChainResult<()> {
        if self.next_sequence.is_none() {
            let sequence = self.transport.account_sequence(self.account).await?;
            debug!(account = %self.account, sequence, "Fetched account sequence");
            self.next_sequence = Some(sequence);
        }
        Ok(())
    }

    /// Allocate the next nonce for this account.
    ///
    /// The first call queries the chain; a query failure is returned as-is
    /// and leaves the sequencer uninitialized, so a later call queries again.
    pub async fn next(&mut self) -> ChainResult<Nonce> {
        let sequence = match self.next_sequence {
            Some(sequence) => sequence,
            None => {
                let sequence = self.transport.account_sequence(self.account).await?;
                debug!(account = %self.account, sequence, "Fetched account sequence");
                sequence
            }
        };
        self.next_sequence = Some(sequence + 1);
        Ok(Nonce {
            account: self.account,
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use crate::submitter::MockChainTransport;

    #[tokio::test]
    async fn test_queries_chain_once_then_increments() {
        let transport = Arc::new(MockChainTransport::new());
        transport.set_sequence(7);
        let mut sequencer = NonceSequencer::new(transport.clone(), Address::ZERO);

        assert_eq!(sequencer.next().await.unwrap().sequence, 7);
        assert_eq!(sequencer.next().await.unwrap().sequence, 8);
        assert_eq!(sequencer.next().await.unwrap().sequence, 9);
        assert_eq!(transport.query_count(), 1);
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let transport = Arc::new(MockChainTransport::new());
        transport.fail_queries("rpc unavailable");
        let mut sequencer = NonceSequencer::new(transport.clone(), Address::ZERO);

        assert!(matches!(
            sequencer.next().await,
            Err(ChainError::QueryFailed(_))
        ));

        // The sequencer stays uninitialized and retries the query when the
        // transport recovers.
        transport.set_sequence(4);
        assert_eq!(sequencer.next().await.unwrap().sequence, 4);
        assert_eq!(transport.query_count(), 2);
    }

    #[tokio::test]
    async fn test_prime_front_loads_the_query() {
        let transport = Arc::new(MockChainTransport::new());
        transport.set_sequence(11);
        let mut sequencer = NonceSequencer::new(transport.clone(), Address::ZERO);

        sequencer.prime().await.unwrap();
        assert_eq!(transport.query_count(), 1);

        // Priming again and allocating never re-query.
        sequencer.prime().await.unwrap();
        assert_eq!(sequencer.next().await.unwrap().sequence, 11);
        assert_eq!(sequencer.next().await.unwrap().sequence, 12);
        assert_eq!(transport.query_count(), 1);
    }

    #[tokio::test]
    async fn test_prime_failure_propagates() {
        let transport = Arc::new(MockChainTransport::new());
        transport.fail_queries("node unavailable");
        let mut sequencer = NonceSequencer::new(transport, Address::ZERO);

        assert!(matches!(
            sequencer.prime().await,
            Err(ChainError::QueryFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_nonce_carries_account() {
        let transport = Arc::new(MockChainTransport::new());
        let account: Address = "0x00000000000000000000000000000000000000aa"
            .parse()
            .unwrap();
        let mut sequencer = NonceSequencer::new(transport, account);

        let nonce = sequencer.next().await.unwrap();
        assert_eq!(nonce.account, account);
    }
}
