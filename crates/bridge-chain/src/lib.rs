//! Chain client for the oracle price bridge.
//!
//! Provides the downstream chain surface the reporter submits to:
//! - `OracleAction`, `TransactionRequest`, `TransactionOutcome`: wire types
//! - `NonceSequencer`: per-account sequence tracking (query once, then local)
//! - key loading and action signing
//! - `RpcClient`: JSON-RPC 2.0 over the chain WebSocket
//! - `TransactionSubmitter`: sign-and-submit with status watching

pub mod action;
pub mod error;
pub mod nonce;
pub mod rpc;
pub mod signer;
pub mod submitter;

pub use action::{
    Nonce, OracleAction, ReferenceHash, SignedTransaction, TransactionOutcome,
    TransactionRequest, TxStatus, TxStatusEvent,
};
pub use error::{ChainError, ChainResult};
pub use nonce::NonceSequencer;
pub use rpc::RpcClient;
pub use signer::{load_signer, sign_transaction, KeyError, KeySource};
pub use submitter::{BoxFuture, ChainTransport, MockChainTransport, TransactionSubmitter};
