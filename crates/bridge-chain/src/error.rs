//! Chain error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// A chain state query failed (account sequence lookup, etc.).
    #[error("Chain query failed: {0}")]
    QueryFailed(String),

    /// The chain actively refused the submission (bad nonce, insufficient
    /// balance, unauthorized reporter).
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Transport-level failure on the chain connection.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Key error: {0}")]
    Key(#[from] crate::signer::KeyError),

    #[error("Invalid reference hash: {0}")]
    InvalidReferenceHash(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ChainResult<T> = Result<T, ChainError>;
