//! Oracle action and transaction wire types.
//!
//! Prices travel as decimal strings on the wire (the chain's price type is a
//! u128, which msgpack and JSON cannot carry natively), and the reference
//! hash is a fixed 32-byte identifier rendered as 0x-prefixed hex.

use alloy::primitives::Address;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ChainError;

/// Auxiliary identifier submitted alongside a reported price, tying the
/// report to verifiable source data. Fixed 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceHash(pub [u8; 32]);

impl ReferenceHash {
    /// Byte length of a reference hash.
    pub const LEN: usize = 32;
}

impl FromStr for ReferenceHash {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(stripped)
            .map_err(|e| ChainError::InvalidReferenceHash(e.to_string()))?;
        let arr: [u8; Self::LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            ChainError::InvalidReferenceHash(format!("expected {} bytes, got {}", Self::LEN, b.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for ReferenceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for ReferenceHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

fn u128_as_string<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// An action submitted to the chain's price module.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OracleAction {
    /// Ask the given oracle account to produce a price.
    #[serde(rename_all = "camelCase")]
    RequestPrice { oracle: Address },
    /// Report a fixed-point price, tied to a pre-agreed reference hash.
    #[serde(rename_all = "camelCase")]
    ReportPrice {
        #[serde(serialize_with = "u128_as_string")]
        price: u128,
        reference_hash: ReferenceHash,
    },
}

impl OracleAction {
    /// Short tag for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestPrice { .. } => "requestPrice",
            Self::ReportPrice { .. } => "reportPrice",
        }
    }
}

/// Per-account transaction sequence number.
///
/// Strictly increasing per account across submissions within a run,
/// initialized from the chain-reported account sequence count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Nonce {
    /// Signing account this nonce belongs to.
    pub account: Address,
    /// Sequence number to use for the next transaction.
    pub sequence: u64,
}

/// An unsigned transaction: action, signer, and the nonce to submit under.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub action: OracleAction,
    pub signer: Address,
    pub nonce: Nonce,
}

/// A signed transaction ready for submission.
#[derive(Debug, Clone, Serialize)]
pub struct SignedTransaction {
    pub action: OracleAction,
    pub signer: Address,
    pub sequence: u64,
    /// 65-byte secp256k1 signature, 0x-prefixed hex.
    pub signature: String,
}

/// Status reported back for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Accepted for broadcast; inclusion not yet observed.
    Submitted,
    /// Included in a block.
    Included,
    /// Refused by the chain.
    Failed,
}

/// Final outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub status: TxStatus,
    /// Block hash the transaction landed in, when known.
    pub block_reference: Option<String>,
}

impl TransactionOutcome {
    #[must_use]
    pub fn submitted() -> Self {
        Self {
            status: TxStatus::Submitted,
            block_reference: None,
        }
    }

    #[must_use]
    pub fn included(block: String) -> Self {
        Self {
            status: TxStatus::Included,
            block_reference: Some(block),
        }
    }
}

/// One status transition on a watched submission, as reported by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatusEvent {
    /// Validated and broadcast to the network.
    Broadcast,
    /// Included in the given block.
    InBlock(String),
    /// Finalized in the given block.
    Finalized(String),
    /// Refused (bad nonce, insufficient balance, unauthorized).
    Invalid(String),
    /// Dropped from the pool without inclusion.
    Dropped,
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0x11f41ca0ae166f08ae0e1059696c5e8161b0ab072ef7950c01d9440ff90c7ed5";

    #[test]
    fn test_reference_hash_round_trip() {
        let hash: ReferenceHash = HASH.parse().unwrap();
        assert_eq!(hash.to_string(), HASH);
    }

    #[test]
    fn test_reference_hash_rejects_bad_length() {
        let err = "0x1234".parse::<ReferenceHash>().unwrap_err();
        assert!(matches!(err, ChainError::InvalidReferenceHash(_)));
    }

    #[test]
    fn test_reference_hash_rejects_non_hex() {
        assert!("zzzz".parse::<ReferenceHash>().is_err());
    }

    #[test]
    fn test_report_price_serializes_price_as_string() {
        let action = OracleAction::ReportPrice {
            price: 500_001_234,
            reference_hash: HASH.parse().unwrap(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "reportPrice");
        assert_eq!(json["price"], "500001234");
        assert_eq!(json["referenceHash"], HASH);
    }

    #[test]
    fn test_request_price_tagged() {
        let action = OracleAction::RequestPrice {
            oracle: Address::ZERO,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "requestPrice");
        assert_eq!(action.kind(), "requestPrice");
    }
}
