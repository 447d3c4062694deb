//! Key loading and transaction signing.
//!
//! Keys are secp256k1 private keys loaded once at startup from an environment
//! variable or a file; intermediate buffers are zeroized. A transaction is
//! signed over `keccak256(msgpack(action) || sequence_be8)` so the signature
//! commits to both the action payload and the nonce.

use alloy::primitives::{keccak256, Address};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use std::path::PathBuf;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::action::{SignedTransaction, TransactionRequest};
use crate::error::{ChainError, ChainResult};

/// Source of a signing key.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Key management errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load a signing key and verify its derived address.
///
/// # Errors
/// Returns `KeyError` if the source is unreadable, the hex is malformed, the
/// key is invalid, or the derived address does not match `expected_address`.
pub fn load_signer(
    source: &KeySource,
    expected_address: Option<Address>,
) -> Result<PrivateKeySigner, KeyError> {
    fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
        let trimmed = hex_str.trim().trim_start_matches("0x");
        Ok(Zeroizing::new(hex::decode(trimmed)?))
    }

    let secret_bytes: Zeroizing<Vec<u8>> = match source {
        KeySource::EnvVar { var_name } => {
            let hex = std::env::var(var_name)
                .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?;
            parse_hex_key(&hex)?
        }
        KeySource::File { path } => {
            let content = std::fs::read_to_string(path)?;
            parse_hex_key(&content)?
        }
    };

    let signer = PrivateKeySigner::from_slice(&secret_bytes)
        .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

    if let Some(expected) = expected_address {
        if signer.address() != expected {
            return Err(KeyError::AddressMismatch {
                expected,
                actual: signer.address(),
            });
        }
    }

    Ok(signer)
}

/// Hash the signing payload for a transaction request.
///
/// Payload layout: msgpack(action) as a named map, followed by the nonce
/// sequence as big-endian 8 bytes.
fn signing_hash(request: &TransactionRequest) -> ChainResult<alloy::primitives::B256> {
    let mut data = rmp_serde::to_vec_named(&request.action)
        .map_err(|e| ChainError::Signing(format!("action serialization failed: {e}")))?;
    data.extend_from_slice(&request.nonce.sequence.to_be_bytes());
    Ok(keccak256(&data))
}

/// Sign a transaction request with the account key.
///
/// # Errors
/// Returns `ChainError::Signing` on serialization or signature failure.
pub async fn sign_transaction(
    request: &TransactionRequest,
    key: &PrivateKeySigner,
) -> ChainResult<SignedTransaction> {
    let hash = signing_hash(request)?;

    let signature = key
        .sign_hash(&hash)
        .await
        .map_err(|e| ChainError::Signing(e.to_string()))?;

    Ok(SignedTransaction {
        action: request.action.clone(),
        signer: request.signer,
        sequence: request.nonce.sequence,
        signature: format!("0x{}", hex::encode(signature.as_bytes())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Nonce, OracleAction};

    // Well-known anvil test key, not a real secret.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_signer() -> PrivateKeySigner {
        let bytes = hex::decode(TEST_KEY).unwrap();
        PrivateKeySigner::from_slice(&bytes).unwrap()
    }

    fn sample_request(sequence: u64) -> TransactionRequest {
        let signer = test_signer().address();
        TransactionRequest {
            action: OracleAction::RequestPrice {
                oracle: Address::ZERO,
            },
            signer,
            nonce: Nonce {
                account: signer,
                sequence,
            },
        }
    }

    #[test]
    fn test_load_signer_address_check() {
        std::env::set_var("BRIDGE_TEST_KEY", TEST_KEY);
        let source = KeySource::EnvVar {
            var_name: "BRIDGE_TEST_KEY".to_string(),
        };

        let signer = load_signer(&source, None).unwrap();
        let expected = signer.address();

        // Matching address passes, mismatching fails.
        assert!(load_signer(&source, Some(expected)).is_ok());
        let err = load_signer(&source, Some(Address::ZERO)).unwrap_err();
        assert!(matches!(err, KeyError::AddressMismatch { .. }));
    }

    #[test]
    fn test_load_signer_missing_env_var() {
        let source = KeySource::EnvVar {
            var_name: "BRIDGE_TEST_KEY_DOES_NOT_EXIST".to_string(),
        };
        assert!(matches!(
            load_signer(&source, None),
            Err(KeyError::EnvVarNotFound(_))
        ));
    }

    #[test]
    fn test_signing_hash_commits_to_nonce() {
        let h1 = signing_hash(&sample_request(1)).unwrap();
        let h2 = signing_hash(&sample_request(2)).unwrap();
        assert_ne!(h1, h2);
    }

    #[tokio::test]
    async fn test_sign_transaction_produces_hex_signature() {
        let key = test_signer();
        let signed = sign_transaction(&sample_request(7), &key).await.unwrap();

        assert_eq!(signed.sequence, 7);
        assert!(signed.signature.starts_with("0x"));
        // 65 bytes -> 130 hex chars.
        assert_eq!(signed.signature.len(), 2 + 130);
    }
}
