// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::fmt;

use alloy_primitives::{hex::FromHex, Bytes, TxHash, B256};
use serde::{Deserialize, Deserializer};

/// How a burn is looked up at the attestation service.
///
/// v1 keys attestations by the keccak256 hash of the emitted message; v2 keys
/// them by the source domain and the burn transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttestationLookup {
    MessageHash(B256),
    Transaction { source_domain: u32, tx_hash: TxHash },
}

impl fmt::Display for AttestationLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageHash(hash) => write!(f, "message {hash}"),
            Self::Transaction {
                source_domain,
                tx_hash,
            } => write!(f, "tx {tx_hash} on domain {source_domain}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttestationStatus {
    Complete,
    Pending,
    PendingConfirmations,
    Failed,
}

/// One attested message.
///
/// The v1 endpoint returns this object directly; the v2 endpoint wraps a list of
/// them in [`V2AttestationResponse`] and additionally fills `message` and, once
/// a forwarding relayer has minted, `forward_tx_hash`.
///
/// Circle's API sometimes returns the string `"PENDING"` instead of `null` for
/// fields that are not ready yet; those deserialize to `None`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    pub status: AttestationStatus,
    #[serde(default, deserialize_with = "deserialize_optional_bytes_or_pending")]
    pub message: Option<Bytes>,
    #[serde(default, deserialize_with = "deserialize_optional_bytes_or_pending")]
    pub attestation: Option<Bytes>,
    #[serde(default, deserialize_with = "deserialize_optional_hash_or_pending")]
    pub forward_tx_hash: Option<TxHash>,
}

impl AttestationResponse {
    pub fn pending() -> Self {
        Self {
            status: AttestationStatus::Pending,
            message: None,
            attestation: None,
            forward_tx_hash: None,
        }
    }

    pub fn complete(attestation: Bytes) -> Self {
        Self {
            status: AttestationStatus::Complete,
            attestation: Some(attestation),
            ..Self::pending()
        }
    }

    pub fn failed() -> Self {
        Self {
            status: AttestationStatus::Failed,
            ..Self::pending()
        }
    }

    pub fn with_message(mut self, message: Bytes) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with_forward_tx_hash(mut self, tx_hash: TxHash) -> Self {
        self.forward_tx_hash = Some(tx_hash);
        self
    }

    /// Signed attestation bytes, only once the status is `complete`.
    pub fn ready_attestation(&self) -> Option<&Bytes> {
        match self.status {
            AttestationStatus::Complete => self.attestation.as_ref(),
            _ => None,
        }
    }
}

/// Body of `GET /v2/messages/{sourceDomain}?transactionHash=...`.
#[derive(Debug, Deserialize)]
pub struct V2AttestationResponse {
    #[serde(default)]
    pub messages: Vec<AttestationResponse>,
}

fn pending_aware_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("pending")))
}

fn deserialize_optional_bytes_or_pending<'de, D>(deserializer: D) -> Result<Option<Bytes>, D::Error>
where
    D: Deserializer<'de>,
{
    pending_aware_string(deserializer)?
        .map(|s| Bytes::from_hex(s).map_err(serde::de::Error::custom))
        .transpose()
}

fn deserialize_optional_hash_or_pending<'de, D>(deserializer: D) -> Result<Option<TxHash>, D::Error>
where
    D: Deserializer<'de>,
{
    pending_aware_string(deserializer)?
        .map(|s| TxHash::from_hex(s).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_complete_response() {
        let json = r#"{"status":"complete","attestation":"0x1234abcd"}"#;
        let response: AttestationResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.status, AttestationStatus::Complete);
        assert_eq!(
            response.ready_attestation().unwrap().to_vec(),
            vec![0x12, 0x34, 0xab, 0xcd]
        );
        assert!(response.message.is_none());
        assert!(response.forward_tx_hash.is_none());
    }

    #[test]
    fn test_pending_string_is_treated_as_missing() {
        let json = r#"{"status":"pending","attestation":"PENDING","message":"pending"}"#;
        let response: AttestationResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.status, AttestationStatus::Pending);
        assert!(response.attestation.is_none());
        assert!(response.message.is_none());
    }

    #[test]
    fn test_attestation_is_not_ready_before_complete() {
        let json = r#"{"status":"pending_confirmations","attestation":"0xdeadbeef"}"#;
        let response: AttestationResponse = serde_json::from_str(json).unwrap();

        assert!(response.attestation.is_some());
        assert!(response.ready_attestation().is_none());
    }

    #[test]
    fn test_invalid_hex_fails() {
        let json = r#"{"status":"complete","attestation":"not_valid_hex"}"#;
        assert!(serde_json::from_str::<AttestationResponse>(json).is_err());
    }

    #[test]
    fn test_v2_response_with_forward_tx_hash() {
        let json = r#"{
            "messages": [
                {
                    "status": "complete",
                    "message": "0xdeadbeef",
                    "attestation": "0x1234abcd",
                    "eventNonce": "42",
                    "forwardTxHash": "0x1111111111111111111111111111111111111111111111111111111111111111"
                }
            ]
        }"#;
        let response: V2AttestationResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.messages.len(), 1);
        let message = &response.messages[0];
        assert_eq!(message.status, AttestationStatus::Complete);
        assert_eq!(message.message.as_ref().unwrap().to_vec(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(message.forward_tx_hash, Some(TxHash::repeat_byte(0x11)));
    }

    #[test]
    fn test_v2_empty_and_missing_messages() {
        let empty: V2AttestationResponse = serde_json::from_str(r#"{"messages": []}"#).unwrap();
        assert!(empty.messages.is_empty());

        let missing: V2AttestationResponse = serde_json::from_str("{}").unwrap();
        assert!(missing.messages.is_empty());
    }

    #[test]
    fn test_lookup_display() {
        let lookup = AttestationLookup::Transaction {
            source_domain: 6,
            tx_hash: TxHash::ZERO,
        };
        insta::assert_snapshot!(
            lookup.to_string(),
            @"tx 0x0000000000000000000000000000000000000000000000000000000000000000 on domain 6"
        );
    }
}
