// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Circle Iris attestation service client.

use alloy_primitives::hex;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, trace, Instrument};
use url::Url;

use crate::error::{Result, TransferError};
use crate::protocol::{AttestationLookup, AttestationResponse, V2AttestationResponse};
use crate::spans;
use crate::traits::AttestationProvider;

pub const IRIS_PRODUCTION_URL: &str = "https://iris-api.circle.com";
pub const IRIS_SANDBOX_URL: &str = "https://iris-api-sandbox.circle.com";

/// Fallback wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 300;

/// [`AttestationProvider`] backed by Circle's Iris API.
///
/// Message-hash lookups go to `/v1/attestations/{hash}`; transaction lookups
/// go to `/v2/messages/{sourceDomain}?transactionHash={hash}`.
#[derive(Debug, Clone)]
pub struct IrisAttestationProvider {
    base_url: String,
    client: Client,
}

impl IrisAttestationProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn production() -> Self {
        Self::new(IRIS_PRODUCTION_URL)
    }

    pub fn sandbox() -> Self {
        Self::new(IRIS_SANDBOX_URL)
    }

    /// Sandbox for testnets, production otherwise.
    pub fn for_environment(testnet: bool) -> Self {
        if testnet {
            Self::sandbox()
        } else {
            Self::production()
        }
    }

    /// Replaces the HTTP client, e.g. to set timeouts or a proxy.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn attestation_url(&self, lookup: &AttestationLookup) -> Result<Url> {
        let raw = match lookup {
            AttestationLookup::MessageHash(hash) => format!(
                "{}/v1/attestations/{}",
                self.base_url,
                hex::encode_prefixed(hash)
            ),
            AttestationLookup::Transaction { source_domain, .. } => {
                format!("{}/v2/messages/{source_domain}", self.base_url)
            }
        };

        let mut url = Url::parse(&raw).map_err(|e| TransferError::InvalidUrl {
            reason: format!("{raw}: {e}"),
        })?;

        if let AttestationLookup::Transaction { tx_hash, .. } = lookup {
            url.query_pairs_mut()
                .append_pair("transactionHash", &hex::encode_prefixed(tx_hash));
        }
        Ok(url)
    }

    async fn fetch(&self, url: Url, lookup: AttestationLookup) -> Result<AttestationResponse> {
        trace!(url = %url, "Requesting attestation from Iris API");
        let response = self.client.get(url).send().await?;

        let status_code = response.status();
        trace!(status_code = %status_code, "Received response from Iris API");

        if status_code == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            debug!(retry_after_seconds = retry_after, event = "iris_rate_limited");
            return Err(TransferError::RateLimitExceeded {
                retry_after_seconds: retry_after,
            });
        }

        if status_code == reqwest::StatusCode::NOT_FOUND {
            debug!(event = "attestation_not_indexed");
            return Err(TransferError::AttestationNotFound);
        }

        response.error_for_status_ref()?;
        let body = response.text().await?;

        let attestation = match lookup {
            AttestationLookup::MessageHash(_) => {
                serde_json::from_str::<AttestationResponse>(&body)?
            }
            AttestationLookup::Transaction { .. } => {
                let parsed: V2AttestationResponse = serde_json::from_str(&body)?;
                // A burn emits one message; an empty list means it is not indexed yet.
                parsed
                    .messages
                    .into_iter()
                    .next()
                    .unwrap_or_else(AttestationResponse::pending)
            }
        };

        debug!(status = ?attestation.status, event = "attestation_response_parsed");
        Ok(attestation)
    }
}

#[async_trait]
impl AttestationProvider for IrisAttestationProvider {
    async fn get_attestation(&self, lookup: AttestationLookup) -> Result<AttestationResponse> {
        let url = self.attestation_url(&lookup)?;
        let span = spans::get_attestation(&url);
        self.fetch(url, lookup).instrument(span).await
    }
}
