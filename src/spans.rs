// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Span constructors for transfer operations.
//!
//! Span names are static (`cctp_orchestrator.<operation>`) and carry
//! OpenTelemetry-style `error.*` and `otel.status_code` fields that
//! [`record_error`] fills in on failure. They are public so callers can attach
//! their own instrumentation under the same names.
//!
//! ```rust,no_run
//! use cctp_orchestrator::spans;
//!
//! let span = spans::switch_chain(8453, 3);
//! let _guard = span.enter();
//! ```

use alloy_primitives::{Address, TxHash, B256, U256};
use tracing::Span;
use url::Url;

use crate::error::TransferError;
use crate::protocol::AttestationLookup;

/// Root span of one `execute` call.
///
/// Children: every phase span below.
#[inline]
pub fn execute_transfer(
    source_chain_id: u64,
    destination_chain_id: u64,
    amount: &U256,
    sender: &Address,
    recipient: &Address,
) -> Span {
    tracing::info_span!(
        "cctp_orchestrator.execute_transfer",
        source_chain_id = source_chain_id,
        destination_chain_id = destination_chain_id,
        amount = %amount,
        sender = %sender,
        recipient = %recipient,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

#[inline]
pub fn switch_chain(chain_id: u64, max_attempts: u32) -> Span {
    tracing::debug_span!(
        "cctp_orchestrator.switch_chain",
        chain_id = chain_id,
        max_attempts = max_attempts,
    )
}

#[inline]
pub fn ensure_approval(chain_id: u64, owner: &Address, spender: &Address, amount: &U256) -> Span {
    tracing::info_span!(
        "cctp_orchestrator.ensure_approval",
        chain_id = chain_id,
        owner = %owner,
        spender = %spender,
        amount = %amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Burn calldata construction.
#[inline]
pub fn deposit_for_burn(
    from_address: &Address,
    mint_recipient: &B256,
    destination_domain: u32,
    token_address: &Address,
    amount: &U256,
) -> Span {
    tracing::info_span!(
        "cctp_orchestrator.deposit_for_burn",
        from_address = %from_address,
        mint_recipient = %mint_recipient,
        destination_domain = destination_domain,
        token_address = %token_address,
        amount = %amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Whole attestation wait, across all attempts.
#[inline]
pub fn await_attestation(lookup: &AttestationLookup, max_wait_secs: u64) -> Span {
    tracing::info_span!(
        "cctp_orchestrator.await_attestation",
        lookup = %lookup,
        max_wait_secs = max_wait_secs,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Single request to the attestation service.
#[inline]
pub fn get_attestation(url: &Url) -> Span {
    tracing::debug_span!("cctp_orchestrator.get_attestation", url = %url)
}

#[inline]
pub fn wait_for_confirmation(tx_hash: TxHash, chain_id: u64, required_confirmations: u64) -> Span {
    tracing::debug_span!(
        "cctp_orchestrator.wait_for_confirmation",
        tx_hash = %tx_hash,
        chain_id = chain_id,
        required_confirmations = required_confirmations,
    )
}

#[inline]
pub fn receive_message(
    message_hash: &B256,
    destination_chain_id: u64,
    attestation_len: usize,
) -> Span {
    tracing::info_span!(
        "cctp_orchestrator.receive_message",
        message_hash = %message_hash,
        destination_chain_id = destination_chain_id,
        attestation_length_bytes = attestation_len,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Records `error` on the current span and marks it failed.
pub fn record_error(error: &TransferError) {
    let current_span = Span::current();
    current_span.record("error.type", format!("{:?}", error.kind()));
    current_span.record("error.message", error.to_string());
    current_span.record("otel.status_code", "ERROR");
}

/// Like [`record_error`] but for failures that are not a [`TransferError`].
pub fn record_error_with_context(
    error_type: &str,
    error_message: &str,
    additional_context: Option<&str>,
) {
    let current_span = Span::current();
    current_span.record("error.type", error_type);
    current_span.record("error.message", error_message);
    current_span.record("otel.status_code", "ERROR");

    if let Some(context) = additional_context {
        current_span.record("error.context", context);
    }
}
