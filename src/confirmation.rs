// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Waiting for submitted transactions to be mined.

use alloy_primitives::TxHash;
use std::time::Duration;
use tracing::{debug, warn, Instrument};

use crate::error::{Result, TransferError};
use crate::orchestrator::TransferStatus;
use crate::spans;
use crate::traits::{ChainReader, Clock, TxReceipt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationConfig {
    pub poll_interval: Duration,
    /// Give up after this long without a sufficiently confirmed receipt.
    pub timeout: Duration,
    /// Blocks including the one the transaction landed in; `1` accepts any receipt.
    pub required_confirmations: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
            required_confirmations: 1,
        }
    }
}

impl ConfirmationConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations.max(1);
        self
    }
}

/// Outcome of a single receipt check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationResult {
    /// No receipt yet.
    Pending,
    /// Mined, but fewer confirmations than required.
    WaitingConfirmations(u64),
    Confirmed(TxReceipt),
    /// Mined and reverted. Reported without waiting for confirmations.
    Failed(TxReceipt),
}

pub async fn check_confirmation<R: ChainReader + ?Sized>(
    reader: &R,
    tx_hash: TxHash,
    required_confirmations: u64,
) -> Result<ConfirmationResult> {
    let Some(receipt) = reader.transaction_receipt(tx_hash).await? else {
        return Ok(ConfirmationResult::Pending);
    };

    if !receipt.success {
        return Ok(ConfirmationResult::Failed(receipt));
    }

    if required_confirmations <= 1 {
        return Ok(ConfirmationResult::Confirmed(receipt));
    }

    let Some(tx_block) = receipt.block_number else {
        return Ok(ConfirmationResult::Pending);
    };
    let current_block = reader.block_number().await?;
    let confirmations = current_block.saturating_sub(tx_block) + 1;

    if confirmations >= required_confirmations {
        Ok(ConfirmationResult::Confirmed(receipt))
    } else {
        Ok(ConfirmationResult::WaitingConfirmations(confirmations))
    }
}

/// Polls until `tx_hash` is mined (successfully or not) with enough confirmations.
///
/// Returns the receipt either way; callers turn `success == false` into their
/// phase's revert error. RPC errors while polling are logged and retried until
/// the timeout, which yields `ConfirmationTimeout` tagged with `phase`.
pub async fn wait_for_receipt<R: ChainReader + ?Sized>(
    reader: &R,
    clock: &dyn Clock,
    tx_hash: TxHash,
    config: &ConfirmationConfig,
    phase: TransferStatus,
) -> Result<TxReceipt> {
    let span =
        spans::wait_for_confirmation(tx_hash, reader.chain_id(), config.required_confirmations);

    async move {
        let started = clock.now();
        loop {
            match check_confirmation(reader, tx_hash, config.required_confirmations).await {
                Ok(
                    ConfirmationResult::Confirmed(receipt) | ConfirmationResult::Failed(receipt),
                ) => {
                    debug!(
                        success = receipt.success,
                        block_number = ?receipt.block_number,
                        event = "transaction_mined"
                    );
                    return Ok(receipt);
                }
                Ok(ConfirmationResult::WaitingConfirmations(confirmations)) => {
                    debug!(confirmations, event = "awaiting_confirmations");
                }
                Ok(ConfirmationResult::Pending) => {}
                Err(e) => {
                    warn!(error = %e, event = "receipt_poll_failed");
                }
            }

            let elapsed = clock.now().saturating_duration_since(started);
            if elapsed >= config.timeout {
                return Err(TransferError::ConfirmationTimeout {
                    phase,
                    tx_hash,
                    timeout_secs: config.timeout.as_secs(),
                });
            }
            clock.sleep(config.poll_interval.min(config.timeout - elapsed)).await;
        }
    }
    .instrument(span)
    .await
}
