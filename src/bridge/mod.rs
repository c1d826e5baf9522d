// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Burn, attestation and mint.
//!
//! A transfer is split at the burn: [`BurnExecutor`] moves value out of the
//! source chain, [`AttestationMintWaiter`] waits for Circle's attestation and
//! for the mint on the destination chain. Two interchangeable backends
//! implement both halves:
//!
//! - [`DirectBridge`] (CCTP v1): the orchestrator submits the mint itself.
//! - [`RelayedBridge`] (CCTP v2): a forwarding relayer mints; the mint is observed.

mod config;
mod direct;
mod poller;
mod relayed;

pub use config::PollingConfig;
pub use direct::DirectBridge;
pub use poller::{AttestationPoller, PollOutcome};
pub use relayed::RelayedBridge;

use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use tracing::{error, info};

use crate::chain::ChainConfig;
use crate::confirmation::{wait_for_receipt, ConfirmationConfig};
use crate::error::{Result, SignerError, TransferError};
use crate::orchestrator::{PhaseEvent, PhaseObserver, TransferStatus};
use crate::traits::{ChainSigner, Clock, TxReceipt};

/// A confirmed burn on the source chain.
///
/// Everything the second half of the transfer needs is kept here so the wait
/// can be resumed without touching the source chain again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnResult {
    pub tx_hash: TxHash,
    pub source_chain_id: u64,
    pub source_domain: u32,
    pub destination_chain_id: u64,
    pub destination_domain: u32,
    /// Amount burned, before any fast-transfer fee.
    pub amount: U256,
    pub sender: Address,
    pub recipient: Address,
    /// Raw `MessageSent` payload, when the backend extracts it at burn time.
    pub message: Option<Bytes>,
    pub message_hash: Option<B256>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintResult {
    pub tx_hash: TxHash,
    pub destination_chain_id: u64,
    /// `true` when a relayer submitted the mint and it was only observed.
    pub relayed: bool,
}

/// Snapshot of the second half of a transfer, from one non-blocking check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Pending,
    AttestationReady,
    MintSubmitted { tx_hash: TxHash },
    Minted { tx_hash: TxHash },
}

/// First half of a transfer.
///
/// Implementations submit exactly one burn per call and never retry it.
#[async_trait]
pub trait BurnExecutor: Send + Sync {
    async fn burn(
        &self,
        source: &ChainConfig,
        destination: &ChainConfig,
        signer: &dyn ChainSigner,
        amount: U256,
        recipient: Address,
        observer: &dyn PhaseObserver,
    ) -> Result<BurnResult>;
}

/// Second half of a transfer.
///
/// Observers receive [`PhaseEvent::AttestationReceived`] once the attestation is
/// in and [`PhaseEvent::MintSubmitted`] once a mint transaction is known.
#[async_trait]
pub trait AttestationMintWaiter: Send + Sync {
    /// Waits until the mint is confirmed. Safe to call again for the same
    /// burn after a timeout.
    async fn await_completion(
        &self,
        burn: &BurnResult,
        observer: &dyn PhaseObserver,
    ) -> Result<MintResult>;

    /// One attestation request, no waiting and no transactions.
    async fn check_status(&self, burn: &BurnResult) -> Result<CompletionStatus>;
}

/// A complete bridge strategy.
pub trait BridgeBackend: BurnExecutor + AttestationMintWaiter {}

impl<T: BurnExecutor + AttestationMintWaiter> BridgeBackend for T {}

/// Left-pads an EVM address into the `bytes32` recipient the messenger expects.
pub fn recipient_bytes32(address: Address) -> B256 {
    address.into_word()
}

/// Checks that `source.asset_address` has code on the signer's chain.
pub(crate) async fn ensure_asset_deployed(
    source: &ChainConfig,
    signer: &dyn ChainSigner,
) -> Result<()> {
    let code = signer.code_at(source.asset_address).await?;
    if code.is_empty() {
        error!(
            chain_id = source.chain_id,
            asset = %source.asset_address,
            event = "asset_contract_missing"
        );
        return Err(TransferError::AssetContractMissing {
            chain_id: source.chain_id,
            address: source.asset_address,
        });
    }
    Ok(())
}

/// Sends a built burn transaction and waits for its receipt.
pub(crate) async fn submit_burn(
    signer: &dyn ChainSigner,
    tx: alloy_rpc_types::TransactionRequest,
    clock: &dyn Clock,
    confirmation: &ConfirmationConfig,
    observer: &dyn PhaseObserver,
) -> Result<TxReceipt> {
    let tx_hash = signer.send_transaction(tx).await.map_err(|e| match e {
        SignerError::Rejected(reason) => TransferError::BurnRejected { reason },
        other => TransferError::BurnReverted {
            tx_hash: None,
            reason: other.to_string(),
        },
    })?;

    info!(tx_hash = %tx_hash, event = "burn_transaction_sent");
    observer.on_phase_event(PhaseEvent::TransactionSubmitted {
        phase: TransferStatus::Burning,
        tx_hash,
    });

    let receipt = wait_for_receipt(signer, clock, tx_hash, confirmation, TransferStatus::Burning)
        .await?;
    if !receipt.success {
        error!(tx_hash = %tx_hash, event = "burn_reverted");
        return Err(TransferError::BurnReverted {
            tx_hash: Some(tx_hash),
            reason: "depositForBurn transaction reverted".to_string(),
        });
    }

    info!(
        tx_hash = %tx_hash,
        block_number = ?receipt.block_number,
        event = "burn_confirmed"
    );
    Ok(receipt)
}
