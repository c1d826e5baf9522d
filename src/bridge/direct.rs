// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::{keccak256, Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use bon::Builder;
use tracing::{error, info, warn, Instrument};

use super::poller::{AttestationPoller, PollOutcome};
use super::{
    ensure_asset_deployed, recipient_bytes32, submit_burn, AttestationMintWaiter, BurnExecutor,
    BurnResult, CompletionStatus, MintResult, PollingConfig,
};
use crate::chain::{ChainConfig, ChainRegistry};
use crate::confirmation::{wait_for_receipt, ConfirmationConfig};
use crate::contracts::{extract_message_sent, MessageTransmitterContract, TokenMessengerContract};
use crate::error::{Result, TransferError};
use crate::orchestrator::{PhaseEvent, PhaseObserver, TransferStatus};
use crate::protocol::{message_domains, AttestationLookup};
use crate::providers::TokioClock;
use crate::spans;
use crate::traits::{AttestationProvider, ChainSigner, Clock};
use crate::wallet::{ensure_active_chain, ChainSwitchPolicy, WalletAdapter};

fn default_clock() -> Arc<dyn Clock> {
    Arc::new(TokioClock::new())
}

/// CCTP v1 backend that drives every transaction itself.
///
/// The burn's `MessageSent` payload is hashed to look up the attestation, and
/// the mint is submitted as `receiveMessage` through the wallet's signer for
/// the destination chain, switching the wallet there first.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use cctp_orchestrator::{ChainRegistry, DirectBridge, EmbeddedSignerAdapter, IrisAttestationProvider};
///
/// # fn example(wallet: Arc<EmbeddedSignerAdapter>) {
/// let bridge = DirectBridge::builder()
///     .registry(Arc::new(ChainRegistry::v1_testnet()))
///     .wallet(wallet)
///     .attestation(Arc::new(IrisAttestationProvider::sandbox()))
///     .build();
/// # }
/// ```
#[derive(Builder)]
pub struct DirectBridge {
    registry: Arc<ChainRegistry>,
    wallet: Arc<dyn WalletAdapter>,
    attestation: Arc<dyn AttestationProvider>,
    #[builder(default = default_clock())]
    clock: Arc<dyn Clock>,
    #[builder(default)]
    polling: PollingConfig,
    #[builder(default)]
    confirmation: ConfirmationConfig,
    #[builder(default)]
    chain_switch: ChainSwitchPolicy,
    /// Latest mints this bridge submitted, oldest first.
    #[builder(skip)]
    mints: Mutex<VecDeque<RecordedMint>>,
}

/// Mints remembered for [`AttestationMintWaiter::check_status`]; older ones
/// fall back to polling the attestation service.
const RECORDED_MINTS: usize = 16;

#[derive(Debug, Clone, Copy)]
struct RecordedMint {
    burn_tx: TxHash,
    mint_tx: TxHash,
    confirmed: bool,
}

impl DirectBridge {
    fn poller(&self) -> AttestationPoller<dyn AttestationProvider> {
        AttestationPoller::new(
            Arc::clone(&self.attestation),
            Arc::clone(&self.clock),
            self.polling,
        )
    }

    fn record_mint(&self, burn_tx: TxHash, mint_tx: TxHash, confirmed: bool) {
        let mut mints = self.mints.lock().unwrap_or_else(PoisonError::into_inner);
        mints.retain(|mint| mint.burn_tx != burn_tx);
        if mints.len() == RECORDED_MINTS {
            mints.pop_front();
        }
        mints.push_back(RecordedMint {
            burn_tx,
            mint_tx,
            confirmed,
        });
    }

    fn recorded_mint(&self, burn_tx: TxHash) -> Option<(TxHash, bool)> {
        self.mints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|mint| mint.burn_tx == burn_tx)
            .map(|mint| (mint.mint_tx, mint.confirmed))
    }

    fn burn_message(burn: &BurnResult) -> Result<(Bytes, B256)> {
        match (&burn.message, burn.message_hash) {
            (Some(message), Some(hash)) => Ok((message.clone(), hash)),
            _ => Err(TransferError::AttestationFailed {
                reason: format!("burn {} carries no MessageSent payload", burn.tx_hash),
            }),
        }
    }

    async fn mint(
        &self,
        burn: &BurnResult,
        message: Bytes,
        message_hash: B256,
        attestation: Bytes,
        observer: &dyn PhaseObserver,
    ) -> Result<MintResult> {
        let destination = self.registry.resolve(burn.destination_chain_id)?;
        let not_submitted = |reason: String| TransferError::MintNotSubmitted {
            burn_tx: burn.tx_hash,
            reason,
        };

        ensure_active_chain(
            self.wallet.as_ref(),
            destination.chain_id,
            &self.chain_switch,
            self.clock.as_ref(),
            observer,
        )
        .await
        .map_err(|e| not_submitted(e.to_string()))?;

        let signer = self
            .wallet
            .signer(destination.chain_id)
            .await
            .map_err(|e| not_submitted(e.to_string()))?;

        let span = spans::receive_message(&message_hash, destination.chain_id, attestation.len());
        async move {
            let tx = MessageTransmitterContract::new(destination.transmitter_address)
                .receive_message_transaction(signer.address(), message, attestation);
            let tx_hash = signer
                .send_transaction(tx)
                .await
                .map_err(|e| not_submitted(e.to_string()))?;

            info!(tx_hash = %tx_hash, event = "mint_transaction_sent");
            self.record_mint(burn.tx_hash, tx_hash, false);
            observer.on_phase_event(PhaseEvent::MintSubmitted { tx_hash });

            let receipt = wait_for_receipt(
                signer.as_ref(),
                self.clock.as_ref(),
                tx_hash,
                &self.confirmation,
                TransferStatus::Minting,
            )
            .await?;
            if !receipt.success {
                let err = TransferError::MintReverted {
                    tx_hash: Some(tx_hash),
                    reason: "receiveMessage transaction reverted".to_string(),
                };
                spans::record_error(&err);
                error!(tx_hash = %tx_hash, event = "mint_reverted");
                return Err(err);
            }

            self.record_mint(burn.tx_hash, tx_hash, true);
            info!(tx_hash = %tx_hash, event = "mint_confirmed");
            Ok(MintResult {
                tx_hash,
                destination_chain_id: destination.chain_id,
                relayed: false,
            })
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl BurnExecutor for DirectBridge {
    async fn burn(
        &self,
        source: &ChainConfig,
        destination: &ChainConfig,
        signer: &dyn ChainSigner,
        amount: U256,
        recipient: Address,
        observer: &dyn PhaseObserver,
    ) -> Result<BurnResult> {
        ensure_asset_deployed(source, signer).await?;

        let tx = TokenMessengerContract::new(source.messenger_address).deposit_for_burn_transaction(
            signer.address(),
            recipient_bytes32(recipient),
            destination.domain_id,
            source.asset_address,
            amount,
        );
        let receipt = submit_burn(
            signer,
            tx,
            self.clock.as_ref(),
            &self.confirmation,
            observer,
        )
        .await?;

        let message = extract_message_sent(&receipt.logs).ok_or_else(|| {
            error!(tx_hash = %receipt.tx_hash, event = "message_sent_event_missing");
            TransferError::AttestationFailed {
                reason: format!("burn {} emitted no MessageSent event", receipt.tx_hash),
            }
        })?;

        let expected = (source.domain_id, destination.domain_id);
        if message_domains(&message) != Some(expected) {
            warn!(
                tx_hash = %receipt.tx_hash,
                expected = ?expected,
                actual = ?message_domains(&message),
                event = "message_domain_mismatch"
            );
        }

        let message_hash = keccak256(&message);
        info!(message_hash = %message_hash, event = "message_sent_event_extracted");

        Ok(BurnResult {
            tx_hash: receipt.tx_hash,
            source_chain_id: source.chain_id,
            source_domain: source.domain_id,
            destination_chain_id: destination.chain_id,
            destination_domain: destination.domain_id,
            amount,
            sender: signer.address(),
            recipient,
            message: Some(message),
            message_hash: Some(message_hash),
        })
    }
}

#[async_trait]
impl AttestationMintWaiter for DirectBridge {
    async fn await_completion(
        &self,
        burn: &BurnResult,
        observer: &dyn PhaseObserver,
    ) -> Result<MintResult> {
        let (message, message_hash) = Self::burn_message(burn)?;

        let response = self
            .poller()
            .wait_for_attestation(
                AttestationLookup::MessageHash(message_hash),
                burn.tx_hash,
                observer,
            )
            .await?;
        let attestation = response.ready_attestation().cloned().ok_or_else(|| {
            TransferError::AttestationFailed {
                reason: "attestation marked complete without signature bytes".to_string(),
            }
        })?;
        observer.on_phase_event(PhaseEvent::AttestationReceived);

        self.mint(burn, message, message_hash, attestation, observer)
            .await
    }

    async fn check_status(&self, burn: &BurnResult) -> Result<CompletionStatus> {
        if let Some((tx_hash, confirmed)) = self.recorded_mint(burn.tx_hash) {
            return Ok(if confirmed {
                CompletionStatus::Minted { tx_hash }
            } else {
                CompletionStatus::MintSubmitted { tx_hash }
            });
        }

        let (_, message_hash) = Self::burn_message(burn)?;
        let outcome = self
            .poller()
            .poll_once(AttestationLookup::MessageHash(message_hash), |response| {
                response.ready_attestation().is_some()
            })
            .await?;

        Ok(match outcome {
            PollOutcome::Ready(_) => CompletionStatus::AttestationReady,
            PollOutcome::Pending(_) | PollOutcome::Throttled(_) => CompletionStatus::Pending,
        })
    }
}
