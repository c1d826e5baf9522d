// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Spending authorization for the source-chain messenger.
//!
//! The allowance is shared with anything else the owner signs, so it is read
//! fresh on every transfer and never cached.

use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use tracing::{info, warn, Instrument};

use crate::chain::ChainConfig;
use crate::confirmation::{wait_for_receipt, ConfirmationConfig};
use crate::contracts::Erc20Contract;
use crate::error::{Result, SignerError, TransferError};
use crate::orchestrator::{PhaseEvent, PhaseObserver, TransferStatus};
use crate::spans;
use crate::traits::{ChainReader, ChainSigner, Clock};

/// How much the approval transaction authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalAmount {
    /// Exactly the transfer amount.
    #[default]
    Exact,
    /// `U256::MAX`, so later transfers skip the approval.
    Unlimited,
}

impl ApprovalAmount {
    pub fn for_transfer(self, amount: U256) -> U256 {
        match self {
            Self::Exact => amount,
            Self::Unlimited => U256::MAX,
        }
    }
}

/// Allowance of `spender` over `owner`'s `asset` as read at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowanceRecord {
    pub owner: Address,
    pub spender: Address,
    pub asset: Address,
    /// `None` when the read failed.
    pub allowance: Option<U256>,
    pub read_error: Option<String>,
}

impl AllowanceRecord {
    /// A failed read never covers anything.
    pub fn covers(&self, amount: U256) -> bool {
        self.allowance.is_some_and(|allowance| allowance >= amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Nothing was submitted.
    AlreadySufficient { allowance: U256 },
    Approved {
        tx_hash: TxHash,
        approved: U256,
        /// The approval went out because the allowance could not be read.
        allowance_read_failed: bool,
    },
}

impl ApprovalOutcome {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::AlreadySufficient { .. } => None,
            Self::Approved { tx_hash, .. } => Some(*tx_hash),
        }
    }
}

/// Reads and raises the messenger's allowance on the source asset.
#[derive(Clone)]
pub struct AllowanceManager {
    approval_amount: ApprovalAmount,
    confirmation: ConfirmationConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AllowanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllowanceManager")
            .field("approval_amount", &self.approval_amount)
            .field("confirmation", &self.confirmation)
            .finish_non_exhaustive()
    }
}

impl AllowanceManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            approval_amount: ApprovalAmount::default(),
            confirmation: ConfirmationConfig::default(),
            clock,
        }
    }

    pub fn with_approval_amount(mut self, approval_amount: ApprovalAmount) -> Self {
        self.approval_amount = approval_amount;
        self
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Reads the current allowance. Never fails: a failed read is recorded in
    /// the returned record and logged.
    pub async fn read_allowance(
        &self,
        source: &ChainConfig,
        reader: &dyn ChainReader,
        owner: Address,
    ) -> AllowanceRecord {
        let asset = Erc20Contract::new(source.asset_address);
        let spender = source.messenger_address;

        let result = match reader.call(asset.allowance_call(owner, spender)).await {
            Ok(output) => asset.decode_allowance(&output),
            Err(e) => Err(e),
        };

        let (allowance, read_error) = match result {
            Ok(allowance) => (Some(allowance), None),
            Err(e) => {
                warn!(
                    chain_id = source.chain_id,
                    asset = %source.asset_address,
                    error = %e,
                    event = "allowance_read_failed"
                );
                (None, Some(e.to_string()))
            }
        };

        AllowanceRecord {
            owner,
            spender,
            asset: source.asset_address,
            allowance,
            read_error,
        }
    }

    /// Submits an approval for the messenger and waits until it is mined.
    pub async fn approve(
        &self,
        source: &ChainConfig,
        signer: &dyn ChainSigner,
        amount: U256,
        observer: &dyn PhaseObserver,
    ) -> Result<(TxHash, U256)> {
        let approved = self.approval_amount.for_transfer(amount);
        let tx = Erc20Contract::new(source.asset_address).approve_transaction(
            signer.address(),
            source.messenger_address,
            approved,
        );

        let tx_hash = signer.send_transaction(tx).await.map_err(|e| match e {
            SignerError::Rejected(reason) => TransferError::ApprovalRejected { reason },
            other => TransferError::ApprovalReverted {
                tx_hash: None,
                reason: other.to_string(),
            },
        })?;

        info!(tx_hash = %tx_hash, approved = %approved, event = "approval_transaction_sent");
        observer.on_phase_event(PhaseEvent::TransactionSubmitted {
            phase: TransferStatus::Approving,
            tx_hash,
        });

        let receipt = wait_for_receipt(
            signer,
            self.clock.as_ref(),
            tx_hash,
            &self.confirmation,
            TransferStatus::Approving,
        )
        .await?;

        if !receipt.success {
            return Err(TransferError::ApprovalReverted {
                tx_hash: Some(tx_hash),
                reason: "approve transaction reverted".to_string(),
            });
        }

        info!(tx_hash = %tx_hash, event = "approval_confirmed");
        Ok((tx_hash, approved))
    }

    /// Approves only when the current allowance does not cover `amount`.
    pub async fn ensure_approval(
        &self,
        source: &ChainConfig,
        signer: &dyn ChainSigner,
        amount: U256,
        observer: &dyn PhaseObserver,
    ) -> Result<ApprovalOutcome> {
        let span = spans::ensure_approval(
            source.chain_id,
            &signer.address(),
            &source.messenger_address,
            &amount,
        );

        async move {
            let record = self.read_allowance(source, signer, signer.address()).await;
            if let Some(allowance) = record.allowance.filter(|_| record.covers(amount)) {
                info!(allowance = %allowance, event = "allowance_sufficient");
                observer.on_phase_event(PhaseEvent::AllowanceSufficient { allowance });
                return Ok(ApprovalOutcome::AlreadySufficient { allowance });
            }
            if let Some(reason) = &record.read_error {
                observer.on_phase_event(PhaseEvent::AllowanceCheckFailed {
                    reason: reason.clone(),
                });
            }
            observer.on_phase_event(PhaseEvent::ApprovalRequired { amount });

            match self.approve(source, signer, amount, observer).await {
                Ok((tx_hash, approved)) => Ok(ApprovalOutcome::Approved {
                    tx_hash,
                    approved,
                    allowance_read_failed: record.read_error.is_some(),
                }),
                Err(e) => {
                    spans::record_error(&e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}
