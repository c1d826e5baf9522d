// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use alloy_primitives::{Address, TxHash};
use thiserror::Error;

use crate::orchestrator::TransferStatus;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid request ({field}): {reason}")]
    InvalidRequest { field: &'static str, reason: String },

    #[error("Chain {chain_id} is not configured for bridging")]
    UnconfiguredChain { chain_id: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Wallet did not switch to chain {chain_id} after {attempts} attempt(s): {reason}")]
    ChainSwitchFailed {
        chain_id: u64,
        attempts: u32,
        reason: String,
    },

    #[error("Approval rejected by signer: {reason}")]
    ApprovalRejected { reason: String },

    #[error("Approval reverted: {reason}")]
    ApprovalReverted {
        tx_hash: Option<TxHash>,
        reason: String,
    },

    #[error("No asset contract deployed at {address} on chain {chain_id}")]
    AssetContractMissing { chain_id: u64, address: Address },

    #[error("Burn rejected by signer: {reason}")]
    BurnRejected { reason: String },

    #[error("Burn reverted: {reason}")]
    BurnReverted {
        tx_hash: Option<TxHash>,
        reason: String,
    },

    #[error("Timed out after {elapsed_secs}s waiting for the attestation of burn {burn_tx}")]
    AttestationTimeout { burn_tx: TxHash, elapsed_secs: u64 },

    #[error("Attestation failed: {reason}")]
    AttestationFailed { reason: String },

    #[error("Mint reverted: {reason}")]
    MintReverted {
        tx_hash: Option<TxHash>,
        reason: String,
    },

    #[error("Mint for burn {burn_tx} was not submitted: {reason}")]
    MintNotSubmitted { burn_tx: TxHash, reason: String },

    #[error("Mint for burn {burn_tx} not observed after {elapsed_secs}s")]
    MintNotObserved { burn_tx: TxHash, elapsed_secs: u64 },

    #[error("Transaction {tx_hash} not confirmed within {timeout_secs}s")]
    ConfirmationTimeout {
        phase: TransferStatus,
        tx_hash: TxHash,
        timeout_secs: u64,
    },

    #[error("A transfer is already in progress (status: {status})")]
    TransferAlreadyInProgress { status: TransferStatus },

    #[error("Burn {burn_tx} still awaits its mint; resume it or reset before a new transfer")]
    UnresolvedBurn { burn_tx: TxHash },

    #[error("Transfer cancelled while {phase}")]
    Cancelled { phase: TransferStatus },

    #[error("Stopped waiting on burn {burn_tx} while {phase}; the burn stands and the wait can be resumed")]
    WaitAbandoned {
        phase: TransferStatus,
        burn_tx: TxHash,
    },

    #[error("Illegal status transition {from} -> {to}")]
    InvalidTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    #[error("Nothing to resume: {reason}")]
    NothingToResume { reason: String },

    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("Attestation not found (will retry)")]
    AttestationNotFound,

    #[error("Invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("ABI encoding/decoding error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TransferError>;

/// Copyable discriminant of [`TransferError`], suitable for storing in state snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    UnconfiguredChain,
    InvalidConfig,
    ChainSwitchFailed,
    ApprovalRejected,
    ApprovalReverted,
    AssetContractMissing,
    BurnRejected,
    BurnReverted,
    AttestationTimeout,
    AttestationFailed,
    MintReverted,
    MintNotSubmitted,
    MintNotObserved,
    ConfirmationTimeout,
    TransferAlreadyInProgress,
    UnresolvedBurn,
    Cancelled,
    WaitAbandoned,
    InvalidTransition,
    NothingToResume,
    RateLimitExceeded,
    AttestationNotFound,
    InvalidUrl,
    Provider,
    Network,
    Abi,
    Json,
}

/// What the caller should do about a failed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recovery {
    /// Nothing moved on-chain that needs follow-up; submit a fresh request.
    StartNewTransfer,
    /// The burn is final; waiting longer and calling `resume_attestation` completes it.
    WaitAndResume,
    /// The chain registry or deployment is wrong; retrying will fail the same way.
    FixConfiguration,
    /// Transient condition; the same call can be repeated later.
    RetryLater,
    /// A transaction's fate is unknown or the protocol reported an inconsistency.
    /// Inspect it before submitting anything else.
    ManualReview,
    None,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::UnconfiguredChain { .. } => ErrorKind::UnconfiguredChain,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::ChainSwitchFailed { .. } => ErrorKind::ChainSwitchFailed,
            Self::ApprovalRejected { .. } => ErrorKind::ApprovalRejected,
            Self::ApprovalReverted { .. } => ErrorKind::ApprovalReverted,
            Self::AssetContractMissing { .. } => ErrorKind::AssetContractMissing,
            Self::BurnRejected { .. } => ErrorKind::BurnRejected,
            Self::BurnReverted { .. } => ErrorKind::BurnReverted,
            Self::AttestationTimeout { .. } => ErrorKind::AttestationTimeout,
            Self::AttestationFailed { .. } => ErrorKind::AttestationFailed,
            Self::MintReverted { .. } => ErrorKind::MintReverted,
            Self::MintNotSubmitted { .. } => ErrorKind::MintNotSubmitted,
            Self::MintNotObserved { .. } => ErrorKind::MintNotObserved,
            Self::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            Self::TransferAlreadyInProgress { .. } => ErrorKind::TransferAlreadyInProgress,
            Self::UnresolvedBurn { .. } => ErrorKind::UnresolvedBurn,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::WaitAbandoned { .. } => ErrorKind::WaitAbandoned,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::NothingToResume { .. } => ErrorKind::NothingToResume,
            Self::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            Self::AttestationNotFound => ErrorKind::AttestationNotFound,
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::Provider(_) => ErrorKind::Provider,
            Self::Network(_) => ErrorKind::Network,
            Self::Abi(_) => ErrorKind::Abi,
            Self::Json(_) => ErrorKind::Json,
        }
    }

    /// The transfer phase this error belongs to, if it is bound to one.
    pub fn phase(&self) -> Option<TransferStatus> {
        match self {
            Self::ChainSwitchFailed { .. } => Some(TransferStatus::Idle),
            Self::ApprovalRejected { .. } | Self::ApprovalReverted { .. } => {
                Some(TransferStatus::Approving)
            }
            Self::AssetContractMissing { .. }
            | Self::BurnRejected { .. }
            | Self::BurnReverted { .. } => Some(TransferStatus::Burning),
            Self::AttestationTimeout { .. } | Self::AttestationFailed { .. } => {
                Some(TransferStatus::AwaitingAttestation)
            }
            Self::MintReverted { .. }
            | Self::MintNotSubmitted { .. }
            | Self::MintNotObserved { .. } => Some(TransferStatus::Minting),
            Self::ConfirmationTimeout { phase, .. }
            | Self::Cancelled { phase }
            | Self::WaitAbandoned { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            Self::InvalidRequest { .. }
            | Self::ChainSwitchFailed { .. }
            | Self::ApprovalRejected { .. }
            | Self::ApprovalReverted { .. }
            | Self::BurnRejected { .. }
            | Self::BurnReverted { .. }
            | Self::Cancelled { .. } => Recovery::StartNewTransfer,
            Self::UnconfiguredChain { .. }
            | Self::InvalidConfig(_)
            | Self::AssetContractMissing { .. } => Recovery::FixConfiguration,
            Self::AttestationTimeout { .. }
            | Self::UnresolvedBurn { .. }
            | Self::MintNotSubmitted { .. }
            | Self::MintNotObserved { .. } => Recovery::WaitAndResume,
            // A mint may already be in flight once the wait reached Minting.
            Self::WaitAbandoned { phase, .. } => match phase {
                TransferStatus::AwaitingAttestation => Recovery::WaitAndResume,
                _ => Recovery::ManualReview,
            },
            // An unconfirmed approval moved no value; an unconfirmed burn or mint might have.
            Self::ConfirmationTimeout { phase, .. } => match phase {
                TransferStatus::Approving => Recovery::StartNewTransfer,
                _ => Recovery::ManualReview,
            },
            Self::AttestationFailed { .. } | Self::MintReverted { .. } => Recovery::ManualReview,
            Self::TransferAlreadyInProgress { .. }
            | Self::RateLimitExceeded { .. }
            | Self::AttestationNotFound
            | Self::Provider(_)
            | Self::Network(_) => Recovery::RetryLater,
            Self::InvalidTransition { .. }
            | Self::NothingToResume { .. }
            | Self::InvalidUrl { .. }
            | Self::Abi(_)
            | Self::Json(_) => Recovery::None,
        }
    }

    pub(crate) fn invalid_request(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field,
            reason: reason.into(),
        }
    }
}

/// Cloneable snapshot of a [`TransferError`] kept in [`crate::TransferState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub phase: Option<TransferStatus>,
    pub message: String,
    pub recovery: Recovery,
}

impl From<&TransferError> for ErrorDetail {
    fn from(error: &TransferError) -> Self {
        Self {
            kind: error.kind(),
            phase: error.phase(),
            message: error.to_string(),
            recovery: error.recovery(),
        }
    }
}

/// Failures reported by a [`crate::ChainSigner`] or [`crate::WalletAdapter`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The user declined to sign (EIP-1193 code 4001).
    #[error("user rejected the request: {0}")]
    Rejected(String),

    #[error("wallet is on chain {active}, not {requested}")]
    WrongChain { requested: u64, active: u64 },

    #[error("wallet has no signer for chain {0}")]
    UnknownChain(u64),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl SignerError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
