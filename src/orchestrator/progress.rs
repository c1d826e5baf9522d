// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

use alloy_primitives::{TxHash, U256};

use super::state::{TransferState, TransferStatus};

/// Intermediate observation reported from inside a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEvent {
    ChainSwitchRequested { chain_id: u64, attempt: u32 },
    AllowanceSufficient { allowance: U256 },
    /// The allowance read failed; approval is performed anyway.
    AllowanceCheckFailed { reason: String },
    /// An approval for `amount` is about to be requested from the wallet.
    ApprovalRequired { amount: U256 },
    TransactionSubmitted { phase: TransferStatus, tx_hash: TxHash },
    /// The attestation is not available yet. This is normal for minutes.
    AttestationPending { attempt: u32, elapsed: Duration },
    AttestationReceived,
    MintSubmitted { tx_hash: TxHash },
}

/// Receives [`PhaseEvent`]s from the collaborators while a phase runs.
pub trait PhaseObserver: Send + Sync {
    fn on_phase_event(&self, event: PhaseEvent);
}

impl<F> PhaseObserver for F
where
    F: Fn(PhaseEvent) + Send + Sync,
{
    fn on_phase_event(&self, event: PhaseEvent) {
        self(event)
    }
}

/// Observer that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PhaseObserver for NoopObserver {
    fn on_phase_event(&self, _event: PhaseEvent) {}
}

/// One item of the progress stream returned by `subscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    /// State after the transition or observation.
    pub state: TransferState,
    /// Set for observations inside a phase; `None` for status transitions.
    pub note: Option<PhaseEvent>,
    /// `false` from burn submission on; cancelling then only stops waiting.
    pub cancel_safe: bool,
}
