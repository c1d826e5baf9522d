// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::fmt;

use alloy_primitives::TxHash;

use crate::error::{ErrorDetail, Result, TransferError};

/// Phase of a transfer. `Success` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferStatus {
    #[default]
    Idle,
    Approving,
    Burning,
    AwaitingAttestation,
    Minting,
    Success,
    Error,
}

impl TransferStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Phases during which a second `execute` is refused.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Approving | Self::Burning | Self::AwaitingAttestation | Self::Minting
        )
    }

    /// Whether stopping here leaves no value in flight.
    pub const fn is_cancel_safe(self) -> bool {
        matches!(self, Self::Idle | Self::Approving)
    }

    /// Legal moves of the transfer state machine.
    ///
    /// Forward moves follow the phase order (approval may be skipped), any
    /// non-terminal phase may fail, terminal states reset to `Idle`, and a
    /// failed wait can resume at `AwaitingAttestation`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        use TransferStatus::*;
        matches!(
            (self, next),
            (Idle, Approving)
                | (Idle, Burning)
                | (Approving, Burning)
                | (Burning, AwaitingAttestation)
                | (AwaitingAttestation, Minting)
                | (Minting, Success)
                | (Idle | Approving | Burning | AwaitingAttestation | Minting, Error)
                | (Success | Error, Idle)
                | (Error, AwaitingAttestation)
        )
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Approving => "approving",
            Self::Burning => "burning",
            Self::AwaitingAttestation => "awaiting attestation",
            Self::Minting => "minting",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Snapshot of the single transfer an orchestrator owns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferState {
    pub status: TransferStatus,
    pub approve_tx: Option<TxHash>,
    pub burn_tx: Option<TxHash>,
    pub mint_tx: Option<TxHash>,
    pub error: Option<ErrorDetail>,
}

impl TransferState {
    /// Moves to `next`, refusing moves outside the transition table.
    pub fn advance(&mut self, next: TransferStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(TransferError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if next == TransferStatus::Success && self.burn_tx.is_none() {
            return Err(TransferError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if next != TransferStatus::Error {
            self.error = None;
        }
        Ok(())
    }

    /// Records `error` and moves to `Error`.
    pub fn fail(&mut self, error: &TransferError) -> Result<()> {
        self.advance(TransferStatus::Error)?;
        self.error = Some(ErrorDetail::from(error));
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
