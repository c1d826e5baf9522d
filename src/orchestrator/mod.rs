// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! The transfer state machine and the single-transfer orchestrator driving it.

mod config;
mod progress;
mod request;
mod state;
mod transfer;

pub use config::{OrchestratorConfig, MAX_PROGRESS_CAPACITY};
pub use progress::{NoopObserver, PhaseEvent, PhaseObserver, TransferProgress};
pub use request::TransferRequest;
pub use state::{TransferState, TransferStatus};
pub use transfer::{CancelOutcome, TransferOrchestrator};
