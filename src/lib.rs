// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! # cctp-orchestrator
//!
//! Drives a single cross-chain USDC transfer over Circle's Cross-Chain
//! Transfer Protocol (CCTP): approve, burn on the source chain, wait for the
//! attestation, mint on the destination chain.
//!
//! The orchestrator owns one [`TransferState`] at a time, refuses a second
//! transfer while one is in flight, and publishes every transition on a
//! progress stream. Chains, the wallet, the attestation service and time are
//! all reached through traits, so the same flow runs against real nodes or
//! the fakes in [`testing`].
//!
//! ## Quick Start (direct, CCTP v1)
//!
//! The orchestrator submits every transaction itself, including the mint.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use alloy_primitives::Address;
//! use alloy_provider::ProviderBuilder;
//! use cctp_orchestrator::providers::AlloyChainClient;
//! use cctp_orchestrator::{
//!     ChainRegistry, DirectBridge, EmbeddedSignerAdapter, IrisAttestationProvider,
//!     TransferOrchestrator, TransferRequest,
//! };
//!
//! # async fn example(sender: Address) -> Result<(), Box<dyn std::error::Error>> {
//! let sepolia = ProviderBuilder::new().connect("http://localhost:8545").await?;
//! let base_sepolia = ProviderBuilder::new().connect("http://localhost:8546").await?;
//!
//! let wallet = Arc::new(
//!     EmbeddedSignerAdapter::new(Arc::new(
//!         AlloyChainClient::new(sepolia, 11155111).with_account(sender),
//!     ))
//!     .with_signer(Arc::new(
//!         AlloyChainClient::new(base_sepolia, 84532).with_account(sender),
//!     )),
//! );
//!
//! let registry = Arc::new(ChainRegistry::v1_testnet());
//! let backend = DirectBridge::builder()
//!     .registry(registry.clone())
//!     .wallet(wallet.clone())
//!     .attestation(Arc::new(IrisAttestationProvider::sandbox()))
//!     .build();
//!
//! let orchestrator = TransferOrchestrator::builder()
//!     .registry(registry.clone())
//!     .wallet(wallet)
//!     .backend(Arc::new(backend))
//!     .build();
//!
//! let request = TransferRequest::from_form(&registry, 11155111, 84532, "10.5", sender, None)?;
//! let state = orchestrator.execute(request).await?;
//! println!("burn {:?}, mint {:?}", state.burn_tx, state.mint_tx);
//! # Ok(())
//! # }
//! ```
//!
//! ## Quick Start (relayed, CCTP v2)
//!
//! A forwarding relayer mints; the orchestrator only observes the mint.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cctp_orchestrator::{
//!     BurnOptions, ChainReader, FinalityThreshold, IrisAttestationProvider, PollingConfig,
//!     RelayedBridge,
//! };
//!
//! # fn example(base: Arc<dyn ChainReader>) {
//! let backend = RelayedBridge::builder()
//!     .attestation(Arc::new(IrisAttestationProvider::production()))
//!     .destination_readers([base])
//!     .polling(PollingConfig::fast_transfer())
//!     .burn_options(BurnOptions {
//!         finality: FinalityThreshold::Fast,
//!         ..Default::default()
//!     })
//!     .build();
//! # }
//! ```
//!
//! ## Errors and recovery
//!
//! Every [`TransferError`] names the phase it belongs to and a [`Recovery`]
//! hint. A burn is never resubmitted: once it is confirmed, failures of the
//! later phases are resolved by [`TransferOrchestrator::resume_attestation`],
//! which waits on the recorded burn again.
//!
//! ## Observability
//!
//! All operations log through `tracing` with an `event` field and run inside
//! the spans defined in [`spans`].

pub mod allowance;
pub mod bridge;
pub mod chain;
pub mod confirmation;
pub mod contracts;
mod error;
pub mod orchestrator;
pub mod protocol;
pub mod providers;
pub mod spans;
pub mod testing;
pub mod traits;
pub mod wallet;

pub use allowance::{AllowanceManager, AllowanceRecord, ApprovalAmount, ApprovalOutcome};
pub use bridge::{
    AttestationMintWaiter, BridgeBackend, BurnExecutor, BurnResult, CompletionStatus,
    DirectBridge, MintResult, PollingConfig, RelayedBridge,
};
pub use chain::{ChainConfig, ChainEntry, ChainRegistry};
pub use confirmation::ConfirmationConfig;
pub use contracts::BurnOptions;
pub use error::{ErrorDetail, ErrorKind, Recovery, Result, SignerError, TransferError};
pub use orchestrator::{
    CancelOutcome, NoopObserver, OrchestratorConfig, PhaseEvent, PhaseObserver,
    TransferOrchestrator, TransferProgress, TransferRequest, TransferState, TransferStatus,
};
pub use protocol::{
    AttestationLookup, AttestationResponse, AttestationStatus, DomainId, FinalityThreshold,
};
pub use providers::{AlloyChainClient, IrisAttestationProvider, TokioClock};
pub use traits::{AttestationProvider, ChainReader, ChainSigner, Clock, TxReceipt};
pub use wallet::{EmbeddedSignerAdapter, ExternalSignerAdapter, WalletAdapter};
