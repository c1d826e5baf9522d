// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::TxHash;
use bon::bon;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn, Instrument};

use super::config::{OrchestratorConfig, MAX_PROGRESS_CAPACITY};
use super::progress::{PhaseEvent, PhaseObserver, TransferProgress};
use super::request::TransferRequest;
use super::state::{TransferState, TransferStatus};
use crate::allowance::AllowanceManager;
use crate::bridge::{BridgeBackend, BurnResult, CompletionStatus, MintResult};
use crate::chain::ChainRegistry;
use crate::error::{Recovery, Result, TransferError};
use crate::providers::TokioClock;
use crate::spans;
use crate::traits::Clock;
use crate::wallet::{ensure_active_chain, WalletAdapter};

/// Answer to [`TransferOrchestrator::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Stopped before any value moved. At most an approval was left on-chain.
    Cancelled,
    /// The burn is being submitted and cannot be interrupted.
    Rejected,
    /// The burn stands; only the wait for attestation and mint was stopped.
    /// [`TransferOrchestrator::resume_attestation`] picks it up again.
    StoppedWaiting { burn_tx: Option<TxHash> },
    NotRunning,
}

#[derive(Default)]
struct Inner {
    state: TransferState,
    running: bool,
    cancel: Option<watch::Sender<bool>>,
    last_burn: Option<BurnResult>,
}

/// Drives one transfer at a time through approve, burn, attestation and mint.
///
/// Progress is published on a broadcast channel (see
/// [`TransferOrchestrator::subscribe`]); every status transition and every
/// intermediate observation carries a full [`TransferState`] snapshot.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use cctp_orchestrator::{
///     ChainRegistry, DirectBridge, EmbeddedSignerAdapter, IrisAttestationProvider,
///     TransferOrchestrator, TransferRequest,
/// };
///
/// # async fn example(wallet: Arc<EmbeddedSignerAdapter>, request: TransferRequest) -> cctp_orchestrator::Result<()> {
/// let registry = Arc::new(ChainRegistry::v1_testnet());
/// let backend = DirectBridge::builder()
///     .registry(registry.clone())
///     .wallet(wallet.clone())
///     .attestation(Arc::new(IrisAttestationProvider::sandbox()))
///     .build();
///
/// let orchestrator = TransferOrchestrator::builder()
///     .registry(registry)
///     .wallet(wallet)
///     .backend(Arc::new(backend))
///     .build();
///
/// let mut progress = orchestrator.subscribe();
/// tokio::spawn(async move {
///     while let Ok(update) = progress.recv().await {
///         println!("{}", update.state.status);
///     }
/// });
///
/// let state = orchestrator.execute(request).await?;
/// println!("minted in {:?}", state.mint_tx);
/// # Ok(())
/// # }
/// ```
pub struct TransferOrchestrator {
    registry: Arc<ChainRegistry>,
    wallet: Arc<dyn WalletAdapter>,
    backend: Arc<dyn BridgeBackend>,
    clock: Arc<dyn Clock>,
    allowance: AllowanceManager,
    config: OrchestratorConfig,
    inner: Mutex<Inner>,
    progress: broadcast::Sender<TransferProgress>,
}

#[bon]
impl TransferOrchestrator {
    #[builder]
    pub fn new(
        registry: Arc<ChainRegistry>,
        wallet: Arc<dyn WalletAdapter>,
        backend: Arc<dyn BridgeBackend>,
        clock: Option<Arc<dyn Clock>>,
        #[builder(default)] config: OrchestratorConfig,
    ) -> Self {
        let clock = clock.unwrap_or_else(|| Arc::new(TokioClock::new()));
        let allowance = AllowanceManager::new(Arc::clone(&clock))
            .with_approval_amount(config.approval_amount)
            .with_confirmation(config.confirmation.clone());
        let (progress, _) =
            broadcast::channel(config.progress_capacity.clamp(1, MAX_PROGRESS_CAPACITY));

        Self {
            registry,
            wallet,
            backend,
            clock,
            allowance,
            config,
            inner: Mutex::new(Inner::default()),
            progress,
        }
    }
}

impl TransferOrchestrator {
    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransferProgress> {
        self.progress.subscribe()
    }

    pub fn current_state(&self) -> TransferState {
        self.lock().state.clone()
    }

    /// The confirmed burn of the current or last transfer, if it got that far.
    pub fn last_burn(&self) -> Option<BurnResult> {
        self.lock().last_burn.clone()
    }

    /// Runs `request` to a terminal state.
    ///
    /// Validation failures and a transfer already in flight are reported
    /// without touching the current state. Every other failure leaves the
    /// state in `Error` and is also returned here.
    pub async fn execute(&self, request: TransferRequest) -> Result<TransferState> {
        request.validate(&self.registry)?;
        let mut cancel = self.begin()?;

        let span = spans::execute_transfer(
            request.source.chain_id,
            request.destination.chain_id,
            &request.amount,
            &request.sender,
            &request.recipient_address(),
        );
        let result = async {
            let result = self.run(&request, &mut cancel).await;
            if let Err(e) = &result {
                spans::record_error(e);
            }
            result
        }
        .instrument(span)
        .await;

        self.finish(result)
    }

    /// Picks up the wait for attestation and mint of the last burn after a
    /// timeout or [`CancelOutcome::StoppedWaiting`]. Never burns again.
    pub async fn resume_attestation(&self) -> Result<TransferState> {
        let (burn, mut cancel) = {
            let mut inner = self.lock();
            if inner.running || inner.state.status.is_active() {
                return Err(TransferError::TransferAlreadyInProgress {
                    status: inner.state.status,
                });
            }
            if inner.state.status != TransferStatus::Error {
                return Err(TransferError::NothingToResume {
                    reason: format!("transfer is {}", inner.state.status),
                });
            }
            let Some(burn) = inner.last_burn.clone() else {
                return Err(TransferError::NothingToResume {
                    reason: "no confirmed burn recorded".to_string(),
                });
            };
            let recovery = inner.state.error.as_ref().map(|detail| detail.recovery);
            if recovery != Some(Recovery::WaitAndResume) {
                return Err(TransferError::NothingToResume {
                    reason: "the last failure is not resolved by waiting".to_string(),
                });
            }

            inner.state.advance(TransferStatus::AwaitingAttestation)?;
            let (tx, rx) = watch::channel(false);
            inner.running = true;
            inner.cancel = Some(tx);
            self.publish(&inner.state, None);
            (burn, rx)
        };

        info!(burn_tx = %burn.tx_hash, event = "attestation_wait_resumed");
        let span = spans::execute_transfer(
            burn.source_chain_id,
            burn.destination_chain_id,
            &burn.amount,
            &burn.sender,
            &burn.recipient,
        );
        let result = async {
            let result = self.wait_for_mint(&burn, &mut cancel).await;
            if let Err(e) = &result {
                spans::record_error(e);
            }
            result
        }
        .instrument(span)
        .await;

        self.finish(result)
    }

    /// Stops the running transfer where that is safe. See [`CancelOutcome`].
    pub fn cancel(&self) -> CancelOutcome {
        let inner = self.lock();
        if !inner.running {
            return CancelOutcome::NotRunning;
        }

        let outcome = match inner.state.status {
            TransferStatus::Idle | TransferStatus::Approving => CancelOutcome::Cancelled,
            TransferStatus::Burning => CancelOutcome::Rejected,
            TransferStatus::AwaitingAttestation | TransferStatus::Minting => {
                CancelOutcome::StoppedWaiting {
                    burn_tx: inner.state.burn_tx,
                }
            }
            TransferStatus::Success | TransferStatus::Error => CancelOutcome::NotRunning,
        };

        if matches!(
            outcome,
            CancelOutcome::Cancelled | CancelOutcome::StoppedWaiting { .. }
        ) {
            if let Some(tx) = &inner.cancel {
                tx.send_replace(true);
            }
        }
        info!(status = %inner.state.status, outcome = ?outcome, event = "cancel_requested");
        outcome
    }

    /// Returns a finished transfer to `Idle`, forgetting its burn.
    ///
    /// This is the only way to start over while a burn still awaits its mint;
    /// `execute` refuses with [`TransferError::UnresolvedBurn`] until then.
    pub fn reset(&self) -> Result<TransferState> {
        let mut inner = self.lock();
        if inner.running {
            return Err(TransferError::TransferAlreadyInProgress {
                status: inner.state.status,
            });
        }
        if inner.state.status != TransferStatus::Idle {
            if let Some(burn_tx) = Self::resumable_burn(&inner) {
                warn!(burn_tx = %burn_tx, event = "resumable_burn_discarded");
            }
            inner.state.advance(TransferStatus::Idle)?;
            inner.state = TransferState::default();
            inner.last_burn = None;
            self.publish(&inner.state, None);
        }
        Ok(inner.state.clone())
    }

    /// One non-blocking look at the second half of the last burn.
    pub async fn completion_status(&self) -> Result<CompletionStatus> {
        let burn = self.last_burn().ok_or_else(|| TransferError::NothingToResume {
            reason: "no confirmed burn recorded".to_string(),
        })?;
        self.backend.check_status(&burn).await
    }

    async fn run(
        &self,
        request: &TransferRequest,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<MintResult> {
        let source = &request.source;
        let observer = StateObserver { orchestrator: self };

        self.cancellable(
            cancel,
            ensure_active_chain(
                self.wallet.as_ref(),
                source.chain_id,
                &self.config.chain_switch,
                self.clock.as_ref(),
                &observer,
            ),
        )
        .await?;

        let signer = self.wallet.signer(source.chain_id).await.map_err(|e| {
            TransferError::ChainSwitchFailed {
                chain_id: source.chain_id,
                attempts: self.config.chain_switch.attempts,
                reason: e.to_string(),
            }
        })?;
        if signer.address() != request.sender {
            return Err(TransferError::invalid_request(
                "sender",
                format!("wallet account is {}", signer.address()),
            ));
        }

        let approval = self
            .cancellable(
                cancel,
                self.allowance
                    .ensure_approval(source, signer.as_ref(), request.amount, &observer),
            )
            .await?;
        debug!(outcome = ?approval, event = "approval_settled");
        self.enter_burning()?;

        let burn = self
            .backend
            .burn(
                source,
                &request.destination,
                signer.as_ref(),
                request.amount,
                request.recipient_address(),
                &observer,
            )
            .await?;

        {
            let mut inner = self.lock();
            inner.last_burn = Some(burn.clone());
            inner.state.burn_tx = Some(burn.tx_hash);
        }
        self.transition(TransferStatus::AwaitingAttestation)?;

        self.wait_for_mint(&burn, cancel).await
    }

    async fn wait_for_mint(
        &self,
        burn: &BurnResult,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<MintResult> {
        let observer = StateObserver { orchestrator: self };

        let mint = tokio::select! {
            _ = cancelled(cancel) => {
                let phase = self.lock().state.status;
                warn!(
                    burn_tx = %burn.tx_hash,
                    phase = %phase,
                    event = "attestation_wait_abandoned"
                );
                return Err(TransferError::WaitAbandoned {
                    phase,
                    burn_tx: burn.tx_hash,
                });
            }
            result = self.backend.await_completion(burn, &observer) => result?,
        };

        {
            let mut inner = self.lock();
            inner.state.mint_tx = Some(mint.tx_hash);
            if inner.state.status == TransferStatus::AwaitingAttestation {
                inner.state.advance(TransferStatus::Minting)?;
                self.publish(&inner.state, None);
            }
        }
        self.transition(TransferStatus::Success)?;
        info!(mint_tx = %mint.tx_hash, relayed = mint.relayed, event = "transfer_complete");
        Ok(mint)
    }

    fn begin(&self) -> Result<watch::Receiver<bool>> {
        let mut inner = self.lock();
        if inner.running || inner.state.status.is_active() {
            return Err(TransferError::TransferAlreadyInProgress {
                status: inner.state.status,
            });
        }
        if let Some(burn_tx) = Self::resumable_burn(&inner) {
            warn!(burn_tx = %burn_tx, event = "transfer_refused_unresolved_burn");
            return Err(TransferError::UnresolvedBurn { burn_tx });
        }

        let (tx, rx) = watch::channel(false);
        *inner = Inner {
            running: true,
            cancel: Some(tx),
            ..Inner::default()
        };
        self.publish(&inner.state, None);
        Ok(rx)
    }

    /// The recorded burn, if the last failure is resolved by waiting on it.
    fn resumable_burn(inner: &Inner) -> Option<TxHash> {
        let recovery = inner.state.error.as_ref().map(|detail| detail.recovery);
        match (&inner.last_burn, inner.state.status, recovery) {
            (Some(burn), TransferStatus::Error, Some(Recovery::WaitAndResume)) => {
                Some(burn.tx_hash)
            }
            _ => None,
        }
    }

    fn finish(&self, result: Result<MintResult>) -> Result<TransferState> {
        let mut inner = self.lock();
        inner.running = false;
        inner.cancel = None;

        match result {
            Ok(_) => Ok(inner.state.clone()),
            Err(e) => {
                if let Err(transition) = inner.state.fail(&e) {
                    warn!(error = %transition, event = "failure_not_recorded");
                }
                warn!(
                    error = %e,
                    phase = ?e.phase(),
                    recovery = ?e.recovery(),
                    event = "transfer_failed"
                );
                self.publish(&inner.state, None);
                Err(e)
            }
        }
    }

    /// Burning is entered under the lock so a concurrent cancel either lands
    /// before it or is rejected.
    fn enter_burning(&self) -> Result<()> {
        let mut inner = self.lock();
        let cancelled = inner.cancel.as_ref().is_some_and(|tx| *tx.borrow());
        if cancelled {
            return Err(TransferError::Cancelled {
                phase: inner.state.status,
            });
        }
        inner.state.advance(TransferStatus::Burning)?;
        info!(event = "burn_phase_entered");
        self.publish(&inner.state, None);
        Ok(())
    }

    fn transition(&self, next: TransferStatus) -> Result<()> {
        let mut inner = self.lock();
        let from = inner.state.status;
        inner.state.advance(next)?;
        info!(from = %from, to = %next, event = "transfer_status_changed");
        self.publish(&inner.state, None);
        Ok(())
    }

    /// Runs `work` unless the transfer is cancelled first.
    async fn cancellable<T, F>(&self, cancel: &mut watch::Receiver<bool>, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            _ = cancelled(cancel) => {
                let phase = self.lock().state.status;
                info!(phase = %phase, event = "transfer_cancelled");
                Err(TransferError::Cancelled { phase })
            }
            result = work => result,
        }
    }

    fn publish(&self, state: &TransferState, note: Option<PhaseEvent>) {
        // No subscribers is not an error.
        let _ = self.progress.send(TransferProgress {
            state: state.clone(),
            note,
            cancel_safe: state.status.is_cancel_safe(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Records references reported from inside a phase and forwards the
/// observation to subscribers.
struct StateObserver<'a> {
    orchestrator: &'a TransferOrchestrator,
}

impl PhaseObserver for StateObserver<'_> {
    fn on_phase_event(&self, event: PhaseEvent) {
        let mut inner = self.orchestrator.lock();
        match &event {
            PhaseEvent::TransactionSubmitted {
                phase: TransferStatus::Approving,
                tx_hash,
            } => inner.state.approve_tx = Some(*tx_hash),
            PhaseEvent::TransactionSubmitted {
                phase: TransferStatus::Burning,
                tx_hash,
            } => inner.state.burn_tx = Some(*tx_hash),
            PhaseEvent::MintSubmitted { tx_hash } => inner.state.mint_tx = Some(*tx_hash),
            PhaseEvent::ApprovalRequired { .. } if inner.state.status == TransferStatus::Idle => {
                match inner.state.advance(TransferStatus::Approving) {
                    Ok(()) => {
                        info!(
                            from = %TransferStatus::Idle,
                            to = %TransferStatus::Approving,
                            event = "transfer_status_changed"
                        );
                        self.orchestrator.publish(&inner.state, None);
                    }
                    Err(e) => warn!(error = %e, event = "approving_transition_refused"),
                }
            }
            PhaseEvent::AttestationReceived
                if inner.state.status == TransferStatus::AwaitingAttestation =>
            {
                match inner.state.advance(TransferStatus::Minting) {
                    Ok(()) => {
                        info!(event = "attestation_received");
                        self.orchestrator.publish(&inner.state, None);
                    }
                    Err(e) => warn!(error = %e, event = "minting_transition_refused"),
                }
            }
            _ => {}
        }
        self.orchestrator.publish(&inner.state, Some(event));
    }
}

/// Resolves once the flag is raised; never, if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}
