// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end transfer flows against the fakes, run once per bridge backend.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Bytes, U256};
use cctp_orchestrator::testing::{
    CallKind, FakeAttestationProvider, FakeChain, FakeClock, FakeWallet, SwitchBehavior,
};
use cctp_orchestrator::{
    AttestationLookup, AttestationResponse, BridgeBackend, CancelOutcome, ChainReader,
    ChainRegistry, ChainSigner, Clock, CompletionStatus, DirectBridge, OrchestratorConfig,
    PollingConfig, Recovery, RelayedBridge, TokioClock, TransferError, TransferOrchestrator,
    TransferProgress, TransferRequest, TransferStatus,
};
use rstest::rstest;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use TransferStatus::*;

const SEPOLIA: u64 = 11155111;
const BASE_SEPOLIA: u64 = 84532;

#[derive(Debug, Clone, Copy)]
enum Backend {
    Direct,
    Relayed,
}

struct Harness {
    registry: Arc<ChainRegistry>,
    source: Arc<FakeChain>,
    destination: Arc<FakeChain>,
    wallet: Arc<FakeWallet>,
    attestation: FakeAttestationProvider,
    orchestrator: Arc<TransferOrchestrator>,
}

impl Harness {
    fn new(backend: Backend) -> Self {
        Self::build(backend, Arc::new(FakeClock::new()), false)
    }

    /// `start_on_destination` leaves the wallet on the wrong chain initially.
    fn build(backend: Backend, clock: Arc<dyn Clock>, start_on_destination: bool) -> Self {
        // `RUST_LOG=cctp_orchestrator=debug` shows the phase events of a failing case.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let registry = Arc::new(match backend {
            Backend::Direct => ChainRegistry::v1_testnet(),
            Backend::Relayed => ChainRegistry::v2_testnet(),
        });
        let source = Arc::new(FakeChain::for_chain(registry.resolve(SEPOLIA).unwrap()));
        let destination = Arc::new(FakeChain::for_chain(registry.resolve(BASE_SEPOLIA).unwrap()));
        let chains = if start_on_destination {
            vec![destination.clone(), source.clone()]
        } else {
            vec![source.clone(), destination.clone()]
        };
        let wallet = Arc::new(FakeWallet::new(chains));
        let attestation = FakeAttestationProvider::new();

        let config = OrchestratorConfig {
            polling: PollingConfig::standard().with_max_wait(Duration::from_secs(600)),
            progress_capacity: 1024,
            ..Default::default()
        };

        let bridge: Arc<dyn BridgeBackend> = match backend {
            Backend::Direct => Arc::new(
                DirectBridge::builder()
                    .registry(registry.clone())
                    .wallet(wallet.clone())
                    .attestation(Arc::new(attestation.clone()))
                    .clock(clock.clone())
                    .polling(config.polling)
                    .build(),
            ),
            Backend::Relayed => Arc::new(
                RelayedBridge::builder()
                    .attestation(Arc::new(attestation.clone()))
                    .destination_readers([
                        source.clone() as Arc<dyn ChainReader>,
                        destination.clone() as Arc<dyn ChainReader>,
                    ])
                    .clock(clock.clone())
                    .polling(config.polling)
                    .build(),
            ),
        };

        let orchestrator = TransferOrchestrator::builder()
            .registry(registry.clone())
            .wallet(wallet.clone())
            .backend(bridge)
            .clock(clock)
            .config(config)
            .build();

        Self {
            registry,
            source,
            destination,
            wallet,
            attestation,
            orchestrator: Arc::new(orchestrator),
        }
    }

    fn request(&self) -> TransferRequest {
        self.request_between(SEPOLIA, BASE_SEPOLIA)
    }

    fn request_between(&self, from: u64, to: u64) -> TransferRequest {
        TransferRequest::builder()
            .source(self.registry.resolve(from).unwrap().clone())
            .destination(self.registry.resolve(to).unwrap().clone())
            .amount(U256::from(10_000_000))
            .sender(self.source.address())
            .build()
    }

    /// Every lookup is attested. Relayed lookups also report a forwarded mint
    /// already mined on the chain opposite the burn.
    fn attest(&self) {
        let forward_to_destination = self.destination.insert_receipt(true);
        let forward_to_source = self.source.insert_receipt(true);
        let source_domain = self.registry.resolve(SEPOLIA).unwrap().domain_id;

        self.attestation.respond_with(move |lookup, _| {
            let response = AttestationResponse::complete(Bytes::from_static(&[0x5a; 65]));
            Ok(match lookup {
                AttestationLookup::MessageHash(_) => response,
                AttestationLookup::Transaction {
                    source_domain: domain,
                    ..
                } => response.with_forward_tx_hash(if *domain == source_domain {
                    forward_to_destination
                } else {
                    forward_to_source
                }),
            })
        });
    }

    fn burns(&self) -> usize {
        self.source.sent_count(CallKind::DepositForBurn)
            + self.source.sent_count(CallKind::DepositForBurnWithHook)
    }

    fn transactions(&self) -> usize {
        [
            CallKind::Approve,
            CallKind::DepositForBurn,
            CallKind::DepositForBurnWithHook,
            CallKind::ReceiveMessage,
        ]
        .into_iter()
        .map(|kind| self.source.sent_count(kind) + self.destination.sent_count(kind))
        .sum()
    }
}

/// Distinct statuses in the order they were published.
fn statuses(progress: &mut broadcast::Receiver<TransferProgress>) -> Vec<TransferStatus> {
    let mut seen = Vec::new();
    while let Ok(update) = progress.try_recv() {
        if seen.last() != Some(&update.state.status) {
            seen.push(update.state.status);
        }
    }
    seen
}

fn assert_legal(path: &[TransferStatus]) {
    for pair in path.windows(2) {
        assert!(
            pair[0].can_transition_to(pair[1]),
            "illegal transition {} -> {}",
            pair[0],
            pair[1]
        );
    }
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_sufficient_allowance_skips_approval(#[case] backend: Backend) {
    let h = Harness::new(backend);
    h.source.set_allowance(U256::from(1_000_000_000u64));
    h.attest();
    let mut progress = h.orchestrator.subscribe();

    let state = h.orchestrator.execute(h.request()).await.unwrap();

    let path = statuses(&mut progress);
    assert_eq!(path, vec![Idle, Burning, AwaitingAttestation, Minting, Success]);
    assert_legal(&path);
    assert_eq!(h.source.sent_count(CallKind::Approve), 0);
    assert_eq!(h.burns(), 1);
    assert_eq!(state.status, Success);
    assert_eq!(state.approve_tx, None);
    assert!(state.burn_tx.is_some());
    assert!(state.mint_tx.is_some());
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_missing_allowance_approves_once_before_burn(#[case] backend: Backend) {
    let h = Harness::new(backend);
    h.attest();
    let mut progress = h.orchestrator.subscribe();

    let state = h.orchestrator.execute(h.request()).await.unwrap();

    let path = statuses(&mut progress);
    assert_eq!(
        path,
        vec![Idle, Approving, Burning, AwaitingAttestation, Minting, Success]
    );
    assert_legal(&path);
    assert_eq!(h.source.sent_count(CallKind::Approve), 1);
    assert_eq!(h.source.allowance(), U256::from(10_000_000));
    assert!(state.approve_tx.is_some());
    assert_eq!(state.status, Success);
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_same_chain_request_is_rejected_before_any_transaction(#[case] backend: Backend) {
    let h = Harness::new(backend);

    let err = h
        .orchestrator
        .execute(h.request_between(SEPOLIA, SEPOLIA))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransferError::InvalidRequest {
            field: "destination",
            ..
        }
    ));
    assert_eq!(h.transactions(), 0);
    assert_eq!(h.orchestrator.current_state().status, Idle);
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_reverted_burn_then_new_request_is_accepted(#[case] backend: Backend) {
    let h = Harness::new(backend);
    h.source.revert_calls(CallKind::DepositForBurn);
    h.attest();

    let err = h.orchestrator.execute(h.request()).await.unwrap_err();

    assert!(matches!(err, TransferError::BurnReverted { tx_hash: Some(_), .. }));
    let state = h.orchestrator.current_state();
    assert_eq!(state.status, Error);
    assert!(state.burn_tx.is_some());
    assert_eq!(state.error.map(|e| e.recovery), Some(Recovery::StartNewTransfer));

    // The other direction burns on the chain that does not revert.
    let state = h
        .orchestrator
        .execute(h.request_between(BASE_SEPOLIA, SEPOLIA))
        .await
        .unwrap();
    assert_eq!(state.status, Success);
    assert_eq!(state.error, None);
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_attestation_timeout_keeps_burn_and_resumes_without_reburning(
    #[case] backend: Backend,
) {
    let h = Harness::new(backend);

    let err = h.orchestrator.execute(h.request()).await.unwrap_err();

    assert!(matches!(err, TransferError::AttestationTimeout { elapsed_secs: 600, .. }));
    let state = h.orchestrator.current_state();
    assert_eq!(state.status, Error);
    let burn_tx = state.burn_tx.unwrap();
    assert_eq!(h.orchestrator.last_burn().unwrap().tx_hash, burn_tx);
    assert_eq!(state.error.map(|e| e.recovery), Some(Recovery::WaitAndResume));
    assert_eq!(
        h.orchestrator.completion_status().await.unwrap(),
        CompletionStatus::Pending
    );

    h.attest();
    let state = h.orchestrator.resume_attestation().await.unwrap();

    assert_eq!(state.status, Success);
    assert_eq!(state.burn_tx, Some(burn_tx));
    assert_eq!(h.burns(), 1);
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_new_transfer_is_refused_while_a_burn_awaits_its_mint(#[case] backend: Backend) {
    let h = Harness::new(backend);
    h.orchestrator.execute(h.request()).await.unwrap_err();
    let stranded = h.orchestrator.current_state();
    let burn_tx = stranded.burn_tx.unwrap();

    let err = h.orchestrator.execute(h.request()).await.unwrap_err();

    assert!(matches!(err, TransferError::UnresolvedBurn { burn_tx: tx } if tx == burn_tx));
    assert_eq!(err.recovery(), Recovery::WaitAndResume);
    assert_eq!(h.orchestrator.current_state(), stranded);
    assert_eq!(h.orchestrator.last_burn().unwrap().tx_hash, burn_tx);
    assert_eq!(h.burns(), 1);

    h.attest();
    let state = h.orchestrator.resume_attestation().await.unwrap();
    assert_eq!(state.status, Success);
    assert_eq!(state.burn_tx, Some(burn_tx));

    h.orchestrator.execute(h.request()).await.unwrap();
    assert_eq!(h.burns(), 2);
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_reset_discards_a_pending_burn_and_allows_a_new_transfer(#[case] backend: Backend) {
    let h = Harness::new(backend);
    h.orchestrator.execute(h.request()).await.unwrap_err();
    assert!(h.orchestrator.last_burn().is_some());

    h.orchestrator.reset().unwrap();
    h.attest();
    let state = h.orchestrator.execute(h.request()).await.unwrap();

    assert_eq!(state.status, Success);
    assert_eq!(h.burns(), 2);
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_resume_is_refused_after_a_rejected_burn(#[case] backend: Backend) {
    let h = Harness::new(backend);
    h.source.set_allowance(U256::MAX);
    h.source.reject_next_send();

    let err = h.orchestrator.execute(h.request()).await.unwrap_err();
    assert!(matches!(err, TransferError::BurnRejected { .. }));

    let err = h.orchestrator.resume_attestation().await.unwrap_err();
    assert!(matches!(err, TransferError::NothingToResume { .. }));
    assert!(h.orchestrator.last_burn().is_none());
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_rejected_chain_switch_fails_before_any_transaction(#[case] backend: Backend) {
    let h = Harness::build(backend, Arc::new(FakeClock::new()), true);
    h.wallet.set_switch_behavior(SwitchBehavior::Reject);

    let err = h.orchestrator.execute(h.request()).await.unwrap_err();

    assert!(matches!(
        err,
        TransferError::ChainSwitchFailed {
            chain_id: SEPOLIA,
            ..
        }
    ));
    assert_eq!(h.transactions(), 0);
    let state = h.orchestrator.current_state();
    assert_eq!(state.status, Error);
    assert_eq!(state.error.and_then(|e| e.phase), Some(Idle));
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_wallet_is_switched_to_source_first(#[case] backend: Backend) {
    let h = Harness::build(backend, Arc::new(FakeClock::new()), true);
    h.attest();

    h.orchestrator.execute(h.request()).await.unwrap();

    assert!(h.wallet.switch_requests() >= 1);
    assert_eq!(h.burns(), 1);
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test(start_paused = true)]
async fn test_cancel_before_burn_moves_no_value(#[case] backend: Backend) {
    let h = Harness::build(backend, Arc::new(TokioClock::new()), true);
    h.wallet.set_switch_behavior(SwitchBehavior::Ignore);

    let running = {
        let orchestrator = h.orchestrator.clone();
        let request = h.request();
        tokio::spawn(async move { orchestrator.execute(request).await })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(h.orchestrator.cancel(), CancelOutcome::Cancelled);
    let err = running.await.unwrap().unwrap_err();

    assert!(matches!(err, TransferError::Cancelled { phase: Idle }));
    assert_eq!(h.transactions(), 0);
    assert_eq!(
        h.orchestrator.current_state().error.map(|e| e.recovery),
        Some(Recovery::StartNewTransfer)
    );
    assert_eq!(h.orchestrator.cancel(), CancelOutcome::NotRunning);
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test(start_paused = true)]
async fn test_single_transfer_in_flight_and_stop_waiting(#[case] backend: Backend) {
    let h = Harness::build(backend, Arc::new(TokioClock::new()), false);

    let running = {
        let orchestrator = h.orchestrator.clone();
        let request = h.request();
        tokio::spawn(async move { orchestrator.execute(request).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;

    let in_flight = h.orchestrator.current_state();
    assert_eq!(in_flight.status, AwaitingAttestation);

    let err = h.orchestrator.execute(h.request()).await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::TransferAlreadyInProgress {
            status: AwaitingAttestation
        }
    ));
    assert_eq!(h.orchestrator.current_state(), in_flight);

    assert_eq!(
        h.orchestrator.cancel(),
        CancelOutcome::StoppedWaiting {
            burn_tx: in_flight.burn_tx
        }
    );
    let err = running.await.unwrap().unwrap_err();
    assert!(matches!(err, TransferError::WaitAbandoned { .. }));

    h.attest();
    let state = h.orchestrator.resume_attestation().await.unwrap();
    assert_eq!(state.status, Success);
    assert_eq!(state.burn_tx, in_flight.burn_tx);
    assert_eq!(h.burns(), 1);
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_progress_reports_pending_attestation_and_cancel_safety(#[case] backend: Backend) {
    let h = Harness::new(backend);
    h.attestation.respond_with(|_, attempt| {
        if attempt < 3 {
            Ok(AttestationResponse::pending())
        } else {
            Err(TransferError::AttestationFailed {
                reason: "message rejected".to_string(),
            })
        }
    });
    let mut progress = h.orchestrator.subscribe();

    let err = h.orchestrator.execute(h.request()).await.unwrap_err();
    assert!(matches!(err, TransferError::AttestationFailed { .. }));

    let mut pending = 0;
    let mut updates = Vec::new();
    while let Ok(update) = progress.try_recv() {
        if matches!(
            update.note,
            Some(cctp_orchestrator::PhaseEvent::AttestationPending { .. })
        ) {
            pending += 1;
            assert!(!update.cancel_safe);
        }
        updates.push(update);
    }
    assert_eq!(pending, 2);
    assert!(updates
        .iter()
        .filter(|u| u.state.status == Approving)
        .all(|u| u.cancel_safe));
    assert_eq!(
        h.orchestrator.current_state().error.map(|e| e.recovery),
        Some(Recovery::ManualReview)
    );
}

#[rstest]
#[case::direct(Backend::Direct)]
#[case::relayed(Backend::Relayed)]
#[tokio::test]
async fn test_reset_returns_to_idle(#[case] backend: Backend) {
    let h = Harness::new(backend);
    h.attest();
    h.orchestrator.execute(h.request()).await.unwrap();

    let state = h.orchestrator.reset().unwrap();

    assert_eq!(state.status, Idle);
    assert_eq!(state.burn_tx, None);
    assert!(h.orchestrator.last_burn().is_none());
}
