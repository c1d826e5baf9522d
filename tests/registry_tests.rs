// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Registry completeness and transfers between chains loaded from JSON.

use std::sync::Arc;

use alloy_primitives::{Bytes, U256};
use cctp_orchestrator::testing::{
    CallKind, FakeAttestationProvider, FakeChain, FakeClock, FakeWallet,
};
use cctp_orchestrator::{
    AttestationResponse, ChainRegistry, ChainSigner, DirectBridge, TransferError,
    TransferOrchestrator, TransferRequest, TransferStatus,
};
use rstest::rstest;

const LOCAL_REGISTRY: &str = r#"[
    {
        "chain_id": 31337,
        "name": "Local L1",
        "domain_id": 0,
        "asset_address": "0x1111111111111111111111111111111111111111",
        "messenger_address": "0x2222222222222222222222222222222222222222",
        "transmitter_address": "0x3333333333333333333333333333333333333333",
        "testnet": true
    },
    {
        "chain_id": 31338,
        "name": "Local L2",
        "domain_id": 3,
        "asset_address": "0x4444444444444444444444444444444444444444",
        "messenger_address": "0x5555555555555555555555555555555555555555",
        "transmitter_address": "0x6666666666666666666666666666666666666666",
        "testnet": true
    }
]"#;

#[rstest]
#[case::v1_mainnet(ChainRegistry::v1_mainnet())]
#[case::v1_testnet(ChainRegistry::v1_testnet())]
#[case::v2_mainnet(ChainRegistry::v2_mainnet())]
#[case::v2_testnet(ChainRegistry::v2_testnet())]
fn test_every_pair_is_routable(#[case] registry: ChainRegistry) {
    let mut pairs = 0;
    for (source, destination) in registry.pairs() {
        assert_ne!(source.chain_id, destination.chain_id);
        assert_ne!(source.domain_id, destination.domain_id);
        assert_eq!(registry.resolve(source.chain_id).unwrap(), source);
        assert_eq!(registry.resolve(destination.chain_id).unwrap(), destination);
        pairs += 1;
    }
    assert_eq!(pairs, registry.len() * (registry.len() - 1));
    assert!(registry.supported_chains().any(|chain| chain.domain_id == 0));
}

#[test]
fn test_unknown_chain_is_reported() {
    let registry = ChainRegistry::from_json(LOCAL_REGISTRY).unwrap();

    let err = registry.resolve(1).unwrap_err();

    assert!(matches!(err, TransferError::UnconfiguredChain { chain_id: 1 }));
}

#[tokio::test]
async fn test_transfer_between_chains_loaded_from_json() {
    let registry = Arc::new(ChainRegistry::from_json(LOCAL_REGISTRY).unwrap());
    let l1 = Arc::new(FakeChain::for_chain(registry.resolve(31337).unwrap()));
    let l2 = Arc::new(FakeChain::for_chain(registry.resolve(31338).unwrap()));
    let wallet = Arc::new(FakeWallet::new(vec![l1.clone(), l2.clone()]));
    let attestation = FakeAttestationProvider::new();
    attestation.respond_with(|_, _| {
        Ok(AttestationResponse::complete(Bytes::from_static(&[0x5a; 65])))
    });

    let backend = DirectBridge::builder()
        .registry(registry.clone())
        .wallet(wallet.clone())
        .attestation(Arc::new(attestation))
        .clock(Arc::new(FakeClock::new()))
        .build();
    let orchestrator = TransferOrchestrator::builder()
        .registry(registry.clone())
        .wallet(wallet.clone())
        .backend(Arc::new(backend))
        .build();

    let request = TransferRequest::from_form(&registry, 31337, 31338, "2.5", l1.address(), None)
        .unwrap();
    assert_eq!(request.amount, U256::from(2_500_000));

    let state = orchestrator.execute(request).await.unwrap();

    assert_eq!(state.status, TransferStatus::Success);
    assert_eq!(l1.sent_count(CallKind::DepositForBurn), 1);
    assert_eq!(l2.sent_count(CallKind::ReceiveMessage), 1);
    assert_eq!(wallet.active_chain(), 31338);
}
