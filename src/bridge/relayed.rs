// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{keccak256, Address, U256};
use async_trait::async_trait;
use bon::Builder;
use tracing::{debug, error, info, warn};

use super::poller::{AttestationPoller, PollOutcome};
use super::{
    ensure_asset_deployed, recipient_bytes32, submit_burn, AttestationMintWaiter, BurnExecutor,
    BurnResult, CompletionStatus, MintResult, PollingConfig,
};
use crate::chain::ChainConfig;
use crate::confirmation::{
    check_confirmation, wait_for_receipt, ConfirmationConfig, ConfirmationResult,
};
use crate::contracts::{extract_message_sent, BurnOptions, TokenMessengerV2Contract};
use crate::error::{Result, TransferError};
use crate::orchestrator::{PhaseEvent, PhaseObserver, TransferStatus};
use crate::protocol::{message_domains, AttestationLookup, AttestationResponse, BurnMessage};
use crate::providers::TokioClock;
use crate::spans;
use crate::traits::{AttestationProvider, ChainReader, ChainSigner, Clock};

fn default_clock() -> Arc<dyn Clock> {
    Arc::new(TokioClock::new())
}

/// CCTP v2 backend where a forwarding relayer performs the mint.
///
/// The attestation is looked up by `(source domain, burn tx)`. Once the service
/// reports the relayer's `forwardTxHash`, its receipt is confirmed on the
/// destination chain through a read-only [`ChainReader`]; the user never signs
/// on the destination.
#[derive(Builder)]
pub struct RelayedBridge {
    attestation: Arc<dyn AttestationProvider>,
    /// Read access to every chain that may be a destination.
    #[builder(with = |readers: impl IntoIterator<Item = Arc<dyn ChainReader>>| {
        readers
            .into_iter()
            .map(|reader| (reader.chain_id(), reader))
            .collect::<HashMap<_, _>>()
    })]
    destination_readers: HashMap<u64, Arc<dyn ChainReader>>,
    #[builder(default = default_clock())]
    clock: Arc<dyn Clock>,
    #[builder(default)]
    polling: PollingConfig,
    #[builder(default)]
    confirmation: ConfirmationConfig,
    #[builder(default)]
    burn_options: BurnOptions,
}

impl RelayedBridge {
    fn poller(&self) -> AttestationPoller<dyn AttestationProvider> {
        AttestationPoller::new(
            Arc::clone(&self.attestation),
            Arc::clone(&self.clock),
            self.polling,
        )
    }

    /// Key under which the attestation service indexes `burn`.
    pub fn lookup(burn: &BurnResult) -> AttestationLookup {
        AttestationLookup::Transaction {
            source_domain: burn.source_domain,
            tx_hash: burn.tx_hash,
        }
    }

    fn reader(&self, chain_id: u64) -> Result<&Arc<dyn ChainReader>> {
        self.destination_readers.get(&chain_id).ok_or_else(|| {
            TransferError::InvalidConfig(format!("no destination reader for chain {chain_id}"))
        })
    }

    /// Cross-checks the attested message against what was burned.
    fn verify_message(burn: &BurnResult, response: &AttestationResponse) -> Result<()> {
        let Some(message) = &response.message else {
            warn!(tx_hash = %burn.tx_hash, event = "attested_message_missing");
            return Ok(());
        };

        let mismatch = |what: &str| TransferError::AttestationFailed {
            reason: format!("attested message {what} does not match burn {}", burn.tx_hash),
        };

        let expected_domains = (burn.source_domain, burn.destination_domain);
        match BurnMessage::decode(message) {
            Some(decoded) => {
                if (decoded.header.source_domain, decoded.header.destination_domain)
                    != expected_domains
                {
                    return Err(mismatch("domains"));
                }
                if decoded.body.mint_recipient != recipient_bytes32(burn.recipient) {
                    return Err(mismatch("recipient"));
                }
                if decoded.body.amount != burn.amount {
                    return Err(mismatch("amount"));
                }
            }
            None => {
                if message_domains(message) != Some(expected_domains) {
                    return Err(mismatch("domains"));
                }
                debug!(len = message.len(), event = "attested_message_not_a_burn_message");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BurnExecutor for RelayedBridge {
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

        let tx = TokenMessengerV2Contract::new(source.messenger_address)
            .deposit_for_burn_transaction(
                signer.address(),
                recipient_bytes32(recipient),
                destination.domain_id,
                source.asset_address,
                amount,
                &self.burn_options,
            );
        let receipt = submit_burn(
            signer,
            tx,
            self.clock.as_ref(),
            &self.confirmation,
            observer,
        )
        .await?;

        let message = extract_message_sent(&receipt.logs);
        Ok(BurnResult {
            tx_hash: receipt.tx_hash,
            source_chain_id: source.chain_id,
            source_domain: source.domain_id,
            destination_chain_id: destination.chain_id,
            destination_domain: destination.domain_id,
            amount,
            sender: signer.address(),
            recipient,
            message_hash: message.as_ref().map(keccak256),
            message,
        })
    }
}

#[async_trait]
impl AttestationMintWaiter for RelayedBridge {
    async fn await_completion(
        &self,
        burn: &BurnResult,
        observer: &dyn PhaseObserver,
    ) -> Result<MintResult> {
        let reader = self.reader(burn.destination_chain_id)?;
        let poller = self.poller();
        let lookup = Self::lookup(burn);
        let started = poller.clock().now();

        let attested = poller
            .wait_for_attestation(lookup, burn.tx_hash, observer)
            .await?;
        Self::verify_message(burn, &attested)?;
        observer.on_phase_event(PhaseEvent::AttestationReceived);

        let forward_tx_hash = match attested.forward_tx_hash {
            Some(tx_hash) => tx_hash,
            None => {
                info!(tx_hash = %burn.tx_hash, event = "awaiting_forwarded_mint");
                let forwarded = poller
                    .wait_until_since(lookup, burn.tx_hash, started, observer, |response| {
                        response.forward_tx_hash.is_some()
                    })
                    .await
                    .map_err(|e| match e {
                        TransferError::AttestationTimeout {
                            burn_tx,
                            elapsed_secs,
                        } => TransferError::MintNotObserved {
                            burn_tx,
                            elapsed_secs,
                        },
                        other => other,
                    })?;
                forwarded
                    .forward_tx_hash
                    .ok_or_else(|| TransferError::MintNotObserved {
                        burn_tx: burn.tx_hash,
                        elapsed_secs: 0,
                    })?
            }
        };
        observer.on_phase_event(PhaseEvent::MintSubmitted {
            tx_hash: forward_tx_hash,
        });

        let receipt = wait_for_receipt(
            reader.as_ref(),
            self.clock.as_ref(),
            forward_tx_hash,
            &self.confirmation,
            TransferStatus::Minting,
        )
        .await
        .map_err(|e| match e {
            TransferError::ConfirmationTimeout { timeout_secs, .. } => {
                TransferError::MintNotObserved {
                    burn_tx: burn.tx_hash,
                    elapsed_secs: timeout_secs,
                }
            }
            other => other,
        })?;

        if !receipt.success {
            let err = TransferError::MintReverted {
                tx_hash: Some(forward_tx_hash),
                reason: "forwarded mint reverted".to_string(),
            };
            spans::record_error(&err);
            error!(tx_hash = %forward_tx_hash, event = "mint_reverted");
            return Err(err);
        }

        info!(tx_hash = %forward_tx_hash, event = "forwarded_mint_confirmed");
        Ok(MintResult {
            tx_hash: forward_tx_hash,
            destination_chain_id: burn.destination_chain_id,
            relayed: true,
        })
    }

    async fn check_status(&self, burn: &BurnResult) -> Result<CompletionStatus> {
        let outcome = self
            .poller()
            .poll_once(Self::lookup(burn), |response| {
                response.ready_attestation().is_some()
            })
            .await?;

        let response = match outcome {
            PollOutcome::Ready(response) => response,
            PollOutcome::Pending(_) | PollOutcome::Throttled(_) => {
                return Ok(CompletionStatus::Pending)
            }
        };
        let Some(tx_hash) = response.forward_tx_hash else {
            return Ok(CompletionStatus::AttestationReady);
        };

        let reader = self.reader(burn.destination_chain_id)?;
        let required = self.confirmation.required_confirmations;
        Ok(
            match check_confirmation(reader.as_ref(), tx_hash, required).await? {
                ConfirmationResult::Confirmed(_) => CompletionStatus::Minted { tx_hash },
                _ => CompletionStatus::MintSubmitted { tx_hash },
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainRegistry;
    use crate::orchestrator::NoopObserver;
    use crate::protocol::FinalityThreshold;
    use crate::testing::{CallKind, FakeAttestationProvider, FakeChain, FakeClock};
    use alloy_primitives::{Bytes, TxHash};
    use std::time::Duration;

    struct Fixture {
        source: Arc<FakeChain>,
        destination: Arc<FakeChain>,
        attestation: FakeAttestationProvider,
        registry: ChainRegistry,
    }

    fn fixture() -> Fixture {
        let registry = ChainRegistry::v2_testnet();
        Fixture {
            source: Arc::new(FakeChain::for_chain(registry.resolve(11155111).unwrap())),
            destination: Arc::new(FakeChain::for_chain(registry.resolve(84532).unwrap())),
            attestation: FakeAttestationProvider::new(),
            registry,
        }
    }

    fn bridge(f: &Fixture, options: BurnOptions) -> RelayedBridge {
        RelayedBridge::builder()
            .attestation(Arc::new(f.attestation.clone()))
            .destination_readers([f.destination.clone() as Arc<dyn ChainReader>])
            .clock(Arc::new(FakeClock::new()))
            .burn_options(options)
            .build()
    }

    async fn burn(f: &Fixture, bridge: &RelayedBridge) -> BurnResult {
        bridge
            .burn(
                f.registry.resolve(11155111).unwrap(),
                f.registry.resolve(84532).unwrap(),
                f.source.as_ref(),
                U256::from(2_500_000),
                Address::repeat_byte(4),
                &NoopObserver,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_observes_forwarded_mint() {
        let f = fixture();
        let bridge = bridge(&f, BurnOptions::default());
        let burn = burn(&f, &bridge).await;

        let message = burn.message.clone().unwrap();
        let forward = f.destination.insert_receipt(true);
        f.attestation.push_responses(
            RelayedBridge::lookup(&burn),
            vec![
                Ok(AttestationResponse::pending()),
                Ok(AttestationResponse::complete(Bytes::from_static(&[1; 65]))
                    .with_message(message.clone())),
                Ok(AttestationResponse::complete(Bytes::from_static(&[1; 65]))
                    .with_message(message)
                    .with_forward_tx_hash(forward)),
            ],
        );

        let mint = bridge.await_completion(&burn, &NoopObserver).await.unwrap();

        assert_eq!(mint.tx_hash, forward);
        assert!(mint.relayed);
        assert_eq!(f.destination.sent_count(CallKind::ReceiveMessage), 0);
    }

    #[tokio::test]
    async fn test_forwarded_mint_shares_the_attestation_deadline() {
        let f = fixture();
        let clock = FakeClock::new();
        let bridge = RelayedBridge::builder()
            .attestation(Arc::new(f.attestation.clone()))
            .destination_readers([f.destination.clone() as Arc<dyn ChainReader>])
            .clock(Arc::new(clock.clone()))
            .polling(
                PollingConfig::standard()
                    .with_initial_interval(Duration::from_secs(10))
                    .with_multiplier(2.0)
                    .with_max_interval(Duration::from_secs(40))
                    .with_max_wait(Duration::from_secs(100)),
            )
            .build();
        let burn = burn(&f, &bridge).await;
        f.attestation.push_responses(
            RelayedBridge::lookup(&burn),
            vec![
                Ok(AttestationResponse::pending()),
                Ok(AttestationResponse::pending()),
                Ok(AttestationResponse::complete(Bytes::from_static(&[1; 65]))
                    .with_message(burn.message.clone().unwrap())),
            ],
        );

        let err = bridge.await_completion(&burn, &NoopObserver).await.unwrap_err();

        assert!(matches!(
            err,
            TransferError::MintNotObserved {
                elapsed_secs: 100,
                ..
            }
        ));
        assert_eq!(clock.total_sleep_time(), Duration::from_secs(100));
    }

    #[tokio::test]
    async fn test_fast_transfer_with_hook_uses_hook_entrypoint() {
        let f = fixture();
        let options = BurnOptions {
            max_fee: U256::from(500),
            finality: FinalityThreshold::Fast,
            hook_data: Bytes::from_static(b"hook"),
            ..Default::default()
        };
        let bridge = bridge(&f, options);
        burn(&f, &bridge).await;

        assert_eq!(f.source.sent_count(CallKind::DepositForBurnWithHook), 1);
        assert_eq!(f.source.sent_count(CallKind::DepositForBurn), 0);
    }

    #[tokio::test]
    async fn test_attested_message_for_other_recipient_is_rejected() {
        let f = fixture();
        let bridge = bridge(&f, BurnOptions::default());
        let mut burn = burn(&f, &bridge).await;
        let message = burn.message.clone().unwrap();
        burn.recipient = Address::repeat_byte(5);

        f.attestation.push_responses(
            RelayedBridge::lookup(&burn),
            vec![Ok(AttestationResponse::complete(Bytes::from_static(&[1; 65]))
                .with_message(message))],
        );

        let err = bridge.await_completion(&burn, &NoopObserver).await.unwrap_err();
        assert!(matches!(err, TransferError::AttestationFailed { .. }));
    }

    #[tokio::test]
    async fn test_reverted_forward_is_mint_reverted() {
        let f = fixture();
        let bridge = bridge(&f, BurnOptions::default());
        let burn = burn(&f, &bridge).await;
        let forward = f.destination.insert_receipt(false);

        f.attestation.push_responses(
            RelayedBridge::lookup(&burn),
            vec![Ok(AttestationResponse::complete(Bytes::from_static(&[1; 65]))
                .with_forward_tx_hash(forward))],
        );

        let err = bridge.await_completion(&burn, &NoopObserver).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::MintReverted { tx_hash: Some(tx), .. } if tx == forward
        ));
    }

    #[tokio::test]
    async fn test_missing_forward_is_mint_not_observed() {
        let f = fixture();
        let bridge = bridge(&f, BurnOptions::default());
        let burn = burn(&f, &bridge).await;
        f.attestation.respond_with(|_, _| {
            Ok(AttestationResponse::complete(Bytes::from_static(&[1; 65])))
        });

        let err = bridge.await_completion(&burn, &NoopObserver).await.unwrap_err();
        assert!(matches!(err, TransferError::MintNotObserved { .. }));
        assert_eq!(
            bridge.check_status(&burn).await.unwrap(),
            CompletionStatus::AttestationReady
        );
        assert_ne!(burn.tx_hash, TxHash::ZERO);
    }
}
