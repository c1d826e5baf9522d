// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Wallet access.
//!
//! The orchestrator never holds keys. It asks a [`WalletAdapter`] for the
//! active chain, requests switches, and borrows a [`ChainSigner`] for the chain
//! it is about to transact on. Two variants exist:
//!
//! - [`ExternalSignerAdapter`]: a browser-extension style wallet reached over JSON-RPC.
//! - [`EmbeddedSignerAdapter`]: signers held in-process, one per chain.

mod embedded;
mod external;

pub use embedded::EmbeddedSignerAdapter;
pub use external::ExternalSignerAdapter;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn, Instrument};

use crate::error::{Result, SignerError, TransferError};
use crate::orchestrator::{PhaseEvent, PhaseObserver};
use crate::spans;
use crate::traits::{ChainSigner, Clock};

#[async_trait]
pub trait WalletAdapter: Send + Sync {
    async fn current_chain_id(&self) -> std::result::Result<u64, SignerError>;

    /// Asks the wallet to make `chain_id` active. Success only means the
    /// request was accepted; callers re-read [`WalletAdapter::current_chain_id`].
    async fn request_chain_switch(&self, chain_id: u64) -> std::result::Result<(), SignerError>;

    /// Signer for `chain_id`. Fails with [`SignerError::WrongChain`] unless that
    /// chain is active.
    async fn signer(&self, chain_id: u64)
        -> std::result::Result<Arc<dyn ChainSigner>, SignerError>;
}

/// Bounded retries for [`ensure_active_chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSwitchPolicy {
    pub attempts: u32,
    /// Pause between a failed verification and the next request.
    pub delay: Duration,
}

impl Default for ChainSwitchPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Makes `chain_id` the wallet's active chain, verifying after every request.
///
/// A user rejection ends the attempts immediately; other failures are retried
/// up to `policy.attempts` times before [`TransferError::ChainSwitchFailed`].
pub async fn ensure_active_chain(
    wallet: &dyn WalletAdapter,
    chain_id: u64,
    policy: &ChainSwitchPolicy,
    clock: &dyn Clock,
    observer: &dyn PhaseObserver,
) -> Result<()> {
    let attempts = policy.attempts.max(1);
    let span = spans::switch_chain(chain_id, attempts);

    async move {
        if wallet
            .current_chain_id()
            .await
            .is_ok_and(|active| active == chain_id)
        {
            debug!(chain_id, event = "chain_already_active");
            return Ok(());
        }

        let mut reason = String::new();
        for attempt in 1..=attempts {
            observer.on_phase_event(PhaseEvent::ChainSwitchRequested { chain_id, attempt });
            info!(chain_id, attempt, event = "chain_switch_requested");

            match wallet.request_chain_switch(chain_id).await {
                Ok(()) => {}
                Err(SignerError::Rejected(message)) => {
                    warn!(chain_id, event = "chain_switch_rejected");
                    return Err(TransferError::ChainSwitchFailed {
                        chain_id,
                        attempts: attempt,
                        reason: format!("user rejected the switch: {message}"),
                    });
                }
                Err(e) => reason = e.to_string(),
            }

            match wallet.current_chain_id().await {
                Ok(active) if active == chain_id => {
                    info!(chain_id, attempt, event = "chain_switch_verified");
                    return Ok(());
                }
                Ok(active) => reason = format!("wallet still on chain {active}"),
                Err(e) => reason = e.to_string(),
            }

            warn!(chain_id, attempt, reason = %reason, event = "chain_switch_unverified");
            if attempt < attempts {
                clock.sleep(policy.delay).await;
            }
        }

        Err(TransferError::ChainSwitchFailed {
            chain_id,
            attempts,
            reason,
        })
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::NoopObserver;
    use crate::testing::{FakeChain, FakeClock, FakeWallet, SwitchBehavior};

    fn wallet() -> FakeWallet {
        FakeWallet::new(vec![Arc::new(FakeChain::new(1)), Arc::new(FakeChain::new(8453))])
    }

    #[tokio::test]
    async fn test_no_request_when_already_active() {
        let wallet = wallet();
        let clock = FakeClock::new();

        ensure_active_chain(&wallet, 1, &ChainSwitchPolicy::default(), &clock, &NoopObserver)
            .await
            .unwrap();

        assert_eq!(wallet.switch_requests(), 0);
    }

    #[tokio::test]
    async fn test_switch_is_verified() {
        let wallet = wallet();
        let clock = FakeClock::new();

        ensure_active_chain(&wallet, 8453, &ChainSwitchPolicy::default(), &clock, &NoopObserver)
            .await
            .unwrap();

        assert_eq!(wallet.current_chain_id().await.unwrap(), 8453);
        assert_eq!(wallet.switch_requests(), 1);
    }

    #[tokio::test]
    async fn test_ignored_switch_fails_after_bounded_attempts() {
        let wallet = wallet();
        wallet.set_switch_behavior(SwitchBehavior::Ignore);
        let clock = FakeClock::new();
        let policy = ChainSwitchPolicy {
            attempts: 3,
            delay: Duration::from_secs(1),
        };

        let err = ensure_active_chain(&wallet, 8453, &policy, &clock, &NoopObserver)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransferError::ChainSwitchFailed {
                chain_id: 8453,
                attempts: 3,
                ..
            }
        ));
        assert_eq!(wallet.switch_requests(), 3);
        assert_eq!(clock.sleep_count(), 2);
    }

    #[tokio::test]
    async fn test_rejected_switch_is_not_retried() {
        let wallet = wallet();
        wallet.set_switch_behavior(SwitchBehavior::Reject);
        let clock = FakeClock::new();

        let err = ensure_active_chain(
            &wallet,
            8453,
            &ChainSwitchPolicy::default(),
            &clock,
            &NoopObserver,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TransferError::ChainSwitchFailed { attempts: 1, .. }));
        assert_eq!(wallet.switch_requests(), 1);
    }

    #[tokio::test]
    async fn test_flaky_switch_recovers() {
        let wallet = wallet();
        wallet.set_switch_behavior(SwitchBehavior::FailTimes(1));
        let clock = FakeClock::new();

        ensure_active_chain(&wallet, 8453, &ChainSwitchPolicy::default(), &clock, &NoopObserver)
            .await
            .unwrap();

        assert_eq!(wallet.switch_requests(), 2);
    }
}
