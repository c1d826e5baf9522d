// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::TxHash;
use tracing::{debug, error, info, warn, Instrument};

use super::config::PollingConfig;
use crate::error::{Result, TransferError};
use crate::orchestrator::{PhaseEvent, PhaseObserver};
use crate::protocol::{AttestationLookup, AttestationResponse, AttestationStatus};
use crate::spans;
use crate::traits::{AttestationProvider, Clock};

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The response satisfied the caller's readiness check.
    Ready(AttestationResponse),
    /// Not there yet; carries the last response when the service answered.
    Pending(Option<AttestationResponse>),
    /// The service asked us to slow down.
    Throttled(Duration),
}

/// Polls the attestation service until a response is ready or the deadline passes.
///
/// Dropping the future returned by [`AttestationPoller::wait_until`] cancels the wait;
/// nothing is left running in the background.
pub struct AttestationPoller<A: ?Sized> {
    provider: Arc<A>,
    clock: Arc<dyn Clock>,
    config: PollingConfig,
}

impl<A: ?Sized> Clone for AttestationPoller<A> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            clock: Arc::clone(&self.clock),
            config: self.config,
        }
    }
}

impl<A: AttestationProvider + ?Sized> AttestationPoller<A> {
    pub fn new(provider: Arc<A>, clock: Arc<dyn Clock>, config: PollingConfig) -> Self {
        Self {
            provider,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// One request. Not-yet-indexed and transient failures count as pending;
    /// a `failed` status is returned as [`TransferError::AttestationFailed`].
    pub async fn poll_once<F>(&self, lookup: AttestationLookup, ready: F) -> Result<PollOutcome>
    where
        F: Fn(&AttestationResponse) -> bool,
    {
        match self.provider.get_attestation(lookup).await {
            Ok(response) if ready(&response) => Ok(PollOutcome::Ready(response)),
            Ok(response) if response.status == AttestationStatus::Failed => {
                spans::record_error_with_context(
                    "AttestationFailed",
                    "Circle API returned failed status for attestation",
                    Some("The message may be invalid or the source transaction may have failed"),
                );
                error!(lookup = %lookup, event = "attestation_failed");
                Err(TransferError::AttestationFailed {
                    reason: format!("attestation service reported failure for {lookup}"),
                })
            }
            Ok(response) => {
                debug!(status = ?response.status, event = "attestation_pending");
                Ok(PollOutcome::Pending(Some(response)))
            }
            Err(TransferError::RateLimitExceeded {
                retry_after_seconds,
            }) => {
                let wait = if retry_after_seconds == 0 {
                    self.config.rate_limit_fallback
                } else {
                    Duration::from_secs(retry_after_seconds)
                };
                debug!(sleep_secs = wait.as_secs(), event = "rate_limit_exceeded");
                Ok(PollOutcome::Throttled(wait))
            }
            Err(TransferError::AttestationNotFound) => {
                debug!(event = "attestation_not_found");
                Ok(PollOutcome::Pending(None))
            }
            Err(e @ (TransferError::Network(_)
            | TransferError::Provider(_)
            | TransferError::Json(_))) => {
                warn!(error = %e, event = "attestation_request_failed");
                Ok(PollOutcome::Pending(None))
            }
            Err(e) => Err(e),
        }
    }

    /// Polls with capped exponential backoff until `ready` accepts a response.
    ///
    /// Every non-ready observation is reported as
    /// [`PhaseEvent::AttestationPending`]. Fails with
    /// [`TransferError::AttestationTimeout`] once `max_wait` has elapsed.
    pub async fn wait_until<F>(
        &self,
        lookup: AttestationLookup,
        burn_tx: TxHash,
        observer: &dyn PhaseObserver,
        ready: F,
    ) -> Result<AttestationResponse>
    where
        F: Fn(&AttestationResponse) -> bool + Send + Sync,
    {
        self.wait_until_since(lookup, burn_tx, self.clock.now(), observer, ready)
            .await
    }

    /// [`AttestationPoller::wait_until`] against a deadline of `started + max_wait`,
    /// so consecutive waits on one burn share a single budget.
    pub async fn wait_until_since<F>(
        &self,
        lookup: AttestationLookup,
        burn_tx: TxHash,
        started: Instant,
        observer: &dyn PhaseObserver,
        ready: F,
    ) -> Result<AttestationResponse>
    where
        F: Fn(&AttestationResponse) -> bool + Send + Sync,
    {
        let span = spans::await_attestation(&lookup, self.config.max_wait.as_secs());

        async move {
            info!(lookup = %lookup, event = "attestation_polling_started");
            let mut attempt: u32 = 0;

            loop {
                attempt = attempt.saturating_add(1);
                let wait = match self.poll_once(lookup, &ready).await {
                    Ok(PollOutcome::Ready(response)) => {
                        info!(attempt, event = "attestation_complete");
                        return Ok(response);
                    }
                    Ok(PollOutcome::Pending(_)) => self.config.backoff_for_attempt(attempt - 1),
                    Ok(PollOutcome::Throttled(wait)) => wait,
                    Err(e) => {
                        spans::record_error(&e);
                        return Err(e);
                    }
                };

                let elapsed = self.clock.now().saturating_duration_since(started);
                observer.on_phase_event(PhaseEvent::AttestationPending { attempt, elapsed });

                if elapsed >= self.config.max_wait {
                    let err = TransferError::AttestationTimeout {
                        burn_tx,
                        elapsed_secs: elapsed.as_secs(),
                    };
                    error!(
                        attempts = attempt,
                        elapsed_secs = elapsed.as_secs(),
                        event = "attestation_timeout"
                    );
                    spans::record_error(&err);
                    return Err(err);
                }

                self.clock
                    .sleep(wait.min(self.config.max_wait - elapsed))
                    .await;
            }
        }
        .instrument(span)
        .await
    }

    /// Waits for a complete attestation with signature bytes.
    pub async fn wait_for_attestation(
        &self,
        lookup: AttestationLookup,
        burn_tx: TxHash,
        observer: &dyn PhaseObserver,
    ) -> Result<AttestationResponse> {
        self.wait_until(lookup, burn_tx, observer, |response| {
            response.ready_attestation().is_some()
        })
        .await
    }
}
