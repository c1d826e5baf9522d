// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::allowance::ApprovalAmount;
use crate::bridge::PollingConfig;
use crate::confirmation::ConfirmationConfig;
use crate::error::{Result, TransferError};
use crate::wallet::ChainSwitchPolicy;

/// Largest accepted progress channel capacity; the channel preallocates every slot.
pub const MAX_PROGRESS_CAPACITY: usize = 65_536;

/// Tunables of a [`crate::TransferOrchestrator`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Not read by the orchestrator; handed to the bridge backend when it is built.
    pub polling: PollingConfig,
    pub confirmation: ConfirmationConfig,
    pub chain_switch: ChainSwitchPolicy,
    pub approval_amount: ApprovalAmount,
    /// Buffered progress events per subscriber before the slowest one lags.
    /// Clamped to `1..=MAX_PROGRESS_CAPACITY`.
    pub progress_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            polling: PollingConfig::default(),
            confirmation: ConfirmationConfig::default(),
            chain_switch: ChainSwitchPolicy::default(),
            approval_amount: ApprovalAmount::default(),
            progress_capacity: 64,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by `CCTP_*` variables from the environment or a `.env` file.
    ///
    /// | variable | meaning |
    /// |---|---|
    /// | `CCTP_ATTESTATION_INITIAL_INTERVAL_SECS` | first attestation poll wait |
    /// | `CCTP_ATTESTATION_MAX_INTERVAL_SECS` | backoff cap |
    /// | `CCTP_ATTESTATION_MAX_WAIT_SECS` | attestation deadline |
    /// | `CCTP_FAST_TRANSFER` | `true` starts from the fast-transfer preset |
    /// | `CCTP_CONFIRMATION_TIMEOUT_SECS` | receipt wait deadline |
    /// | `CCTP_REQUIRED_CONFIRMATIONS` | blocks per receipt |
    /// | `CCTP_CHAIN_SWITCH_ATTEMPTS` | wallet switch attempts |
    /// | `CCTP_CHAIN_SWITCH_DELAY_MS` | pause between switch attempts |
    /// | `CCTP_APPROVAL_AMOUNT` | `exact` or `unlimited` |
    /// | `CCTP_PROGRESS_CAPACITY` | progress channel capacity, `1..=65536` |
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), event = "dotenv_loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`OrchestratorConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let parse = |key: &'static str| -> Result<Option<u64>> {
            read(key).map(|v| parse_var(key, &v)).transpose()
        };

        let mut config = Self::default();

        if read("CCTP_FAST_TRANSFER").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            config.polling = PollingConfig::fast_transfer();
        }
        if let Some(secs) = parse("CCTP_ATTESTATION_INITIAL_INTERVAL_SECS")? {
            config.polling = config.polling.with_initial_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = parse("CCTP_ATTESTATION_MAX_INTERVAL_SECS")? {
            config.polling = config.polling.with_max_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = parse("CCTP_ATTESTATION_MAX_WAIT_SECS")? {
            config.polling = config.polling.with_max_wait(Duration::from_secs(secs));
        }
        if let Some(secs) = parse("CCTP_CONFIRMATION_TIMEOUT_SECS")? {
            config.confirmation = config.confirmation.with_timeout(Duration::from_secs(secs));
        }
        if let Some(blocks) = parse("CCTP_REQUIRED_CONFIRMATIONS")? {
            config.confirmation = config.confirmation.with_required_confirmations(blocks);
        }
        if let Some(attempts) = parse("CCTP_CHAIN_SWITCH_ATTEMPTS")? {
            config.chain_switch.attempts = u32::try_from(attempts).map_err(|_| {
                TransferError::InvalidConfig(format!(
                    "CCTP_CHAIN_SWITCH_ATTEMPTS: {attempts} is too large"
                ))
            })?;
        }
        if let Some(ms) = parse("CCTP_CHAIN_SWITCH_DELAY_MS")? {
            config.chain_switch.delay = Duration::from_millis(ms);
        }
        if let Some(capacity) = parse("CCTP_PROGRESS_CAPACITY")? {
            config.progress_capacity = usize::try_from(capacity)
                .ok()
                .filter(|c| (1..=MAX_PROGRESS_CAPACITY).contains(c))
                .ok_or_else(|| {
                    TransferError::InvalidConfig(format!(
                        "CCTP_PROGRESS_CAPACITY: {capacity} is outside 1..={MAX_PROGRESS_CAPACITY}"
                    ))
                })?;
        }
        if let Some(value) = read("CCTP_APPROVAL_AMOUNT") {
            config.approval_amount = value.parse()?;
        }

        Ok(config)
    }
}

fn parse_var(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|e| TransferError::InvalidConfig(format!("{key}: `{value}`: {e}")))
}

impl FromStr for ApprovalAmount {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "unlimited" | "max" => Ok(Self::Unlimited),
            other => Err(TransferError::InvalidConfig(format!(
                "CCTP_APPROVAL_AMOUNT: expected `exact` or `unlimited`, got `{other}`"
            ))),
        }
    }
}
