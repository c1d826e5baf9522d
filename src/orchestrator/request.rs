// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use alloy_primitives::utils::parse_units;
use alloy_primitives::{Address, U256};
use bon::Builder;

use crate::chain::{ChainConfig, ChainRegistry};
use crate::error::{Result, TransferError};

/// One user-initiated transfer. Immutable once execution starts.
///
/// ```rust
/// use alloy_primitives::{Address, U256};
/// use cctp_orchestrator::{ChainRegistry, TransferRequest};
///
/// let registry = ChainRegistry::v2_testnet();
/// let request = TransferRequest::builder()
///     .source(registry.resolve(11155111).unwrap().clone())
///     .destination(registry.resolve(84532).unwrap().clone())
///     .amount(U256::from(10_000_000))
///     .sender(Address::repeat_byte(1))
///     .build();
///
/// assert_eq!(request.recipient_address(), Address::repeat_byte(1));
/// assert!(request.validate(&registry).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct TransferRequest {
    pub source: ChainConfig,
    pub destination: ChainConfig,
    /// Atomic units of the source asset.
    pub amount: U256,
    pub sender: Address,
    /// Defaults to `sender`.
    pub recipient: Option<Address>,
}

impl TransferRequest {
    /// Builds a request from user-entered strings.
    ///
    /// `amount` is a decimal in whole tokens and is scaled by the source
    /// asset's decimals; an empty `recipient` means "send to myself".
    pub fn from_form(
        registry: &ChainRegistry,
        source_chain_id: u64,
        destination_chain_id: u64,
        amount: &str,
        sender: Address,
        recipient: Option<&str>,
    ) -> Result<Self> {
        let source = registry.resolve(source_chain_id)?.clone();
        let destination = registry.resolve(destination_chain_id)?.clone();

        let amount = amount.trim();
        if amount.is_empty() {
            return Err(TransferError::invalid_request("amount", "is empty"));
        }
        let parsed = parse_units(amount, source.asset_decimals)
            .map_err(|e| TransferError::invalid_request("amount", format!("`{amount}`: {e}")))?;
        if parsed.is_negative() {
            return Err(TransferError::invalid_request("amount", "must not be negative"));
        }

        let recipient = match recipient.map(str::trim).filter(|r| !r.is_empty()) {
            None => None,
            Some(raw) => Some(raw.parse::<Address>().map_err(|_| {
                TransferError::invalid_request("recipient", format!("`{raw}` is not an address"))
            })?),
        };

        let request = Self {
            source,
            destination,
            amount: parsed.get_absolute(),
            sender,
            recipient,
        };
        request.validate(registry)?;
        Ok(request)
    }

    pub fn recipient_address(&self) -> Address {
        self.recipient.unwrap_or(self.sender)
    }

    /// Checks the request before anything is submitted.
    pub fn validate(&self, registry: &ChainRegistry) -> Result<()> {
        if self.source.chain_id == self.destination.chain_id {
            return Err(TransferError::invalid_request(
                "destination",
                "must differ from the source chain",
            ));
        }
        if registry.resolve(self.source.chain_id)? != &self.source {
            return Err(TransferError::invalid_request(
                "source",
                "does not match the registry entry",
            ));
        }
        if registry.resolve(self.destination.chain_id)? != &self.destination {
            return Err(TransferError::invalid_request(
                "destination",
                "does not match the registry entry",
            ));
        }
        if self.amount.is_zero() {
            return Err(TransferError::invalid_request(
                "amount",
                "must be greater than zero",
            ));
        }
        if self.sender.is_zero() {
            return Err(TransferError::invalid_request("sender", "is the zero address"));
        }
        if self.recipient.is_some_and(|r| r.is_zero()) {
            return Err(TransferError::invalid_request("recipient", "is the zero address"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SEPOLIA: u64 = 11155111;
    const BASE_SEPOLIA: u64 = 84532;

    fn registry() -> ChainRegistry {
        ChainRegistry::v1_testnet()
    }

    #[test]
    fn test_form_amount_is_scaled_by_decimals() {
        let request = TransferRequest::from_form(
            &registry(),
            SEPOLIA,
            BASE_SEPOLIA,
            "10.5",
            Address::repeat_byte(1),
            None,
        )
        .unwrap();

        assert_eq!(request.amount, U256::from(10_500_000));
        assert_eq!(request.recipient_address(), Address::repeat_byte(1));
    }

    #[test]
    fn test_form_recipient_is_parsed() {
        let request = TransferRequest::from_form(
            &registry(),
            SEPOLIA,
            BASE_SEPOLIA,
            "1",
            Address::repeat_byte(1),
            Some(" 0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d "),
        )
        .unwrap();
        assert_eq!(
            request.recipient,
            Some("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".parse().unwrap())
        );
    }

    #[rstest]
    #[case(SEPOLIA, SEPOLIA, "1", None, "destination")]
    #[case(SEPOLIA, BASE_SEPOLIA, "0", None, "amount")]
    #[case(SEPOLIA, BASE_SEPOLIA, "", None, "amount")]
    #[case(SEPOLIA, BASE_SEPOLIA, "ten", None, "amount")]
    #[case(SEPOLIA, BASE_SEPOLIA, "-1", None, "amount")]
    #[case(SEPOLIA, BASE_SEPOLIA, "1", Some("0x1234"), "recipient")]
    #[case(
        SEPOLIA,
        BASE_SEPOLIA,
        "1",
        Some("0x0000000000000000000000000000000000000000"),
        "recipient"
    )]
    fn test_invalid_form_reports_field(
        #[case] source: u64,
        #[case] destination: u64,
        #[case] amount: &str,
        #[case] recipient: Option<&str>,
        #[case] expected_field: &str,
    ) {
        let err = TransferRequest::from_form(
            &registry(),
            source,
            destination,
            amount,
            Address::repeat_byte(1),
            recipient,
        )
        .unwrap_err();

        match err {
            TransferError::InvalidRequest { field, .. } => assert_eq!(field, expected_field),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_chain_is_unconfigured() {
        let err = TransferRequest::from_form(
            &registry(),
            SEPOLIA,
            999,
            "1",
            Address::repeat_byte(1),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::UnconfiguredChain { chain_id: 999 }));
    }

    #[test]
    fn test_stale_chain_config_is_rejected() {
        let registry = registry();
        let mut source = registry.resolve(SEPOLIA).unwrap().clone();
        source.domain_id = 42;

        let request = TransferRequest::builder()
            .source(source)
            .destination(registry.resolve(BASE_SEPOLIA).unwrap().clone())
            .amount(U256::from(1))
            .sender(Address::repeat_byte(1))
            .build();

        let err = request.validate(&registry).unwrap_err();
        insta::assert_snapshot!(err, @"Invalid request (source): does not match the registry entry");
    }
}
