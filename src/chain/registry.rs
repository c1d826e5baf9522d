// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::{HashMap, HashSet};
use std::path::Path;

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::addresses::*;
use crate::error::{Result, TransferError};
use crate::protocol::DomainId;

const USDC_DECIMALS: u8 = 6;

/// A chain the orchestrator may bridge from or to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    /// Circle domain id; `0` is a valid domain (Ethereum).
    pub domain_id: u32,
    /// Token burned on this chain and minted on the other side.
    pub asset_address: Address,
    /// TokenMessenger: spender for the allowance and target of the burn.
    pub messenger_address: Address,
    /// MessageTransmitter: target of the mint when this chain is the destination.
    pub transmitter_address: Address,
    pub asset_decimals: u8,
    pub testnet: bool,
}

/// Unvalidated registry row as it appears in configuration files.
///
/// Every field is optional here so that a missing field is reported by name
/// instead of as a generic deserialization error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChainEntry {
    pub chain_id: Option<u64>,
    pub name: Option<String>,
    pub domain_id: Option<u32>,
    pub asset_address: Option<Address>,
    pub messenger_address: Option<Address>,
    pub transmitter_address: Option<Address>,
    pub asset_decimals: Option<u8>,
    #[serde(default)]
    pub testnet: bool,
}

impl From<&ChainConfig> for ChainEntry {
    fn from(config: &ChainConfig) -> Self {
        Self {
            chain_id: Some(config.chain_id),
            name: Some(config.name.clone()),
            domain_id: Some(config.domain_id),
            asset_address: Some(config.asset_address),
            messenger_address: Some(config.messenger_address),
            transmitter_address: Some(config.transmitter_address),
            asset_decimals: Some(config.asset_decimals),
            testnet: config.testnet,
        }
    }
}

fn required<T>(value: Option<T>, position: usize, field: &str) -> Result<T> {
    value.ok_or_else(|| {
        TransferError::InvalidConfig(format!("chain entry #{position}: missing `{field}`"))
    })
}

fn nonzero_address(value: Option<Address>, position: usize, field: &str) -> Result<Address> {
    let address = required(value, position, field)?;
    if address == Address::ZERO {
        return Err(TransferError::InvalidConfig(format!(
            "chain entry #{position}: `{field}` is the zero address"
        )));
    }
    Ok(address)
}

impl ChainEntry {
    fn into_config(self, position: usize) -> Result<ChainConfig> {
        let chain_id = required(self.chain_id, position, "chain_id")?;
        if chain_id == 0 {
            return Err(TransferError::InvalidConfig(format!(
                "chain entry #{position}: `chain_id` must be non-zero"
            )));
        }
        let name = required(self.name, position, "name")?;
        if name.trim().is_empty() {
            return Err(TransferError::InvalidConfig(format!(
                "chain entry #{position}: `name` is empty"
            )));
        }

        Ok(ChainConfig {
            chain_id,
            name,
            domain_id: required(self.domain_id, position, "domain_id")?,
            asset_address: nonzero_address(self.asset_address, position, "asset_address")?,
            messenger_address: nonzero_address(
                self.messenger_address,
                position,
                "messenger_address",
            )?,
            transmitter_address: nonzero_address(
                self.transmitter_address,
                position,
                "transmitter_address",
            )?,
            asset_decimals: self.asset_decimals.unwrap_or(USDC_DECIMALS),
            testnet: self.testnet,
        })
    }
}

/// Immutable, validated set of bridgeable chains.
///
/// Any two distinct members form a valid route in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: Vec<ChainConfig>,
    by_chain_id: HashMap<u64, usize>,
}

impl ChainRegistry {
    /// Validates `entries` and builds a registry in the given order.
    ///
    /// Rejects empty input, missing or zero fields, and duplicate chain or
    /// domain ids.
    pub fn from_entries(entries: Vec<ChainEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(TransferError::InvalidConfig(
                "chain registry has no entries".to_string(),
            ));
        }

        let chains = entries
            .into_iter()
            .enumerate()
            .map(|(position, entry)| entry.into_config(position))
            .collect::<Result<Vec<_>>>()?;
        let registry = Self::indexed(chains)?;

        debug!(
            chains = registry.len(),
            event = "chain_registry_loaded",
            "Chain registry loaded"
        );
        Ok(registry)
    }

    /// Indexes `chains`, rejecting duplicate chain or domain ids.
    fn indexed(chains: Vec<ChainConfig>) -> Result<Self> {
        let mut domains = HashSet::new();
        let mut by_chain_id = HashMap::with_capacity(chains.len());

        for (index, config) in chains.iter().enumerate() {
            if by_chain_id.insert(config.chain_id, index).is_some() {
                return Err(TransferError::InvalidConfig(format!(
                    "chain id {} is listed more than once",
                    config.chain_id
                )));
            }
            if !domains.insert(config.domain_id) {
                return Err(TransferError::InvalidConfig(format!(
                    "domain id {} is listed more than once",
                    config.domain_id
                )));
            }
        }

        Ok(Self {
            chains,
            by_chain_id,
        })
    }

    /// Parses a JSON array of [`ChainEntry`] objects.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<ChainEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            TransferError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// `UnconfiguredChain` when `chain_id` is not a member.
    pub fn resolve(&self, chain_id: u64) -> Result<&ChainConfig> {
        self.by_chain_id
            .get(&chain_id)
            .map(|&index| &self.chains[index])
            .ok_or(TransferError::UnconfiguredChain { chain_id })
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.by_chain_id.contains_key(&chain_id)
    }

    /// Members in load order.
    pub fn supported_chains(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.iter()
    }

    /// Every ordered `(source, destination)` route with distinct endpoints.
    pub fn pairs(&self) -> impl Iterator<Item = (&ChainConfig, &ChainConfig)> {
        self.chains.iter().flat_map(move |source| {
            self.chains
                .iter()
                .filter(move |destination| destination.chain_id != source.chain_id)
                .map(move |destination| (source, destination))
        })
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn entries(&self) -> Vec<ChainEntry> {
        self.chains.iter().map(ChainEntry::from).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }

    /// Built-in tables go through the same checks as loaded ones.
    fn builtin(chains: Vec<ChainConfig>) -> Self {
        let entries = chains.iter().map(ChainEntry::from).collect();
        debug_assert!(
            Self::from_entries(entries).is_ok_and(|checked| checked.chains == chains),
            "built-in chain table is invalid"
        );
        let by_chain_id = chains
            .iter()
            .enumerate()
            .map(|(index, chain)| (chain.chain_id, index))
            .collect();
        Self {
            chains,
            by_chain_id,
        }
    }

    /// CCTP v1 mainnets.
    #[rustfmt::skip]
    pub fn v1_mainnet() -> Self {
        Self::builtin(vec![
            usdc_chain(NamedChain::Mainnet, "Ethereum", DomainId::Ethereum, ETHEREUM_USDC, ETHEREUM_TOKEN_MESSENGER, ETHEREUM_MESSAGE_TRANSMITTER, false),
            usdc_chain(NamedChain::Avalanche, "Avalanche", DomainId::Avalanche, AVALANCHE_USDC, AVALANCHE_TOKEN_MESSENGER, AVALANCHE_MESSAGE_TRANSMITTER, false),
            usdc_chain(NamedChain::Optimism, "OP Mainnet", DomainId::Optimism, OPTIMISM_USDC, OPTIMISM_TOKEN_MESSENGER, OPTIMISM_MESSAGE_TRANSMITTER, false),
            usdc_chain(NamedChain::Arbitrum, "Arbitrum One", DomainId::Arbitrum, ARBITRUM_USDC, ARBITRUM_TOKEN_MESSENGER, ARBITRUM_MESSAGE_TRANSMITTER, false),
            usdc_chain(NamedChain::Base, "Base", DomainId::Base, BASE_USDC, BASE_TOKEN_MESSENGER, BASE_MESSAGE_TRANSMITTER, false),
            usdc_chain(NamedChain::Polygon, "Polygon PoS", DomainId::Polygon, POLYGON_USDC, POLYGON_TOKEN_MESSENGER, POLYGON_MESSAGE_TRANSMITTER, false),
        ])
    }

    /// CCTP v1 testnets.
    #[rustfmt::skip]
    pub fn v1_testnet() -> Self {
        Self::builtin(vec![
            usdc_chain(NamedChain::Sepolia, "Ethereum Sepolia", DomainId::Ethereum, SEPOLIA_USDC, TESTNET_TOKEN_MESSENGER, TESTNET_MESSAGE_TRANSMITTER, true),
            usdc_chain(NamedChain::AvalancheFuji, "Avalanche Fuji", DomainId::Avalanche, AVALANCHE_FUJI_USDC, AVALANCHE_FUJI_TOKEN_MESSENGER, AVALANCHE_FUJI_MESSAGE_TRANSMITTER, true),
            usdc_chain(NamedChain::OptimismSepolia, "OP Sepolia", DomainId::Optimism, OPTIMISM_SEPOLIA_USDC, TESTNET_TOKEN_MESSENGER, TESTNET_MESSAGE_TRANSMITTER, true),
            usdc_chain(NamedChain::ArbitrumSepolia, "Arbitrum Sepolia", DomainId::Arbitrum, ARBITRUM_SEPOLIA_USDC, TESTNET_TOKEN_MESSENGER, ARBITRUM_SEPOLIA_MESSAGE_TRANSMITTER, true),
            usdc_chain(NamedChain::BaseSepolia, "Base Sepolia", DomainId::Base, BASE_SEPOLIA_USDC, TESTNET_TOKEN_MESSENGER, TESTNET_MESSAGE_TRANSMITTER, true),
        ])
    }

    /// CCTP v2 mainnets.
    #[rustfmt::skip]
    pub fn v2_mainnet() -> Self {
        let (m, t) = (V2_TOKEN_MESSENGER_MAINNET, V2_MESSAGE_TRANSMITTER_MAINNET);
        Self::builtin(vec![
            usdc_chain(NamedChain::Mainnet, "Ethereum", DomainId::Ethereum, ETHEREUM_USDC, m, t, false),
            usdc_chain(NamedChain::Avalanche, "Avalanche", DomainId::Avalanche, AVALANCHE_USDC, m, t, false),
            usdc_chain(NamedChain::Optimism, "OP Mainnet", DomainId::Optimism, OPTIMISM_USDC, m, t, false),
            usdc_chain(NamedChain::Arbitrum, "Arbitrum One", DomainId::Arbitrum, ARBITRUM_USDC, m, t, false),
            usdc_chain(NamedChain::Base, "Base", DomainId::Base, BASE_USDC, m, t, false),
            usdc_chain(NamedChain::Polygon, "Polygon PoS", DomainId::Polygon, POLYGON_USDC, m, t, false),
        ])
    }

    /// CCTP v2 testnets.
    #[rustfmt::skip]
    pub fn v2_testnet() -> Self {
        let (m, t) = (V2_TOKEN_MESSENGER_TESTNET, V2_MESSAGE_TRANSMITTER_TESTNET);
        Self::builtin(vec![
            usdc_chain(NamedChain::Sepolia, "Ethereum Sepolia", DomainId::Ethereum, SEPOLIA_USDC, m, t, true),
            usdc_chain(NamedChain::AvalancheFuji, "Avalanche Fuji", DomainId::Avalanche, AVALANCHE_FUJI_USDC, m, t, true),
            usdc_chain(NamedChain::OptimismSepolia, "OP Sepolia", DomainId::Optimism, OPTIMISM_SEPOLIA_USDC, m, t, true),
            usdc_chain(NamedChain::ArbitrumSepolia, "Arbitrum Sepolia", DomainId::Arbitrum, ARBITRUM_SEPOLIA_USDC, m, t, true),
            usdc_chain(NamedChain::BaseSepolia, "Base Sepolia", DomainId::Base, BASE_SEPOLIA_USDC, m, t, true),
        ])
    }
}

#[allow(clippy::too_many_arguments)]
fn usdc_chain(
    chain: NamedChain,
    name: &str,
    domain: DomainId,
    asset_address: Address,
    messenger_address: Address,
    transmitter_address: Address,
    testnet: bool,
) -> ChainConfig {
    ChainConfig {
        chain_id: chain as u64,
        name: name.to_string(),
        domain_id: domain.as_u32(),
        asset_address,
        messenger_address,
        transmitter_address,
        asset_decimals: USDC_DECIMALS,
        testnet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TWO_CHAINS: &str = r#"[
        {
            "chain_id": 11155111,
            "name": "Sepolia",
            "domain_id": 0,
            "asset_address": "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
            "messenger_address": "0x9f3B8679c73C2Fef8b59B4f3444d4e156fb70AA5",
            "transmitter_address": "0x7865fAfC2db2093669d92c0F33AeEF291086BEFD",
            "testnet": true
        },
        {
            "chain_id": 84532,
            "name": "Base Sepolia",
            "domain_id": 6,
            "asset_address": "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
            "messenger_address": "0x9f3B8679c73C2Fef8b59B4f3444d4e156fb70AA5",
            "transmitter_address": "0x7865fAfC2db2093669d92c0F33AeEF291086BEFD",
            "testnet": true
        }
    ]"#;

    #[test]
    fn test_from_json_accepts_domain_zero() {
        let registry = ChainRegistry::from_json(TWO_CHAINS).unwrap();

        assert_eq!(registry.len(), 2);
        let sepolia = registry.resolve(11155111).unwrap();
        assert_eq!(sepolia.domain_id, 0);
        assert_eq!(sepolia.asset_decimals, 6);
        assert!(sepolia.testnet);
    }

    #[test]
    fn test_resolve_unknown_chain() {
        let registry = ChainRegistry::from_json(TWO_CHAINS).unwrap();
        let err = registry.resolve(1).unwrap_err();
        assert!(matches!(err, TransferError::UnconfiguredChain { chain_id: 1 }));
    }

    #[test]
    fn test_supported_chains_keep_load_order() {
        let registry = ChainRegistry::from_json(TWO_CHAINS).unwrap();
        let ids: Vec<u64> = registry.supported_chains().map(|c| c.chain_id).collect();
        assert_eq!(ids, vec![11155111, 84532]);
    }

    #[test]
    fn test_missing_domain_id_is_rejected() {
        let mut entries: Vec<ChainEntry> = serde_json::from_str(TWO_CHAINS).unwrap();
        entries[1].domain_id = None;

        let err = ChainRegistry::from_entries(entries).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Invalid configuration: chain entry #1: missing `domain_id`");
    }

    #[rstest]
    #[case::duplicate_chain(
        |e: &mut Vec<ChainEntry>| e[1].chain_id = e[0].chain_id,
        "chain id 11155111 is listed more than once"
    )]
    #[case::duplicate_domain(
        |e: &mut Vec<ChainEntry>| e[1].domain_id = Some(0),
        "domain id 0 is listed more than once"
    )]
    #[case::zero_asset(
        |e: &mut Vec<ChainEntry>| e[0].asset_address = Some(Address::ZERO),
        "`asset_address` is the zero address"
    )]
    #[case::missing_messenger(
        |e: &mut Vec<ChainEntry>| e[0].messenger_address = None,
        "missing `messenger_address`"
    )]
    #[case::empty_name(
        |e: &mut Vec<ChainEntry>| e[0].name = Some(" ".to_string()),
        "`name` is empty"
    )]
    fn test_invalid_entries_are_rejected(
        #[case] corrupt: fn(&mut Vec<ChainEntry>),
        #[case] expected: &str,
    ) {
        let mut entries: Vec<ChainEntry> = serde_json::from_str(TWO_CHAINS).unwrap();
        corrupt(&mut entries);

        let err = ChainRegistry::from_entries(entries).unwrap_err();
        assert!(matches!(err, TransferError::InvalidConfig(_)));
        assert!(err.to_string().contains(expected), "{err}");
    }

    #[test]
    fn test_empty_registry_is_rejected() {
        assert!(ChainRegistry::from_entries(vec![]).is_err());
    }

    #[test]
    fn test_pairs_cover_every_ordered_route() {
        let registry = ChainRegistry::v2_mainnet();
        let n = registry.len();
        let pairs: Vec<_> = registry.pairs().collect();

        assert_eq!(pairs.len(), n * (n - 1));
        assert!(pairs.iter().all(|(a, b)| a.chain_id != b.chain_id));
    }

    #[rstest]
    #[case::v1_mainnet(ChainRegistry::v1_mainnet())]
    #[case::v1_testnet(ChainRegistry::v1_testnet())]
    #[case::v2_mainnet(ChainRegistry::v2_mainnet())]
    #[case::v2_testnet(ChainRegistry::v2_testnet())]
    fn test_builtin_registries_pass_validation(#[case] registry: ChainRegistry) {
        let reloaded = ChainRegistry::from_json(&registry.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, registry);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "built-in chain table is invalid")]
    fn test_builtin_table_with_duplicate_domain_is_caught() {
        let mut chains: Vec<ChainConfig> =
            ChainRegistry::v1_testnet().supported_chains().cloned().collect();
        chains[1].domain_id = chains[0].domain_id;
        ChainRegistry::builtin(chains);
    }

    #[test]
    fn test_builtin_ethereum_ids() {
        let registry = ChainRegistry::v2_mainnet();
        let ethereum = registry.resolve(1).unwrap();
        assert_eq!(ethereum.domain_id, 0);
        assert_eq!(ethereum.asset_address, ETHEREUM_USDC);
        assert_eq!(ethereum.messenger_address, V2_TOKEN_MESSENGER_MAINNET);
        assert_eq!(registry.resolve(8453).unwrap().domain_id, 6);
    }
}
