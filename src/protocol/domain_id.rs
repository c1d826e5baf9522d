// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Circle domain identifiers.
//!
//! A domain id is the bridge's own name for a chain and is unrelated to the EVM
//! chain id. Registries store domains as plain `u32` so that newly launched
//! domains can be configured before this enum learns about them; the enum is
//! used for naming in logs and for the built-in registries.
//!
//! Reference: <https://developers.circle.com/stablecoins/supported-domains>

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
#[non_exhaustive]
pub enum DomainId {
    Ethereum = 0,
    Avalanche = 1,
    Optimism = 2,
    Arbitrum = 3,
    Base = 6,
    Polygon = 7,
    Unichain = 10,
    Linea = 11,
    Sonic = 13,
    WorldChain = 14,
}

impl DomainId {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ethereum),
            1 => Some(Self::Avalanche),
            2 => Some(Self::Optimism),
            3 => Some(Self::Arbitrum),
            6 => Some(Self::Base),
            7 => Some(Self::Polygon),
            10 => Some(Self::Unichain),
            11 => Some(Self::Linea),
            13 => Some(Self::Sonic),
            14 => Some(Self::WorldChain),
            _ => None,
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::Avalanche => "Avalanche",
            Self::Optimism => "Optimism",
            Self::Arbitrum => "Arbitrum",
            Self::Base => "Base",
            Self::Polygon => "Polygon",
            Self::Unichain => "Unichain",
            Self::Linea => "Linea",
            Self::Sonic => "Sonic",
            Self::WorldChain => "World Chain",
        }
    }

    /// Human-readable label for any raw domain, known or not.
    pub fn describe(domain: u32) -> String {
        match Self::from_u32(domain) {
            Some(known) => known.to_string(),
            None => format!("domain {domain}"),
        }
    }
}

impl From<DomainId> for u32 {
    #[inline]
    fn from(domain: DomainId) -> Self {
        domain.as_u32()
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_values_match_circle_assignments() {
        assert_eq!(DomainId::Ethereum.as_u32(), 0);
        assert_eq!(DomainId::Avalanche.as_u32(), 1);
        assert_eq!(DomainId::Arbitrum.as_u32(), 3);
        assert_eq!(DomainId::Base.as_u32(), 6);
        assert_eq!(DomainId::Polygon.as_u32(), 7);
    }

    #[test]
    fn test_from_u32_gaps_are_unknown() {
        assert_eq!(DomainId::from_u32(4), None);
        assert_eq!(DomainId::from_u32(5), None);
        assert_eq!(DomainId::from_u32(999), None);
    }

    #[test]
    fn test_describe_handles_unknown_domains() {
        assert_eq!(DomainId::describe(0), "Ethereum (0)");
        assert_eq!(DomainId::describe(42), "domain 42");
    }
}
