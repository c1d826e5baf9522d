// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Minimum finality a v2 burn asks the attestation service to wait for.

use std::fmt;

/// Finality threshold passed to `depositForBurn` on the v2 messenger.
///
/// `Fast` lets the service attest at the confirmed block level in exchange for
/// the fee capped by `maxFee`; `Standard` waits for hard finality and is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum FinalityThreshold {
    Fast = 1000,
    #[default]
    Standard = 2000,
}

impl FinalityThreshold {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1000 => Some(Self::Fast),
            2000 => Some(Self::Standard),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_fast(self) -> bool {
        matches!(self, Self::Fast)
    }
}

impl fmt::Display for FinalityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "fast ({})", self.as_u32()),
            Self::Standard => write!(f, "standard ({})", self.as_u32()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_values() {
        assert_eq!(FinalityThreshold::Fast.as_u32(), 1000);
        assert_eq!(FinalityThreshold::Standard.as_u32(), 2000);
        assert_eq!(FinalityThreshold::from_u32(1500), None);
    }

    #[test]
    fn test_default_is_standard() {
        assert_eq!(FinalityThreshold::default(), FinalityThreshold::Standard);
        assert!(!FinalityThreshold::default().is_fast());
    }
}
