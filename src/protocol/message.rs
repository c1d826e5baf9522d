// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Layout of the message a burn emits and the attestation service signs.
//!
//! v1 and v2 messages share the first twelve bytes (`version`, `sourceDomain`,
//! `destinationDomain`); everything after that differs. Only the v2 header and
//! burn body are decoded in full, since that is the message the relayed flow
//! cross-checks against its own burn.
//!
//! Reference: <https://developers.circle.com/cctp/technical-guide>

use alloy_primitives::{Address, Bytes, B256, U256};

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_be_bytes(word)
}

fn read_word(bytes: &[u8], offset: usize) -> B256 {
    B256::from_slice(&bytes[offset..offset + 32])
}

/// Returns `(source_domain, destination_domain)` for a message of either version.
pub fn message_domains(message: &[u8]) -> Option<(u32, u32)> {
    if message.len() < 12 {
        return None;
    }
    Some((read_u32(message, 4), read_u32(message, 8)))
}

/// v2 message header, 148 bytes:
///
/// | field | bytes |
/// |---|---|
/// | version | 4 |
/// | sourceDomain | 4 |
/// | destinationDomain | 4 |
/// | nonce | 32 |
/// | sender | 32 |
/// | recipient | 32 |
/// | destinationCaller | 32 |
/// | minFinalityThreshold | 4 |
/// | finalityThresholdExecuted | 4 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub version: u32,
    pub source_domain: u32,
    pub destination_domain: u32,
    pub nonce: B256,
    pub sender: B256,
    pub recipient: B256,
    pub destination_caller: B256,
    pub min_finality_threshold: u32,
    pub finality_threshold_executed: u32,
}

impl MessageHeader {
    pub const SIZE: usize = 148;

    pub fn encode(&self) -> Bytes {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.version.to_be_bytes());
        bytes.extend_from_slice(&self.source_domain.to_be_bytes());
        bytes.extend_from_slice(&self.destination_domain.to_be_bytes());
        bytes.extend_from_slice(self.nonce.as_slice());
        bytes.extend_from_slice(self.sender.as_slice());
        bytes.extend_from_slice(self.recipient.as_slice());
        bytes.extend_from_slice(self.destination_caller.as_slice());
        bytes.extend_from_slice(&self.min_finality_threshold.to_be_bytes());
        bytes.extend_from_slice(&self.finality_threshold_executed.to_be_bytes());
        Bytes::from(bytes)
    }

    /// Returns `None` when fewer than [`MessageHeader::SIZE`] bytes are supplied.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }

        Some(Self {
            version: read_u32(bytes, 0),
            source_domain: read_u32(bytes, 4),
            destination_domain: read_u32(bytes, 8),
            nonce: read_word(bytes, 12),
            sender: read_word(bytes, 44),
            recipient: read_word(bytes, 76),
            destination_caller: read_word(bytes, 108),
            min_finality_threshold: read_u32(bytes, 140),
            finality_threshold_executed: read_u32(bytes, 144),
        })
    }
}

/// v2 burn message body, which follows the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnMessageBody {
    pub version: u32,
    pub burn_token: Address,
    pub mint_recipient: B256,
    pub amount: U256,
    pub message_sender: Address,
    pub max_fee: U256,
    pub fee_executed: U256,
    pub expiration_block: U256,
    pub hook_data: Bytes,
}

impl BurnMessageBody {
    /// Size without hook data.
    pub const MIN_SIZE: usize = 228;

    pub fn encode(&self) -> Bytes {
        let mut bytes = Vec::with_capacity(Self::MIN_SIZE + self.hook_data.len());
        bytes.extend_from_slice(&self.version.to_be_bytes());
        bytes.extend_from_slice(self.burn_token.into_word().as_slice());
        bytes.extend_from_slice(self.mint_recipient.as_slice());
        bytes.extend_from_slice(&self.amount.to_be_bytes::<32>());
        bytes.extend_from_slice(self.message_sender.into_word().as_slice());
        bytes.extend_from_slice(&self.max_fee.to_be_bytes::<32>());
        bytes.extend_from_slice(&self.fee_executed.to_be_bytes::<32>());
        bytes.extend_from_slice(&self.expiration_block.to_be_bytes::<32>());
        bytes.extend_from_slice(&self.hook_data);
        Bytes::from(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::MIN_SIZE {
            return None;
        }

        let word = |offset: usize| U256::from_be_slice(&bytes[offset..offset + 32]);
        Some(Self {
            version: read_u32(bytes, 0),
            burn_token: Address::from_word(read_word(bytes, 4)),
            mint_recipient: read_word(bytes, 36),
            amount: word(68),
            message_sender: Address::from_word(read_word(bytes, 100)),
            max_fee: word(132),
            fee_executed: word(164),
            expiration_block: word(196),
            hook_data: Bytes::copy_from_slice(&bytes[Self::MIN_SIZE..]),
        })
    }
}

/// Header plus burn body of a v2 burn message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnMessage {
    pub header: MessageHeader,
    pub body: BurnMessageBody,
}

impl BurnMessage {
    pub fn encode(&self) -> Bytes {
        let mut bytes = self.header.encode().to_vec();
        bytes.extend_from_slice(&self.body.encode());
        Bytes::from(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let header = MessageHeader::decode(bytes)?;
        let body = BurnMessageBody::decode(&bytes[MessageHeader::SIZE..])?;
        Some(Self { header, body })
    }
}
