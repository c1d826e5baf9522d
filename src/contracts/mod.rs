// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Contract bindings.
//!
//! Wrappers only build [`alloy_rpc_types::TransactionRequest`]s and decode
//! return data; sending goes through [`crate::ChainReader`] and
//! [`crate::ChainSigner`].

pub mod erc20;
pub mod message_transmitter;
pub mod token_messenger;
pub mod v2;

pub use erc20::{Erc20, Erc20Contract};
pub use message_transmitter::{
    extract_message_sent, message_sent_log, MessageSent, MessageTransmitter,
    MessageTransmitterContract,
};
pub use token_messenger::{TokenMessenger, TokenMessengerContract};
pub use v2::{BurnOptions, TokenMessengerV2, TokenMessengerV2Contract};
