// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! MessageTransmitter: emits `MessageSent` on burn and mints on `receiveMessage`.
//!
//! The event and `receiveMessage(bytes,bytes)` signatures are identical in v1
//! and v2, so one binding serves both.

use alloy_primitives::{Address, Bytes, Log};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall, SolEvent};
use tracing::info;

sol!(
    #[allow(missing_docs)]
    contract MessageTransmitter {
        event MessageSent(bytes message);

        function receiveMessage(bytes message, bytes attestation) external returns (bool success);
    }
);

pub use MessageTransmitter::MessageSent;

#[derive(Debug, Clone, Copy)]
pub struct MessageTransmitterContract {
    address: Address,
}

impl MessageTransmitterContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn receive_message_transaction(
        &self,
        from_address: Address,
        message: Bytes,
        attestation: Bytes,
    ) -> TransactionRequest {
        info!(
            from_address = %from_address,
            message_len = message.len(),
            contract_address = %self.address,
            event = "receive_message_transaction_created"
        );

        let call = MessageTransmitter::receiveMessageCall {
            message,
            attestation,
        };
        TransactionRequest::default()
            .from(from_address)
            .to(self.address)
            .input(Bytes::from(call.abi_encode()).into())
    }
}

/// Message bytes of the first `MessageSent` event among `logs`.
pub fn extract_message_sent(logs: &[Log]) -> Option<Bytes> {
    logs.iter()
        .filter(|log| log.data.topics().first() == Some(&MessageSent::SIGNATURE_HASH))
        .find_map(|log| MessageSent::decode_log_data(&log.data).ok())
        .map(|event| event.message)
}

/// Builds the log a transmitter emits for `message`.
pub fn message_sent_log(transmitter: Address, message: Bytes) -> Log {
    let event = MessageSent { message };
    Log {
        address: transmitter,
        data: event.encode_log_data(),
    }
}
