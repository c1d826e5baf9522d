// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! CCTP v1 TokenMessenger: the burn side of a direct transfer.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use tracing::info;

use crate::spans;

sol!(
    #[allow(missing_docs)]
    contract TokenMessenger {
        function depositForBurn(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken
        ) external returns (uint64 nonce);
    }
);

#[derive(Debug, Clone, Copy)]
pub struct TokenMessengerContract {
    address: Address,
}

impl TokenMessengerContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn deposit_for_burn_transaction(
        &self,
        from_address: Address,
        mint_recipient: B256,
        destination_domain: u32,
        token_address: Address,
        amount: U256,
    ) -> TransactionRequest {
        let span = spans::deposit_for_burn(
            &from_address,
            &mint_recipient,
            destination_domain,
            &token_address,
            &amount,
        );
        let _guard = span.enter();

        info!(
            from_address = %from_address,
            mint_recipient = %mint_recipient,
            destination_domain = destination_domain,
            token_address = %token_address,
            amount = %amount,
            contract_address = %self.address,
            event = "deposit_for_burn_transaction_created"
        );

        let call = TokenMessenger::depositForBurnCall {
            amount,
            destinationDomain: destination_domain,
            mintRecipient: mint_recipient,
            burnToken: token_address,
        };
        TransactionRequest::default()
            .from(from_address)
            .to(self.address)
            .input(Bytes::from(call.abi_encode()).into())
    }
}
