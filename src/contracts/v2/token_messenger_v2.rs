// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! TokenMessengerV2: burn with finality threshold, fee cap and optional hook.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use tracing::info;

use crate::protocol::FinalityThreshold;
use crate::spans;

sol!(
    #[allow(clippy::too_many_arguments)]
    #[allow(missing_docs)]
    contract TokenMessengerV2 {
        function depositForBurn(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold
        ) external;

        function depositForBurnWithHook(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold,
            bytes hookData
        ) external;
    }
);

/// v2-only burn parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BurnOptions {
    /// Largest fee, in asset units, the sender accepts for a fast transfer.
    pub max_fee: U256,
    pub finality: FinalityThreshold,
    /// Only this address may submit the mint; zero lets anyone (the relayer) do it.
    pub destination_caller: B256,
    /// Non-empty hook data switches the burn to `depositForBurnWithHook`.
    pub hook_data: Bytes,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenMessengerV2Contract {
    address: Address,
}

impl TokenMessengerV2Contract {
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
        options: &BurnOptions,
    ) -> TransactionRequest {
        let span = spans::deposit_for_burn(
            &from_address,
            &mint_recipient,
            destination_domain,
            &token_address,
            &amount,
        );
        let _guard = span.enter();

        let has_hooks = !options.hook_data.is_empty();
        info!(
            from_address = %from_address,
            mint_recipient = %mint_recipient,
            destination_domain = destination_domain,
            token_address = %token_address,
            amount = %amount,
            max_fee = %options.max_fee,
            finality = %options.finality,
            has_hooks = has_hooks,
            contract_address = %self.address,
            version = "v2",
            event = "deposit_for_burn_v2_transaction_created"
        );

        let calldata = if has_hooks {
            TokenMessengerV2::depositForBurnWithHookCall {
                amount,
                destinationDomain: destination_domain,
                mintRecipient: mint_recipient,
                burnToken: token_address,
                destinationCaller: options.destination_caller,
                maxFee: options.max_fee,
                minFinalityThreshold: options.finality.as_u32(),
                hookData: options.hook_data.clone(),
            }
            .abi_encode()
        } else {
            TokenMessengerV2::depositForBurnCall {
                amount,
                destinationDomain: destination_domain,
                mintRecipient: mint_recipient,
                burnToken: token_address,
                destinationCaller: options.destination_caller,
                maxFee: options.max_fee,
                minFinalityThreshold: options.finality.as_u32(),
            }
            .abi_encode()
        };

        TransactionRequest::default()
            .from(from_address)
            .to(self.address)
            .input(Bytes::from(calldata).into())
    }
}
