// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! ERC20 calls needed before a burn: allowance, approve and balance.

use alloy_primitives::{Address, Bytes, U256};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use tracing::debug;

use crate::error::Result;

sol!(
    #[allow(missing_docs)]
    contract Erc20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
);

/// Calldata builder for one ERC20 token.
///
/// Requests are built here and sent through a [`crate::ChainReader`] or
/// [`crate::ChainSigner`], so the same code runs against live chains and fakes.
#[derive(Debug, Clone, Copy)]
pub struct Erc20Contract {
    address: Address,
}

impl Erc20Contract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn allowance_call(&self, owner: Address, spender: Address) -> TransactionRequest {
        let call = Erc20::allowanceCall { owner, spender };
        TransactionRequest::default()
            .to(self.address)
            .input(Bytes::from(call.abi_encode()).into())
    }

    pub fn decode_allowance(&self, output: &[u8]) -> Result<U256> {
        Ok(Erc20::allowanceCall::abi_decode_returns(output)?)
    }

    pub fn balance_of_call(&self, account: Address) -> TransactionRequest {
        let call = Erc20::balanceOfCall { account };
        TransactionRequest::default()
            .to(self.address)
            .input(Bytes::from(call.abi_encode()).into())
    }

    pub fn decode_balance(&self, output: &[u8]) -> Result<U256> {
        Ok(Erc20::balanceOfCall::abi_decode_returns(output)?)
    }

    /// `approve(spender, amount)` signed by `from`; built, not sent.
    pub fn approve_transaction(
        &self,
        from: Address,
        spender: Address,
        amount: U256,
    ) -> TransactionRequest {
        debug!(
            from = %from,
            spender = %spender,
            amount = %amount,
            contract_address = %self.address,
            event = "approve_transaction_created"
        );

        let call = Erc20::approveCall { spender, amount };
        TransactionRequest::default()
            .from(from)
            .to(self.address)
            .input(Bytes::from(call.abi_encode()).into())
    }
}
