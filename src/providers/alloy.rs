// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Alloy-backed [`ChainReader`] / [`ChainSigner`].

use alloy_json_rpc::RpcError;
use alloy_network::{Ethereum, ReceiptResponse};
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_transport::TransportErrorKind;
use async_trait::async_trait;
use tracing::{debug, instrument, trace, warn};

use crate::error::{Result, SignerError, TransferError};
use crate::traits::{ChainReader, ChainSigner, TxReceipt};

pub const DEFAULT_GAS_BUFFER_PERCENT: u64 = 20;

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;

/// Estimates gas for `tx` and pads it by `buffer_percent` (default 20%).
///
/// Estimates can undershoot when state moves between estimation and
/// inclusion; the padding keeps burns from running out of gas.
pub async fn estimate_gas_with_buffer<P: Provider<Ethereum>>(
    provider: &P,
    tx: &TransactionRequest,
    buffer_percent: Option<u64>,
) -> Result<u64> {
    let buffer = buffer_percent.unwrap_or(DEFAULT_GAS_BUFFER_PERCENT);

    let estimate = provider
        .estimate_gas(tx.clone())
        .await
        .map_err(|e| TransferError::Provider(format!("Gas estimation failed: {e}")))?;

    Ok(estimate.saturating_mul(100 + buffer) / 100)
}

/// Maps a JSON-RPC failure from a signing endpoint onto [`SignerError`].
pub fn signer_error(error: RpcError<TransportErrorKind>) -> SignerError {
    match error.as_error_resp() {
        Some(payload) if payload.code == USER_REJECTED_CODE => {
            SignerError::Rejected(payload.message.to_string())
        }
        _ => SignerError::Rpc(error.to_string()),
    }
}

/// One chain reached through an alloy [`Provider`].
///
/// With an account attached the client also signs: transactions go out through
/// `eth_sendTransaction`, so the provider's wallet filler (local key) or the
/// remote node (external wallet) does the signing.
///
/// ```rust,no_run
/// use alloy_provider::ProviderBuilder;
/// use cctp_orchestrator::providers::AlloyChainClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("https://sepolia.base.org").await?;
/// let reader = AlloyChainClient::connect(provider).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AlloyChainClient<P> {
    provider: P,
    chain_id: u64,
    account: Option<Address>,
    gas_buffer_percent: u64,
}

impl<P> AlloyChainClient<P>
where
    P: Provider<Ethereum>,
{
    pub fn new(provider: P, chain_id: u64) -> Self {
        Self {
            provider,
            chain_id,
            account: None,
            gas_buffer_percent: DEFAULT_GAS_BUFFER_PERCENT,
        }
    }

    /// Asks the node for its chain id.
    pub async fn connect(provider: P) -> Result<Self> {
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| TransferError::Provider(e.to_string()))?;
        Ok(Self::new(provider, chain_id))
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_gas_buffer_percent(mut self, percent: u64) -> Self {
        self.gas_buffer_percent = percent;
        self
    }

    pub fn inner(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> ChainReader for AlloyChainClient<P>
where
    P: Provider<Ethereum> + Send + Sync,
{
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        self.provider
            .call(tx)
            .await
            .map_err(|e| TransferError::Provider(e.to_string()))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(|e| TransferError::Provider(e.to_string()))
    }

    #[instrument(skip(self), fields(chain_id = self.chain_id))]
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        trace!("Fetching transaction receipt");
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| TransferError::Provider(e.to_string()))?;

        Ok(receipt.map(|receipt| {
            debug!(status = receipt.status(), "Transaction receipt found");
            TxReceipt {
                tx_hash: receipt.transaction_hash,
                success: receipt.status(),
                block_number: receipt.block_number,
                logs: receipt
                    .inner
                    .logs()
                    .iter()
                    .map(|log| log.inner.clone())
                    .collect(),
            }
        }))
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| TransferError::Provider(e.to_string()))
    }
}

#[async_trait]
impl<P> ChainSigner for AlloyChainClient<P>
where
    P: Provider<Ethereum> + Send + Sync,
{
    fn address(&self) -> Address {
        self.account.unwrap_or_default()
    }

    #[instrument(skip(self, tx), fields(chain_id = self.chain_id))]
    async fn send_transaction(
        &self,
        mut tx: TransactionRequest,
    ) -> std::result::Result<TxHash, SignerError> {
        let account = self
            .account
            .ok_or_else(|| SignerError::Rpc("client has no signing account".to_string()))?;
        if tx.from.is_none() {
            tx.from = Some(account);
        }

        match estimate_gas_with_buffer(&self.provider, &tx, Some(self.gas_buffer_percent)).await {
            Ok(gas) => tx.gas = Some(gas),
            Err(e) => {
                warn!(error = %e, event = "gas_estimation_failed");
                return Err(SignerError::Rpc(e.to_string()));
            }
        }

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(signer_error)?;
        let tx_hash = *pending.tx_hash();

        debug!(tx_hash = %tx_hash, event = "transaction_broadcast");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_json_rpc::ErrorPayload;

    #[test]
    fn test_user_rejection_maps_to_rejected() {
        let payload = ErrorPayload {
            code: 4001,
            message: "User rejected the request.".into(),
            data: None,
        };
        let err = signer_error(RpcError::ErrorResp(payload));
        assert!(err.is_user_rejection());
    }

    #[test]
    fn test_other_rpc_errors_are_not_rejections() {
        let payload = ErrorPayload {
            code: -32000,
            message: "insufficient funds for gas".into(),
            data: None,
        };
        let err = signer_error(RpcError::ErrorResp(payload));
        assert!(matches!(err, SignerError::Rpc(_)));
    }
}
