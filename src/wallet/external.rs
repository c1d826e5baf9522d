// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use alloy_network::Ethereum;
use alloy_primitives::Address;
use alloy_provider::Provider;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::WalletAdapter;
use crate::error::SignerError;
use crate::providers::{signer_error, AlloyChainClient};
use crate::traits::ChainSigner;

/// A wallet that lives outside the process and is reached over JSON-RPC,
/// e.g. a browser extension behind an EIP-1193 bridge.
///
/// The provider must point at the wallet itself: `eth_chainId` reports its
/// active chain and `eth_sendTransaction` is signed by it.
///
/// ```rust,no_run
/// use alloy_provider::ProviderBuilder;
/// use cctp_orchestrator::wallet::ExternalSignerAdapter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("http://localhost:1248").await?;
/// let wallet = ExternalSignerAdapter::new(provider, "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".parse()?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ExternalSignerAdapter<P> {
    provider: P,
    account: Address,
}

impl<P> ExternalSignerAdapter<P>
where
    P: Provider<Ethereum> + Clone + 'static,
{
    pub fn new(provider: P, account: Address) -> Self {
        Self { provider, account }
    }

    pub fn account(&self) -> Address {
        self.account
    }
}

#[async_trait]
impl<P> WalletAdapter for ExternalSignerAdapter<P>
where
    P: Provider<Ethereum> + Clone + Send + Sync + 'static,
{
    async fn current_chain_id(&self) -> Result<u64, SignerError> {
        self.provider.get_chain_id().await.map_err(signer_error)
    }

    async fn request_chain_switch(&self, chain_id: u64) -> Result<(), SignerError> {
        let params = vec![json!({ "chainId": format!("0x{chain_id:x}") })];
        debug!(chain_id, event = "wallet_switch_ethereum_chain");
        let _: Value = self
            .provider
            .raw_request("wallet_switchEthereumChain".into(), params)
            .await
            .map_err(signer_error)?;
        Ok(())
    }

    async fn signer(&self, chain_id: u64) -> Result<Arc<dyn ChainSigner>, SignerError> {
        let active = self.current_chain_id().await?;
        if active != chain_id {
            return Err(SignerError::WrongChain {
                requested: chain_id,
                active,
            });
        }

        let client =
            AlloyChainClient::new(self.provider.clone(), chain_id).with_account(self.account);
        Ok(Arc::new(client))
    }
}
