// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use super::WalletAdapter;
use crate::error::SignerError;
use crate::traits::ChainSigner;

/// In-process signers, one per chain, e.g. [`crate::providers::AlloyChainClient`]s
/// over a provider with a local key.
///
/// Switching chains only moves the active pointer.
pub struct EmbeddedSignerAdapter {
    signers: HashMap<u64, Arc<dyn ChainSigner>>,
    active: Mutex<u64>,
}

impl EmbeddedSignerAdapter {
    /// `initial` becomes the active chain.
    pub fn new(initial: Arc<dyn ChainSigner>) -> Self {
        let chain_id = initial.chain_id();
        Self {
            signers: HashMap::from([(chain_id, initial)]),
            active: Mutex::new(chain_id),
        }
    }

    /// Adds or replaces the signer for its chain.
    pub fn with_signer(mut self, signer: Arc<dyn ChainSigner>) -> Self {
        self.signers.insert(signer.chain_id(), signer);
        self
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.signers.keys().copied()
    }

    fn active(&self) -> u64 {
        // The guarded value is a plain integer; a poisoned lock still holds a valid one.
        *self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EmbeddedSignerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chains: Vec<u64> = self.chain_ids().collect();
        chains.sort_unstable();
        f.debug_struct("EmbeddedSignerAdapter")
            .field("chains", &chains)
            .field("active", &self.active())
            .finish()
    }
}

#[async_trait]
impl WalletAdapter for EmbeddedSignerAdapter {
    async fn current_chain_id(&self) -> Result<u64, SignerError> {
        Ok(self.active())
    }

    async fn request_chain_switch(&self, chain_id: u64) -> Result<(), SignerError> {
        if !self.signers.contains_key(&chain_id) {
            return Err(SignerError::UnknownChain(chain_id));
        }
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!(from = *active, to = chain_id, event = "embedded_chain_switched");
        *active = chain_id;
        Ok(())
    }

    async fn signer(&self, chain_id: u64) -> Result<Arc<dyn ChainSigner>, SignerError> {
        let active = self.active();
        if active != chain_id {
            return Err(SignerError::WrongChain {
                requested: chain_id,
                active,
            });
        }
        self.signers
            .get(&chain_id)
            .cloned()
            .ok_or(SignerError::UnknownChain(chain_id))
    }
}
