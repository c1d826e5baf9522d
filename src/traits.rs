// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! I/O seams of the orchestrator.
//!
//! Everything that touches a chain, the attestation service or the wall clock
//! goes through one of these traits, so the whole transfer flow can run against
//! the fakes in [`crate::testing`]. Production implementations live in
//! [`crate::providers`] and [`crate::wallet`].

use alloy_primitives::{Address, Bytes, Log, TxHash};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::error::{Result, SignerError};
use crate::protocol::{AttestationLookup, AttestationResponse};

/// Receipt fields the transfer flow cares about, independent of network type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
    pub block_number: Option<u64>,
    pub logs: Vec<Log>,
}

/// Read-only access to one chain.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// EVM chain id this reader is connected to.
    fn chain_id(&self) -> u64;

    /// `eth_call` against the latest block.
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes>;

    /// Deployed bytecode at `address`; empty when nothing is deployed.
    async fn code_at(&self, address: Address) -> Result<Bytes>;

    /// Returns `None` while the transaction is unknown or not yet mined.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>>;

    async fn block_number(&self) -> Result<u64>;
}

/// A chain connection that can also submit transactions from one account.
///
/// Submission errors are reported as [`SignerError`] so callers can tell a user
/// rejection apart from an RPC failure and map it onto the phase they are in.
#[async_trait]
pub trait ChainSigner: ChainReader {
    fn address(&self) -> Address;

    /// Signs and broadcasts `tx`, returning as soon as the node accepted it.
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> std::result::Result<TxHash, SignerError>;
}

/// Access to Circle's attestation service.
///
/// Implementations report "not indexed yet" as
/// [`crate::TransferError::AttestationNotFound`] and throttling as
/// [`crate::TransferError::RateLimitExceeded`]; the poller treats both as pending.
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    async fn get_attestation(&self, lookup: AttestationLookup) -> Result<AttestationResponse>;
}

/// Time source used by every wait loop.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);

    fn now(&self) -> Instant;
}
