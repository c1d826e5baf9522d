// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory fakes for the [`crate::traits`] seams and [`WalletAdapter`].
//!
//! They let the whole transfer flow run without a node or the attestation
//! service, including the unhappy paths: rejected signatures, reverted
//! transactions, unreachable allowance reads, throttling and stuck wallets.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use alloy_primitives::{keccak256, Address, Bytes, TxHash, B256, U256};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use crate::chain::ChainConfig;
use crate::contracts::{
    message_sent_log, Erc20, MessageTransmitter, TokenMessenger, TokenMessengerV2,
};
use crate::error::{Result, SignerError, TransferError};
use crate::protocol::{
    AttestationLookup, AttestationResponse, BurnMessage, BurnMessageBody, MessageHeader,
};
use crate::traits::{AttestationProvider, ChainReader, ChainSigner, Clock, TxReceipt};
use crate::wallet::WalletAdapter;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Fake Chain
// ============================================================================

/// Contract call a [`FakeChain`] recognised in submitted calldata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Approve,
    DepositForBurn,
    DepositForBurnWithHook,
    ReceiveMessage,
    Other,
}

impl CallKind {
    fn of(input: &[u8]) -> Self {
        let Some(selector) = input.get(..4) else {
            return Self::Other;
        };
        if selector == Erc20::approveCall::SELECTOR {
            Self::Approve
        } else if selector == TokenMessenger::depositForBurnCall::SELECTOR
            || selector == TokenMessengerV2::depositForBurnCall::SELECTOR
        {
            Self::DepositForBurn
        } else if selector == TokenMessengerV2::depositForBurnWithHookCall::SELECTOR {
            Self::DepositForBurnWithHook
        } else if selector == MessageTransmitter::receiveMessageCall::SELECTOR {
            Self::ReceiveMessage
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Default)]
struct ChainState {
    allowance: U256,
    fail_allowance_reads: bool,
    reject_next_send: bool,
    reverted: HashSet<CallKind>,
    sent: HashMap<CallKind, usize>,
    code: HashMap<Address, Bytes>,
    receipts: HashMap<TxHash, TxReceipt>,
    block_number: u64,
    blocks_per_poll: u64,
    nonce: u64,
}

/// A single chain plus the account signing on it.
///
/// Transactions are mined instantly. Approvals update the allowance; burns
/// emit a `MessageSent` log carrying a burn message addressed from this
/// chain's domain.
#[derive(Debug)]
pub struct FakeChain {
    chain_id: u64,
    domain_id: u32,
    account: Address,
    transmitter: Address,
    state: Mutex<ChainState>,
}

impl FakeChain {
    /// A chain with no contracts deployed.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            domain_id: 0,
            account: Address::repeat_byte(0xaa),
            transmitter: Address::ZERO,
            state: Mutex::new(ChainState {
                block_number: 100,
                ..Default::default()
            }),
        }
    }

    /// A chain matching `config`, with code deployed at the asset address.
    pub fn for_chain(config: &ChainConfig) -> Self {
        let chain = Self {
            domain_id: config.domain_id,
            transmitter: config.transmitter_address,
            ..Self::new(config.chain_id)
        };
        lock(&chain.state)
            .code
            .insert(config.asset_address, Bytes::from_static(&[0x60, 0x80]));
        chain
    }

    pub fn set_allowance(&self, allowance: U256) {
        lock(&self.state).allowance = allowance;
    }

    pub fn allowance(&self) -> U256 {
        lock(&self.state).allowance
    }

    pub fn fail_allowance_reads(&self, fail: bool) {
        lock(&self.state).fail_allowance_reads = fail;
    }

    /// The next `send_transaction` fails as a user rejection.
    pub fn reject_next_send(&self) {
        lock(&self.state).reject_next_send = true;
    }

    /// Every later call of `kind` is mined with a failed receipt.
    pub fn revert_calls(&self, kind: CallKind) {
        lock(&self.state).reverted.insert(kind);
    }

    pub fn sent_count(&self, kind: CallKind) -> usize {
        lock(&self.state).sent.get(&kind).copied().unwrap_or(0)
    }

    pub fn remove_code(&self, address: Address) {
        lock(&self.state).code.remove(&address);
    }

    /// Mines a transaction nobody sent through this fake, e.g. a relayer's mint.
    pub fn insert_receipt(&self, success: bool) -> TxHash {
        let mut state = lock(&self.state);
        let tx_hash = self.next_hash(&mut state);
        let receipt = TxReceipt {
            tx_hash,
            success,
            block_number: Some(state.block_number),
            logs: Vec::new(),
        };
        state.receipts.insert(tx_hash, receipt);
        tx_hash
    }

    /// Blocks produced between two `block_number` reads.
    pub fn set_blocks_per_poll(&self, blocks: u64) {
        lock(&self.state).blocks_per_poll = blocks;
    }

    fn next_hash(&self, state: &mut ChainState) -> TxHash {
        state.nonce += 1;
        keccak256((self.chain_id, state.nonce).abi_encode())
    }

    fn burn_log(&self, kind: CallKind, input: &[u8]) -> Option<alloy_primitives::Log> {
        let (amount, destination_domain, mint_recipient, burn_token) = match kind {
            CallKind::DepositForBurn => {
                if let Ok(call) = TokenMessenger::depositForBurnCall::abi_decode(input) {
                    (
                        call.amount,
                        call.destinationDomain,
                        call.mintRecipient,
                        call.burnToken,
                    )
                } else {
                    let call = TokenMessengerV2::depositForBurnCall::abi_decode(input).ok()?;
                    (
                        call.amount,
                        call.destinationDomain,
                        call.mintRecipient,
                        call.burnToken,
                    )
                }
            }
            CallKind::DepositForBurnWithHook => {
                let call = TokenMessengerV2::depositForBurnWithHookCall::abi_decode(input).ok()?;
                (
                    call.amount,
                    call.destinationDomain,
                    call.mintRecipient,
                    call.burnToken,
                )
            }
            _ => return None,
        };

        let message = BurnMessage {
            header: MessageHeader {
                version: 1,
                source_domain: self.domain_id,
                destination_domain,
                nonce: B256::ZERO,
                sender: self.account.into_word(),
                recipient: mint_recipient,
                destination_caller: B256::ZERO,
                min_finality_threshold: 2000,
                finality_threshold_executed: 0,
            },
            body: BurnMessageBody {
                version: 1,
                burn_token,
                mint_recipient,
                amount,
                message_sender: self.account,
                max_fee: U256::ZERO,
                fee_executed: U256::ZERO,
                expiration_block: U256::ZERO,
                hook_data: Bytes::new(),
            },
        };
        Some(message_sent_log(self.transmitter, message.encode()))
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        let input = tx.input.input().cloned().unwrap_or_default();
        let state = lock(&self.state);

        if Erc20::allowanceCall::abi_decode(&input).is_ok() {
            if state.fail_allowance_reads {
                return Err(TransferError::Provider("connection refused".to_string()));
            }
            return Ok(Bytes::from(state.allowance.abi_encode()));
        }
        if Erc20::balanceOfCall::abi_decode(&input).is_ok() {
            return Ok(Bytes::from(U256::from(1_000_000_000_000u64).abi_encode()));
        }
        Err(TransferError::Provider("execution reverted".to_string()))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        Ok(lock(&self.state).code.get(&address).cloned().unwrap_or_default())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        Ok(lock(&self.state).receipts.get(&tx_hash).cloned())
    }

    async fn block_number(&self) -> Result<u64> {
        let mut state = lock(&self.state);
        let current = state.block_number;
        state.block_number += state.blocks_per_poll;
        Ok(current)
    }
}

#[async_trait]
impl ChainSigner for FakeChain {
    fn address(&self) -> Address {
        self.account
    }

    async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> std::result::Result<TxHash, SignerError> {
        let mut state = lock(&self.state);
        if std::mem::take(&mut state.reject_next_send) {
            return Err(SignerError::Rejected("User denied transaction signature".to_string()));
        }

        let input = tx.input.input().cloned().unwrap_or_default();
        let kind = CallKind::of(&input);
        *state.sent.entry(kind).or_default() += 1;

        let success = !state.reverted.contains(&kind);
        let mut logs = Vec::new();
        if success {
            match kind {
                CallKind::Approve => {
                    if let Ok(call) = Erc20::approveCall::abi_decode(&input) {
                        state.allowance = call.amount;
                    }
                }
                CallKind::DepositForBurn | CallKind::DepositForBurnWithHook => {
                    logs.extend(self.burn_log(kind, &input));
                }
                CallKind::ReceiveMessage | CallKind::Other => {}
            }
        }

        let tx_hash = self.next_hash(&mut state);
        let receipt = TxReceipt {
            tx_hash,
            success,
            block_number: Some(state.block_number),
            logs,
        };
        state.receipts.insert(tx_hash, receipt);
        Ok(tx_hash)
    }
}

// ============================================================================
// Fake Attestation Provider
// ============================================================================

type Responder = dyn Fn(&AttestationLookup, usize) -> Result<AttestationResponse> + Send + Sync;

#[derive(Default)]
struct AttestationState {
    scripted: HashMap<AttestationLookup, VecDeque<Result<AttestationResponse>>>,
    responder: Option<Arc<Responder>>,
    calls: HashMap<AttestationLookup, usize>,
}

/// Scripted attestation service.
///
/// A lookup with a scripted sequence gets it in order, the last `Ok` response
/// repeating once the sequence runs out. Otherwise the responder set with
/// [`FakeAttestationProvider::respond_with`] answers, and without one every
/// lookup stays pending.
#[derive(Clone, Default)]
pub struct FakeAttestationProvider {
    state: Arc<Mutex<AttestationState>>,
}

impl FakeAttestationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `responses` to the sequence for `lookup`.
    pub fn push_responses(
        &self,
        lookup: AttestationLookup,
        responses: Vec<Result<AttestationResponse>>,
    ) {
        lock(&self.state)
            .scripted
            .entry(lookup)
            .or_default()
            .extend(responses);
    }

    /// Answers unscripted lookups; the second argument is the 1-based call count.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&AttestationLookup, usize) -> Result<AttestationResponse> + Send + Sync + 'static,
    {
        lock(&self.state).responder = Some(Arc::new(responder));
    }

    pub fn call_count(&self, lookup: &AttestationLookup) -> usize {
        lock(&self.state).calls.get(lookup).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.state).calls.values().sum()
    }
}

impl std::fmt::Debug for FakeAttestationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeAttestationProvider")
            .field("total_calls", &self.total_calls())
            .finish()
    }
}

#[async_trait]
impl AttestationProvider for FakeAttestationProvider {
    async fn get_attestation(&self, lookup: AttestationLookup) -> Result<AttestationResponse> {
        let (attempt, responder) = {
            let mut state = lock(&self.state);
            let attempt = {
                let calls = state.calls.entry(lookup).or_default();
                *calls += 1;
                *calls
            };

            if let Some(sequence) = state.scripted.get_mut(&lookup) {
                let repeat_last = sequence.len() == 1 && matches!(sequence.front(), Some(Ok(_)));
                if repeat_last {
                    if let Some(Ok(last)) = sequence.front() {
                        return Ok(last.clone());
                    }
                } else if let Some(result) = sequence.pop_front() {
                    return result;
                }
            }
            (attempt, state.responder.clone())
        };

        match responder {
            Some(responder) => responder(&lookup, attempt),
            None => Ok(AttestationResponse::pending()),
        }
    }
}

// ============================================================================
// Fake Clock
// ============================================================================

/// A clock that records sleeps and advances instantly.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current_time: Arc<Mutex<Instant>>,
    sleep_log: Arc<Mutex<Vec<Duration>>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Instant::now())),
            sleep_log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        *lock(&self.current_time) += duration;
    }

    pub fn total_sleep_time(&self) -> Duration {
        lock(&self.sleep_log).iter().sum()
    }

    pub fn sleep_count(&self) -> usize {
        lock(&self.sleep_log).len()
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        lock(&self.sleep_log).push(duration);
        self.advance(duration);
    }

    fn now(&self) -> Instant {
        *lock(&self.current_time)
    }
}

// ============================================================================
// Fake Wallet
// ============================================================================

/// How a [`FakeWallet`] answers switch requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchBehavior {
    #[default]
    Comply,
    /// Accepts the request but stays on the current chain.
    Ignore,
    /// The user declines.
    Reject,
    /// Fails with an RPC error this many times, then complies.
    FailTimes(u32),
}

#[derive(Debug)]
struct WalletState {
    active: u64,
    behavior: SwitchBehavior,
    switch_requests: usize,
}

/// Wallet over a set of [`FakeChain`]s; the first one starts active.
#[derive(Debug)]
pub struct FakeWallet {
    chains: Vec<Arc<FakeChain>>,
    state: Mutex<WalletState>,
}

impl FakeWallet {
    pub fn new(chains: Vec<Arc<FakeChain>>) -> Self {
        let active = chains.first().map_or(0, |chain| chain.chain_id());
        Self {
            chains,
            state: Mutex::new(WalletState {
                active,
                behavior: SwitchBehavior::default(),
                switch_requests: 0,
            }),
        }
    }

    pub fn set_switch_behavior(&self, behavior: SwitchBehavior) {
        lock(&self.state).behavior = behavior;
    }

    pub fn switch_requests(&self) -> usize {
        lock(&self.state).switch_requests
    }

    pub fn active_chain(&self) -> u64 {
        lock(&self.state).active
    }

    fn chain(&self, chain_id: u64) -> Option<&Arc<FakeChain>> {
        self.chains.iter().find(|chain| chain.chain_id() == chain_id)
    }
}

#[async_trait]
impl WalletAdapter for FakeWallet {
    async fn current_chain_id(&self) -> std::result::Result<u64, SignerError> {
        Ok(self.active_chain())
    }

    async fn request_chain_switch(&self, chain_id: u64) -> std::result::Result<(), SignerError> {
        let known = self.chain(chain_id).is_some();
        let mut state = lock(&self.state);
        state.switch_requests += 1;

        let behavior = state.behavior;
        match behavior {
            SwitchBehavior::Ignore => return Ok(()),
            SwitchBehavior::Reject => {
                return Err(SignerError::Rejected("User rejected the request.".to_string()))
            }
            SwitchBehavior::FailTimes(remaining) if remaining > 0 => {
                state.behavior = SwitchBehavior::FailTimes(remaining - 1);
                return Err(SignerError::Rpc("wallet busy".to_string()));
            }
            SwitchBehavior::Comply | SwitchBehavior::FailTimes(_) => {}
        }

        if !known {
            return Err(SignerError::UnknownChain(chain_id));
        }
        state.active = chain_id;
        Ok(())
    }

    async fn signer(
        &self,
        chain_id: u64,
    ) -> std::result::Result<Arc<dyn ChainSigner>, SignerError> {
        let active = self.active_chain();
        if active != chain_id {
            return Err(SignerError::WrongChain {
                requested: chain_id,
                active,
            });
        }
        self.chain(chain_id)
            .map(|chain| Arc::clone(chain) as Arc<dyn ChainSigner>)
            .ok_or(SignerError::UnknownChain(chain_id))
    }
}
