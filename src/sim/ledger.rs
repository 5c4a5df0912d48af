//! SimulatedLedger - single-account balance contract with pending transactions

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::debug;

use crate::config::default_contract_address;
use crate::error::LedgerError;
use crate::ledger::{Address, LedgerContract, TxHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxKind { Deposit, Withdraw }

impl TxKind {
    fn as_str(&self) -> &'static str {
        match self { TxKind::Deposit => "deposit", TxKind::Withdraw => "withdraw" }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingTx { kind: TxKind, amount: u128 }

/// Call counters, for asserting which ledger interactions happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub queries: usize,
    pub submissions: usize,
    pub confirmations: usize,
}

#[derive(Debug, Default)]
struct Faults { query: bool, submission: bool, confirmation: bool }

#[derive(Debug)]
struct LedgerInner {
    balance: u128,
    nonce: u64,
    pending: HashMap<String, PendingTx>,
    stats: LedgerStats,
    faults: Faults,
}

/// Cheap to clone; clones share the same chain state.
#[derive(Clone)]
pub struct SimulatedLedger {
    address: Address,
    inner: Arc<Mutex<LedgerInner>>,
    paused: Arc<watch::Sender<bool>>,
}

impl Default for SimulatedLedger {
    fn default() -> Self { Self::new() }
}

impl SimulatedLedger {
    pub fn new() -> Self { Self::with_balance(0) }

    pub fn with_balance(balance: u128) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            address: default_contract_address(),
            inner: Arc::new(Mutex::new(LedgerInner {
                balance,
                nonce: 0,
                pending: HashMap::new(),
                stats: LedgerStats::default(),
                faults: Faults::default(),
            })),
            paused: Arc::new(paused),
        }
    }

    /// Deploy at a different address.
    pub fn at(mut self, address: Address) -> Self { self.address = address; self }

    pub fn address(&self) -> &Address { &self.address }

    fn inner(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn balance(&self) -> u128 { self.inner().balance }
    pub fn stats(&self) -> LedgerStats { self.inner().stats }
    pub fn pending(&self) -> usize { self.inner().pending.len() }

    pub fn fail_next_query(&self) { self.inner().faults.query = true; }
    pub fn fail_next_submission(&self) { self.inner().faults.submission = true; }
    pub fn fail_next_confirmation(&self) { self.inner().faults.confirmation = true; }

    pub fn pause_confirmations(&self) { self.paused.send_replace(true); }
    pub fn release_confirmations(&self) { self.paused.send_replace(false); }

    fn submit(&self, kind: TxKind, amount: u128) -> Result<TxHandle, LedgerError> {
        let mut inner = self.inner();
        inner.stats.submissions += 1;
        if std::mem::take(&mut inner.faults.submission) {
            return Err(LedgerError::Rejected("user denied transaction signature".into()));
        }
        if kind == TxKind::Withdraw && amount > inner.balance {
            return Err(LedgerError::Reverted("InsufficientBalance".into()));
        }
        inner.nonce += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.address.as_str().as_bytes());
        hasher.update(&inner.nonce.to_be_bytes());
        hasher.update(kind.as_str().as_bytes());
        hasher.update(&amount.to_be_bytes());
        let hash = format!("0x{}", hex::encode(hasher.finalize().as_bytes()));
        debug!(tx = %hash, kind = kind.as_str(), amount, "Transaction submitted");
        inner.pending.insert(hash.clone(), PendingTx { kind, amount });
        Ok(TxHandle::new(hash))
    }
}

#[async_trait]
impl LedgerContract for SimulatedLedger {
    async fn query_balance(&self) -> Result<u128, LedgerError> {
        let mut inner = self.inner();
        inner.stats.queries += 1;
        if std::mem::take(&mut inner.faults.query) {
            return Err(LedgerError::Transport("balance query timed out".into()));
        }
        Ok(inner.balance)
    }

    async fn submit_deposit(&self, amount: u128) -> Result<TxHandle, LedgerError> {
        self.submit(TxKind::Deposit, amount)
    }

    async fn submit_withdraw(&self, amount: u128) -> Result<TxHandle, LedgerError> {
        self.submit(TxKind::Withdraw, amount)
    }

    async fn await_confirmation(&self, tx: &TxHandle) -> Result<(), LedgerError> {
        let mut paused = self.paused.subscribe();
        paused
            .wait_for(|p| !*p)
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let mut inner = self.inner();
        let pending = inner
            .pending
            .remove(&tx.hash)
            .ok_or_else(|| LedgerError::Transport(format!("unknown transaction {}", tx.hash)))?;
        inner.stats.confirmations += 1;
        if std::mem::take(&mut inner.faults.confirmation) {
            return Err(LedgerError::Reverted("transaction reverted".into()));
        }
        match pending.kind {
            TxKind::Deposit => {
                inner.balance = inner
                    .balance
                    .checked_add(pending.amount)
                    .ok_or_else(|| LedgerError::Reverted("balance overflow".into()))?;
            }
            TxKind::Withdraw => {
                if pending.amount > inner.balance {
                    return Err(LedgerError::Reverted("InsufficientBalance".into()));
                }
                inner.balance -= pending.amount;
            }
        }
        debug!(tx = %tx.hash, balance = inner.balance, "Transaction confirmed");
        Ok(())
    }
}
