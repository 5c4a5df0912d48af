//! SimulatedWallet - injected wallet provider backed by a SimulatedLedger

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::LedgerError;
use crate::ledger::{Address, LedgerContract, WalletProvider};
use crate::sim::{SimulatedLedger, TEST_ACCOUNT};

#[derive(Clone)]
pub struct SimulatedWallet {
    ledger: SimulatedLedger,
    present: bool,
    accounts: Vec<String>,
    existing: Vec<String>,
    reject: bool,
    requests: Arc<AtomicUsize>,
}

impl SimulatedWallet {
    /// Present provider exposing [`TEST_ACCOUNT`] on request, nothing pre-authorized.
    pub fn new(ledger: SimulatedLedger) -> Self {
        Self {
            ledger,
            present: true,
            accounts: vec![TEST_ACCOUNT.to_string()],
            existing: Vec::new(),
            reject: false,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle exists but reports not present.
    pub fn absent(mut self) -> Self { self.present = false; self }
    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self { self.accounts = accounts; self }
    /// Accounts already authorized from an earlier visit.
    pub fn with_existing_accounts(mut self, accounts: Vec<String>) -> Self { self.existing = accounts; self }
    /// User dismisses every account request.
    pub fn rejecting(mut self) -> Self { self.reject = true; self }

    pub fn ledger(&self) -> &SimulatedLedger { &self.ledger }

    /// Number of prompting account requests seen so far.
    pub fn account_requests(&self) -> usize { self.requests.load(Ordering::SeqCst) }
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    fn is_present(&self) -> bool { self.present }

    async fn request_accounts(&self) -> Result<Vec<String>, LedgerError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(LedgerError::Rejected("user rejected the request".into()));
        }
        Ok(self.accounts.clone())
    }

    async fn existing_accounts(&self) -> Result<Vec<String>, LedgerError> {
        Ok(self.existing.clone())
    }

    fn contract(&self, address: &Address, signer: &Address) -> Result<Arc<dyn LedgerContract>, LedgerError> {
        if address != self.ledger.address() {
            return Err(LedgerError::Transport(format!("no contract deployed at {}", address)));
        }
        debug!(contract = %address, signer = %signer, "Simulated contract handle");
        Ok(Arc::new(self.ledger.clone()))
    }
}
