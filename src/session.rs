//! Session manager: wallet provider detection, account connection, contract binding.
//!
//! ```text
//! NoProvider ──detect──▶ ProviderDetected ──connect──▶ AccountConnected ──bind──▶ ContractBound
//! ```
//!
//! The state enum carries the account and the contract handle, so a bound
//! contract without an account (or an account without a provider) cannot be
//! represented. There is no disconnect; the session lives as long as the process.

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::{AtmError, AtmResult};
use crate::ledger::{Address, LedgerContract, WalletProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NoProvider,
    ProviderDetected,
    AccountConnected,
    ContractBound,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::NoProvider => "no_provider",
            SessionPhase::ProviderDetected => "provider_detected",
            SessionPhase::AccountConnected => "account_connected",
            SessionPhase::ContractBound => "contract_bound",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone)]
enum SessionState {
    NoProvider,
    ProviderDetected,
    AccountConnected { account: Address },
    ContractBound { account: Address, contract: Arc<dyn LedgerContract> },
}

impl SessionState {
    fn phase(&self) -> SessionPhase {
        match self {
            SessionState::NoProvider => SessionPhase::NoProvider,
            SessionState::ProviderDetected => SessionPhase::ProviderDetected,
            SessionState::AccountConnected { .. } => SessionPhase::AccountConnected,
            SessionState::ContractBound { .. } => SessionPhase::ContractBound,
        }
    }

    fn account(&self) -> Option<&Address> {
        match self {
            SessionState::AccountConnected { account } | SessionState::ContractBound { account, .. } => Some(account),
            _ => None,
        }
    }
}

/// Read-only view of the session for the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub provider_present: bool,
    pub account: Option<Address>,
    pub contract_bound: bool,
    pub contract_address: Address,
}

pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    contract_address: Address,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// `provider` is whatever the host environment injected, if anything.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, contract_address: Address) -> Self {
        Self { provider, contract_address, state: Mutex::new(SessionState::NoProvider) }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn phase(&self) -> SessionPhase { self.state().phase() }

    pub fn account(&self) -> Option<Address> { self.state().account().cloned() }

    pub fn contract_address(&self) -> &Address { &self.contract_address }

    /// `NoProvider → ProviderDetected` when a present provider was injected.
    pub fn detect_provider(&self) -> bool {
        let mut state = self.state();
        if !matches!(*state, SessionState::NoProvider) {
            return true;
        }
        match &self.provider {
            Some(p) if p.is_present() => {
                info!("Wallet provider detected");
                *state = SessionState::ProviderDetected;
                true
            }
            _ => {
                debug!("No wallet provider in host environment");
                false
            }
        }
    }

    fn present_provider(&self) -> AtmResult<Arc<dyn WalletProvider>> {
        if !self.detect_provider() {
            return Err(AtmError::ProviderUnavailable);
        }
        self.provider.clone().ok_or(AtmError::ProviderUnavailable)
    }

    /// Adopt an account the provider already authorized, without prompting.
    ///
    /// Query failures and empty lists are logged only.
    pub async fn restore_existing_account(&self) -> AtmResult<Option<Address>> {
        let provider = self.present_provider()?;
        if self.phase() == SessionPhase::ContractBound {
            return Ok(self.account());
        }
        let accounts = match provider.existing_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("Existing accounts query failed: {}", e);
                return Ok(None);
            }
        };
        self.adopt_accounts(accounts)
    }

    /// Request account access and bind the contract.
    ///
    /// An empty account list leaves the state unchanged and is not an error.
    pub async fn connect(&self) -> AtmResult<SessionPhase> {
        let provider = self.present_provider()?;
        if self.phase() == SessionPhase::ContractBound {
            return Ok(SessionPhase::ContractBound);
        }
        let accounts = provider.request_accounts().await.map_err(|e| {
            warn!("Error connecting account: {}", e);
            AtmError::ConnectionRejected(e.to_string())
        })?;
        self.adopt_accounts(accounts)?;
        Ok(self.phase())
    }

    fn adopt_accounts(&self, accounts: Vec<String>) -> AtmResult<Option<Address>> {
        let Some(first) = accounts.into_iter().next() else {
            info!("No account found");
            return Ok(None);
        };
        let account = Address::parse(&first).map_err(|e| {
            warn!("Provider returned unusable account: {}", e);
            AtmError::ConnectionRejected(e)
        })?;
        {
            let mut state = self.state();
            match *state {
                SessionState::ContractBound { .. } => return Ok(state.account().cloned()),
                SessionState::NoProvider => return Err(AtmError::ProviderUnavailable),
                _ => {
                    info!(account = %account, "Account connected");
                    *state = SessionState::AccountConnected { account: account.clone() };
                }
            }
        }
        self.bind_contract()?;
        Ok(Some(account))
    }

    /// `AccountConnected → ContractBound`, signing as the connected account.
    pub fn bind_contract(&self) -> AtmResult<()> {
        let provider = self.present_provider()?;
        let mut state = self.state();
        let account = match &*state {
            SessionState::AccountConnected { account } => account.clone(),
            SessionState::ContractBound { .. } => return Ok(()),
            other => return Err(AtmError::SessionNotReady { state: other.phase().as_str() }),
        };
        let contract = provider.contract(&self.contract_address, &account).map_err(|e| {
            warn!("Contract binding failed: {}", e);
            AtmError::ConnectionRejected(e.to_string())
        })?;
        info!(contract = %self.contract_address, signer = %account, "Contract bound");
        *state = SessionState::ContractBound { account, contract };
        Ok(())
    }

    /// The bound contract; the only way ledger operations obtain a handle.
    pub fn contract(&self) -> AtmResult<Arc<dyn LedgerContract>> {
        match &*self.state() {
            SessionState::ContractBound { contract, .. } => Ok(contract.clone()),
            SessionState::NoProvider => Err(AtmError::ProviderUnavailable),
            other => Err(AtmError::SessionNotReady { state: other.phase().as_str() }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            phase: state.phase(),
            provider_present: state.phase() >= SessionPhase::ProviderDetected,
            account: state.account().cloned(),
            contract_bound: state.phase() == SessionPhase::ContractBound,
            contract_address: self.contract_address.clone(),
        }
    }
}
