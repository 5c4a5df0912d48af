//! Balance synchronizer: cached contract balance plus a local visibility flag.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::error::{AtmError, AtmResult};
use crate::session::SessionManager;
use crate::units::format_amount;

const MASK: &str = "******";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balance {
    /// Base units as last reported by the contract.
    pub value: u128,
    /// Logical sync epoch; 0 until the first successful sync.
    pub last_synced_at: u64,
    pub synced_at: Option<DateTime<Utc>>,
    pub hidden: bool,
}

/// Renderer view. `value` and `display` are masked while hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    #[serde(serialize_with = "crate::units::base_units::option::serialize")]
    pub value: Option<u128>,
    pub display: Option<String>,
    pub hidden: bool,
    pub last_synced_at: u64,
    pub synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct BalanceSynchronizer {
    balance: Mutex<Balance>,
}

impl BalanceSynchronizer {
    pub fn new() -> Self { Self::default() }

    fn balance(&self) -> MutexGuard<'_, Balance> {
        self.balance.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Query the bound contract and cache the result. Not retried on failure.
    pub async fn sync(&self, session: &SessionManager) -> AtmResult<u128> {
        let contract = session.contract()?;
        let value = contract.query_balance().await.map_err(|e| {
            warn!("Balance query failed: {}", e);
            AtmError::SyncFailure(e)
        })?;
        let mut balance = self.balance();
        balance.value = value;
        balance.last_synced_at += 1;
        balance.synced_at = Some(Utc::now());
        info!(epoch = balance.last_synced_at, balance = %format_amount(value), "Balance synced");
        Ok(value)
    }

    /// Local flag only; the cached value is untouched.
    pub fn toggle_visibility(&self) -> bool {
        let mut balance = self.balance();
        balance.hidden = !balance.hidden;
        balance.hidden
    }

    pub fn current(&self) -> Balance { self.balance().clone() }

    pub fn snapshot(&self) -> BalanceSnapshot {
        let b = self.balance();
        let synced = b.last_synced_at > 0;
        let (value, display) = match (b.hidden, synced) {
            (true, _) => (None, Some(MASK.to_string())),
            (false, true) => (Some(b.value), Some(format_amount(b.value))),
            (false, false) => (None, None),
        };
        BalanceSnapshot { value, display, hidden: b.hidden, last_synced_at: b.last_synced_at, synced_at: b.synced_at }
    }
}
