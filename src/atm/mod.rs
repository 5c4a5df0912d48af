//! Atm - transaction orchestrator and state container
//!
//! Owns the session, the cached balance, the donation history and the
//! notification log. Renderers read snapshots; mutation only happens through
//! the operations below.
//!
//! # Operation protocol
//!
//! ```text
//! claim in-flight slot ─▶ require ContractBound ─▶ validate ─▶ submit ─▶ await confirmation
//!                                                                            │
//!                         ┌──────────────────── ok ─────────────────────────┤
//!                         ▼                                                  ▼ err
//!              sync balance, append record,                   append "<op> failed",
//!              append notification                            return Submission/Confirmation
//! ```
//!
//! Validation failures return before any ledger call and append nothing.

mod guard;

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::balance::{BalanceSnapshot, BalanceSynchronizer};
use crate::campaigns::{Campaign, Catalog, DonationHistory, DonationRecord};
use crate::config::AtmConfig;
use crate::error::{AtmError, AtmResult};
use crate::ledger::{LedgerContract, TxHandle, WalletProvider};
use crate::notifications::{Notification, NotificationLog};
use crate::session::{SessionManager, SessionPhase, SessionSnapshot};
use crate::units::{format_amount, to_smallest_unit, ONE_UNIT};

use guard::InFlight;

/// Smallest accepted donation: one whole unit.
pub const MIN_DONATION: u128 = ONE_UNIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Deposit,
    Withdraw,
    Donate,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
            OperationKind::Donate => "donate",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "Deposit failed",
            OperationKind::Withdraw => "Withdrawal failed",
            OperationKind::Donate => "Donation failed",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Returned by a successful operation. The renderer clears its input on receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationReceipt {
    pub kind: OperationKind,
    #[serde(with = "crate::units::base_units")]
    pub amount: u128,
    pub tx_hash: String,
    pub campaign_id: Option<u32>,
    /// Balance after the post-success sync; `None` if that sync failed.
    #[serde(serialize_with = "crate::units::base_units::option::serialize")]
    pub balance: Option<u128>,
}

/// Everything a renderer needs in one read.
#[derive(Debug, Clone, Serialize)]
pub struct AtmSnapshot {
    pub session: SessionSnapshot,
    pub balance: BalanceSnapshot,
    pub campaigns: Vec<Campaign>,
    pub donations: Vec<DonationRecord>,
    pub notifications: Vec<Notification>,
    pub in_flight: Option<OperationKind>,
}

pub struct Atm {
    session: SessionManager,
    balance: BalanceSynchronizer,
    catalog: Catalog,
    donations: Mutex<DonationHistory>,
    notifications: Mutex<NotificationLog>,
    in_flight: InFlight,
}

impl Atm {
    pub fn new(config: AtmConfig, provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            session: SessionManager::new(provider, config.contract_address),
            balance: BalanceSynchronizer::new(),
            catalog: config.catalog,
            donations: Mutex::new(DonationHistory::default()),
            notifications: Mutex::new(NotificationLog::new()),
            in_flight: InFlight::default(),
        }
    }

    fn donations_log(&self) -> MutexGuard<'_, DonationHistory> {
        self.donations.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn notification_log(&self) -> MutexGuard<'_, NotificationLog> {
        self.notifications.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn notify(&self, message: impl Into<String>) {
        self.notification_log().append(message);
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    /// Detect the provider and adopt an already-authorized account, if any.
    ///
    /// Without a provider the ATM stays inert and every operation reports
    /// `ProviderUnavailable`.
    pub async fn start(&self) -> SessionPhase {
        if !self.session.detect_provider() {
            info!("Wallet provider is required to use this ATM");
            return SessionPhase::NoProvider;
        }
        match self.session.restore_existing_account().await {
            Ok(Some(account)) => info!(account = %account, "Restored existing account"),
            Ok(None) => {}
            Err(e) => warn!("Existing account not usable: {}", e),
        }
        self.initial_sync().await;
        self.session.phase()
    }

    /// Request account access and bind the contract. Idempotent once bound.
    pub async fn connect(&self) -> AtmResult<SessionPhase> {
        let was_bound = self.session.phase() == SessionPhase::ContractBound;
        let phase = self.session.connect().await?;
        if !was_bound {
            self.initial_sync().await;
        }
        Ok(phase)
    }

    async fn initial_sync(&self) {
        if self.session.phase() != SessionPhase::ContractBound || self.balance.current().last_synced_at > 0 {
            return;
        }
        if let Err(e) = self.balance.sync(&self.session).await {
            warn!("Initial balance sync failed: {}", e);
        }
    }

    // -------------------------------------------------------------------------
    // Balance
    // -------------------------------------------------------------------------

    pub async fn sync_balance(&self) -> AtmResult<u128> {
        self.balance.sync(&self.session).await
    }

    /// Returns the new `hidden` flag.
    pub fn toggle_balance_visibility(&self) -> bool {
        self.balance.toggle_visibility()
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    pub async fn deposit(&self, amount: &str) -> AtmResult<OperationReceipt> {
        let _slot = self.in_flight.begin(OperationKind::Deposit)?;
        let contract = self.session.contract()?;
        let value = self.validate_amount(OperationKind::Deposit, amount)?;
        let tx = self.execute(&*contract, OperationKind::Deposit, value).await?;
        let balance = self.refresh_balance().await;
        self.notify(format!("Deposited {}", format_amount(value)));
        info!(tx = %tx.hash, amount = %format_amount(value), "Deposit confirmed");
        Ok(OperationReceipt { kind: OperationKind::Deposit, amount: value, tx_hash: tx.hash, campaign_id: None, balance })
    }

    /// No client-side funds check; the contract decides.
    pub async fn withdraw(&self, amount: &str) -> AtmResult<OperationReceipt> {
        let _slot = self.in_flight.begin(OperationKind::Withdraw)?;
        let contract = self.session.contract()?;
        let value = self.validate_amount(OperationKind::Withdraw, amount)?;
        let tx = self.execute(&*contract, OperationKind::Withdraw, value).await?;
        let balance = self.refresh_balance().await;
        self.notify(format!("Withdrawn {}", format_amount(value)));
        info!(tx = %tx.hash, amount = %format_amount(value), "Withdrawal confirmed");
        Ok(OperationReceipt { kind: OperationKind::Withdraw, amount: value, tx_hash: tx.hash, campaign_id: None, balance })
    }

    /// Deposit attributed to a campaign.
    ///
    /// Checks, in order: campaign exists, amount parses, amount reaches the
    /// minimum. The ledger is only called once all three pass.
    pub async fn donate(&self, amount: &str, campaign_id: u32) -> AtmResult<OperationReceipt> {
        let _slot = self.in_flight.begin(OperationKind::Donate)?;
        let contract = self.session.contract()?;
        let campaign = self.catalog.get(campaign_id).ok_or_else(|| {
            debug!(campaign_id, "Donation to unknown campaign rejected");
            AtmError::InvalidCampaign(campaign_id)
        })?;
        let value = self.validate_amount(OperationKind::Donate, amount)?;
        if value < MIN_DONATION {
            debug!(amount = %format_amount(value), "Donation below minimum rejected");
            return Err(AtmError::BelowMinimumDonation { minimum: format_amount(MIN_DONATION) });
        }

        let tx = self.execute(&*contract, OperationKind::Donate, value).await?;
        let balance = self.refresh_balance().await;
        self.donations_log().append(DonationRecord {
            campaign_id: campaign.id,
            campaign_name: campaign.name.clone(),
            amount: value,
        });
        self.notify(format!("Donated {} to {}", format_amount(value), campaign.name));
        info!(tx = %tx.hash, campaign = %campaign.name, amount = %format_amount(value), "Donation confirmed");
        Ok(OperationReceipt { kind: OperationKind::Donate, amount: value, tx_hash: tx.hash, campaign_id: Some(campaign.id), balance })
    }

    fn validate_amount(&self, kind: OperationKind, amount: &str) -> AtmResult<u128> {
        to_smallest_unit(amount).map_err(|e| {
            debug!(op = kind.as_str(), "{}", e);
            e
        })
    }

    /// Submit and wait. On failure the failure notification is appended here.
    async fn execute(&self, contract: &dyn LedgerContract, kind: OperationKind, value: u128) -> AtmResult<TxHandle> {
        let result = async {
            let tx = match kind {
                OperationKind::Withdraw => contract.submit_withdraw(value).await,
                OperationKind::Deposit | OperationKind::Donate => contract.submit_deposit(value).await,
            }
            .map_err(AtmError::Submission)?;
            debug!(tx = %tx.hash, op = kind.as_str(), "Awaiting confirmation");
            contract.await_confirmation(&tx).await.map_err(AtmError::Confirmation)?;
            Ok(tx)
        }
        .await;

        if let Err(e) = &result {
            warn!(op = kind.as_str(), "Error during {}: {}", kind, e);
            self.notify(kind.failure_message());
        }
        result
    }

    /// The operation already succeeded on-chain; a failed refresh only leaves the cache stale.
    async fn refresh_balance(&self) -> Option<u128> {
        match self.balance.sync(&self.session).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Balance refresh after confirmed transaction failed: {}", e);
                None
            }
        }
    }

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    pub fn clear_notifications(&self) {
        self.notification_log().clear_all();
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notification_log().entries().to_vec()
    }

    // -------------------------------------------------------------------------
    // Catalog and history
    // -------------------------------------------------------------------------

    pub fn catalog(&self) -> &Catalog { &self.catalog }

    pub fn campaign_info(&self, id: u32) -> Option<String> { self.catalog.describe(id) }

    pub fn donations(&self) -> Vec<DonationRecord> { self.donations_log().all().to_vec() }

    pub fn donations_for(&self, campaign_id: u32) -> Vec<DonationRecord> {
        self.donations_log().for_campaign(campaign_id)
    }

    pub fn donated_to(&self, campaign_id: u32) -> u128 {
        self.donations_log().total_for(campaign_id)
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    pub fn session(&self) -> SessionSnapshot { self.session.snapshot() }

    pub fn balance(&self) -> BalanceSnapshot { self.balance.snapshot() }

    pub fn in_flight(&self) -> Option<OperationKind> { self.in_flight.current() }

    pub fn snapshot(&self) -> AtmSnapshot {
        AtmSnapshot {
            session: self.session(),
            balance: self.balance(),
            campaigns: self.catalog.all().to_vec(),
            donations: self.donations(),
            notifications: self.notifications(),
            in_flight: self.in_flight(),
        }
    }
}
