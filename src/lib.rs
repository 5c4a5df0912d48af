//! Beeatm: wallet-bound donation ATM. Connect, sync, deposit, withdraw, donate.
//!
//! # Architecture
//!
//! ```text
//! Atm (entry point, state container)
//!   │
//!   ├── SessionManager
//!   │     └── WalletProvider (injected) ──▶ LedgerContract (fixed address)
//!   │
//!   ├── BalanceSynchronizer (cached balance + visibility)
//!   │
//!   ├── Catalog + DonationHistory (client-side campaign attribution)
//!   │
//!   └── NotificationLog (operation outcomes, user-clearable)
//! ```
//!
//! # Operations
//!
//! | Operation | Method | Ledger calls |
//! |-----------|--------|--------------|
//! | connect | `atm.connect()` | request accounts, bind, query balance |
//! | sync | `atm.sync_balance()` | query balance |
//! | deposit | `atm.deposit("1.5")` | deposit, confirm, query balance |
//! | withdraw | `atm.withdraw("0.5")` | withdraw, confirm, query balance |
//! | donate | `atm.donate("2", 1)` | deposit, confirm, query balance |
//!
//! # Features
//!
//! - `native` - multi-threaded runtime, signal handling, log subscriber, `beeatm` binary
//!
//! # Usage
//!
//! ```ignore
//! use beeatm::{Atm, AtmConfig};
//! use beeatm::sim::{SimulatedLedger, SimulatedWallet};
//! use std::sync::Arc;
//!
//! let wallet = SimulatedWallet::new(SimulatedLedger::new());
//! let atm = Atm::new(AtmConfig::default(), Some(Arc::new(wallet)));
//! atm.connect().await?;
//! atm.deposit("5").await?;
//! atm.donate("2", 1).await?;
//! ```

pub mod atm;
pub mod balance;
pub mod campaigns;
pub mod config;
pub mod error;
pub mod ledger;
pub mod notifications;
pub mod session;
pub mod sim;
pub mod units;

#[cfg(feature = "native")]
pub mod logging;
#[cfg(feature = "native")]
pub mod runtime;

// =============================================================================
// Re-exports
// =============================================================================
pub use atm::{Atm, AtmSnapshot, OperationKind, OperationReceipt, MIN_DONATION};
pub use balance::{Balance, BalanceSnapshot};
pub use campaigns::{Campaign, Catalog, DonationRecord};
pub use config::AtmConfig;
pub use error::{AtmError, AtmResult, LedgerError};
pub use ledger::{Address, LedgerContract, TxHandle, WalletProvider};
pub use notifications::Notification;
pub use session::{SessionPhase, SessionSnapshot};
pub use units::{to_decimal_display, to_smallest_unit, ONE_UNIT, UNIT_SYMBOL};

#[cfg(feature = "native")]
pub use runtime::shutdown_signal;
