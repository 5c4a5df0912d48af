//! Simulated chain - in-process wallet provider and ledger contract
//!
//! Stands in for a local development chain. Used by the test-suite and the
//! `beeatm` binary when no real provider is wired in.
//!
//! # Fault injection
//!
//! | Method | Effect |
//! |--------|--------|
//! | `fail_next_query` | next `query_balance` errors |
//! | `fail_next_submission` | next deposit/withdraw submission is rejected |
//! | `fail_next_confirmation` | next confirmation reverts |
//! | `pause_confirmations` | confirmations block until `release_confirmations` |

mod ledger;
mod wallet;

pub use ledger::{LedgerStats, SimulatedLedger};
pub use wallet::SimulatedWallet;

/// First well-known development account.
pub const TEST_ACCOUNT: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
